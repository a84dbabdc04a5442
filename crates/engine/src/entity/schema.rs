//! Schema entities
//!
//! A schema entity holds a frozen `schema` and `options` pair. It resolves
//! its `value` like an entry entity; validation itself belongs to a
//! [`SchemaValidator`] installed in the store. Without a validator the
//! entity passes its value through.

use std::sync::Arc;

use refract_core::{Error, Result, Value};
use tracing::debug;

use super::{resolve_value, Entity};
use crate::accumulator::Accumulator;
use crate::store::EntityStore;

/// Result reported by a [`SchemaValidator`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationOutcome {
    /// Whether the value conforms
    pub valid: bool,
    /// Diagnostics, empty when valid
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    /// A passing outcome
    pub fn valid() -> Self {
        ValidationOutcome {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// A failing outcome
    pub fn invalid(errors: Vec<String>) -> Self {
        ValidationOutcome {
            valid: false,
            errors,
        }
    }
}

/// External collaborator that validates values against a schema
pub trait SchemaValidator: Send + Sync {
    /// Validate `value` against `schema` with `options`
    fn validate(&self, value: &Value, schema: &Value, options: &Value) -> ValidationOutcome;
}

impl<F> SchemaValidator for F
where
    F: Fn(&Value, &Value, &Value) -> ValidationOutcome + Send + Sync,
{
    fn validate(&self, value: &Value, schema: &Value, options: &Value) -> ValidationOutcome {
        self(value, schema, options)
    }
}

/// Frozen payload of a schema entity
#[derive(Debug, Clone)]
pub struct SchemaEntity {
    schema: Arc<Value>,
    options: Arc<Value>,
}

impl SchemaEntity {
    pub(crate) fn create(id: &str, schema: Option<Value>, options: Option<Value>) -> Result<Self> {
        Ok(SchemaEntity {
            schema: Arc::new(object_or_empty(id, "schema", schema)?),
            options: Arc::new(object_or_empty(id, "options", options)?),
        })
    }

    /// The schema document
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Validator options
    pub fn options(&self) -> &Value {
        &self.options
    }
}

fn object_or_empty(id: &str, field: &str, value: Option<Value>) -> Result<Value> {
    match value {
        None => Ok(Value::object()),
        Some(value @ Value::Object(_)) => Ok(value),
        Some(other) => Err(Error::invalid_spec(format!(
            "{}: '{}' must be an object, got {}",
            id,
            field,
            other.type_name()
        ))),
    }
}

/// Resolve a schema entity: value, then validation if a validator is installed
pub(crate) async fn resolve_schema(
    store: &EntityStore,
    acc: Accumulator,
    entity: &Entity,
    schema: &SchemaEntity,
) -> Result<Accumulator> {
    let acc = resolve_value(store, acc, entity).await?;
    let Some(validator) = store.validator() else {
        return Ok(acc);
    };

    let outcome = validator.validate(acc.value(), schema.schema(), schema.options());
    if outcome.valid {
        return Ok(acc);
    }
    debug!(target: "refract::resolve", entity = %entity.id(), errors = outcome.errors.len(), "Schema validation failed");
    Err(Error::validation(
        format!(
            "\"{}\" value failed schema validation: {}",
            entity.id(),
            outcome.errors.join("; ")
        ),
        outcome.errors,
    ))
}
