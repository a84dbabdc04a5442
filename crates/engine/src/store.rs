//! The entity store
//!
//! An [`EntityStore`] is built once from raw entity specs and is read-only
//! afterward, so one store can serve any number of concurrent `transform`
//! calls without locking. Stores are plain values: tests build as many as
//! they like.
//!
//! # Example
//!
//! ```ignore
//! use refract_engine::{EntitySpec, EntityStore, TransformOptions};
//!
//! let store = EntityStore::builder()
//!     .add("hash:person", EntitySpec::new().value("$person").pick_keys(["name"]))
//!     .value("region", "eu")
//!     .build()?;
//!
//! let acc = store
//!     .transform("hash:person", input, TransformOptions::default())
//!     .await?;
//! ```
//!
//! Store-level values are frozen with the store and every reducer can read
//! them as `..values`.
//!
//! Build-time checks are eager for definitions and lazy for references:
//! an unknown entity *type* anywhere in a definition fails [`StoreBuilder::build`],
//! while an unknown entity *id* only fails when it is resolved.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use refract_core::{Error, Map, Result, Value};
use tracing::info;

use crate::accumulator::Accumulator;
use crate::entity::{Entity, EntitySpec, EntityType, SchemaValidator};
use crate::reducer::ReducerSpec;
use crate::transform::{transform, TransformOptions};

// ============================================================================
// EntityStore
// ============================================================================

/// Immutable registry of compiled entities keyed by `type:name`
pub struct EntityStore {
    entities: HashMap<String, Arc<Entity>>,
    values: Arc<Value>,
    validator: Option<Arc<dyn SchemaValidator>>,
}

impl Default for EntityStore {
    fn default() -> Self {
        EntityStore {
            entities: HashMap::new(),
            values: Arc::new(Value::object()),
            validator: None,
        }
    }
}

impl EntityStore {
    /// Start configuring a store
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Store with no entities
    ///
    /// Enough for transforms made only of paths and functions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up an entity
    ///
    /// # Errors
    ///
    /// [`Error::Lookup`] if no entity is registered under `id`.
    pub fn get(&self, id: &str) -> Result<&Arc<Entity>> {
        self.entities
            .get(id)
            .ok_or_else(|| Error::lookup(format!("entity '{}' is not defined", id)))
    }

    /// Whether an entity is registered under `id`
    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Number of registered entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the store has no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entities.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Values visible to every transform as `..values` (always an object)
    pub fn values(&self) -> &Value {
        &self.values
    }

    pub(crate) fn shared_values(&self) -> Arc<Value> {
        Arc::clone(&self.values)
    }

    /// The schema validator, if one was installed
    pub fn validator(&self) -> Option<&dyn SchemaValidator> {
        self.validator.as_deref()
    }

    /// Run a transform against this store
    ///
    /// Same as [`transform`](crate::transform::transform) with `self` as the store.
    pub async fn transform(
        &self,
        spec: impl Into<ReducerSpec>,
        input: impl Into<Value>,
        options: TransformOptions,
    ) -> Result<Accumulator> {
        transform(self, spec, input, options).await
    }
}

impl fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityStore")
            .field("entities", &self.ids())
            .field("values", &self.values)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

// ============================================================================
// StoreBuilder
// ============================================================================

/// Builder for [`EntityStore`]
///
/// Specs are collected as given and compiled together by [`build`](Self::build).
#[derive(Default)]
pub struct StoreBuilder {
    specs: Vec<(String, EntitySpec)>,
    values: Map,
    validator: Option<Arc<dyn SchemaValidator>>,
}

impl StoreBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity spec under `id`
    pub fn add(mut self, id: impl Into<String>, spec: EntitySpec) -> Self {
        self.specs.push((id.into(), spec));
        self
    }

    /// Register an entity spec written as JSON
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSpec`] if the document is not a valid entity spec.
    pub fn add_json(self, id: impl Into<String>, spec: serde_json::Value) -> Result<Self> {
        let id = id.into();
        let parsed: EntitySpec = serde_json::from_value(spec)
            .map_err(|e| Error::invalid_spec(format!("{}: {}", id, e)))?;
        Ok(self.add(id, parsed))
    }

    /// Register every entity of a JSON object keyed by id
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSpec`] if `entities` is not an object or any entry
    /// is not a valid entity spec.
    pub fn add_entities_json(self, entities: serde_json::Value) -> Result<Self> {
        match entities {
            serde_json::Value::Object(entities) => entities
                .into_iter()
                .try_fold(self, |builder, (id, spec)| builder.add_json(id, spec)),
            other => Err(Error::invalid_spec(format!(
                "entity definitions must be an object keyed by id, got {}",
                Value::from(other).type_name()
            ))),
        }
    }

    /// Replace the store-level values
    pub fn values(mut self, values: Map) -> Self {
        self.values = values;
        self
    }

    /// Set one store-level value
    pub fn value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Install the collaborator schema entities validate with
    pub fn validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Compile every spec and freeze the store
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSpec`] for malformed definitions and duplicate ids
    /// - [`Error::Lookup`] for unknown entity types, in ids or in references
    pub fn build(self) -> Result<EntityStore> {
        let mut entities = HashMap::with_capacity(self.specs.len());
        for (id, spec) in self.specs {
            if entities.contains_key(&id) {
                return Err(Error::invalid_spec(format!(
                    "entity '{}' is defined more than once",
                    id
                )));
            }
            let entity = Entity::create(&id, spec)?;
            entities.insert(id, Arc::new(entity));
        }

        for entity in entities.values() {
            check_references(entity)?;
        }

        info!(target: "refract::store", count = entities.len(), "Entity store built");
        Ok(EntityStore {
            entities,
            values: Arc::new(Value::Object(self.values)),
            validator: self.validator,
        })
    }
}

/// Fail on references to entity types that do not exist
fn check_references(entity: &Entity) -> Result<()> {
    let mut unknown = None;
    entity.for_each_entity_ref(&mut |entity_ref| {
        if unknown.is_none() && EntityType::from_name(entity_ref.entity_type()).is_none() {
            unknown = Some(entity_ref.to_string());
        }
    });
    match unknown {
        Some(reference) => Err(Error::lookup(format!(
            "{}: reference to unknown entity type in '{}'",
            entity.id(),
            reference
        ))),
        None => Ok(()),
    }
}

impl fmt::Debug for StoreBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.specs.iter().map(|(id, _)| id.as_str()).collect();
        f.debug_struct("StoreBuilder")
            .field("specs", &ids)
            .field("values", &self.values)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}
