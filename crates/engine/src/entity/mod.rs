//! Entities: named, reusable transform definitions
//!
//! This module defines:
//! - Entity: a compiled definition (`value`, lifecycle hooks, kind payload)
//! - EntityType: the closed set of supported entity types
//! - EntityKind: the type-specific payload and compose pipeline
//!
//! Entities are compiled once from an [`EntitySpec`] when the store is built
//! and never change afterward. Resolution only ever produces new
//! accumulators.

pub mod collection;
pub mod hash;
pub mod schema;
pub mod spec;

use std::fmt;

use refract_core::{Error, Result, Value};

use crate::accumulator::Accumulator;
use crate::reducer::{split_id, EntityRef, Reducer, ReducerSpec};
use crate::resolve::resolve;
use crate::store::EntityStore;

pub use collection::{CollectionEntity, CollectionModifier};
pub use hash::{HashEntity, HashModifier};
pub use schema::{SchemaEntity, SchemaValidator, ValidationOutcome};
pub use spec::{EntitySpec, Modifier};

/// Characters of the offending value shown in type-guard messages
pub const INSPECT_CHARS: usize = 15;

// ============================================================================
// Entity types
// ============================================================================

/// Supported entity types, the part of an id before the colon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    /// `entry:<name>`: value and lifecycle hooks only
    Entry,
    /// `hash:<name>`: object composition
    Hash,
    /// `collection:<name>`: array composition
    Collection,
    /// `schema:<name>`: value plus a frozen schema for a validator
    Schema,
}

impl EntityType {
    /// Every supported type
    pub const ALL: [EntityType; 4] = [
        EntityType::Entry,
        EntityType::Hash,
        EntityType::Collection,
        EntityType::Schema,
    ];

    /// Look up a type by its id prefix
    pub fn from_name(name: &str) -> Option<Self> {
        EntityType::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Id prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Entry => "entry",
            EntityType::Hash => "hash",
            EntityType::Collection => "collection",
            EntityType::Schema => "schema",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific payload of an entity
#[derive(Debug, Clone)]
pub enum EntityKind {
    /// No payload
    Entry,
    /// Object compose pipeline
    Hash(HashEntity),
    /// Array compose pipeline
    Collection(CollectionEntity),
    /// Frozen schema and options
    Schema(SchemaEntity),
}

// ============================================================================
// Entity
// ============================================================================

/// A compiled entity definition
#[derive(Debug, Clone)]
pub struct Entity {
    id: String,
    entity_type: EntityType,
    name: String,
    value: Reducer,
    before: Option<Reducer>,
    after: Option<Reducer>,
    error: Option<Reducer>,
    inspect: bool,
    kind: EntityKind,
}

impl Entity {
    /// Compile a raw spec registered under `id`
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSpec`] for a malformed id, a reducer outside the
    ///   grammar, a modifier the type does not support, or a schema/options
    ///   payload on the wrong type or with the wrong shape
    /// - [`Error::Lookup`] for an unknown entity type
    pub fn create(id: &str, spec: EntitySpec) -> Result<Entity> {
        let (type_name, name) = split_id(id).ok_or_else(|| {
            Error::invalid_spec(format!("invalid entity id '{}': expected 'type:name'", id))
        })?;
        let entity_type = EntityType::from_name(type_name).ok_or_else(|| {
            Error::lookup(format!("unknown entity type '{}' in '{}'", type_name, id))
        })?;

        if entity_type != EntityType::Schema && (spec.schema.is_some() || spec.options.is_some()) {
            return Err(Error::invalid_spec(format!(
                "{}: 'schema' and 'options' are only supported by schema entities",
                id
            )));
        }

        let kind = match entity_type {
            EntityType::Entry => {
                reject_compose(id, &spec.compose)?;
                EntityKind::Entry
            }
            EntityType::Hash => EntityKind::Hash(HashEntity::create(id, spec.compose)?),
            EntityType::Collection => {
                EntityKind::Collection(CollectionEntity::create(id, spec.compose)?)
            }
            EntityType::Schema => {
                reject_compose(id, &spec.compose)?;
                EntityKind::Schema(SchemaEntity::create(id, spec.schema, spec.options)?)
            }
        };

        Ok(Entity {
            id: id.to_string(),
            entity_type,
            name: name.to_string(),
            value: match spec.value {
                Some(value) => compile(id, "value", value)?,
                None => Reducer::identity(),
            },
            before: compile_hook(id, "before", spec.before)?,
            after: compile_hook(id, "after", spec.after)?,
            error: compile_hook(id, "error", spec.error)?,
            inspect: spec.inspect,
            kind,
        })
    }

    /// Store key, `type:name`
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Entity type
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Name part of the id
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `value` reducer
    pub fn value(&self) -> &Reducer {
        &self.value
    }

    /// The `before` hook
    pub fn before(&self) -> Option<&Reducer> {
        self.before.as_ref()
    }

    /// The `after` hook
    pub fn after(&self) -> Option<&Reducer> {
        self.after.as_ref()
    }

    /// The `error` hook
    pub fn error(&self) -> Option<&Reducer> {
        self.error.as_ref()
    }

    /// Whether entering the entity inspects the accumulator
    pub fn inspects(&self) -> bool {
        self.inspect
    }

    /// Type-specific payload
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// Call `visit` for every entity reference in this definition
    pub fn for_each_entity_ref<'a>(&'a self, visit: &mut dyn FnMut(&'a EntityRef)) {
        let hooks = [&self.before, &self.after, &self.error];
        self.value.for_each_entity_ref(visit);
        for hook in hooks.into_iter().flatten() {
            hook.for_each_entity_ref(visit);
        }
        match &self.kind {
            EntityKind::Hash(hash) => {
                for reducer in hash.compose().iter().flat_map(HashModifier::reducers) {
                    reducer.for_each_entity_ref(visit);
                }
            }
            EntityKind::Collection(collection) => {
                for modifier in collection.compose() {
                    modifier.reducer().for_each_entity_ref(visit);
                }
            }
            EntityKind::Entry | EntityKind::Schema(_) => {}
        }
    }
}

/// Build a reducer for one slot of an entity, prefixing failures with `<id>.<slot>`
pub(crate) fn compile(id: &str, slot: &str, spec: ReducerSpec) -> Result<Reducer> {
    Reducer::create(spec).map_err(|e| e.annotate(format!("{}.{}", id, slot)))
}

fn compile_hook(id: &str, slot: &str, spec: Option<ReducerSpec>) -> Result<Option<Reducer>> {
    spec.map(|spec| compile(id, slot, spec)).transpose()
}

fn reject_compose(id: &str, compose: &[Modifier]) -> Result<()> {
    match compose.first() {
        Some(modifier) => Err(unsupported_modifier(id, modifier)),
        None => Ok(()),
    }
}

pub(crate) fn unsupported_modifier(id: &str, modifier: &Modifier) -> Error {
    Error::invalid_spec(format!(
        "{}: modifier '{}' is not supported by this entity type",
        id,
        modifier.name()
    ))
}

// ============================================================================
// Shared resolution helpers
// ============================================================================

/// Resolve the entity's `value` reducer, prefixing failures with `<id>.value`
pub(crate) async fn resolve_value(
    store: &EntityStore,
    acc: Accumulator,
    entity: &Entity,
) -> Result<Accumulator> {
    resolve(store, acc, entity.value())
        .await
        .map_err(|e| e.annotate(format!("{}.value", entity.id())))
}

/// Type error for a value of the wrong shape
pub(crate) fn type_guard(id: &str, value: &Value, expectation: &str) -> Error {
    Error::type_error(format!(
        "\"{}\" received value {} of type {}; {}",
        id,
        value.inspect(INSPECT_CHARS),
        value.type_name(),
        expectation
    ))
}
