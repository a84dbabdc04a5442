//! Hash entities: object composition
//!
//! The resolved `value` must be a plain object. Compose steps then run in
//! declared order, each one skipped when its operand is empty.
//!
//! | Step | Effect |
//! |------|--------|
//! | `mapKeys` | New object, one reducer per key, all against the same input |
//! | `addKeys` | Like `mapKeys`, merged into the current object |
//! | `addValues` | Static shallow merge |
//! | `omitKeys` | Drop the named keys |
//! | `pickKeys` | Keep only the named keys |

use futures::future::join_all;
use refract_core::{Map, Result, Value};

use super::{compile, resolve_value, type_guard, unsupported_modifier, Entity, Modifier};
use crate::accumulator::Accumulator;
use crate::reducer::{Reducer, ReducerSpec};
use crate::resolve::resolve;
use crate::store::EntityStore;

/// A compiled hash compose step
#[derive(Debug, Clone)]
pub enum HashModifier {
    /// Replace the value with the per-key results
    MapKeys(Vec<(String, Reducer)>),
    /// Merge the per-key results into the value
    AddKeys(Vec<(String, Reducer)>),
    /// Merge static values
    AddValues(Map),
    /// Remove keys
    OmitKeys(Vec<String>),
    /// Retain keys
    PickKeys(Vec<String>),
}

impl HashModifier {
    /// Step name used in error prefixes
    pub fn name(&self) -> &'static str {
        match self {
            HashModifier::MapKeys(_) => "mapKeys",
            HashModifier::AddKeys(_) => "addKeys",
            HashModifier::AddValues(_) => "addValues",
            HashModifier::OmitKeys(_) => "omitKeys",
            HashModifier::PickKeys(_) => "pickKeys",
        }
    }

    /// Reducers the step resolves
    pub fn reducers(&self) -> Vec<&Reducer> {
        match self {
            HashModifier::MapKeys(keys) | HashModifier::AddKeys(keys) => {
                keys.iter().map(|(_, reducer)| reducer).collect()
            }
            HashModifier::AddValues(_) | HashModifier::OmitKeys(_) | HashModifier::PickKeys(_) => {
                Vec::new()
            }
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            HashModifier::MapKeys(keys) | HashModifier::AddKeys(keys) => keys.is_empty(),
            HashModifier::AddValues(values) => values.is_empty(),
            HashModifier::OmitKeys(keys) | HashModifier::PickKeys(keys) => keys.is_empty(),
        }
    }
}

/// Compose pipeline of a hash entity
#[derive(Debug, Clone, Default)]
pub struct HashEntity {
    compose: Vec<HashModifier>,
}

impl HashEntity {
    pub(crate) fn create(id: &str, modifiers: Vec<Modifier>) -> Result<Self> {
        let compose = modifiers
            .into_iter()
            .map(|modifier| {
                let name = modifier.name();
                Ok(match modifier {
                    Modifier::MapKeys(keys) => HashModifier::MapKeys(compile_keys(id, name, keys)?),
                    Modifier::AddKeys(keys) => HashModifier::AddKeys(compile_keys(id, name, keys)?),
                    Modifier::AddValues(values) => HashModifier::AddValues(values),
                    Modifier::OmitKeys(keys) => HashModifier::OmitKeys(keys),
                    Modifier::PickKeys(keys) => HashModifier::PickKeys(keys),
                    other => return Err(unsupported_modifier(id, &other)),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(HashEntity { compose })
    }

    /// Compose steps in order
    pub fn compose(&self) -> &[HashModifier] {
        &self.compose
    }
}

fn compile_keys(
    id: &str,
    name: &str,
    keys: impl IntoIterator<Item = (String, ReducerSpec)>,
) -> Result<Vec<(String, Reducer)>> {
    keys.into_iter()
        .map(|(key, spec)| {
            let slot = format!("{}.{}", name, key);
            compile(id, &slot, spec).map(|reducer| (key, reducer))
        })
        .collect()
}

/// Resolve a hash entity: value, object guard, compose
pub(crate) async fn resolve_hash(
    store: &EntityStore,
    acc: Accumulator,
    entity: &Entity,
    hash: &HashEntity,
) -> Result<Accumulator> {
    let mut acc = resolve_value(store, acc, entity).await?;
    if !acc.value().is_object() {
        return Err(type_guard(
            entity.id(),
            acc.value(),
            "hash entities only process plain objects",
        ));
    }

    for modifier in hash.compose() {
        acc = apply(store, acc, modifier)
            .await
            .map_err(|e| e.annotate(format!("{}.{}", entity.id(), modifier.name())))?;
    }
    Ok(acc)
}

async fn apply(store: &EntityStore, acc: Accumulator, modifier: &HashModifier) -> Result<Accumulator> {
    if modifier.is_empty() {
        return Ok(acc);
    }

    let value = match modifier {
        HashModifier::MapKeys(keys) => map_keys(store, &acc, keys).await?,
        HashModifier::AddKeys(keys) => {
            let added = map_keys(store, &acc, keys).await?;
            let mut object = object_of(&acc);
            object.extend(added);
            object
        }
        HashModifier::AddValues(values) => {
            let mut object = object_of(&acc);
            object.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
            object
        }
        HashModifier::OmitKeys(keys) => {
            let mut object = object_of(&acc);
            for key in keys {
                object.remove(key);
            }
            object
        }
        HashModifier::PickKeys(keys) => {
            let mut object = object_of(&acc);
            object.retain(|key, _| keys.contains(key));
            object
        }
    };
    Ok(acc.with_value(Value::Object(value)))
}

/// Resolve every key against the same accumulator
///
/// All keys are dispatched together; none sees another key's result.
async fn map_keys(
    store: &EntityStore,
    acc: &Accumulator,
    keys: &[(String, Reducer)],
) -> Result<Map> {
    let results = join_all(keys.iter().map(|(_, reducer)| resolve(store, acc.clone(), reducer))).await;

    keys.iter()
        .zip(results)
        .map(|((key, _), result)| result.map(|resolved| (key.clone(), resolved.into_value())))
        .collect()
}

fn object_of(acc: &Accumulator) -> Map {
    acc.value().as_object().cloned().unwrap_or_default()
}
