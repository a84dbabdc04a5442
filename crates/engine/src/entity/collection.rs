//! Collection entities: array composition
//!
//! Every per-element resolution of a step is dispatched at once and the
//! results are collected by index, so output order never depends on which
//! element finishes first. Nothing is cancelled: when one element fails the
//! others still run to completion and their results are discarded.
//!
//! `find` evaluates every element before choosing the first truthy one by
//! index.

use futures::future::join_all;
use refract_core::{Result, Value};

use super::{compile, resolve_value, type_guard, unsupported_modifier, Entity, Modifier};
use crate::accumulator::Accumulator;
use crate::reducer::Reducer;
use crate::resolve::resolve;
use crate::store::EntityStore;

const EXPECT_ARRAY: &str = "collection entities only process arrays";

/// A compiled collection compose step
#[derive(Debug, Clone)]
pub enum CollectionModifier {
    /// Replace every element with its result
    Map(Reducer),
    /// Keep elements whose result is truthy
    Filter(Reducer),
    /// First element whose result is truthy, `Undefined` if none
    Find(Reducer),
}

impl CollectionModifier {
    /// Step name used in error prefixes
    pub fn name(&self) -> &'static str {
        match self {
            CollectionModifier::Map(_) => "map",
            CollectionModifier::Filter(_) => "filter",
            CollectionModifier::Find(_) => "find",
        }
    }

    /// The per-element reducer
    pub fn reducer(&self) -> &Reducer {
        match self {
            CollectionModifier::Map(reducer)
            | CollectionModifier::Filter(reducer)
            | CollectionModifier::Find(reducer) => reducer,
        }
    }
}

/// Compose pipeline of a collection entity
#[derive(Debug, Clone, Default)]
pub struct CollectionEntity {
    compose: Vec<CollectionModifier>,
}

impl CollectionEntity {
    pub(crate) fn create(id: &str, modifiers: Vec<Modifier>) -> Result<Self> {
        let compose = modifiers
            .into_iter()
            .map(|modifier| match modifier {
                Modifier::Map(spec) => compile(id, "map", spec).map(CollectionModifier::Map),
                Modifier::Filter(spec) => compile(id, "filter", spec).map(CollectionModifier::Filter),
                Modifier::Find(spec) => compile(id, "find", spec).map(CollectionModifier::Find),
                other => Err(unsupported_modifier(id, &other)),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(CollectionEntity { compose })
    }

    /// Compose steps in order
    pub fn compose(&self) -> &[CollectionModifier] {
        &self.compose
    }
}

/// Resolve a collection entity: value, array guard, compose
pub(crate) async fn resolve_collection(
    store: &EntityStore,
    acc: Accumulator,
    entity: &Entity,
    collection: &CollectionEntity,
) -> Result<Accumulator> {
    let mut acc = resolve_value(store, acc, entity).await?;
    if !acc.value().is_array() {
        return Err(type_guard(entity.id(), acc.value(), EXPECT_ARRAY));
    }

    for modifier in collection.compose() {
        acc = apply(store, acc, entity, modifier)
            .await
            .map_err(|e| e.annotate(format!("{}.{}", entity.id(), modifier.name())))?;
    }
    Ok(acc)
}

async fn apply(
    store: &EntityStore,
    acc: Accumulator,
    entity: &Entity,
    modifier: &CollectionModifier,
) -> Result<Accumulator> {
    let reducer = modifier.reducer();
    if reducer.is_empty() {
        return Ok(acc);
    }

    // A previous `find` may have left a non-array value behind.
    let items = match acc.value() {
        Value::Array(items) => items.clone(),
        other => return Err(type_guard(entity.id(), other, EXPECT_ARRAY)),
    };
    let results = evaluate(store, &acc, &items, reducer).await?;

    let value = match modifier {
        CollectionModifier::Map(_) => Value::Array(results),
        CollectionModifier::Filter(_) => items
            .into_iter()
            .zip(results)
            .filter(|(_, keep)| keep.is_truthy())
            .map(|(item, _)| item)
            .collect(),
        CollectionModifier::Find(_) => items
            .into_iter()
            .zip(results)
            .find(|(_, matched)| matched.is_truthy())
            .map(|(item, _)| item)
            .unwrap_or_default(),
    };
    Ok(acc.with_value(value))
}

/// Resolve `reducer` once per element, results in element order
///
/// The first failing element by index decides the error.
async fn evaluate(
    store: &EntityStore,
    acc: &Accumulator,
    items: &[Value],
    reducer: &Reducer,
) -> Result<Vec<Value>> {
    join_all(
        items
            .iter()
            .map(|item| resolve(store, acc.with_value(item.clone()), reducer)),
    )
    .await
    .into_iter()
    .map(|result| result.map(Accumulator::into_value))
    .collect()
}
