//! The resolution engine
//!
//! [`resolve`] dispatches on the reducer variant:
//!
//! | Variant | Result value |
//! |---------|--------------|
//! | Path | The leaf the path reads |
//! | Function | What the function returns, or the accumulator it returns |
//! | List | The last step's value; steps run strictly in order |
//! | Entity | The entity lifecycle's value |
//!
//! # Entity lifecycle
//!
//! 1. `before`, failures prefixed `<id>.before`
//! 2. `value` and the type-specific compose pipeline
//! 3. `after`, failures prefixed `<id>.after`
//! 4. On any failure, the `error` hook runs with the failure attached. A
//!    defined result recovers; `Undefined` lets the original failure
//!    through; a failing hook yields [`Error::RecoveryExhausted`].
//!
//! The returned future is boxed: resolution recurses through entities,
//! lists and compose steps, and every per-element or per-key branch is an
//! independent future.

use std::time::Instant;

use futures::future::{join_all, BoxFuture, FutureExt};
use refract_core::{Error, Result, Value};
use tracing::{debug, info};

use crate::accumulator::Accumulator;
use crate::entity::collection::resolve_collection;
use crate::entity::hash::resolve_hash;
use crate::entity::schema::resolve_schema;
use crate::entity::{resolve_value, Entity, EntityKind};
use crate::inspect::inspect;
use crate::reducer::{resolve_path, EntityRef, Reducer};
use crate::store::EntityStore;

/// Resolve `reducer` against `acc`, producing a new accumulator
pub fn resolve<'a>(
    store: &'a EntityStore,
    acc: Accumulator,
    reducer: &'a Reducer,
) -> BoxFuture<'a, Result<Accumulator>> {
    async move {
        match reducer {
            Reducer::Path(path) => {
                let value = resolve_path(&acc, path);
                Ok(acc.with_value(value))
            }
            Reducer::Function(function) => function.apply(acc).await,
            Reducer::List(steps) => {
                let mut acc = acc;
                for step in steps.iter() {
                    acc = resolve(store, acc, step).await?;
                }
                Ok(acc)
            }
            Reducer::Entity(entity_ref) => resolve_entity_ref(store, acc, reducer, entity_ref).await,
        }
    }
    .boxed()
}

async fn resolve_entity_ref(
    store: &EntityStore,
    acc: Accumulator,
    reducer: &Reducer,
    entity_ref: &EntityRef,
) -> Result<Accumulator> {
    let entity = store.get(entity_ref.id())?;
    if !entity_ref.is_collection() {
        return resolve_entity(store, acc, reducer, entity).await;
    }

    let items = match acc.value() {
        Value::Array(items) => items.clone(),
        _ => return Ok(acc.with_value(Value::Null)),
    };
    let values = join_all(
        items
            .into_iter()
            .map(|item| resolve_entity(store, acc.with_value(item), reducer, entity)),
    )
    .await
    .into_iter()
    .map(|result| result.map(Accumulator::into_value))
    .collect::<Result<Vec<_>>>()?;
    Ok(acc.with_value(Value::Array(values)))
}

async fn resolve_entity(
    store: &EntityStore,
    acc: Accumulator,
    reducer: &Reducer,
    entity: &Entity,
) -> Result<Accumulator> {
    let started = Instant::now();
    let trace = acc.params().trace();
    let outer = acc.reducer().cloned();
    let acc = acc.with_reducer(Some(reducer.clone()));

    debug!(target: "refract::resolve", entity = %entity.id(), "Entering entity");
    if entity.inspects() {
        inspect(&acc);
    }

    let result = match run_lifecycle(store, acc.clone(), entity).await {
        Ok(resolved) => Ok(resolved),
        Err(error) => recover(store, acc, entity, error).await,
    };

    if trace {
        info!(
            target: "refract::trace",
            entity = %entity.id(),
            elapsed_us = started.elapsed().as_micros() as u64,
            ok = result.is_ok(),
            "Entity resolved"
        );
    }
    result.map(|resolved| resolved.with_reducer(outer))
}

async fn run_lifecycle(store: &EntityStore, acc: Accumulator, entity: &Entity) -> Result<Accumulator> {
    let acc = match entity.before() {
        Some(before) => resolve(store, acc, before)
            .await
            .map_err(|e| e.annotate(format!("{}.before", entity.id())))?,
        None => acc,
    };

    let acc = match entity.kind() {
        EntityKind::Entry => resolve_value(store, acc, entity).await?,
        EntityKind::Hash(hash) => resolve_hash(store, acc, entity, hash).await?,
        EntityKind::Collection(collection) => {
            resolve_collection(store, acc, entity, collection).await?
        }
        EntityKind::Schema(schema) => resolve_schema(store, acc, entity, schema).await?,
    };

    match entity.after() {
        Some(after) => resolve(store, acc, after)
            .await
            .map_err(|e| e.annotate(format!("{}.after", entity.id()))),
        None => Ok(acc),
    }
}

/// Give the entity's `error` hook a chance to replace a failure
///
/// The hook sees the accumulator the entity was entered with, plus the
/// failure.
async fn recover(
    store: &EntityStore,
    acc: Accumulator,
    entity: &Entity,
    error: Error,
) -> Result<Accumulator> {
    let Some(hook) = entity.error() else {
        debug!(target: "refract::resolve", entity = %entity.id(), error = %error, "Entity failed");
        return Err(error);
    };

    match resolve(store, acc.with_error(error.clone()), hook).await {
        Ok(recovered) if !recovered.value().is_undefined() => {
            debug!(target: "refract::resolve", entity = %entity.id(), error = %error, "Entity recovered");
            Ok(recovered.without_error())
        }
        Ok(_) => {
            debug!(target: "refract::resolve", entity = %entity.id(), error = %error, "Error hook declined");
            Err(error)
        }
        Err(hook_error) => {
            debug!(target: "refract::resolve", entity = %entity.id(), error = %hook_error, "Error hook failed");
            Err(Error::recovery_exhausted(
                format!("{}.error {}", entity.id(), hook_error.message()),
                error,
            ))
        }
    }
}
