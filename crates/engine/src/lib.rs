//! Reducer resolution engine for Refract
//!
//! This crate turns declarative reducers into results:
//! - Accumulator: the value-plus-context record every reducer receives
//! - Reducers: paths, functions, chains and entity references
//! - Entities: entry, hash, collection and schema definitions
//! - EntityStore: the immutable registry entities are resolved from
//! - transform / resolve: the async dispatcher and entity lifecycle
//!
//! Everything here is pure computation over values. Logging goes through
//! `tracing` under the `refract::*` targets.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accumulator;
pub mod entity;
mod inspect;
pub mod reducer;
pub mod resolve;
pub mod store;
pub mod transform;

pub use accumulator::{Accumulator, InspectFn, Params};
pub use entity::{
    CollectionEntity, CollectionModifier, Entity, EntityKind, EntitySpec, EntityType, HashEntity,
    HashModifier, Modifier, SchemaEntity, SchemaValidator, ValidationOutcome,
};
pub use reducer::{
    resolve_object_path, resolve_path, EntityRef, Next, Reducer, ReducerFunction, ReducerSpec,
};
pub use resolve::resolve;
pub use store::{EntityStore, StoreBuilder};
pub use transform::{transform, TransformOptions};

pub use refract_core::{Error, ErrorKind, Map, Result, Value};
