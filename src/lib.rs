//! Refract - declarative, async data transformation
//!
//! Callers register named entities (reusable transform definitions) in an
//! [`EntityStore`] and compose them into reducers that turn an input value
//! into a derived output value.
//!
//! # Quick Start
//!
//! ```ignore
//! use refract::{EntitySpec, EntityStore, TransformOptions, Value};
//!
//! let store = EntityStore::builder()
//!     .add("hash:user", EntitySpec::new().value("$user").pick_keys(["name", "email"]))
//!     .build()?;
//!
//! let acc = store.transform("hash:user", input, TransformOptions::default()).await?;
//! println!("{}", acc.value());
//! ```
//!
//! # Architecture
//!
//! `refract-core` holds the value model, the error taxonomy and the path
//! grammar. `refract-engine` holds the accumulator, reducers, entities, the
//! store and the async resolution engine. Everything public is re-exported
//! here.

pub use refract_core::path;
pub use refract_engine::*;
