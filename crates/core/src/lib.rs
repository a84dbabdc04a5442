//! Core types for Refract
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: Dynamic value model with a distinct `Undefined`
//! - Error: Error taxonomy shared by every layer
//! - Path: Minimal path grammar used by path reducers (ReducerPath, PathSegment)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod path;
pub mod value;

pub use error::{Error, ErrorKind, Result};
pub use path::{
    get_at_path, get_segment, PathParseError, PathRoot, PathSegment, ReducerPath, MAX_PATH_LENGTH,
};
pub use value::{Map, Value};
