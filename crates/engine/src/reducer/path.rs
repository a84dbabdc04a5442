//! Path reducer resolution
//!
//! Paths are pure reads; they never suspend and never fail once parsed.
//! Missing leaves resolve to `Undefined`. A collection marker applied to
//! something that is not an array resolves to `Null`.

use refract_core::{get_at_path, Error, PathRoot, PathSegment, ReducerPath, Result, Value};

use crate::accumulator::Accumulator;

/// Resolve a path string against an accumulator
///
/// # Errors
///
/// [`Error::InvalidSpec`] if `path` does not parse.
pub fn resolve_object_path(acc: &Accumulator, path: &str) -> Result<Value> {
    let parsed = ReducerPath::parse(path)
        .map_err(|e| Error::invalid_spec(format!("invalid path '{}': {}", path, e)))?;
    Ok(resolve_path(acc, &parsed))
}

/// Resolve an already parsed path against an accumulator
pub fn resolve_path(acc: &Accumulator, path: &ReducerPath) -> Value {
    let segments = path.segments();
    let collection = path.is_collection();
    match path.root() {
        PathRoot::Value => resolve_from(acc.value(), segments, collection),
        PathRoot::Accumulator => match segments.split_first() {
            None => resolve_from(&acc.to_record(), &[], collection),
            Some((PathSegment::Key(field), rest)) => match acc.field(field) {
                Some(root) => resolve_from(&root, rest, collection),
                None => missing(collection),
            },
            Some((PathSegment::Index(_), _)) => missing(collection),
        },
    }
}

fn resolve_from(root: &Value, segments: &[PathSegment], collection: bool) -> Value {
    if !collection {
        return get_at_path(root, segments).cloned().unwrap_or_default();
    }
    match root {
        Value::Array(items) => items
            .iter()
            .map(|item| get_at_path(item, segments).cloned().unwrap_or_default())
            .collect(),
        _ => Value::Null,
    }
}

fn missing(collection: bool) -> Value {
    if collection {
        Value::Null
    } else {
        Value::Undefined
    }
}
