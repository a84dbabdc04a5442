//! Path grammar for path reducers
//!
//! This module defines the minimal query grammar used by path reducers:
//! - ReducerPath: Parsed path (root selector, segments, collection marker)
//! - PathSegment: Individual path component (Key or Index)
//! - PathRoot: Whether resolution starts at the value or the accumulator
//!
//! # Path Syntax
//!
//! | Syntax | Meaning | Example |
//! |--------|---------|---------|
//! | (empty) or `.` | Identity | `.` |
//! | `key` | Object property | `user` |
//! | `[n]` | Array index | `items[0]` |
//! | `a.b[n].c` | Nested access | `user.tags[1].name` |
//! | `..` prefix | Read from the accumulator record | `..locals.a[0]` |
//! | trailing `[]` | Map the path over every element | `a.b.c[]` |
//!
//! The collection marker is only valid at the very end of a path.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum path length in segments (256 segments)
pub const MAX_PATH_LENGTH: usize = 256;

/// Error type for path parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathParseError {
    /// Empty key in path
    #[error("empty key in path at position {0}")]
    EmptyKey(usize),
    /// Unclosed bracket
    #[error("unclosed bracket starting at position {0}")]
    UnclosedBracket(usize),
    /// Invalid array index
    #[error("invalid array index at position {0}: {1}")]
    InvalidIndex(usize, String),
    /// Unexpected character
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    /// `[]` somewhere other than the end of the path
    #[error("collection marker '[]' must end the path (found at position {0})")]
    MisplacedCollectionMarker(usize),
    /// Too many segments
    #[error("path has {0} segments, maximum is {MAX_PATH_LENGTH}")]
    TooLong(usize),
}

/// A segment in a path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Object key: `.foo`
    Key(String),
    /// Array index: `[0]`
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, ".{}", k),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// Where path resolution starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PathRoot {
    /// Start at `accumulator.value`
    #[default]
    Value,
    /// Start at the accumulator record (`value`, `locals`, `params`, ...)
    Accumulator,
}

/// A parsed path
///
/// # Examples
///
/// ```
/// use refract_core::path::{PathRoot, PathSegment, ReducerPath};
///
/// let path: ReducerPath = "..locals.a[0]".parse().unwrap();
/// assert_eq!(path.root(), PathRoot::Accumulator);
/// assert_eq!(
///     path.segments(),
///     &[PathSegment::Key("locals".into()), PathSegment::Key("a".into()), PathSegment::Index(0)]
/// );
///
/// let mapped: ReducerPath = "a.b.c[]".parse().unwrap();
/// assert!(mapped.is_collection());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ReducerPath {
    raw: String,
    root: PathRoot,
    segments: Vec<PathSegment>,
    collection: bool,
}

impl ReducerPath {
    /// The identity path (`.`)
    pub fn identity() -> Self {
        ReducerPath {
            raw: ".".to_string(),
            ..ReducerPath::default()
        }
    }

    /// Parse a path string
    pub fn parse(s: &str) -> Result<Self, PathParseError> {
        s.parse()
    }

    /// The text this path was parsed from
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Resolution root
    pub fn root(&self) -> PathRoot {
        self.root
    }

    /// Segments after the root selector and before the collection marker
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Whether the path ends with the `[]` collection marker
    pub fn is_collection(&self) -> bool {
        self.collection
    }

    /// Whether this path returns `accumulator.value` unchanged
    pub fn is_identity(&self) -> bool {
        self.root == PathRoot::Value && self.segments.is_empty() && !self.collection
    }
}

impl FromStr for ReducerPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "." {
            return Ok(ReducerPath {
                raw: s.to_string(),
                ..ReducerPath::default()
            });
        }

        let (root, offset) = if s.starts_with("..") {
            (PathRoot::Accumulator, 2)
        } else {
            (PathRoot::Value, 0)
        };

        let mut body = &s[offset..];
        let mut collection = false;
        if let Some(stripped) = body.strip_suffix("[]") {
            body = stripped;
            collection = true;
        }

        let segments = parse_segments(body, offset)?;
        if segments.len() > MAX_PATH_LENGTH {
            return Err(PathParseError::TooLong(segments.len()));
        }

        Ok(ReducerPath {
            raw: s.to_string(),
            root,
            segments,
            collection,
        })
    }
}

/// Parse `a.b[0].c` style segments; `offset` shifts reported positions
fn parse_segments(s: &str, offset: usize) -> Result<Vec<PathSegment>, PathParseError> {
    let mut segments = Vec::new();
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;

    // Skip leading dot if present
    if i < chars.len() && chars[i] == '.' {
        i += 1;
    }

    while i < chars.len() {
        if chars[i] == '.' {
            i += 1;
            if i >= chars.len() || chars[i] == '.' {
                return Err(PathParseError::EmptyKey(offset + i));
            }
        }

        if chars[i] == '[' {
            let start = i;
            i += 1;
            let idx_start = i;

            while i < chars.len() && chars[i] != ']' {
                i += 1;
            }

            if i >= chars.len() {
                return Err(PathParseError::UnclosedBracket(offset + start));
            }

            let idx_str: String = chars[idx_start..i].iter().collect();
            if idx_str.is_empty() {
                return Err(PathParseError::MisplacedCollectionMarker(offset + start));
            }
            let idx = idx_str
                .parse::<usize>()
                .map_err(|_| PathParseError::InvalidIndex(offset + idx_start, idx_str))?;

            segments.push(PathSegment::Index(idx));
            i += 1; // Skip closing bracket
        } else if is_key_char(chars[i]) {
            let key_start = i;
            while i < chars.len() && is_key_char(chars[i]) {
                i += 1;
            }
            let key: String = chars[key_start..i].iter().collect();
            segments.push(PathSegment::Key(key));
        } else {
            return Err(PathParseError::UnexpectedChar(chars[i], offset + i));
        }
    }

    Ok(segments)
}

fn is_key_char(c: char) -> bool {
    !matches!(c, '.' | '[' | ']') && !c.is_whitespace()
}

impl fmt::Display for ReducerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Look up one segment on a value
///
/// Lookups are lenient the way nested JSON access usually is: a numeric
/// key indexes an array, and an index on an object reads the key with the
/// same digits.
pub fn get_segment<'a>(value: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
    match (segment, value) {
        (PathSegment::Key(key), Value::Object(obj)) => obj.get(key),
        (PathSegment::Key(key), Value::Array(arr)) => {
            key.parse::<usize>().ok().and_then(|idx| arr.get(idx))
        }
        (PathSegment::Index(idx), Value::Array(arr)) => arr.get(*idx),
        (PathSegment::Index(idx), Value::Object(obj)) => obj.get(&idx.to_string()),
        _ => None,
    }
}

/// Get the value at a segment list, `None` if any step is missing
pub fn get_at_path<'a>(value: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    let mut current = value;
    for segment in segments {
        current = get_segment(current, segment)?;
    }
    Some(current)
}
