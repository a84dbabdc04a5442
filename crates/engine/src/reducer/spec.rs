//! Raw reducer specifications
//!
//! [`ReducerSpec`] is what callers write; [`Reducer::create`](super::Reducer::create)
//! turns it into a [`Reducer`]. Specs coming from JSON are strings or
//! (nested) arrays of strings; specs built in Rust may also hold functions
//! and prebuilt reducers.

use std::fmt;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;

use super::{Reducer, ReducerFunction};

/// A raw reducer specification
#[derive(Clone)]
pub enum ReducerSpec {
    /// Path, entity reference or `|` chain
    Str(String),
    /// User-authored function
    Function(ReducerFunction),
    /// Ordered chain
    List(Vec<ReducerSpec>),
    /// Already built reducer
    Reducer(Reducer),
}

impl ReducerSpec {
    /// Whether the spec is an empty chain
    pub fn is_empty(&self) -> bool {
        matches!(self, ReducerSpec::List(list) if list.is_empty())
    }
}

impl fmt::Debug for ReducerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReducerSpec::Str(s) => write!(f, "{:?}", s),
            ReducerSpec::Function(function) => fmt::Debug::fmt(function, f),
            ReducerSpec::List(list) => f.debug_list().entries(list).finish(),
            ReducerSpec::Reducer(reducer) => fmt::Debug::fmt(reducer, f),
        }
    }
}

impl From<&str> for ReducerSpec {
    fn from(s: &str) -> Self {
        ReducerSpec::Str(s.to_string())
    }
}

impl From<String> for ReducerSpec {
    fn from(s: String) -> Self {
        ReducerSpec::Str(s)
    }
}

impl From<&String> for ReducerSpec {
    fn from(s: &String) -> Self {
        ReducerSpec::Str(s.clone())
    }
}

impl From<ReducerFunction> for ReducerSpec {
    fn from(function: ReducerFunction) -> Self {
        ReducerSpec::Function(function)
    }
}

impl From<Reducer> for ReducerSpec {
    fn from(reducer: Reducer) -> Self {
        ReducerSpec::Reducer(reducer)
    }
}

impl<T: Into<ReducerSpec>> From<Vec<T>> for ReducerSpec {
    fn from(list: Vec<T>) -> Self {
        ReducerSpec::List(list.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ReducerSpec>, const N: usize> From<[T; N]> for ReducerSpec {
    fn from(list: [T; N]) -> Self {
        ReducerSpec::List(list.into_iter().map(Into::into).collect())
    }
}

impl<'de> Deserialize<'de> for ReducerSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SpecVisitor;

        impl<'de> Visitor<'de> for SpecVisitor {
            type Value = ReducerSpec;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a reducer string or an array of reducers")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ReducerSpec, E> {
                Ok(ReducerSpec::Str(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<ReducerSpec, E> {
                Ok(ReducerSpec::Str(v))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ReducerSpec, A::Error> {
                let mut list = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(item) = seq.next_element::<ReducerSpec>()? {
                    list.push(item);
                }
                Ok(ReducerSpec::List(list))
            }
        }

        deserializer.deserialize_any(SpecVisitor)
    }
}
