//! Raw entity specifications
//!
//! An [`EntitySpec`] is either built in Rust with the builder methods or
//! deserialized from JSON:
//!
//! ```json
//! {
//!   "value": "$person",
//!   "compose": [
//!     { "mapKeys": { "fullName": "$name", "age": "$age" } },
//!     { "omitKeys": ["age"] }
//!   ],
//!   "error": "$..locals.fallback"
//! }
//! ```
//!
//! Modifiers may also be written as top-level shorthand keys
//! (`"mapKeys": {...}` next to `"value"`). Shorthand and `compose` cannot be
//! mixed, since the order would be ambiguous. Shorthand keys run in a fixed
//! order: `mapKeys`, `omitKeys`, `pickKeys`, `addKeys`, `addValues`, `map`,
//! `filter`, `find`.

use std::collections::BTreeMap;

use refract_core::{Map, Value};
use serde::Deserialize;

use crate::reducer::ReducerSpec;

/// One compose step as written by the caller
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Modifier {
    /// Replace the value with a new object, one reducer per key
    MapKeys(BTreeMap<String, ReducerSpec>),
    /// Merge reducer-computed keys into the value
    AddKeys(BTreeMap<String, ReducerSpec>),
    /// Merge static values into the value
    AddValues(Map),
    /// Remove keys from the value
    OmitKeys(Vec<String>),
    /// Keep only the named keys
    PickKeys(Vec<String>),
    /// Transform every element
    Map(ReducerSpec),
    /// Keep elements with a truthy result
    Filter(ReducerSpec),
    /// First element with a truthy result
    Find(ReducerSpec),
}

impl Modifier {
    /// Name used in definitions and error prefixes
    pub fn name(&self) -> &'static str {
        match self {
            Modifier::MapKeys(_) => "mapKeys",
            Modifier::AddKeys(_) => "addKeys",
            Modifier::AddValues(_) => "addValues",
            Modifier::OmitKeys(_) => "omitKeys",
            Modifier::PickKeys(_) => "pickKeys",
            Modifier::Map(_) => "map",
            Modifier::Filter(_) => "filter",
            Modifier::Find(_) => "find",
        }
    }
}

/// Raw definition of one entity
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "RawEntitySpec")]
pub struct EntitySpec {
    /// Produces the entity's base value; identity when absent
    pub value: Option<ReducerSpec>,
    /// Runs before `value`
    pub before: Option<ReducerSpec>,
    /// Runs after compose
    pub after: Option<ReducerSpec>,
    /// Recovery hook
    pub error: Option<ReducerSpec>,
    /// Compose steps in order
    pub compose: Vec<Modifier>,
    /// Schema entities only
    pub schema: Option<Value>,
    /// Schema entities only
    pub options: Option<Value>,
    /// Log and report the accumulator when the entity is entered
    pub inspect: bool,
}

impl EntitySpec {
    /// Empty spec: identity value, no hooks, no compose
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `value` reducer
    pub fn value(mut self, spec: impl Into<ReducerSpec>) -> Self {
        self.value = Some(spec.into());
        self
    }

    /// Set the `before` hook
    pub fn before(mut self, spec: impl Into<ReducerSpec>) -> Self {
        self.before = Some(spec.into());
        self
    }

    /// Set the `after` hook
    pub fn after(mut self, spec: impl Into<ReducerSpec>) -> Self {
        self.after = Some(spec.into());
        self
    }

    /// Set the `error` hook
    pub fn error(mut self, spec: impl Into<ReducerSpec>) -> Self {
        self.error = Some(spec.into());
        self
    }

    /// Append a compose step
    pub fn compose(mut self, modifier: Modifier) -> Self {
        self.compose.push(modifier);
        self
    }

    /// Append a `mapKeys` step
    pub fn map_keys<K, S>(self, keys: impl IntoIterator<Item = (K, S)>) -> Self
    where
        K: Into<String>,
        S: Into<ReducerSpec>,
    {
        self.compose(Modifier::MapKeys(key_specs(keys)))
    }

    /// Append an `addKeys` step
    pub fn add_keys<K, S>(self, keys: impl IntoIterator<Item = (K, S)>) -> Self
    where
        K: Into<String>,
        S: Into<ReducerSpec>,
    {
        self.compose(Modifier::AddKeys(key_specs(keys)))
    }

    /// Append an `addValues` step
    pub fn add_values<K, V>(self, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.compose(Modifier::AddValues(values))
    }

    /// Append an `omitKeys` step
    pub fn omit_keys<K: Into<String>>(self, keys: impl IntoIterator<Item = K>) -> Self {
        self.compose(Modifier::OmitKeys(keys.into_iter().map(Into::into).collect()))
    }

    /// Append a `pickKeys` step
    pub fn pick_keys<K: Into<String>>(self, keys: impl IntoIterator<Item = K>) -> Self {
        self.compose(Modifier::PickKeys(keys.into_iter().map(Into::into).collect()))
    }

    /// Append a `map` step
    pub fn map(self, spec: impl Into<ReducerSpec>) -> Self {
        self.compose(Modifier::Map(spec.into()))
    }

    /// Append a `filter` step
    pub fn filter(self, spec: impl Into<ReducerSpec>) -> Self {
        self.compose(Modifier::Filter(spec.into()))
    }

    /// Append a `find` step
    pub fn find(self, spec: impl Into<ReducerSpec>) -> Self {
        self.compose(Modifier::Find(spec.into()))
    }

    /// Set the schema payload
    pub fn schema(mut self, schema: impl Into<Value>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the schema options payload
    pub fn options(mut self, options: impl Into<Value>) -> Self {
        self.options = Some(options.into());
        self
    }

    /// Enable accumulator inspection
    pub fn inspect(mut self, inspect: bool) -> Self {
        self.inspect = inspect;
        self
    }
}

fn key_specs<K, S>(keys: impl IntoIterator<Item = (K, S)>) -> BTreeMap<String, ReducerSpec>
where
    K: Into<String>,
    S: Into<ReducerSpec>,
{
    keys.into_iter().map(|(k, s)| (k.into(), s.into())).collect()
}

// ============================================================================
// JSON form
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawEntitySpec {
    value: Option<ReducerSpec>,
    before: Option<ReducerSpec>,
    after: Option<ReducerSpec>,
    error: Option<ReducerSpec>,
    compose: Option<Vec<Modifier>>,
    map_keys: Option<BTreeMap<String, ReducerSpec>>,
    omit_keys: Option<Vec<String>>,
    pick_keys: Option<Vec<String>>,
    add_keys: Option<BTreeMap<String, ReducerSpec>>,
    add_values: Option<Map>,
    map: Option<ReducerSpec>,
    filter: Option<ReducerSpec>,
    find: Option<ReducerSpec>,
    schema: Option<Value>,
    options: Option<Value>,
    #[serde(default)]
    inspect: bool,
}

impl TryFrom<RawEntitySpec> for EntitySpec {
    type Error = String;

    fn try_from(raw: RawEntitySpec) -> Result<Self, Self::Error> {
        let shorthand: Vec<Modifier> = [
            raw.map_keys.map(Modifier::MapKeys),
            raw.omit_keys.map(Modifier::OmitKeys),
            raw.pick_keys.map(Modifier::PickKeys),
            raw.add_keys.map(Modifier::AddKeys),
            raw.add_values.map(Modifier::AddValues),
            raw.map.map(Modifier::Map),
            raw.filter.map(Modifier::Filter),
            raw.find.map(Modifier::Find),
        ]
        .into_iter()
        .flatten()
        .collect();

        let compose = match (raw.compose, shorthand.is_empty()) {
            (Some(_), false) => {
                let names: Vec<&str> = shorthand.iter().map(Modifier::name).collect();
                return Err(format!(
                    "'compose' cannot be combined with shorthand modifiers ({})",
                    names.join(", ")
                ));
            }
            (Some(compose), true) => compose,
            (None, _) => shorthand,
        };

        Ok(EntitySpec {
            value: raw.value,
            before: raw.before,
            after: raw.after,
            error: raw.error,
            compose,
            schema: raw.schema,
            options: raw.options,
            inspect: raw.inspect,
        })
    }
}
