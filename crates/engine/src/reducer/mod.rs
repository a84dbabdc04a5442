//! Reducers: the tagged computation units resolved by the engine
//!
//! A [`Reducer`] is built once from a [`ReducerSpec`] by [`Reducer::create`]
//! and is immutable afterward. Cloning is cheap: every variant holds its
//! payload behind an `Arc`.
//!
//! # String grammar
//!
//! | Spec | Reducer |
//! |------|---------|
//! | `$a.b[0]` | Path `a.b[0]` |
//! | `$` or `$.` | Path identity |
//! | `$..locals.x` | Path rooted at the accumulator record |
//! | `hash:person` | Entity reference |
//! | `hash:person[]` | Entity reference mapped over an array value |
//! | `$items \| collection:names` | List of the two |

pub mod function;
pub mod path;
pub mod spec;

use std::fmt;
use std::sync::Arc;

use refract_core::{Error, ReducerPath, Result};

pub use function::{Next, ReducerFunction};
pub use path::{resolve_object_path, resolve_path};
pub use spec::ReducerSpec;

/// Separator for chains written inside one string
pub const CHAIN_SEPARATOR: char = '|';

// ============================================================================
// Entity references
// ============================================================================

/// A lazily resolved reference to an entity in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    entity_type: String,
    name: String,
    id: String,
    collection: bool,
}

impl EntityRef {
    /// Parse `type:name` or `type:name[]`
    pub fn parse(spec: &str) -> Result<Self> {
        let (body, collection) = match spec.strip_suffix("[]") {
            Some(body) => (body, true),
            None => (spec, false),
        };
        let (entity_type, name) = split_id(body).ok_or_else(|| invalid_reducer(spec))?;
        Ok(EntityRef {
            entity_type: entity_type.to_string(),
            name: name.to_string(),
            id: body.to_string(),
            collection,
        })
    }

    /// Store key, `type:name`
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Entity type part of the id
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Name part of the id
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the entity is mapped over each element of an array value
    pub fn is_collection(&self) -> bool {
        self.collection
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)?;
        if self.collection {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

/// Split an entity id into `(type, name)`
///
/// The type is a non-empty run of word characters; the name is anything
/// non-empty after the first colon.
pub(crate) fn split_id(id: &str) -> Option<(&str, &str)> {
    let (entity_type, name) = id.split_once(':')?;
    let type_ok = !entity_type.is_empty()
        && entity_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    let name_ok = !name.is_empty() && !name.chars().any(char::is_whitespace);
    (type_ok && name_ok).then_some((entity_type, name))
}

fn invalid_reducer(spec: &str) -> Error {
    Error::invalid_spec(format!(
        "invalid reducer spec '{}': expected a '$path', a 'type:name' entity reference or a function",
        spec
    ))
}

// ============================================================================
// Reducer
// ============================================================================

/// A computation unit that maps an accumulator to a new accumulator
#[derive(Clone)]
pub enum Reducer {
    /// Read a value out of the accumulator
    Path(Arc<ReducerPath>),
    /// Call a user-authored function
    Function(ReducerFunction),
    /// Run reducers in order, piping each value into the next
    List(Arc<[Reducer]>),
    /// Resolve an entity from the store
    Entity(Arc<EntityRef>),
}

impl Reducer {
    /// Build a reducer from a raw spec
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSpec`] for strings outside the grammar and for
    /// malformed paths.
    pub fn create(spec: impl Into<ReducerSpec>) -> Result<Reducer> {
        match spec.into() {
            ReducerSpec::Str(s) => parse_str(&s),
            ReducerSpec::Function(f) => Ok(Reducer::Function(f)),
            ReducerSpec::List(specs) => {
                let reducers = specs
                    .into_iter()
                    .map(Reducer::create)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Reducer::List(reducers.into()))
            }
            ReducerSpec::Reducer(reducer) => Ok(reducer),
        }
    }

    /// The identity path, the default entity `value`
    pub fn identity() -> Reducer {
        Reducer::Path(Arc::new(ReducerPath::identity()))
    }

    /// Reducer that runs nothing and passes the accumulator through
    pub fn empty() -> Reducer {
        Reducer::List(Arc::from(Vec::new()))
    }

    /// Whether this is an empty list
    ///
    /// Compose steps with an empty reducer are skipped.
    pub fn is_empty(&self) -> bool {
        matches!(self, Reducer::List(list) if list.is_empty())
    }

    /// Variant name
    pub fn type_name(&self) -> &'static str {
        match self {
            Reducer::Path(_) => "path",
            Reducer::Function(_) => "function",
            Reducer::List(_) => "list",
            Reducer::Entity(_) => "entity",
        }
    }

    /// Call `visit` for every entity reference reachable from this reducer
    pub fn for_each_entity_ref<'a>(&'a self, visit: &mut dyn FnMut(&'a EntityRef)) {
        match self {
            Reducer::Entity(entity_ref) => visit(entity_ref),
            Reducer::List(list) => {
                for reducer in list.iter() {
                    reducer.for_each_entity_ref(visit);
                }
            }
            Reducer::Path(_) | Reducer::Function(_) => {}
        }
    }
}

fn parse_str(spec: &str) -> Result<Reducer> {
    if spec.contains(CHAIN_SEPARATOR) {
        let steps = spec
            .split(CHAIN_SEPARATOR)
            .map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    Err(Error::invalid_spec(format!(
                        "invalid reducer spec '{}': empty step in chain",
                        spec
                    )))
                } else {
                    parse_single(part)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(Reducer::List(steps.into()));
    }
    parse_single(spec.trim())
}

fn parse_single(spec: &str) -> Result<Reducer> {
    if let Some(raw) = spec.strip_prefix('$') {
        let path = ReducerPath::parse(raw).map_err(|e| {
            Error::invalid_spec(format!("invalid path reducer '{}': {}", spec, e))
        })?;
        return Ok(Reducer::Path(Arc::new(path)));
    }
    EntityRef::parse(spec).map(|entity_ref| Reducer::Entity(Arc::new(entity_ref)))
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reducer::Path(path) => write!(f, "Path(${})", path.raw()),
            Reducer::Function(function) => write!(f, "Function({})", function.style()),
            Reducer::List(list) => f.debug_tuple("List").field(&&list[..]).finish(),
            Reducer::Entity(entity_ref) => write!(f, "Entity({})", entity_ref),
        }
    }
}

impl From<ReducerFunction> for Reducer {
    fn from(function: ReducerFunction) -> Self {
        Reducer::Function(function)
    }
}
