//! The accumulator threaded through every resolution step
//!
//! An [`Accumulator`] is never mutated once observed. Every engine step that
//! changes something builds a fresh record sharing the untouched parts
//! (`locals`, `params`, the executing reducer) through `Arc`, so concurrent
//! per-element and per-key fan-out needs no locking.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use refract_core::{Error, Map, Value};

use crate::reducer::Reducer;

/// Caller-supplied callback invoked when an entity with `inspect: true` runs
pub type InspectFn = Arc<dyn Fn(&Accumulator) + Send + Sync>;

/// Invocation parameters visible to every reducer of a call
#[derive(Clone, Default)]
pub struct Params {
    trace: bool,
    inspect: Option<InspectFn>,
    values: Map,
}

impl Params {
    /// Empty parameters: no tracing, no inspect callback
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable per-entity timing logs
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Install the inspect callback
    pub fn with_inspect(mut self, inspect: InspectFn) -> Self {
        self.inspect = Some(inspect);
        self
    }

    /// Replace the free-form parameter values
    pub fn with_values(mut self, values: Map) -> Self {
        self.values = values;
        self
    }

    /// Whether per-entity timing is logged
    pub fn trace(&self) -> bool {
        self.trace
    }

    /// The inspect callback, if any
    pub fn inspect(&self) -> Option<&InspectFn> {
        self.inspect.as_ref()
    }

    /// Free-form parameter values
    pub fn values(&self) -> &Map {
        &self.values
    }

    /// One free-form parameter
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Record view used by `..params` paths
    ///
    /// Contains every free-form value plus `trace`. The callback has no
    /// value representation and is left out.
    pub fn to_value(&self) -> Value {
        let mut view = self.values.clone();
        view.insert("trace".to_string(), Value::Bool(self.trace));
        Value::Object(view)
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Params")
            .field("trace", &self.trace)
            .field("inspect", &self.inspect.is_some())
            .field("values", &self.values)
            .finish()
    }
}

/// Value-plus-context record passed to every reducer
#[derive(Clone)]
pub struct Accumulator {
    value: Value,
    locals: Arc<Value>,
    params: Arc<Params>,
    values: Arc<Value>,
    reducer: Option<Reducer>,
    error: Option<Arc<Error>>,
}

impl Accumulator {
    /// Create an accumulator with the given locals and params
    pub fn new(value: Value, locals: Map, params: Params) -> Self {
        Accumulator {
            value,
            locals: Arc::new(Value::Object(locals)),
            params: Arc::new(params),
            values: Arc::new(Value::object()),
            reducer: None,
            error: None,
        }
    }

    /// Create an accumulator with empty locals and default params
    pub fn from_value(value: impl Into<Value>) -> Self {
        Self::new(value.into(), Map::new(), Params::default())
    }

    /// Current working value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consume the accumulator, keeping only its value
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Caller-supplied side-channel data (always an object)
    pub fn locals(&self) -> &Value {
        &self.locals
    }

    /// Caller-supplied invocation parameters
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Values shared by every transform of the store (always an object)
    pub fn values(&self) -> &Value {
        &self.values
    }

    /// The entity reducer currently executing, if any
    pub fn reducer(&self) -> Option<&Reducer> {
        self.reducer.as_ref()
    }

    /// The failure an `error` hook is handling, if any
    pub fn error(&self) -> Option<&Error> {
        self.error.as_deref()
    }

    /// Id of the owning entity, used to enrich error messages
    pub fn entity_id(&self) -> Option<&str> {
        match &self.reducer {
            Some(Reducer::Entity(entity_ref)) => Some(entity_ref.id()),
            _ => None,
        }
    }

    /// Copy of this accumulator with a new value
    pub fn with_value(&self, value: Value) -> Accumulator {
        Accumulator {
            value,
            locals: Arc::clone(&self.locals),
            params: Arc::clone(&self.params),
            values: Arc::clone(&self.values),
            reducer: self.reducer.clone(),
            error: self.error.clone(),
        }
    }

    /// Copy of this accumulator with new locals
    ///
    /// Lets a function reducer hand different context to the steps after it.
    pub fn with_locals(&self, locals: Map) -> Accumulator {
        Accumulator {
            locals: Arc::new(Value::Object(locals)),
            ..self.clone()
        }
    }

    /// Copy of this accumulator with one local added or replaced
    pub fn with_local(&self, key: impl Into<String>, value: impl Into<Value>) -> Accumulator {
        let mut locals = self.locals.as_object().cloned().unwrap_or_default();
        locals.insert(key.into(), value.into());
        self.with_locals(locals)
    }

    pub(crate) fn with_store_values(self, values: Arc<Value>) -> Accumulator {
        Accumulator { values, ..self }
    }

    pub(crate) fn with_reducer(self, reducer: Option<Reducer>) -> Accumulator {
        Accumulator { reducer, ..self }
    }

    pub(crate) fn with_error(&self, error: Error) -> Accumulator {
        Accumulator {
            error: Some(Arc::new(error)),
            ..self.clone()
        }
    }

    pub(crate) fn without_error(self) -> Accumulator {
        Accumulator { error: None, ..self }
    }

    /// One field of the record view used by `..` paths
    ///
    /// Known fields: `value`, `locals`, `params`, `values` and, while an
    /// `error` hook runs, `error`.
    pub fn field(&self, name: &str) -> Option<Cow<'_, Value>> {
        match name {
            "value" => Some(Cow::Borrowed(&self.value)),
            "locals" => Some(Cow::Borrowed(self.locals.as_ref())),
            "params" => Some(Cow::Owned(self.params.to_value())),
            "values" => Some(Cow::Borrowed(self.values.as_ref())),
            "error" => self.error.as_deref().map(|e| Cow::Owned(error_view(e))),
            _ => None,
        }
    }

    /// The whole record view as an object
    pub fn to_record(&self) -> Value {
        let mut record = Map::new();
        record.insert("value".to_string(), self.value.clone());
        record.insert("locals".to_string(), self.locals.as_ref().clone());
        record.insert("params".to_string(), self.params.to_value());
        record.insert("values".to_string(), self.values.as_ref().clone());
        if let Some(error) = self.error.as_deref() {
            record.insert("error".to_string(), error_view(error));
        }
        Value::Object(record)
    }
}

fn error_view(error: &Error) -> Value {
    let mut view = Map::new();
    view.insert("kind".to_string(), Value::from(error.kind().as_str()));
    view.insert("message".to_string(), Value::from(error.message()));
    Value::Object(view)
}

impl fmt::Debug for Accumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accumulator")
            .field("value", &self.value)
            .field("locals", &self.locals)
            .field("params", &self.params)
            .field("values", &self.values)
            .field("entity", &self.entity_id())
            .field("error", &self.error)
            .finish()
    }
}
