//! The `transform` entry point and its per-call options

use std::fmt;
use std::sync::Arc;

use refract_core::{Map, Result, Value};
use serde::Deserialize;
use tracing::debug;

use crate::accumulator::{Accumulator, InspectFn, Params};
use crate::reducer::{Reducer, ReducerSpec};
use crate::resolve::resolve;
use crate::store::EntityStore;

/// Per-call configuration of [`transform`]
///
/// Deserializes from JSON with every field optional; unknown fields are
/// ignored. The inspect callback can only be set in code.
///
/// ```ignore
/// let options: TransformOptions = serde_json::from_value(json!({
///     "locals": {"greeting": "Hello"},
///     "trace": true
/// }))?;
/// ```
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Side-channel data visible to every reducer as `..locals`
    pub locals: Map,
    /// Extra invocation parameters visible as `..params`
    pub params: Map,
    /// Log per-entity timing on `refract::trace`
    pub trace: bool,
    /// Called when an entity with `inspect: true` is entered
    #[serde(skip)]
    pub inspect: Option<InspectFn>,
}

impl TransformOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all locals
    pub fn with_locals(mut self, locals: Map) -> Self {
        self.locals = locals;
        self
    }

    /// Set one local
    pub fn with_local(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.locals.insert(key.into(), value.into());
        self
    }

    /// Replace all extra params
    pub fn with_params(mut self, params: Map) -> Self {
        self.params = params;
        self
    }

    /// Set one extra param
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Enable per-entity timing logs
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Install the inspect callback
    pub fn with_inspect<F>(mut self, inspect: F) -> Self
    where
        F: Fn(&Accumulator) + Send + Sync + 'static,
    {
        self.inspect = Some(Arc::new(inspect));
        self
    }

    fn into_parts(self) -> (Map, Params) {
        let mut params = Params::new()
            .with_trace(self.trace)
            .with_values(self.params);
        if let Some(inspect) = self.inspect {
            params = params.with_inspect(inspect);
        }
        (self.locals, params)
    }
}

impl fmt::Debug for TransformOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformOptions")
            .field("locals", &self.locals)
            .field("params", &self.params)
            .field("trace", &self.trace)
            .field("inspect", &self.inspect.is_some())
            .finish()
    }
}

/// Build a reducer from `spec` and resolve it against `input`
///
/// The initial accumulator carries `input` as its value, the options'
/// locals and params, and the store's values.
///
/// # Errors
///
/// [`Error::InvalidSpec`](refract_core::Error::InvalidSpec) if `spec` is
/// malformed, otherwise whatever failure escapes resolution.
pub async fn transform(
    store: &EntityStore,
    spec: impl Into<ReducerSpec>,
    input: impl Into<Value>,
    options: TransformOptions,
) -> Result<Accumulator> {
    let reducer = Reducer::create(spec)?;
    let (locals, params) = options.into_parts();
    let acc =
        Accumulator::new(input.into(), locals, params).with_store_values(store.shared_values());
    debug!(target: "refract::resolve", reducer = ?reducer, "Starting transform");
    resolve(store, acc, &reducer).await
}
