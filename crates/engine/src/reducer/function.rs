//! Function reducers
//!
//! User-authored callables come in three calling conventions:
//!
//! | Constructor | Shape | Completes when |
//! |-------------|-------|----------------|
//! | [`ReducerFunction::sync`] | `Fn(&Accumulator) -> Result<Value>` | it returns |
//! | [`ReducerFunction::future`] | `Fn(Accumulator) -> impl Future<Output = Result<Value>>` | the future resolves |
//! | [`ReducerFunction::callback`] | `Fn(Accumulator, Next)` | [`Next`] is completed |
//! | [`ReducerFunction::accumulator`] | `Fn(Accumulator) -> impl Future<Output = Result<Accumulator>>` | the future resolves |
//!
//! The first three produce a value that replaces `value`. The last one
//! returns a whole accumulator, so it can also hand new locals to the
//! steps after it.
//!
//! [`ReducerFunction::apply`] lifts all four into the same boxed future, so
//! the engine has a single code path for functions.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use refract_core::{Error, Result, Value};
use tokio::sync::oneshot;

use crate::accumulator::Accumulator;

type SyncBody = dyn Fn(&Accumulator) -> Result<Value> + Send + Sync;
type FutureBody = dyn Fn(Accumulator) -> BoxFuture<'static, Result<Value>> + Send + Sync;
type CallbackBody = dyn Fn(Accumulator, Next) + Send + Sync;
type ContextBody = dyn Fn(Accumulator) -> BoxFuture<'static, Result<Accumulator>> + Send + Sync;

/// A callable reducer body
#[derive(Clone)]
pub enum ReducerFunction {
    /// Direct return
    Sync(Arc<SyncBody>),
    /// Future return
    Future(Arc<FutureBody>),
    /// Continuation style
    Callback(Arc<CallbackBody>),
    /// Future returning a whole accumulator
    Context(Arc<ContextBody>),
}

impl ReducerFunction {
    /// Wrap a function that returns its result directly
    pub fn sync<F>(body: F) -> Self
    where
        F: Fn(&Accumulator) -> Result<Value> + Send + Sync + 'static,
    {
        ReducerFunction::Sync(Arc::new(body))
    }

    /// Wrap a function that returns a future
    pub fn future<F, Fut>(body: F) -> Self
    where
        F: Fn(Accumulator) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        ReducerFunction::Future(Arc::new(move |acc| body(acc).boxed()))
    }

    /// Wrap a function that reports completion through [`Next`]
    ///
    /// The function may complete `next` later, from another task or thread.
    /// Dropping `next` without completing it fails the reducer.
    pub fn callback<F>(body: F) -> Self
    where
        F: Fn(Accumulator, Next) + Send + Sync + 'static,
    {
        ReducerFunction::Callback(Arc::new(body))
    }

    /// Wrap a function that returns a replacement accumulator
    ///
    /// Build the result from the accumulator passed in, e.g. with
    /// [`Accumulator::with_local`] or [`Accumulator::with_value`].
    pub fn accumulator<F, Fut>(body: F) -> Self
    where
        F: Fn(Accumulator) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Accumulator>> + Send + 'static,
    {
        ReducerFunction::Context(Arc::new(move |acc| body(acc).boxed()))
    }

    /// Calling convention name
    pub fn style(&self) -> &'static str {
        match self {
            ReducerFunction::Sync(_) => "sync",
            ReducerFunction::Future(_) => "future",
            ReducerFunction::Callback(_) => "callback",
            ReducerFunction::Context(_) => "accumulator",
        }
    }

    /// Invoke the body and resolve to the accumulator the next step sees
    pub fn apply(&self, acc: Accumulator) -> BoxFuture<'static, Result<Accumulator>> {
        match self {
            ReducerFunction::Context(body) => body(acc),
            _ => {
                let pending = self.call(acc.clone());
                async move { pending.await.map(|value| acc.with_value(value)) }.boxed()
            }
        }
    }

    /// Invoke the body and normalize its completion into one future value
    pub fn call(&self, acc: Accumulator) -> BoxFuture<'static, Result<Value>> {
        match self {
            ReducerFunction::Sync(body) => future::ready(body(&acc)).boxed(),
            ReducerFunction::Future(body) => body(acc),
            ReducerFunction::Callback(body) => {
                let (tx, rx) = oneshot::channel();
                body(acc, Next { tx });
                async move {
                    rx.await.unwrap_or_else(|_| {
                        Err(Error::resolution(
                            "function reducer dropped its continuation without a result",
                        ))
                    })
                }
                .boxed()
            }
            ReducerFunction::Context(body) => {
                body(acc).map(|result| result.map(Accumulator::into_value)).boxed()
            }
        }
    }
}

impl fmt::Debug for ReducerFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReducerFunction::{}", self.style())
    }
}

/// One-shot continuation handed to callback-style reducers
pub struct Next {
    tx: oneshot::Sender<Result<Value>>,
}

impl Next {
    /// Complete with either a result or an error
    pub fn done(self, result: Result<Value>) {
        // The receiver is gone only if the caller stopped waiting.
        let _ = self.tx.send(result);
    }

    /// Complete successfully
    pub fn ok(self, value: impl Into<Value>) {
        self.done(Ok(value.into()))
    }

    /// Complete with a failure
    pub fn fail(self, error: Error) {
        self.done(Err(error))
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}
