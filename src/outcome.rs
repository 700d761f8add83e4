// src/outcome.rs

//! Return-type adapters for user closures.
//!
//! Watch functions, listeners and queued expressions may either return plain
//! values or `Result`s. A returned `Err` is the equivalent of the callback
//! "throwing": the digest loop contains it, reports it as a
//! [`crate::scope::Fault`], and moves on to the next item.

use crate::scope::Scope;
use crate::value::Value;

/// Result type of a watch function.
pub trait WatchOutput {
    fn into_watch_result(self) -> anyhow::Result<Value>;
}

impl WatchOutput for Value {
    fn into_watch_result(self) -> anyhow::Result<Value> {
        Ok(self)
    }
}

impl<E: Into<anyhow::Error>> WatchOutput for Result<Value, E> {
    fn into_watch_result(self) -> anyhow::Result<Value> {
        self.map_err(Into::into)
    }
}

/// Result type of a listener, async expression or post-digest callback.
/// Any successful value is discarded.
pub trait Outcome {
    fn into_outcome(self) -> anyhow::Result<()>;
}

impl Outcome for () {
    fn into_outcome(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl Outcome for Value {
    fn into_outcome(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<T, E: Into<anyhow::Error>> Outcome for Result<T, E> {
    fn into_outcome(self) -> anyhow::Result<()> {
        self.map(|_| ()).map_err(Into::into)
    }
}

/// Type-erased watch function, as stored by the watcher registry and
/// accepted by [`Scope::watch_group`].
pub type WatchFn = Box<dyn FnMut(&Scope) -> anyhow::Result<Value>>;

/// Type-erased listener.
pub(crate) type ListenerFn = Box<dyn FnMut(&Value, &Value, &Scope) -> anyhow::Result<()>>;

/// Box a watch closure into a [`WatchFn`].
///
/// ```
/// use scopewatch::{Scope, watch_fn};
///
/// let scope = Scope::new();
/// let fns = vec![watch_fn(|s: &Scope| s.get("a")), watch_fn(|s: &Scope| s.get("b"))];
/// let _handle = scope.watch_group(fns, |_new, _old, _scope| {});
/// ```
pub fn watch_fn<W, O>(mut watch: W) -> WatchFn
where
    W: FnMut(&Scope) -> O + 'static,
    O: WatchOutput,
{
    Box::new(move |scope: &Scope| watch(scope).into_watch_result())
}
