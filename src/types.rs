use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Re-entrancy guard label for a scope tree.
///
/// At most one phase is active per tree:
/// - `Digest`: the convergence loop is running.
/// - `Apply`: an `apply` expression is being evaluated (the digest that
///   follows it runs under `Digest`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Digest,
    Apply,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Digest => "$digest",
            Phase::Apply => "$apply",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log level accepted in the `[logging]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("invalid log level: {other}")),
        }
    }
}

/// Where a contained fault was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// A watch function failed while being evaluated in a sweep.
    Watch,
    /// A listener failed after its watcher was found dirty.
    Listener,
    /// An `eval_async` expression failed while the async queue was drained.
    AsyncTask,
    /// An `apply_async` expression failed while its queue was flushed.
    ApplyAsync,
    /// A `post_digest` callback failed.
    PostDigest,
    /// A digest started from a timer (no caller to return the error to).
    DeferredDigest,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FaultKind::Watch => "watch",
            FaultKind::Listener => "listener",
            FaultKind::AsyncTask => "async-task",
            FaultKind::ApplyAsync => "apply-async",
            FaultKind::PostDigest => "post-digest",
            FaultKind::DeferredDigest => "deferred-digest",
        };
        f.write_str(s)
    }
}
