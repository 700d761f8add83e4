// src/timers/mod.rs

//! Pluggable macrotask boundary.
//!
//! `eval_async` and `apply_async` defer work "to the next macrotask". The
//! scope tree talks to a [`MacrotaskScheduler`] instead of a concrete event
//! loop, which makes it easy to swap in a deterministic queue in tests while
//! hosts running on Tokio use [`TokioTimers`].
//!
//! - [`ManualTimers`] queues tasks until the host calls `run_next`/`run_all`.
//! - [`TokioTimers`] spawns each task on the current `LocalSet`.

pub mod local;
pub mod manual;

use std::fmt;

pub use local::TokioTimers;
pub use manual::ManualTimers;

/// A unit of deferred work. Scopes are single-threaded, so tasks are not `Send`.
pub type Macrotask = Box<dyn FnOnce()>;

/// Handle returned by [`MacrotaskScheduler::set_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Trait abstracting how deferred callbacks reach the next macrotask.
///
/// Implementations must never run `task` synchronously inside `set_timeout`:
/// callers rely on control returning to them first.
pub trait MacrotaskScheduler {
    /// Schedule `task` to run on a later macrotask.
    fn set_timeout(&self, task: Macrotask) -> TimerId;

    /// Cancel a scheduled task. Unknown or already-run ids are ignored.
    fn clear_timeout(&self, id: TimerId);
}
