// src/digest/mod.rs

//! Digest Scheduler.
//!
//! - `queues` holds the state shared by every scope of one tree: the three
//!   task queues, the pending apply-async timer, the last-dirty-watch marker
//!   and the current phase.
//! - `phase` is the re-entrancy guard.
//! - `scheduler` implements the convergence loop and the scheduling entry
//!   points (`eval`, `apply`, `eval_async`, `apply_async`, `post_digest`).

mod phase;
mod queues;
mod scheduler;

pub(crate) use phase::PhaseGuard;
pub(crate) use queues::{AsyncTask, TreeState};
