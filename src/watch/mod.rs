// src/watch/mod.rs

//! Watchers and the observers derived from them.
//!
//! This module is responsible for:
//! - Registering watchers on a scope and handing out [`WatchHandle`]s
//!   (`registry.rs`).
//! - Combining several watch functions behind one listener (`group.rs`).
//! - Shallow content diffing of arrays and objects (`collection.rs`).
//!
//! It does **not** decide when watchers run; the digest scheduler drives the
//! sweeps and calls back into each watcher.

pub mod collection;
pub mod group;
pub mod registry;

pub use collection::CollectionDiffer;
pub use registry::{WatchHandle, WatcherId};

pub(crate) use registry::WatcherList;
