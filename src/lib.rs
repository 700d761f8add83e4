// src/lib.rs

//! Dirty-checking change detection over a tree of scopes.
//!
//! Watchers registered on a [`Scope`] are re-evaluated by a digest until the
//! whole tree settles. Work can be scheduled immediately (`eval`, `apply`),
//! later in the current digest (`eval_async`), batched on the next macrotask
//! (`apply_async`) or after the next digest (`post_digest`).
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use scopewatch::{Scope, Value};
//!
//! let root = Scope::new();
//! root.set("name", "Jane");
//!
//! let calls = Rc::new(Cell::new(0));
//! let seen = Rc::clone(&calls);
//! root.watch(
//!     |scope: &Scope| scope.get("name"),
//!     move |_new: &Value, _old: &Value, _scope: &Scope| seen.set(seen.get() + 1),
//! );
//!
//! root.digest()?;
//! root.apply(|scope| {
//!     scope.set("name", "Joe");
//! })?;
//! assert_eq!(calls.get(), 2);
//! # Ok::<(), scopewatch::ScopeError>(())
//! ```

pub mod config;
mod digest;
pub mod errors;
pub mod logging;
pub mod outcome;
pub mod scope;
pub mod timers;
pub mod types;
pub mod value;
pub mod watch;

pub use config::{ConfigFile, DigestConfig};
pub use errors::{Result, ScopeError};
pub use outcome::{Outcome, WatchFn, WatchOutput, watch_fn};
pub use scope::{Fault, Locals, Scope, ScopeBuilder, ScopeId};
pub use types::{FaultKind, LogLevel, Phase};
pub use value::{Array, EqualityMode, Object, Value, are_equal};
pub use watch::{CollectionDiffer, WatchHandle, WatcherId};
