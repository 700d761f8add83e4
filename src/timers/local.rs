// src/timers/local.rs

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tokio::task::JoinHandle;
use tracing::trace;

use super::{Macrotask, MacrotaskScheduler, TimerId};

/// Macrotask backend for hosts running a Tokio `LocalSet`.
///
/// Each task is spawned with [`tokio::task::spawn_local`] and yields once
/// before running, so it always executes after the current call stack has
/// returned to the executor. `clear_timeout` aborts the spawned task.
///
/// `set_timeout` panics if called outside a `LocalSet` context.
#[derive(Default)]
pub struct TokioTimers {
    next_id: Cell<u64>,
    handles: Rc<RefCell<HashMap<TimerId, JoinHandle<()>>>>,
}

impl TokioTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of spawned tasks that have neither run nor been cancelled.
    pub fn pending(&self) -> usize {
        self.handles.borrow().len()
    }
}

impl MacrotaskScheduler for TokioTimers {
    fn set_timeout(&self, task: Macrotask) -> TimerId {
        let id = TimerId(self.next_id.get() + 1);
        self.next_id.set(id.0);

        let handles = Rc::downgrade(&self.handles);
        let handle = tokio::task::spawn_local(async move {
            tokio::task::yield_now().await;
            if let Some(handles) = handles.upgrade() {
                handles.borrow_mut().remove(&id);
            }
            trace!(%id, "running macrotask");
            task();
        });

        self.handles.borrow_mut().insert(id, handle);
        trace!(%id, "macrotask spawned");
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        if let Some(handle) = self.handles.borrow_mut().remove(&id) {
            handle.abort();
            trace!(%id, "macrotask aborted");
        }
    }
}

impl fmt::Debug for TokioTimers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioTimers")
            .field("pending", &self.pending())
            .finish()
    }
}
