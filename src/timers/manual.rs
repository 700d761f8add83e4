// src/timers/manual.rs

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;

use tracing::trace;

use super::{Macrotask, MacrotaskScheduler, TimerId};

/// Deterministic macrotask queue driven by the host.
///
/// Tasks run in FIFO order when the host calls [`ManualTimers::run_next`] or
/// [`ManualTimers::run_all`]. This is the default backend of
/// [`crate::Scope::new`].
#[derive(Default)]
pub struct ManualTimers {
    next_id: Cell<u64>,
    queue: RefCell<VecDeque<(TimerId, Macrotask)>>,
}

/// Upper bound on tasks executed by one `run_all` call.
const RUN_ALL_LIMIT: usize = 10_000;

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run the oldest pending task. Returns `false` if nothing was queued.
    pub fn run_next(&self) -> bool {
        // Release the queue before running: the task may schedule more work.
        let next = self.queue.borrow_mut().pop_front();
        match next {
            Some((id, task)) => {
                trace!(%id, "running macrotask");
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue is empty, including tasks scheduled by the
    /// tasks themselves. Returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while ran < RUN_ALL_LIMIT && self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl MacrotaskScheduler for ManualTimers {
    fn set_timeout(&self, task: Macrotask) -> TimerId {
        let id = TimerId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.queue.borrow_mut().push_back((id, task));
        trace!(%id, "macrotask scheduled");
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        let mut queue = self.queue.borrow_mut();
        let before = queue.len();
        queue.retain(|(queued, _)| *queued != id);
        if queue.len() != before {
            trace!(%id, "macrotask cancelled");
        }
    }
}

impl fmt::Debug for ManualTimers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualTimers")
            .field("pending", &self.pending())
            .finish()
    }
}
