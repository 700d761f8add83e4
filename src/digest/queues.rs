// src/digest/queues.rs

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error};

use crate::config::DigestConfig;
use crate::scope::{Fault, Scope, ScopeId, ScopeInner};
use crate::timers::{MacrotaskScheduler, TimerId};
use crate::types::{FaultKind, Phase};
use crate::watch::WatcherId;

/// Deferred expression queued by `eval_async` or `apply_async`, evaluated on
/// its owning scope.
pub(crate) struct AsyncTask {
    pub(crate) scope: Scope,
    pub(crate) expression: Box<dyn FnOnce(&Scope) -> anyhow::Result<()>>,
}

/// Callback queued by `post_digest`.
pub(crate) type DeferredFn = Box<dyn FnOnce() -> anyhow::Result<()>>;

pub(crate) type FaultHandler = Rc<dyn Fn(&Fault<'_>)>;

/// State shared by every scope of one tree.
///
/// The root creates it; every scope receives an `Rc` to it at construction
/// (isolated scopes included) and never re-derives it by walking parents.
/// Only the digest scheduler mutates the queues.
pub(crate) struct TreeState {
    root: RefCell<Weak<ScopeInner>>,
    phase: Cell<Option<Phase>>,
    last_dirty_watch: Cell<Option<WatcherId>>,
    async_queue: RefCell<VecDeque<AsyncTask>>,
    apply_async_queue: RefCell<VecDeque<AsyncTask>>,
    apply_async_timer: Cell<Option<TimerId>>,
    post_digest_queue: RefCell<VecDeque<DeferredFn>>,
    config: DigestConfig,
    timers: Rc<dyn MacrotaskScheduler>,
    next_scope_id: Cell<u64>,
    next_watcher_id: Cell<u64>,
    fault_handler: RefCell<Option<FaultHandler>>,
}

impl TreeState {
    pub(crate) fn new(config: DigestConfig, timers: Rc<dyn MacrotaskScheduler>) -> Self {
        Self {
            root: RefCell::new(Weak::new()),
            phase: Cell::new(None),
            last_dirty_watch: Cell::new(None),
            async_queue: RefCell::new(VecDeque::new()),
            apply_async_queue: RefCell::new(VecDeque::new()),
            apply_async_timer: Cell::new(None),
            post_digest_queue: RefCell::new(VecDeque::new()),
            config,
            timers,
            next_scope_id: Cell::new(0),
            next_watcher_id: Cell::new(0),
            fault_handler: RefCell::new(None),
        }
    }

    pub(crate) fn set_root(&self, root: Weak<ScopeInner>) {
        *self.root.borrow_mut() = root;
    }

    /// The root scope, if it is still alive.
    pub(crate) fn root(&self) -> Option<Scope> {
        self.root.borrow().upgrade().map(Scope::from_inner)
    }

    pub(crate) fn config(&self) -> DigestConfig {
        self.config
    }

    pub(crate) fn timers(&self) -> &Rc<dyn MacrotaskScheduler> {
        &self.timers
    }

    pub(crate) fn next_scope_id(&self) -> ScopeId {
        let id = self.next_scope_id.get() + 1;
        self.next_scope_id.set(id);
        ScopeId(id)
    }

    pub(crate) fn next_watcher_id(&self) -> WatcherId {
        let id = self.next_watcher_id.get() + 1;
        self.next_watcher_id.set(id);
        WatcherId(id)
    }

    // ---------------------------------------------------------------------
    // Phase and convergence marker
    // ---------------------------------------------------------------------

    pub(crate) fn phase(&self) -> Option<Phase> {
        self.phase.get()
    }

    pub(crate) fn set_phase(&self, phase: Option<Phase>) {
        self.phase.set(phase);
    }

    pub(crate) fn last_dirty_watch(&self) -> Option<WatcherId> {
        self.last_dirty_watch.get()
    }

    pub(crate) fn mark_dirty(&self, watcher: WatcherId) {
        self.last_dirty_watch.set(Some(watcher));
    }

    /// Forget the convergence marker. Called whenever the watcher set changes
    /// and when a digest begins.
    pub(crate) fn invalidate_last_dirty(&self) {
        self.last_dirty_watch.set(None);
    }

    // ---------------------------------------------------------------------
    // Async queue
    // ---------------------------------------------------------------------

    pub(crate) fn push_async(&self, task: AsyncTask) {
        let mut queue = self.async_queue.borrow_mut();
        queue.push_back(task);
        debug!(queued = queue.len(), "async task queued");
    }

    pub(crate) fn pop_async(&self) -> Option<AsyncTask> {
        self.async_queue.borrow_mut().pop_front()
    }

    pub(crate) fn has_pending_async(&self) -> bool {
        !self.async_queue.borrow().is_empty()
    }

    // ---------------------------------------------------------------------
    // Apply-async queue and its flush timer
    // ---------------------------------------------------------------------

    pub(crate) fn push_apply_async(&self, task: AsyncTask) {
        let mut queue = self.apply_async_queue.borrow_mut();
        queue.push_back(task);
        debug!(queued = queue.len(), "apply-async task queued");
    }

    pub(crate) fn pop_apply_async(&self) -> Option<AsyncTask> {
        self.apply_async_queue.borrow_mut().pop_front()
    }

    pub(crate) fn apply_async_timer(&self) -> Option<TimerId> {
        self.apply_async_timer.get()
    }

    pub(crate) fn set_apply_async_timer(&self, timer: Option<TimerId>) {
        self.apply_async_timer.set(timer);
    }

    // ---------------------------------------------------------------------
    // Post-digest queue
    // ---------------------------------------------------------------------

    pub(crate) fn push_post_digest(&self, callback: DeferredFn) {
        self.post_digest_queue.borrow_mut().push_back(callback);
    }

    pub(crate) fn pop_post_digest(&self) -> Option<DeferredFn> {
        self.post_digest_queue.borrow_mut().pop_front()
    }

    // ---------------------------------------------------------------------
    // Fault reporting
    // ---------------------------------------------------------------------

    pub(crate) fn set_fault_handler(&self, handler: Option<FaultHandler>) {
        *self.fault_handler.borrow_mut() = handler;
    }

    /// Log a contained fault and forward it to the installed hook.
    pub(crate) fn report_fault(&self, kind: FaultKind, scope: ScopeId, error: &anyhow::Error) {
        error!(%kind, %scope, error = %error, "contained fault");

        // Clone the hook out so it may install a new one while running.
        let handler = self.fault_handler.borrow().clone();
        if let Some(handler) = handler {
            handler(&Fault { kind, scope, error });
        }
    }
}

impl fmt::Debug for TreeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeState")
            .field("phase", &self.phase.get())
            .field("last_dirty_watch", &self.last_dirty_watch.get())
            .field("async_queue", &self.async_queue.borrow().len())
            .field("apply_async_queue", &self.apply_async_queue.borrow().len())
            .field("apply_async_timer", &self.apply_async_timer.get())
            .field("post_digest_queue", &self.post_digest_queue.borrow().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
