// src/watch/registry.rs

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::digest::TreeState;
use crate::outcome::{ListenerFn, Outcome, WatchFn, WatchOutput, watch_fn};
use crate::scope::{Scope, ScopeInner};
use crate::types::{FaultKind, Phase};
use crate::value::{EqualityMode, Value, are_equal};

/// Identifier of a watcher, unique within its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherId(pub u64);

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watcher#{}", self.0)
    }
}

/// Result of checking one watcher during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Check {
    /// The value changed and the listener ran.
    Dirty,
    /// The value is unchanged.
    Clean,
    /// Unchanged, and this is the watcher that was dirty last: everything
    /// after it has already been seen clean.
    Settled,
    /// The watch function failed; the fault has been reported.
    Failed,
}

pub(crate) struct Watcher {
    pub(crate) id: WatcherId,
    watch: RefCell<WatchFn>,
    listener: RefCell<ListenerFn>,
    mode: EqualityMode,
    /// `None` until the first check, so the first check is always dirty.
    last: RefCell<Option<Value>>,
    removed: Cell<bool>,
}

impl Watcher {
    pub(crate) fn is_removed(&self) -> bool {
        self.removed.get()
    }

    /// Evaluate the watch function and, if the value changed, run the
    /// listener with `(new, old, scope)`. On the first change `old` is the
    /// new value itself.
    pub(crate) fn check(&self, scope: &Scope, tree: &TreeState) -> Check {
        let new_value = match (*self.watch.borrow_mut())(scope) {
            Ok(value) => value,
            Err(err) => {
                tree.report_fault(FaultKind::Watch, scope.id(), &err);
                return Check::Failed;
            }
        };

        let dirty = match &*self.last.borrow() {
            None => true,
            Some(last) => !are_equal(&new_value, last, self.mode),
        };

        if !dirty {
            if tree.last_dirty_watch() == Some(self.id) {
                return Check::Settled;
            }
            return Check::Clean;
        }

        tree.mark_dirty(self.id);
        let stored = match self.mode {
            EqualityMode::Deep => new_value.deep_clone(),
            EqualityMode::Reference => new_value.clone(),
        };
        let old_value = self
            .last
            .replace(Some(stored))
            .unwrap_or_else(|| new_value.clone());

        trace!(watcher = %self.id, scope = %scope.id(), "watcher dirty");
        if let Err(err) = (*self.listener.borrow_mut())(&new_value, &old_value, scope) {
            tree.report_fault(FaultKind::Listener, scope.id(), &err);
        }
        Check::Dirty
    }
}

/// Watchers of one scope, in registration order.
///
/// Deregistration only marks a watcher as removed, so a sweep walking the
/// list by index never loses its place. Removed entries are compacted away
/// when no digest is running.
#[derive(Default)]
pub(crate) struct WatcherList {
    slots: RefCell<Vec<Rc<Watcher>>>,
    removed: Cell<usize>,
}

impl WatcherList {
    pub(crate) fn get(&self, index: usize) -> Option<Rc<Watcher>> {
        self.slots.borrow().get(index).cloned()
    }

    fn push(&self, watcher: Rc<Watcher>) {
        self.slots.borrow_mut().push(watcher);
    }

    pub(crate) fn live_count(&self) -> usize {
        self.slots.borrow().len() - self.removed.get()
    }

    /// Mark `watcher` as removed. Returns `false` if it already was.
    fn mark_removed(&self, watcher: &Watcher) -> bool {
        if watcher.removed.replace(true) {
            return false;
        }
        self.removed.set(self.removed.get() + 1);
        true
    }

    /// Drop the slots of removed watchers. Must not run while a sweep is
    /// walking the list.
    pub(crate) fn compact(&self) {
        if self.removed.get() == 0 {
            return;
        }
        let mut slots = self.slots.borrow_mut();
        slots.retain(|w| !w.is_removed());
        self.removed.set(0);
    }

    /// Remove every watcher. Returns how many were live.
    pub(crate) fn clear(&self) -> usize {
        let live = self.live_count();
        let slots = std::mem::take(&mut *self.slots.borrow_mut());
        for watcher in &slots {
            watcher.removed.set(true);
        }
        self.removed.set(0);
        live
    }
}

/// Handle returned by the `watch*` methods.
///
/// Dropping the handle does not remove anything; call
/// [`WatchHandle::deregister`]. Clones share the same registration.
#[derive(Clone)]
pub struct WatchHandle {
    kind: HandleKind,
}

#[derive(Clone)]
enum HandleKind {
    Single {
        scope: Weak<ScopeInner>,
        watcher: Weak<Watcher>,
    },
    Group(Rc<[WatchHandle]>),
    /// Zero-function group: a one-shot firing that has not happened yet.
    Pending(Rc<Cell<bool>>),
}

impl WatchHandle {
    pub(crate) fn group(handles: Vec<WatchHandle>) -> Self {
        Self {
            kind: HandleKind::Group(handles.into()),
        }
    }

    pub(crate) fn pending(armed: Rc<Cell<bool>>) -> Self {
        Self {
            kind: HandleKind::Pending(armed),
        }
    }

    /// Remove the registration. Calling it again, or after the scope was
    /// destroyed, does nothing. Safe to call from inside a digest, including
    /// from the watcher's own callbacks.
    pub fn deregister(&self) {
        match &self.kind {
            HandleKind::Single { scope, watcher } => {
                let (Some(scope), Some(watcher)) = (scope.upgrade(), watcher.upgrade()) else {
                    return;
                };
                if !scope.watchers.mark_removed(&watcher) {
                    return;
                }
                scope.tree.invalidate_last_dirty();
                if scope.tree.phase() != Some(Phase::Digest) {
                    scope.watchers.compact();
                }
                debug!(watcher = %watcher.id, scope = %scope.id, "watcher deregistered");
            }
            HandleKind::Group(handles) => {
                for handle in handles.iter() {
                    handle.deregister();
                }
            }
            HandleKind::Pending(armed) => armed.set(false),
        }
    }

    /// Whether any part of the registration is still live.
    pub fn is_active(&self) -> bool {
        match &self.kind {
            HandleKind::Single { watcher, .. } => watcher
                .upgrade()
                .is_some_and(|watcher| !watcher.is_removed()),
            HandleKind::Group(handles) => handles.iter().any(WatchHandle::is_active),
            HandleKind::Pending(armed) => armed.get(),
        }
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            HandleKind::Single { watcher, .. } => f
                .debug_struct("WatchHandle")
                .field("watcher", &watcher.upgrade().map(|w| w.id))
                .field("active", &self.is_active())
                .finish(),
            HandleKind::Group(handles) => f
                .debug_struct("WatchHandle")
                .field("group", &handles.len())
                .field("active", &self.is_active())
                .finish(),
            HandleKind::Pending(armed) => f
                .debug_struct("WatchHandle")
                .field("pending", &armed.get())
                .finish(),
        }
    }
}

impl Scope {
    /// Watch `watch` with reference equality and call `listener` whenever
    /// its value changes.
    ///
    /// The listener receives `(new, old, scope)`; on its first call both
    /// values are the same. Returning an `Err` from either closure is
    /// contained by the digest.
    pub fn watch<W, O, L, R>(&self, watch: W, listener: L) -> WatchHandle
    where
        W: FnMut(&Scope) -> O + 'static,
        O: WatchOutput,
        L: FnMut(&Value, &Value, &Scope) -> R + 'static,
        R: Outcome,
    {
        self.watch_with(watch, listener, EqualityMode::Reference)
    }

    /// Like [`Scope::watch`], choosing the equality mode. `true` converts to
    /// [`EqualityMode::Deep`].
    pub fn watch_with<W, O, L, R>(
        &self,
        watch: W,
        mut listener: L,
        mode: impl Into<EqualityMode>,
    ) -> WatchHandle
    where
        W: FnMut(&Scope) -> O + 'static,
        O: WatchOutput,
        L: FnMut(&Value, &Value, &Scope) -> R + 'static,
        R: Outcome,
    {
        self.register_watcher(
            watch_fn(watch),
            Box::new(move |new: &Value, old: &Value, scope: &Scope| {
                listener(new, old, scope).into_outcome()
            }),
            mode.into(),
        )
    }

    /// Watch without a listener. The watch function still runs on every
    /// sweep, which is enough to drive side effects it performs itself.
    pub fn watch_only<W, O>(&self, watch: W) -> WatchHandle
    where
        W: FnMut(&Scope) -> O + 'static,
        O: WatchOutput,
    {
        self.register_watcher(
            watch_fn(watch),
            Box::new(|_: &Value, _: &Value, _: &Scope| -> anyhow::Result<()> { Ok(()) }),
            EqualityMode::Reference,
        )
    }

    pub(crate) fn register_watcher(
        &self,
        watch: WatchFn,
        listener: ListenerFn,
        mode: EqualityMode,
    ) -> WatchHandle {
        let tree = self.tree();
        let watcher = Rc::new(Watcher {
            id: tree.next_watcher_id(),
            watch: RefCell::new(watch),
            listener: RefCell::new(listener),
            mode,
            last: RefCell::new(None),
            removed: Cell::new(false),
        });

        self.inner.watchers.push(Rc::clone(&watcher));
        tree.invalidate_last_dirty();
        debug!(watcher = %watcher.id, scope = %self.id(), ?mode, "watcher registered");

        WatchHandle {
            kind: HandleKind::Single {
                scope: Rc::downgrade(&self.inner),
                watcher: Rc::downgrade(&watcher),
            },
        }
    }
}
