// src/digest/scheduler.rs

//! Convergence loop and scheduling entry points.
//!
//! High-level flow of one digest (always run on the root):
//! 1. Enter [`Phase::Digest`] and forget the last-dirty marker.
//! 2. If an apply-async flush is pending, cancel its timer and flush now.
//! 3. Loop: drain the async queue, sweep every scope once, stop when the
//!    sweep was clean and nothing new was queued. Each dirty iteration
//!    consumes one unit of the ttl budget.
//! 4. Leave the phase and run the post-digest callbacks.

use std::rc::Rc;

use tracing::{debug, error, trace, warn};

use crate::digest::{AsyncTask, PhaseGuard};
use crate::errors::{Result, ScopeError};
use crate::outcome::Outcome;
use crate::scope::Scope;
use crate::types::{FaultKind, Phase};
use crate::watch::registry::Check;

impl Scope {
    /// Evaluate `expr` against this scope, synchronously and without any
    /// phase check.
    pub fn eval<T>(&self, expr: impl FnOnce(&Scope) -> T) -> T {
        expr(self)
    }

    /// Run a digest of the whole tree.
    ///
    /// Whatever scope it is called on, the digest starts at the root.
    /// Fails with [`ScopeError::PhaseInProgress`] when called from inside a
    /// digest or apply, and with [`ScopeError::DigestTtlExceeded`] when the
    /// tree does not settle within the configured budget.
    pub fn digest(&self) -> Result<()> {
        self.root().digest_from_root()
    }

    /// Evaluate `expr` inside [`Phase::Apply`], then digest the tree.
    ///
    /// The digest runs before this returns; if it fails, its error is
    /// returned instead of the value.
    pub fn apply<T>(&self, expr: impl FnOnce(&Scope) -> T) -> Result<T> {
        let value = {
            let _phase = PhaseGuard::begin(self.tree(), Phase::Apply)?;
            trace!(scope = %self.id(), "apply");
            self.eval(expr)
        };
        self.root().digest_from_root()?;
        Ok(value)
    }

    /// Like [`Scope::apply`] for fallible expressions.
    ///
    /// A failing expression still triggers the digest. A digest failure takes
    /// precedence; otherwise the expression error comes back as
    /// [`ScopeError::Expression`].
    pub fn try_apply<T, E>(
        &self,
        expr: impl FnOnce(&Scope) -> std::result::Result<T, E>,
    ) -> Result<T>
    where
        E: Into<anyhow::Error>,
    {
        let outcome = {
            let _phase = PhaseGuard::begin(self.tree(), Phase::Apply)?;
            trace!(scope = %self.id(), "apply");
            self.eval(expr).map_err(Into::into)
        };

        match (self.root().digest_from_root(), outcome) {
            (Err(err), Err(expr_err)) => {
                warn!(error = %expr_err, "apply expression failed before a failing digest");
                Err(err)
            }
            (Err(err), Ok(_)) => Err(err),
            (Ok(()), Err(expr_err)) => Err(ScopeError::Expression(expr_err)),
            (Ok(()), Ok(value)) => Ok(value),
        }
    }

    /// Queue `expr` to run on this scope during the current or next digest.
    ///
    /// Outside any phase, the first queued task also schedules a digest of
    /// the root on the next macrotask. That digest is skipped if the queue
    /// has been drained by the time it fires.
    pub fn eval_async<E, R>(&self, expr: E)
    where
        E: FnOnce(&Scope) -> R + 'static,
        R: Outcome,
    {
        let tree = self.tree();
        if tree.phase().is_none() && !tree.has_pending_async() {
            let weak = Rc::downgrade(&self.inner);
            let timer = tree.timers().set_timeout(Box::new(move || {
                let Some(scope) = weak.upgrade().map(Scope::from_inner) else {
                    return;
                };
                if scope.tree().has_pending_async() {
                    if let Err(err) = scope.digest() {
                        scope.report_deferred(err);
                    }
                } else {
                    trace!("deferred digest skipped, async queue already drained");
                }
            }));
            debug!(%timer, scope = %self.id(), "deferred digest scheduled");
        }

        tree.push_async(AsyncTask {
            scope: self.clone(),
            expression: Box::new(move |scope: &Scope| expr(scope).into_outcome()),
        });
    }

    /// Queue `expr` for a batched apply on the next macrotask.
    ///
    /// All calls made before the flush fires share one timer and one digest.
    /// A digest started before the timer fires cancels it and flushes the
    /// queue itself.
    pub fn apply_async<E, R>(&self, expr: E)
    where
        E: FnOnce(&Scope) -> R + 'static,
        R: Outcome,
    {
        let tree = self.tree();
        tree.push_apply_async(AsyncTask {
            scope: self.clone(),
            expression: Box::new(move |scope: &Scope| expr(scope).into_outcome()),
        });

        if tree.apply_async_timer().is_none() {
            let weak = Rc::downgrade(&self.inner);
            let timer = tree.timers().set_timeout(Box::new(move || {
                let Some(scope) = weak.upgrade().map(Scope::from_inner) else {
                    return;
                };
                if let Err(err) = scope.apply(|scope| scope.flush_apply_async()) {
                    scope.report_deferred(err);
                }
            }));
            tree.set_apply_async_timer(Some(timer));
            debug!(%timer, scope = %self.id(), "apply-async flush scheduled");
        }
    }

    /// Run `callback` once, after the next digest completes and outside of
    /// any phase.
    pub fn post_digest<F, R>(&self, callback: F)
    where
        F: FnOnce() -> R + 'static,
        R: Outcome,
    {
        self.tree()
            .push_post_digest(Box::new(move || callback().into_outcome()));
    }

    /// Current phase of this scope's tree.
    pub fn phase(&self) -> Option<Phase> {
        self.tree().phase()
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn digest_from_root(&self) -> Result<()> {
        let tree = Rc::clone(self.tree());
        let phase = PhaseGuard::begin(&tree, Phase::Digest)?;
        tree.invalidate_last_dirty();
        debug!(scope = %self.id(), "digest started");

        if let Some(timer) = tree.apply_async_timer() {
            tree.timers().clear_timeout(timer);
            debug!(%timer, "digest takes over pending apply-async flush");
            self.flush_apply_async();
        }

        let ttl = tree.config().ttl;
        let mut remaining = ttl.max(1);
        let mut sweeps = 0usize;
        loop {
            self.drain_async_queue();
            let dirty = self.digest_once();
            sweeps += 1;
            trace!(sweeps, dirty, "sweep finished");

            if !dirty && !tree.has_pending_async() {
                break;
            }
            remaining -= 1;
            if remaining == 0 {
                drop(phase);
                self.compact_watchers();
                error!(ttl, sweeps, "digest did not converge");
                return Err(ScopeError::DigestTtlExceeded { ttl });
            }
        }

        drop(phase);
        self.compact_watchers();
        debug!(sweeps, "digest converged");
        self.drain_post_digest();
        Ok(())
    }

    /// One sweep over every scope of the tree. Returns whether any watcher
    /// was dirty.
    pub(crate) fn digest_once(&self) -> bool {
        let mut dirty = false;
        self.every_scope(|scope| scope.sweep_watchers(&mut dirty));
        dirty
    }

    /// Check this scope's watchers in registration order. Returns `false`
    /// once the sweep reaches the last dirty watcher again, which stops the
    /// tree traversal.
    fn sweep_watchers(&self, dirty: &mut bool) -> bool {
        let tree = self.tree();
        let mut index = 0;
        // The length is re-read on every step: watchers may be added or
        // deregistered by the very callbacks being run.
        while let Some(watcher) = self.inner.watchers.get(index) {
            index += 1;
            if watcher.is_removed() {
                continue;
            }
            match watcher.check(self, tree) {
                Check::Dirty => *dirty = true,
                Check::Settled => return false,
                Check::Clean | Check::Failed => {}
            }
        }
        true
    }

    /// Drop watchers deregistered during the digest from every scope still
    /// attached to the tree.
    fn compact_watchers(&self) {
        self.every_scope(|scope| {
            scope.inner.watchers.compact();
            true
        });
    }

    fn drain_async_queue(&self) {
        let tree = self.tree();
        while let Some(AsyncTask { scope, expression }) = tree.pop_async() {
            if let Err(err) = scope.eval(expression) {
                tree.report_fault(FaultKind::AsyncTask, scope.id(), &err);
            }
        }
    }

    pub(crate) fn flush_apply_async(&self) {
        let tree = self.tree();
        let mut flushed = 0usize;
        while let Some(AsyncTask { scope, expression }) = tree.pop_apply_async() {
            flushed += 1;
            if let Err(err) = scope.eval(expression) {
                tree.report_fault(FaultKind::ApplyAsync, scope.id(), &err);
            }
        }
        tree.set_apply_async_timer(None);
        debug!(flushed, "apply-async queue flushed");
    }

    fn drain_post_digest(&self) {
        let tree = self.tree();
        while let Some(callback) = tree.pop_post_digest() {
            if let Err(err) = callback() {
                tree.report_fault(FaultKind::PostDigest, self.id(), &err);
            }
        }
    }

    fn report_deferred(&self, err: ScopeError) {
        let err = anyhow::Error::from(err);
        self.tree()
            .report_fault(FaultKind::DeferredDigest, self.id(), &err);
    }
}
