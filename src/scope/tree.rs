// src/scope/tree.rs

//! Tree operations: child creation, traversal and destruction.

use std::rc::Rc;

use tracing::debug;

use crate::scope::props::Properties;
use crate::scope::{Scope, ScopeInner};

impl Scope {
    /// Create a child scope.
    ///
    /// - A non-isolated child reads through to this scope's properties.
    /// - An isolated child sees none of its ancestors' properties.
    /// - `parent_override` registers the child under a different scope for
    ///   traversal, while properties still come from `self`.
    ///
    /// In every case the child joins the same tree: it shares the queues,
    /// phase and timers with the root.
    pub fn new_scope(&self, isolated: bool, parent_override: Option<&Scope>) -> Scope {
        let parent = parent_override.unwrap_or(self);
        let (tree, proto) = if isolated {
            (Rc::clone(parent.tree()), None)
        } else {
            (Rc::clone(self.tree()), Some(Rc::downgrade(&self.inner)))
        };

        let id = tree.next_scope_id();
        let child = Scope::from_inner(Rc::new(ScopeInner {
            id,
            props: Properties::new(proto),
            parent: Some(Rc::downgrade(&parent.inner)),
            children: Default::default(),
            watchers: Default::default(),
            tree,
            isolated,
        }));

        parent.inner.children.borrow_mut().push(child.clone());
        debug!(scope = %id, parent = %parent.id(), isolated, "scope created");
        child
    }

    /// Shorthand for `new_scope(false, None)`.
    pub fn new_child(&self) -> Scope {
        self.new_scope(false, None)
    }

    /// Shorthand for `new_scope(true, None)`.
    pub fn new_isolated(&self) -> Scope {
        self.new_scope(true, None)
    }

    /// Visit this scope and its descendants depth-first, parents before
    /// children.
    ///
    /// A subtree is skipped as soon as `visit` returns `false` for its root.
    /// Returns `true` only if every visited scope returned `true`.
    pub fn every_scope(&self, mut visit: impl FnMut(&Scope) -> bool) -> bool {
        self.every_scope_inner(&mut visit)
    }

    fn every_scope_inner(&self, visit: &mut dyn FnMut(&Scope) -> bool) -> bool {
        if !visit(self) {
            return false;
        }
        // Snapshot: `visit` may create or destroy scopes. A child destroyed
        // by an earlier sibling's callbacks is skipped with its subtree.
        let children = self.children();
        children.iter().all(|child| {
            if !self.inner.children.borrow().contains(child) {
                return true;
            }
            child.every_scope_inner(visit)
        })
    }

    /// Detach this scope from its parent and drop all of its watchers.
    ///
    /// Children are not destroyed: they stay attached to this scope and keep
    /// their own watchers, but are no longer reached by digests. Destroying
    /// the root does nothing.
    pub fn destroy(&self) {
        let Some(parent) = self.parent() else {
            return;
        };

        parent
            .inner
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(&child.inner, &self.inner));

        let dropped = self.inner.watchers.clear();
        self.tree().invalidate_last_dirty();
        debug!(scope = %self.id(), watchers = dropped, "scope destroyed");
    }
}
