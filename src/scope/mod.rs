// src/scope/mod.rs

//! Scope tree.
//!
//! A [`Scope`] is a cheap, clonable handle to one node of the tree. It holds
//! the node's properties and watchers plus a reference to the state shared
//! by the whole tree (queues, phase, timers), handed down at construction.
//!
//! - `props` implements property lookup through the prototype chain.
//! - `tree` implements child creation, traversal and destruction.
//! - [`fault`] defines [`Fault`] and the fault hook.
//!
//! Parent and prototype links are weak. A parent keeps its children alive
//! through its child list; a root keeps the whole tree alive.

pub mod fault;
mod props;
mod tree;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::{ConfigFile, DigestConfig};
use crate::digest::TreeState;
use crate::timers::{MacrotaskScheduler, ManualTimers};
use crate::value::Value;
use crate::watch::WatcherList;

pub use fault::Fault;

use props::Properties;

/// Extra bindings visible to an expression evaluated with
/// [`Scope::eval_with_locals`].
pub type Locals = BTreeMap<String, Value>;

/// Identifier of a scope, unique within its tree. The root is `scope#1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u64);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// Handle to a node of a scope tree.
///
/// Cloning the handle does not create a new scope. Two handles compare equal
/// when they point at the same node.
#[derive(Clone)]
pub struct Scope {
    pub(crate) inner: Rc<ScopeInner>,
}

pub(crate) struct ScopeInner {
    pub(crate) id: ScopeId,
    pub(crate) props: Properties,
    pub(crate) parent: Option<Weak<ScopeInner>>,
    pub(crate) children: RefCell<Vec<Scope>>,
    pub(crate) watchers: WatcherList,
    pub(crate) tree: Rc<TreeState>,
    pub(crate) isolated: bool,
}

impl Scope {
    /// New root scope with the default digest config and a [`ManualTimers`]
    /// backend.
    ///
    /// Deferred work (`eval_async` fallback digests, `apply_async` flushes)
    /// then only runs when the host drives the timers; use
    /// [`Scope::builder`] to pass a shared handle to them, or a different
    /// backend.
    pub fn new() -> Self {
        ScopeBuilder::new().build()
    }

    pub fn builder() -> ScopeBuilder {
        ScopeBuilder::new()
    }

    pub(crate) fn from_inner(inner: Rc<ScopeInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn tree(&self) -> &Rc<TreeState> {
        &self.inner.tree
    }

    pub fn id(&self) -> ScopeId {
        self.inner.id
    }

    /// Hierarchy parent, or `None` for the root.
    pub fn parent(&self) -> Option<Scope> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Scope::from_inner)
    }

    /// Root of this scope's tree.
    pub fn root(&self) -> Scope {
        self.tree().root().unwrap_or_else(|| self.clone())
    }

    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// Snapshot of the current child list, in creation order.
    pub fn children(&self) -> Vec<Scope> {
        self.inner.children.borrow().clone()
    }

    pub fn is_isolated(&self) -> bool {
        self.inner.isolated
    }

    /// Number of live watchers registered directly on this scope.
    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.live_count()
    }

    // ---------------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------------

    /// Read a property, falling back to the prototype chain.
    /// Missing properties read as [`Value::Undefined`].
    pub fn get(&self, name: &str) -> Value {
        self.inner.props.get(name).unwrap_or_default()
    }

    /// Read a property from `locals` first, then from the scope.
    pub fn get_with_locals(&self, name: &str, locals: &Locals) -> Value {
        match locals.get(name) {
            Some(value) => value.clone(),
            None => self.get(name),
        }
    }

    /// Assign a property on this scope. Never writes to an ancestor.
    /// Returns the previous local value.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.props.set(name.into(), value.into())
    }

    /// Whether `name` resolves on this scope or its prototype chain.
    pub fn has(&self, name: &str) -> bool {
        self.inner.props.has(name)
    }

    /// Whether `name` is set locally on this scope.
    pub fn has_own(&self, name: &str) -> bool {
        self.inner.props.has_own(name)
    }

    /// Remove a local property, uncovering any inherited one.
    pub fn remove(&self, name: &str) -> Option<Value> {
        self.inner.props.remove(name)
    }

    /// Names of the properties set locally on this scope.
    pub fn own_keys(&self) -> Vec<String> {
        self.inner.props.own_keys()
    }

    /// Evaluate `expr` with extra local bindings. See [`Scope::eval`].
    pub fn eval_with_locals<T>(
        &self,
        expr: impl FnOnce(&Scope, &Locals) -> T,
        locals: &Locals,
    ) -> T {
        expr(self, locals)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Scope {}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id())
            .field("parent", &self.parent().map(|p| p.id()))
            .field("isolated", &self.is_isolated())
            .field("children", &self.inner.children.borrow().len())
            .field("watchers", &self.watcher_count())
            .field("phase", &self.phase())
            .finish()
    }
}

/// Builder for a root scope.
///
/// ```
/// use std::rc::Rc;
/// use scopewatch::{DigestConfig, Scope, Value};
/// use scopewatch::timers::ManualTimers;
///
/// let timers = Rc::new(ManualTimers::new());
/// let root = Scope::builder()
///     .config(DigestConfig { ttl: 5 })
///     .timers(timers.clone())
///     .build();
///
/// root.eval_async(|scope: &Scope| {
///     scope.set("ready", true);
/// });
/// assert_eq!(timers.pending(), 1);
/// timers.run_all();
/// assert_eq!(root.get("ready"), Value::Bool(true));
/// ```
pub struct ScopeBuilder {
    config: DigestConfig,
    timers: Option<Rc<dyn MacrotaskScheduler>>,
}

impl ScopeBuilder {
    pub fn new() -> Self {
        Self {
            config: DigestConfig::default(),
            timers: None,
        }
    }

    pub fn config(mut self, config: DigestConfig) -> Self {
        self.config = config;
        self
    }

    /// Use the `[digest]` section of a validated config file.
    pub fn from_config(self, cfg: &ConfigFile) -> Self {
        self.config(cfg.digest)
    }

    pub fn timers(mut self, timers: Rc<dyn MacrotaskScheduler>) -> Self {
        self.timers = Some(timers);
        self
    }

    pub fn build(self) -> Scope {
        let timers = self
            .timers
            .unwrap_or_else(|| Rc::new(ManualTimers::new()));
        let tree = Rc::new(TreeState::new(self.config, timers));
        let id = tree.next_scope_id();

        let inner = Rc::new(ScopeInner {
            id,
            props: Properties::new(None),
            parent: None,
            children: RefCell::new(Vec::new()),
            watchers: WatcherList::default(),
            tree: Rc::clone(&tree),
            isolated: false,
        });
        tree.set_root(Rc::downgrade(&inner));
        tracing::debug!(scope = %id, ttl = self.config.ttl, "root scope created");
        Scope::from_inner(inner)
    }
}

impl Default for ScopeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
