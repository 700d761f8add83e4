#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use scopewatch::{FaultKind, Scope, ScopeId};

/// Shared log of values captured by listeners.
///
/// Clone it into a closure; every clone appends to the same log.
#[derive(Debug)]
pub struct Recorder<T> {
    calls: Rc<RefCell<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            calls: Rc::clone(&self.calls),
        }
    }
}

impl<T: Clone> Recorder<T> {
    pub fn new() -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn record(&self, value: T) {
        self.calls.borrow_mut().push(value);
    }

    pub fn calls(&self) -> Vec<T> {
        self.calls.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }

    pub fn last(&self) -> Option<T> {
        self.calls.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl<T: Clone> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A contained fault, with the error flattened to a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFault {
    pub kind: FaultKind,
    pub scope: ScopeId,
    pub message: String,
}

/// Captures the faults a scope tree reports through its fault hook.
#[derive(Debug, Clone, Default)]
pub struct FaultLog {
    faults: Recorder<RecordedFault>,
}

impl FaultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install this log as the tree-wide fault hook of `scope`.
    pub fn install(&self, scope: &Scope) {
        let faults = self.faults.clone();
        scope.on_fault(move |fault| {
            faults.record(RecordedFault {
                kind: fault.kind,
                scope: fault.scope,
                message: format!("{:#}", fault.error),
            });
        });
    }

    pub fn all(&self) -> Vec<RecordedFault> {
        self.faults.calls()
    }

    pub fn kinds(&self) -> Vec<FaultKind> {
        self.faults.calls().into_iter().map(|f| f.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.faults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }
}
