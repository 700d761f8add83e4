// src/scope/fault.rs

use std::fmt;
use std::rc::Rc;

use crate::scope::{Scope, ScopeId};
use crate::types::FaultKind;

/// A failure contained by the digest loop.
///
/// Faults never reach the caller of `digest`/`apply`. They are logged at
/// `error` level and then handed to the hook installed with
/// [`Scope::on_fault`], if any.
#[derive(Debug)]
pub struct Fault<'a> {
    pub kind: FaultKind,
    /// Scope the failing callback belongs to.
    pub scope: ScopeId,
    pub error: &'a anyhow::Error,
}

impl fmt::Display for Fault<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fault on {}: {:#}", self.kind, self.scope, self.error)
    }
}

impl Scope {
    /// Install the tree-wide fault hook, replacing any previous one.
    pub fn on_fault(&self, handler: impl Fn(&Fault<'_>) + 'static) {
        self.tree().set_fault_handler(Some(Rc::new(handler)));
    }

    /// Remove the tree-wide fault hook. Faults are still logged.
    pub fn clear_fault_handler(&self) {
        self.tree().set_fault_handler(None);
    }
}
