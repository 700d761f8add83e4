// src/digest/phase.rs

use tracing::trace;

use crate::digest::TreeState;
use crate::errors::{Result, ScopeError};
use crate::types::Phase;

/// RAII guard for the tree's phase.
///
/// Entering fails with [`ScopeError::PhaseInProgress`] if any phase is already
/// active, without touching tree state. The phase is cleared when the guard is
/// dropped, including during unwinding.
#[derive(Debug)]
pub(crate) struct PhaseGuard<'a> {
    tree: &'a TreeState,
    phase: Phase,
}

impl<'a> PhaseGuard<'a> {
    pub(crate) fn begin(tree: &'a TreeState, phase: Phase) -> Result<Self> {
        if let Some(active) = tree.phase() {
            return Err(ScopeError::PhaseInProgress(active));
        }
        tree.set_phase(Some(phase));
        trace!(%phase, "phase entered");
        Ok(Self { tree, phase })
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.tree.set_phase(None);
        trace!(phase = %self.phase, "phase cleared");
    }
}
