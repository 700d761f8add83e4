#![allow(dead_code)]

use std::rc::Rc;

use scopewatch::timers::ManualTimers;
use scopewatch::{DigestConfig, Scope};

use crate::recorder::FaultLog;

/// Root scope wired to a [`ManualTimers`] backend and a [`FaultLog`].
///
/// Deferred digests and apply-async flushes only run when the test calls
/// [`ScopeFixture::run_timers`] (or drives `timers` directly).
pub struct ScopeFixture {
    pub root: Scope,
    pub timers: Rc<ManualTimers>,
    pub faults: FaultLog,
}

impl ScopeFixture {
    pub fn new() -> Self {
        Self::with_config(DigestConfig::default())
    }

    pub fn with_ttl(ttl: usize) -> Self {
        Self::with_config(DigestConfig { ttl })
    }

    pub fn with_config(config: DigestConfig) -> Self {
        let timers = Rc::new(ManualTimers::new());
        let root = Scope::builder()
            .config(config)
            .timers(timers.clone())
            .build();
        let faults = FaultLog::new();
        faults.install(&root);
        Self {
            root,
            timers,
            faults,
        }
    }

    /// Run every pending macrotask, including ones they schedule.
    pub fn run_timers(&self) -> usize {
        self.timers.run_all()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }
}

impl Default for ScopeFixture {
    fn default() -> Self {
        Self::new()
    }
}
