#![allow(dead_code)]

use std::error::Error;

use scopewatch::{Scope, Value};

pub use scopewatch_test_utils::{FaultLog, Recorder, ScopeFixture, init_tracing};

pub type TestResult = Result<(), Box<dyn Error>>;

/// Watch a single property by name.
pub fn prop(name: &'static str) -> impl FnMut(&Scope) -> Value + 'static {
    move |scope: &Scope| scope.get(name)
}

/// Read a numeric property, treating anything else as 0.
pub fn number(scope: &Scope, name: &str) -> f64 {
    scope.get(name).as_f64().unwrap_or(0.0)
}

/// Increment a numeric property in place.
pub fn bump(scope: &Scope, name: &str) {
    let next = number(scope, name) + 1.0;
    scope.set(name, next);
}
