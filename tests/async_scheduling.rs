// tests/async_scheduling.rs

mod common;
use crate::common::{Recorder, ScopeFixture, TestResult, bump, init_tracing, prop};

use std::cell::Cell;
use std::rc::Rc;

use scopewatch::{FaultKind, Phase, Scope, ScopeError, Value};

/// Count how many times a property watch function is evaluated.
fn count_evaluations(scope: &Scope, name: &'static str) -> Rc<Cell<usize>> {
    let evaluations = Rc::new(Cell::new(0usize));
    let counted = Rc::clone(&evaluations);
    scope.watch_only(move |scope: &Scope| {
        counted.set(counted.get() + 1);
        scope.get(name)
    });
    evaluations
}

fn ping_pong(scope: &Scope) {
    scope.watch(prop("a"), |_: &Value, _: &Value, scope: &Scope| bump(scope, "b"));
    scope.watch(prop("b"), |_: &Value, _: &Value, scope: &Scope| bump(scope, "a"));
}

// -------------------------------------------------------------------------
// eval_async
// -------------------------------------------------------------------------

#[test]
fn eval_async_from_listener_runs_in_the_same_digest() -> TestResult {
    init_tracing();
    let fx = ScopeFixture::new();
    fx.root.set("a", 1);
    fx.root.watch(prop("a"), |_: &Value, _: &Value, scope: &Scope| {
        scope.eval_async(|scope: &Scope| {
            scope.set("async_evaluated", true);
        });
    });

    fx.root.digest()?;

    assert_eq!(fx.root.get("async_evaluated"), Value::Bool(true));
    assert_eq!(fx.pending_timers(), 0);
    Ok(())
}

#[test]
fn eval_async_runs_on_the_owning_scope() -> TestResult {
    init_tracing();
    let fx = ScopeFixture::new();
    let child = fx.root.new_child();
    let owners = Recorder::<Scope>::new();

    let sink = owners.clone();
    child.eval_async(move |scope: &Scope| sink.record(scope.clone()));
    fx.root.digest()?;

    assert_eq!(owners.calls(), vec![child]);
    Ok(())
}

#[test]
fn eval_async_outside_digest_schedules_one_deferred_digest() {
    init_tracing();
    let fx = ScopeFixture::new();
    let evaluations = count_evaluations(&fx.root, "a");

    fx.root.eval_async(|scope: &Scope| {
        scope.set("a", 1);
    });
    fx.root.eval_async(|scope: &Scope| {
        scope.set("a", 2);
    });

    assert_eq!(fx.pending_timers(), 1);
    assert_eq!(fx.root.get("a"), Value::Undefined);
    assert_eq!(evaluations.get(), 0);

    assert_eq!(fx.run_timers(), 1);
    assert_eq!(fx.root.get("a"), Value::from(2));
    assert!(evaluations.get() > 0);
}

#[test]
fn deferred_digest_is_skipped_when_the_queue_was_already_drained() -> TestResult {
    init_tracing();
    let fx = ScopeFixture::new();
    let evaluations = count_evaluations(&fx.root, "a");

    fx.root.eval_async(|scope: &Scope| {
        scope.set("a", 1);
    });
    fx.root.digest()?;
    let after_manual_digest = evaluations.get();

    fx.run_timers();

    assert_eq!(evaluations.get(), after_manual_digest);
    Ok(())
}

#[test]
fn eval_async_queued_by_every_watch_call_exhausts_the_ttl() {
    init_tracing();
    let fx = ScopeFixture::new();
    fx.root.watch_only(|scope: &Scope| {
        scope.eval_async(|_: &Scope| {});
        Value::from("stable")
    });

    let result = fx.root.digest();
    assert!(matches!(result, Err(ScopeError::DigestTtlExceeded { ttl: 10 })));
}

#[test]
fn failing_async_task_does_not_abort_the_drain() -> TestResult {
    init_tracing();
    let fx = ScopeFixture::new();

    fx.root
        .eval_async(|_: &Scope| Err::<(), _>(anyhow::anyhow!("async task failed")));
    fx.root.eval_async(|scope: &Scope| {
        scope.set("after", true);
    });
    fx.root.digest()?;

    assert_eq!(fx.root.get("after"), Value::Bool(true));
    assert_eq!(fx.faults.kinds(), vec![FaultKind::AsyncTask]);
    Ok(())
}

#[test]
fn failing_deferred_digest_is_reported_as_a_fault() {
    init_tracing();
    let fx = ScopeFixture::new();
    ping_pong(&fx.root);

    fx.root.eval_async(|_: &Scope| {});
    fx.run_timers();

    assert_eq!(fx.faults.kinds(), vec![FaultKind::DeferredDigest]);
    assert!(fx.faults.all()[0].message.contains("10 digest iterations reached"));
    assert_eq!(fx.root.phase(), None);
}

// -------------------------------------------------------------------------
// apply_async
// -------------------------------------------------------------------------

#[test]
fn apply_async_never_runs_synchronously() {
    init_tracing();
    let fx = ScopeFixture::new();

    fx.root.apply_async(|scope: &Scope| {
        scope.set("a", 1);
    });

    assert_eq!(fx.root.get("a"), Value::Undefined);
    assert_eq!(fx.pending_timers(), 1);

    fx.run_timers();
    assert_eq!(fx.root.get("a"), Value::from(1));
}

#[test]
fn apply_async_calls_are_coalesced_into_one_digest() -> TestResult {
    init_tracing();
    let fx = ScopeFixture::new();
    let evaluations = count_evaluations(&fx.root, "a");
    let calls = Recorder::<Value>::new();
    let sink = calls.clone();
    fx.root.watch(prop("a"), move |new: &Value, _: &Value, _: &Scope| {
        sink.record(new.clone())
    });
    fx.root.digest()?;
    let before = evaluations.get();

    fx.root.apply_async(|scope: &Scope| {
        scope.set("a", 1);
    });
    fx.root.apply_async(|scope: &Scope| {
        scope.set("a", 2);
    });
    assert_eq!(fx.pending_timers(), 1);

    assert_eq!(fx.run_timers(), 1);

    assert_eq!(fx.root.get("a"), Value::from(2));
    // One digest: a dirty sweep plus the sweep that confirms it settled.
    assert_eq!(evaluations.get() - before, 2);
    assert_eq!(calls.calls(), vec![Value::Undefined, Value::from(2)]);
    Ok(())
}

#[test]
fn manual_digest_takes_over_a_pending_apply_async_flush() -> TestResult {
    init_tracing();
    let fx = ScopeFixture::new();

    fx.root.apply_async(|scope: &Scope| {
        scope.set("a", 42);
    });
    fx.root.digest()?;

    assert_eq!(fx.root.get("a"), Value::from(42));
    assert_eq!(fx.pending_timers(), 0);
    assert_eq!(fx.run_timers(), 0);

    // A fresh call schedules a fresh flush.
    fx.root.apply_async(|scope: &Scope| {
        scope.set("a", 43);
    });
    assert_eq!(fx.pending_timers(), 1);
    fx.run_timers();
    assert_eq!(fx.root.get("a"), Value::from(43));
    Ok(())
}

#[test]
fn apply_async_from_listener_runs_after_the_digest() -> TestResult {
    init_tracing();
    let fx = ScopeFixture::new();
    fx.root.set("a", 1);
    let scheduled = Rc::new(Cell::new(false));
    fx.root.watch(prop("a"), move |_: &Value, _: &Value, scope: &Scope| {
        if !scheduled.replace(true) {
            scope.apply_async(|scope: &Scope| {
                scope.set("applied", true);
            });
        }
    });

    fx.root.digest()?;
    assert_eq!(fx.root.get("applied"), Value::Undefined);

    fx.run_timers();
    assert_eq!(fx.root.get("applied"), Value::Bool(true));
    Ok(())
}

#[test]
fn failing_apply_async_task_is_contained() {
    init_tracing();
    let fx = ScopeFixture::new();

    fx.root
        .apply_async(|_: &Scope| Err::<(), _>(anyhow::anyhow!("apply-async failed")));
    fx.root.apply_async(|scope: &Scope| {
        scope.set("after", true);
    });
    fx.run_timers();

    assert_eq!(fx.root.get("after"), Value::Bool(true));
    assert_eq!(fx.faults.kinds(), vec![FaultKind::ApplyAsync]);
}

// -------------------------------------------------------------------------
// post_digest
// -------------------------------------------------------------------------

#[test]
fn post_digest_runs_once_after_the_next_digest_outside_any_phase() -> TestResult {
    init_tracing();
    let fx = ScopeFixture::new();
    let phases = Recorder::<Option<Phase>>::new();

    let sink = phases.clone();
    let scope = fx.root.clone();
    fx.root.post_digest(move || sink.record(scope.phase()));
    assert!(phases.is_empty());

    fx.root.digest()?;
    assert_eq!(phases.calls(), vec![None]);

    fx.root.digest()?;
    assert_eq!(phases.len(), 1);
    Ok(())
}

#[test]
fn changes_made_in_post_digest_wait_for_the_next_digest() -> TestResult {
    init_tracing();
    let fx = ScopeFixture::new();
    fx.root.set("a", 1);
    let calls = Recorder::<Value>::new();
    let sink = calls.clone();
    fx.root.watch(prop("a"), move |new: &Value, _: &Value, _: &Scope| {
        sink.record(new.clone())
    });

    let scope = fx.root.clone();
    fx.root.post_digest(move || {
        scope.set("a", 2);
    });
    fx.root.digest()?;
    assert_eq!(calls.calls(), vec![Value::from(1)]);

    fx.root.digest()?;
    assert_eq!(calls.calls(), vec![Value::from(1), Value::from(2)]);
    Ok(())
}

#[test]
fn failing_post_digest_callback_does_not_stop_the_rest() -> TestResult {
    init_tracing();
    let fx = ScopeFixture::new();
    let ran = Recorder::<&'static str>::new();

    fx.root
        .post_digest(|| Err::<(), _>(anyhow::anyhow!("post-digest failed")));
    let sink = ran.clone();
    fx.root.post_digest(move || sink.record("second"));
    fx.root.digest()?;

    assert_eq!(ran.calls(), vec!["second"]);
    assert_eq!(fx.faults.kinds(), vec![FaultKind::PostDigest]);
    Ok(())
}

// -------------------------------------------------------------------------
// apply and phases
// -------------------------------------------------------------------------

#[test]
fn apply_evaluates_then_digests_from_the_root() -> TestResult {
    init_tracing();
    let fx = ScopeFixture::new();
    let child = fx.root.new_child();
    let calls = Recorder::<Value>::new();
    let sink = calls.clone();
    fx.root.watch(prop("a"), move |new: &Value, _: &Value, _: &Scope| {
        sink.record(new.clone())
    });

    let returned = child.apply(|scope| {
        scope.root().set("a", "applied");
        7
    })?;

    assert_eq!(returned, 7);
    assert_eq!(calls.calls(), vec![Value::from("applied")]);
    Ok(())
}

#[test]
fn phases_are_visible_to_callbacks() -> TestResult {
    init_tracing();
    let fx = ScopeFixture::new();
    let in_listener = Recorder::<Option<Phase>>::new();
    let sink = in_listener.clone();
    fx.root.watch(prop("a"), move |_: &Value, _: &Value, scope: &Scope| {
        sink.record(scope.phase())
    });

    let in_apply = fx.root.apply(|scope| scope.phase())?;

    assert_eq!(in_apply, Some(Phase::Apply));
    assert_eq!(in_listener.calls(), vec![Some(Phase::Digest)]);
    assert_eq!(fx.root.phase(), None);
    Ok(())
}

#[test]
fn nested_apply_is_rejected_without_side_effects() -> TestResult {
    init_tracing();
    let fx = ScopeFixture::new();
    let evaluations = count_evaluations(&fx.root, "a");

    let inner = fx.root.apply(|scope| {
        scope.apply(|scope| {
            scope.set("a", "never");
        })
    })?;

    match inner {
        Err(ScopeError::PhaseInProgress(phase)) => assert_eq!(phase, Phase::Apply),
        other => panic!("expected PhaseInProgress, got {other:?}"),
    }
    assert_eq!(fx.root.get("a"), Value::Undefined);
    // Only the outer apply's digest ran.
    assert_eq!(evaluations.get(), 2);
    Ok(())
}

#[test]
fn failing_apply_expression_still_digests() {
    init_tracing();
    let fx = ScopeFixture::new();
    let calls = Recorder::<Value>::new();
    let sink = calls.clone();
    fx.root.watch(prop("a"), move |new: &Value, _: &Value, _: &Scope| {
        sink.record(new.clone())
    });

    let result = fx.root.try_apply(|scope| {
        scope.set("a", 1);
        Err::<(), _>(anyhow::anyhow!("expression failed"))
    });

    match result {
        Err(ScopeError::Expression(err)) => assert_eq!(err.to_string(), "expression failed"),
        other => panic!("expected Expression error, got {other:?}"),
    }
    assert_eq!(calls.calls(), vec![Value::from(1)]);
    assert_eq!(fx.root.phase(), None);
}

#[test]
fn digest_failure_takes_precedence_over_expression_failure() {
    init_tracing();
    let fx = ScopeFixture::new();
    ping_pong(&fx.root);

    let result = fx
        .root
        .try_apply(|_| Err::<(), _>(anyhow::anyhow!("expression failed")));

    assert!(matches!(result, Err(ScopeError::DigestTtlExceeded { .. })));
}

#[test]
fn try_apply_returns_the_value_on_success() -> TestResult {
    init_tracing();
    let fx = ScopeFixture::new();

    let value = fx
        .root
        .try_apply(|scope| -> anyhow::Result<f64> {
            scope.set("a", 2);
            Ok(scope.get("a").as_f64().unwrap_or(0.0) * 21.0)
        })?;

    assert_eq!(value, 42.0);
    Ok(())
}
