// src/watch/group.rs

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::trace;

use crate::outcome::{ListenerFn, Outcome, WatchFn};
use crate::scope::Scope;
use crate::value::{EqualityMode, Value};
use crate::watch::WatchHandle;

/// Values collected by the members of one group between two firings.
struct GroupState {
    new_values: Vec<Value>,
    old_values: Vec<Value>,
    scheduled: bool,
    first_run: bool,
}

impl GroupState {
    fn new(len: usize) -> Self {
        Self {
            new_values: vec![Value::Undefined; len],
            old_values: vec![Value::Undefined; len],
            scheduled: false,
            first_run: true,
        }
    }
}

impl Scope {
    /// Watch several functions and call `listener` once per digest in which
    /// any of them changed, with the current and previous values of all of
    /// them, in order.
    ///
    /// The combined listener is queued with [`Scope::eval_async`], so it runs
    /// after every member was checked, later in the same digest. On its first
    /// call both slices hold the new values.
    ///
    /// With no watch functions the listener runs exactly once, with empty
    /// slices, on the next async drain, unless the handle is deregistered
    /// first.
    pub fn watch_group<L, R>(&self, watch_fns: Vec<WatchFn>, listener: L) -> WatchHandle
    where
        L: FnMut(&[Value], &[Value], &Scope) -> R + 'static,
        R: Outcome,
    {
        let listener = Rc::new(RefCell::new(listener));

        if watch_fns.is_empty() {
            let armed = Rc::new(Cell::new(true));
            let fire = Rc::clone(&armed);
            self.eval_async(move |scope: &Scope| -> anyhow::Result<()> {
                if !fire.replace(false) {
                    trace!(scope = %scope.id(), "empty watch group deregistered before firing");
                    return Ok(());
                }
                let empty: &[Value] = &[];
                (*listener.borrow_mut())(empty, empty, scope).into_outcome()
            });
            return WatchHandle::pending(armed);
        }

        let state = Rc::new(RefCell::new(GroupState::new(watch_fns.len())));
        let handles = watch_fns
            .into_iter()
            .enumerate()
            .map(|(slot, watch)| {
                let state = Rc::clone(&state);
                let listener = Rc::clone(&listener);
                let member: ListenerFn = Box::new(
                    move |new: &Value, old: &Value, scope: &Scope| -> anyhow::Result<()> {
                        let schedule = {
                            let mut group = state.borrow_mut();
                            group.new_values[slot] = new.clone();
                            group.old_values[slot] = old.clone();
                            !std::mem::replace(&mut group.scheduled, true)
                        };
                        if schedule {
                            let state = Rc::clone(&state);
                            let listener = Rc::clone(&listener);
                            scope.eval_async(move |scope: &Scope| fire_group(&state, &listener, scope));
                        }
                        Ok(())
                    },
                );
                self.register_watcher(watch, member, EqualityMode::Reference)
            })
            .collect();

        WatchHandle::group(handles)
    }
}

fn fire_group<L, R>(
    state: &RefCell<GroupState>,
    listener: &RefCell<L>,
    scope: &Scope,
) -> anyhow::Result<()>
where
    L: FnMut(&[Value], &[Value], &Scope) -> R,
    R: Outcome,
{
    let (new_values, old_values) = {
        let mut group = state.borrow_mut();
        group.scheduled = false;
        let new_values = group.new_values.clone();
        let old_values = if std::mem::replace(&mut group.first_run, false) {
            new_values.clone()
        } else {
            group.old_values.clone()
        };
        (new_values, old_values)
    };
    (*listener.borrow_mut())(&new_values, &old_values, scope).into_outcome()
}
