// src/watch/collection.rs

//! Shallow collection watching.
//!
//! [`CollectionDiffer`] keeps a private shadow copy of the last observed
//! collection and bumps a counter whenever the contents differ. The watch
//! function installed by `watch_collection` returns that counter, so an
//! ordinary reference-equality watcher fires exactly when the counter moved.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::outcome::{ListenerFn, Outcome, WatchFn, WatchOutput, watch_fn};
use crate::scope::Scope;
use crate::value::equality::same_value;
use crate::value::{EqualityMode, Object, Value};
use crate::watch::WatchHandle;

#[derive(Debug, Clone)]
enum Shadow {
    Scalar(Value),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

/// Change detector for arrays, array-like objects and plain objects.
///
/// - Scalars compare with reference equality (NaN equals NaN).
/// - Array-likes compare length, then every index.
/// - Objects compare keys and values: additions, removals and updates all
///   count as changes.
/// - Switching between these categories is a change.
///
/// ```
/// use scopewatch::{CollectionDiffer, Value};
///
/// let list = Value::array([1, 2]);
/// let mut differ = CollectionDiffer::new();
/// let first = differ.observe(&list);
/// assert_eq!(differ.observe(&list), first);
///
/// list.as_array().unwrap().push(3);
/// assert!(differ.observe(&list) > first);
/// ```
#[derive(Debug, Clone)]
pub struct CollectionDiffer {
    shadow: Shadow,
    change_count: u64,
}

impl CollectionDiffer {
    pub fn new() -> Self {
        Self {
            shadow: Shadow::Scalar(Value::Undefined),
            change_count: 0,
        }
    }

    /// Changes seen so far.
    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    /// Compare `value` with the shadow copy, update the copy, and return
    /// the change counter.
    pub fn observe(&mut self, value: &Value) -> u64 {
        if let Some(items) = value.array_like_items() {
            self.diff_list(&items);
        } else if let Value::Object(object) = value {
            self.diff_map(object);
        } else {
            self.diff_scalar(value);
        }
        self.change_count
    }

    fn diff_scalar(&mut self, value: &Value) {
        let changed = match &self.shadow {
            Shadow::Scalar(previous) => !same_value(value, previous),
            _ => true,
        };
        if changed {
            self.change_count += 1;
        }
        self.shadow = Shadow::Scalar(value.clone());
    }

    fn diff_list(&mut self, items: &[Value]) {
        if !matches!(self.shadow, Shadow::List(_)) {
            self.change_count += 1;
            self.shadow = Shadow::List(Vec::new());
        }
        let Shadow::List(old) = &mut self.shadow else {
            return;
        };

        if old.len() != items.len() {
            self.change_count += 1;
            old.resize(items.len(), Value::Undefined);
        }
        for (previous, item) in old.iter_mut().zip(items) {
            if !same_value(item, previous) {
                self.change_count += 1;
                *previous = item.clone();
            }
        }
    }

    fn diff_map(&mut self, object: &Object) {
        if !matches!(self.shadow, Shadow::Map(_)) {
            self.change_count += 1;
            self.shadow = Shadow::Map(BTreeMap::new());
        }
        let Shadow::Map(old) = &mut self.shadow else {
            return;
        };

        let current = object.entries();
        for (key, item) in &current {
            match old.get_mut(key) {
                Some(previous) => {
                    if !same_value(item, previous) {
                        self.change_count += 1;
                        *previous = item.clone();
                    }
                }
                None => {
                    self.change_count += 1;
                    old.insert(key.clone(), item.clone());
                }
            }
        }

        if old.len() > current.len() {
            self.change_count += 1;
            old.retain(|key, _| object.contains_key(key));
        }
    }
}

impl Default for CollectionDiffer {
    fn default() -> Self {
        Self::new()
    }
}

struct CollectionState {
    differ: CollectionDiffer,
    current: Value,
    snapshot: Value,
    first_run: bool,
}

impl Scope {
    /// Watch an array or object by its shallow contents.
    ///
    /// `listener` receives `(new, old, scope)` where `new` is the collection
    /// itself and `old` is a one-level snapshot taken after the previous
    /// call. On the first call both are the new collection.
    pub fn watch_collection<W, O, L, R>(&self, watch: W, mut listener: L) -> WatchHandle
    where
        W: FnMut(&Scope) -> O + 'static,
        O: WatchOutput,
        L: FnMut(&Value, &Value, &Scope) -> R + 'static,
        R: Outcome,
    {
        let listener: ListenerFn = Box::new(move |new: &Value, old: &Value, scope: &Scope| {
            listener(new, old, scope).into_outcome()
        });
        self.register_collection_watch(watch_fn(watch), listener, true)
    }

    /// Like [`Scope::watch_collection`] for listeners that only need the
    /// new collection. No snapshot is taken.
    pub fn watch_collection_new<W, O, L, R>(&self, watch: W, mut listener: L) -> WatchHandle
    where
        W: FnMut(&Scope) -> O + 'static,
        O: WatchOutput,
        L: FnMut(&Value, &Scope) -> R + 'static,
        R: Outcome,
    {
        let listener: ListenerFn = Box::new(move |new: &Value, _old: &Value, scope: &Scope| {
            listener(new, scope).into_outcome()
        });
        self.register_collection_watch(watch_fn(watch), listener, false)
    }

    fn register_collection_watch(
        &self,
        mut watch: WatchFn,
        mut listener: ListenerFn,
        track_old: bool,
    ) -> WatchHandle {
        let state = Rc::new(RefCell::new(CollectionState {
            differ: CollectionDiffer::new(),
            current: Value::Undefined,
            snapshot: Value::Undefined,
            first_run: true,
        }));

        let observed = Rc::clone(&state);
        let counter: WatchFn = Box::new(move |scope: &Scope| -> anyhow::Result<Value> {
            let value = watch(scope)?;
            let mut state = observed.borrow_mut();
            let count = state.differ.observe(&value);
            state.current = value;
            Ok(Value::Number(count as f64))
        });

        let notify: ListenerFn = Box::new(
            move |_: &Value, _: &Value, scope: &Scope| -> anyhow::Result<()> {
                let (current, previous) = {
                    let mut state = state.borrow_mut();
                    let previous = if std::mem::replace(&mut state.first_run, false) {
                        state.current.clone()
                    } else {
                        state.snapshot.clone()
                    };
                    (state.current.clone(), previous)
                };
                let result = listener(&current, &previous, scope);
                if track_old {
                    state.borrow_mut().snapshot = current.shallow_clone();
                }
                result
            },
        );

        self.register_watcher(counter, notify, EqualityMode::Reference)
    }
}
