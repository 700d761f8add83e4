// src/value/clone.rs

//! Cycle-safe structural clone.
//!
//! Deep-equality watchers store a clone of every value they see, so the next
//! comparison is against history rather than a live alias. Containers reached
//! twice (shared or cyclic) are cloned once and the clone is shared the same
//! way, so the shape of the graph is preserved.

use std::collections::{BTreeMap, HashMap};

use super::{Array, Object, Value};

pub(crate) fn deep_clone(value: &Value) -> Value {
    let mut memo = HashMap::new();
    clone_inner(value, &mut memo)
}

fn clone_inner(value: &Value, memo: &mut HashMap<usize, Value>) -> Value {
    match value {
        Value::Array(a) => {
            if let Some(done) = memo.get(&a.addr()) {
                return done.clone();
            }
            let copy = Array::new(Vec::with_capacity(a.len()));
            memo.insert(a.addr(), Value::Array(copy.clone()));
            for item in a.to_vec() {
                copy.push(clone_inner(&item, memo));
            }
            Value::Array(copy)
        }
        Value::Object(o) => {
            if let Some(done) = memo.get(&o.addr()) {
                return done.clone();
            }
            let copy = Object::new(BTreeMap::new());
            memo.insert(o.addr(), Value::Object(copy.clone()));
            for (key, item) in o.entries() {
                copy.insert(key, clone_inner(&item, memo));
            }
            Value::Object(copy)
        }
        primitive => primitive.clone(),
    }
}
