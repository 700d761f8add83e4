// src/value/equality.rs

//! Equality Policy: decides whether two observed values are "the same".

use std::collections::HashSet;

use super::Value;

/// How a watcher compares consecutive values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EqualityMode {
    /// Same primitive value or same array/object reference; NaN equals NaN.
    #[default]
    Reference,
    /// Recursive structural equality.
    Deep,
}

impl From<bool> for EqualityMode {
    fn from(deep: bool) -> Self {
        if deep {
            EqualityMode::Deep
        } else {
            EqualityMode::Reference
        }
    }
}

/// Compare two values under the given mode. Pure; never fails.
pub fn are_equal(a: &Value, b: &Value, mode: EqualityMode) -> bool {
    match mode {
        EqualityMode::Reference => same_value(a, b),
        EqualityMode::Deep => deep_equal(a, b),
    }
}

/// Reference equality with NaN treated as equal to itself.
pub(crate) fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => x.ptr_eq(y),
        (Value::Object(x), Value::Object(y)) => x.ptr_eq(y),
        _ => false,
    }
}

pub(crate) fn deep_equal(a: &Value, b: &Value) -> bool {
    let mut in_progress = HashSet::new();
    deep_equal_inner(a, b, &mut in_progress)
}

// A pair of containers already under comparison is assumed equal, which makes
// the comparison terminate on cyclic graphs.
fn deep_equal_inner(a: &Value, b: &Value, in_progress: &mut HashSet<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            if x.ptr_eq(y) {
                return true;
            }
            let pair = (x.addr(), y.addr());
            if !in_progress.insert(pair) {
                return true;
            }
            let (xs, ys) = (x.to_vec(), y.to_vec());
            let equal = xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|(l, r)| deep_equal_inner(l, r, in_progress));
            in_progress.remove(&pair);
            equal
        }
        (Value::Object(x), Value::Object(y)) => {
            if x.ptr_eq(y) {
                return true;
            }
            let pair = (x.addr(), y.addr());
            if !in_progress.insert(pair) {
                return true;
            }
            let (xs, ys) = (x.entries(), y.entries());
            // Entries come out of a BTreeMap, so equal key sets line up.
            let equal = xs.len() == ys.len()
                && xs.iter().zip(ys.iter()).all(|((lk, lv), (rk, rv))| {
                    lk == rk && deep_equal_inner(lv, rv, in_progress)
                });
            in_progress.remove(&pair);
            equal
        }
        _ => same_value(a, b),
    }
}
