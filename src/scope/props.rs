// src/scope/props.rs

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Weak;

use crate::scope::ScopeInner;
use crate::value::Value;

/// Property storage of one scope.
///
/// Reads check the local map first and then walk the prototype chain.
/// Writes always land in the local map, so a child assigning a name shadows
/// the parent's property instead of mutating it. Isolated scopes have no
/// prototype.
#[derive(Debug, Default)]
pub(crate) struct Properties {
    local: RefCell<BTreeMap<String, Value>>,
    proto: Option<Weak<ScopeInner>>,
}

impl Properties {
    pub(crate) fn new(proto: Option<Weak<ScopeInner>>) -> Self {
        Self {
            local: RefCell::new(BTreeMap::new()),
            proto,
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.local.borrow().get(name) {
            return Some(value.clone());
        }
        let proto = self.proto.as_ref()?.upgrade()?;
        proto.props.get(name)
    }

    pub(crate) fn has(&self, name: &str) -> bool {
        if self.has_own(name) {
            return true;
        }
        match self.proto.as_ref().and_then(Weak::upgrade) {
            Some(proto) => proto.props.has(name),
            None => false,
        }
    }

    pub(crate) fn has_own(&self, name: &str) -> bool {
        self.local.borrow().contains_key(name)
    }

    pub(crate) fn set(&self, name: String, value: Value) -> Option<Value> {
        self.local.borrow_mut().insert(name, value)
    }

    pub(crate) fn remove(&self, name: &str) -> Option<Value> {
        self.local.borrow_mut().remove(name)
    }

    pub(crate) fn own_keys(&self) -> Vec<String> {
        self.local.borrow().keys().cloned().collect()
    }
}
