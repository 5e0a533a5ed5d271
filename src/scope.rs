//! The receiver a template is evaluated against

use std::collections::{BTreeMap, HashMap};

use crate::value::Value;

/// Supplies helper values to templates beyond the explicit named arguments.
///
/// Named arguments shadow scope values of the same name.
pub trait Scope {
    /// Look up a helper value by name
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl Scope for () {
    fn lookup(&self, _name: &str) -> Option<Value> {
        None
    }
}

impl Scope for Value {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Scope for BTreeMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Scope for HashMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl<T: Scope + ?Sized> Scope for &T {
    fn lookup(&self, name: &str) -> Option<Value> {
        (**self).lookup(name)
    }
}
