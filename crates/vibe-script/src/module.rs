//! Modules: the explicit symbol tables generated code is loaded into.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::RuntimeResult;
use crate::value::{Function, NativeFunction, Value};

/// Named bindings shared by every function loaded into the module.
///
/// Script functions, host natives and constants live side by side; a later
/// binding with the same name replaces the earlier one.
pub struct Module {
    name: String,
    bindings: RwLock<HashMap<String, Value>>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: RwLock::new(HashMap::new()),
        }
    }

    /// Convenience for the common `Arc<Module>` handle.
    pub fn shared(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.bindings.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.read().contains_key(name)
    }

    /// Bind a constant visible to every function in the module.
    pub fn set_global(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.write().insert(name.into(), value.into());
    }

    /// Expose a host function to scripts.
    pub fn register_native(
        &self,
        name: impl Into<String>,
        func: impl Fn(&[Value]) -> RuntimeResult<Value> + Send + Sync + 'static,
    ) {
        let name = name.into();
        let native = NativeFunction::new(name.clone(), func);
        self.bindings
            .write()
            .insert(name, Value::Function(Function::Native(Arc::new(native))));
    }

    /// The function bound to `name`, if that binding is callable.
    pub fn function(&self, name: &str) -> Option<Function> {
        match self.get(name)? {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Bound names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }

    pub(crate) fn define(&self, name: impl Into<String>, value: Value) {
        self.bindings.write().insert(name.into(), value);
    }

    /// Replace an existing non-function binding. Returns whether one existed.
    pub(crate) fn assign_global(&self, name: &str, value: Value) -> bool {
        let mut bindings = self.bindings.write();
        match bindings.get_mut(name) {
            Some(slot) if !matches!(slot, Value::Function(_)) => {
                *slot = value;
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("bindings", &self.names())
            .finish()
    }
}
