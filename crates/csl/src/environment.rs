//! Runtime environment managing name bindings

mod prelude;
mod scope;

pub use scope::Scope;

use std::fmt;

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::error::ValueError;
use crate::value::{BuiltinFn, Value};

/// An insertion-ordered name → value table.
///
/// The same shape serves as the global table, as one frame of a local
/// [`Scope`], and as the trap table keyed by condition names.
///
/// # Example
///
/// ```
/// use csl::{Environment, Value};
///
/// let mut env = Environment::new();
/// env.add("x", Value::Int(1));
/// env.add("y", Value::Int(2));
///
/// // Re-adding replaces in place, keeping the original position
/// env.add("x", Value::Int(10));
/// assert_eq!(env.find("x"), Some(&Value::Int(10)));
/// assert_eq!(env.iter().next().map(|(k, _)| k), Some("x"));
///
/// assert_eq!(env.remove("y"), Some(Value::Int(2)));
/// assert_eq!(env.find("y"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: IndexMap<String, Value>,
}

impl Environment {
    /// Create a new empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a list of `[name, value]` pairs, as produced by
    /// [`Value::pair`].
    pub fn from_pairs(pairs: &Value) -> Result<Self, ValueError> {
        let list = pairs
            .as_list()
            .ok_or_else(|| ValueError::NotAList(pairs.type_name()))?;

        let mut env = Self::new();
        for pair in list {
            match (pair.index(0).and_then(Value::as_name), pair.index(1)) {
                (Some(name), Some(value)) => {
                    env.add(name, value.clone());
                }
                _ => return Err(ValueError::NotAList(pair.type_name())),
            }
        }
        Ok(env)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Binding Definition
    // ═══════════════════════════════════════════════════════════════════

    /// Store a binding and return a reference to the stored value.
    ///
    /// An existing binding with the same name is replaced in place.
    pub fn add(&mut self, name: impl Into<String>, value: Value) -> &mut Value {
        match self.bindings.entry(name.into()) {
            Entry::Occupied(entry) => {
                let slot = entry.into_mut();
                *slot = value;
                slot
            }
            Entry::Vacant(entry) => entry.insert(value),
        }
    }

    /// Register a built-in function under its own name.
    pub fn define_builtin(&mut self, builtin: BuiltinFn) {
        let name = builtin.name.clone();
        self.add(name, Value::native(builtin));
    }

    // ═══════════════════════════════════════════════════════════════════
    // Binding Lookup
    // ═══════════════════════════════════════════════════════════════════

    /// Look up a binding by name.
    pub fn find(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Look up a mutable reference to a binding's value.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.bindings.get_mut(name)
    }

    /// Check if a binding exists.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Remove a binding, returning its value. Later bindings keep their
    /// relative order.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.shift_remove(name)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Iteration and Inspection
    // ═══════════════════════════════════════════════════════════════════

    /// Iterate over bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// All binding names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.bindings.keys().map(String::as_str).collect()
    }

    /// Get the number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if the environment is empty.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The table as a list of `[symbol, value]` pairs.
    pub fn to_value(&self) -> Value {
        Value::list(
            self.bindings
                .iter()
                .map(|(k, v)| Value::list(vec![Value::symbol(k.as_str()), v.clone()]))
                .collect(),
        )
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bindings.is_empty() {
            return writeln!(f, "   (empty)");
        }
        for (name, value) in &self.bindings {
            writeln!(f, "   {} = {}", name, value)?;
        }
        Ok(())
    }
}
