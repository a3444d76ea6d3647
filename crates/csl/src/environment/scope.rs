//! Persistent lexical scope chain

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::Environment;
use crate::value::Value;

struct Frame {
    bindings: RefCell<Environment>,
    parent: Option<Rc<Frame>>,
}

/// A chain of local binding frames, innermost first.
///
/// Pushing a frame returns a new `Scope` and leaves the original untouched,
/// so a call's frame disappears as soon as the last `Scope` holding it is
/// dropped. The empty chain is the global scope; globals themselves live
/// in the runtime.
///
/// # Example
///
/// ```
/// use csl::{Environment, Scope, Value};
///
/// let global = Scope::global();
/// let mut frame = Environment::new();
/// frame.add("x", Value::Int(1));
///
/// {
///     let inner = global.push(frame);
///     assert_eq!(inner.lookup("x"), Some(Value::Int(1)));
/// }
/// assert_eq!(global.lookup("x"), None);
/// ```
#[derive(Clone, Default)]
pub struct Scope {
    head: Option<Rc<Frame>>,
}

impl Scope {
    /// The empty chain.
    pub fn global() -> Self {
        Self::default()
    }

    /// Whether no local frame is in effect.
    pub fn is_global(&self) -> bool {
        self.head.is_none()
    }

    /// A new scope with `bindings` as the innermost frame.
    pub fn push(&self, bindings: Environment) -> Scope {
        Scope {
            head: Some(Rc::new(Frame {
                bindings: RefCell::new(bindings),
                parent: self.head.clone(),
            })),
        }
    }

    /// Number of local frames.
    pub fn depth(&self) -> usize {
        self.frames().count()
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(self.head.as_deref(), |frame| frame.parent.as_deref())
    }

    /// Find `name` in the innermost frame that binds it.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.frames()
            .find_map(|frame| frame.bindings.borrow().find(name).cloned())
    }

    /// Whether any local frame binds `name`.
    pub fn binds(&self, name: &str) -> bool {
        self.frames()
            .any(|frame| frame.bindings.borrow().contains(name))
    }

    /// Overwrite the innermost local binding of `name`.
    ///
    /// Hands the value back if no local frame binds the name.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), Value> {
        for frame in self.frames() {
            if let Some(slot) = frame.bindings.borrow_mut().find_mut(name) {
                *slot = value;
                return Ok(());
            }
        }
        Err(value)
    }

    /// Bind `name` in the innermost frame.
    ///
    /// Hands the value back at global scope.
    pub fn define_local(&self, name: &str, value: Value) -> Result<(), Value> {
        match &self.head {
            Some(frame) => {
                frame.bindings.borrow_mut().add(name, value);
                Ok(())
            }
            None => Err(value),
        }
    }

    /// Snapshot of the innermost frame's bindings.
    pub fn locals(&self) -> Environment {
        self.head
            .as_ref()
            .map(|frame| frame.bindings.borrow().clone())
            .unwrap_or_default()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_global() {
            return writeln!(f, "   (global scope)");
        }
        for (i, frame) in self.frames().enumerate() {
            writeln!(f, "frame {}:", i)?;
            write!(f, "{}", frame.bindings.borrow())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope(depth {})", self.depth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame(name: &str, value: Value) -> Environment {
        let mut env = Environment::new();
        env.add(name, value);
        env
    }

    #[test]
    fn test_inner_frame_shadows_outer() {
        let outer = Scope::global().push(frame("x", Value::Int(1)));
        let inner = outer.push(frame("x", Value::Int(2)));
        assert_eq!(inner.lookup("x"), Some(Value::Int(2)));
        assert_eq!(outer.lookup("x"), Some(Value::Int(1)));
        assert_eq!(inner.depth(), 2);
    }

    #[test]
    fn test_assign_updates_nearest_binding() {
        let outer = Scope::global().push(frame("x", Value::Int(1)));
        let inner = outer.push(Environment::new());
        assert!(inner.assign("x", Value::Int(7)).is_ok());
        assert_eq!(outer.lookup("x"), Some(Value::Int(7)));
    }

    #[test]
    fn test_assign_unbound_hands_value_back() {
        let scope = Scope::global().push(Environment::new());
        assert_eq!(scope.assign("y", Value::Int(3)), Err(Value::Int(3)));
    }

    #[test]
    fn test_define_local_at_global_fails() {
        assert!(Scope::global().define_local("x", Value::Nil).is_err());
    }

    #[test]
    fn test_frame_dropped_with_scope() {
        let global = Scope::global();
        {
            let scope = global.push(frame("tmp", Value::Nil));
            assert!(scope.binds("tmp"));
        }
        assert!(!global.binds("tmp"));
        assert!(global.is_global());
    }
}
