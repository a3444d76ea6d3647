//! Diagnostic call stack and stack safety

use std::fmt;

use crate::environment::Scope;
use crate::error::EvalError;
use crate::runtime::Runtime;
use crate::value::{Nested, Value};

/// Ensure sufficient native stack space is available before executing `f`.
#[inline]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Minimum stack space to keep available (100KB red zone).
    const RED_ZONE: usize = 100 * 1024;

    /// Stack space to allocate when growing (1MB).
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// A pending call, recorded for introspection only.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// The value in call position
    pub callee: Value,

    /// The caller's scope
    pub scope: Scope,

    /// Evaluated arguments
    pub args: Vec<Value>,

    /// The symbol the callee was looked up by, if the call form named it
    pub name: Option<String>,
}

impl CallFrame {
    /// Record a call.
    pub fn new(callee: Value, scope: Scope, args: Vec<Value>) -> Self {
        Self {
            callee,
            scope,
            args,
            name: None,
        }
    }

    /// Record the name the call form used for the callee.
    pub fn with_name(mut self, name: Option<&str>) -> Self {
        self.name = name.map(str::to_string);
        self
    }

    /// How conditions and backtraces refer to the callee.
    pub fn label(&self) -> String {
        match (&self.name, &self.callee) {
            (Some(name), _) => name.clone(),
            (None, Value::Native(b)) => b.name.clone(),
            (None, Value::List(l)) if l.is_function() => "lambda".to_string(),
            (None, other) => other.to_string(),
        }
    }

    /// The frame as `[callee, locals, args…]`.
    pub fn to_value(&self) -> Value {
        let mut items = Vec::with_capacity(self.args.len() + 2);
        items.push(self.callee.clone());
        items.push(self.scope.locals().to_value());
        items.extend(self.args.iter().cloned());
        Value::list(items)
    }
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.label())?;
        for arg in &self.args {
            write!(f, " {}", Nested(arg))?;
        }
        write!(f, ")")
    }
}

/// Frames of the calls in progress, outermost first.
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

impl CallStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame.
    pub fn push(&mut self, frame: CallFrame) {
        self.frames.push(frame);
    }

    /// Pop the innermost frame.
    pub fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    /// Number of pending calls.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no call is pending.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The innermost frame.
    pub fn top(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// Frames outermost first.
    pub fn iter(&self) -> std::slice::Iter<'_, CallFrame> {
        self.frames.iter()
    }
}

impl fmt::Display for CallStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return writeln!(f, "   (empty)");
        }
        for (i, frame) in self.frames.iter().enumerate().rev() {
            writeln!(f, "   #{} {}", i, frame)?;
        }
        Ok(())
    }
}

/// RAII guard that pops a call frame when dropped.
///
/// Derefs to the runtime so the call can proceed through the guard.
pub(crate) struct CallGuard<'a> {
    rt: &'a mut Runtime,
}

impl<'a> CallGuard<'a> {
    /// Push `frame`, failing if the call depth limit is reached.
    pub(crate) fn enter(rt: &'a mut Runtime, frame: CallFrame) -> Result<Self, EvalError> {
        let max = rt.ctx.max_call_depth;
        if rt.stack.len() >= max {
            return Err(EvalError::StackOverflow {
                depth: rt.stack.len() + 1,
                max,
            });
        }
        rt.stack.push(frame);
        Ok(Self { rt })
    }
}

impl<'a> Drop for CallGuard<'a> {
    fn drop(&mut self) {
        self.rt.stack.pop();
    }
}

impl<'a> std::ops::Deref for CallGuard<'a> {
    type Target = Runtime;

    fn deref(&self) -> &Self::Target {
        self.rt
    }
}

impl<'a> std::ops::DerefMut for CallGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.rt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EvalContext;
    use pretty_assertions::assert_eq;

    fn frame(n: i64) -> CallFrame {
        CallFrame::new(Value::symbol("f"), Scope::global(), vec![Value::Int(n)])
    }

    #[test]
    fn test_guard_pops_on_drop() {
        let mut rt = Runtime::new();
        {
            let guard = CallGuard::enter(&mut rt, frame(1)).unwrap();
            assert_eq!(guard.stack.len(), 1);
        }
        assert!(rt.stack.is_empty());
    }

    #[test]
    fn test_guard_nests() {
        let mut rt = Runtime::new();
        {
            let mut outer = CallGuard::enter(&mut rt, frame(1)).unwrap();
            {
                let inner = CallGuard::enter(&mut outer, frame(2)).unwrap();
                assert_eq!(inner.stack.len(), 2);
            }
            assert_eq!(outer.stack.len(), 1);
        }
        assert!(rt.stack.is_empty());
    }

    #[test]
    fn test_guard_enforces_depth() {
        let mut rt = Runtime::with_context(EvalContext::with_max_call_depth(1));
        let mut outer = CallGuard::enter(&mut rt, frame(1)).unwrap();
        let err = CallGuard::enter(&mut outer, frame(2)).err();
        assert!(matches!(
            err,
            Some(EvalError::StackOverflow { depth: 2, max: 1 })
        ));
    }

    #[test]
    fn test_display_innermost_first() {
        let mut stack = CallStack::new();
        stack.push(frame(1));
        stack.push(frame(2));
        assert_eq!(stack.to_string(), "   #1 (f 2)\n   #0 (f 1)\n");
    }

    #[test]
    fn test_frame_to_value() {
        let v = frame(3).to_value();
        assert_eq!(v.length(), 3);
        assert_eq!(v.index(2), Some(&Value::Int(3)));
    }
}
