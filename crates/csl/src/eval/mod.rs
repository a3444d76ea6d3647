//! Value-tree evaluation
//!
//! Self-evaluating values are duplicated, symbols resolve through the
//! scope chain and then the global table, and lists are evaluated item by
//! item before dispatching on the first item.

mod call;
mod control;
mod stack;

pub use control::{CallResult, Fault, Unwind};
pub use stack::{CallFrame, CallStack};
pub(crate) use stack::{ensure_sufficient_stack, CallGuard};

use crate::environment::Scope;
use crate::error::EvalError;
use crate::runtime::Runtime;
use crate::trap::Signal;
use crate::value::{List, Value};

/// Result of evaluating a value: faults are already resolved, only fatal
/// outcomes remain.
pub type EvalResult = Result<Value, EvalError>;

/// How the next item of a list is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// Evaluate it
    Evaluate,
    /// Take it as written (it followed a quote)
    Literal,
}

impl Runtime {
    /// Evaluate `value` in `scope`.
    pub fn eval(&mut self, scope: &Scope, value: &Value) -> EvalResult {
        ensure_sufficient_stack(|| match value {
            Value::Symbol(name) => self.resolve_symbol(scope, name),
            Value::List(list) if !list.is_flagged() => self.eval_list(scope, list),
            other => Ok(other.clone()),
        })
    }

    /// Look `name` up: local frames innermost first, then globals.
    pub fn lookup(&self, scope: &Scope, name: &str) -> Option<Value> {
        scope
            .lookup(name)
            .or_else(|| self.globals.find(name).cloned())
    }

    /// Resolve a symbol, raising `EVAL-ERROR` while it is unbound.
    ///
    /// A handler that binds the name and then asks for a retry lets the
    /// lookup succeed.
    pub fn resolve_symbol(&mut self, scope: &Scope, name: &str) -> EvalResult {
        self.retrying(scope, |rt, scope| {
            rt.lookup(scope, name).ok_or_else(|| {
                Fault::eval_error(format!("unbound symbol `{}`", name), &[Value::symbol(name)]).into()
            })
        })
    }

    /// Evaluate a plain list as a call form.
    pub fn eval_list(&mut self, scope: &Scope, list: &List) -> EvalResult {
        self.poll_signals(scope)?;

        let mut items = self.eval_items(scope, list.as_slice())?;
        if items.is_empty() {
            return self.retrying(scope, |_, _| {
                Err(Fault::eval_error("empty call position", &[]).into())
            });
        }

        let name = list.get(0).and_then(Value::as_symbol);
        let callee = items.remove(0);
        self.apply_named(scope, name, callee, items)
    }

    /// Evaluate a sequence of items left to right under the quote
    /// protocol, collecting the results.
    ///
    /// An item evaluating to `Quote` is not collected; the item after it
    /// is taken literally. Flagged lists are always taken literally.
    pub fn eval_items(&mut self, scope: &Scope, items: &[Value]) -> Result<Vec<Value>, EvalError> {
        let mut out = Vec::with_capacity(items.len());
        let mut mark = Mark::Evaluate;

        for item in items {
            let value = match (mark, item) {
                (Mark::Literal, _) => item.clone(),
                (Mark::Evaluate, Value::List(l)) if l.is_flagged() => item.clone(),
                (Mark::Evaluate, _) => self.eval(scope, item)?,
            };

            if mark == Mark::Evaluate && matches!(value, Value::Quote) {
                mark = Mark::Literal;
                continue;
            }
            mark = Mark::Evaluate;
            out.push(value);
        }

        Ok(out)
    }

    /// Evaluate a sequence of items and return the last result, or `Nil`.
    pub fn eval_sequence(&mut self, scope: &Scope, items: &[Value]) -> EvalResult {
        Ok(self.eval_items(scope, items)?.pop().unwrap_or(Value::Nil))
    }

    /// Raise conditions for pending interrupts and delivered signals.
    fn poll_signals(&mut self, scope: &Scope) -> Result<(), EvalError> {
        if self.ctx.take_interrupt() {
            self.raise_signal(scope, Signal::Int)?;
        }
        while let Some(sig) = self.signals.as_ref().and_then(|w| w.take_pending()) {
            self.raise_signal(scope, sig)?;
        }
        Ok(())
    }

    fn raise_signal(&mut self, scope: &Scope, sig: Signal) -> Result<(), EvalError> {
        // Nothing to retry; evaluation continues whatever the handler says.
        self.raise(scope, &Fault::signal(sig))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trap::Condition;
    use pretty_assertions::assert_eq;

    fn eval(src: &str) -> Result<Value, crate::CslError> {
        Runtime::new().eval_str(src)
    }

    #[test]
    fn test_self_evaluating() {
        assert_eq!(eval("42").unwrap(), Value::Int(42));
        assert_eq!(eval("\"hi\"").unwrap(), Value::string("hi"));
        assert_eq!(eval("nil").unwrap(), Value::Nil);
    }

    #[test]
    fn test_quote_protocol() {
        assert_eq!(eval("'x").unwrap(), Value::symbol("x"));
        assert_eq!(
            eval("(list 'x '(1 2))").unwrap(),
            Value::list(vec![
                Value::symbol("x"),
                Value::list(vec![Value::Int(1), Value::Int(2)]),
            ])
        );
    }

    #[test]
    fn test_local_shadows_global() {
        let mut rt = Runtime::new();
        rt.globals_mut().add("x", Value::Int(2));
        let mut frame = crate::Environment::new();
        frame.add("x", Value::Int(1));
        let scope = Scope::global().push(frame);
        assert_eq!(rt.eval(&scope, &Value::symbol("x")).unwrap(), Value::Int(1));
        assert_eq!(
            rt.eval(&Scope::global(), &Value::symbol("x")).unwrap(),
            Value::Int(2)
        );
    }

    #[test]
    fn test_unbound_symbol_raises_eval_error() {
        let mut rt = Runtime::new();
        rt.set_trap("EVAL-ERROR", Value::symbol("list"));
        let v = rt.eval(&Scope::global(), &Value::symbol("nope")).unwrap();
        // the handler `list` collects its arguments: 'EVAL-ERROR, message, 'nope
        let items = v.into_items().unwrap();
        assert_eq!(items[0], Value::symbol("EVAL-ERROR"));
        assert_eq!(items[2], Value::symbol("nope"));
    }

    #[test]
    fn test_empty_call_position() {
        let mut rt = Runtime::new();
        rt.remove_trap("EVAL-ERROR");
        let err = rt.eval_str("()").unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("unhandled condition `{}`", Condition::EvalError)
        );
    }

    #[test]
    fn test_interrupt_raises_sigint() {
        let mut rt = Runtime::new();
        rt.eval_str("(trap 'SIGINT (lambda '(c) '(set 'hit 1)))").unwrap();
        rt.eval_str("(define 'hit 0)").unwrap();
        rt.context().interrupt();
        rt.eval_str("(+ 1 1)").unwrap();
        assert_eq!(rt.eval_str("hit").unwrap(), Value::Int(1));
    }
}
