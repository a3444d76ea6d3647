//! Trap table builtins: `trap untrap raise`

use super::name_arg;
use crate::environment::Scope;
use crate::eval::{CallResult, Fault};
use crate::runtime::Runtime;
use crate::trap::Condition;
use crate::value::Value;

/// `(trap 'NAME handler)` registers a handler and returns the one it
/// replaced, or `nil`.
pub fn trap(rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let name = name_arg("trap", args, 0)?;
    let previous = rt.traps.find(name).cloned();
    rt.set_trap(name, args[1].clone());
    Ok(previous.unwrap_or(Value::Nil))
}

/// `(untrap 'NAME)` removes a handler and returns it, or `nil`.
pub fn untrap(rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let name = name_arg("untrap", args, 0)?;
    Ok(rt.remove_trap(name).unwrap_or(Value::Nil))
}

/// `(raise 'NAME args…)` raises a condition; the handler's resolution is
/// the result, and a retry raises it again.
pub fn raise(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let name = name_arg("raise", args, 0)?;
    Err(Fault::new(Condition::from_name(name), args[1..].to_vec()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CslError, EvalError};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_raise_user_condition() {
        let mut rt = Runtime::new();
        rt.eval_str("(trap 'MY-ERROR (lambda '(c x) '(* x 2)))").unwrap();
        assert_eq!(rt.eval_str("(raise 'MY-ERROR 21)").unwrap(), Value::Int(42));
    }

    #[test]
    fn test_handler_sees_symbols_literally() {
        let mut rt = Runtime::new();
        rt.eval_str("(trap 'MY-ERROR (lambda '(c x) 'x))").unwrap();
        assert_eq!(
            rt.eval_str("(raise 'MY-ERROR 'unbound-name)").unwrap(),
            Value::symbol("unbound-name")
        );
    }

    #[test]
    fn test_trap_returns_previous_handler() {
        let mut rt = Runtime::new();
        let previous = rt.eval_str("(trap 'BAD-PARAM list)").unwrap();
        assert_eq!(previous, Value::symbol("debugger"));
        assert_eq!(rt.eval_str("(trap 'NEW list)").unwrap(), Value::Nil);
    }

    #[test]
    fn test_untrapped_condition_is_unhandled() {
        let mut rt = Runtime::new();
        rt.eval_str("(untrap 'BAD-PARAM)").unwrap();
        let err = rt.eval_str("(raise 'BAD-PARAM)").unwrap_err();
        assert!(matches!(
            err,
            CslError::Eval(EvalError::Unhandled { ref condition }) if condition == "BAD-PARAM"
        ));
    }
}
