//! Interpreted functions: `let defun lambda funcall`

use super::{list_arg, name_arg};
use crate::environment::{Environment, Scope};
use crate::eval::{CallResult, Fault};
use crate::runtime::Runtime;
use crate::value::Value;

fn check_params(callee: &str, params: &Value) -> Result<(), Fault> {
    let ok = match params {
        Value::Nil => true,
        Value::List(l) => l.iter().all(|p| p.as_symbol().is_some()),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(Fault::bad_param(
            format!("`{}`: parameters must be a list of symbols", callee),
            std::slice::from_ref(params),
        ))
    }
}

/// `(lambda '(params…) 'body)`
pub fn lambda(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    check_params("lambda", &args[0])?;
    Ok(Value::function(args[0].clone(), args[1].clone()))
}

/// `(defun 'name '(params…) 'body)` binds a global function and returns
/// it.
pub fn defun(rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let name = name_arg("defun", args, 0)?;
    check_params("defun", &args[1])?;
    let function = Value::function(args[1].clone(), args[2].clone());
    rt.globals.add(name, function.clone());
    Ok(function)
}

/// `(funcall f args…)`
pub fn funcall(rt: &mut Runtime, scope: &Scope, args: &[Value]) -> CallResult {
    Ok(rt.apply(scope, args[0].clone(), args[1..].to_vec())?)
}

/// `(let '((name form)…) 'body)` evaluates each form in the current scope,
/// binds the results in a fresh frame and evaluates `body` there.
pub fn let_(rt: &mut Runtime, scope: &Scope, args: &[Value]) -> CallResult {
    let bindings = list_arg("let", args, 0)?;
    let mut frame = Environment::new();

    for binding in &bindings {
        let (name, form) = match binding {
            Value::Symbol(name) => (name.as_str(), None),
            Value::List(pair) => match (pair.get(0).and_then(Value::as_symbol), pair.len()) {
                (Some(name), 1) => (name, None),
                (Some(name), 2) => (name, pair.get(1)),
                _ => return Err(malformed_binding(binding)),
            },
            _ => return Err(malformed_binding(binding)),
        };
        let value = match form {
            Some(form) => rt.eval(scope, form)?,
            None => Value::Nil,
        };
        frame.add(name, value);
    }

    let local = scope.push(frame);
    Ok(rt.eval(&local, &args[1])?)
}

fn malformed_binding(binding: &Value) -> crate::eval::Unwind {
    Fault::bad_param(
        "`let`: a binding is a symbol or (symbol form)",
        std::slice::from_ref(binding),
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defun_and_call() {
        let mut rt = Runtime::new();
        rt.eval_str("(defun 'sq '(x) '(* x x))").unwrap();
        assert!(rt.globals().find("sq").unwrap().is_function());
        assert_eq!(rt.eval_str("(sq 5)").unwrap(), Value::Int(25));
        assert_eq!(rt.eval_str("(funcall sq 6)").unwrap(), Value::Int(36));
    }

    #[test]
    fn test_let_binds_in_fresh_frame() {
        let mut rt = Runtime::new();
        rt.eval_str("(define 'x 100)").unwrap();
        let v = rt.eval_str("(let '((x 1) (y (+ x 1)) z) '(list x y z))").unwrap();
        // Binding forms see the enclosing scope, not earlier bindings.
        assert_eq!(
            v,
            Value::list(vec![Value::Int(1), Value::Int(101), Value::Nil])
        );
        assert_eq!(rt.eval_str("x").unwrap(), Value::Int(100));
    }

    #[test]
    fn test_lambda_closes_over_caller_frames() {
        let mut rt = Runtime::new();
        rt.eval_str("(defun 'outer '(n) '(funcall (lambda '(m) '(+ n m)) 1))")
            .unwrap();
        assert_eq!(rt.eval_str("(outer 41)").unwrap(), Value::Int(42));
    }

    #[test]
    fn test_recursion() {
        let mut rt = Runtime::new();
        rt.eval_str("(defun 'fact '(n) '(if (< n 2) 1 '(* n (fact (- n 1)))))")
            .unwrap();
        assert_eq!(rt.eval_str("(fact 10)").unwrap(), Value::Int(3_628_800));
    }
}
