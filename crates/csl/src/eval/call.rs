//! Call dispatch: builtins, interpreted closures, foreign functions

use tracing::{debug, trace};

use super::{CallFrame, CallGuard, CallResult, EvalResult, Fault, Unwind};
use crate::environment::{Environment, Scope};
use crate::error::EvalError;
use crate::runtime::Runtime;
use crate::trap::Resolution;
use crate::value::{BuiltinFn, List, Value};

/// Parameter name that collects the remaining arguments into a list.
pub(crate) const REST_MARKER: &str = "&rest";

impl Runtime {
    /// Call `callee` with already-evaluated `args`.
    ///
    /// A diagnostic frame is pushed for the duration of the call. Faults
    /// raised by the callee go through the trap table; a retry re-runs the
    /// call with the same arguments.
    pub fn apply(&mut self, scope: &Scope, callee: Value, args: Vec<Value>) -> EvalResult {
        self.apply_named(scope, None, callee, args)
    }

    /// [`apply`](Self::apply) for a call form whose head was the symbol
    /// `name`; arity conditions then name the function instead of `lambda`.
    pub fn apply_named(
        &mut self,
        scope: &Scope,
        name: Option<&str>,
        callee: Value,
        args: Vec<Value>,
    ) -> EvalResult {
        let frame = CallFrame::new(callee.clone(), scope.clone(), args.clone()).with_name(name);
        let label = frame.label();
        let mut guard = CallGuard::enter(self, frame)?;
        guard.retrying(scope, |rt, scope| rt.dispatch(scope, &label, &callee, &args))
    }

    /// Run `op` until it produces a value, raising each fault it reports.
    pub(crate) fn retrying<F>(&mut self, scope: &Scope, mut op: F) -> EvalResult
    where
        F: FnMut(&mut Runtime, &Scope) -> CallResult,
    {
        let mut retries = 0;
        loop {
            let fault = match op(self, scope) {
                Ok(value) => return Ok(value),
                Err(Unwind::Fatal(err)) => return Err(err),
                Err(Unwind::Condition(fault)) => fault,
            };

            match self.raise(scope, &fault)? {
                Resolution::Resolved(value) => return Ok(value),
                Resolution::Retry => {
                    retries += 1;
                    if retries > self.ctx.max_trap_retries {
                        return Err(EvalError::RetryLimit {
                            condition: fault.condition.name().to_string(),
                            retries: retries - 1,
                        });
                    }
                    debug!(condition = %fault.condition, retries, "retrying");
                }
            }
        }
    }

    fn dispatch(&mut self, scope: &Scope, label: &str, callee: &Value, args: &[Value]) -> CallResult {
        if self.ctx.trace {
            debug!(callee = %callee, args = args.len(), depth = self.stack.len(), "call");
        } else {
            trace!(callee = %callee, args = args.len(), depth = self.stack.len(), "call");
        }

        match callee {
            Value::Native(builtin) => self.call_builtin(scope, builtin, args),
            Value::List(list) if list.is_function() => self.call_closure(scope, label, list, args),
            Value::List(list) if list.is_foreign() => self.call_foreign(list, args),
            other => Err(Fault::eval_error(
                format!("{} is not callable", other.type_name()),
                std::slice::from_ref(other),
            )
            .into()),
        }
    }

    fn call_builtin(&mut self, scope: &Scope, builtin: &BuiltinFn, args: &[Value]) -> CallResult {
        if builtin.arity.too_few(args.len()) {
            return Err(Fault::missing_param(&builtin.name, args).into());
        }
        if builtin.arity.too_many(args.len()) {
            return Err(Fault::param_count(&builtin.name, args).into());
        }
        (builtin.func)(self, scope, args)
    }

    /// Bind the formal parameters in a fresh frame whose parent is the
    /// caller's scope and evaluate the body there.
    fn call_closure(&mut self, scope: &Scope, label: &str, closure: &List, args: &[Value]) -> CallResult {
        let (params, body) = match (closure.get(0), closure.get(1)) {
            (Some(params), Some(body)) => (params, body),
            _ => {
                return Err(Fault::eval_error(
                    "malformed function definition",
                    &[Value::List(closure.clone())],
                )
                .into())
            }
        };

        let frame = bind_params(label, params, args)?;
        let local = scope.push(frame);
        Ok(self.eval(&local, body)?)
    }

    fn call_foreign(&mut self, decl: &List, args: &[Value]) -> CallResult {
        let (library, symbol) = match (decl.get(0), decl.get(1)) {
            (Some(lib), Some(sym)) => (
                lib.as_name().unwrap_or_default().to_string(),
                sym.as_name().unwrap_or_default().to_string(),
            ),
            _ => (String::new(), String::new()),
        };

        self.ffi
            .invoke(decl, args)
            .map_err(|err| Fault::ffi(&err, &library, &symbol).into())
    }
}

/// Zip formal parameter names with arguments.
///
/// Too few arguments is `MISSING-PARAM`, too many is `PARAM-COUNT`; both
/// name the function as `label`. A `&rest` parameter collects whatever
/// follows the fixed parameters.
fn bind_params(label: &str, params: &Value, args: &[Value]) -> Result<Environment, Unwind> {
    let names: &[Value] = match params {
        Value::List(l) => l.as_slice(),
        _ => &[],
    };

    let rest_at = names
        .iter()
        .position(|n| n.as_symbol() == Some(REST_MARKER));
    let (fixed, rest) = match rest_at {
        Some(at) => (&names[..at], names.get(at + 1)),
        None => (names, None),
    };

    if args.len() < fixed.len() {
        return Err(Fault::missing_param(label, args).into());
    }
    if rest.is_none() && args.len() > fixed.len() {
        return Err(Fault::param_count(label, args).into());
    }

    let pairs = Value::pair(
        &Value::list(fixed.to_vec()),
        &Value::list(args[..fixed.len()].to_vec()),
    )?;
    let mut frame = Environment::from_pairs(&pairs)?;

    if let Some(rest) = rest {
        let name = rest
            .as_name()
            .ok_or_else(|| Fault::bad_param("`&rest` must be followed by a name", &[rest.clone()]))?;
        frame.add(name, Value::list(args[fixed.len()..].to_vec()));
    }

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trap::Condition;
    use pretty_assertions::assert_eq;

    fn names(ns: &[&str]) -> Value {
        Value::list(ns.iter().map(|n| Value::symbol(*n)).collect())
    }

    fn condition_of(unwind: Unwind) -> Condition {
        match unwind {
            Unwind::Condition(fault) => fault.condition,
            Unwind::Fatal(err) => panic!("unexpected fatal error: {err}"),
        }
    }

    #[test]
    fn test_bind_params_exact() {
        let env = bind_params("f", &names(&["a", "b"]), &[Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(env.find("b"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_bind_params_counts() {
        let err = bind_params("f", &names(&["a", "b"]), &[Value::Int(1)]).unwrap_err();
        assert_eq!(condition_of(err), Condition::MissingParam);

        let err = bind_params("f", &names(&["a"]), &[Value::Int(1), Value::Int(2)]).unwrap_err();
        assert_eq!(condition_of(err), Condition::ParamCount);
    }

    #[test]
    fn test_bind_params_rest() {
        let env = bind_params(
            "f",
            &names(&["a", "&rest", "more"]),
            &[Value::Int(1), Value::Int(2), Value::Int(3)],
        )
        .unwrap();
        assert_eq!(env.find("a"), Some(&Value::Int(1)));
        assert_eq!(
            env.find("more"),
            Some(&Value::list(vec![Value::Int(2), Value::Int(3)]))
        );

        let env = bind_params("f", &names(&["&rest", "all"]), &[]).unwrap();
        assert_eq!(env.find("all"), Some(&Value::list(vec![])));
    }

    #[test]
    fn test_closure_scope_is_dropped_after_call() {
        let mut rt = Runtime::new();
        rt.eval_str("(defun 'sq '(x) '(* x x))").unwrap();
        assert_eq!(rt.eval_str("(sq 5)").unwrap(), Value::Int(25));
        assert!(rt.lookup(&Scope::global(), "x").is_none());
        assert!(rt.stack().is_empty());
    }

    #[test]
    fn test_handler_retry_then_resolve() {
        let mut rt = Runtime::new();
        // First raise retries (0), the second resolves with 42.
        rt.eval_str("(define 'tries 0)").unwrap();
        rt.eval_str(
            "(trap 'BAD-PARAM (lambda '(&rest a) '(progn (set 'tries (+ tries 1)) (if (< tries 2) 0 42))))",
        )
        .unwrap();
        assert_eq!(rt.eval_str("(+ 1 \"x\")").unwrap(), Value::Int(42));
        assert_eq!(rt.eval_str("tries").unwrap(), Value::Int(2));
    }

    #[test]
    fn test_retry_limit() {
        let mut ctx = crate::EvalContext::new();
        ctx.max_trap_retries = 3;
        let mut rt = Runtime::with_context(ctx);
        rt.eval_str("(trap 'BAD-PARAM (lambda '(&rest a) 0))").unwrap();
        let err = rt.eval_str("(+ 1 \"x\")").unwrap_err();
        assert!(matches!(
            err,
            crate::CslError::Eval(EvalError::RetryLimit { retries: 3, .. })
        ));
    }
}
