//! Evaluation and control flow: `eval progn print dump if while not`

use super::boolean;
use crate::environment::Scope;
use crate::eval::CallResult;
use crate::runtime::Runtime;
use crate::value::Value;

/// `(eval form)` evaluates an already-evaluated value once more.
pub fn eval(rt: &mut Runtime, scope: &Scope, args: &[Value]) -> CallResult {
    Ok(rt.eval(scope, &args[0])?)
}

/// `(progn x…)` returns its last argument.
pub fn progn(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    Ok(args.last().cloned().unwrap_or(Value::Nil))
}

/// `(print x…)` writes the arguments separated by spaces, then a newline.
pub fn print(rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let line = args
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    rt.write_output(&format!("{}\n", line))?;
    Ok(Value::Nil)
}

/// `(dump x…)` writes the indented tree form of each argument.
pub fn dump(rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let mut text = Vec::new();
    for arg in args {
        arg.print(0, &mut text)?;
    }
    rt.write_output(&String::from_utf8_lossy(&text))?;
    Ok(Value::Nil)
}

/// `(if cond 'then ['else])` evaluates the chosen branch.
pub fn if_(rt: &mut Runtime, scope: &Scope, args: &[Value]) -> CallResult {
    let branch = if args[0].is_truthy() {
        args.get(1)
    } else {
        args.get(2)
    };
    match branch {
        Some(form) => Ok(rt.eval(scope, form)?),
        None => Ok(Value::Nil),
    }
}

/// `(while 'cond 'body)` re-evaluates `body` while `cond` is truthy and
/// returns the last body value.
pub fn while_(rt: &mut Runtime, scope: &Scope, args: &[Value]) -> CallResult {
    let mut last = Value::Nil;
    while rt.eval(scope, &args[0])?.is_truthy() {
        last = rt.eval(scope, &args[1])?;
    }
    Ok(last)
}

/// `(not x)`
pub fn not(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    Ok(boolean(!args[0].is_truthy()))
}
