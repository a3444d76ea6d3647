//! Binding builtins: `define set undefine`

use super::name_arg;
use crate::environment::Scope;
use crate::eval::CallResult;
use crate::runtime::Runtime;
use crate::value::Value;

/// `(define 'name value)` binds a global and returns the value.
pub fn define(rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let name = name_arg("define", args, 0)?;
    let value = args[1].clone();
    rt.globals.add(name, value.clone());
    Ok(value)
}

/// `(set 'name value)` assigns the innermost local binding of `name`, or
/// the global binding (creating it) when no frame binds it.
pub fn set(rt: &mut Runtime, scope: &Scope, args: &[Value]) -> CallResult {
    let name = name_arg("set", args, 0)?;
    let value = args[1].clone();
    if let Err(value) = scope.assign(name, value.clone()) {
        rt.globals.add(name, value);
    }
    Ok(value)
}

/// `(undefine 'name)` removes a global and returns its value, or `nil`.
pub fn undefine(rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let name = name_arg("undefine", args, 0)?;
    Ok(rt.globals.remove(name).unwrap_or(Value::Nil))
}
