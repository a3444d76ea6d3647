//! List builtins

use super::{arg, index_arg, list_arg};
use crate::environment::Scope;
use crate::eval::{CallResult, Fault};
use crate::runtime::Runtime;
use crate::value::Value;

/// `(list x…)`
pub fn list(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    Ok(Value::list(args.to_vec()))
}

/// `(length x)`: children of a list, characters of a string, bytes of a
/// buffer.
pub fn length(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let n = match &args[0] {
        Value::List(l) => l.len(),
        Value::String(s) => s.chars().count(),
        Value::Buffer(b) => b.len(),
        Value::Nil => 0,
        other => {
            return Err(Fault::bad_param(
                format!("`length`: {} has no length", other.type_name()),
                args,
            )
            .into())
        }
    };
    Ok(Value::Int(n as i64))
}

/// `(nth list i)`, `nil` past the end
pub fn nth(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let list = list_arg("nth", args, 0)?;
    let i = index_arg("nth", args, 1)?;
    Ok(list.get(i).cloned().unwrap_or(Value::Nil))
}

/// `(first list)`
pub fn first(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let list = list_arg("first", args, 0)?;
    Ok(list.get(0).cloned().unwrap_or(Value::Nil))
}

/// `(rest list)`
pub fn rest(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let mut list = list_arg("rest", args, 0)?;
    list.remove_head();
    Ok(Value::List(list))
}

/// `(cons x list)`
pub fn cons(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let mut list = list_arg("cons", args, 1)?;
    list.insert_head(args[0].clone());
    Ok(Value::List(list))
}

/// `(append list x…)`
pub fn append(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let mut list = list_arg("append", args, 0)?;
    for item in &args[1..] {
        list.insert_tail(item.clone());
    }
    Ok(Value::List(list))
}

/// `(remove list i)`
pub fn remove(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let mut list = list_arg("remove", args, 0)?;
    let i = index_arg("remove", args, 1)?;
    if list.remove(i).is_none() {
        return Err(Fault::bad_param(
            format!("`remove`: index {} out of range for length {}", i, list.len()),
            args,
        )
        .into());
    }
    Ok(Value::List(list))
}

/// `(concat list…)`
pub fn concat(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    Ok(Value::concatenate(args)?)
}

/// `(pair names values)`
pub fn pair(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    Ok(Value::pair(arg("pair", args, 0)?, arg("pair", args, 1)?)?)
}
