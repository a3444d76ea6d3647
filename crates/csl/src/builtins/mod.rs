//! The builtin library
//!
//! Builtins receive their arguments already evaluated. Forms that must be
//! evaluated later (bodies, branches, loop conditions) are passed quoted:
//!
//! ```text
//! (defun 'sq '(x) '(* x x))
//! (if (< n 2) '(base) '(step n))
//! (while '(< i 10) '(set 'i (+ i 1)))
//! ```
//!
//! Every builtin reports failures as a [`Fault`] so the dispatcher can
//! raise the matching condition.

pub mod arith;
pub mod closure;
pub mod compare;
pub mod control;
pub mod env;
pub mod ffi;
pub mod list;
pub mod trap;

use crate::error::FfiError;
use crate::eval::{Fault, Unwind};
use crate::value::{List, Value};

/// The language's boolean: Int 1 or Int 0.
pub fn boolean(b: bool) -> Value {
    Value::Int(b as i64)
}

/// Argument `i` as a name (symbol or string).
pub(crate) fn name_arg<'v>(callee: &str, args: &'v [Value], i: usize) -> Result<&'v str, Unwind> {
    let arg = arg(callee, args, i)?;
    arg.as_name().ok_or_else(|| {
        Fault::bad_param(
            format!("`{}`: argument {} must be a name, got {}", callee, i + 1, arg.type_name()),
            std::slice::from_ref(arg),
        )
        .into()
    })
}

/// Argument `i` as an integer.
pub(crate) fn int_arg(callee: &str, args: &[Value], i: usize) -> Result<i64, Unwind> {
    let arg = arg(callee, args, i)?;
    arg.as_int().ok_or_else(|| {
        Fault::bad_param(
            format!("`{}`: argument {} must be an int, got {}", callee, i + 1, arg.type_name()),
            std::slice::from_ref(arg),
        )
        .into()
    })
}

/// Argument `i` as a non-negative index.
pub(crate) fn index_arg(callee: &str, args: &[Value], i: usize) -> Result<usize, Unwind> {
    let n = int_arg(callee, args, i)?;
    usize::try_from(n).map_err(|_| {
        Fault::bad_param(format!("`{}`: negative index {}", callee, n), &[Value::Int(n)]).into()
    })
}

/// Argument `i` as a plain list; `nil` reads as the empty list and flags
/// are dropped.
pub(crate) fn list_arg(callee: &str, args: &[Value], i: usize) -> Result<List, Unwind> {
    match arg(callee, args, i)? {
        Value::List(l) => Ok(List::from(l.as_slice().to_vec())),
        Value::Nil => Ok(List::new()),
        other => Err(Fault::bad_param(
            format!("`{}`: argument {} must be a list, got {}", callee, i + 1, other.type_name()),
            std::slice::from_ref(other),
        )
        .into()),
    }
}

/// Argument `i`; arity is checked by the dispatcher, so a missing argument
/// only happens for builtins with optional trailing parameters.
pub(crate) fn arg<'v>(callee: &str, args: &'v [Value], i: usize) -> Result<&'v Value, Unwind> {
    args.get(i)
        .ok_or_else(|| Fault::missing_param(callee, args).into())
}

/// A non-call FFI failure (type lookup, layout, packing) as a fault.
pub(crate) fn ffi_fault(err: FfiError, culprits: &[Value]) -> Unwind {
    Fault::with_message(err.condition(), err.to_string(), culprits).into()
}
