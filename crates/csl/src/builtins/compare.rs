//! Chained comparison: `< <= > >= = !=`

use std::cmp::Ordering;

use super::boolean;
use crate::environment::Scope;
use crate::eval::CallResult;
use crate::runtime::Runtime;
use crate::value::Value;

/// True when every adjacent pair satisfies `holds`.
fn chain(args: &[Value], holds: impl Fn(Ordering) -> bool) -> CallResult {
    Ok(boolean(
        args.windows(2).all(|pair| holds(pair[0].compare(&pair[1]))),
    ))
}

/// `(< a b …)`
pub fn lt(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    chain(args, |o| o == Ordering::Less)
}

/// `(<= a b …)`
pub fn le(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    chain(args, |o| o != Ordering::Greater)
}

/// `(> a b …)`
pub fn gt(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    chain(args, |o| o == Ordering::Greater)
}

/// `(>= a b …)`
pub fn ge(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    chain(args, |o| o != Ordering::Less)
}

/// `(= a b …)`
pub fn eq(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    chain(args, |o| o == Ordering::Equal)
}

/// `(!= a b …)`, adjacent values differ
pub fn ne(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    chain(args, |o| o != Ordering::Equal)
}
