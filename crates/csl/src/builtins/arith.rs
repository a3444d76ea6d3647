//! Arithmetic: `+ - * / %`
//!
//! The result is a Float if any operand is a Float, otherwise an Int.
//! Integer arithmetic is checked: overflow and division by zero raise
//! `SIGFPE`.

use crate::environment::Scope;
use crate::eval::{CallResult, Fault};
use crate::runtime::Runtime;
use crate::trap::{Condition, Signal};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        match value {
            Value::Int(n) => Some(Num::Int(*n)),
            Value::Float(x) => Some(Num::Float(*x)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(x) => x,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Num::Int(n) => Value::Int(n),
            Num::Float(x) => Value::Float(x),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Rem => "%",
        }
    }

    fn apply(self, lhs: Num, rhs: Num) -> Option<Num> {
        match (lhs, rhs) {
            (Num::Int(a), Num::Int(b)) => match self {
                Op::Add => a.checked_add(b),
                Op::Sub => a.checked_sub(b),
                Op::Mul => a.checked_mul(b),
                Op::Div => a.checked_div(b),
                Op::Rem => a.checked_rem(b),
            }
            .map(Num::Int),
            (a, b) => {
                let (a, b) = (a.as_f64(), b.as_f64());
                Some(Num::Float(match self {
                    Op::Add => a + b,
                    Op::Sub => a - b,
                    Op::Mul => a * b,
                    Op::Div => a / b,
                    Op::Rem => a % b,
                }))
            }
        }
    }
}

fn operands(op: Op, args: &[Value]) -> Result<Vec<Num>, Fault> {
    args.iter()
        .map(|arg| {
            Num::of(arg).ok_or_else(|| {
                Fault::bad_param(
                    format!("`{}`: {} is not a number", op.symbol(), arg.type_name()),
                    args,
                )
            })
        })
        .collect()
}

fn fold(op: Op, init: Num, nums: &[Num], args: &[Value]) -> CallResult {
    let mut acc = init;
    for &n in nums {
        acc = op.apply(acc, n).ok_or_else(|| {
            Fault::with_message(
                Condition::Signal(Signal::Fpe),
                format!("`{}`: integer overflow or division by zero", op.symbol()),
                args,
            )
        })?;
    }
    Ok(acc.into_value())
}

fn reduce(op: Op, identity: Num, args: &[Value]) -> CallResult {
    let nums = operands(op, args)?;
    match nums.split_first() {
        // A single operand is negated/inverted against the identity.
        Some((&only, [])) if matches!(op, Op::Sub | Op::Div) => fold(op, identity, &[only], args),
        Some((&first, rest)) => fold(op, first, rest, args),
        None => Ok(identity.into_value()),
    }
}

/// `(+ n…)`
pub fn add(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    reduce(Op::Add, Num::Int(0), args)
}

/// `(- n…)`, `(- n)` negates
pub fn sub(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    reduce(Op::Sub, Num::Int(0), args)
}

/// `(* n…)`
pub fn mul(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    reduce(Op::Mul, Num::Int(1), args)
}

/// `(/ n…)`, `(/ n)` is `1/n`
pub fn div(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    reduce(Op::Div, Num::Int(1), args)
}

/// `(% a b)`
pub fn rem(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    reduce(Op::Rem, Num::Int(0), args)
}
