//! Unwinding signals for faults and fatal errors

use crate::error::{EvalError, FfiError, ValueError};
use crate::trap::{Condition, Signal};
use crate::value::Value;

/// A condition waiting to be raised, with the values handed to its handler.
///
/// Builtins return a `Fault` instead of raising directly; the call
/// dispatcher raises it and either retries the call or substitutes the
/// handler's result.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    /// Condition to raise
    pub condition: Condition,

    /// Handler arguments after the condition name
    pub args: Vec<Value>,
}

impl Fault {
    /// Create a fault with explicit handler arguments.
    pub fn new(condition: Condition, args: Vec<Value>) -> Self {
        Self { condition, args }
    }

    /// A fault whose first handler argument is a message, followed by the
    /// offending values.
    pub fn with_message(condition: Condition, message: impl Into<String>, culprits: &[Value]) -> Self {
        let mut args = Vec::with_capacity(culprits.len() + 1);
        args.push(Value::String(message.into()));
        args.extend_from_slice(culprits);
        Self { condition, args }
    }

    /// `EVAL-ERROR`
    pub fn eval_error(message: impl Into<String>, culprits: &[Value]) -> Self {
        Self::with_message(Condition::EvalError, message, culprits)
    }

    /// `BAD-PARAM`
    pub fn bad_param(message: impl Into<String>, culprits: &[Value]) -> Self {
        Self::with_message(Condition::BadParam, message, culprits)
    }

    /// `MISSING-PARAM`
    pub fn missing_param(callee: &str, args: &[Value]) -> Self {
        Self::with_message(
            Condition::MissingParam,
            format!("`{}`: too few arguments ({})", callee, args.len()),
            args,
        )
    }

    /// `PARAM-COUNT`
    pub fn param_count(callee: &str, args: &[Value]) -> Self {
        Self::with_message(
            Condition::ParamCount,
            format!("`{}`: too many arguments ({})", callee, args.len()),
            args,
        )
    }

    /// A marshaling or resolution failure in a call to `library`/`symbol`.
    pub fn ffi(err: &FfiError, library: &str, symbol: &str) -> Self {
        Self::new(
            err.condition(),
            vec![
                Value::string(err.to_string()),
                Value::string(library),
                Value::string(symbol),
            ],
        )
    }

    /// A delivered signal.
    pub fn signal(sig: Signal) -> Self {
        Self::new(Condition::Signal(sig), Vec::new())
    }
}

/// Why a call did not produce a value.
#[derive(Debug)]
pub enum Unwind {
    /// A condition to raise at the nearest call boundary
    Condition(Fault),

    /// A fatal outcome heading for the host
    Fatal(EvalError),
}

impl From<Fault> for Unwind {
    fn from(fault: Fault) -> Self {
        Unwind::Condition(fault)
    }
}

impl From<EvalError> for Unwind {
    fn from(err: EvalError) -> Self {
        Unwind::Fatal(err)
    }
}

impl From<ValueError> for Unwind {
    fn from(err: ValueError) -> Self {
        Unwind::Condition(Fault::bad_param(err.to_string(), &[]))
    }
}

impl From<std::io::Error> for Unwind {
    fn from(err: std::io::Error) -> Self {
        Unwind::Fatal(EvalError::Io(err))
    }
}

/// Result of a builtin or dispatch step.
pub type CallResult = Result<Value, Unwind>;
