//! Named conditions and the raise/resolve protocol
//!
//! A condition is raised by building a synthetic call form
//! `[handler, 'NAME, args…]` and evaluating it in the raising scope. The
//! handler's result decides what happens to the faulting operation:
//! a value comparing equal to `0` asks for a retry, anything else becomes
//! the operation's result.

mod debugger;
mod signals;

pub use debugger::DebugSession;
pub(crate) use debugger::builtin_debugger;
pub use signals::Signal;
pub(crate) use signals::SignalWatch;

use std::cmp::Ordering;
use std::fmt;

use tracing::{debug, warn};

use crate::environment::Scope;
use crate::error::EvalError;
use crate::eval::Fault;
use crate::runtime::Runtime;
use crate::value::Value;

/// A raisable condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Too many arguments
    ParamCount,
    /// Too few arguments
    MissingParam,
    /// An argument of the wrong type or shape
    BadParam,
    /// Unbound symbol, uncallable value, or malformed form
    EvalError,
    /// A native library or symbol could not be resolved
    FfiFailure,
    /// A POSIX signal delivered to the process
    Signal(Signal),
    /// A user-defined condition
    Named(String),
}

impl Condition {
    /// The runtime's built-in conditions, excluding signals.
    pub const RUNTIME: [Condition; 5] = [
        Condition::ParamCount,
        Condition::MissingParam,
        Condition::BadParam,
        Condition::EvalError,
        Condition::FfiFailure,
    ];

    /// Every condition the debugger is registered for on a fresh runtime.
    pub fn defaults() -> impl Iterator<Item = Condition> {
        Signal::ALL
            .into_iter()
            .map(Condition::Signal)
            .chain(Self::RUNTIME)
    }

    /// The name the condition is registered under in the trap table.
    pub fn name(&self) -> &str {
        match self {
            Condition::ParamCount => "PARAM-COUNT",
            Condition::MissingParam => "MISSING-PARAM",
            Condition::BadParam => "BAD-PARAM",
            Condition::EvalError => "EVAL-ERROR",
            Condition::FfiFailure => "FFI-FAILURE",
            Condition::Signal(sig) => sig.name(),
            Condition::Named(name) => name,
        }
    }

    /// Parse a condition name. Unknown names become [`Condition::Named`].
    pub fn from_name(name: &str) -> Condition {
        match name {
            "PARAM-COUNT" => Condition::ParamCount,
            "MISSING-PARAM" => Condition::MissingParam,
            "BAD-PARAM" => Condition::BadParam,
            "EVAL-ERROR" => Condition::EvalError,
            "FFI-FAILURE" => Condition::FfiFailure,
            other => match Signal::from_name(other) {
                Some(sig) => Condition::Signal(sig),
                None => Condition::Named(other.to_string()),
            },
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a handler decided about a fault.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Re-run the faulting operation
    Retry,
    /// Use this value as the faulting operation's result
    Resolved(Value),
}

impl Resolution {
    /// Interpret a handler's result.
    pub fn from_handler_result(value: Value) -> Self {
        if value.compare(&Value::Int(0)) == Ordering::Equal {
            Resolution::Retry
        } else {
            Resolution::Resolved(value)
        }
    }
}

/// Whether an argument must be preceded by a quote marker so the handler
/// receives it literally.
fn needs_quote(value: &Value) -> bool {
    match value {
        Value::Symbol(_) | Value::Quote => true,
        Value::List(l) => !l.is_flagged(),
        _ => false,
    }
}

impl Runtime {
    /// Raise `fault` in `scope` and return the handler's decision.
    ///
    /// # Errors
    ///
    /// - `Unhandled` if no handler is registered for the condition
    /// - `TrapDepthExceeded` if handlers keep faulting
    /// - anything fatal the handler itself produces
    pub fn raise(&mut self, scope: &Scope, fault: &Fault) -> Result<Resolution, EvalError> {
        let name = fault.condition.name().to_string();

        if self.trap_depth >= self.ctx.max_trap_depth {
            return Err(EvalError::TrapDepthExceeded {
                condition: name,
                depth: self.trap_depth + 1,
                max: self.ctx.max_trap_depth,
            });
        }

        let Some(handler) = self.traps.find(&name).cloned() else {
            warn!(condition = %name, "no handler registered");
            return Err(EvalError::Unhandled { condition: name });
        };

        debug!(condition = %name, depth = self.trap_depth, args = fault.args.len(), "raising");

        let mut form = Vec::with_capacity(fault.args.len() * 2 + 3);
        form.push(handler);
        form.push(Value::Quote);
        form.push(Value::symbol(name.as_str()));
        for arg in &fault.args {
            if needs_quote(arg) {
                form.push(Value::Quote);
            }
            form.push(arg.clone());
        }

        self.trap_depth += 1;
        let result = self.eval(scope, &Value::list(form));
        self.trap_depth -= 1;

        let resolution = Resolution::from_handler_result(result?);
        debug!(condition = %name, ?resolution, "handler returned");
        Ok(resolution)
    }

    /// Register `handler` for the condition `name`, replacing any previous
    /// handler.
    pub fn set_trap(&mut self, name: &str, handler: Value) {
        self.traps.add(name, handler);
    }

    /// Unregister the handler for `name`, returning it.
    pub fn remove_trap(&mut self, name: &str) -> Option<Value> {
        self.traps.remove(name)
    }
}
