//! # csl
//!
//! An embeddable runtime for a small Lisp-like scripting language.
//!
//! A host hands the runtime a value tree (or source text, via the bundled
//! reader) and the runtime evaluates it. Failures never surface as error
//! values inside the language; they are raised as named *traps* that a
//! handler can resolve, retry, or escalate to an interactive debugger.
//! Native libraries are reachable through a marshaling layer built on
//! `libloading` and `libffi`.
//!
//! ## Architecture
//!
//! - **Value model**: a closed sum type with owned lists and shared handles
//! - **Environment**: insertion-ordered tables and a persistent scope chain
//! - **Evaluator**: list evaluation with the quote protocol and call dispatch
//! - **Traps**: condition table, retry protocol, debugger console
//! - **FFI**: type table, promotion, ABI invocation, struct layout
//!
//! ## Example
//!
//! ```
//! use csl::{Runtime, Value};
//!
//! let mut rt = Runtime::new();
//! rt.eval_str("(defun 'sq '(x) '(* x x))").unwrap();
//! assert_eq!(rt.eval_str("(sq 5)").unwrap(), Value::Int(25));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builtins;
pub mod context;
pub mod environment;
pub mod error;
pub mod eval;
pub mod ffi;
pub mod reader;
pub mod runtime;
pub mod trap;
pub mod value;

// Re-export main types
pub use context::EvalContext;
pub use environment::{Environment, Scope};
pub use error::{CslError, EvalError, FfiError, ParseError, Result, ValueError};
pub use eval::{CallFrame, CallResult, CallStack, EvalResult, Fault, Unwind};
pub use ffi::{FfiRegistry, NativeKind, NativeType, StructLayout};
pub use runtime::{Runtime, RuntimeIo, SharedBuffer};
pub use trap::{Condition, Resolution};
pub use value::{Arity, BuiltinFn, BuiltinFnPtr, ForeignPtr, List, ListFlags, Value, ValueKind};

/// csl version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }
}
