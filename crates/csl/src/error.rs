//! Error types for csl
//!
//! Conditions raised *inside* the language are traps (see [`crate::trap`]).
//! The types here cover what has to leave the language: reader failures,
//! literal construction failures, FFI layer failures before they are turned
//! into conditions, and fatal evaluation outcomes the host must act on.

use thiserror::Error;

use crate::trap::Condition;

/// Failure to construct a value from literal text or to apply a list
/// operation to a value of the wrong shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    /// The literal text is not a valid number of the requested kind
    #[error("`{text}` is not a valid {kind} literal")]
    InvalidLiteral {
        /// Requested kind
        kind: &'static str,
        /// Offending text
        text: String,
    },

    /// The value kind has no literal form
    #[error("{0} values cannot be constructed from a literal")]
    NotConstructible(&'static str),

    /// A list operation was applied to something that is not a list
    #[error("expected a list, got {0}")]
    NotAList(&'static str),

    /// Two lists that must be zipped have different lengths
    #[error("cannot pair {names} names with {values} values")]
    LengthMismatch {
        /// Number of names
        names: usize,
        /// Number of values
        values: usize,
    },
}

/// Reader failure. Fatal to the load operation; never enters the trap
/// system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// End of input inside a string literal
    #[error("unterminated string starting at {line}:{column}")]
    UnterminatedString {
        /// Line (1-indexed)
        line: usize,
        /// Column (1-indexed)
        column: usize,
    },

    /// End of input inside a list
    #[error("unclosed list starting at {line}:{column}")]
    UnclosedList {
        /// Line (1-indexed)
        line: usize,
        /// Column (1-indexed)
        column: usize,
    },

    /// A `)` with no matching `(`
    #[error("unexpected `)` at {line}:{column}")]
    UnexpectedClose {
        /// Line (1-indexed)
        line: usize,
        /// Column (1-indexed)
        column: usize,
    },

    /// A token that cannot be classified
    #[error("unclassifiable token `{text}` at {line}:{column}")]
    InvalidToken {
        /// Token text
        text: String,
        /// Line (1-indexed)
        line: usize,
        /// Column (1-indexed)
        column: usize,
    },
}

/// Failure inside the FFI marshaling layer.
///
/// The evaluator converts these into conditions with [`FfiError::condition`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FfiError {
    /// No candidate path for the library could be opened
    #[error("cannot load library `{name}`: {reason}")]
    LibraryNotFound {
        /// Library name as declared
        name: String,
        /// Loader message
        reason: String,
    },

    /// The library does not export the symbol
    #[error("symbol `{symbol}` not found in `{library}`: {reason}")]
    SymbolNotFound {
        /// Library name as declared
        library: String,
        /// Symbol name
        symbol: String,
        /// Loader message
        reason: String,
    },

    /// A type name that is not in the native type table
    #[error("unknown native type `{0}`")]
    UnknownType(String),

    /// A known type used where it is not allowed
    #[error("native type `{0}` cannot be used here")]
    UnsupportedType(String),

    /// Argument count differs from the declaration
    #[error("expected {expected} arguments, got {got}")]
    ArgumentCount {
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// An argument cannot be marshaled as the declared type
    #[error("argument {index}: cannot pass {got} as `{expected}`")]
    Incompatible {
        /// Zero-based argument position
        index: usize,
        /// Declared type name
        expected: String,
        /// Description of the supplied value
        got: String,
    },

    /// A foreign declaration list has the wrong shape
    #[error("malformed foreign declaration: {0}")]
    Declaration(String),

    /// A native object larger than the runtime can allocate
    #[error("a native object of {0} bytes is too large")]
    TooLarge(usize),

    /// A struct field value does not fit its slot
    #[error("struct field {index}: {reason}")]
    Field {
        /// Zero-based field position
        index: usize,
        /// What went wrong
        reason: String,
    },
}

impl FfiError {
    /// The condition a failure of this kind raises.
    pub fn condition(&self) -> Condition {
        match self {
            FfiError::ArgumentCount { .. } => Condition::ParamCount,
            FfiError::Incompatible { .. }
            | FfiError::UnknownType(_)
            | FfiError::UnsupportedType(_)
            | FfiError::TooLarge(_)
            | FfiError::Field { .. } => Condition::BadParam,
            FfiError::LibraryNotFound { .. }
            | FfiError::SymbolNotFound { .. }
            | FfiError::Declaration(_) => Condition::FfiFailure,
        }
    }
}

/// Fatal evaluation outcome.
///
/// Everything recoverable is a trap; an `EvalError` means the computation
/// cannot continue and the host decides what to do (usually exit).
#[derive(Error, Debug)]
pub enum EvalError {
    /// A condition was raised with no handler registered for it
    #[error("unhandled condition `{condition}`")]
    Unhandled {
        /// Condition name
        condition: String,
    },

    /// The debugger's control stream ended without a resolution
    #[error("condition `{condition}` left unresolved: control input closed")]
    Unresolved {
        /// Condition name
        condition: String,
    },

    /// The debugger's `kill` command
    #[error("terminated with exit code {code}")]
    Killed {
        /// Requested process exit code
        code: i32,
    },

    /// Call nesting exceeded [`crate::EvalContext::max_call_depth`]
    #[error("stack overflow: call depth {depth} exceeds maximum {max}")]
    StackOverflow {
        /// Depth reached
        depth: usize,
        /// Configured maximum
        max: usize,
    },

    /// Trap-within-trap nesting exceeded [`crate::EvalContext::max_trap_depth`]
    #[error("trap nesting {depth} exceeds maximum {max} while raising `{condition}`")]
    TrapDepthExceeded {
        /// Condition being raised
        condition: String,
        /// Depth reached
        depth: usize,
        /// Configured maximum
        max: usize,
    },

    /// A handler kept asking for retries
    #[error("condition `{condition}` retried {retries} times")]
    RetryLimit {
        /// Condition name
        condition: String,
        /// Retries performed
        retries: usize,
    },

    /// Reading the control stream or writing an output stream failed
    #[error("runtime I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Any failure surfaced by the embedding API.
#[derive(Error, Debug)]
pub enum CslError {
    /// Source text could not be read
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Evaluation ended fatally
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Result type alias for the embedding API
pub type Result<T> = std::result::Result<T, CslError>;
