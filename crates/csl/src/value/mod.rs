//! Value representation for runtime values

mod callable;
mod compare;
mod display;
mod impls;
mod list;

pub use callable::{Arity, BuiltinFn, BuiltinFnPtr, ForeignPtr};
pub(crate) use display::Nested;
pub use list::{List, ListFlags};

use std::rc::Rc;

/// Runtime value representation for the csl interpreter.
///
/// Ownership follows the tree: a `List` owns its children and cloning a
/// value deep-copies everything except `Native` and `Ffi`, which share
/// process-wide resources through `Rc` and keep their identity when cloned.
#[derive(Clone)]
pub enum Value {
    /// The empty value
    Nil,

    /// Ordered, owned sequence of values, possibly flagged as a function
    /// definition or a foreign declaration
    List(List),

    /// One-shot marker: the next item of the enclosing list is taken
    /// literally instead of being evaluated
    Quote,

    /// Text
    String(String),

    /// A name resolved through the environment when evaluated
    Symbol(String),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit floating point
    Float(f64),

    /// Built-in native function
    Native(Rc<BuiltinFn>),

    /// Opaque foreign handle (non-owning)
    Ffi(Rc<ForeignPtr>),

    /// Byte blob, e.g. a packed native struct
    Buffer(Vec<u8>),
}

/// The variant tag of a [`Value`], used by [`Value::from_literal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`Value::Nil`]
    Nil,
    /// [`Value::List`]
    List,
    /// [`Value::Quote`]
    Quote,
    /// [`Value::String`]
    String,
    /// [`Value::Symbol`]
    Symbol,
    /// [`Value::Int`]
    Int,
    /// [`Value::Float`]
    Float,
    /// [`Value::Native`]
    Native,
    /// [`Value::Ffi`]
    Ffi,
    /// [`Value::Buffer`]
    Buffer,
}

impl ValueKind {
    /// Human-readable name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Nil => "nil",
            ValueKind::List => "list",
            ValueKind::Quote => "quote",
            ValueKind::String => "string",
            ValueKind::Symbol => "symbol",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Native => "native",
            ValueKind::Ffi => "ffi",
            ValueKind::Buffer => "buffer",
        }
    }

    /// Position of the kind in the cross-variant ordering.
    pub(crate) fn rank(self) -> u8 {
        match self {
            ValueKind::Nil => 0,
            ValueKind::Quote => 1,
            ValueKind::Int | ValueKind::Float => 2,
            ValueKind::String => 3,
            ValueKind::Symbol => 4,
            ValueKind::Buffer => 5,
            ValueKind::List => 6,
            ValueKind::Native => 7,
            ValueKind::Ffi => 8,
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
