//! Display and Debug implementations for Value

use std::fmt;
use std::io::{self, Write};

use super::*;
use crate::eval::ensure_sufficient_stack;

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::List(l) => fmt::Debug::fmt(l, f),
            Value::Quote => write!(f, "Quote"),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Symbol(s) => write!(f, "Symbol({})", s),
            Value::Int(n) => write!(f, "Int({})", n),
            Value::Float(n) => write!(f, "Float({:?})", n),
            Value::Native(b) => write!(f, "Native({})", b.name),
            Value::Ffi(p) => write!(f, "Ffi({:#x})", p.addr()),
            Value::Buffer(b) => write!(f, "Buffer({:02x?})", b),
        }
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_function() {
            write!(f, "Function")?;
        } else if self.is_foreign() {
            write!(f, "Foreign")?;
        }
        ensure_sufficient_stack(|| f.debug_list().entries(self.iter()).finish())
    }
}

impl fmt::Display for Value {
    /// Lisp-syntax rendering. Strings print raw at the top level and quoted
    /// inside lists; floats always carry five decimals.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => write_nested(other, f),
        }
    }
}

/// Renders a value the way it appears inside a list: strings quoted.
pub(crate) struct Nested<'a>(pub(crate) &'a Value);

impl fmt::Display for Nested<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_nested(self.0, f)
    }
}

fn write_nested(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Nil => write!(f, "nil"),
        Value::Quote => write!(f, "'"),
        Value::String(s) => write!(f, "{:?}", s),
        Value::Symbol(s) => f.write_str(s),
        Value::Int(n) => write!(f, "{}", n),
        Value::Float(n) => write!(f, "{:.5}", n),
        Value::Native(b) => write!(f, "#<builtin {}>", b.name),
        Value::Ffi(p) => write!(f, "#<ffi {:#x}>", p.addr()),
        Value::Buffer(bytes) => {
            write!(f, "#<buffer ")?;
            for b in bytes {
                write!(f, "{:02x}", b)?;
            }
            write!(f, ">")
        }
        Value::List(l) => ensure_sufficient_stack(|| {
            if l.is_function() {
                write!(f, "#<lambda ")?;
                write_items(l, f)?;
                return write!(f, ">");
            }
            if l.is_foreign() {
                write!(f, "#<foreign ")?;
                write_items(l, f)?;
                return write!(f, ">");
            }
            write!(f, "(")?;
            write_items(l, f)?;
            write!(f, ")")
        }),
    }
}

fn write_items(list: &List, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut after_quote = true;
    for item in list {
        if !after_quote {
            write!(f, " ")?;
        }
        write_nested(item, f)?;
        after_quote = matches!(item, Value::Quote);
    }
    Ok(())
}

impl Value {
    /// Write an indented tree dump of the value, one node per line, each
    /// indented three spaces per level of `depth`.
    pub fn print(&self, depth: usize, sink: &mut dyn Write) -> io::Result<()> {
        let pad = " ".repeat(depth * 3);
        match self {
            Value::List(l) => {
                let tag = if l.is_function() {
                    "fn"
                } else if l.is_foreign() {
                    "ffi-decl"
                } else {
                    "list"
                };
                writeln!(sink, "{pad} ->{tag}[{}]", l.len())?;
                ensure_sufficient_stack(|| {
                    l.iter().try_for_each(|child| child.print(depth + 1, sink))
                })
            }
            Value::Nil => writeln!(sink, "{pad} ->nil"),
            Value::Quote => writeln!(sink, "{pad} ->quote"),
            Value::String(s) => writeln!(sink, "{pad} ->str[{s}]"),
            Value::Symbol(s) => writeln!(sink, "{pad} ->sym[{s}]"),
            Value::Int(n) => writeln!(sink, "{pad} ->int[{n}]"),
            Value::Float(n) => writeln!(sink, "{pad} ->flt[{n:.6}]"),
            Value::Native(b) => writeln!(sink, "{pad} ->native[{}]", b.name),
            Value::Ffi(p) => writeln!(sink, "{pad} ->ffi[{:#x}]", p.addr()),
            Value::Buffer(b) => writeln!(sink, "{pad} ->buf[{}]", b.len()),
        }
    }
}
