//! Value trait implementations: constructors, predicates, extractors, list
//! operations, PartialEq

use std::rc::Rc;

use super::*;
use crate::error::ValueError;
use crate::eval::ensure_sufficient_stack;

// ═══════════════════════════════════════════════════════════════════
// Construction
// ═══════════════════════════════════════════════════════════════════

impl Value {
    /// Construct a value of `kind` from its literal text.
    ///
    /// Lists start empty; `Native` and `Ffi` have no literal form.
    pub fn from_literal(kind: ValueKind, text: &str) -> Result<Value, ValueError> {
        match kind {
            ValueKind::Nil => Ok(Value::Nil),
            ValueKind::List => Ok(Value::List(List::new())),
            ValueKind::Quote => Ok(Value::Quote),
            ValueKind::String => Ok(Value::string(text)),
            ValueKind::Symbol => Ok(Value::symbol(text)),
            ValueKind::Int => parse_int(text)
                .map(Value::Int)
                .ok_or_else(|| ValueError::InvalidLiteral {
                    kind: "int",
                    text: text.to_string(),
                }),
            ValueKind::Float => text
                .parse::<f64>()
                .ok()
                .filter(|_| text.bytes().any(|b| b.is_ascii_digit()))
                .map(Value::Float)
                .ok_or_else(|| ValueError::InvalidLiteral {
                    kind: "float",
                    text: text.to_string(),
                }),
            ValueKind::Buffer => Ok(Value::Buffer(text.as_bytes().to_vec())),
            ValueKind::Native | ValueKind::Ffi => Err(ValueError::NotConstructible(kind.name())),
        }
    }

    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Create a symbol value
    pub fn symbol(s: impl Into<String>) -> Self {
        Value::Symbol(s.into())
    }

    /// Create a plain list value
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(List::from(items))
    }

    /// Create a native function value
    pub fn native(builtin: BuiltinFn) -> Self {
        Value::Native(Rc::new(builtin))
    }

    /// Create a foreign handle value
    pub fn ffi(addr: usize) -> Self {
        Value::Ffi(Rc::new(ForeignPtr::new(addr)))
    }

    /// Create a function definition: a `[params, body]` list flagged
    /// [`ListFlags::FUNCTION`].
    pub fn function(params: Value, body: Value) -> Self {
        Value::List(List::with_flags(vec![params, body], ListFlags::FUNCTION))
    }

    /// Create an argument vector value from owned items.
    pub fn from_items(items: Vec<Value>) -> Self {
        Value::list(items)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Type Predicates
    // ═══════════════════════════════════════════════════════════════════

    /// The variant tag.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::List(_) => ValueKind::List,
            Value::Quote => ValueKind::Quote,
            Value::String(_) => ValueKind::String,
            Value::Symbol(_) => ValueKind::Symbol,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Native(_) => ValueKind::Native,
            Value::Ffi(_) => ValueKind::Ffi,
            Value::Buffer(_) => ValueKind::Buffer,
        }
    }

    /// Name of the variant, with function/foreign lists told apart.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::List(l) if l.is_function() => "function",
            Value::List(l) if l.is_foreign() => "foreign function",
            other => other.kind().name(),
        }
    }

    /// Check if value is nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Check if value is a number
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Check if value is a function definition
    pub fn is_function(&self) -> bool {
        matches!(self, Value::List(l) if l.is_function())
    }

    /// Check if value is a foreign declaration
    pub fn is_foreign(&self) -> bool {
        matches!(self, Value::List(l) if l.is_foreign())
    }

    /// Check if value can be called
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Native(_)) || self.is_function() || self.is_foreign()
    }

    /// Truthiness: nil, zero, and the empty plain list are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::List(l) => l.is_flagged() || !l.is_empty(),
            _ => true,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Extractors (return Option for safe access)
    // ═══════════════════════════════════════════════════════════════════

    /// Extract integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract number as f64 (ints are promoted)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Extract symbol name
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Extract a name from a symbol or string
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Value::Symbol(s) | Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Extract list
    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Consume a list value into its items (an argument vector).
    pub fn into_items(self) -> Result<Vec<Value>, ValueError> {
        match self {
            Value::List(l) => Ok(l.into_items()),
            other => Err(ValueError::NotAList(other.type_name())),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // List Operations
    // ═══════════════════════════════════════════════════════════════════

    /// Number of children of a list; zero for every other value.
    pub fn length(&self) -> usize {
        match self {
            Value::List(l) => l.len(),
            _ => 0,
        }
    }

    /// Child of a list at `index`.
    pub fn index(&self, index: usize) -> Option<&Value> {
        self.as_list().and_then(|l| l.get(index))
    }

    /// Prepend to a list.
    pub fn insert_head(&mut self, value: Value) -> Result<(), ValueError> {
        self.list_mut()?.insert_head(value);
        Ok(())
    }

    /// Append to a list.
    pub fn insert_tail(&mut self, value: Value) -> Result<(), ValueError> {
        self.list_mut()?.insert_tail(value);
        Ok(())
    }

    /// Remove the child at `index` from a list.
    pub fn remove(&mut self, index: usize) -> Result<Option<Value>, ValueError> {
        Ok(self.list_mut()?.remove(index))
    }

    /// Remove the first child of a list.
    pub fn remove_head(&mut self) -> Result<Option<Value>, ValueError> {
        Ok(self.list_mut()?.remove_head())
    }

    /// Remove the last child of a list.
    pub fn remove_tail(&mut self) -> Result<Option<Value>, ValueError> {
        Ok(self.list_mut()?.remove_tail())
    }

    fn list_mut(&mut self) -> Result<&mut List, ValueError> {
        match self {
            Value::List(l) => Ok(l),
            other => Err(ValueError::NotAList(other.type_name())),
        }
    }

    /// Flatten a list of lists into one plain list.
    pub fn concatenate(lists: &[Value]) -> Result<Value, ValueError> {
        let mut out = Vec::new();
        for list in lists {
            match list {
                Value::List(l) => out.extend(l.iter().cloned()),
                Value::Nil => {}
                other => return Err(ValueError::NotAList(other.type_name())),
            }
        }
        Ok(Value::list(out))
    }

    /// Zip two equal-length lists into a list of `[name, value]` pairs.
    pub fn pair(names: &Value, values: &Value) -> Result<Value, ValueError> {
        let names = names
            .as_list()
            .ok_or_else(|| ValueError::NotAList(names.type_name()))?;
        let values = values
            .as_list()
            .ok_or_else(|| ValueError::NotAList(values.type_name()))?;

        if names.len() != values.len() {
            return Err(ValueError::LengthMismatch {
                names: names.len(),
                values: values.len(),
            });
        }

        Ok(Value::list(
            names
                .iter()
                .zip(values.iter())
                .map(|(n, v)| Value::list(vec![n.clone(), v.clone()]))
                .collect(),
        ))
    }
}

fn parse_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i128::from_str_radix(hex, 16).ok()?
    } else {
        if !digits.bytes().all(|b| b.is_ascii_digit()) || digits.is_empty() {
            return None;
        }
        digits.parse::<i128>().ok()?
    };
    let signed = if negative { -magnitude } else { magnitude };
    i64::try_from(signed).ok()
}

// ═══════════════════════════════════════════════════════════════════
// PartialEq Implementation
// ═══════════════════════════════════════════════════════════════════

impl PartialEq for Value {
    /// Structural equality within a variant. Unlike [`Value::compare`],
    /// `Int(1)` and `Float(1.0)` are not equal here.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) | (Value::Quote, Value::Quote) => true,
            (Value::List(a), Value::List(b)) => ensure_sufficient_stack(|| {
                a.flags() == b.flags() && a.as_slice() == b.as_slice()
            }),
            (Value::String(a), Value::String(b)) | (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Ffi(a), Value::Ffi(b)) => a.addr() == b.addr(),
            (Value::Buffer(a), Value::Buffer(b)) => a == b,
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}
