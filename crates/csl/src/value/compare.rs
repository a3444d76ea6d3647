//! Total ordering over values

use std::cmp::Ordering;
use std::rc::Rc;

use super::{List, Value};
use crate::eval::ensure_sufficient_stack;

impl Value {
    /// Compare two values.
    ///
    /// - Lists compare element-wise, then by length.
    /// - Strings and symbols compare by bytes.
    /// - Ints and floats compare numerically; an int meeting a float is
    ///   promoted to `f64` first.
    /// - Native functions and foreign handles compare by identity.
    /// - Buffers compare byte-wise up to the shorter length.
    /// - Anything else orders by variant.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Nil, Value::Nil) | (Value::Quote, Value::Quote) => Ordering::Equal,

            (Value::List(a), Value::List(b)) => ensure_sufficient_stack(|| compare_lists(a, b)),

            (Value::String(a), Value::String(b)) | (Value::Symbol(a), Value::Symbol(b)) => {
                a.as_bytes().cmp(b.as_bytes())
            }

            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => compare_floats(*a, *b),
            (Value::Int(a), Value::Float(b)) => compare_floats(*a as f64, *b),
            (Value::Float(a), Value::Int(b)) => compare_floats(*a, *b as f64),

            (Value::Native(a), Value::Native(b)) => {
                if Rc::ptr_eq(a, b) {
                    Ordering::Equal
                } else {
                    Rc::as_ptr(a).cmp(&Rc::as_ptr(b))
                }
            }
            (Value::Ffi(a), Value::Ffi(b)) => a.addr().cmp(&b.addr()),

            (Value::Buffer(a), Value::Buffer(b)) => {
                let n = a.len().min(b.len());
                a[..n].cmp(&b[..n])
            }

            _ => self.kind().rank().cmp(&other.kind().rank()),
        }
    }
}

fn compare_lists(a: &List, b: &List) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = x.compare(y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

fn compare_floats(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}
