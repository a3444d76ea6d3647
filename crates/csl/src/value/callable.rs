//! Callable value payloads: builtins and foreign handles

use std::ffi::c_void;

use super::Value;
use crate::environment::Scope;
use crate::eval::CallResult;
use crate::runtime::Runtime;

/// Signature of a builtin implementation.
///
/// Builtins receive the runtime, the caller's scope, and the evaluated
/// arguments (the callee itself excluded).
pub type BuiltinFnPtr = fn(&mut Runtime, &Scope, &[Value]) -> CallResult;

/// Accepted argument counts for a builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    /// Fewest arguments accepted
    pub min: usize,
    /// Most arguments accepted, `None` for variadic
    pub max: Option<usize>,
}

impl Arity {
    /// Exactly `n` arguments.
    pub const fn exact(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    /// At least `n` arguments.
    pub const fn at_least(n: usize) -> Self {
        Self { min: n, max: None }
    }

    /// Between `min` and `max` arguments, inclusive.
    pub const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// Whether `n` arguments are too few.
    pub fn too_few(&self, n: usize) -> bool {
        n < self.min
    }

    /// Whether `n` arguments are too many.
    pub fn too_many(&self, n: usize) -> bool {
        self.max.is_some_and(|max| n > max)
    }
}

/// A built-in native function.
///
/// Wrapped in `Rc` inside [`Value::Native`]; clones share the same
/// `BuiltinFn` and compare equal by identity.
#[derive(Clone)]
pub struct BuiltinFn {
    /// Function name (for display/debugging)
    pub name: String,

    /// Accepted argument counts
    pub arity: Arity,

    /// The implementation
    pub func: BuiltinFnPtr,
}

impl BuiltinFn {
    /// Create a builtin.
    pub fn new(name: impl Into<String>, arity: Arity, func: BuiltinFnPtr) -> Self {
        Self {
            name: name.into(),
            arity,
            func,
        }
    }
}

impl std::fmt::Debug for BuiltinFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BuiltinFn({})", self.name)
    }
}

/// An opaque address handed out by (or to) native code.
///
/// The runtime never dereferences or frees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignPtr {
    addr: usize,
}

impl ForeignPtr {
    /// Wrap a raw address.
    pub fn new(addr: usize) -> Self {
        Self { addr }
    }

    /// Wrap a raw pointer.
    pub fn from_ptr(ptr: *const c_void) -> Self {
        Self { addr: ptr as usize }
    }

    /// The address.
    pub fn addr(&self) -> usize {
        self.addr
    }

    /// The address as a raw pointer.
    pub fn as_ptr(&self) -> *const c_void {
        self.addr as *const c_void
    }

    /// Whether this is the null pointer.
    pub fn is_null(&self) -> bool {
        self.addr == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_bounds() {
        let exact = Arity::exact(2);
        assert!(exact.too_few(1));
        assert!(!exact.too_few(2));
        assert!(exact.too_many(3));

        let variadic = Arity::at_least(1);
        assert!(variadic.too_few(0));
        assert!(!variadic.too_many(100));

        let range = Arity::range(2, 3);
        assert!(!range.too_many(3));
        assert!(range.too_many(4));
    }

    #[test]
    fn test_foreign_ptr_null() {
        assert!(ForeignPtr::new(0).is_null());
        assert!(!ForeignPtr::from_ptr(8 as *const c_void).is_null());
    }
}
