//! Foreign function interface
//!
//! A foreign declaration is a list flagged [`ListFlags::FOREIGN`] holding
//! `[library, symbol, return-type, (param-types…)]`. Calling it goes
//! through [`FfiRegistry::invoke`]:
//!
//! 1. resolve the return and parameter types in the [`TypeTable`]
//! 2. check the argument count, then each argument's compatibility
//! 3. promote the arguments into native cells
//! 4. resolve the symbol (memoized) and call it through libffi
//! 5. promote the return value back into a [`Value`]
//!
//! [`ListFlags::FOREIGN`]: crate::value::ListFlags::FOREIGN

mod layout;
mod marshal;
mod types;

pub use layout::{align_up, zeroed, FieldLayout, StructLayout, MAX_OBJECT_SIZE};
pub use marshal::{check_compatible, natural_float_size, natural_int_size};
pub use types::{NativeKind, NativeType, TypeTable};

use std::ffi::c_void;

use indexmap::IndexMap;
use libloading::Library;
use tracing::debug;

use crate::error::FfiError;
use crate::value::{List, ListFlags, Value};
use marshal::Marshaled;

/// Loaded libraries, resolved symbols and the native type table.
///
/// Libraries are opened on first use and kept until the registry drops.
#[derive(Default)]
pub struct FfiRegistry {
    libraries: IndexMap<String, Library>,
    symbols: IndexMap<(String, String), usize>,
    types: TypeTable,
}

/// A borrowed view of a foreign declaration.
#[derive(Debug, Clone, Copy)]
pub struct ForeignDecl<'a> {
    /// Library name, `""` for the running process
    pub library: &'a str,
    /// Exported symbol name
    pub symbol: &'a str,
    /// Return type name
    pub ret: &'a Value,
    /// Parameter type names
    pub params: &'a [Value],
}

impl<'a> ForeignDecl<'a> {
    /// Read the four slots of a foreign declaration list.
    pub fn from_list(list: &'a List) -> Result<Self, FfiError> {
        let slot = |i: usize, what: &str| {
            list.get(i)
                .ok_or_else(|| FfiError::Declaration(format!("missing {what}")))
        };
        let name = |i: usize, what: &str| {
            slot(i, what)?
                .as_name()
                .ok_or_else(|| FfiError::Declaration(format!("{what} must be a name")))
        };

        let library = name(0, "library")?;
        let symbol = name(1, "symbol")?;
        let ret = slot(2, "return type")?;
        let params = match slot(3, "parameter list")? {
            Value::List(l) => l.as_slice(),
            Value::Nil => &[],
            _ => {
                return Err(FfiError::Declaration(
                    "parameter types must be a list".to_string(),
                ))
            }
        };

        Ok(Self {
            library,
            symbol,
            ret,
            params,
        })
    }
}

/// Build a foreign declaration value.
pub fn declare(library: &str, symbol: &str, ret: Value, params: Vec<Value>) -> Value {
    Value::List(List::with_flags(
        vec![
            Value::string(library),
            Value::string(symbol),
            ret,
            Value::list(params),
        ],
        ListFlags::FOREIGN,
    ))
}

impl FfiRegistry {
    /// Create a registry with the standard type table and nothing loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// The native type table.
    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// The native type table, mutably (e.g. to define structs).
    pub fn types_mut(&mut self) -> &mut TypeTable {
        &mut self.types
    }

    /// Register a host-provided function address under `library`/`symbol`.
    ///
    /// Later resolutions of that pair return `addr` without touching the
    /// dynamic loader.
    pub fn preload(&mut self, library: &str, symbol: &str, addr: usize) {
        debug!(library, symbol, addr = format_args!("{addr:#x}"), "preloaded symbol");
        self.symbols
            .insert((library.to_string(), symbol.to_string()), addr);
    }

    /// Open (or reuse) `name`.
    pub fn library(&mut self, name: &str) -> Result<&Library, FfiError> {
        if !self.libraries.contains_key(name) {
            let lib = open_library(name)?;
            debug!(library = name, "loaded library");
            self.libraries.insert(name.to_string(), lib);
        }
        self.libraries
            .get(name)
            .ok_or_else(|| FfiError::LibraryNotFound {
                name: name.to_string(),
                reason: "not loaded".to_string(),
            })
    }

    /// Resolve (or reuse) the address of `symbol` in `library`.
    pub fn symbol(&mut self, library: &str, symbol: &str) -> Result<usize, FfiError> {
        let key = (library.to_string(), symbol.to_string());
        if let Some(addr) = self.symbols.get(&key) {
            return Ok(*addr);
        }

        let lib = self.library(library)?;
        let addr = unsafe {
            lib.get::<*const c_void>(symbol.as_bytes())
                .map(|sym| *sym as usize)
        }
        .map_err(|err| FfiError::SymbolNotFound {
            library: library.to_string(),
            symbol: symbol.to_string(),
            reason: err.to_string(),
        })?;

        debug!(library, symbol, addr = format_args!("{addr:#x}"), "resolved symbol");
        self.symbols.insert(key, addr);
        Ok(addr)
    }

    /// Number of opened libraries.
    pub fn loaded_libraries(&self) -> usize {
        self.libraries.len()
    }

    /// Close every library and forget every resolved symbol.
    pub fn release(&mut self) {
        self.symbols.clear();
        self.libraries.clear();
    }

    /// Call the function described by `decl` with `args`.
    ///
    /// An argument count mismatch is reported before the symbol is
    /// resolved, so the native function is never invoked with the wrong
    /// number of arguments.
    pub fn invoke(&mut self, decl: &List, args: &[Value]) -> Result<Value, FfiError> {
        let decl = ForeignDecl::from_list(decl)?;

        let ret = self.types.resolve(decl.ret)?.clone();
        if !ret.is_passable() {
            return Err(FfiError::UnsupportedType(ret.name));
        }
        let params = decl
            .params
            .iter()
            .map(|p| self.types.resolve(p).cloned())
            .collect::<Result<Vec<_>, _>>()?;

        let marshaled = Marshaled::encode(&params, args)?;
        let addr = self.symbol(decl.library, decl.symbol)?;

        debug!(
            library = decl.library,
            symbol = decl.symbol,
            args = args.len(),
            "foreign call"
        );
        // SAFETY: the declaration is the caller's statement of the native
        // signature; arguments were checked against it above.
        unsafe { marshal::call(addr, &params, &ret, &marshaled) }
    }
}

fn open_library(name: &str) -> Result<Library, FfiError> {
    if name.is_empty() {
        return this_process();
    }

    let mut candidates = vec![name.to_string()];
    if !name.contains(std::path::MAIN_SEPARATOR) && !name.contains('.') {
        candidates.push(format!(
            "{}{}{}",
            std::env::consts::DLL_PREFIX,
            name,
            std::env::consts::DLL_SUFFIX
        ));
        candidates.push(format!("{}{}", name, std::env::consts::DLL_SUFFIX));
    }

    let mut reason = String::new();
    for candidate in &candidates {
        match unsafe { Library::new(candidate) } {
            Ok(lib) => return Ok(lib),
            Err(err) => reason = err.to_string(),
        }
    }
    Err(FfiError::LibraryNotFound {
        name: name.to_string(),
        reason,
    })
}

#[cfg(unix)]
fn this_process() -> Result<Library, FfiError> {
    Ok(libloading::os::unix::Library::this().into())
}

#[cfg(windows)]
fn this_process() -> Result<Library, FfiError> {
    libloading::os::windows::Library::this()
        .map(Into::into)
        .map_err(|err| FfiError::LibraryNotFound {
            name: String::new(),
            reason: err.to_string(),
        })
}

impl std::fmt::Debug for FfiRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfiRegistry")
            .field("libraries", &self.libraries.keys().collect::<Vec<_>>())
            .field("symbols", &self.symbols.len())
            .field("types", &self.types.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    extern "C" fn add(a: i32, b: i32) -> i32 {
        a + b
    }

    fn add_decl() -> List {
        let Value::List(list) = declare(
            "host",
            "add",
            Value::symbol("int32"),
            vec![Value::symbol("int32"), Value::symbol("int32")],
        ) else {
            unreachable!()
        };
        list
    }

    #[test]
    fn test_declaration_shape() {
        let decl = add_decl();
        assert!(decl.is_foreign());
        let view = ForeignDecl::from_list(&decl).unwrap();
        assert_eq!(view.library, "host");
        assert_eq!(view.symbol, "add");
        assert_eq!(view.params.len(), 2);
    }

    #[test]
    fn test_malformed_declaration() {
        let list = List::from(vec![Value::Int(1)]);
        assert!(matches!(
            ForeignDecl::from_list(&list),
            Err(FfiError::Declaration(_))
        ));
    }

    #[test]
    fn test_invoke_preloaded() {
        let mut ffi = FfiRegistry::new();
        ffi.preload("host", "add", add as usize);
        let result = ffi.invoke(&add_decl(), &[Value::Int(2), Value::Int(3)]).unwrap();
        assert_eq!(result, Value::Int(5));
    }

    #[test]
    fn test_count_checked_before_resolution() {
        // Nothing preloaded: a resolution attempt would fail differently.
        let mut ffi = FfiRegistry::new();
        let err = ffi.invoke(&add_decl(), &[Value::Int(2)]).unwrap_err();
        assert_eq!(err, FfiError::ArgumentCount { expected: 2, got: 1 });
        assert_eq!(ffi.loaded_libraries(), 0);
    }

    #[test]
    fn test_missing_library() {
        let mut ffi = FfiRegistry::new();
        let err = ffi.symbol("csl-no-such-library", "f").unwrap_err();
        assert!(matches!(err, FfiError::LibraryNotFound { .. }));
    }

    #[test]
    fn test_release_forgets_symbols() {
        let mut ffi = FfiRegistry::new();
        ffi.preload("host", "add", add as usize);
        ffi.release();
        assert!(ffi.symbol("host", "add").is_err());
    }
}
