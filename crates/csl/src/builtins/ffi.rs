//! FFI builtins: `ffi defstruct struct sizeof alignof offsetof buffer`

use super::{arg, ffi_fault, index_arg, list_arg, name_arg};
use crate::environment::Scope;
use crate::eval::{CallResult, Fault, Unwind};
use crate::ffi::{declare, zeroed, NativeKind, StructLayout};
use crate::runtime::Runtime;
use crate::value::Value;

/// `(ffi "lib" "symbol" 'ret '(param-types…))` returns a callable foreign
/// declaration. Type names are checked now; the library is opened on the
/// first call.
pub fn ffi(rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let library = name_arg("ffi", args, 0)?;
    let symbol = name_arg("ffi", args, 1)?;
    let params = list_arg("ffi", args, 3)?;

    let types = rt.ffi.types();
    let ret = types.resolve(&args[2]).map_err(|e| ffi_fault(e, args))?;
    if !ret.is_passable() {
        return Err(Fault::bad_param(
            format!("`ffi`: `{}` cannot be returned by value", ret.name),
            &args[2..3],
        )
        .into());
    }
    for param in &params {
        let ty = types.resolve(param).map_err(|e| ffi_fault(e, args))?;
        if matches!(ty.kind, NativeKind::Void | NativeKind::Struct) {
            return Err(Fault::bad_param(
                format!("`ffi`: `{}` cannot be passed by value", ty.name),
                std::slice::from_ref(param),
            )
            .into());
        }
    }

    Ok(declare(
        library,
        symbol,
        args[2].clone(),
        params.into_items(),
    ))
}

/// `(defstruct 'name '(field-types…))` registers a struct type and returns
/// its `[id size align]` descriptor.
pub fn defstruct(rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let name = name_arg("defstruct", args, 0)?;
    let fields = list_arg("defstruct", args, 1)?;
    let ty = rt
        .ffi
        .types_mut()
        .define_struct(name, fields.as_slice())
        .map_err(|e| ffi_fault(e, args))?;
    Ok(ty.descriptor())
}

/// `(struct 'name values…)` or `(struct '(field-types…) values…)` packs the
/// values into a buffer laid out like the C struct.
pub fn pack(rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let layout = layout_of(rt, "struct", args)?;
    let bytes = layout.pack(&args[1..]).map_err(|e| ffi_fault(e, args))?;
    Ok(Value::Buffer(bytes))
}

/// `(sizeof type)`
pub fn sizeof(rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let size = match &args[0] {
        Value::List(_) => layout_of(rt, "sizeof", args)?.size(),
        other => rt.ffi.types().resolve(other).map_err(|e| ffi_fault(e, args))?.size,
    };
    Ok(Value::Int(size as i64))
}

/// `(alignof type)`
pub fn alignof(rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let align = match &args[0] {
        Value::List(_) => layout_of(rt, "alignof", args)?.align(),
        other => rt.ffi.types().resolve(other).map_err(|e| ffi_fault(e, args))?.align,
    };
    Ok(Value::Int(align as i64))
}

/// `(offsetof struct field-index)`
pub fn offsetof(rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    let layout = layout_of(rt, "offsetof", args)?;
    let index = index_arg("offsetof", args, 1)?;
    match layout.fields().get(index) {
        Some(field) => Ok(Value::Int(field.offset as i64)),
        None => Err(Fault::bad_param(
            format!("`offsetof`: no field {} in a {}-field struct", index, layout.fields().len()),
            args,
        )
        .into()),
    }
}

/// `(buffer size)` is a zeroed buffer; `(buffer "text")` copies the bytes.
pub fn buffer(_rt: &mut Runtime, _scope: &Scope, args: &[Value]) -> CallResult {
    match arg("buffer", args, 0)? {
        Value::Int(n) if *n >= 0 => {
            let size = usize::try_from(*n).unwrap_or(usize::MAX);
            let bytes = zeroed(size).map_err(|e| ffi_fault(e, args))?;
            Ok(Value::Buffer(bytes))
        }
        Value::String(s) => Ok(Value::Buffer(s.as_bytes().to_vec())),
        Value::Buffer(b) => Ok(Value::Buffer(b.clone())),
        other => Err(Fault::bad_param(
            "`buffer`: expected a size or a string",
            std::slice::from_ref(other),
        )
        .into()),
    }
}

/// The layout named by (or listed in) the first argument.
fn layout_of(rt: &Runtime, callee: &str, args: &[Value]) -> Result<StructLayout, Unwind> {
    let types = rt.ffi.types();
    match arg(callee, args, 0)? {
        Value::List(fields) => types
            .layout_of(fields.as_slice())
            .map_err(|e| ffi_fault(e, args)),
        other => {
            let ty = types.resolve(other).map_err(|e| ffi_fault(e, args))?;
            ty.layout.clone().ok_or_else(|| {
                Fault::bad_param(
                    format!("`{}`: `{}` is not a struct type", callee, ty.name),
                    std::slice::from_ref(other),
                )
                .into()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_struct_layout_queries() {
        let mut rt = Runtime::new();
        rt.eval_str("(defstruct 'pair '(int8 int64))").unwrap();
        assert_eq!(rt.eval_str("(sizeof 'pair)").unwrap(), Value::Int(16));
        assert_eq!(rt.eval_str("(alignof 'pair)").unwrap(), Value::Int(8));
        assert_eq!(rt.eval_str("(offsetof 'pair 1)").unwrap(), Value::Int(8));
        assert_eq!(rt.eval_str("(sizeof '(int8 (uint8 3)))").unwrap(), Value::Int(4));
        assert_eq!(rt.eval_str("(sizeof 'int16)").unwrap(), Value::Int(2));
    }

    #[test]
    fn test_pack_struct() {
        let mut rt = Runtime::new();
        rt.eval_str("(defstruct 'p '(uint8 uint16))").unwrap();
        let v = rt.eval_str("(struct 'p 1 2)").unwrap();
        let mut expected = vec![1, 0];
        expected.extend(2u16.to_ne_bytes());
        assert_eq!(v, Value::Buffer(expected));
    }

    #[test]
    fn test_declaration_is_foreign() {
        let mut rt = Runtime::new();
        let decl = rt
            .eval_str("(ffi \"m\" \"cos\" 'double '(double))")
            .unwrap();
        assert!(decl.is_foreign());
        assert_eq!(decl.index(1), Some(&Value::string("cos")));
    }

    #[test]
    fn test_buffer() {
        let mut rt = Runtime::new();
        assert_eq!(rt.eval_str("(buffer 3)").unwrap(), Value::Buffer(vec![0; 3]));
        assert_eq!(rt.eval_str("(length (buffer \"ab\"))").unwrap(), Value::Int(2));
    }
}
