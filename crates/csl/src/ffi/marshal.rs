//! Value ↔ native cell conversion and the libffi call

use std::ffi::c_void;

use libffi::middle::{Arg, Cif, CodePtr};

use super::types::{NativeKind, NativeType};
use crate::error::FfiError;
use crate::value::Value;

// ═══════════════════════════════════════════════════════════════════
// Natural sizes
// ═══════════════════════════════════════════════════════════════════

/// Narrowest of 1, 2, 4, 8 bytes holding `n` in either the signed or the
/// unsigned range of that width.
pub fn natural_int_size(n: i64) -> usize {
    let fits = |bits: u32| {
        let min = -(1i128 << (bits - 1));
        let max = (1i128 << bits) - 1;
        (min..=max).contains(&(n as i128))
    };
    [1u32, 2, 4]
        .into_iter()
        .find(|bytes| fits(bytes * 8))
        .map(|bytes| bytes as usize)
        .unwrap_or(8)
}

/// 4 when `x` survives a round trip through `f32`, else 8.
pub fn natural_float_size(x: f64) -> usize {
    if x.is_nan() || (x as f32) as f64 == x {
        4
    } else {
        8
    }
}

// ═══════════════════════════════════════════════════════════════════
// Native cells
// ═══════════════════════════════════════════════════════════════════

/// A value promoted to the exact width of its declared native type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum NativeCell {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Ptr(*const c_void),
}

impl NativeCell {
    /// Promote a numeric value into a cell of type `ty`, or `None` when the
    /// value's class or natural size does not fit.
    pub(crate) fn scalar(ty: &NativeType, value: &Value) -> Option<Self> {
        match (ty.kind, value) {
            (NativeKind::Float, Value::Int(n)) => Self::float(ty.size, *n as f64),
            (NativeKind::Float, Value::Float(x)) if natural_float_size(*x) <= ty.size => {
                Self::float(ty.size, *x)
            }
            (NativeKind::Signed, Value::Int(n)) if natural_int_size(*n) <= ty.size => {
                let n = *n;
                Some(match ty.size {
                    1 => NativeCell::I8(n as i8),
                    2 => NativeCell::I16(n as i16),
                    4 => NativeCell::I32(n as i32),
                    8 => NativeCell::I64(n),
                    _ => return None,
                })
            }
            (NativeKind::Unsigned, Value::Int(n)) if natural_int_size(*n) <= ty.size => {
                let n = *n;
                Some(match ty.size {
                    1 => NativeCell::U8(n as u8),
                    2 => NativeCell::U16(n as u16),
                    4 => NativeCell::U32(n as u32),
                    8 => NativeCell::U64(n as u64),
                    _ => return None,
                })
            }
            _ => None,
        }
    }

    fn float(size: usize, x: f64) -> Option<Self> {
        match size {
            4 => Some(NativeCell::F32(x as f32)),
            8 => Some(NativeCell::F64(x)),
            _ => None,
        }
    }

    /// The cell's bytes in native order.
    pub(crate) fn to_ne_bytes(self) -> Vec<u8> {
        match self {
            NativeCell::I8(v) => v.to_ne_bytes().to_vec(),
            NativeCell::I16(v) => v.to_ne_bytes().to_vec(),
            NativeCell::I32(v) => v.to_ne_bytes().to_vec(),
            NativeCell::I64(v) => v.to_ne_bytes().to_vec(),
            NativeCell::U8(v) => v.to_ne_bytes().to_vec(),
            NativeCell::U16(v) => v.to_ne_bytes().to_vec(),
            NativeCell::U32(v) => v.to_ne_bytes().to_vec(),
            NativeCell::U64(v) => v.to_ne_bytes().to_vec(),
            NativeCell::F32(v) => v.to_ne_bytes().to_vec(),
            NativeCell::F64(v) => v.to_ne_bytes().to_vec(),
            NativeCell::Ptr(p) => (p as usize).to_ne_bytes().to_vec(),
        }
    }

    fn as_arg(&self) -> Arg {
        match self {
            NativeCell::I8(v) => Arg::new(v),
            NativeCell::I16(v) => Arg::new(v),
            NativeCell::I32(v) => Arg::new(v),
            NativeCell::I64(v) => Arg::new(v),
            NativeCell::U8(v) => Arg::new(v),
            NativeCell::U16(v) => Arg::new(v),
            NativeCell::U32(v) => Arg::new(v),
            NativeCell::U64(v) => Arg::new(v),
            NativeCell::F32(v) => Arg::new(v),
            NativeCell::F64(v) => Arg::new(v),
            NativeCell::Ptr(v) => Arg::new(v),
        }
    }
}

/// Native bytes of a numeric value stored in a field of type `ty`.
pub(crate) fn scalar_bytes(ty: &NativeType, value: &Value) -> Option<Vec<u8>> {
    NativeCell::scalar(ty, value).map(NativeCell::to_ne_bytes)
}

// ═══════════════════════════════════════════════════════════════════
// Argument marshaling
// ═══════════════════════════════════════════════════════════════════

/// Check that `value` may be passed where `ty` is declared.
pub fn check_compatible(index: usize, ty: &NativeType, value: &Value) -> Result<(), FfiError> {
    let ok = match ty.kind {
        NativeKind::Void | NativeKind::Struct => {
            return Err(FfiError::UnsupportedType(ty.name.clone()))
        }
        NativeKind::Pointer => matches!(
            value,
            Value::String(_) | Value::Buffer(_) | Value::Ffi(_) | Value::Nil
        ),
        _ => NativeCell::scalar(ty, value).is_some(),
    };

    if ok {
        Ok(())
    } else {
        Err(FfiError::Incompatible {
            index,
            expected: ty.name.clone(),
            got: describe(value),
        })
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Int(n) => format!("int {n} ({} bytes)", natural_int_size(*n)),
        Value::Float(x) => format!("float {x} ({} bytes)", natural_float_size(*x)),
        other => other.type_name().to_string(),
    }
}

/// Promoted arguments plus the buffers their pointer cells point into.
///
/// The buffers live as long as this value, so the cells stay valid for
/// the duration of the call.
pub(crate) struct Marshaled {
    cells: Vec<NativeCell>,
    // Pointees of `Ptr` cells; never read, only kept alive.
    #[allow(dead_code)]
    pointees: Vec<Box<[u8]>>,
}

impl Marshaled {
    /// Check and promote every argument against its declared type.
    pub(crate) fn encode(params: &[NativeType], args: &[Value]) -> Result<Self, FfiError> {
        if params.len() != args.len() {
            return Err(FfiError::ArgumentCount {
                expected: params.len(),
                got: args.len(),
            });
        }

        let mut cells = Vec::with_capacity(args.len());
        let mut pointees = Vec::new();

        for (index, (ty, value)) in params.iter().zip(args).enumerate() {
            check_compatible(index, ty, value)?;

            let cell = match value {
                Value::String(s) if ty.kind == NativeKind::Pointer => {
                    let mut bytes = s.as_bytes().to_vec();
                    bytes.push(0);
                    pointee(&mut pointees, bytes)
                }
                Value::Buffer(bytes) if ty.kind == NativeKind::Pointer => {
                    pointee(&mut pointees, bytes.clone())
                }
                Value::Ffi(ptr) => NativeCell::Ptr(ptr.as_ptr()),
                Value::Nil => NativeCell::Ptr(std::ptr::null()),
                other => NativeCell::scalar(ty, other).ok_or_else(|| FfiError::Incompatible {
                    index,
                    expected: ty.name.clone(),
                    got: describe(other),
                })?,
            };
            cells.push(cell);
        }

        Ok(Self { cells, pointees })
    }

    /// The cells, in order.
    #[cfg(test)]
    pub(crate) fn cells(&self) -> &[NativeCell] {
        &self.cells
    }

    fn args(&self) -> Vec<Arg> {
        self.cells.iter().map(NativeCell::as_arg).collect()
    }
}

fn pointee(pointees: &mut Vec<Box<[u8]>>, bytes: Vec<u8>) -> NativeCell {
    let boxed = bytes.into_boxed_slice();
    let cell = NativeCell::Ptr(boxed.as_ptr().cast());
    pointees.push(boxed);
    cell
}

// ═══════════════════════════════════════════════════════════════════
// Invocation
// ═══════════════════════════════════════════════════════════════════

/// Call the native function at `addr` with the marshaled arguments and
/// promote its return value.
///
/// # Safety
///
/// `addr` must be the address of a function whose C signature matches
/// `params` and `ret`.
pub(crate) unsafe fn call(
    addr: usize,
    params: &[NativeType],
    ret: &NativeType,
    args: &Marshaled,
) -> Result<Value, FfiError> {
    let arg_types = params
        .iter()
        .map(NativeType::ffi_type)
        .collect::<Result<Vec<_>, _>>()?;
    let cif = Cif::new(arg_types, ret.ffi_type()?);
    let code = CodePtr::from_ptr(addr as *const c_void);
    let ffi_args = args.args();

    // Integer returns are widened to a full register by libffi, so they
    // are read through a u64 slot and narrowed afterwards.
    let value = match (ret.kind, ret.size) {
        (NativeKind::Void, _) => {
            cif.call::<()>(code, &ffi_args);
            Value::Nil
        }
        (NativeKind::Float, 4) => Value::Float(cif.call::<f32>(code, &ffi_args) as f64),
        (NativeKind::Float, _) => Value::Float(cif.call::<f64>(code, &ffi_args)),
        (NativeKind::Pointer, _) => {
            Value::ffi(cif.call::<*const c_void>(code, &ffi_args) as usize)
        }
        (NativeKind::Signed, size) => {
            let raw = cif.call::<u64>(code, &ffi_args);
            Value::Int(narrow_signed(raw, size))
        }
        (NativeKind::Unsigned, size) => {
            let raw = cif.call::<u64>(code, &ffi_args);
            Value::Int(narrow_unsigned(raw, size))
        }
        (NativeKind::Struct, _) => return Err(FfiError::UnsupportedType(ret.name.clone())),
    };
    Ok(value)
}

fn narrow_signed(raw: u64, size: usize) -> i64 {
    match size {
        1 => raw as i8 as i64,
        2 => raw as i16 as i64,
        4 => raw as i32 as i64,
        _ => raw as i64,
    }
}

/// `uint64` values above `i64::MAX` keep their bit pattern.
fn narrow_unsigned(raw: u64, size: usize) -> i64 {
    match size {
        1 => raw as u8 as i64,
        2 => raw as u16 as i64,
        4 => raw as u32 as i64,
        _ => raw as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::types::TypeTable;
    use pretty_assertions::assert_eq;

    fn ty(name: &str) -> NativeType {
        TypeTable::standard().get(name).unwrap().clone()
    }

    #[test]
    fn test_natural_int_size() {
        assert_eq!(natural_int_size(0), 1);
        assert_eq!(natural_int_size(-128), 1);
        assert_eq!(natural_int_size(255), 1);
        assert_eq!(natural_int_size(256), 2);
        assert_eq!(natural_int_size(-129), 2);
        assert_eq!(natural_int_size(70_000), 4);
        assert_eq!(natural_int_size(1 << 40), 8);
        assert_eq!(natural_int_size(i64::MIN), 8);
    }

    #[test]
    fn test_natural_float_size() {
        assert_eq!(natural_float_size(0.5), 4);
        assert_eq!(natural_float_size(0.1), 8);
    }

    #[test]
    fn test_compatibility() {
        assert!(check_compatible(0, &ty("int32"), &Value::Int(7)).is_ok());
        assert!(check_compatible(0, &ty("int8"), &Value::Int(300)).is_err());
        assert!(check_compatible(0, &ty("double"), &Value::Int(3)).is_ok());
        assert!(check_compatible(0, &ty("int64"), &Value::Float(1.0)).is_err());
        assert!(check_compatible(0, &ty("float"), &Value::Float(0.1)).is_err());
        assert!(check_compatible(0, &ty("pointer"), &Value::string("s")).is_ok());
        assert!(check_compatible(0, &ty("pointer"), &Value::Nil).is_ok());
        assert!(check_compatible(0, &ty("pointer"), &Value::Int(0)).is_err());
        assert!(matches!(
            check_compatible(0, &ty("void"), &Value::Nil),
            Err(FfiError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_encode_promotes_to_declared_width() {
        let params = vec![ty("int16"), ty("uint8"), ty("double")];
        let args = [Value::Int(-2), Value::Int(255), Value::Int(4)];
        let marshaled = Marshaled::encode(&params, &args).unwrap();
        assert_eq!(
            marshaled.cells(),
            &[NativeCell::I16(-2), NativeCell::U8(255), NativeCell::F64(4.0)]
        );
    }

    #[test]
    fn test_encode_string_is_nul_terminated_copy() {
        let marshaled = Marshaled::encode(&[ty("pointer")], &[Value::string("hi")]).unwrap();
        let NativeCell::Ptr(p) = marshaled.cells()[0] else {
            panic!("expected a pointer cell");
        };
        let copied = unsafe { std::ffi::CStr::from_ptr(p.cast()) };
        assert_eq!(copied.to_str().unwrap(), "hi");
    }

    #[test]
    fn test_encode_count_mismatch() {
        let err = Marshaled::encode(&[ty("int")], &[]).err().unwrap();
        assert_eq!(err, FfiError::ArgumentCount { expected: 1, got: 0 });
    }

    #[test]
    fn test_narrowing() {
        assert_eq!(narrow_signed(0xff, 1), -1);
        assert_eq!(narrow_signed(0xffff_fffe, 4), -2);
        assert_eq!(narrow_unsigned(0x1ff, 1), 0xff);
    }

    extern "C" fn mul3(a: i32, b: i16, c: f64) -> f64 {
        a as f64 * b as f64 * c
    }

    #[test]
    fn test_call_through_cif() {
        let params = vec![ty("int32"), ty("int16"), ty("double")];
        let args = Marshaled::encode(&params, &[Value::Int(2), Value::Int(3), Value::Float(0.5)]).unwrap();
        let result = unsafe { call(mul3 as usize, &params, &ty("double"), &args) }.unwrap();
        assert_eq!(result, Value::Float(3.0));
    }
}
