//! Native struct layout and packing

use super::marshal;
use super::types::{NativeKind, NativeType};
use crate::error::FfiError;
use crate::value::Value;

/// Round `offset` up to the next multiple of `align`, or `None` if the
/// result does not fit in a `usize`.
pub fn align_up(offset: usize, align: usize) -> Option<usize> {
    if align <= 1 {
        Some(offset)
    } else {
        offset.div_ceil(align).checked_mul(align)
    }
}

/// Largest native object the runtime will allocate.
pub const MAX_OBJECT_SIZE: usize = isize::MAX as usize;

/// A zeroed byte buffer of `size` bytes, failing instead of aborting when
/// the allocation cannot be made.
pub fn zeroed(size: usize) -> Result<Vec<u8>, FfiError> {
    if size > MAX_OBJECT_SIZE {
        return Err(FfiError::TooLarge(size));
    }
    let mut buf = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|_| FfiError::TooLarge(size))?;
    buf.resize(size, 0);
    Ok(buf)
}

/// One placed field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    /// Element type
    pub ty: NativeType,
    /// Number of elements (1 for scalars)
    pub count: usize,
    /// Byte offset from the start of the struct
    pub offset: usize,
}

impl FieldLayout {
    /// Total bytes occupied by the field.
    pub fn size(&self) -> usize {
        // `StructLayout::compute` only places fields whose size fits.
        self.ty.size.saturating_mul(self.count)
    }
}

/// C-compatible placement of an ordered field list.
///
/// Each field is placed at the running offset rounded up to its
/// alignment; the total size is padded to the largest field alignment so
/// arrays of the struct stay aligned, matching `sizeof` in C.
///
/// # Example
///
/// ```
/// use csl::StructLayout;
///
/// let layout = StructLayout::from_descriptors(&[(1, 1), (8, 8)])?;
/// assert_eq!(layout.offsets(), vec![0, 8]);
/// assert_eq!(layout.size(), 16);
/// # Ok::<(), csl::FfiError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructLayout {
    fields: Vec<FieldLayout>,
    size: usize,
    align: usize,
}

impl StructLayout {
    /// Place `(type, element count)` pairs in order.
    ///
    /// Fails with [`FfiError::Field`] when a field or the padded total
    /// would exceed [`MAX_OBJECT_SIZE`].
    pub fn compute(slots: Vec<(NativeType, usize)>) -> Result<Self, FfiError> {
        let mut offset = 0usize;
        let mut max_align = 1;
        let mut fields = Vec::with_capacity(slots.len());

        for (index, (ty, count)) in slots.into_iter().enumerate() {
            let too_large = |ty: &NativeType| FfiError::Field {
                index,
                reason: format!("{count} `{}` elements exceed the largest native object", ty.name),
            };
            let align = ty.align.max(1);
            max_align = max_align.max(align);
            let end = align_up(offset, align).and_then(|start| {
                ty.size
                    .checked_mul(count)
                    .and_then(|size| start.checked_add(size))
                    .map(|end| (start, end))
            });
            let Some((start, end)) = end.filter(|(_, end)| *end <= MAX_OBJECT_SIZE) else {
                return Err(too_large(&ty));
            };
            fields.push(FieldLayout { ty, count, offset: start });
            offset = end;
        }

        let size = align_up(offset, max_align)
            .filter(|size| *size <= MAX_OBJECT_SIZE)
            .ok_or_else(|| FfiError::Field {
                index: fields.len().saturating_sub(1),
                reason: format!("padding {offset} bytes exceeds the largest native object"),
            })?;

        Ok(Self {
            fields,
            size,
            align: max_align,
        })
    }

    /// Place anonymous fields given as `(size, align)` pairs. Every field
    /// is treated as an opaque block of bytes.
    pub fn from_descriptors(descriptors: &[(usize, usize)]) -> Result<Self, FfiError> {
        let slots = descriptors
            .iter()
            .map(|&(size, align)| {
                let ty = NativeType {
                    id: usize::MAX,
                    name: format!("bytes{size}"),
                    kind: NativeKind::Struct,
                    size,
                    align,
                    layout: None,
                };
                (ty, 1)
            })
            .collect();
        Self::compute(slots)
    }

    /// Total size including tail padding.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Largest field alignment (1 for an empty struct).
    pub fn align(&self) -> usize {
        self.align
    }

    /// The placed fields.
    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    /// Field offsets in declaration order.
    pub fn offsets(&self) -> Vec<usize> {
        self.fields.iter().map(|f| f.offset).collect()
    }

    /// Copy each value's native bytes to its field's offset in a fresh
    /// zeroed buffer of [`size`](Self::size) bytes.
    ///
    /// Missing trailing values leave their fields zeroed.
    pub fn pack(&self, values: &[Value]) -> Result<Vec<u8>, FfiError> {
        if values.len() > self.fields.len() {
            return Err(FfiError::Field {
                index: self.fields.len(),
                reason: format!(
                    "{} values for {} fields",
                    values.len(),
                    self.fields.len()
                ),
            });
        }

        let mut buf = zeroed(self.size)?;
        for (index, (field, value)) in self.fields.iter().zip(values).enumerate() {
            let slot = buf
                .get_mut(field.offset..field.offset + field.size())
                .ok_or_else(|| FfiError::Field {
                    index,
                    reason: "field lies outside the struct".to_string(),
                })?;
            fill_field(field, value, slot).map_err(|reason| FfiError::Field { index, reason })?;
        }
        Ok(buf)
    }
}

/// Write `value` into the zeroed bytes of one field.
fn fill_field(field: &FieldLayout, value: &Value, slot: &mut [u8]) -> Result<(), String> {
    if field.count > 1 {
        return match value {
            Value::List(items) if items.len() <= field.count => {
                for (item, dest) in items.iter().zip(slot.chunks_exact_mut(field.ty.size.max(1))) {
                    blob(&element_bytes(&field.ty, item)?, dest)?;
                }
                Ok(())
            }
            Value::Buffer(bytes) => blob(bytes, slot),
            Value::String(s) => blob(s.as_bytes(), slot),
            other => Err(format!(
                "cannot store {} in a {}-element `{}` array",
                other.type_name(),
                field.count,
                field.ty.name
            )),
        };
    }

    blob(&element_bytes(&field.ty, value)?, slot)
}

fn element_bytes(ty: &NativeType, value: &Value) -> Result<Vec<u8>, String> {
    match ty.kind {
        NativeKind::Struct => match value {
            Value::Buffer(bytes) if bytes.len() == ty.size => Ok(bytes.clone()),
            other => Err(format!(
                "expected a {}-byte `{}` buffer, got {}",
                ty.size,
                ty.name,
                other.type_name()
            )),
        },
        NativeKind::Pointer => match value {
            Value::Nil => Ok(0usize.to_ne_bytes().to_vec()),
            Value::Ffi(ptr) => Ok(ptr.addr().to_ne_bytes().to_vec()),
            other => Err(format!("cannot store {} in a pointer field", other.type_name())),
        },
        _ => marshal::scalar_bytes(ty, value).ok_or_else(|| {
            format!("{} does not fit `{}`", value, ty.name)
        }),
    }
}

fn blob(bytes: &[u8], slot: &mut [u8]) -> Result<(), String> {
    if bytes.len() > slot.len() {
        return Err(format!("{} bytes do not fit in {}", bytes.len(), slot.len()));
    }
    slot[..bytes.len()].copy_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::types::TypeTable;
    use pretty_assertions::assert_eq;

    fn layout(names: &[&str]) -> StructLayout {
        let fields: Vec<Value> = names.iter().map(|n| Value::symbol(*n)).collect();
        TypeTable::standard().layout_of(&fields).unwrap()
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 8), Some(0));
        assert_eq!(align_up(1, 8), Some(8));
        assert_eq!(align_up(9, 4), Some(12));
        assert_eq!(align_up(5, 1), Some(5));
        assert_eq!(align_up(5, 0), Some(5));
        assert_eq!(align_up(usize::MAX, 8), None);
    }

    #[test]
    fn test_byte_then_quad() {
        let layout = StructLayout::from_descriptors(&[(1, 1), (8, 8)]).unwrap();
        assert_eq!(layout.offsets(), vec![0, 8]);
        assert_eq!(layout.size(), 16);
        assert_eq!(layout.align(), 8);
    }

    #[test]
    fn test_oversized_fields_are_rejected() {
        let table = TypeTable::standard();
        let array = |count: i64| Value::list(vec![Value::symbol("int64"), Value::Int(count)]);

        // The element count alone overflows.
        let err = table.layout_of(&[array(1 << 61)]).unwrap_err();
        assert!(matches!(err, FfiError::Field { index: 0, .. }));

        // The field fits, but not after the one before it.
        let err = table
            .layout_of(&[Value::symbol("int8"), array((1 << 61) - 1)])
            .unwrap_err();
        assert!(matches!(err, FfiError::Field { index: 1, .. }));

        let err = StructLayout::from_descriptors(&[(1, 1), (usize::MAX, 1)]).unwrap_err();
        assert!(matches!(err, FfiError::Field { index: 1, .. }));
    }

    #[test]
    fn test_zeroed_refuses_huge_sizes() {
        assert_eq!(zeroed(3).unwrap(), vec![0, 0, 0]);
        assert!(matches!(zeroed(usize::MAX), Err(FfiError::TooLarge(_))));
    }

    #[test]
    fn test_interleaved_bytes() {
        let table = TypeTable::standard();
        let fields = vec![
            Value::symbol("int8"),
            Value::symbol("int16"),
            Value::symbol("int8"),
            Value::symbol("int32"),
            Value::symbol("int8"),
            Value::symbol("int64"),
            Value::list(vec![Value::symbol("uint8"), Value::Int(7)]),
            Value::symbol("int32"),
        ];
        let layout = table.layout_of(&fields).unwrap();
        assert_eq!(layout.offsets(), vec![0, 2, 4, 8, 12, 16, 24, 32]);
        assert_eq!(layout.size(), 40);
    }

    #[test]
    fn test_empty_struct() {
        let layout = StructLayout::compute(Vec::new()).unwrap();
        assert_eq!(layout.size(), 0);
        assert_eq!(layout.align(), 1);
    }

    #[test]
    fn test_pack_places_fields() {
        let layout = layout(&["int8", "int32"]);
        let buf = layout.pack(&[Value::Int(-1), Value::Int(0x01020304)]).unwrap();
        let mut expected = vec![0xff, 0, 0, 0];
        expected.extend(0x01020304i32.to_ne_bytes());
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_pack_partial_and_array() {
        let table = TypeTable::standard();
        let fields = vec![
            Value::list(vec![Value::symbol("uint8"), Value::Int(4)]),
            Value::symbol("double"),
        ];
        let layout = table.layout_of(&fields).unwrap();
        let buf = layout.pack(&[Value::string("ab")]).unwrap();
        assert_eq!(buf.len(), 16);
        assert_eq!(&buf[..4], b"ab\0\0");
        assert!(buf[8..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_pack_rejects_overflowing_value() {
        let layout = layout(&["int8"]);
        let err = layout.pack(&[Value::Int(300)]).unwrap_err();
        assert!(matches!(err, FfiError::Field { index: 0, .. }));
    }

    #[test]
    fn test_pack_rejects_extra_values() {
        let layout = layout(&["int8"]);
        assert!(layout.pack(&[Value::Int(1), Value::Int(2)]).is_err());
    }
}
