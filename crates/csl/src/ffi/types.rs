//! The native type table

use std::ffi::{c_char, c_int, c_long, c_longlong, c_short, c_void};
use std::mem::{align_of, size_of};

use indexmap::IndexMap;
use libffi::middle::Type;

use super::layout::StructLayout;
use crate::error::FfiError;
use crate::value::Value;

/// The numeric class of a native type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    /// No value (return type only)
    Void,
    /// Two's complement integer
    Signed,
    /// Unsigned integer
    Unsigned,
    /// IEEE single or double precision
    Float,
    /// Machine address
    Pointer,
    /// Aggregate described by a [`StructLayout`]
    Struct,
}

/// One entry of the type table.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeType {
    /// Position in the table
    pub id: usize,
    /// Name used in declarations
    pub name: String,
    /// Numeric class
    pub kind: NativeKind,
    /// Size in bytes
    pub size: usize,
    /// Alignment in bytes
    pub align: usize,
    /// Field layout, for struct types
    pub layout: Option<StructLayout>,
}

impl NativeType {
    fn scalar<T>(name: &str, kind: NativeKind) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            kind,
            size: size_of::<T>(),
            align: align_of::<T>(),
            layout: None,
        }
    }

    /// The `[id, size, align]` descriptor.
    pub fn descriptor(&self) -> Value {
        Value::list(vec![
            Value::Int(self.id as i64),
            Value::Int(self.size as i64),
            Value::Int(self.align as i64),
        ])
    }

    /// Whether values of this type can be passed to or returned from a
    /// foreign function.
    pub fn is_passable(&self) -> bool {
        self.kind != NativeKind::Struct
    }

    /// The libffi type for this native type.
    pub(crate) fn ffi_type(&self) -> Result<Type, FfiError> {
        Ok(match (self.kind, self.size) {
            (NativeKind::Void, _) => Type::void(),
            (NativeKind::Signed, 1) => Type::i8(),
            (NativeKind::Signed, 2) => Type::i16(),
            (NativeKind::Signed, 4) => Type::i32(),
            (NativeKind::Signed, 8) => Type::i64(),
            (NativeKind::Unsigned, 1) => Type::u8(),
            (NativeKind::Unsigned, 2) => Type::u16(),
            (NativeKind::Unsigned, 4) => Type::u32(),
            (NativeKind::Unsigned, 8) => Type::u64(),
            (NativeKind::Float, 4) => Type::f32(),
            (NativeKind::Float, 8) => Type::f64(),
            (NativeKind::Pointer, _) => Type::pointer(),
            _ => return Err(FfiError::UnsupportedType(self.name.clone())),
        })
    }
}

/// Name → native type, insertion ordered so ids are positions.
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: IndexMap<String, NativeType>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl TypeTable {
    /// The built-in scalar types with this platform's sizes.
    pub fn standard() -> Self {
        let char_kind = if c_char::MIN == 0 {
            NativeKind::Unsigned
        } else {
            NativeKind::Signed
        };

        let mut table = Self {
            types: IndexMap::new(),
        };
        for ty in [
            NativeType::scalar::<i8>("int8", NativeKind::Signed),
            NativeType::scalar::<u8>("uint8", NativeKind::Unsigned),
            NativeType::scalar::<i16>("int16", NativeKind::Signed),
            NativeType::scalar::<u16>("uint16", NativeKind::Unsigned),
            NativeType::scalar::<i32>("int32", NativeKind::Signed),
            NativeType::scalar::<u32>("uint32", NativeKind::Unsigned),
            NativeType::scalar::<i64>("int64", NativeKind::Signed),
            NativeType::scalar::<u64>("uint64", NativeKind::Unsigned),
            NativeType::scalar::<f32>("float", NativeKind::Float),
            NativeType::scalar::<f64>("double", NativeKind::Float),
            NativeType::scalar::<usize>("size_t", NativeKind::Unsigned),
            NativeType::scalar::<c_char>("char", char_kind),
            NativeType::scalar::<c_char>("uchar", NativeKind::Unsigned),
            NativeType::scalar::<c_short>("short", NativeKind::Signed),
            NativeType::scalar::<c_short>("ushort", NativeKind::Unsigned),
            NativeType::scalar::<c_int>("int", NativeKind::Signed),
            NativeType::scalar::<c_int>("uint", NativeKind::Unsigned),
            NativeType::scalar::<c_long>("long", NativeKind::Signed),
            NativeType::scalar::<c_long>("ulong", NativeKind::Unsigned),
            NativeType::scalar::<c_longlong>("longlong", NativeKind::Signed),
            NativeType::scalar::<c_longlong>("ulonglong", NativeKind::Unsigned),
            NativeType::scalar::<*const c_void>("pointer", NativeKind::Pointer),
            NativeType {
                size: 0,
                align: 1,
                ..NativeType::scalar::<()>("void", NativeKind::Void)
            },
        ] {
            table.insert(ty);
        }
        table
    }

    fn insert(&mut self, mut ty: NativeType) -> &NativeType {
        ty.id = self
            .types
            .get_index_of(&ty.name)
            .unwrap_or(self.types.len());
        let name = ty.name.clone();
        self.types.insert(name.clone(), ty);
        &self.types[&name]
    }

    /// Look a type up by name.
    pub fn get(&self, name: &str) -> Result<&NativeType, FfiError> {
        self.types
            .get(name)
            .ok_or_else(|| FfiError::UnknownType(name.to_string()))
    }

    /// Look a type up by a symbol or string value.
    pub fn resolve(&self, value: &Value) -> Result<&NativeType, FfiError> {
        match value.as_name() {
            Some(name) => self.get(name),
            None => Err(FfiError::UnknownType(value.to_string())),
        }
    }

    /// Register (or replace) a struct type named `name` with the given
    /// field types.
    ///
    /// Each field is a type name, or `(type count)` for an array field.
    pub fn define_struct(&mut self, name: &str, fields: &[Value]) -> Result<&NativeType, FfiError> {
        if self.types.get(name).is_some_and(|t| t.kind != NativeKind::Struct) {
            return Err(FfiError::UnsupportedType(name.to_string()));
        }
        let layout = self.layout_of(fields)?;
        Ok(self.insert(NativeType {
            id: 0,
            name: name.to_string(),
            kind: NativeKind::Struct,
            size: layout.size(),
            align: layout.align(),
            layout: Some(layout),
        }))
    }

    /// Compute the layout of an anonymous field list.
    pub fn layout_of(&self, fields: &[Value]) -> Result<StructLayout, FfiError> {
        let mut slots = Vec::with_capacity(fields.len());
        for (index, field) in fields.iter().enumerate() {
            let (ty, count) = match field {
                Value::List(parts) if parts.get(0).is_some_and(Value::is_numeric) => {
                    (self.from_descriptor(parts.as_slice())?, 1)
                }
                Value::List(parts) => {
                    let ty = parts
                        .get(0)
                        .ok_or_else(|| FfiError::Declaration(format!("field {index}: empty array field")))?;
                    let count = parts
                        .get(1)
                        .and_then(Value::as_int)
                        .filter(|n| *n > 0)
                        .ok_or_else(|| {
                            FfiError::Declaration(format!("field {index}: array count must be a positive int"))
                        })?;
                    (self.resolve(ty)?, count as usize)
                }
                other => (self.resolve(other)?, 1),
            };
            if ty.kind == NativeKind::Void {
                return Err(FfiError::UnsupportedType(ty.name.clone()));
            }
            slots.push((ty.clone(), count));
        }
        StructLayout::compute(slots)
    }

    /// Look a type up by its `[id size align]` descriptor. The size and
    /// alignment must match the registered type.
    pub fn from_descriptor(&self, descriptor: &[Value]) -> Result<&NativeType, FfiError> {
        let text = || Value::list(descriptor.to_vec()).to_string();
        let [id, size, align] = descriptor else {
            return Err(FfiError::UnknownType(text()));
        };
        let ty = id
            .as_int()
            .and_then(|id| usize::try_from(id).ok())
            .and_then(|id| self.types.get_index(id))
            .map(|(_, ty)| ty)
            .ok_or_else(|| FfiError::UnknownType(text()))?;
        if size.as_int() != Some(ty.size as i64) || align.as_int() != Some(ty.align as i64) {
            return Err(FfiError::UnknownType(text()));
        }
        Ok(ty)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Types in id order.
    pub fn iter(&self) -> impl Iterator<Item = &NativeType> {
        self.types.values()
    }
}
