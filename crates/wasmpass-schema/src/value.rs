//! Dynamic values produced by schema-driven decoding.

use serde::{Deserialize, Serialize};
use std::fmt;

use wasmpass_types::layout::TypeRef;
use wasmpass_types::{Error, Handle, LinearMemory, Result};

use crate::codec;
use crate::registry::Registry;

/// A guest value decoded without a generated Rust type.
///
/// Structs keep their fields in layout order.  Enums carry the raw integer
/// and the member name when it is canonical; unknown integers keep
/// `name: None` and encode back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Handle(Handle),
    Enum {
        #[serde(rename = "type")]
        ty: String,
        value: i64,
        name: Option<String>,
    },
    Struct {
        #[serde(rename = "type")]
        ty: String,
        fields: Vec<(String, Value)>,
    },
    Slice(DynSlice),
    Array(Vec<Value>),
}

impl Value {
    /// The type name used in mismatch errors.
    pub fn type_name(&self) -> String {
        match self {
            Self::Bool(_) => "bool".to_string(),
            Self::U8(_) => "u8".to_string(),
            Self::I8(_) => "i8".to_string(),
            Self::U16(_) => "u16".to_string(),
            Self::I16(_) => "i16".to_string(),
            Self::U32(_) => "u32".to_string(),
            Self::I32(_) => "i32".to_string(),
            Self::U64(_) => "u64".to_string(),
            Self::I64(_) => "i64".to_string(),
            Self::F32(_) => "f32".to_string(),
            Self::F64(_) => "f64".to_string(),
            Self::Handle(_) => "handle".to_string(),
            Self::Enum { ty, .. } | Self::Struct { ty, .. } => ty.clone(),
            Self::Slice(slice) => format!("[]{}", slice.element),
            Self::Array(items) => match items.first() {
                Some(first) => format!("[{}]{}", items.len(), first.type_name()),
                None => "[0]".to_string(),
            },
        }
    }

    /// A struct field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Struct { fields, .. } => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self {
            Self::Struct { fields, .. } => fields
                .iter_mut()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Replace a struct field, returning the previous value.  Whether the
    /// new value fits the field is checked on encode.
    pub fn set_field(&mut self, name: &str, value: Value) -> Option<Value> {
        self.field_mut(name).map(|slot| std::mem::replace(slot, value))
    }

    /// Integer content of an integer or enum value.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::U8(v) => Some(v.into()),
            Self::I8(v) => Some(v.into()),
            Self::U16(v) => Some(v.into()),
            Self::I16(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            Self::I32(v) => Some(v.into()),
            Self::U64(v) => i64::try_from(v).ok(),
            Self::I64(v) | Self::Enum { value: v, .. } => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F32(v) => Some(v.into()),
            Self::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<Handle> {
        match *self {
            Self::Handle(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&DynSlice> {
        match self {
            Self::Slice(slice) => Some(slice),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Handle(h) => write!(f, "{h}"),
            Self::Enum {
                ty,
                name: Some(name),
                ..
            } => write!(f, "{ty}.{name}"),
            Self::Enum { ty, value, .. } => write!(f, "{ty}({value})"),
            Self::Struct { ty, fields } => {
                write!(f, "{ty} {{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}{name}: {value}")?;
                }
                if fields.is_empty() {
                    f.write_str("}")
                } else {
                    f.write_str(" }")
                }
            }
            Self::Slice(slice) => write!(f, "{slice}"),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Lazy `[u32 length][u32 pointer]` view whose element type is only known
/// from the schema.  Like the typed slice, elements are decoded on every
/// access and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DynSlice {
    pub element: TypeRef,
    pub length: u32,
    pub pointer: u32,
}

impl DynSlice {
    pub fn new(element: TypeRef, pointer: u32, length: u32) -> Self {
        Self {
            element,
            length,
            pointer,
        }
    }

    pub fn len(&self) -> u32 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Guest address of element `index`.
    pub fn element_offset(&self, registry: &Registry, index: u32) -> Result<u32> {
        let size = registry.size_of(&self.element)?;
        if index >= self.length {
            return Err(Error::IndexOutOfRange {
                index,
                length: self.length,
            });
        }
        let offset = u64::from(self.pointer) + u64::from(index) * u64::from(size);
        u32::try_from(offset).map_err(|_| Error::AddressOverflow {
            offset,
            len: u64::from(size),
        })
    }

    /// Decode element `index`.
    pub fn get<M: LinearMemory + ?Sized>(
        &self,
        registry: &Registry,
        memory: &M,
        index: u32,
    ) -> Result<Value> {
        let offset = self.element_offset(registry, index)?;
        let size = registry.size_of(&self.element)?;
        memory.check_range(offset, size)?;
        codec::decode(registry, &self.element, memory, offset)
    }

    /// Encode `value` into element `index`.
    pub fn set<M: LinearMemory + ?Sized>(
        &self,
        registry: &Registry,
        memory: &mut M,
        index: u32,
        value: &Value,
    ) -> Result<()> {
        let offset = self.element_offset(registry, index)?;
        registry
            .descriptor_for(self.element.clone())?
            .encode(value, memory, offset)
    }

    /// Decode every element into a host-owned vector (a snapshot).
    pub fn to_vec<M: LinearMemory + ?Sized>(
        &self,
        registry: &Registry,
        memory: &M,
    ) -> Result<Vec<Value>> {
        (0..self.length)
            .map(|i| self.get(registry, memory, i))
            .collect()
    }
}

impl fmt::Display for DynSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[]{}(len {} @ {:#x})",
            self.element, self.length, self.pointer
        )
    }
}
