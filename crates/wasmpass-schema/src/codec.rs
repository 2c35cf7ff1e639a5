//! Byte-level decode/encode of dynamic values against a [`Registry`].
//!
//! Callers are expected to have bounds-checked the whole value; the
//! per-field accesses below still go through [`LinearMemory`] and fail
//! rather than panic if they did not.

use wasmpass_types::layout::{TypeDef, TypeRef};
use wasmpass_types::{Error, Handle, IntRepr, LinearMemory, PrimitiveKind, Result};

use crate::registry::Registry;
use crate::value::{DynSlice, Value};

pub(crate) fn decode<M: LinearMemory + ?Sized>(
    registry: &Registry,
    ty: &TypeRef,
    memory: &M,
    offset: u32,
) -> Result<Value> {
    match ty {
        TypeRef::Primitive(kind) => decode_primitive(*kind, memory, offset),
        TypeRef::Handle => Ok(Value::Handle(Handle::from_raw(memory.read(offset)?))),
        TypeRef::Named(name) => match registry.require(name)? {
            TypeDef::Struct(def) => {
                memory.check_range(offset, def.size)?;
                let mut fields = Vec::with_capacity(def.fields.len());
                for field in &def.fields {
                    let value = decode(registry, &field.ty, memory, offset + field.offset)?;
                    fields.push((field.name.clone(), value));
                }
                Ok(Value::Struct {
                    ty: def.name.clone(),
                    fields,
                })
            }
            TypeDef::Enum(def) => {
                let value = read_int(def.repr, memory, offset)?;
                let name = def
                    .members
                    .iter()
                    .find(|m| m.value == value)
                    .map(|m| m.name.clone());
                Ok(Value::Enum {
                    ty: def.name.clone(),
                    value,
                    name,
                })
            }
        },
        TypeRef::Slice(element) => {
            memory.check_range(offset, 8)?;
            let length = memory.read::<u32>(offset)?;
            let pointer = memory.read::<u32>(offset + 4)?;
            Ok(Value::Slice(DynSlice::new((**element).clone(), pointer, length)))
        }
        TypeRef::Array(element, len) => {
            let size = registry.size_of(element)?;
            memory.check_range(offset, registry.size_of(ty)?)?;
            (0..*len)
                .map(|i| decode(registry, element, memory, offset + i * size))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
    }
}

pub(crate) fn encode<M: LinearMemory + ?Sized>(
    registry: &Registry,
    ty: &TypeRef,
    value: &Value,
    memory: &mut M,
    offset: u32,
) -> Result<()> {
    match (ty, value) {
        (TypeRef::Primitive(kind), _) => encode_primitive(*kind, value, memory, offset),
        (TypeRef::Handle, Value::Handle(handle)) => memory.write(offset, handle.index()),
        (TypeRef::Named(name), _) => match registry.require(name)? {
            TypeDef::Struct(def) => {
                let Value::Struct { ty: found, fields } = value else {
                    return Err(mismatch(ty, value));
                };
                if *found != def.name || fields.len() != def.fields.len() {
                    return Err(mismatch(ty, value));
                }
                memory.check_range(offset, def.size)?;
                for field in &def.fields {
                    let field_value = fields
                        .iter()
                        .find(|(n, _)| *n == field.name)
                        .map(|(_, v)| v)
                        .ok_or_else(|| Error::TypeMismatch {
                            expected: format!("field `{}.{}`", def.name, field.name),
                            found: "nothing".to_string(),
                        })?;
                    encode(registry, &field.ty, field_value, memory, offset + field.offset)?;
                }
                Ok(())
            }
            TypeDef::Enum(def) => match value {
                Value::Enum {
                    ty: found,
                    value: raw,
                    ..
                } if *found == def.name => {
                    write_int(def.repr, *raw, memory, offset).unwrap_or_else(|| Err(mismatch(ty, value)))
                }
                _ => Err(mismatch(ty, value)),
            },
        },
        (TypeRef::Slice(element), Value::Slice(slice)) if **element == slice.element => {
            memory.check_range(offset, 8)?;
            memory.write(offset, slice.length)?;
            memory.write(offset + 4, slice.pointer)
        }
        (TypeRef::Array(element, len), Value::Array(items)) if items.len() == *len as usize => {
            let size = registry.size_of(element)?;
            memory.check_range(offset, registry.size_of(ty)?)?;
            for (i, item) in (0u32..).zip(items) {
                encode(registry, element, item, memory, offset + i * size)?;
            }
            Ok(())
        }
        _ => Err(mismatch(ty, value)),
    }
}

fn mismatch(ty: &TypeRef, value: &Value) -> Error {
    Error::TypeMismatch {
        expected: ty.to_string(),
        found: value.type_name(),
    }
}

fn decode_primitive<M: LinearMemory + ?Sized>(
    kind: PrimitiveKind,
    memory: &M,
    offset: u32,
) -> Result<Value> {
    Ok(match kind {
        PrimitiveKind::Bool => Value::Bool(memory.read(offset)?),
        PrimitiveKind::U8 => Value::U8(memory.read(offset)?),
        PrimitiveKind::I8 => Value::I8(memory.read(offset)?),
        PrimitiveKind::U16 => Value::U16(memory.read(offset)?),
        PrimitiveKind::I16 => Value::I16(memory.read(offset)?),
        PrimitiveKind::U32 => Value::U32(memory.read(offset)?),
        PrimitiveKind::I32 => Value::I32(memory.read(offset)?),
        PrimitiveKind::U64 => Value::U64(memory.read(offset)?),
        PrimitiveKind::I64 => Value::I64(memory.read(offset)?),
        PrimitiveKind::F32 => Value::F32(memory.read(offset)?),
        PrimitiveKind::F64 => Value::F64(memory.read(offset)?),
    })
}

fn encode_primitive<M: LinearMemory + ?Sized>(
    kind: PrimitiveKind,
    value: &Value,
    memory: &mut M,
    offset: u32,
) -> Result<()> {
    match (kind, value) {
        (PrimitiveKind::Bool, Value::Bool(v)) => memory.write(offset, *v),
        (PrimitiveKind::U8, Value::U8(v)) => memory.write(offset, *v),
        (PrimitiveKind::I8, Value::I8(v)) => memory.write(offset, *v),
        (PrimitiveKind::U16, Value::U16(v)) => memory.write(offset, *v),
        (PrimitiveKind::I16, Value::I16(v)) => memory.write(offset, *v),
        (PrimitiveKind::U32, Value::U32(v)) => memory.write(offset, *v),
        (PrimitiveKind::I32, Value::I32(v)) => memory.write(offset, *v),
        (PrimitiveKind::U64, Value::U64(v)) => memory.write(offset, *v),
        (PrimitiveKind::I64, Value::I64(v)) => memory.write(offset, *v),
        (PrimitiveKind::F32, Value::F32(v)) => memory.write(offset, *v),
        (PrimitiveKind::F64, Value::F64(v)) => memory.write(offset, *v),
        _ => Err(mismatch(&TypeRef::Primitive(kind), value)),
    }
}

/// Read an enum tag widened to `i64`; `u64` tags keep their bit pattern.
fn read_int<M: LinearMemory + ?Sized>(kind: PrimitiveKind, memory: &M, offset: u32) -> Result<i64> {
    match kind {
        PrimitiveKind::U8 => Ok(memory.read::<u8>(offset)?.to_i64()),
        PrimitiveKind::I8 => Ok(memory.read::<i8>(offset)?.to_i64()),
        PrimitiveKind::U16 => Ok(memory.read::<u16>(offset)?.to_i64()),
        PrimitiveKind::I16 => Ok(memory.read::<i16>(offset)?.to_i64()),
        PrimitiveKind::U32 => Ok(memory.read::<u32>(offset)?.to_i64()),
        PrimitiveKind::I32 => Ok(memory.read::<i32>(offset)?.to_i64()),
        PrimitiveKind::U64 => Ok(memory.read::<u64>(offset)?.to_i64()),
        PrimitiveKind::I64 => memory.read::<i64>(offset),
        PrimitiveKind::Bool | PrimitiveKind::F32 | PrimitiveKind::F64 => Err(
            Error::InvalidLayout(format!("`{kind}` cannot back an enum")),
        ),
    }
}

/// Write an enum tag narrowed to `kind`; `None` when it does not fit.
fn write_int<M: LinearMemory + ?Sized>(
    kind: PrimitiveKind,
    value: i64,
    memory: &mut M,
    offset: u32,
) -> Option<Result<()>> {
    match kind {
        PrimitiveKind::U8 => u8::from_i64(value).map(|v| memory.write(offset, v)),
        PrimitiveKind::I8 => i8::from_i64(value).map(|v| memory.write(offset, v)),
        PrimitiveKind::U16 => u16::from_i64(value).map(|v| memory.write(offset, v)),
        PrimitiveKind::I16 => i16::from_i64(value).map(|v| memory.write(offset, v)),
        PrimitiveKind::U32 => u32::from_i64(value).map(|v| memory.write(offset, v)),
        PrimitiveKind::I32 => i32::from_i64(value).map(|v| memory.write(offset, v)),
        PrimitiveKind::U64 => Some(memory.write(offset, value as u64)),
        PrimitiveKind::I64 => Some(memory.write(offset, value)),
        PrimitiveKind::Bool | PrimitiveKind::F32 | PrimitiveKind::F64 => None,
    }
}
