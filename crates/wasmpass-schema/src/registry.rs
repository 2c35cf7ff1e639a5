//! Validated type registry and per-type descriptors.

use std::collections::HashMap;

use wasmpass_types::layout::{StructDef, TypeDef, TypeRef};
use wasmpass_types::{Error, IntRepr, LayoutChecksum, LinearMemory, PrimitiveKind, Result, Schema};

use crate::codec;
use crate::value::Value;

/// Size of the `[u32 length][u32 pointer]` slice header.
const SLICE_HEADER_SIZE: u32 = 8;

/// Size of a handle index.
const HANDLE_SIZE: u32 = 4;

/// A layout schema that passed validation, indexed by type name.
///
/// Construction rejects every inconsistency that would otherwise surface
/// halfway through a decode: unknown type names, fields overrunning their
/// struct, non-integer enum backing types and structs containing themselves
/// by value.
#[derive(Debug, Clone)]
pub struct Registry {
    schema: Schema,
    index: HashMap<String, usize>,
    checksum: LayoutChecksum,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl Registry {
    pub fn new(schema: Schema) -> Result<Self> {
        let mut index = HashMap::with_capacity(schema.types.len());
        for (i, def) in schema.types.iter().enumerate() {
            if index.insert(def.name().to_string(), i).is_some() {
                return Err(Error::InvalidLayout(format!(
                    "type `{}` is defined twice",
                    def.name()
                )));
            }
        }

        let checksum = schema.checksum();
        let registry = Self {
            schema,
            index,
            checksum,
        };
        for def in &registry.schema.types {
            match def {
                TypeDef::Struct(def) => registry.check_struct(def)?,
                TypeDef::Enum(def) => {
                    if !def.repr.is_integer() {
                        return Err(Error::InvalidLayout(format!(
                            "enum `{}` is backed by non-integer `{}`",
                            def.name, def.repr
                        )));
                    }
                    if let Some(member) = def.members.iter().find(|m| !fits(def.repr, m.value)) {
                        return Err(Error::InvalidLayout(format!(
                            "`{}.{}` = {} does not fit in `{}`",
                            def.name, member.name, member.value, def.repr
                        )));
                    }
                }
            }
        }
        registry.check_acyclic()?;
        Ok(registry)
    }

    /// Parse and validate the generator's JSON artifact.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        Self::new(Schema::from_json(data)?)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Checksum of the schema, computed once at construction.
    pub fn checksum(&self) -> LayoutChecksum {
        self.checksum
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.index.get(name).map(|&i| &self.schema.types[i])
    }

    pub(crate) fn require(&self, name: &str) -> Result<&TypeDef> {
        self.get(name)
            .ok_or_else(|| Error::UnknownSizeType(name.to_string()))
    }

    /// Byte size of a value of type `ty` in guest memory.
    pub fn size_of(&self, ty: &TypeRef) -> Result<u32> {
        match ty {
            TypeRef::Primitive(kind) => Ok(kind.size()),
            TypeRef::Handle => Ok(HANDLE_SIZE),
            TypeRef::Slice(_) => Ok(SLICE_HEADER_SIZE),
            TypeRef::Named(name) => match self.require(name)? {
                TypeDef::Struct(def) => Ok(def.size),
                TypeDef::Enum(def) => Ok(def.repr.size()),
            },
            TypeRef::Array(element, len) => self
                .size_of(element)?
                .checked_mul(*len)
                .ok_or_else(|| Error::InvalidLayout(format!("`{ty}` does not fit in u32"))),
        }
    }

    /// Descriptor for a named struct or enum.
    pub fn descriptor(&self, name: &str) -> Result<Descriptor<'_>> {
        self.require(name)?;
        self.descriptor_for(TypeRef::Named(name.to_string()))
    }

    /// Descriptor for any type reference, e.g. a slice element type.
    pub fn descriptor_for(&self, ty: TypeRef) -> Result<Descriptor<'_>> {
        self.check_names(&ty)?;
        let size = self.size_of(&ty)?;
        Ok(Descriptor {
            registry: self,
            ty,
            size,
        })
    }

    /// The canonical member `ty.member`.
    pub fn enum_member(&self, ty: &str, member: &str) -> Option<Value> {
        let TypeDef::Enum(def) = self.get(ty)? else {
            return None;
        };
        let found = def.members.iter().find(|m| m.name == member)?;
        Some(Value::Enum {
            ty: def.name.clone(),
            value: found.value,
            name: Some(found.name.clone()),
        })
    }

    /// Resolve a raw integer to the first member carrying it, or an open
    /// value when none does.  `None` only if `ty` is not an enum.
    pub fn enum_from_value(&self, ty: &str, value: i64) -> Option<Value> {
        let TypeDef::Enum(def) = self.get(ty)? else {
            return None;
        };
        let name = def
            .members
            .iter()
            .find(|m| m.value == value)
            .map(|m| m.name.clone());
        Some(Value::Enum {
            ty: def.name.clone(),
            value,
            name,
        })
    }

    fn check_names(&self, ty: &TypeRef) -> Result<()> {
        match ty {
            TypeRef::Primitive(_) | TypeRef::Handle => Ok(()),
            TypeRef::Named(name) => self.require(name).map(|_| ()),
            TypeRef::Slice(element) | TypeRef::Array(element, _) => self.check_names(element),
        }
    }

    fn check_struct(&self, def: &StructDef) -> Result<()> {
        for (i, field) in def.fields.iter().enumerate() {
            if def.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(Error::InvalidLayout(format!(
                    "field `{}.{}` is declared twice",
                    def.name, field.name
                )));
            }
            self.check_names(&field.ty)?;
            let end = u64::from(field.offset) + u64::from(self.size_of(&field.ty)?);
            if end > u64::from(def.size) {
                return Err(Error::InvalidLayout(format!(
                    "field `{}.{}` ({} at offset {}) overruns {} bytes",
                    def.name, field.name, field.ty, field.offset, def.size
                )));
            }
        }
        Ok(())
    }

    /// Reject structs that contain themselves by value.  Slices break the
    /// chain because their elements live out of line.
    fn check_acyclic(&self) -> Result<()> {
        let mut marks = HashMap::new();
        for def in &self.schema.types {
            if let TypeDef::Struct(def) = def {
                self.visit(def, &mut marks, &mut Vec::new())?;
            }
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        def: &'a StructDef,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Result<()> {
        match marks.get(def.name.as_str()) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                path.push(&def.name);
                return Err(Error::InvalidLayout(format!(
                    "`{}` contains itself by value: {}",
                    def.name,
                    path.join(" -> ")
                )));
            }
            None => {}
        }

        marks.insert(&def.name, Mark::Visiting);
        path.push(&def.name);
        for field in &def.fields {
            if let Some(TypeDef::Struct(inner)) = by_value_name(&field.ty).and_then(|n| self.get(n)) {
                self.visit(inner, marks, path)?;
            }
        }
        path.pop();
        marks.insert(&def.name, Mark::Done);
        Ok(())
    }
}

fn by_value_name(ty: &TypeRef) -> Option<&str> {
    match ty {
        TypeRef::Named(name) => Some(name),
        TypeRef::Array(element, _) => by_value_name(element),
        _ => None,
    }
}

/// Whether an enum member value is representable in `repr`.  `u64` members
/// are stored as their two's complement `i64`.
fn fits(repr: PrimitiveKind, value: i64) -> bool {
    match repr {
        PrimitiveKind::U8 => u8::from_i64(value).is_some(),
        PrimitiveKind::I8 => i8::from_i64(value).is_some(),
        PrimitiveKind::U16 => u16::from_i64(value).is_some(),
        PrimitiveKind::I16 => i16::from_i64(value).is_some(),
        PrimitiveKind::U32 => u32::from_i64(value).is_some(),
        PrimitiveKind::I32 => i32::from_i64(value).is_some(),
        PrimitiveKind::U64 | PrimitiveKind::I64 => true,
        PrimitiveKind::Bool | PrimitiveKind::F32 | PrimitiveKind::F64 => false,
    }
}

/// Size and codec for one type of a [`Registry`].
#[derive(Debug, Clone)]
pub struct Descriptor<'r> {
    registry: &'r Registry,
    ty: TypeRef,
    size: u32,
}

impl Descriptor<'_> {
    /// Byte size, equal to the guest compiler's layout size.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    /// Read `size` bytes at `offset` as a value.
    pub fn decode<M: LinearMemory + ?Sized>(&self, memory: &M, offset: u32) -> Result<Value> {
        memory.check_range(offset, self.size)?;
        codec::decode(self.registry, &self.ty, memory, offset)
    }

    /// Write `value` at `offset`.
    ///
    /// The value is staged over a copy of the target bytes and written in
    /// one step, so a mismatch anywhere in a nested value leaves memory
    /// untouched.  Bytes not covered by a field (padding) keep their
    /// previous content.
    pub fn encode<M: LinearMemory + ?Sized>(
        &self,
        value: &Value,
        memory: &mut M,
        offset: u32,
    ) -> Result<()> {
        let mut staged = memory.read_bytes(offset, self.size)?.to_vec();
        codec::encode(self.registry, &self.ty, value, &mut staged, 0)?;
        memory.write_bytes(offset, &staged)
    }
}
