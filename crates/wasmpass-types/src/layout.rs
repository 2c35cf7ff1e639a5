//! Layout schema: the versioned artifact describing guest type layouts.
//!
//! The code generator emits one [`Schema`] per guest module (as JSON) and
//! embeds its [`LayoutChecksum`] in the module.  Host-side Rust types
//! produce the same definitions through [`Struct::type_def`] and
//! [`EnumType::type_def`], so both sides can be compared before any byte
//! crosses the boundary.
//!
//! ```json
//! {
//!   "version": 1,
//!   "types": [
//!     { "kind": "enum", "name": "MyEnum", "repr": "u8",
//!       "members": [{ "name": "papa", "value": 0 }, { "name": "mama", "value": 1 }] },
//!     { "kind": "struct", "name": "MyStruct", "size": 6,
//!       "fields": [{ "name": "a", "offset": 0, "type": "u8" },
//!                  { "name": "d", "offset": 5, "type": "MyEnum" }] }
//!   ]
//! }
//! ```
//!
//! Type references are strings: a primitive name, `handle`, a type name,
//! `[]T` for a slice or `[N]T` for an inline array.
//!
//! [`Struct::type_def`]: crate::Struct::type_def
//! [`EnumType::type_def`]: crate::EnumType::type_def

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::enums::EnumType;
use crate::primitive::PrimitiveKind;
use crate::structs::Struct;
use crate::{Error, Result};

/// A reference to a type from a field or slice element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Primitive(PrimitiveKind),
    /// A host handle, stored as a `u32`.
    Handle,
    /// A struct or enum defined in the schema.
    Named(String),
    /// `[u32 length][u32 pointer]` view of out-of-line elements.
    Slice(Box<TypeRef>),
    /// `N` elements stored inline.
    Array(Box<TypeRef>, u32),
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => write!(f, "{kind}"),
            Self::Handle => f.write_str("handle"),
            Self::Named(name) => f.write_str(name),
            Self::Slice(elem) => write!(f, "[]{elem}"),
            Self::Array(elem, len) => write!(f, "[{len}]{elem}"),
        }
    }
}

impl FromStr for TypeRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(elem) = s.strip_prefix("[]") {
            return Ok(Self::Slice(Box::new(elem.parse()?)));
        }
        if let Some(rest) = s.strip_prefix('[') {
            let (len, elem) = rest
                .split_once(']')
                .ok_or_else(|| Error::InvalidLayout(format!("unclosed array length in `{s}`")))?;
            let len = len
                .parse::<u32>()
                .map_err(|_| Error::InvalidLayout(format!("bad array length in `{s}`")))?;
            return Ok(Self::Array(Box::new(elem.parse()?), len));
        }
        if s == "handle" {
            return Ok(Self::Handle);
        }
        if let Ok(kind) = s.parse::<PrimitiveKind>() {
            return Ok(Self::Primitive(kind));
        }

        let mut chars = s.chars();
        let valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(Error::InvalidLayout(format!("`{s}` is not a type name")));
        }
        Ok(Self::Named(s.to_string()))
    }
}

impl TryFrom<String> for TypeRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

/// A type definition emitted by the code generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDef {
    Struct(StructDef),
    Enum(EnumDef),
}

impl TypeDef {
    pub fn name(&self) -> &str {
        match self {
            Self::Struct(def) => &def.name,
            Self::Enum(def) => &def.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    /// Total byte size, including trailing padding.
    pub size: u32,
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    /// Byte offset relative to the start of the struct.
    pub offset: u32,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    /// Backing integer width.
    pub repr: PrimitiveKind,
    /// Canonical members in declaration order.
    pub members: Vec<MemberDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDef {
    pub name: String,
    pub value: i64,
}

/// A versioned set of type definitions shared by host and guest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub version: u32,
    pub types: Vec<TypeDef>,
}

impl Schema {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            types: Vec::new(),
        }
    }

    /// Add the definition of a generated struct type.
    pub fn with_struct<S: Struct>(mut self) -> Self {
        self.types.push(S::type_def());
        self
    }

    /// Add the definition of a generated enum type.
    pub fn with_enum<E: EnumType>(mut self) -> Self {
        self.types.push(E::type_def());
        self
    }

    pub fn push(&mut self, def: TypeDef) {
        self.types.push(def);
    }

    /// Look up a definition by type name.
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|def| def.name() == name)
    }

    /// Deserialize from the generator's JSON artifact.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| Error::InvalidLayout(e.to_string()))
    }

    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// SHA-256 over the canonical encoding: definitions sorted by name, so
    /// declaration order does not affect the result.
    pub fn checksum(&self) -> LayoutChecksum {
        let mut types: Vec<&TypeDef> = self.types.iter().collect();
        types.sort_by(|a, b| a.name().cmp(b.name()));
        let canonical = serde_json::to_vec(&(self.version, types)).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        LayoutChecksum(bytes)
    }
}

/// Digest identifying a layout schema.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutChecksum(pub [u8; 32]);

impl LayoutChecksum {
    /// Parse from raw digest bytes, e.g. a custom section payload.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for LayoutChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for LayoutChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayoutChecksum({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA_JSON: &str = r#"{
        "version": 1,
        "types": [
            { "kind": "enum", "name": "Color", "repr": "u8",
              "members": [{ "name": "red", "value": 0 }, { "name": "blue", "value": 2 }] },
            { "kind": "struct", "name": "Pixel", "size": 12,
              "fields": [
                { "name": "color", "offset": 0, "type": "Color" },
                { "name": "samples", "offset": 4, "type": "[]u16" }
              ] }
        ]
    }"#;

    #[test]
    fn test_type_ref_parse_and_display() {
        let cases = ["u8", "handle", "MyStruct", "[]u16", "[]MyStruct", "[32]u8", "[][4]i32"];
        for case in cases {
            let parsed: TypeRef = case.parse().unwrap();
            assert_eq!(parsed.to_string(), case);
        }
        assert_eq!(
            "[]u16".parse::<TypeRef>().unwrap(),
            TypeRef::Slice(Box::new(TypeRef::Primitive(PrimitiveKind::U16)))
        );
    }

    #[test]
    fn test_type_ref_rejects_garbage() {
        assert!("".parse::<TypeRef>().is_err());
        assert!("9lives".parse::<TypeRef>().is_err());
        assert!("[x]u8".parse::<TypeRef>().is_err());
        assert!("[4u8".parse::<TypeRef>().is_err());
        assert!("[]".parse::<TypeRef>().is_err());
    }

    #[test]
    fn test_schema_from_json() {
        let schema = Schema::from_json(SCHEMA_JSON.as_bytes()).unwrap();
        assert_eq!(schema.version, 1);
        assert_eq!(schema.types.len(), 2);
        let Some(TypeDef::Struct(pixel)) = schema.get("Pixel") else {
            panic!("Pixel should be a struct");
        };
        assert_eq!(pixel.size, 12);
        assert_eq!(pixel.fields[1].ty.to_string(), "[]u16");
    }

    #[test]
    fn test_schema_json_round_trip() {
        let schema = Schema::from_json(SCHEMA_JSON.as_bytes()).unwrap();
        let again = Schema::from_json(&schema.to_json()).unwrap();
        assert_eq!(schema, again);
    }

    #[test]
    fn test_checksum_ignores_declaration_order() {
        let schema = Schema::from_json(SCHEMA_JSON.as_bytes()).unwrap();
        let mut reversed = schema.clone();
        reversed.types.reverse();
        assert_eq!(schema.checksum(), reversed.checksum());
    }

    #[test]
    fn test_checksum_tracks_layout_changes() {
        let schema = Schema::from_json(SCHEMA_JSON.as_bytes()).unwrap();
        let mut moved = schema.clone();
        if let Some(TypeDef::Struct(pixel)) = moved.types.get_mut(1) {
            pixel.fields[1].offset = 8;
        }
        assert_ne!(schema.checksum(), moved.checksum());

        let mut bumped = schema.clone();
        bumped.version = 2;
        assert_ne!(schema.checksum(), bumped.checksum());
    }

    #[test]
    fn test_checksum_bytes_round_trip() {
        let sum = Schema::new(1).checksum();
        assert_eq!(LayoutChecksum::from_bytes(sum.as_bytes()), Some(sum));
        assert_eq!(LayoutChecksum::from_bytes(&[0u8; 31]), None);
        assert_eq!(sum.to_string().len(), 64);
    }
}
