//! Fixed-width little-endian scalar codecs.
//!
//! [`Primitive`] is the leaf of every layout: integers, floats and booleans
//! stored at their natural width.  [`PrimitiveKind`] is the runtime tag used
//! by layout schemas to name the same set of types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use crate::Error;

/// A scalar that is stored in linear memory as `SIZE` little-endian bytes.
pub trait Primitive: Copy + PartialEq + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Width in bytes.
    const SIZE: u32;
    /// Schema tag for this scalar.
    const KIND: PrimitiveKind;

    /// Decode from exactly `SIZE` bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;

    /// Encode into exactly `SIZE` bytes.
    fn write_le_slice(self, out: &mut [u8]);
}

/// Integer scalars usable as enum backing storage.
pub trait IntRepr: Primitive + Eq + Hash {
    fn to_i64(self) -> i64;

    /// Narrow from `i64`; `None` when the value does not fit.
    fn from_i64(value: i64) -> Option<Self>;
}

macro_rules! impl_primitive {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const SIZE: u32 = std::mem::size_of::<$ty>() as u32;
                const KIND: PrimitiveKind = PrimitiveKind::$kind;

                #[inline]
                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(buf)
                }

                #[inline]
                fn write_le_slice(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

macro_rules! impl_int_repr {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntRepr for $ty {
                #[inline]
                fn to_i64(self) -> i64 {
                    self as i64
                }

                #[inline]
                fn from_i64(value: i64) -> Option<Self> {
                    <$ty>::try_from(value).ok()
                }
            }
        )*
    };
}

impl_primitive! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

impl_int_repr!(u8, i8, u16, i16, u32, i32, u64, i64);

impl Primitive for bool {
    const SIZE: u32 = 1;
    const KIND: PrimitiveKind = PrimitiveKind::Bool;

    /// Any non-zero byte reads as `true`.
    #[inline]
    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    #[inline]
    fn write_le_slice(self, out: &mut [u8]) {
        out[0] = self as u8;
    }
}

/// Runtime tag for the primitive scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 11] = [
        Self::Bool,
        Self::U8,
        Self::I8,
        Self::U16,
        Self::I16,
        Self::U32,
        Self::I32,
        Self::U64,
        Self::I64,
        Self::F32,
        Self::F64,
    ];

    /// Width in bytes.
    pub fn size(self) -> u32 {
        match self {
            Self::Bool | Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /// Whether this kind may back an enum.
    pub fn is_integer(self) -> bool {
        !matches!(self, Self::Bool | Self::F32 | Self::F64)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::U64 => "u64",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PrimitiveKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::InvalidLayout(format!("`{s}` is not a primitive type")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_match_kinds() {
        assert_eq!(<u8 as Primitive>::SIZE, PrimitiveKind::U8.size());
        assert_eq!(<i16 as Primitive>::SIZE, PrimitiveKind::I16.size());
        assert_eq!(<u32 as Primitive>::SIZE, PrimitiveKind::U32.size());
        assert_eq!(<f64 as Primitive>::SIZE, PrimitiveKind::F64.size());
        assert_eq!(<bool as Primitive>::SIZE, PrimitiveKind::Bool.size());
    }

    #[test]
    fn test_le_byte_order() {
        let mut out = [0u8; 4];
        0x1234_5678u32.write_le_slice(&mut out);
        assert_eq!(out, [0x78, 0x56, 0x34, 0x12]);
        assert_eq!(u32::from_le_slice(&out), 0x1234_5678);
    }

    #[test]
    fn test_bool_nonzero_is_true() {
        assert!(bool::from_le_slice(&[2]));
        assert!(!bool::from_le_slice(&[0]));
    }

    #[test]
    fn test_kind_parse() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(kind.name().parse::<PrimitiveKind>().unwrap(), kind);
        }
        assert!("usize".parse::<PrimitiveKind>().is_err());
    }

    #[test]
    fn test_int_repr_narrowing() {
        assert_eq!(u8::from_i64(255), Some(255));
        assert_eq!(u8::from_i64(256), None);
        assert_eq!(i8::from_i64(-1), Some(-1));
        assert_eq!(u16::from_i64(-1), None);
    }
}
