//! Composite types with fields at fixed byte offsets.
//!
//! Struct layouts are produced by the guest compiler, not derived on the
//! host: field offsets and the total size (including padding) are spelled
//! out in the [`wasm_struct!`](crate::wasm_struct) invocation emitted by the
//! code generator.  The macro checks at compile time that every field lies
//! inside the declared size.

use crate::layout::{FieldDef, StructDef, TypeDef, TypeRef};
use crate::ty::WasmType;

/// Layout of one struct field.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    /// Byte offset relative to the start of the struct.
    pub offset: u32,
    pub size: u32,
    pub ty: fn() -> TypeRef,
}

/// A struct type declared by the code generator.
pub trait Struct: WasmType {
    const NAME: &'static str;

    /// Fields in declaration order.
    const FIELDS: &'static [Field];

    fn field(name: &str) -> Option<&'static Field> {
        Self::FIELDS.iter().find(|f| f.name == name)
    }

    /// Schema definition for layout checksums.
    fn type_def() -> TypeDef {
        TypeDef::Struct(StructDef {
            name: Self::NAME.to_string(),
            size: Self::SIZE,
            fields: Self::FIELDS
                .iter()
                .map(|f| FieldDef {
                    name: f.name.to_string(),
                    offset: f.offset,
                    ty: (f.ty)(),
                })
                .collect(),
        })
    }
}

/// Declare a guest struct with its compiler-assigned layout.
///
/// Each field is written `name @ offset: Type`; the size in parentheses is
/// the guest's `@sizeOf` including trailing padding.
///
/// ```
/// wasmpass_types::wasm_struct! {
///     #[derive(Default)]
///     pub struct Point(8) {
///         pub x @ 0: i32,
///         pub y @ 4: i32,
///     }
/// }
///
/// use wasmpass_types::WasmType;
///
/// let mut memory = vec![0u8; 16];
/// Point { x: 3, y: -4 }.encode(&mut memory, 8).unwrap();
/// assert_eq!(Point::decode(&memory, 8).unwrap(), Point { x: 3, y: -4 });
/// ```
#[macro_export]
macro_rules! wasm_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident ($size:expr) {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident @ $offset:literal : $fty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $fty,
            )*
        }

        const _: () = {
            $(
                assert!(
                    $offset + <$fty as $crate::WasmType>::SIZE <= $size,
                    concat!("field `", stringify!($field), "` overruns `", stringify!($name), "`")
                );
            )*
        };

        impl $crate::WasmType for $name {
            const SIZE: u32 = $size;

            fn type_ref() -> $crate::layout::TypeRef {
                $crate::layout::TypeRef::Named(stringify!($name).to_string())
            }

            fn decode<M: $crate::LinearMemory + ?Sized>(memory: &M, offset: u32) -> $crate::Result<Self> {
                memory.check_range(offset, <Self as $crate::WasmType>::SIZE)?;
                Ok(Self {
                    $(
                        $field: <$fty as $crate::WasmType>::decode(memory, offset + $offset)?,
                    )*
                })
            }

            fn encode<M: $crate::LinearMemory + ?Sized>(&self, memory: &mut M, offset: u32) -> $crate::Result<()> {
                memory.check_range(offset, <Self as $crate::WasmType>::SIZE)?;
                $(
                    $crate::WasmType::encode(&self.$field, memory, offset + $offset)?;
                )*
                Ok(())
            }
        }

        impl $crate::structs::Struct for $name {
            const NAME: &'static str = stringify!($name);
            const FIELDS: &'static [$crate::structs::Field] = &[
                $(
                    $crate::structs::Field {
                        name: stringify!($field),
                        offset: $offset,
                        size: <$fty as $crate::WasmType>::SIZE,
                        ty: <$fty as $crate::WasmType>::type_ref,
                    },
                )*
            ];
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::LinearMemory;
    use crate::{EnumValue, Error, Slice};

    crate::wasm_enum! {
        enum Flavor: u8 {
            sweet = 1,
            sour = 2,
        }
    }

    crate::wasm_struct! {
        struct Inner(4) {
            tag @ 0: u16,
            flag @ 2: bool,
        }
    }

    crate::wasm_struct! {
        struct Outer(24) {
            id @ 0: u32,
            inner @ 4: Inner,
            flavor @ 8: EnumValue<Flavor>,
            items @ 12: Slice<u16>,
            tail @ 20: u8,
        }
    }

    fn outer() -> Outer {
        Outer {
            id: 0xDEAD_BEEF,
            inner: Inner { tag: 513, flag: true },
            flavor: Flavor::sour(),
            items: Slice::new(0x400, 3),
            tail: 9,
        }
    }

    #[test]
    fn test_nested_layout_bytes() {
        let mut mem = vec![0u8; 24];
        outer().encode(&mut mem, 0).unwrap();
        assert_eq!(&mem[0..4], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(&mem[4..7], &[0x01, 0x02, 0x01]);
        assert_eq!(mem[8], 2);
        // slice header: length first, then pointer
        assert_eq!(&mem[12..20], &[3, 0, 0, 0, 0x00, 0x04, 0, 0]);
        assert_eq!(mem[20], 9);
    }

    #[test]
    fn test_round_trip_at_offset() {
        let mut mem = vec![0u8; 64];
        outer().encode(&mut mem, 33).unwrap();
        assert_eq!(Outer::decode(&mem, 33).unwrap(), outer());
    }

    #[test]
    fn test_encode_out_of_bounds_writes_nothing() {
        let mut mem = vec![0x5Au8; 30];
        let err = outer().encode(&mut mem, 8).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { offset: 8, len: 24, .. }));
        assert!(mem.iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn test_decode_out_of_bounds() {
        let mem = vec![0u8; 23];
        assert!(Outer::decode(&mem, 0).is_err());
        assert!(mem.check_range(0, 23).is_ok());
    }

    #[test]
    fn test_field_table() {
        assert_eq!(Outer::FIELDS.len(), 5);
        let items = Outer::field("items").unwrap();
        assert_eq!(items.offset, 12);
        assert_eq!(items.size, 8);
        assert_eq!((items.ty)().to_string(), "[]u16");
        assert!(Outer::field("missing").is_none());
    }

    #[test]
    fn test_type_def() {
        let TypeDef::Struct(def) = Outer::type_def() else {
            panic!("expected struct definition");
        };
        assert_eq!(def.name, "Outer");
        assert_eq!(def.size, 24);
        let names: Vec<&str> = def.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "inner", "flavor", "items", "tail"]);
        assert_eq!(def.fields[2].ty.to_string(), "Flavor");
    }
}
