//! Open enumerations over integer-backed tags.
//!
//! A guest enum is a plain integer in memory.  Host and guest may be built
//! from slightly different definitions, so decoding must never fail: an
//! integer matching a canonical member yields that member, anything else
//! yields an *open* value that still carries the raw integer and encodes
//! back to it unchanged.
//!
//! Canonical members live in a static table per enum type (generated by
//! [`wasm_enum!`](crate::wasm_enum)); every known [`EnumValue`] points into
//! that table, so two decodes of the same known integer share one member.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::layout::{EnumDef, MemberDef, TypeDef, TypeRef};
use crate::memory::LinearMemory;
use crate::primitive::{IntRepr, Primitive};
use crate::ty::WasmType;
use crate::Result;

/// A canonical, named enum constant.
#[derive(Debug, PartialEq, Eq)]
pub struct EnumMember<R: 'static> {
    pub name: &'static str,
    pub value: R,
}

/// An enum type declared by the code generator.
pub trait EnumType: 'static {
    /// Backing integer stored in linear memory.
    type Repr: IntRepr;

    /// Type name used when rendering values.
    const NAME: &'static str;

    /// Canonical members in declaration order.
    fn members() -> &'static [EnumMember<Self::Repr>];

    /// Schema definition for layout checksums.
    fn type_def() -> TypeDef {
        TypeDef::Enum(EnumDef {
            name: Self::NAME.to_string(),
            repr: <Self::Repr as Primitive>::KIND,
            members: Self::members()
                .iter()
                .map(|m| MemberDef {
                    name: m.name.to_string(),
                    value: m.value.to_i64(),
                })
                .collect(),
        })
    }
}

/// Known-or-unknown view of an [`EnumValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumKind<R: 'static> {
    Known(&'static EnumMember<R>),
    Unknown(R),
}

/// A decoded enum value of type `E`, canonical or open.
pub struct EnumValue<E: EnumType> {
    kind: EnumKind<E::Repr>,
    marker: PhantomData<fn() -> E>,
}

impl<E: EnumType> EnumValue<E> {
    /// Resolve a raw integer: the first canonical member with that value,
    /// or an open value carrying it.
    pub fn from_value(value: E::Repr) -> Self {
        let kind = match E::members().iter().find(|m| m.value == value) {
            Some(member) => EnumKind::Known(member),
            None => EnumKind::Unknown(value),
        };
        Self {
            kind,
            marker: PhantomData,
        }
    }

    /// The canonical member with the given name.
    pub fn named(name: &str) -> Option<Self> {
        E::members().iter().find(|m| m.name == name).map(|member| Self {
            kind: EnumKind::Known(member),
            marker: PhantomData,
        })
    }

    pub fn value(&self) -> E::Repr {
        match self.kind {
            EnumKind::Known(member) => member.value,
            EnumKind::Unknown(value) => value,
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        match self.kind {
            EnumKind::Known(member) => Some(member.name),
            EnumKind::Unknown(_) => None,
        }
    }

    pub fn kind(&self) -> EnumKind<E::Repr> {
        self.kind
    }

    pub fn is_known(&self) -> bool {
        matches!(self.kind, EnumKind::Known(_))
    }

    /// Whether both values are the same canonical member instance.
    /// Open values are never the same instance, even with equal integers.
    pub fn same_instance(&self, other: &Self) -> bool {
        match (self.kind, other.kind) {
            (EnumKind::Known(a), EnumKind::Known(b)) => std::ptr::eq(a, b),
            _ => false,
        }
    }
}

impl<E: EnumType> Clone for EnumValue<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: EnumType> Copy for EnumValue<E> {}

impl<E: EnumType> PartialEq for EnumValue<E> {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

impl<E: EnumType> Eq for EnumValue<E> {}

impl<E: EnumType> Hash for EnumValue<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value().hash(state);
    }
}

impl<E: EnumType> fmt::Display for EnumValue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EnumKind::Known(member) => write!(f, "{}.{}", E::NAME, member.name),
            EnumKind::Unknown(value) => write!(f, "{}({value})", E::NAME),
        }
    }
}

impl<E: EnumType> fmt::Debug for EnumValue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<E: EnumType> WasmType for EnumValue<E> {
    const SIZE: u32 = <E::Repr as Primitive>::SIZE;

    fn type_ref() -> TypeRef {
        TypeRef::Named(E::NAME.to_string())
    }

    fn decode<M: LinearMemory + ?Sized>(memory: &M, offset: u32) -> Result<Self> {
        Ok(Self::from_value(memory.read::<E::Repr>(offset)?))
    }

    fn encode<M: LinearMemory + ?Sized>(&self, memory: &mut M, offset: u32) -> Result<()> {
        memory.write(offset, self.value())
    }
}

/// Declare a guest enum and its canonical members.
///
/// ```
/// wasmpass_types::wasm_enum! {
///     pub enum MyEnum: u8 {
///         papa = 0,
///         mama = 1,
///     }
/// }
///
/// let v = MyEnum::mama();
/// assert_eq!(v.to_string(), "MyEnum.mama");
/// assert_eq!(wasmpass_types::EnumValue::<MyEnum>::from_value(9).to_string(), "MyEnum(9)");
/// ```
#[macro_export]
macro_rules! wasm_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $repr:ty {
            $($member:ident = $value:expr),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis struct $name;

        impl $crate::enums::EnumType for $name {
            type Repr = $repr;
            const NAME: &'static str = stringify!($name);

            fn members() -> &'static [$crate::enums::EnumMember<$repr>] {
                static MEMBERS: &[$crate::enums::EnumMember<$repr>] = &[
                    $($crate::enums::EnumMember { name: stringify!($member), value: $value },)*
                ];
                MEMBERS
            }
        }

        #[allow(non_snake_case, dead_code)]
        impl $name {
            $(
                $vis fn $member() -> $crate::enums::EnumValue<$name> {
                    $crate::enums::EnumValue::from_value($value)
                }
            )*
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::wasm_enum! {
        enum Mode: u16 {
            idle = 0,
            busy = 7,
            legacy_busy = 7,
        }
    }

    #[test]
    fn test_from_known_value() {
        let v = EnumValue::<Mode>::from_value(7);
        assert!(v.is_known());
        assert_eq!(v.name(), Some("busy"));
        assert_eq!(v.to_string(), "Mode.busy");
    }

    #[test]
    fn test_first_declared_member_wins() {
        let v = Mode::legacy_busy();
        assert_eq!(v.name(), Some("busy"));
        assert!(v.same_instance(&Mode::busy()));
    }

    #[test]
    fn test_unknown_value_is_open() {
        let v = EnumValue::<Mode>::from_value(300);
        assert!(!v.is_known());
        assert_eq!(v.value(), 300);
        assert_eq!(v.kind(), EnumKind::Unknown(300));
        assert_eq!(v.to_string(), "Mode(300)");
        assert_eq!(format!("{v:?}"), "Mode(300)");
    }

    #[test]
    fn test_canonical_instances_are_shared() {
        let a = EnumValue::<Mode>::from_value(0);
        let b = Mode::idle();
        assert!(a.same_instance(&b));

        let x = EnumValue::<Mode>::from_value(42);
        let y = EnumValue::<Mode>::from_value(42);
        assert_eq!(x, y);
        assert!(!x.same_instance(&y));
    }

    #[test]
    fn test_named_lookup() {
        assert_eq!(EnumValue::<Mode>::named("idle").map(|v| v.value()), Some(0));
        assert!(EnumValue::<Mode>::named("sleeping").is_none());
    }

    #[test]
    fn test_unknown_value_round_trips_through_memory() {
        let mut mem = vec![0u8; 4];
        mem.write(1, 0xABCDu16).unwrap();
        let v = EnumValue::<Mode>::decode(&mem, 1).unwrap();
        assert_eq!(v.to_string(), "Mode(43981)");

        let mut out = vec![0u8; 4];
        v.encode(&mut out, 1).unwrap();
        assert_eq!(out, mem);
    }

    #[test]
    fn test_type_def() {
        let TypeDef::Enum(def) = Mode::type_def() else {
            panic!("expected enum definition");
        };
        assert_eq!(def.name, "Mode");
        assert_eq!(def.members.len(), 3);
        assert_eq!(def.members[1].value, 7);
    }
}
