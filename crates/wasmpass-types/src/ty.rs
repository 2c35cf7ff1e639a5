//! The [`WasmType`] descriptor trait and its primitive implementations.

use crate::layout::TypeRef;
use crate::memory::LinearMemory;
use crate::primitive::Primitive;
use crate::{Error, Result};

/// Static layout metadata plus a codec for one logical guest type.
///
/// `decode` reads exactly `SIZE` bytes starting at `offset` and `encode`
/// writes exactly that range.  Both validate the full range against the
/// memory before reading or writing anything.
pub trait WasmType: Sized {
    /// Byte size in the guest's layout.
    const SIZE: u32;

    /// The schema reference naming this type.
    fn type_ref() -> TypeRef;

    fn decode<M: LinearMemory + ?Sized>(memory: &M, offset: u32) -> Result<Self>;

    fn encode<M: LinearMemory + ?Sized>(&self, memory: &mut M, offset: u32) -> Result<()>;
}

/// Byte size of `T` in the guest's layout.
#[inline]
pub const fn size_of<T: WasmType>() -> u32 {
    T::SIZE
}

macro_rules! impl_wasm_type_for_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl WasmType for $ty {
                const SIZE: u32 = <$ty as Primitive>::SIZE;

                fn type_ref() -> TypeRef {
                    TypeRef::Primitive(<$ty as Primitive>::KIND)
                }

                #[inline]
                fn decode<M: LinearMemory + ?Sized>(memory: &M, offset: u32) -> Result<Self> {
                    memory.read::<$ty>(offset)
                }

                #[inline]
                fn encode<M: LinearMemory + ?Sized>(&self, memory: &mut M, offset: u32) -> Result<()> {
                    memory.write(offset, *self)
                }
            }
        )*
    };
}

impl_wasm_type_for_primitive!(bool, u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Fixed-length arrays are laid out as `N` consecutive elements.
impl<T: WasmType, const N: usize> WasmType for [T; N] {
    const SIZE: u32 = T::SIZE * N as u32;

    fn type_ref() -> TypeRef {
        TypeRef::Array(Box::new(T::type_ref()), N as u32)
    }

    fn decode<M: LinearMemory + ?Sized>(memory: &M, offset: u32) -> Result<Self> {
        memory.check_range(offset, Self::SIZE)?;
        let mut items = Vec::with_capacity(N);
        for i in 0..N as u32 {
            items.push(T::decode(memory, offset + i * T::SIZE)?);
        }
        items.try_into().map_err(|items: Vec<T>| {
            Error::InvalidLayout(format!("decoded {} of {N} array elements", items.len()))
        })
    }

    fn encode<M: LinearMemory + ?Sized>(&self, memory: &mut M, offset: u32) -> Result<()> {
        memory.check_range(offset, Self::SIZE)?;
        for (i, item) in self.iter().enumerate() {
            item.encode(memory, offset + i as u32 * T::SIZE)?;
        }
        Ok(())
    }
}
