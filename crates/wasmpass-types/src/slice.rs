//! Lazy views over out-of-line runs of guest values.
//!
//! A [`Slice`] is only a `(length, pointer)` pair plus the element type.
//! Nothing is copied: every [`Slice::get`] decodes the element from memory
//! again and every [`Slice::set`] writes straight through, so guest-side
//! mutations are visible to the next host read without any synchronisation.
//! Keep it that way; a cache here would silently serve stale elements after
//! the guest runs.

use std::fmt;
use std::marker::PhantomData;

use crate::layout::TypeRef;
use crate::memory::LinearMemory;
use crate::ty::WasmType;
use crate::{Error, Result};

/// `[u32 length][u32 pointer]` view of `length` consecutive `T` values.
pub struct Slice<T> {
    length: u32,
    pointer: u32,
    marker: PhantomData<fn() -> T>,
}

impl<T: WasmType> Slice<T> {
    pub fn new(pointer: u32, length: u32) -> Self {
        Self {
            length,
            pointer,
            marker: PhantomData,
        }
    }

    /// Guest address of the first element.
    pub fn pointer(&self) -> u32 {
        self.pointer
    }

    pub fn len(&self) -> u32 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Bytes spanned by the elements.
    pub fn byte_len(&self) -> u64 {
        u64::from(T::SIZE) * u64::from(self.length)
    }

    /// Guest address of element `index`.
    pub fn element_offset(&self, index: u32) -> Result<u32> {
        if index >= self.length {
            return Err(Error::IndexOutOfRange {
                index,
                length: self.length,
            });
        }
        let offset = u64::from(self.pointer) + u64::from(index) * u64::from(T::SIZE);
        u32::try_from(offset).map_err(|_| Error::AddressOverflow {
            offset,
            len: u64::from(T::SIZE),
        })
    }

    /// Decode element `index` from memory.
    pub fn get<M: LinearMemory + ?Sized>(&self, memory: &M, index: u32) -> Result<T> {
        T::decode(memory, self.element_offset(index)?)
    }

    /// Encode `value` into element `index`.
    pub fn set<M: LinearMemory + ?Sized>(&self, memory: &mut M, index: u32, value: &T) -> Result<()> {
        value.encode(memory, self.element_offset(index)?)
    }

    /// Decode elements one by one, reading memory on each step.
    pub fn iter<'a, M: LinearMemory + ?Sized>(
        &'a self,
        memory: &'a M,
    ) -> impl Iterator<Item = Result<T>> + 'a {
        (0..self.length).map(move |i| self.get(memory, i))
    }

    /// Decode all elements into a host-owned vector (a snapshot).
    pub fn to_vec<M: LinearMemory + ?Sized>(&self, memory: &M) -> Result<Vec<T>> {
        self.check_region(memory)?;
        self.iter(memory).collect()
    }

    /// Overwrite the first `values.len()` elements.
    ///
    /// Fails without writing if `values` is longer than the slice or the
    /// element region is not inside memory.
    pub fn write_all<M: LinearMemory + ?Sized>(&self, memory: &mut M, values: &[T]) -> Result<()> {
        if values.len() > self.length as usize {
            return Err(Error::IndexOutOfRange {
                index: values.len() as u32 - 1,
                length: self.length,
            });
        }
        self.check_region(memory)?;
        for (i, value) in values.iter().enumerate() {
            self.set(memory, i as u32, value)?;
        }
        Ok(())
    }

    /// Validate that the whole element region lies inside memory.
    pub fn check_region<M: LinearMemory + ?Sized>(&self, memory: &M) -> Result<()> {
        let len = u32::try_from(self.byte_len()).map_err(|_| Error::AddressOverflow {
            offset: u64::from(self.pointer),
            len: self.byte_len(),
        })?;
        memory.check_range(self.pointer, len).map(|_| ())
    }
}

impl Slice<u8> {
    /// Borrow the raw bytes of a byte slice.
    pub fn bytes<'m, M: LinearMemory + ?Sized>(&self, memory: &'m M) -> Result<&'m [u8]> {
        memory.read_bytes(self.pointer, self.length)
    }

    /// Read the bytes as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy<M: LinearMemory + ?Sized>(&self, memory: &M) -> Result<String> {
        Ok(String::from_utf8_lossy(self.bytes(memory)?).into_owned())
    }
}

/// Byte count for `length` elements of `T`, as passed to the guest
/// allocator.  Zero and counts that overflow `u32` are rejected.
pub fn allocation_size<T: WasmType>(length: u32) -> Result<u32> {
    match T::SIZE.checked_mul(length) {
        Some(bytes) if bytes > 0 => Ok(bytes),
        _ => Err(Error::InvalidAllocationSize {
            element_size: T::SIZE,
            length,
        }),
    }
}

impl<T: WasmType> WasmType for Slice<T> {
    const SIZE: u32 = 8;

    fn type_ref() -> TypeRef {
        TypeRef::Slice(Box::new(T::type_ref()))
    }

    fn decode<M: LinearMemory + ?Sized>(memory: &M, offset: u32) -> Result<Self> {
        memory.check_range(offset, Self::SIZE)?;
        let length = memory.read::<u32>(offset)?;
        let pointer = memory.read::<u32>(offset + 4)?;
        Ok(Self::new(pointer, length))
    }

    fn encode<M: LinearMemory + ?Sized>(&self, memory: &mut M, offset: u32) -> Result<()> {
        memory.check_range(offset, Self::SIZE)?;
        memory.write(offset, self.length)?;
        memory.write(offset + 4, self.pointer)
    }
}

impl<T> Clone for Slice<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Slice<T> {}

impl<T> PartialEq for Slice<T> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.pointer == other.pointer
    }
}

impl<T> Eq for Slice<T> {}

impl<T> fmt::Debug for Slice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slice")
            .field("element", &std::any::type_name::<T>())
            .field("length", &self.length)
            .field("pointer", &self.pointer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_reads_length_then_pointer() {
        let mut mem = vec![0u8; 16];
        mem.write(4, 3u32).unwrap();
        mem.write(8, 0x20u32).unwrap();
        let slice = Slice::<u16>::decode(&mem, 4).unwrap();
        assert_eq!(slice.len(), 3);
        assert_eq!(slice.pointer(), 0x20);
        assert_eq!(slice.byte_len(), 6);
    }

    #[test]
    fn test_set_then_get() {
        let mut mem = vec![0u8; 64];
        let slice = Slice::<u16>::new(10, 3);
        for (i, v) in [10u16, 20, 30].iter().enumerate() {
            slice.set(&mut mem, i as u32, v).unwrap();
            assert_eq!(slice.get(&mem, i as u32).unwrap(), *v);
        }
        assert_eq!(slice.to_vec(&mem).unwrap(), vec![10, 20, 30]);
        assert_eq!(&mem[10..16], &[10, 0, 20, 0, 30, 0]);
    }

    #[test]
    fn test_index_out_of_range() {
        let mut mem = vec![0u8; 64];
        let slice = Slice::<u32>::new(0, 2);
        assert_eq!(
            slice.get(&mem, 2).unwrap_err(),
            Error::IndexOutOfRange { index: 2, length: 2 }
        );
        assert!(slice.set(&mut mem, 5, &1).is_err());
        assert!(mem.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reads_are_never_cached() {
        let mut mem = vec![0u8; 16];
        let slice = Slice::<u8>::new(4, 4);
        assert_eq!(slice.get(&mem, 1).unwrap(), 0);
        mem[5] = 77;
        assert_eq!(slice.get(&mem, 1).unwrap(), 77);
    }

    #[test]
    fn test_element_address_overflow() {
        let slice = Slice::<u64>::new(u32::MAX - 4, 2);
        assert_eq!(
            slice.element_offset(1).unwrap_err(),
            Error::AddressOverflow {
                offset: u64::from(u32::MAX) + 4,
                len: 8,
            }
        );
        assert!(slice.get(&vec![0u8; 16], 1).unwrap_err().to_string().contains("32-bit"));
    }

    #[test]
    fn test_write_all_is_all_or_nothing() {
        let mut mem = vec![0u8; 8];
        let slice = Slice::<u16>::new(4, 3);
        assert!(slice.write_all(&mut mem, &[1, 2]).is_err());
        assert!(mem.iter().all(|&b| b == 0));
        assert!(slice.write_all(&mut mem, &[1, 2, 3, 4]).is_err());
    }

    #[test]
    fn test_byte_slice_as_text() {
        let mut mem = vec![0u8; 16];
        mem.write_bytes(2, b"hello").unwrap();
        let slice = Slice::<u8>::new(2, 5);
        assert_eq!(slice.to_string_lossy(&mem).unwrap(), "hello");
        assert!(Slice::<u8>::new(14, 5).bytes(&mem).is_err());
    }

    #[test]
    fn test_allocation_size() {
        assert_eq!(allocation_size::<u16>(3).unwrap(), 6);
        assert_eq!(
            allocation_size::<u16>(0).unwrap_err(),
            Error::InvalidAllocationSize {
                element_size: 2,
                length: 0
            }
        );
        assert!(allocation_size::<u64>(u32::MAX).is_err());
    }
}
