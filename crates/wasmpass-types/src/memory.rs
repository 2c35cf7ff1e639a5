//! Bounds-checked access to a guest's linear memory.
//!
//! [`LinearMemory`] is implemented for plain byte buffers so the same codecs
//! run against a `wasmi` memory slice, a `Vec<u8>` in tests, or a scratch
//! buffer used to stage an encode.  Every access validates the whole byte
//! range first and fails with [`Error::OutOfBounds`] before touching memory.

use std::ops::Range;

use crate::primitive::Primitive;
use crate::{Error, Result};

/// A byte-addressable view over linear memory.
///
/// Offsets are guest addresses (`u32`); the backing buffer may be shorter
/// than the 4 GiB address space, in which case out-of-range accesses fail.
pub trait LinearMemory {
    fn bytes(&self) -> &[u8];

    fn bytes_mut(&mut self) -> &mut [u8];

    /// Current size of the memory in bytes.
    fn byte_len(&self) -> usize {
        self.bytes().len()
    }

    /// Validate that `len` bytes starting at `offset` are addressable and
    /// return the corresponding buffer range.
    fn check_range(&self, offset: u32, len: u32) -> Result<Range<usize>> {
        let start = u64::from(offset);
        let end = start + u64::from(len);
        let memory_len = self.byte_len();
        if end > memory_len as u64 {
            return Err(Error::OutOfBounds {
                offset: start,
                len: u64::from(len),
                memory_len,
            });
        }
        Ok(start as usize..end as usize)
    }

    fn read<P: Primitive>(&self, offset: u32) -> Result<P> {
        let range = self.check_range(offset, P::SIZE)?;
        Ok(P::from_le_slice(&self.bytes()[range]))
    }

    fn write<P: Primitive>(&mut self, offset: u32, value: P) -> Result<()> {
        let range = self.check_range(offset, P::SIZE)?;
        value.write_le_slice(&mut self.bytes_mut()[range]);
        Ok(())
    }

    fn read_bytes(&self, offset: u32, len: u32) -> Result<&[u8]> {
        let range = self.check_range(offset, len)?;
        Ok(&self.bytes()[range])
    }

    fn write_bytes(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let len = u32::try_from(data.len()).map_err(|_| Error::OutOfBounds {
            offset: u64::from(offset),
            len: data.len() as u64,
            memory_len: self.byte_len(),
        })?;
        let range = self.check_range(offset, len)?;
        self.bytes_mut()[range].copy_from_slice(data);
        Ok(())
    }
}

impl LinearMemory for [u8] {
    fn bytes(&self) -> &[u8] {
        self
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}

impl LinearMemory for Vec<u8> {
    fn bytes(&self) -> &[u8] {
        self
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}

impl<const N: usize> LinearMemory for [u8; N] {
    fn bytes(&self) -> &[u8] {
        self
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}
