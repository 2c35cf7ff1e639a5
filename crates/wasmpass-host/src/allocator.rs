//! Dynamic allocation inside guest memory through the guest's own
//! allocator exports.

use tracing::{debug, warn};
use wasmi::{AsContextMut, Instance, Memory, Store, TypedFunc};
use wasmpass_types::slice::allocation_size;
use wasmpass_types::{Error, LinearMemory, Slice, WasmType};

use crate::{GuestConfig, HostError, HostResult};

/// Typed handles to `allocBytes(size) -> ptr` and `freeBytes(ptr, size)`.
///
/// Byte counts are derived from the element type, so a slice returned by
/// [`Allocator::alloc`] is released with exactly the size it was allocated
/// with.  Zero-byte requests never reach the guest.
#[derive(Debug, Clone)]
pub struct Allocator {
    alloc: TypedFunc<u32, u32>,
    free: TypedFunc<(u32, u32), ()>,
}

impl Allocator {
    /// Resolve the allocator exports named in `config`.
    pub fn new<S>(store: &Store<S>, instance: &Instance, config: &GuestConfig) -> HostResult<Self> {
        let lookup = |name: &str| {
            instance
                .get_func(store, name)
                .ok_or_else(|| HostError::MissingExport(name.to_string()))
        };
        Ok(Self {
            alloc: lookup(&config.alloc_export)?.typed(store)?,
            free: lookup(&config.free_export)?.typed(store)?,
        })
    }

    /// Allocate room for `length` elements of `T`.
    pub fn alloc<T: WasmType>(&self, mut ctx: impl AsContextMut, length: u32) -> HostResult<Slice<T>> {
        let size = allocation_size::<T>(length)?;
        let pointer = self.alloc_bytes(&mut ctx, size)?;
        Ok(Slice::new(pointer, length))
    }

    /// Release a slice obtained from [`Allocator::alloc`].
    pub fn free<T: WasmType>(&self, mut ctx: impl AsContextMut, slice: Slice<T>) -> HostResult<()> {
        let size = allocation_size::<T>(slice.len())?;
        self.free_bytes(&mut ctx, slice.pointer(), size)
    }

    /// Allocate a byte slice in `memory` holding a copy of `data`.
    ///
    /// If the guest hands back a region that does not fit in memory the
    /// allocation is released again before the error is returned.
    pub fn alloc_copy(
        &self,
        mut ctx: impl AsContextMut,
        memory: Memory,
        data: &[u8],
    ) -> HostResult<Slice<u8>> {
        let length = u32::try_from(data.len()).map_err(|_| Error::InvalidAllocationSize {
            element_size: 1,
            length: u32::MAX,
        })?;
        let slice = self.alloc::<u8>(&mut ctx, length)?;
        let copied = memory
            .data_mut(ctx.as_context_mut())
            .write_bytes(slice.pointer(), data);
        if let Err(err) = copied {
            warn!(pointer = slice.pointer(), length, %err, "allocation outside memory, releasing");
            self.free(&mut ctx, slice)?;
            return Err(err.into());
        }
        Ok(slice)
    }

    /// Raw `allocBytes` call.
    pub fn alloc_bytes(&self, mut ctx: impl AsContextMut, size: u32) -> HostResult<u32> {
        let pointer = self.alloc.call(&mut ctx, size)?;
        debug!(size, pointer, "allocBytes");
        Ok(pointer)
    }

    /// Raw `freeBytes` call.
    pub fn free_bytes(&self, mut ctx: impl AsContextMut, pointer: u32, size: u32) -> HostResult<()> {
        debug!(size, pointer, "freeBytes");
        self.free.call(&mut ctx, (pointer, size))?;
        Ok(())
    }
}
