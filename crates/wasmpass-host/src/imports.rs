//! Host functions imported by guests, and helpers for writing more of them.
//!
//! Everything an import receives from the guest is untrusted: pointer and
//! length pairs may fall outside memory and handle integers may name slots
//! that never existed.  The default imports degrade to a logged no-op
//! instead of trapping.

use tracing::{debug, info, warn};
use wasmi::{Caller, Extern, Linker, Memory};
use wasmpass_types::{Handle, LinearMemory, Slice, WasmType};

use crate::{HostError, HostResult, HostState};

/// Log target for messages emitted by guests.
pub const GUEST_LOG_TARGET: &str = "wasmpass::guest";

/// Register `logThis`, `createHandle` and `hasHandle` under `module`.
pub fn link_default_imports<T: 'static>(
    linker: &mut Linker<HostState<T>>,
    module: &str,
) -> HostResult<()> {
    // logThis(ptr: u32, len: u32)
    linker
        .func_wrap(
            module,
            "logThis",
            |mut caller: Caller<'_, HostState<T>>, ptr: u32, len: u32| {
                let memory = match caller_memory(&caller) {
                    Ok(memory) => memory,
                    Err(err) => {
                        warn!(target: GUEST_LOG_TARGET, %err, "logThis without memory");
                        return;
                    }
                };
                let message = match memory.data(&caller).read_bytes(ptr, len) {
                    Ok(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                    Err(err) => {
                        warn!(target: GUEST_LOG_TARGET, %err, "logThis with invalid range");
                        return;
                    }
                };
                info!(target: GUEST_LOG_TARGET, "{message}");
                if !caller.data_mut().push_log(message) {
                    debug!(target: GUEST_LOG_TARGET, "guest log full, message not retained");
                }
            },
        )
        .map_err(|e| HostError::Link(e.to_string()))?;

    // createHandle() -> i32
    linker
        .func_wrap(
            module,
            "createHandle",
            |mut caller: Caller<'_, HostState<T>>| -> i32 {
                let handle = caller.data_mut().handles_mut().create_handle();
                debug!(%handle, "createHandle");
                handle.to_guest()
            },
        )
        .map_err(|e| HostError::Link(e.to_string()))?;

    // hasHandle(handle: i32) -> i32
    linker
        .func_wrap(
            module,
            "hasHandle",
            |caller: Caller<'_, HostState<T>>, raw: i32| -> i32 {
                i32::from(caller.data().handles().contains(Handle::from_guest(raw)))
            },
        )
        .map_err(|e| HostError::Link(e.to_string()))?;

    Ok(())
}

/// The guest's exported memory, looked up from inside an import.
pub fn caller_memory<T>(caller: &Caller<'_, HostState<T>>) -> HostResult<Memory> {
    let name = caller.data().memory_export();
    caller
        .get_export(name)
        .and_then(Extern::into_memory)
        .ok_or_else(|| HostError::MissingExport(name.to_string()))
}

/// Decode a `V` the guest passed by pointer.
pub fn decode_from<T, V: WasmType>(caller: &Caller<'_, HostState<T>>, offset: u32) -> HostResult<V> {
    let memory = caller_memory(caller)?;
    Ok(V::decode(memory.data(caller), offset)?)
}

/// Write `value` back to the guest at `offset`.
pub fn encode_into<T, V: WasmType>(
    caller: &mut Caller<'_, HostState<T>>,
    offset: u32,
    value: &V,
) -> HostResult<()> {
    let memory = caller_memory(caller)?;
    Ok(value.encode(memory.data_mut(caller), offset)?)
}

/// Decode element `index` of a guest slice.
pub fn slice_get_from<T, V: WasmType>(
    caller: &Caller<'_, HostState<T>>,
    slice: &Slice<V>,
    index: u32,
) -> HostResult<V> {
    let memory = caller_memory(caller)?;
    Ok(slice.get(memory.data(caller), index)?)
}

/// Copy `data` into a fresh guest allocation.  Fails during the start
/// function, before the allocator has been resolved.
pub fn alloc_bytes_in<T>(caller: &mut Caller<'_, HostState<T>>, data: &[u8]) -> HostResult<Slice<u8>> {
    let allocator = caller
        .data()
        .allocator()
        .cloned()
        .ok_or_else(|| HostError::MissingExport("allocator (not yet instantiated)".to_string()))?;
    let memory = caller_memory(caller)?;
    allocator.alloc_copy(caller, memory, data)
}
