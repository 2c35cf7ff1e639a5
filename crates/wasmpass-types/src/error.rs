use thiserror::Error;

use crate::Handle;

/// Errors raised while marshalling values across the guest boundary.
///
/// Every variant is fatal to the operation that produced it but leaves the
/// memory untouched: bounds and sizes are validated before any byte is
/// written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A decode/encode byte range does not fit in linear memory.
    #[error("out of bounds: {len} bytes at offset {offset} exceed memory of {memory_len} bytes")]
    OutOfBounds {
        offset: u64,
        len: u64,
        memory_len: usize,
    },

    /// An address computed from a guest pointer does not fit in 32 bits.
    #[error("address overflow: {len} bytes at offset {offset} exceed the 32-bit address space")]
    AddressOverflow { offset: u64, len: u64 },

    /// A slice element index is not below the slice length.
    #[error("index {index} out of range for slice of length {length}")]
    IndexOutOfRange { index: u32, length: u32 },

    /// The computed allocation byte count is zero or does not fit in `u32`.
    #[error("invalid allocation size: {length} elements of {element_size} bytes")]
    InvalidAllocationSize { element_size: u32, length: u32 },

    /// A type reference has no size metadata (unregistered type name).
    #[error("type `{0}` has no known size")]
    UnknownSizeType(String),

    /// The handle does not name a slot in the table.
    #[error("handle {0} is absent")]
    HandleAbsent(Handle),

    /// A dynamic value does not match the descriptor it was encoded with.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// A layout schema is internally inconsistent.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_display() {
        let err = Error::OutOfBounds {
            offset: 14,
            len: 4,
            memory_len: 16,
        };
        assert_eq!(
            err.to_string(),
            "out of bounds: 4 bytes at offset 14 exceed memory of 16 bytes"
        );
    }

    #[test]
    fn test_address_overflow_display() {
        let err = Error::AddressOverflow {
            offset: 0x1_0000_0003,
            len: 8,
        };
        assert_eq!(
            err.to_string(),
            "address overflow: 8 bytes at offset 4294967299 exceed the 32-bit address space"
        );
    }

    #[test]
    fn test_handle_absent_display() {
        let err = Error::HandleAbsent(Handle::from_raw(7));
        assert_eq!(err.to_string(), "handle #7 is absent");
    }
}
