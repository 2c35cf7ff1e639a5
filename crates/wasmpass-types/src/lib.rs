//! Shared marshalling types for wasm-pass.
//!
//! This crate interprets the bytes of a guest's linear memory as typed
//! values and writes them back at the same layout.  It knows nothing about
//! the engine running the guest: everything operates on a borrowed byte
//! buffer through [`LinearMemory`].
//!
//! # Layout contract
//!
//! Every type implementing [`WasmType`] declares a byte `SIZE` that must
//! match what the guest compiler produced for the same logical type.  Struct
//! field offsets come from the code generator (see [`wasm_struct!`]) and
//! all integers are little-endian.
//!
//! ```text
//! Slice<T>    : [u32 length][u32 pointer]            (8 bytes)
//! EnumValue<E>: [E::Repr]                            (repr width)
//! Handle      : [u32 index into the host HandleTable] (4 bytes)
//! ```

mod error;
pub mod enums;
pub mod handle;
pub mod layout;
pub mod memory;
pub mod primitive;
pub mod slice;
pub mod structs;
pub mod ty;

pub use enums::{EnumKind, EnumMember, EnumType, EnumValue};
pub use error::Error;
pub use handle::{Handle, HandleTable};
pub use layout::{LayoutChecksum, Schema, TypeDef, TypeRef};
pub use memory::LinearMemory;
pub use primitive::{IntRepr, Primitive, PrimitiveKind};
pub use slice::Slice;
pub use structs::{Field, Struct};
pub use ty::{size_of, WasmType};

/// Result type used throughout wasm-pass.
pub type Result<T> = std::result::Result<T, Error>;
