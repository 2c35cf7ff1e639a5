//! Schema-driven descriptors for wasm-pass.
//!
//! Where `wasmpass-types` marshals values through Rust types generated at
//! build time, this crate marshals them from the generator's JSON layout
//! artifact at run time.  A [`Registry`] validates a [`Schema`] once and
//! hands out [`Descriptor`]s that decode guest bytes into dynamic
//! [`Value`]s and encode them back.
//!
//! Both paths share the same wire layout, so a value written through a
//! generated struct reads back identically through its descriptor.

mod codec;
pub mod registry;
pub mod value;

pub use registry::{Descriptor, Registry};
pub use value::{DynSlice, Value};
pub use wasmpass_types::{Error, LayoutChecksum, Result, Schema, TypeDef, TypeRef};
