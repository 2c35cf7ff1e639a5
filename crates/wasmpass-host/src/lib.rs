//! wasmi embedding for wasm-pass guests.
//!
//! [`GuestBuilder`] links the default host imports, checks the guest's
//! embedded layout checksum and instantiates it; the resulting [`Guest`]
//! marshals values in and out of its linear memory and allocates through
//! the guest's own `allocBytes`/`freeBytes` exports.
//!
//! # Example
//!
//! ```ignore
//! let mut builder = GuestBuilder::<Identity>::new(GuestConfig::default())?;
//! builder.linker_mut().func_wrap("env", "createIdentity", |mut caller: Caller<'_, HostState<Identity>>, h: i32| {
//!     let _ = caller.data_mut().handles_mut().populate(Handle::from_guest(h), Identity::default());
//! })?;
//! let mut guest = builder.expect_layout(&schema).instantiate(&wasm)?;
//! guest.init()?;
//! ```

mod error;
pub mod allocator;
pub mod config;
pub mod guest;
pub mod imports;
pub mod layout;
pub mod state;

pub use allocator::Allocator;
pub use config::GuestConfig;
pub use error::{HostError, HostResult};
pub use guest::{Guest, GuestBuilder};
pub use state::HostState;
