//! Names and switches describing how a guest is wired to the host.

use serde::{Deserialize, Serialize};

use crate::HostResult;

/// Guest wiring. Every field has a default, so an empty JSON object is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestConfig {
    /// Module name the default imports are registered under.
    pub import_module: String,
    /// Exported linear memory.
    pub memory_export: String,
    /// `allocBytes(size: u32) -> u32`.
    pub alloc_export: String,
    /// `freeBytes(ptr: u32, size: u32)`.
    pub free_export: String,
    /// Optional `init()`; skipped when not exported.
    pub init_export: String,
    /// Custom section carrying the 32-byte layout checksum.
    pub layout_section: String,
    /// Reject guests without an embedded layout checksum even when no
    /// checksum is expected.
    pub require_layout: bool,
    /// Maximum number of `logThis` messages retained in the host state.
    /// Later messages are still traced but not kept.
    pub guest_log_limit: usize,
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            import_module: "env".to_string(),
            memory_export: "memory".to_string(),
            alloc_export: "allocBytes".to_string(),
            free_export: "freeBytes".to_string(),
            init_export: "init".to_string(),
            layout_section: "wasmpass.layout".to_string(),
            require_layout: false,
            guest_log_limit: 1024,
        }
    }
}

impl GuestConfig {
    pub fn from_json(data: &[u8]) -> HostResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}
