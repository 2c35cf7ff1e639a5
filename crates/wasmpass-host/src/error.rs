//! Host embedding error types.

use thiserror::Error;
use wasmpass_types::LayoutChecksum;

/// Errors raised while instantiating or driving a guest.
#[derive(Debug, Error)]
pub enum HostError {
    /// A marshalling operation failed.
    #[error(transparent)]
    Types(#[from] wasmpass_types::Error),

    /// The engine rejected the module or the guest trapped.
    #[error("wasm: {0}")]
    Wasm(#[from] wasmi::Error),

    /// A required guest export is missing.
    #[error("guest does not export `{0}`")]
    MissingExport(String),

    /// A host import could not be defined.
    #[error("failed to link import: {0}")]
    Link(String),

    /// The guest was compiled against a different layout schema.
    #[error("layout mismatch: host expects {expected}, guest embeds {found}")]
    LayoutMismatch {
        expected: LayoutChecksum,
        found: LayoutChecksum,
    },

    /// A layout checksum is required but the guest carries none.
    #[error("guest does not embed a layout checksum")]
    LayoutMissing,

    /// The guest configuration could not be read.
    #[error("invalid guest config: {0}")]
    Config(#[from] serde_json::Error),

    /// The module binary could not be scanned.
    #[error("malformed module: {0}")]
    Parse(#[from] wasmparser::BinaryReaderError),
}

/// Host result type alias.
pub type HostResult<T> = Result<T, HostError>;

/// Surface a host failure inside an import as a guest trap.
impl From<HostError> for wasmi::Error {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Wasm(err) => err,
            other => wasmi::Error::new(other.to_string()),
        }
    }
}
