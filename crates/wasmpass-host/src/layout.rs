//! Layout checksum exchange between the host and a guest module.
//!
//! The code generator embeds the 32-byte SHA-256 of its layout schema as a
//! custom section.  The host compares it with the checksum of the schema it
//! was built against before the module is instantiated.

use tracing::debug;
use wasmparser::{Parser, Payload};
use wasmpass_types::{Error, LayoutChecksum};

use crate::{HostError, HostResult};

/// Read the layout checksum from the custom section named `section`.
///
/// Returns `Ok(None)` when the module has no such section.
pub fn embedded_checksum(wasm: &[u8], section: &str) -> HostResult<Option<LayoutChecksum>> {
    for payload in Parser::new(0).parse_all(wasm) {
        if let Payload::CustomSection(reader) = payload? {
            if reader.name() == section {
                let data = reader.data();
                return LayoutChecksum::from_bytes(data).map(Some).ok_or_else(|| {
                    HostError::Types(Error::InvalidLayout(format!(
                        "`{section}` section holds {} bytes, expected 32",
                        data.len()
                    )))
                });
            }
        }
    }
    Ok(None)
}

/// Check an embedded checksum against the expected one.
///
/// An explicit expectation always requires the section; `required` only
/// matters when the host has no expectation of its own.
pub fn verify(
    expected: Option<LayoutChecksum>,
    embedded: Option<LayoutChecksum>,
    required: bool,
) -> HostResult<()> {
    match (expected, embedded) {
        (Some(expected), Some(found)) if expected != found => {
            Err(HostError::LayoutMismatch { expected, found })
        }
        (Some(_), None) => Err(HostError::LayoutMissing),
        (None, None) if required => Err(HostError::LayoutMissing),
        (_, found) => {
            debug!(checksum = ?found, "layout accepted");
            Ok(())
        }
    }
}
