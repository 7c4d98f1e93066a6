//! Construction of the run-level `meta` envelope.

use crate::envelope::{Meta, Product};

/// Version of the message protocol emitted by this implementation.
pub const PROTOCOL_VERSION: &str = "27.0.2";

/// Build the `meta` payload for a run.
///
/// The implementation product names the adapter crate; runtime, OS and CPU
/// describe the host platform.
///
/// # Examples
/// ```
/// use cuke_harness_messages::make_meta;
///
/// let meta = make_meta("cuke-harness", env!("CARGO_PKG_VERSION"));
/// assert_eq!(meta.implementation.name, "cuke-harness");
/// assert_eq!(meta.os.name, std::env::consts::OS);
/// ```
#[must_use]
pub fn make_meta(implementation_name: &str, implementation_version: &str) -> Meta {
    Meta {
        protocol_version: PROTOCOL_VERSION.to_string(),
        implementation: Product {
            name: implementation_name.to_string(),
            version: Some(implementation_version.to_string()),
        },
        runtime: Product {
            name: "Rust".to_string(),
            version: None,
        },
        os: Product {
            name: std::env::consts::OS.to_string(),
            version: None,
        },
        cpu: Product {
            name: std::env::consts::ARCH.to_string(),
            version: None,
        },
    }
}
