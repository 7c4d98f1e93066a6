//! Deterministic socket path derivation for the local relay.

use std::path::PathBuf;

/// Derive the local relay endpoint for a listener identifier.
///
/// The identifier is conventionally the listener's process id. On POSIX
/// platforms the result is a socket file under the system temporary
/// directory; on Windows it is a named pipe.
///
/// # Examples
/// ```
/// use cuke_harness_messages::derive_socket_path;
///
/// let path = derive_socket_path("12345");
/// let rendered = path.to_string_lossy();
/// assert!(rendered.contains("cuke-harness-messages-12345"));
/// ```
#[must_use]
pub fn derive_socket_path(id: &str) -> PathBuf {
    let identifier = format!("cuke-harness-messages-{id}");
    if cfg!(windows) {
        PathBuf::from(format!(r"\\.\pipe\{identifier}"))
    } else {
        std::env::temp_dir().join(format!("{identifier}.sock"))
    }
}
