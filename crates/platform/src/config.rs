//! Application configuration and constants
//!
//! This module defines central configuration values used across the
//! application. Naming, timing and network constants should reference these
//! rather than hardcoding values.

use core::time::Duration;

/// The application name; also the Bluetooth alias and certificate CN.
pub const APP_NAME: &str = "etyper";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Development mode banner
pub const fn banner() -> &'static str {
    "=== etyper - E-Paper Typewriter ==="
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Documents directory name, relative to the user's home directory.
pub const DOCS_DIR_NAME: &str = "etyper_docs";

/// File in the documents directory holding the last opened document path.
pub const LAST_DOC_FILE: &str = ".last_doc";

/// File in the documents directory holding the preferred keyboard layout.
pub const LAYOUT_FILE: &str = ".layout";

/// Directory (inside the documents directory) for the TLS certificate.
pub const CERT_DIR_NAME: &str = ".ssl";

/// Document file name prefix.
pub const DOC_PREFIX: &str = "doc_";

/// Document file name extension.
pub const DOC_EXTENSION: &str = ".txt";

/// Name of the archive served by the "download all" endpoint.
pub const ARCHIVE_NAME: &str = "etyper_docs.zip";

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Maximum time between two full refreshes while partial refreshing.
pub const MAX_PARTIAL_INTERVAL: Duration = Duration::from_secs(300);

/// BUSY line poll interval.
pub const BUSY_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Upper bound on a single BUSY wait.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounded wait on the input source per main-loop iteration.
pub const INPUT_WAIT: Duration = Duration::from_millis(500);

/// Interval between keyboard rediscovery attempts.
pub const KEYBOARD_RETRY: Duration = Duration::from_secs(1);

/// Autosave interval for a dirty document.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(10);

/// File-sharing mode auto-off.
pub const FILE_SERVER_TIMEOUT: Duration = Duration::from_secs(300);

/// Default timeout for short external commands (`ip`, `bluetoothctl`, ...).
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for certificate generation, which does an RSA keygen.
pub const CERT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Grace period between SIGTERM and SIGKILL for helper processes.
pub const PROCESS_GRACE: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Bridge interface carrying the Bluetooth PAN.
pub const BRIDGE_NAME: &str = "pan0";

/// Address of the device on the bridge.
pub const BRIDGE_ADDRESS: &str = "10.44.0.1";

/// Prefix length of the bridge network.
pub const BRIDGE_PREFIX_LEN: u8 = 24;

/// DHCP lease range handed to paired peers.
pub const DHCP_RANGE: &str = "10.44.0.10,10.44.0.50,255.255.255.0,1h";

/// HTTPS port.
pub const HTTPS_PORT: u16 = 443;

/// Plain HTTP fallback port.
pub const HTTP_PORT: u16 = 8080;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_etyper() {
        assert_eq!(APP_NAME, "etyper");
    }

    #[test]
    fn busy_timeout_is_multiple_of_poll_interval() {
        assert_eq!(BUSY_TIMEOUT.as_millis() % BUSY_POLL_INTERVAL.as_millis(), 0);
    }

    #[test]
    fn autosave_is_shorter_than_ghosting_interval() {
        assert!(AUTOSAVE_INTERVAL < MAX_PARTIAL_INTERVAL);
    }
}
