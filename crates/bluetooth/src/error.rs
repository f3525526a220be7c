//! Bluetooth errors.

use platform::CommandError;

/// Errors from radio control.
#[derive(Debug, thiserror::Error)]
pub enum BluetoothError {
    /// A BlueZ tool failed, timed out or could not be started.
    #[error(transparent)]
    Command(#[from] CommandError),
    /// A device address in tool output could not be parsed.
    #[error("invalid device address {0:?}")]
    InvalidAddress(String),
}
