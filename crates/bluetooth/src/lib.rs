//! Bluetooth radio control: adapter power and visibility, pairing agent,
//! PAN network access point, connected-peer tracking.
//!
//! Everything goes through BlueZ's command-line front ends (`bluetoothctl`,
//! `bt-agent`, `bt-network`) via [`platform::CommandRunner`], so every call
//! has a timeout and tests can script the tools.

#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod address;
pub mod agent;
pub mod ctl;
pub mod error;
pub mod nap;
pub mod state;

pub use address::PeerAddress;
pub use agent::{AgentCapability, AgentRegistration, PairingAgent};
pub use ctl::Bluetoothctl;
pub use error::BluetoothError;
pub use nap::{NapRegistration, NapServer};
pub use state::AdapterState;
