//! Adapter control through `bluetoothctl`.

use core::time::Duration;

use platform::config::COMMAND_TIMEOUT;
use platform::CommandRunner;

use crate::address::{parse_device_list, PeerAddress};
use crate::error::BluetoothError;
use crate::state::AdapterState;

const PROGRAM: &str = "bluetoothctl";

/// Non-interactive `bluetoothctl` front end.
///
/// Every call is a separate `bluetoothctl <command>` run bounded by the
/// configured timeout; the tracked [`AdapterState`] is updated only when
/// the command succeeds.
#[derive(Debug, Clone)]
pub struct Bluetoothctl {
    timeout: Duration,
    state: AdapterState,
}

impl Default for Bluetoothctl {
    fn default() -> Self {
        Self::new()
    }
}

impl Bluetoothctl {
    /// Front end with the default command timeout.
    pub fn new() -> Self {
        Self::with_timeout(COMMAND_TIMEOUT)
    }

    /// Front end with a custom command timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            state: AdapterState::new(),
        }
    }

    /// What this front end last set.
    pub fn state(&self) -> &AdapterState {
        &self.state
    }

    fn run<R: CommandRunner>(&self, runner: &mut R, args: &[&str]) -> Result<String, BluetoothError> {
        let out = runner.run_checked(PROGRAM, args, self.timeout)?;
        Ok(out.stdout)
    }

    /// Switch the radio on or off.
    pub fn power<R: CommandRunner>(&mut self, runner: &mut R, on: bool) -> Result<(), BluetoothError> {
        self.run(runner, &["power", on_off(on)])?;
        self.state.on_powered(on);
        tracing::info!(on, "bluetooth power");
        Ok(())
    }

    /// Set the name other devices see.
    pub fn set_alias<R: CommandRunner>(&mut self, runner: &mut R, alias: &str) -> Result<(), BluetoothError> {
        self.run(runner, &["system-alias", alias])?;
        Ok(())
    }

    /// Make the adapter visible and pairable with no timeout, or hide it.
    pub fn set_visible<R: CommandRunner>(&mut self, runner: &mut R, visible: bool) -> Result<(), BluetoothError> {
        if visible {
            self.run(runner, &["discoverable-timeout", "0"])?;
        }
        self.run(runner, &["discoverable", on_off(visible)])?;
        self.run(runner, &["pairable", on_off(visible)])?;
        self.state.on_visibility(visible, visible);
        tracing::info!(visible, "bluetooth visibility");
        Ok(())
    }

    /// Currently connected peers.
    pub fn connected_peers<R: CommandRunner>(&mut self, runner: &mut R) -> Result<Vec<PeerAddress>, BluetoothError> {
        let out = self.run(runner, &["devices", "Connected"])?;
        let peers = parse_device_list(&out);
        self.state.on_peers(&peers);
        Ok(peers)
    }

    /// Drop the connection to `peer`; the pairing is kept.
    pub fn disconnect<R: CommandRunner>(&mut self, runner: &mut R, peer: PeerAddress) -> Result<(), BluetoothError> {
        let addr = peer.to_string();
        self.run(runner, &["disconnect", addr.as_str()])?;
        self.state.on_disconnected(peer);
        tracing::info!(peer = %addr, "bluetooth peer disconnected");
        Ok(())
    }

    /// Disconnect every connected peer.
    ///
    /// Failures for individual peers are logged and skipped; the number of
    /// peers disconnected is returned.
    pub fn disconnect_all<R: CommandRunner>(&mut self, runner: &mut R) -> Result<usize, BluetoothError> {
        let peers = self.connected_peers(runner)?;
        let mut done = 0;
        for peer in peers {
            match self.disconnect(runner, peer) {
                Ok(()) => done += 1,
                Err(e) => tracing::warn!(peer = %peer, error = %e, "disconnect failed"),
            }
        }
        Ok(done)
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}
