//! PAN network access point.
//!
//! Registers the NAP profile with BlueZ so paired devices can join the given
//! bridge. Registration lives as long as the `bt-network` helper runs.

use core::time::Duration;

use platform::{ChildProcess, CommandRunner};

use crate::error::BluetoothError;

const PROGRAM: &str = "bt-network";

/// NAP server configuration: which bridge connecting peers are added to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NapServer {
    bridge: String,
}

impl NapServer {
    /// NAP serving onto `bridge`.
    pub fn new(bridge: impl Into<String>) -> Self {
        Self {
            bridge: bridge.into(),
        }
    }

    /// Bridge interface name.
    pub fn bridge(&self) -> &str {
        &self.bridge
    }

    /// Register the NAP server.
    pub fn register<R: CommandRunner>(&self, runner: &mut R) -> Result<NapRegistration, BluetoothError> {
        let child = runner.spawn(PROGRAM, &["-s", "nap", self.bridge.as_str()])?;
        tracing::info!(bridge = %self.bridge, pid = child.id(), "NAP registered");
        Ok(NapRegistration { child })
    }
}

/// A live NAP registration.
pub struct NapRegistration {
    child: Box<dyn ChildProcess>,
}

impl core::fmt::Debug for NapRegistration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NapRegistration")
            .field("pid", &self.child.id())
            .finish()
    }
}

impl NapRegistration {
    /// Unregister the NAP server.
    pub fn unregister(mut self, grace: Duration) -> Result<(), BluetoothError> {
        self.child.terminate(grace)?;
        tracing::info!("NAP unregistered");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use platform::mocks::MockRunner;

    #[test]
    fn test_bt_nap_registers_on_bridge() {
        let mut runner = MockRunner::new();
        let reg = NapServer::new("pan0").register(&mut runner).unwrap();
        assert_eq!(runner.calls(), ["bt-network -s nap pan0"]);
        reg.unregister(Duration::from_secs(3)).unwrap();
        assert_eq!(runner.terminated(), ["bt-network -s nap pan0"]);
    }
}
