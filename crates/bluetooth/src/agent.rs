//! Pairing agent.
//!
//! BlueZ asks a registered agent to confirm pairings and service
//! authorisations. The agent runs as a `bt-agent` helper process for as
//! long as it is registered; the [`PairingAgent`] value itself is reusable
//! across registrations.

use core::time::Duration;

use platform::{ChildProcess, CommandRunner};

use crate::error::BluetoothError;

const PROGRAM: &str = "bt-agent";

/// I/O capability announced to BlueZ; decides which pairing method runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentCapability {
    /// No display, no keyboard: "just works" pairing, accepted automatically.
    #[default]
    NoInputNoOutput,
    /// Display with yes/no confirmation.
    DisplayYesNo,
}

impl AgentCapability {
    /// BlueZ capability string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoInputNoOutput => "NoInputNoOutput",
            Self::DisplayYesNo => "DisplayYesNo",
        }
    }
}

/// Agent configuration.
#[derive(Debug, Clone, Default)]
pub struct PairingAgent {
    capability: AgentCapability,
}

impl PairingAgent {
    /// Agent announcing `capability`.
    pub fn new(capability: AgentCapability) -> Self {
        Self { capability }
    }

    /// Announced capability.
    pub fn capability(&self) -> AgentCapability {
        self.capability
    }

    /// Start the agent helper and register it as the default agent.
    pub fn register<R: CommandRunner>(&self, runner: &mut R) -> Result<AgentRegistration, BluetoothError> {
        let arg = format!("--capability={}", self.capability.as_str());
        let child = runner.spawn(PROGRAM, &[arg.as_str()])?;
        tracing::info!(capability = self.capability.as_str(), pid = child.id(), "pairing agent registered");
        Ok(AgentRegistration { child })
    }
}

/// A live agent registration. Unregister explicitly; dropping the handle
/// leaves cleanup to the process handle's own drop.
pub struct AgentRegistration {
    child: Box<dyn ChildProcess>,
}

impl core::fmt::Debug for AgentRegistration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AgentRegistration")
            .field("pid", &self.child.id())
            .finish()
    }
}

impl AgentRegistration {
    /// Stop the helper, which unregisters the agent from BlueZ.
    pub fn unregister(mut self, grace: Duration) -> Result<(), BluetoothError> {
        self.child.terminate(grace)?;
        tracing::info!("pairing agent unregistered");
        Ok(())
    }
}
