//! File-sharing session: every networking resource the file-server mode
//! needs, acquired in a fixed order and released in reverse.
//!
//! Acquisition stops at the first failure and rolls back what it already
//! holds. Teardown runs every release step regardless of earlier failures
//! and reports the failures as warnings; running it twice is harmless.

use core::fmt;
use std::net::SocketAddr;

use bluetooth::{AgentRegistration, NapRegistration};
use platform::config::PROCESS_GRACE;
use platform::ChildProcess;

use crate::server::ServerHandle;

pub mod backend;

pub use backend::{BackendError, Bridge, NetworkBackend, ServerConfig, ServerKind, SystemBackend};

/// One acquire/release step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Bluetooth radio power.
    Radio,
    /// Pairing agent.
    Agent,
    /// Discoverable/pairable.
    Visibility,
    /// Bridge interface.
    Bridge,
    /// Bridge address and forwarding.
    Address,
    /// NAP registration.
    Nap,
    /// DHCP helper.
    Dhcp,
    /// HTTPS server.
    TlsServer,
    /// HTTP server.
    PlainServer,
    /// Disconnecting peers.
    Peers,
    /// Stale resources from an earlier run.
    Stale,
}

impl Step {
    /// Name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Radio => "radio power",
            Self::Agent => "pairing agent",
            Self::Visibility => "visibility",
            Self::Bridge => "bridge",
            Self::Address => "bridge address",
            Self::Nap => "NAP",
            Self::Dhcp => "DHCP",
            Self::TlsServer => "https server",
            Self::PlainServer => "http server",
            Self::Peers => "peer disconnect",
            Self::Stale => "stale cleanup",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A release step that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseWarning {
    /// Which step.
    pub step: Step,
    /// Error text.
    pub message: String,
}

/// Outcome of a teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Release steps that ran.
    pub attempted: Vec<Step>,
    /// Steps that failed.
    pub warnings: Vec<ReleaseWarning>,
}

impl TeardownReport {
    fn record<E: fmt::Display>(&mut self, step: Step, result: Result<(), E>) {
        self.attempted.push(step);
        if let Err(e) = result {
            tracing::warn!(step = step.as_str(), error = %e, "release failed");
            self.warnings.push(ReleaseWarning {
                step,
                message: e.to_string(),
            });
        }
    }

    /// Nothing failed.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A resource could not be acquired; everything acquired before it
    /// has been released.
    #[error("acquiring {step} failed: {source}")]
    Acquire {
        /// Failed step.
        step: Step,
        /// Cause.
        #[source]
        source: BackendError,
        /// Rollback outcome.
        rollback: TeardownReport,
    },
}

/// Resources held by an active file-sharing session.
#[derive(Default)]
pub struct ResourceSession {
    radio_on: bool,
    agent: Option<AgentRegistration>,
    discoverable: bool,
    bridge: Option<Bridge>,
    nap: Option<NapRegistration>,
    dhcp: Option<Box<dyn ChildProcess>>,
    tls_server: Option<Box<dyn ServerHandle>>,
    plain_server: Option<Box<dyn ServerHandle>>,
}

impl fmt::Debug for ResourceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSession")
            .field("radio_on", &self.radio_on)
            .field("agent", &self.agent)
            .field("discoverable", &self.discoverable)
            .field("bridge", &self.bridge)
            .field("nap", &self.nap)
            .field("dhcp", &self.dhcp.as_ref().map(|c| c.id()))
            .field("tls_server", &self.server_addr(ServerKind::Tls))
            .field("plain_server", &self.server_addr(ServerKind::Plain))
            .finish()
    }
}

fn at<E: Into<BackendError>>(step: Step) -> impl FnOnce(E) -> (Step, BackendError) {
    move |e| (step, e.into())
}

impl ResourceSession {
    /// Acquire everything, in order. On failure the partial session is
    /// torn down before the error is returned.
    pub fn acquire<B: NetworkBackend>(backend: &mut B) -> Result<Self, SessionError> {
        let mut session = Self::default();
        match session.acquire_all(backend) {
            Ok(()) => {
                tracing::info!("file-sharing session up");
                Ok(session)
            }
            Err((step, source)) => {
                tracing::warn!(step = step.as_str(), error = %source, "session acquisition failed, rolling back");
                let rollback = session.teardown(backend);
                Err(SessionError::Acquire {
                    step,
                    source,
                    rollback,
                })
            }
        }
    }

    fn acquire_all<B: NetworkBackend>(&mut self, backend: &mut B) -> Result<(), (Step, BackendError)> {
        backend.radio_power(true).map_err(at(Step::Radio))?;
        self.radio_on = true;

        self.agent = Some(backend.register_agent().map_err(at(Step::Agent))?);

        // Mark before the call: a half-applied visibility change still
        // needs reverting.
        self.discoverable = true;
        backend.set_visible(true).map_err(at(Step::Visibility))?;

        let bridge = backend.create_bridge().map_err(at(Step::Bridge))?;
        let bridge = self.bridge.insert(bridge).clone();
        backend.configure_bridge(&bridge).map_err(at(Step::Address))?;

        self.nap = Some(backend.register_nap(&bridge).map_err(at(Step::Nap))?);
        self.dhcp = Some(backend.start_dhcp(&bridge).map_err(at(Step::Dhcp))?);

        self.tls_server = Some(backend.start_server(ServerKind::Tls).map_err(at(Step::TlsServer))?);
        self.plain_server = Some(
            backend
                .start_server(ServerKind::Plain)
                .map_err(at(Step::PlainServer))?,
        );
        Ok(())
    }

    /// Release everything held, in reverse order. Every step runs even if
    /// an earlier one failed.
    pub fn teardown<B: NetworkBackend>(&mut self, backend: &mut B) -> TeardownReport {
        let mut report = TeardownReport::default();

        if let Some(mut server) = self.plain_server.take() {
            report.record(Step::PlainServer, server.stop());
        }
        if let Some(mut server) = self.tls_server.take() {
            report.record(Step::TlsServer, server.stop());
        }
        if let Some(mut dhcp) = self.dhcp.take() {
            report.record(Step::Dhcp, dhcp.terminate(PROCESS_GRACE));
        }
        if let Some(nap) = self.nap.take() {
            report.record(Step::Nap, nap.unregister(PROCESS_GRACE));
        }
        if core::mem::take(&mut self.discoverable) {
            report.record(Step::Visibility, backend.set_visible(false));
        }
        if let Some(agent) = self.agent.take() {
            report.record(Step::Agent, agent.unregister(PROCESS_GRACE));
        }
        if self.radio_on {
            report.record(Step::Peers, backend.disconnect_peers().map(drop));
        }
        if let Some(bridge) = self.bridge.take() {
            report.record(Step::Bridge, backend.remove_bridge(&bridge));
        }
        if core::mem::take(&mut self.radio_on) {
            report.record(Step::Radio, backend.radio_power(false));
        }

        if !report.attempted.is_empty() {
            tracing::info!(
                steps = report.attempted.len(),
                warnings = report.warnings.len(),
                "file-sharing session torn down"
            );
        }
        report
    }

    /// Whether anything is still held.
    pub fn is_active(&self) -> bool {
        self.radio_on
            || self.agent.is_some()
            || self.discoverable
            || self.bridge.is_some()
            || self.nap.is_some()
            || self.dhcp.is_some()
            || self.tls_server.is_some()
            || self.plain_server.is_some()
    }

    /// Bound address of a running server.
    pub fn server_addr(&self, kind: ServerKind) -> Option<SocketAddr> {
        let server = match kind {
            ServerKind::Tls => self.tls_server.as_ref(),
            ServerKind::Plain => self.plain_server.as_ref(),
        };
        server.map(|s| s.local_addr())
    }
}

impl Drop for ResourceSession {
    fn drop(&mut self) {
        if self.is_active() {
            tracing::warn!("file-sharing session dropped without teardown");
        }
    }
}

/// Undo what a crashed earlier run may have left behind: DHCP helpers on
/// the bridge, the bridge itself, a powered radio.
pub fn reconcile_stale<B: NetworkBackend>(backend: &mut B) -> TeardownReport {
    let mut report = TeardownReport::default();
    report.record(Step::Stale, backend.kill_stale_dhcp().map(drop));
    let bridge = backend.remove_bridge(&Bridge::default()).or_else(|e| {
        if e.is_missing_interface() {
            Ok(())
        } else {
            Err(e)
        }
    });
    report.record(Step::Bridge, bridge);
    report.record(Step::Radio, backend.radio_power(false));
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::DocumentStore;
    use platform::mocks::{MockReply, MockRunner};
    use std::net::{IpAddr, Ipv4Addr};
    use tempfile::TempDir;

    fn backend() -> (TempDir, MockRunner, SystemBackend<MockRunner>) {
        let tmp = TempDir::new().unwrap();
        let runner = MockRunner::new();
        let servers = ServerConfig {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            https_port: 0,
            http_port: 0,
        };
        let backend = SystemBackend::new(runner.clone(), DocumentStore::new(tmp.path()), servers);
        (tmp, runner, backend)
    }

    #[test]
    fn test_failure_at_agent_releases_radio_only() {
        let (_tmp, runner, mut b) = backend();
        runner.on("bt-agent", MockReply::SpawnError);
        let err = ResourceSession::acquire(&mut b).unwrap_err();
        let SessionError::Acquire { step, rollback, .. } = err;
        assert_eq!(step, Step::Agent);
        assert_eq!(rollback.attempted, [Step::Peers, Step::Radio]);
        assert!(runner.called("bluetoothctl power off"));
        assert!(!runner.called("ip link add"));
    }

    #[test]
    fn test_failure_at_dhcp_rolls_back_in_reverse() {
        let (_tmp, runner, mut b) = backend();
        runner.on("dnsmasq", MockReply::SpawnError);
        let SessionError::Acquire { step, rollback, .. } = ResourceSession::acquire(&mut b).unwrap_err();
        assert_eq!(step, Step::Dhcp);
        assert_eq!(
            rollback.attempted,
            [Step::Nap, Step::Visibility, Step::Agent, Step::Peers, Step::Bridge, Step::Radio]
        );
        assert!(rollback.is_clean());
        assert_eq!(runner.terminated().len(), 2);
    }

    #[test]
    fn test_half_applied_visibility_is_reverted() {
        let (_tmp, runner, mut b) = backend();
        runner.fail("bluetoothctl pairable on");
        let SessionError::Acquire { step, .. } = ResourceSession::acquire(&mut b).unwrap_err();
        assert_eq!(step, Step::Visibility);
        assert!(runner.called("bluetoothctl discoverable off"));
    }

    #[test]
    fn test_empty_session_teardown_is_noop() {
        let (_tmp, runner, mut b) = backend();
        let mut session = ResourceSession::default();
        assert!(!session.is_active());
        let report = session.teardown(&mut b);
        assert!(report.attempted.is_empty());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_reconcile_runs_every_step() {
        let (_tmp, runner, mut b) = backend();
        runner.fail_with("ip link del", "Cannot find device \"pan0\"");
        runner.on("pgrep", MockReply::Timeout);
        let report = reconcile_stale(&mut b);
        assert_eq!(report.attempted, [Step::Stale, Step::Bridge, Step::Radio]);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].step, Step::Stale);
        assert!(runner.called("bluetoothctl power off"));
    }

    #[test]
    fn test_reconcile_reports_real_bridge_failure() {
        let (_tmp, runner, mut b) = backend();
        runner.fail_with("ip link del", "RTNETLINK answers: Device or resource busy");
        let report = reconcile_stale(&mut b);
        assert_eq!(report.attempted, [Step::Stale, Step::Bridge, Step::Radio]);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].step, Step::Bridge);
        assert!(report.warnings[0].message.contains("busy"));
        assert!(runner.called("bluetoothctl power off"));
    }
}
