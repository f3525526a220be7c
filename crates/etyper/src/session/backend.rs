//! The operations a file-sharing session is made of.
//!
//! [`SystemBackend`] performs them with BlueZ command-line tools, `ip`,
//! `sysctl`, `dnsmasq` and in-process HTTP servers. Every external command
//! goes through a [`CommandRunner`] with a timeout.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use bluetooth::{AgentRegistration, BluetoothError, Bluetoothctl, NapRegistration, NapServer, PairingAgent};
use platform::config::{
    APP_NAME, BRIDGE_ADDRESS, BRIDGE_NAME, BRIDGE_PREFIX_LEN, CERT_DIR_NAME, COMMAND_TIMEOUT,
    DHCP_RANGE, HTTPS_PORT, HTTP_PORT,
};
use platform::{ChildProcess, CommandError, CommandRunner};

use crate::document::DocumentStore;
use crate::server::{ensure_certificate, FileServer, ServerError, ServerHandle};

/// Errors from a single backend operation.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Radio, agent or NAP control failed.
    #[error(transparent)]
    Bluetooth(#[from] BluetoothError),
    /// A network command failed.
    #[error(transparent)]
    Command(#[from] CommandError),
    /// A file server could not start.
    #[error(transparent)]
    Server(#[from] ServerError),
}

impl BackendError {
    /// `ip` reported that the interface does not exist.
    pub fn is_missing_interface(&self) -> bool {
        matches!(
            self,
            Self::Command(CommandError::Failed { stderr, .. }) if stderr.contains("Cannot find device")
        )
    }
}

/// A bridge interface created for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bridge {
    /// Interface name.
    pub name: String,
}

impl Default for Bridge {
    fn default() -> Self {
        Self {
            name: BRIDGE_NAME.to_owned(),
        }
    }
}

/// Which file server to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerKind {
    /// HTTPS with the self-signed certificate.
    Tls,
    /// Plain HTTP fallback.
    Plain,
}

/// Where the file servers listen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address.
    pub bind: IpAddr,
    /// HTTPS port.
    pub https_port: u16,
    /// HTTP port.
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            https_port: HTTPS_PORT,
            http_port: HTTP_PORT,
        }
    }
}

/// Operations a [`super::ResourceSession`] acquires and releases.
pub trait NetworkBackend {
    /// Switch the Bluetooth radio on or off.
    fn radio_power(&mut self, on: bool) -> Result<(), BackendError>;

    /// Start the pairing agent.
    fn register_agent(&mut self) -> Result<AgentRegistration, BackendError>;

    /// Make the adapter discoverable and pairable, or hide it again.
    fn set_visible(&mut self, visible: bool) -> Result<(), BackendError>;

    /// Create the bridge interface, replacing a stale one.
    fn create_bridge(&mut self) -> Result<Bridge, BackendError>;

    /// Address the bridge, bring it up, enable forwarding.
    fn configure_bridge(&mut self, bridge: &Bridge) -> Result<(), BackendError>;

    /// Register the NAP profile on the bridge.
    fn register_nap(&mut self, bridge: &Bridge) -> Result<NapRegistration, BackendError>;

    /// Start the DHCP helper on the bridge.
    fn start_dhcp(&mut self, bridge: &Bridge) -> Result<Box<dyn ChildProcess>, BackendError>;

    /// Start one of the file servers.
    fn start_server(&mut self, kind: ServerKind) -> Result<Box<dyn ServerHandle>, BackendError>;

    /// Disconnect every connected peer; pairings are kept.
    fn disconnect_peers(&mut self) -> Result<usize, BackendError>;

    /// Delete the bridge interface.
    fn remove_bridge(&mut self, bridge: &Bridge) -> Result<(), BackendError>;

    /// Kill DHCP helpers left bound to the bridge by an earlier run.
    fn kill_stale_dhcp(&mut self) -> Result<usize, BackendError>;
}

/// The real thing, parameterised over the command runner.
#[derive(Debug)]
pub struct SystemBackend<R> {
    runner: R,
    ctl: Bluetoothctl,
    agent: PairingAgent,
    nap: NapServer,
    store: DocumentStore,
    cert_dir: PathBuf,
    servers: ServerConfig,
}

impl<R: CommandRunner> SystemBackend<R> {
    /// Backend serving documents from `store`, certificate under
    /// `<docs>/.ssl`.
    pub fn new(runner: R, store: DocumentStore, servers: ServerConfig) -> Self {
        let cert_dir = store.dir().join(CERT_DIR_NAME);
        Self {
            runner,
            ctl: Bluetoothctl::new(),
            agent: PairingAgent::default(),
            nap: NapServer::new(BRIDGE_NAME),
            store,
            cert_dir,
            servers,
        }
    }

    /// The command runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Adapter state as last set.
    pub fn bluetooth(&self) -> &Bluetoothctl {
        &self.ctl
    }

    fn ip(&mut self, args: &[&str]) -> Result<(), CommandError> {
        self.runner.run_checked("ip", args, COMMAND_TIMEOUT).map(drop)
    }
}

impl<R: CommandRunner> NetworkBackend for SystemBackend<R> {
    fn radio_power(&mut self, on: bool) -> Result<(), BackendError> {
        Ok(self.ctl.power(&mut self.runner, on)?)
    }

    fn register_agent(&mut self) -> Result<AgentRegistration, BackendError> {
        Ok(self.agent.register(&mut self.runner)?)
    }

    fn set_visible(&mut self, visible: bool) -> Result<(), BackendError> {
        if visible {
            self.ctl.set_alias(&mut self.runner, APP_NAME)?;
        }
        Ok(self.ctl.set_visible(&mut self.runner, visible)?)
    }

    fn create_bridge(&mut self) -> Result<Bridge, BackendError> {
        let bridge = Bridge::default();
        // A leftover from a crashed run; absence is fine.
        let _ = self
            .runner
            .run("ip", &["link", "del", bridge.name.as_str()], COMMAND_TIMEOUT);
        self.ip(&["link", "add", bridge.name.as_str(), "type", "bridge"])?;
        tracing::info!(bridge = %bridge.name, "bridge created");
        Ok(bridge)
    }

    fn configure_bridge(&mut self, bridge: &Bridge) -> Result<(), BackendError> {
        let cidr = format!("{BRIDGE_ADDRESS}/{BRIDGE_PREFIX_LEN}");
        self.ip(&["addr", "add", cidr.as_str(), "dev", bridge.name.as_str()])?;
        self.ip(&["link", "set", bridge.name.as_str(), "up"])?;
        self.runner
            .run_checked("sysctl", &["-w", "net.ipv4.ip_forward=1"], COMMAND_TIMEOUT)?;
        Ok(())
    }

    fn register_nap(&mut self, bridge: &Bridge) -> Result<NapRegistration, BackendError> {
        if self.nap.bridge() != bridge.name {
            self.nap = NapServer::new(bridge.name.clone());
        }
        Ok(self.nap.register(&mut self.runner)?)
    }

    fn start_dhcp(&mut self, bridge: &Bridge) -> Result<Box<dyn ChildProcess>, BackendError> {
        let interface = format!("--interface={}", bridge.name);
        let range = format!("--dhcp-range={DHCP_RANGE}");
        let child = self.runner.spawn(
            "dnsmasq",
            &[
                interface.as_str(),
                "--except-interface=lo",
                "--bind-interfaces",
                range.as_str(),
                "--no-daemon",
                "--no-resolv",
                "--log-facility=-",
            ],
        )?;
        tracing::info!(pid = child.id(), "DHCP server started");
        Ok(child)
    }

    fn start_server(&mut self, kind: ServerKind) -> Result<Box<dyn ServerHandle>, BackendError> {
        let server = match kind {
            ServerKind::Tls => {
                let cert = ensure_certificate(&mut self.runner, &self.cert_dir)?;
                let addr = SocketAddr::new(self.servers.bind, self.servers.https_port);
                FileServer::start_tls(addr, self.store.clone(), &cert)?
            }
            ServerKind::Plain => {
                let addr = SocketAddr::new(self.servers.bind, self.servers.http_port);
                FileServer::start_plain(addr, self.store.clone())?
            }
        };
        Ok(Box::new(server))
    }

    fn disconnect_peers(&mut self) -> Result<usize, BackendError> {
        Ok(self.ctl.disconnect_all(&mut self.runner)?)
    }

    fn remove_bridge(&mut self, bridge: &Bridge) -> Result<(), BackendError> {
        self.ip(&["link", "del", bridge.name.as_str()])?;
        tracing::info!(bridge = %bridge.name, "bridge removed");
        Ok(())
    }

    fn kill_stale_dhcp(&mut self) -> Result<usize, BackendError> {
        let pattern = format!("dnsmasq.*{BRIDGE_NAME}");
        // pgrep exits 1 when nothing matches
        let out = self
            .runner
            .run("pgrep", &["-f", pattern.as_str()], COMMAND_TIMEOUT)?;
        let mut killed = 0;
        for pid in out.stdout.split_whitespace().filter(|p| p.parse::<u32>().is_ok()) {
            self.runner.run_checked("kill", &[pid], COMMAND_TIMEOUT)?;
            killed += 1;
        }
        if killed > 0 {
            tracing::info!(killed, "stale DHCP servers killed");
        }
        Ok(killed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use platform::mocks::MockRunner;
    use tempfile::TempDir;

    fn backend() -> (TempDir, MockRunner, SystemBackend<MockRunner>) {
        let tmp = TempDir::new().unwrap();
        let runner = MockRunner::new();
        let backend = SystemBackend::new(runner.clone(), DocumentStore::new(tmp.path()), ServerConfig::default());
        (tmp, runner, backend)
    }

    #[test]
    fn test_bridge_commands() {
        let (_tmp, runner, mut b) = backend();
        let bridge = b.create_bridge().unwrap();
        b.configure_bridge(&bridge).unwrap();
        b.remove_bridge(&bridge).unwrap();
        assert_eq!(
            runner.calls(),
            [
                "ip link del pan0",
                "ip link add pan0 type bridge",
                "ip addr add 10.44.0.1/24 dev pan0",
                "ip link set pan0 up",
                "sysctl -w net.ipv4.ip_forward=1",
                "ip link del pan0",
            ]
        );
    }

    #[test]
    fn test_stale_bridge_delete_failure_ignored() {
        let (_tmp, runner, mut b) = backend();
        runner.fail("ip link del");
        assert!(b.create_bridge().is_ok());
    }

    #[test]
    fn test_missing_interface_is_recognised() {
        let (_tmp, runner, mut b) = backend();
        runner.fail_with("ip link del", "Cannot find device \"pan0\"\n");
        let err = b.remove_bridge(&Bridge::default()).unwrap_err();
        assert!(err.is_missing_interface());

        let (_tmp, runner, mut b) = backend();
        runner.fail_with("ip link del", "RTNETLINK answers: Operation not permitted");
        let err = b.remove_bridge(&Bridge::default()).unwrap_err();
        assert!(!err.is_missing_interface());
    }

    #[test]
    fn test_visibility_sets_alias_first() {
        let (_tmp, runner, mut b) = backend();
        b.set_visible(true).unwrap();
        assert_eq!(runner.calls()[0], "bluetoothctl system-alias etyper");
        b.set_visible(false).unwrap();
        assert!(runner.called("bluetoothctl discoverable off"));
        assert_eq!(runner.calls().iter().filter(|c| c.contains("system-alias")).count(), 1);
    }

    #[test]
    fn test_dhcp_arguments() {
        let (_tmp, runner, mut b) = backend();
        let mut child = b.start_dhcp(&Bridge::default()).unwrap();
        assert_eq!(
            runner.calls(),
            ["dnsmasq --interface=pan0 --except-interface=lo --bind-interfaces \
              --dhcp-range=10.44.0.10,10.44.0.50,255.255.255.0,1h --no-daemon --no-resolv --log-facility=-"]
        );
        child.terminate(std::time::Duration::ZERO).unwrap();
        assert_eq!(runner.terminated().len(), 1);
    }

    #[test]
    fn test_kill_stale_dhcp() {
        let (_tmp, runner, mut b) = backend();
        runner.respond("pgrep", "123\n456\n");
        assert_eq!(b.kill_stale_dhcp().unwrap(), 2);
        assert_eq!(
            runner.calls(),
            ["pgrep -f dnsmasq.*pan0", "kill 123", "kill 456"]
        );
    }

    #[test]
    fn test_no_stale_dhcp() {
        let (_tmp, runner, mut b) = backend();
        runner.fail("pgrep");
        assert_eq!(b.kill_stale_dhcp().unwrap(), 0);
        assert!(!runner.called("kill"));
    }
}
