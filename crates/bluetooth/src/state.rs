//! Adapter state tracker.
//!
//! Mirrors what this process last told the adapter, so teardown knows what
//! to undo and logs can say what the radio is doing.

use crate::address::PeerAddress;

/// Maximum number of peers tracked at once.
pub const MAX_PEERS: usize = 8;

/// Last known adapter configuration and connected peers.
#[derive(Debug, Clone, Default)]
pub struct AdapterState {
    powered: bool,
    discoverable: bool,
    pairable: bool,
    peers: heapless::Vec<PeerAddress, MAX_PEERS>,
}

impl AdapterState {
    /// Create a new state: powered off, hidden, no peers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the radio power state. Powering off drops all peers.
    pub fn on_powered(&mut self, powered: bool) {
        self.powered = powered;
        if !powered {
            self.discoverable = false;
            self.pairable = false;
            self.peers.clear();
        }
    }

    /// Record discoverable/pairable visibility.
    pub fn on_visibility(&mut self, discoverable: bool, pairable: bool) {
        self.discoverable = discoverable;
        self.pairable = pairable;
    }

    /// Replace the connected-peer list. Peers beyond [`MAX_PEERS`] are not
    /// tracked.
    pub fn on_peers(&mut self, peers: &[PeerAddress]) {
        self.peers.clear();
        for peer in peers.iter().take(MAX_PEERS) {
            // Cannot fail: at most MAX_PEERS items are pushed.
            self.peers.push(*peer).ok();
        }
    }

    /// Record that `peer` has disconnected.
    pub fn on_disconnected(&mut self, peer: PeerAddress) {
        self.peers.retain(|p| *p != peer);
    }

    /// Returns `true` if the radio is powered.
    #[must_use]
    pub fn powered(&self) -> bool {
        self.powered
    }

    /// Returns `true` if the adapter is visible to scans.
    #[must_use]
    pub fn discoverable(&self) -> bool {
        self.discoverable
    }

    /// Returns `true` if the adapter accepts new pairings.
    #[must_use]
    pub fn pairable(&self) -> bool {
        self.pairable
    }

    /// Currently connected peers.
    #[must_use]
    pub fn peers(&self) -> &[PeerAddress] {
        &self.peers
    }
}
