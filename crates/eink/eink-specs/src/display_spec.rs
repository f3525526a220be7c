//! Panel specification types

use core::time::Duration;

/// Complete specification of an e-paper panel
///
/// Everything the driver needs beyond the command set:
/// - Physical dimensions (1 bit per pixel frame layout)
/// - Controller chip
/// - BUSY bound and the ghosting bound for partial refreshes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySpec {
    /// Display name (e.g., "WeAct 4.2\"")
    pub name: &'static str,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Display controller chip
    pub controller: Controller,

    /// Longest stretch of partial refreshes before a full refresh is
    /// required to clear ghosting, in seconds
    pub max_partial_interval_s: u32,

    /// Upper bound on a single BUSY wait, in milliseconds
    pub busy_timeout_ms: u32,
}

impl DisplaySpec {
    /// Bytes per row of a 1bpp frame (MSB = leftmost pixel)
    pub const fn bytes_per_row(&self) -> usize {
        (self.width as usize).div_ceil(8)
    }

    /// Length of a complete 1bpp frame buffer
    pub const fn buffer_len(&self) -> usize {
        self.bytes_per_row() * self.height as usize
    }

    /// Ghosting bound as Duration
    pub const fn max_partial_interval(&self) -> Duration {
        Duration::from_secs(self.max_partial_interval_s as u64)
    }

    /// BUSY wait bound as Duration
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms as u64)
    }
}

/// E-paper display controller chips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Controller {
    /// Solomon Systech SSD1683 (400×300 class, two RAM planes)
    SSD1683,
    /// Solomon Systech SSD1680 (small panels, same command family)
    SSD1680,
}
