//! Display abstraction layer
//!
//! [`EpaperPanel`] is the contract between the mode controller and a
//! bistable panel driver. The driver owns the refresh-mode state machine:
//!
//! ```text
//!                 init_full()                 init_partial()
//!  Uninitialized ───────────► FullReady ─────────────────────► PartialReady
//!        ▲                     │   ▲   render_full()               │  ▲
//!        │                     │   └─────────┘                     │  │ render_partial()
//!        │ error mid-command   │ sleep()                   sleep() │  └──────┘
//!        └───────────────────  ▼                                   ▼
//!                           Sleeping ◄─────────────────────────────┘
//! ```
//!
//! `init_full()` is valid from every state and performs the physical reset,
//! so it is also the only way out of `Sleeping`.

use core::fmt;
use core::time::Duration;
use std::time::Instant;

use crate::config::MAX_PARTIAL_INTERVAL;

/// Panel geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl DisplayInfo {
    /// Bytes per row of a 1bpp buffer.
    pub const fn bytes_per_row(&self) -> usize {
        (self.width as usize).div_ceil(8)
    }

    /// Length of a full 1bpp frame buffer.
    pub const fn buffer_len(&self) -> usize {
        self.bytes_per_row() * self.height as usize
    }
}

/// Refresh-mode state of the panel controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    /// Power-on, after a failed command, or never initialised.
    Uninitialized,
    /// Full-refresh waveform loaded.
    FullReady,
    /// Partial-refresh waveform loaded; both RAM planes hold the same image.
    PartialReady,
    /// Deep sleep. Needs a full init (hardware reset) before anything else.
    Sleeping,
}

impl DisplayState {
    /// Short lowercase name used in logs and errors.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::FullReady => "full-ready",
            Self::PartialReady => "partial-ready",
            Self::Sleeping => "sleeping",
        }
    }

    /// Whether frames can be pushed in this state.
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::FullReady | Self::PartialReady)
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a `render_partial` call actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    /// Partial waveform, current plane only.
    Partial,
    /// The ghosting interval had elapsed; a full refresh cycle ran instead.
    Full,
}

/// Display errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DisplayError {
    /// BUSY stayed high for the whole bounded wait.
    #[error("display busy line did not clear within {waited_ms} ms")]
    HardwareTimeout {
        /// How long the driver waited.
        waited_ms: u64,
    },
    /// A stop request ended a busy wait early.
    #[error("busy wait interrupted by a stop request")]
    Interrupted,
    /// SPI transfer failed.
    #[error("SPI communication error")]
    Communication,
    /// A GPIO line could not be read or driven.
    #[error("GPIO error")]
    Gpio,
    /// The operation is not allowed in the current state.
    #[error("{op} is not valid while the display is {state}")]
    InvalidState {
        /// Rejected operation.
        op: &'static str,
        /// State at the time of the call.
        state: DisplayState,
    },
    /// Caller supplied a frame buffer with the wrong number of bytes.
    #[error("frame buffer is {actual} bytes, expected {expected}")]
    InvalidBuffer {
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },
}

/// Bistable panel driver with a full/partial refresh state machine.
pub trait EpaperPanel {
    /// Panel geometry.
    fn info(&self) -> DisplayInfo;

    /// Current refresh-mode state.
    fn state(&self) -> DisplayState;

    /// Partial refreshes since the last full refresh.
    fn partial_count(&self) -> u32;

    /// Pulse the reset line and wait for the controller to come up.
    ///
    /// Leaves the panel `Uninitialized`.
    fn reset(&mut self) -> Result<(), DisplayError>;

    /// Reset and load the full-refresh configuration. Valid from every state.
    fn init_full(&mut self) -> Result<(), DisplayError>;

    /// Switch to the partial-refresh configuration.
    ///
    /// Requires both RAM planes to hold a known image, i.e. a `render_full`
    /// since the last `init_full`.
    fn init_partial(&mut self) -> Result<(), DisplayError>;

    /// Write both RAM planes and run the full waveform. State is unchanged.
    fn render_full(&mut self, buffer: &[u8]) -> Result<(), DisplayError>;

    /// Partial refresh, or a full refresh cycle if the ghosting interval
    /// elapsed. Only valid in `PartialReady`.
    fn render_partial(&mut self, buffer: &[u8]) -> Result<RefreshKind, DisplayError>;

    /// `init_full` + `render_full` + `init_partial`.
    fn force_full_refresh(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        self.init_full()?;
        self.render_full(buffer)?;
        self.init_partial()
    }

    /// Enter deep sleep.
    fn sleep(&mut self) -> Result<(), DisplayError>;
}

// ---------------------------------------------------------------------------
// RefreshPolicy
// ---------------------------------------------------------------------------

/// Ghosting mitigation bookkeeping.
///
/// While partial refreshing, the time since the last full refresh must never
/// exceed `max_partial_interval`.
#[derive(Debug, Clone, Copy)]
pub struct RefreshPolicy {
    last_full_refresh: Option<Instant>,
    max_partial_interval: Duration,
    partial_count: u32,
}

impl RefreshPolicy {
    /// New policy; a full refresh is due until one is recorded.
    pub const fn new(max_partial_interval: Duration) -> Self {
        Self {
            last_full_refresh: None,
            max_partial_interval,
            partial_count: 0,
        }
    }

    /// Record a completed full refresh at `now`.
    pub fn record_full(&mut self, now: Instant) {
        self.last_full_refresh = Some(now);
        self.partial_count = 0;
    }

    /// Record a completed partial refresh.
    pub fn record_partial(&mut self) {
        self.partial_count = self.partial_count.saturating_add(1);
    }

    /// Whether the next partial refresh must become a full one.
    pub fn full_refresh_due(&self, now: Instant) -> bool {
        match self.last_full_refresh {
            Some(last) => now.saturating_duration_since(last) >= self.max_partial_interval,
            None => true,
        }
    }

    /// Partial refreshes since the last full refresh.
    pub const fn partial_count(&self) -> u32 {
        self.partial_count
    }

    /// Configured interval.
    pub const fn max_partial_interval(&self) -> Duration {
        self.max_partial_interval
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::new(MAX_PARTIAL_INTERVAL)
    }
}
