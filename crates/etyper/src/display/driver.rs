//! SSD1683 Hardware Driver
//!
//! Blocking driver for the SSD1683 e-paper controller on the WeAct Studio
//! 4.2" panel (400×300, black/white).
//!
//! # Wiring (Orange Pi Zero 2W, WeAct header)
//!
//! | Signal | Header pin | Line (gpiochip) | Direction |
//! |--------|-----------|------------------|-----------|
//! | SCK    | 23 (SPI1_CLK)  | — | Host → Display |
//! | MOSI   | 19 (SPI1_MOSI) | — | Host → Display |
//! | CS     | 13 | 27 | Host → Display (driven by `ExclusiveDevice`) |
//! | DC     | 22 | 25 | Host → Display |
//! | RST    | 16 | 23 | Host → Display |
//! | BUSY   | 18 | 24 | Display → Host |
//!
//! # Refresh model
//!
//! The controller holds two RAM planes: *current* (`0x24`) and *previous*
//! (`0x26`). A full refresh (`0x22 0xF7`) drives every pixel through the OTP
//! waveform; a partial refresh (`0x22 0xFF`) only moves pixels whose current
//! bit differs from the previous plane, so after every partial update the
//! previous plane is rewritten with the frame just shown.
//!
//! Partial refreshes accumulate ghosting. [`Ssd1683::render_partial`] turns
//! itself into a full resynchronisation once the panel's maximum partial
//! interval has passed since the last full refresh.
//!
//! # State
//!
//! Operations are only issued in states where the controller can accept
//! them; anything else fails with [`DisplayError::InvalidState`] before a
//! byte goes out on the bus. A transport or BUSY failure part-way through an
//! operation drops the driver to [`DisplayState::Uninitialized`].

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::{Operation, SpiDevice};

use eink_specs::DisplaySpec;
use platform::config::BUSY_POLL_INTERVAL;
use platform::{
    BoundedWait, Clock, DisplayError, DisplayInfo, DisplayState, EpaperPanel, RefreshKind,
    RefreshPolicy, StopFlag, SystemClock, WaitError,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Largest single SPI write; bulk plane transfers are split into chunks of
/// this size inside one chip-select transaction (spidev's default limit).
pub const CHUNK_SIZE: usize = 4096;

/// RST low time.
const RESET_PULSE_MS: u32 = 50;
/// Settle time after RST goes high.
const RESET_SETTLE_MS: u32 = 50;
/// Minimum wait after software reset before BUSY is meaningful.
const SOFT_RESET_MS: u32 = 100;

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// SSD1683 command codes used by this driver.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Deep sleep: 1 data byte (0x01 = mode 1, RAM retained).
    DeepSleep = 0x10,
    /// Data entry mode: 1 data byte.
    DataEntryMode = 0x11,
    /// Software reset: 0 data bytes; wait ≥100 ms then poll BUSY.
    SoftReset = 0x12,
    /// Master activation: 0 data bytes; runs the update sequence.
    MasterActivation = 0x20,
    /// Display update control 1: 2 data bytes (RAM content options).
    DisplayUpdateCtrl1 = 0x21,
    /// Display update control 2: 1 data byte (sequence flags).
    DisplayUpdateCtrl2 = 0x22,
    /// Write current RAM plane: pixel data; 1=white, 0=black, MSB-first.
    WriteRamBW = 0x24,
    /// Write previous RAM plane (reference for partial updates).
    WriteRamRed = 0x26,
    /// Border waveform control: 1 data byte.
    BorderWaveform = 0x3C,
    /// RAM X start/end, in bytes: 2 data bytes.
    SetRamXRange = 0x44,
    /// RAM Y start/end, little-endian: 4 data bytes.
    SetRamYRange = 0x45,
    /// RAM X address counter: 1 data byte.
    SetRamXCounter = 0x4E,
    /// RAM Y address counter, little-endian: 2 data bytes.
    SetRamYCounter = 0x4F,
}

// ---------------------------------------------------------------------------
// Register values
// ---------------------------------------------------------------------------

/// Full update: clock, analog, temperature, OTP LUT, display.
pub const UPDATE_FULL: u8 = 0xF7;
/// Partial update against the previous plane.
pub const UPDATE_PARTIAL: u8 = 0xFF;
/// Border waveform for full refreshes.
pub const BORDER_FULL: u8 = 0x05;
/// Border waveform for partial refreshes (border held).
pub const BORDER_PARTIAL: u8 = 0x80;
/// X increment, then Y increment.
pub const DATA_ENTRY_X_THEN_Y: u8 = 0x03;
/// Update control 1 in full mode: bypass the previous plane as 0.
const UPDATE_CTRL1_FULL: [u8; 2] = [0x40, 0x00];
/// Update control 1 in partial mode: both planes normal.
const UPDATE_CTRL1_PARTIAL: [u8; 2] = [0x00, 0x00];
/// Deep sleep mode 1.
const DEEP_SLEEP_MODE_1: u8 = 0x01;

// ---------------------------------------------------------------------------
// Driver struct
// ---------------------------------------------------------------------------

/// SSD1683 display driver.
///
/// Generic over:
/// - `SPI`: an [`embedded_hal::spi::SpiDevice`] (manages CS).
/// - `DC`: Data/Command [`OutputPin`] (low = command).
/// - `RST`: Reset [`OutputPin`] (active low).
/// - `BUSY`: Busy [`InputPin`] (HIGH while busy).
/// - `DELAY`: [`DelayNs`] for reset timing and BUSY polling.
/// - `CLK`: [`Clock`] for the ghosting interval; [`SystemClock`] on device.
///
/// On the device supply `linux_embedded_hal::Delay`; in host tests supply
/// `embedded_hal_mock::eh1::delay::NoopDelay` or the simulator's delay.
pub struct Ssd1683<SPI, DC, RST, BUSY, DELAY, CLK = SystemClock> {
    spi: SPI,
    dc: DC,
    rst: RST,
    busy: BUSY,
    delay: DELAY,
    clock: CLK,
    spec: &'static DisplaySpec,
    state: DisplayState,
    /// Both RAM planes hold the last full-refreshed frame.
    planes_synced: bool,
    policy: RefreshPolicy,
    busy_wait: BoundedWait,
    stop: Option<StopFlag>,
}

impl<SPI, DC, RST, BUSY, DELAY> Ssd1683<SPI, DC, RST, BUSY, DELAY, SystemClock>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    DELAY: DelayNs,
{
    /// Create a driver for `spec`. Nothing is sent until the first
    /// [`EpaperPanel::init_full`].
    pub fn new(spi: SPI, dc: DC, rst: RST, busy: BUSY, delay: DELAY, spec: &'static DisplaySpec) -> Self {
        Self {
            spi,
            dc,
            rst,
            busy,
            delay,
            clock: SystemClock,
            spec,
            state: DisplayState::Uninitialized,
            planes_synced: false,
            policy: RefreshPolicy::new(spec.max_partial_interval()),
            busy_wait: BoundedWait::new(BUSY_POLL_INTERVAL, spec.busy_timeout()),
            stop: None,
        }
    }
}

impl<SPI, DC, RST, BUSY, DELAY, CLK> Ssd1683<SPI, DC, RST, BUSY, DELAY, CLK>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    DELAY: DelayNs,
    CLK: Clock,
{
    /// Replace the clock used for the ghosting interval.
    pub fn with_clock<C: Clock>(self, clock: C) -> Ssd1683<SPI, DC, RST, BUSY, DELAY, C> {
        Ssd1683 {
            spi: self.spi,
            dc: self.dc,
            rst: self.rst,
            busy: self.busy,
            delay: self.delay,
            clock,
            spec: self.spec,
            state: self.state,
            planes_synced: self.planes_synced,
            policy: self.policy,
            busy_wait: self.busy_wait,
            stop: self.stop,
        }
    }

    /// Override the BUSY timeout (default: the panel's `busy_timeout_ms`).
    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_wait = BoundedWait::new(BUSY_POLL_INTERVAL, timeout);
        self
    }

    /// Let a stop request cut BUSY waits short with
    /// [`DisplayError::Interrupted`].
    #[must_use]
    pub fn with_stop(mut self, stop: StopFlag) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Panel specification.
    pub fn spec(&self) -> &'static DisplaySpec {
        self.spec
    }

    /// Current ghosting policy.
    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    // -----------------------------------------------------------------------
    // Low-level SPI helpers
    // -----------------------------------------------------------------------

    /// Assert DC low (command mode) and send one command byte.
    fn send_command(&mut self, cmd: Command) -> Result<(), DisplayError> {
        self.dc.set_low().map_err(|_| DisplayError::Gpio)?;
        self.spi
            .write(&[cmd as u8])
            .map_err(|_| DisplayError::Communication)
    }

    /// Assert DC high (data mode) and send parameter bytes.
    fn send_data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        if data.is_empty() {
            return Ok(());
        }
        self.dc.set_high().map_err(|_| DisplayError::Gpio)?;
        self.spi.write(data).map_err(|_| DisplayError::Communication)
    }

    /// Send one command followed immediately by its data bytes.
    fn cmd_data(&mut self, cmd: Command, data: &[u8]) -> Result<(), DisplayError> {
        self.send_command(cmd)?;
        self.send_data(data)
    }

    /// Write a whole RAM plane: the command, then the frame in
    /// [`CHUNK_SIZE`] pieces inside a single chip-select transaction.
    fn write_plane(&mut self, cmd: Command, buffer: &[u8]) -> Result<(), DisplayError> {
        self.send_command(cmd)?;
        self.dc.set_high().map_err(|_| DisplayError::Gpio)?;
        let mut ops: Vec<Operation<'_, u8>> = buffer.chunks(CHUNK_SIZE).map(Operation::Write).collect();
        self.spi
            .transaction(&mut ops)
            .map_err(|_| DisplayError::Communication)
    }

    // -----------------------------------------------------------------------
    // BUSY polling
    // -----------------------------------------------------------------------

    /// Block until BUSY goes LOW (controller idle) or the bound expires.
    ///
    /// BUSY is active HIGH on SSD1683. Polled every 10 ms.
    fn wait_busy(&mut self) -> Result<(), DisplayError> {
        let wait = match &self.stop {
            Some(stop) => self.busy_wait.clone().with_stop(stop.clone()),
            None => self.busy_wait.clone(),
        };
        let busy = &mut self.busy;
        match wait.run(&mut self.delay, || busy.is_high().map(|high| !high)) {
            Ok(_) => Ok(()),
            Err(WaitError::Interrupted { .. }) => Err(DisplayError::Interrupted),
            Err(WaitError::TimedOut { waited }) => Err(DisplayError::HardwareTimeout {
                waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
            }),
            Err(WaitError::Check(_)) => Err(DisplayError::Gpio),
        }
    }

    // -----------------------------------------------------------------------
    // Reset
    // -----------------------------------------------------------------------

    /// Hardware reset sequence: RST LOW 50 ms → HIGH, settle 50 ms, BUSY.
    fn hardware_reset(&mut self) -> Result<(), DisplayError> {
        self.rst.set_low().map_err(|_| DisplayError::Gpio)?;
        self.delay.delay_ms(RESET_PULSE_MS);
        self.rst.set_high().map_err(|_| DisplayError::Gpio)?;
        self.delay.delay_ms(RESET_SETTLE_MS);
        self.wait_busy()
    }

    // -----------------------------------------------------------------------
    // RAM window / counter helpers
    // -----------------------------------------------------------------------

    /// Full-panel RAM window: X bytes `0..=bytes_per_row-1`, Y rows
    /// `0..=height-1`.
    fn set_full_window(&mut self) -> Result<(), DisplayError> {
        let x_end = u8::try_from(self.spec.bytes_per_row().saturating_sub(1)).unwrap_or(u8::MAX);
        let y_end = u16::try_from(self.spec.height.saturating_sub(1)).unwrap_or(u16::MAX);
        let [y_end_lo, y_end_hi] = y_end.to_le_bytes();
        self.cmd_data(Command::SetRamXRange, &[0x00, x_end])?;
        self.cmd_data(Command::SetRamYRange, &[0x00, 0x00, y_end_lo, y_end_hi])
    }

    /// RAM address counters to the top-left corner.
    fn set_cursor_origin(&mut self) -> Result<(), DisplayError> {
        self.cmd_data(Command::SetRamXCounter, &[0x00])?;
        self.cmd_data(Command::SetRamYCounter, &[0x00, 0x00])
    }

    /// Border + update control for partial updates.
    fn enter_partial_mode(&mut self) -> Result<(), DisplayError> {
        self.cmd_data(Command::BorderWaveform, &[BORDER_PARTIAL])?;
        self.cmd_data(Command::DisplayUpdateCtrl1, &UPDATE_CTRL1_PARTIAL)
    }

    // -----------------------------------------------------------------------
    // State bookkeeping
    // -----------------------------------------------------------------------

    /// Run a bus sequence; on failure the controller is in an unknown
    /// state, so drop to `Uninitialized`.
    fn guarded<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T, DisplayError>,
    ) -> Result<T, DisplayError> {
        let result = f(self);
        if let Err(error) = &result {
            tracing::warn!(op, %error, "display operation failed, panel needs re-initialisation");
            self.state = DisplayState::Uninitialized;
            self.planes_synced = false;
        }
        result
    }

    fn require(&self, op: &'static str, ok: bool) -> Result<(), DisplayError> {
        if ok {
            Ok(())
        } else {
            Err(DisplayError::InvalidState {
                op,
                state: self.state,
            })
        }
    }

    fn check_buffer(&self, buffer: &[u8]) -> Result<(), DisplayError> {
        let expected = self.spec.buffer_len();
        if buffer.len() == expected {
            Ok(())
        } else {
            Err(DisplayError::InvalidBuffer {
                expected,
                actual: buffer.len(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// platform::EpaperPanel implementation
// ---------------------------------------------------------------------------

impl<SPI, DC, RST, BUSY, DELAY, CLK> EpaperPanel for Ssd1683<SPI, DC, RST, BUSY, DELAY, CLK>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    DELAY: DelayNs,
    CLK: Clock,
{
    fn info(&self) -> DisplayInfo {
        DisplayInfo {
            width: self.spec.width,
            height: self.spec.height,
        }
    }

    fn state(&self) -> DisplayState {
        self.state
    }

    fn partial_count(&self) -> u32 {
        self.policy.partial_count()
    }

    /// Pulse RST and wait for the controller. Always leaves `Uninitialized`.
    fn reset(&mut self) -> Result<(), DisplayError> {
        self.state = DisplayState::Uninitialized;
        self.planes_synced = false;
        self.guarded("reset", Self::hardware_reset)
    }

    /// Full initialisation: hardware reset, software reset and full-refresh
    /// register setup. Valid from every state; wakes the panel from deep
    /// sleep.
    fn init_full(&mut self) -> Result<(), DisplayError> {
        self.reset()?;
        self.guarded("init_full", |d| {
            d.send_command(Command::SoftReset)?;
            d.delay.delay_ms(SOFT_RESET_MS);
            d.wait_busy()?;

            d.cmd_data(Command::DisplayUpdateCtrl1, &UPDATE_CTRL1_FULL)?;
            d.cmd_data(Command::BorderWaveform, &[BORDER_FULL])?;
            d.cmd_data(Command::DataEntryMode, &[DATA_ENTRY_X_THEN_Y])?;
            d.set_full_window()?;
            d.set_cursor_origin()?;
            d.wait_busy()
        })?;
        self.state = DisplayState::FullReady;
        tracing::debug!("display initialised for full refresh");
        Ok(())
    }

    /// Switch to partial updates. Both RAM planes must already hold the
    /// displayed frame, i.e. a [`render_full`](EpaperPanel::render_full)
    /// has run since the last `init_full`.
    fn init_partial(&mut self) -> Result<(), DisplayError> {
        self.require(
            "init_partial",
            self.state.is_ready() && self.planes_synced,
        )?;
        self.guarded("init_partial", Self::enter_partial_mode)?;
        self.policy.record_full(self.clock.now());
        self.state = DisplayState::PartialReady;
        Ok(())
    }

    /// Write `buffer` to both RAM planes and run a full refresh.
    fn render_full(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        self.require("render_full", self.state.is_ready())?;
        self.check_buffer(buffer)?;
        self.guarded("render_full", |d| {
            d.write_plane(Command::WriteRamBW, buffer)?;
            d.write_plane(Command::WriteRamRed, buffer)?;
            d.cmd_data(Command::DisplayUpdateCtrl2, &[UPDATE_FULL])?;
            d.send_command(Command::MasterActivation)?;
            d.wait_busy()
        })?;
        self.planes_synced = true;
        self.policy.record_full(self.clock.now());
        Ok(())
    }

    /// Partial refresh, or a full resynchronisation once the ghosting
    /// interval has elapsed since the last full refresh.
    fn render_partial(&mut self, buffer: &[u8]) -> Result<RefreshKind, DisplayError> {
        self.require("render_partial", self.state == DisplayState::PartialReady)?;
        self.check_buffer(buffer)?;

        if self.policy.full_refresh_due(self.clock.now()) {
            tracing::info!(
                partials = self.policy.partial_count(),
                "ghosting interval elapsed, running full refresh"
            );
            self.force_full_refresh(buffer)?;
            return Ok(RefreshKind::Full);
        }

        self.guarded("render_partial", |d| {
            d.enter_partial_mode()?;
            d.set_full_window()?;
            d.set_cursor_origin()?;
            d.write_plane(Command::WriteRamBW, buffer)?;
            d.cmd_data(Command::DisplayUpdateCtrl2, &[UPDATE_PARTIAL])?;
            d.send_command(Command::MasterActivation)?;
            d.wait_busy()?;

            // The next partial update diffs against what is on the glass now.
            d.set_cursor_origin()?;
            d.write_plane(Command::WriteRamRed, buffer)
        })?;
        self.policy.record_partial();
        Ok(RefreshKind::Partial)
    }

    /// Enter deep sleep (mode 1, RAM retained). Only `init_full` wakes the
    /// controller again.
    fn sleep(&mut self) -> Result<(), DisplayError> {
        if self.state == DisplayState::Sleeping {
            return Ok(());
        }
        self.guarded("sleep", |d| d.cmd_data(Command::DeepSleep, &[DEEP_SLEEP_MODE_1]))?;
        self.state = DisplayState::Sleeping;
        self.planes_synced = false;
        tracing::debug!("display asleep");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
