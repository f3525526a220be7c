//! E-Ink Driver Testing Utilities
//!
//! Headless SSD1683 controller simulator. It speaks the same bus as the real
//! chip: SPI bytes qualified by the D/C line, a reset line and a BUSY output.
//! Drivers under test are built from the handles returned by
//! [`Ssd1683Sim::parts`] and never know they are not talking to glass.
//!
//! # Quick start
//!
//! ```
//! use eink_specs::displays::WEACT_4_2;
//! use eink_testing::Ssd1683Sim;
//! use embedded_hal::digital::OutputPin;
//! use embedded_hal::spi::SpiDevice;
//!
//! let sim = Ssd1683Sim::new(&WEACT_4_2);
//! let (mut spi, mut dc, _rst, _busy, _delay) = sim.parts();
//!
//! dc.set_low().unwrap();
//! spi.write(&[0x22]).unwrap();
//! dc.set_high().unwrap();
//! spi.write(&[0xF7]).unwrap();
//! dc.set_low().unwrap();
//! spi.write(&[0x20]).unwrap();
//!
//! assert_eq!(sim.full_refreshes(), 1);
//! ```
//!
//! # What is modelled
//!
//! | Area | Behaviour |
//! |------|-----------|
//! | RAM | Current (`0x24`) and previous (`0x26`) planes, window + address counter, X/Y increment |
//! | Refresh | `0x22 0xF7` + `0x20` copies the current plane; `0x22 0xFF` + `0x20` only flips pixels where the planes differ |
//! | BUSY | High for a few polls after reset and activation; can be stuck |
//! | Sleep | `0x10 0x01` ignores the bus until a reset pulse |
//! | Faults | Wrong parameter counts and unknown commands are recorded as protocol errors |
//!
//! # Golden screenshot testing
//!
//! ```no_run
//! # use eink_testing::Ssd1683Sim;
//! # let sim = Ssd1683Sim::new(&eink_specs::displays::WEACT_4_2);
//! // First run: set UPDATE_GOLDEN=1 to create/update the reference file.
//! sim.assert_matches_golden("tests/golden/typing.png").unwrap();
//! ```

#![warn(clippy::all)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![allow(clippy::module_name_repetitions)]

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::spi::{self, Operation, SpiDevice};

pub use eink_specs::DisplaySpec;

/// BUSY polls that read high after a reset or an activation.
pub const BUSY_POLLS: u32 = 3;

// ─────────────────────────────────────────────────────────────────────────────
// Controller state
// ─────────────────────────────────────────────────────────────────────────────

/// Number of parameter bytes a command takes, `None` for RAM streams and
/// unknown opcodes.
fn param_len(cmd: u8) -> Option<usize> {
    match cmd {
        0x12 | 0x20 => Some(0),
        0x10 | 0x11 | 0x22 | 0x3C | 0x4E => Some(1),
        0x21 | 0x44 | 0x4F => Some(2),
        0x45 => Some(4),
        _ => None,
    }
}

#[derive(Debug)]
struct SimState {
    spec: &'static DisplaySpec,
    ram_bw: Vec<u8>,
    ram_red: Vec<u8>,
    screen: Vec<u8>,

    dc_data: bool,
    rst_low: bool,
    command: Option<u8>,
    params: Vec<u8>,

    x_start: usize,
    x_end: usize,
    y_start: usize,
    y_end: usize,
    x: usize,
    y: usize,
    entry_mode: u8,
    update_ctrl1: [u8; 2],
    update_ctrl2: Option<u8>,
    border: u8,

    busy_remaining: u32,
    busy_stuck: bool,
    spi_failing: bool,
    asleep: bool,
    writes_while_asleep: u32,

    full_refreshes: u32,
    partial_refreshes: u32,
    resets: u32,
    command_log: Vec<u8>,
    errors: Vec<String>,
    elapsed_ns: u64,
}

impl SimState {
    fn new(spec: &'static DisplaySpec) -> Self {
        let len = spec.buffer_len();
        let mut state = Self {
            spec,
            ram_bw: vec![0x00; len],
            ram_red: vec![0x00; len],
            screen: vec![0x00; len],
            dc_data: false,
            rst_low: false,
            command: None,
            params: Vec::new(),
            x_start: 0,
            x_end: 0,
            y_start: 0,
            y_end: 0,
            x: 0,
            y: 0,
            entry_mode: 0x03,
            update_ctrl1: [0x00, 0x00],
            update_ctrl2: None,
            border: 0x05,
            busy_remaining: 0,
            busy_stuck: false,
            spi_failing: false,
            asleep: false,
            writes_while_asleep: 0,
            full_refreshes: 0,
            partial_refreshes: 0,
            resets: 0,
            command_log: Vec::new(),
            errors: Vec::new(),
            elapsed_ns: 0,
        };
        state.reset_registers();
        state
    }

    fn reset_registers(&mut self) {
        self.x_start = 0;
        self.x_end = self.spec.bytes_per_row().saturating_sub(1);
        self.y_start = 0;
        self.y_end = (self.spec.height as usize).saturating_sub(1);
        self.x = 0;
        self.y = 0;
        self.entry_mode = 0x03;
        self.update_ctrl1 = [0x00, 0x00];
        self.update_ctrl2 = None;
        self.border = 0x05;
        self.command = None;
        self.params.clear();
        self.busy_remaining = BUSY_POLLS;
    }

    fn hardware_reset(&mut self) {
        self.asleep = false;
        self.resets += 1;
        self.reset_registers();
    }

    fn error(&mut self, msg: String) {
        self.errors.push(msg);
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if self.asleep {
                self.writes_while_asleep += 1;
                continue;
            }
            if self.dc_data {
                self.data(b);
            } else {
                self.begin_command(b);
            }
        }
    }

    fn finish_command(&mut self) {
        if let Some(cmd) = self.command {
            if let Some(expected) = param_len(cmd) {
                if self.params.len() != expected {
                    let got = self.params.len();
                    self.error(format!(
                        "command 0x{cmd:02X} expects {expected} data bytes, got {got}"
                    ));
                }
            }
        }
        self.params.clear();
    }

    fn begin_command(&mut self, cmd: u8) {
        self.finish_command();
        self.command = Some(cmd);
        self.command_log.push(cmd);
        match cmd {
            0x12 => {
                self.reset_registers();
                self.command = Some(cmd);
            }
            0x20 => self.activate(),
            0x24 | 0x26 => {}
            c if param_len(c).is_some() => {}
            c => self.error(format!("unknown command 0x{c:02X}")),
        }
    }

    fn data(&mut self, b: u8) {
        match self.command {
            None => self.error(format!("data byte 0x{b:02X} without a command")),
            Some(0x24) => self.ram_write(false, b),
            Some(0x26) => self.ram_write(true, b),
            Some(cmd) => match param_len(cmd) {
                Some(expected) if self.params.len() < expected => {
                    self.params.push(b);
                    if self.params.len() == expected {
                        self.apply(cmd);
                    }
                }
                Some(expected) => {
                    self.error(format!(
                        "command 0x{cmd:02X} expects {expected} data bytes, got more"
                    ));
                }
                None => {}
            },
        }
    }

    fn param(&self, i: usize) -> usize {
        usize::from(self.params.get(i).copied().unwrap_or(0))
    }

    fn apply(&mut self, cmd: u8) {
        match cmd {
            0x10 => {
                if self.param(0) != 0 {
                    self.asleep = true;
                }
            }
            0x11 => {
                self.entry_mode = self.params.first().copied().unwrap_or(0);
                if self.entry_mode != 0x03 {
                    let mode = self.entry_mode;
                    self.error(format!("unsupported data entry mode 0x{mode:02X}"));
                }
            }
            0x21 => {
                self.update_ctrl1 = [self.params.first().copied().unwrap_or(0), self.params.get(1).copied().unwrap_or(0)];
            }
            0x22 => self.update_ctrl2 = self.params.first().copied(),
            0x3C => self.border = self.params.first().copied().unwrap_or(0),
            0x44 => {
                self.x_start = self.param(0);
                self.x_end = self.param(1);
            }
            0x45 => {
                self.y_start = self.param(0) | (self.param(1) << 8);
                self.y_end = self.param(2) | (self.param(3) << 8);
            }
            0x4E => self.x = self.param(0),
            0x4F => self.y = self.param(0) | (self.param(1) << 8),
            _ => {}
        }
    }

    fn ram_write(&mut self, previous: bool, b: u8) {
        let idx = self.y * self.spec.bytes_per_row() + self.x;
        let plane = if previous {
            &mut self.ram_red
        } else {
            &mut self.ram_bw
        };
        match plane.get_mut(idx) {
            Some(slot) => *slot = b,
            None => {
                let (x, y) = (self.x, self.y);
                self.error(format!("RAM write outside the panel at x={x} y={y}"));
            }
        }
        self.x += 1;
        if self.x > self.x_end {
            self.x = self.x_start;
            self.y += 1;
            if self.y > self.y_end {
                self.y = self.y_start;
            }
        }
    }

    fn activate(&mut self) {
        match self.update_ctrl2 {
            Some(0xF7) => {
                self.screen.copy_from_slice(&self.ram_bw);
                self.full_refreshes += 1;
            }
            Some(0xFF) => {
                // Only pixels that differ from the previous-image plane move.
                for ((px, &new), &old) in self
                    .screen
                    .iter_mut()
                    .zip(self.ram_bw.iter())
                    .zip(self.ram_red.iter())
                {
                    let changed = new ^ old;
                    *px = (*px & !changed) | (new & changed);
                }
                self.partial_refreshes += 1;
            }
            other => self.error(format!("activation with update control {other:?}")),
        }
        self.busy_remaining = BUSY_POLLS;
    }

    fn busy_high(&mut self) -> bool {
        if self.busy_stuck {
            return true;
        }
        if self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            true
        } else {
            false
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ssd1683Sim
// ─────────────────────────────────────────────────────────────────────────────

/// Simulated SSD1683 controller and panel.
///
/// Cheap to clone; clones and every handle from [`parts`](Self::parts)
/// share one controller.
#[derive(Debug, Clone)]
pub struct Ssd1683Sim {
    state: Rc<RefCell<SimState>>,
}

impl Ssd1683Sim {
    /// Fresh controller. RAM and glass start black so a cleared screen is
    /// distinguishable from an untouched one.
    pub fn new(spec: &'static DisplaySpec) -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState::new(spec))),
        }
    }

    /// Bus handles: SPI device, D/C, RST, BUSY and a delay that records time.
    pub fn parts(&self) -> (SimSpi, SimDc, SimRst, SimBusy, SimDelay) {
        (
            SimSpi(Rc::clone(&self.state)),
            SimDc(Rc::clone(&self.state)),
            SimRst(Rc::clone(&self.state)),
            SimBusy(Rc::clone(&self.state)),
            SimDelay(Rc::clone(&self.state)),
        )
    }

    /// Keep BUSY high forever (or release it).
    pub fn set_busy_stuck(&self, stuck: bool) {
        self.state.borrow_mut().busy_stuck = stuck;
    }

    /// Make every SPI transaction fail (or succeed again).
    pub fn set_spi_failing(&self, failing: bool) {
        self.state.borrow_mut().spi_failing = failing;
    }

    /// Panel spec the simulator was built for.
    pub fn spec(&self) -> &'static DisplaySpec {
        self.state.borrow().spec
    }

    // ── Panel contents ───────────────────────────────────────────────────────

    /// What the glass currently shows (1 = white).
    pub fn screen(&self) -> Vec<u8> {
        self.state.borrow().screen.clone()
    }

    /// Current-image RAM plane (`0x24`).
    pub fn ram_current(&self) -> Vec<u8> {
        self.state.borrow().ram_bw.clone()
    }

    /// Previous-image RAM plane (`0x26`).
    pub fn ram_previous(&self) -> Vec<u8> {
        self.state.borrow().ram_red.clone()
    }

    /// Whether the glass is entirely white.
    pub fn is_white(&self) -> bool {
        self.state.borrow().screen.iter().all(|&b| b == 0xFF)
    }

    /// Pixel on the glass. [`BinaryColor::On`] is ink (black).
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<BinaryColor> {
        let state = self.state.borrow();
        if x >= state.spec.width || y >= state.spec.height {
            return None;
        }
        let idx = y as usize * state.spec.bytes_per_row() + x as usize / 8;
        let byte = state.screen.get(idx)?;
        let white = byte & (0x80 >> (x % 8)) != 0;
        Some(if white {
            BinaryColor::Off
        } else {
            BinaryColor::On
        })
    }

    /// Number of ink pixels inside `rect` (clipped to the panel).
    pub fn ink_in(&self, rect: Rectangle) -> usize {
        rect.points()
            .filter(|p| p.x >= 0 && p.y >= 0)
            .filter(|p| self.pixel_at(p.x.unsigned_abs(), p.y.unsigned_abs()) == Some(BinaryColor::On))
            .count()
    }

    /// Assert that `rect` holds no ink.
    pub fn assert_region_blank(&self, rect: Rectangle) -> Result<(), String> {
        match self.ink_in(rect) {
            0 => Ok(()),
            n => Err(format!("assert_region_blank: {n} ink pixels in {rect:?}")),
        }
    }

    /// Assert that `rect` holds at least one ink pixel.
    pub fn assert_region_has_ink(&self, rect: Rectangle) -> Result<(), String> {
        if self.ink_in(rect) > 0 {
            Ok(())
        } else {
            Err(format!("assert_region_has_ink: no ink in {rect:?}"))
        }
    }

    // ── Protocol observations ────────────────────────────────────────────────

    /// Completed full refreshes.
    pub fn full_refreshes(&self) -> u32 {
        self.state.borrow().full_refreshes
    }

    /// Completed partial refreshes.
    pub fn partial_refreshes(&self) -> u32 {
        self.state.borrow().partial_refreshes
    }

    /// Hardware reset pulses seen.
    pub fn resets(&self) -> u32 {
        self.state.borrow().resets
    }

    /// Every command byte received, in order.
    pub fn commands(&self) -> Vec<u8> {
        self.state.borrow().command_log.clone()
    }

    /// Forget the command log.
    pub fn clear_commands(&self) {
        self.state.borrow_mut().command_log.clear();
    }

    /// Border waveform register (`0x3C`).
    pub fn border(&self) -> u8 {
        self.state.borrow().border
    }

    /// Display update control 1 (`0x21`).
    pub fn update_control(&self) -> [u8; 2] {
        self.state.borrow().update_ctrl1
    }

    /// Whether the controller is in deep sleep.
    pub fn is_asleep(&self) -> bool {
        self.state.borrow().asleep
    }

    /// Bytes that arrived while asleep and were ignored.
    pub fn writes_while_asleep(&self) -> u32 {
        self.state.borrow().writes_while_asleep
    }

    /// Protocol violations seen so far.
    pub fn protocol_errors(&self) -> Vec<String> {
        self.state.borrow().errors.clone()
    }

    /// Total time requested from [`SimDelay`].
    pub fn elapsed(&self) -> core::time::Duration {
        core::time::Duration::from_nanos(self.state.borrow().elapsed_ns)
    }

    // ── Screenshot utilities ─────────────────────────────────────────────────

    fn to_image(&self) -> image::GrayImage {
        let spec = self.spec();
        image::GrayImage::from_fn(spec.width, spec.height, |x, y| {
            match self.pixel_at(x, y) {
                Some(BinaryColor::On) => image::Luma([0u8]),
                _ => image::Luma([255u8]),
            }
        })
    }

    /// Save the glass as a PNG.
    pub fn screenshot(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let p = path.as_ref();
        if let Some(parent) = p.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.to_image().save(p)?;
        Ok(())
    }

    /// Assert the glass matches a golden reference PNG exactly.
    ///
    /// Set the `UPDATE_GOLDEN=1` environment variable to **update** the golden
    /// file instead of asserting.
    pub fn assert_matches_golden(&self, path: impl AsRef<Path>) -> Result<(), String> {
        let p = path.as_ref();
        if std::env::var("UPDATE_GOLDEN").is_ok_and(|v| v == "1") {
            return self
                .screenshot(p)
                .map_err(|e| format!("failed to write golden {}: {e}", p.display()));
        }
        let golden = image::open(p)
            .map_err(|e| format!("failed to load golden {}: {e}", p.display()))?
            .to_luma8();
        let actual = self.to_image();
        if golden.dimensions() != actual.dimensions() {
            return Err(format!(
                "golden {} is {:?}, screen is {:?}",
                p.display(),
                golden.dimensions(),
                actual.dimensions()
            ));
        }
        let diff = golden
            .pixels()
            .zip(actual.pixels())
            .filter(|(a, b)| a != b)
            .count();
        if diff == 0 {
            Ok(())
        } else {
            Err(format!("{diff} pixels differ from golden {}", p.display()))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bus handles
// ─────────────────────────────────────────────────────────────────────────────

/// Error raised by [`SimSpi`] while failure injection is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimBusError;

impl spi::Error for SimBusError {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

/// SPI device end of the simulated bus (chip select is implicit).
#[derive(Debug)]
pub struct SimSpi(Rc<RefCell<SimState>>);

impl spi::ErrorType for SimSpi {
    type Error = SimBusError;
}

impl SpiDevice for SimSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        if state.spi_failing {
            return Err(SimBusError);
        }
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => state.write(bytes),
                Operation::DelayNs(ns) => state.elapsed_ns += u64::from(*ns),
                Operation::Read(buf) => buf.fill(0),
                Operation::Transfer(read, write) => {
                    state.write(write);
                    read.fill(0);
                }
                Operation::TransferInPlace(buf) => {
                    let bytes = buf.to_vec();
                    state.write(&bytes);
                    buf.fill(0);
                }
            }
        }
        Ok(())
    }
}

/// D/C line: low = command, high = data.
#[derive(Debug)]
pub struct SimDc(Rc<RefCell<SimState>>);

impl digital::ErrorType for SimDc {
    type Error = core::convert::Infallible;
}

impl OutputPin for SimDc {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().dc_data = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().dc_data = true;
        Ok(())
    }
}

/// Active-low reset line. A low-to-high edge resets the controller.
#[derive(Debug)]
pub struct SimRst(Rc<RefCell<SimState>>);

impl digital::ErrorType for SimRst {
    type Error = core::convert::Infallible;
}

impl OutputPin for SimRst {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().rst_low = true;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        if state.rst_low {
            state.rst_low = false;
            state.hardware_reset();
        }
        Ok(())
    }
}

/// BUSY output of the controller.
#[derive(Debug)]
pub struct SimBusy(Rc<RefCell<SimState>>);

impl digital::ErrorType for SimBusy {
    type Error = core::convert::Infallible;
}

impl InputPin for SimBusy {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.borrow_mut().busy_high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Delay that advances simulated time instead of sleeping.
#[derive(Debug)]
pub struct SimDelay(Rc<RefCell<SimState>>);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().elapsed_ns += u64::from(ns);
    }
}
