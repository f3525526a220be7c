//! Hardware Abstraction Layer (HAL) for the etyper typewriter
//!
//! This crate provides trait-based abstractions for every collaborator the
//! application talks to, enabling development and testing without the
//! physical panel, keyboard or Bluetooth radio.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (etyper crate)
//!         ↓
//! Feature Layers (ui, bluetooth)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Linux (spidev, GPIO character device, evdev, processes)
//! ```
//!
//! # Abstractions
//!
//! - [`EpaperPanel`] - e-paper refresh-mode state machine
//! - [`InputDevice`] - key events with a bounded wait
//! - [`Clock`] / [`BoundedWait`] - time source and bounded polling
//! - [`CommandRunner`] - external programs with mandatory timeouts
//! - [`StopFlag`] - cooperative cancellation shared with signal handlers
//!
//! # Features
//!
//! - `mocks`: export [`mocks`] for other crates' tests
//!
//! # Example
//!
//! ```no_run
//! use platform::{EpaperPanel, RefreshKind};
//!
//! fn show<P: EpaperPanel>(panel: &mut P, frame: &[u8]) {
//!     match panel.render_partial(frame) {
//!         Ok(RefreshKind::Full) => tracing::info!("ghosting cleanup ran"),
//!         Ok(RefreshKind::Partial) => {}
//!         Err(e) => tracing::warn!(error = %e, "render failed"),
//!     }
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::print_stdout)] // prefer tracing over println! in lib code
#![allow(clippy::doc_markdown)] // opcode and register names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod display;
pub mod evdev;
pub mod input;
pub mod mocks;
pub mod process;
pub mod stop;
pub mod time;

// Re-export main high-level traits
pub use display::{
    DisplayError, DisplayInfo, DisplayState, EpaperPanel, RefreshKind, RefreshPolicy,
};
pub use input::{InputDevice, InputError, InputEvent, KeyCode, KeyState, Modifiers};
pub use process::{ChildProcess, CommandError, CommandOutput, CommandRunner, SystemRunner};
pub use stop::StopFlag;
pub use time::{BoundedWait, Clock, StdDelay, SystemClock, WaitError};
