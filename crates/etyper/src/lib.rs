//! etyper: a distraction-free typewriter on a 4.2" e-paper panel.
//!
//! # Layers
//!
//! ```text
//! main (binary)             wiring, logging, signals
//!         ↓
//! modes                     ModeController, Typing / Sleeping / LayoutPicker / FileServer
//!         ↓
//! editor, screens, session  text + cursor, frame rendering, network resources
//!         ↓
//! display, document, server SSD1683 driver, files on disk, HTTP(S)
//!         ↓
//! platform, ui, bluetooth   capability traits, layout engine, BlueZ tools
//! ```
//!
//! Everything above `display::hardware` is generic over the `platform`
//! traits and runs against the mocks in tests.

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
pub mod document;
pub mod editor;
pub mod modes;
pub mod screens;
pub mod server;
pub mod session;
pub mod signals;

pub use config::{DeviceConfig, PanelConfig};
pub use document::{Document, DocumentError, DocumentStore};
pub use editor::Editor;
pub use modes::{DeviceContext, Mode, ModeController, ModeError, ModeKind};
pub use session::{ResourceSession, SessionError, SystemBackend};
