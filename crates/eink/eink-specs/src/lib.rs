//! E-Ink Panel Specifications
//!
//! Static descriptions of the e-paper panels etyper can drive: geometry,
//! controller chip and the timing bounds the driver and the simulator
//! both rely on.
//!
//! # Features
//!
//! - **no_std compatible** - Plain `const` data, no allocation
//! - **Panel templates** - Pre-configured specs in [`displays`]
//!
//! # Example
//!
//! ```
//! use eink_specs::displays::WEACT_4_2;
//!
//! let spec = WEACT_4_2;
//! assert_eq!((spec.width, spec.height), (400, 300));
//! assert_eq!(spec.buffer_len(), 15_000);
//! ```
//!
//! # Custom Panel Specs
//!
//! ```
//! use eink_specs::{Controller, DisplaySpec};
//!
//! const MY_PANEL: DisplaySpec = DisplaySpec {
//!     name: "Custom 2.9\"",
//!     width: 296,
//!     height: 128,
//!     controller: Controller::SSD1680,
//!     max_partial_interval_s: 180,
//!     busy_timeout_ms: 10_000,
//! };
//! assert_eq!(MY_PANEL.bytes_per_row(), 37);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

mod display_spec;
pub mod displays;

pub use display_spec::{Controller, DisplaySpec};
