//! Application UI layer: text layout, keyboard layouts, list selection,
//! status line state.
//!
//! This crate is `no_std` by default; it only uses `core`, `alloc` and
//! `heapless`. Nothing here draws pixels: the application turns these
//! models into frames.

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

extern crate alloc;

pub mod keymap;
pub mod layout;
pub mod selection;
pub mod status;

pub use keymap::LayoutId;
pub use layout::{CursorPos, TextLayout, Viewport, VisualLine};
pub use selection::ListSelection;
pub use status::StatusLine;
