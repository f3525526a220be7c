//! Pre-configured panel specifications

pub mod weact;

pub use weact::*;
