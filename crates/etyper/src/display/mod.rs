//! Display stack for the WeAct 4.2" panel: the SSD1683 driver, the 1bpp
//! frame screens draw into, and (on the device) the SPI/GPIO wiring.

pub mod driver;
pub mod frame;

#[cfg(feature = "hardware")]
pub mod hardware;

// The driver is always compiled (no hardware gate) so host tests exercise it.
pub use driver::{Command, Ssd1683, CHUNK_SIZE};
pub use frame::Frame;

#[cfg(feature = "hardware")]
pub use hardware::{open_panel, DevicePanel};

/// Display width in pixels (WeAct 4.2")
pub const DISPLAY_WIDTH: u32 = eink_specs::displays::WEACT_4_2.width;

/// Display height in pixels (WeAct 4.2")
pub const DISPLAY_HEIGHT: u32 = eink_specs::displays::WEACT_4_2.height;

/// Frame size in bytes (400×300 at 1 bit per pixel = 15,000 bytes)
pub const FRAMEBUFFER_SIZE: usize = eink_specs::displays::WEACT_4_2.buffer_len();
