//! Instructions shown while documents are shared over Bluetooth.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use super::{draw_text, LINE_H, MARGIN_X, MARGIN_Y};

/// What the file-server screen shows.
#[derive(Debug, Clone)]
pub struct FileServerScreen<'a> {
    /// Bluetooth name to pair with.
    pub alias: &'a str,
    /// Address of the device on the PAN.
    pub address: &'a str,
    /// Minutes until the server switches itself off.
    pub auto_off_minutes: u64,
}

impl FileServerScreen<'_> {
    /// Text lines; `None` is a blank line.
    pub fn lines(&self) -> Vec<Option<String>> {
        vec![
            Some("-- File Server --".to_owned()),
            None,
            Some("1. Pair Bluetooth".to_owned()),
            Some(format!("   with \"{}\"", self.alias)),
            None,
            Some("2. Open browser:".to_owned()),
            Some(format!("   https://{}", self.address)),
            None,
            Some(format!("Auto-off: {} min", self.auto_off_minutes)),
            Some("Ctrl+F to stop".to_owned()),
        ]
    }

    /// Draw the instructions.
    pub fn render<D>(&self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        display.clear(BinaryColor::Off)?;
        let mut y = MARGIN_Y + 10;
        for line in self.lines() {
            if let Some(text) = line {
                draw_text(display, &text, MARGIN_X, y, BinaryColor::On)?;
            }
            y += LINE_H;
        }
        Ok(())
    }
}
