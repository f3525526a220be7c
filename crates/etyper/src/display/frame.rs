//! 1bpp frame in the controller's RAM layout.
//!
//! Row-major, 8 pixels per byte, MSB-first. Bit 1 = white, bit 0 = black;
//! `BinaryColor::On` is ink.

// Pixel coordinates from embedded-graphics are i32; after the bounds check
// they are non-negative and below the panel size.
#![allow(clippy::cast_sign_loss)]

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use platform::DisplayInfo;

/// Off-screen frame that screens draw into before it is pushed to a panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    info: DisplayInfo,
    bytes: Vec<u8>,
}

impl Frame {
    /// All-white frame for a panel of the given geometry.
    pub fn new(info: DisplayInfo) -> Self {
        Self {
            info,
            bytes: vec![0xFF; info.buffer_len()],
        }
    }

    /// Reset every pixel to white.
    pub fn clear_white(&mut self) {
        self.bytes.fill(0xFF);
    }

    /// Packed bytes, ready for `render_full` / `render_partial`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Panel geometry.
    pub fn info(&self) -> DisplayInfo {
        self.info
    }

    /// Colour at `(x, y)`, `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<BinaryColor> {
        let (index, mask) = self.locate(x, y)?;
        let byte = self.bytes.get(index)?;
        Some(if byte & mask == 0 {
            BinaryColor::On
        } else {
            BinaryColor::Off
        })
    }

    /// Whether the frame has no ink at all.
    pub fn is_white(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0xFF)
    }

    /// Number of black pixels inside `area`.
    pub fn ink_in(&self, area: &Rectangle) -> usize {
        area.points()
            .filter(|p| p.x >= 0 && p.y >= 0)
            .filter(|p| self.pixel(p.x as u32, p.y as u32) == Some(BinaryColor::On))
            .count()
    }

    fn locate(&self, x: u32, y: u32) -> Option<(usize, u8)> {
        if x >= self.info.width || y >= self.info.height {
            return None;
        }
        let index = y as usize * self.info.bytes_per_row() + x as usize / 8;
        Some((index, 0x80 >> (x % 8)))
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.info.width, self.info.height)
    }
}

impl DrawTarget for Frame {
    type Color = BinaryColor;
    type Error = Infallible;

    /// Out-of-bounds pixels are dropped.
    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let Some((index, mask)) = self.locate(point.x as u32, point.y as u32) else {
                continue;
            };
            if let Some(byte) = self.bytes.get_mut(index) {
                match color {
                    BinaryColor::On => *byte &= !mask,
                    BinaryColor::Off => *byte |= mask,
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::PrimitiveStyle;

    fn weact() -> DisplayInfo {
        DisplayInfo {
            width: 400,
            height: 300,
        }
    }

    #[test]
    fn test_new_frame_is_white() {
        let frame = Frame::new(weact());
        assert_eq!(frame.as_bytes().len(), 15_000);
        assert!(frame.is_white());
    }

    #[test]
    fn test_first_pixel_is_msb_of_first_byte() {
        let mut frame = Frame::new(weact());
        frame
            .draw_iter(core::iter::once(Pixel(Point::new(0, 0), BinaryColor::On)))
            .unwrap();
        assert_eq!(frame.as_bytes()[0], 0x7F);
        assert_eq!(frame.pixel(0, 0), Some(BinaryColor::On));
        assert_eq!(frame.pixel(1, 0), Some(BinaryColor::Off));
    }

    #[test]
    fn test_row_stride_is_50_bytes() {
        let mut frame = Frame::new(weact());
        frame
            .draw_iter(core::iter::once(Pixel(Point::new(9, 1), BinaryColor::On)))
            .unwrap();
        // row 1 starts at byte 50; x=9 is bit 6 of byte 51
        assert_eq!(frame.as_bytes()[51], 0b1011_1111);
    }

    #[test]
    fn test_out_of_bounds_pixels_ignored() {
        let mut frame = Frame::new(weact());
        frame
            .draw_iter([
                Pixel(Point::new(-1, 0), BinaryColor::On),
                Pixel(Point::new(0, -1), BinaryColor::On),
                Pixel(Point::new(400, 0), BinaryColor::On),
                Pixel(Point::new(0, 300), BinaryColor::On),
            ])
            .unwrap();
        assert!(frame.is_white());
        assert_eq!(frame.pixel(400, 0), None);
    }

    #[test]
    fn test_fill_and_clear() {
        let mut frame = Frame::new(weact());
        Rectangle::new(Point::new(8, 10), Size::new(10, 20))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut frame)
            .unwrap();
        assert_eq!(frame.pixel(8, 10), Some(BinaryColor::On));
        assert_eq!(frame.pixel(17, 29), Some(BinaryColor::On));
        assert_eq!(frame.pixel(18, 29), Some(BinaryColor::Off));
        assert_eq!(frame.ink_in(&Rectangle::new(Point::zero(), Size::new(400, 300))), 200);
        frame.clear_white();
        assert!(frame.is_white());
    }
}
