//! Display driver seam.

/// Axis-aligned pixel rectangle in absolute display coordinates.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Region {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Region {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn translated(self, dx: u16, dy: u16) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..self
        }
    }

    /// Whether the whole region lies inside a `width` x `height` surface.
    pub fn fits_within(&self, width: u16, height: u16) -> bool {
        self.x as u32 + self.width as u32 <= width as u32
            && self.y as u32 + self.height as u32 <= height as u32
    }
}

/// Fixed-resolution RGB565 panel.
pub trait Display {
    type Error: core::fmt::Debug;

    /// Visible `(width, height)` after rotation.
    fn size(&self) -> (u16, u16);

    /// Writes `region.pixel_count()` row-major RGB565 pixels into `region`.
    fn blit(&mut self, region: Region, pixels: &[u16]) -> Result<(), Self::Error>;

    /// Applies global color inversion immediately.
    fn set_inverted(&mut self, inverted: bool) -> Result<(), Self::Error>;
}
