//! Command set and wire encoding helpers for the ST7789 controller.

/// Controller frame memory width in pixels.
pub const RAM_WIDTH: u16 = 240;
/// Controller frame memory height in pixels.
pub const RAM_HEIGHT: u16 = 320;

/// Pixels staged per SPI write when streaming RGB565 data.
pub const PIXEL_CHUNK: usize = 64;

pub const SWRESET: u8 = 0x01;
pub const SLPOUT: u8 = 0x11;
pub const NORON: u8 = 0x13;
pub const INVOFF: u8 = 0x20;
pub const INVON: u8 = 0x21;
pub const DISPON: u8 = 0x29;
/// Column address set.
pub const CASET: u8 = 0x2A;
/// Row address set.
pub const RASET: u8 = 0x2B;
/// Memory write.
pub const RAMWR: u8 = 0x2C;
/// Memory access control (scan direction and color order).
pub const MADCTL: u8 = 0x36;
/// Interface pixel format.
pub const COLMOD: u8 = 0x3A;

/// `COLMOD` parameter: 65K colors, 16 bits per pixel.
pub const COLMOD_RGB565: u8 = 0x55;

const MADCTL_MY: u8 = 0x80;
const MADCTL_MX: u8 = 0x40;
const MADCTL_MV: u8 = 0x20;
const MADCTL_BGR: u8 = 0x08;

/// Panel orientation, clockwise.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Whether columns and rows are swapped in frame memory.
    pub const fn is_transposed(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// `MADCTL` parameter for a rotation and color order.
pub const fn madctl(rotation: Rotation, bgr: bool) -> u8 {
    let scan = match rotation {
        Rotation::Deg0 => 0,
        Rotation::Deg90 => MADCTL_MX | MADCTL_MV,
        Rotation::Deg180 => MADCTL_MX | MADCTL_MY,
        Rotation::Deg270 => MADCTL_MY | MADCTL_MV,
    };
    if bgr { scan | MADCTL_BGR } else { scan }
}

/// Frame memory offset of the visible `width` x `height` window.
///
/// Panels smaller than controller RAM sit at the top-left of RAM in
/// `Deg0`; flipped orientations scan from the far edge, so the unused
/// rows (or columns) move in front of the visible area.
pub const fn window_offset(rotation: Rotation, width: u16, height: u16) -> (u16, u16) {
    match rotation {
        Rotation::Deg0 => (0, 0),
        Rotation::Deg90 => (0, 0),
        Rotation::Deg180 => (
            RAM_WIDTH.saturating_sub(width),
            RAM_HEIGHT.saturating_sub(height),
        ),
        Rotation::Deg270 => (
            RAM_HEIGHT.saturating_sub(width),
            RAM_WIDTH.saturating_sub(height),
        ),
    }
}

/// `CASET`/`RASET` parameters for an inclusive `start..=end` range.
#[inline]
pub const fn address_range(start: u16, end: u16) -> [u8; 4] {
    let [start_hi, start_lo] = start.to_be_bytes();
    let [end_hi, end_lo] = end.to_be_bytes();
    [start_hi, start_lo, end_hi, end_lo]
}

/// Serializes RGB565 pixels big-endian into `out`.
///
/// Returns the number of bytes written, which is limited by whichever of
/// the two slices runs out first.
#[inline]
pub fn encode_pixels(pixels: &[u16], out: &mut [u8]) -> usize {
    let mut written = 0;
    for (pixel, bytes) in pixels.iter().zip(out.chunks_exact_mut(2)) {
        bytes.copy_from_slice(&pixel.to_be_bytes());
        written += 2;
    }
    written
}
