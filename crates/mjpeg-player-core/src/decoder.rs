//! Frame-level JPEG decoder seam.

use crate::display::Region;

/// Output downscale applied by the decoder.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Scale {
    #[default]
    Full,
    Half,
    Quarter,
    Eighth,
}

impl Scale {
    pub const ALL: [Self; 4] = [Self::Full, Self::Half, Self::Quarter, Self::Eighth];

    /// Power-of-two exponent (`0` = 1/1 .. `3` = 1/8).
    pub const fn shift(self) -> u8 {
        match self {
            Self::Full => 0,
            Self::Half => 1,
            Self::Quarter => 2,
            Self::Eighth => 3,
        }
    }

    pub const fn divisor(self) -> u16 {
        1 << self.shift()
    }

    /// Output size of a `width` x `height` image at this scale.
    pub const fn apply(self, width: u16, height: u16) -> (u16, u16) {
        let divisor = self.divisor();
        (width.div_ceil(divisor), height.div_ceil(divisor))
    }
}

/// Decodes one complete JPEG image held in memory.
pub trait FrameDecoder {
    type Error: core::fmt::Debug;

    /// Decodes `jpeg` at `scale`, staging RGB565 blocks in `scratch` and
    /// handing each finished block to `draw` in image coordinates.
    ///
    /// `draw` returns `false` to abort the rest of the frame.
    fn decode<F>(
        &mut self,
        jpeg: &[u8],
        scale: Scale,
        scratch: &mut [u16],
        draw: F,
    ) -> Result<(), Self::Error>
    where
        F: FnMut(Region, &[u16]) -> bool;
}
