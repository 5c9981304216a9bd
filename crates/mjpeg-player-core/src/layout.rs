//! Source dimension probing and on-screen placement of decoded frames.

use crate::decoder::Scale;

/// Parses the frame size from the first SOF segment of a JPEG image.
///
/// Returns `(width, height)`, or `None` when the data ends, hits SOS/EOI
/// first, or is not a JPEG.
pub fn parse_frame_dimensions(jpeg: &[u8]) -> Option<(u16, u16)> {
    if jpeg.get(..2)? != [0xFF, 0xD8] {
        return None;
    }

    let mut pos = 2usize;
    loop {
        // Find marker prefix.
        while *jpeg.get(pos)? != 0xFF {
            pos += 1;
        }
        // Collapse fill bytes.
        while *jpeg.get(pos)? == 0xFF {
            pos += 1;
        }
        let marker = *jpeg.get(pos)?;
        pos += 1;

        if marker == 0x00 || marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            continue;
        }
        if marker == 0xD9 || marker == 0xDA {
            return None;
        }

        let seg_len = u16::from_be_bytes([*jpeg.get(pos)?, *jpeg.get(pos + 1)?]) as usize;
        if seg_len < 2 {
            return None;
        }

        if is_sof_marker(marker) {
            let payload = jpeg.get(pos + 2..pos + seg_len)?;
            if payload.len() < 5 {
                return None;
            }
            let height = u16::from_be_bytes([payload[1], payload[2]]);
            let width = u16::from_be_bytes([payload[3], payload[4]]);
            if width == 0 || height == 0 {
                return None;
            }
            return Some((width, height));
        }

        pos += seg_len;
    }
}

fn is_sof_marker(marker: u8) -> bool {
    matches!(
        marker,
        0xC0 | 0xC1 | 0xC2 | 0xC3 | 0xC5 | 0xC6 | 0xC7 | 0xC9 | 0xCA | 0xCB | 0xCD | 0xCE | 0xCF
    )
}

/// Where and at which scale a source frame lands on the display.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameLayout {
    pub source: (u16, u16),
    pub scale: Scale,
    pub output: (u16, u16),
    /// Top-left corner of the output on the display.
    pub origin: (u16, u16),
}

impl FrameLayout {
    /// Picks the largest output (smallest downscale) that fits the display
    /// and centers it. Sources too large even at 1/8 are clipped.
    pub fn fit(source_w: u16, source_h: u16, display_w: u16, display_h: u16) -> Self {
        let scale = Scale::ALL
            .into_iter()
            .find(|scale| {
                let (w, h) = scale.apply(source_w, source_h);
                w <= display_w && h <= display_h
            })
            .unwrap_or(Scale::Eighth);
        let output = scale.apply(source_w, source_h);
        let origin = (
            display_w.saturating_sub(output.0) / 2,
            display_h.saturating_sub(output.1) / 2,
        );

        Self {
            source: (source_w, source_h),
            scale,
            output,
            origin,
        }
    }
}
