//! Decode scratch and output staging buffers, allocated once at startup.

use alloc::vec::Vec;

use log::info;

/// Start alignment of the output buffer, in bytes.
pub const OUTPUT_ALIGN_BYTES: usize = 16;
/// Rows of display width staged per output flush.
const OUTPUT_ROWS: usize = 4;
/// Headroom multiplier for decoder blocks taller than [`OUTPUT_ROWS`].
const OUTPUT_HEADROOM: usize = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BufferKind {
    Decode,
    Output,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameBufferError {
    /// Display reported a zero-sized surface.
    EmptyDisplay,
    OutOfMemory { buffer: BufferKind, bytes: usize },
}

/// Compressed-frame capacity for a `width` x `height` display.
///
/// Empirical estimate of one compressed frame plus margin; frames of
/// unusually high entropy can exceed it.
pub const fn decode_buffer_bytes(width: u16, height: u16) -> usize {
    width as usize * height as usize * 2 / 5
}

/// RGB565 pixels in the output staging buffer.
pub const fn output_buffer_pixels(width: u16) -> usize {
    width as usize * OUTPUT_ROWS * OUTPUT_HEADROOM
}

/// Owner of the two reusable buffers. Never resized after allocation.
#[derive(Debug)]
pub struct FrameBuffers {
    decode: Vec<u8>,
    output: Vec<u16>,
    output_start: usize,
    output_len: usize,
}

impl FrameBuffers {
    pub fn allocate(width: u16, height: u16) -> Result<Self, FrameBufferError> {
        if width == 0 || height == 0 {
            return Err(FrameBufferError::EmptyDisplay);
        }

        let decode_bytes = decode_buffer_bytes(width, height);
        let mut decode = Vec::new();
        decode
            .try_reserve_exact(decode_bytes)
            .map_err(|_| FrameBufferError::OutOfMemory {
                buffer: BufferKind::Decode,
                bytes: decode_bytes,
            })?;
        decode.resize(decode_bytes, 0);

        // Over-allocate by one alignment unit and start at the aligned slot.
        let output_len = output_buffer_pixels(width);
        let slack = OUTPUT_ALIGN_BYTES / core::mem::size_of::<u16>();
        let output_total = output_len + slack;
        let mut output = Vec::new();
        output
            .try_reserve_exact(output_total)
            .map_err(|_| FrameBufferError::OutOfMemory {
                buffer: BufferKind::Output,
                bytes: output_total * core::mem::size_of::<u16>(),
            })?;
        output.resize(output_total, 0);
        let output_start = output
            .as_ptr()
            .align_offset(OUTPUT_ALIGN_BYTES)
            .min(slack);

        info!(
            "buffers: decode_bytes={} output_pixels={} align={}",
            decode_bytes, output_len, OUTPUT_ALIGN_BYTES
        );

        Ok(Self {
            decode,
            output,
            output_start,
            output_len,
        })
    }

    pub fn decode_capacity(&self) -> usize {
        self.decode.len()
    }

    pub const fn output_capacity(&self) -> usize {
        self.output_len
    }

    /// Lends both buffers for one frame.
    pub fn split_mut(&mut self) -> (&mut [u8], &mut [u16]) {
        let output = &mut self.output[self.output_start..self.output_start + self.output_len];
        (self.decode.as_mut_slice(), output)
    }
}
