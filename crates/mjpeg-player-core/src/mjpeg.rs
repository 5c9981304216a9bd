//! Frame framing for concatenated-JPEG (MJPEG) streams.

use crate::storage::ByteStream;

/// Bytes requested from storage per read call.
pub const MJPEG_READ_CHUNK: usize = 1024;

const MARKER_PREFIX: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MjpegError<E> {
    Stream(E),
    /// A frame did not fit the decode buffer.
    FrameTooLarge { capacity: usize },
}

/// Splits a byte stream into complete JPEG frames inside a caller-owned
/// buffer.
///
/// Bytes read past a frame's EOI belong to the next frame; they are kept at
/// the tail of the buffer and moved to the front on the next call.
#[derive(Debug, Default, Clone, Copy)]
pub struct MjpegReader {
    carry_start: usize,
    carry_end: usize,
}

impl MjpegReader {
    pub const fn new() -> Self {
        Self {
            carry_start: 0,
            carry_end: 0,
        }
    }

    /// Forgets carried bytes; call when switching files.
    pub fn reset(&mut self) {
        self.carry_start = 0;
        self.carry_end = 0;
    }

    /// Reads the next complete frame into `buf[..len]` and returns `len`.
    ///
    /// Returns `Ok(None)` once the stream ends; a trailing partial frame is
    /// dropped.
    pub fn next_frame<S>(
        &mut self,
        stream: &mut S,
        buf: &mut [u8],
    ) -> Result<Option<usize>, MjpegError<S::Error>>
    where
        S: ByteStream,
    {
        let mut filled = self.carry_end.saturating_sub(self.carry_start).min(buf.len());
        if filled > 0 && self.carry_start > 0 {
            buf.copy_within(self.carry_start..self.carry_start + filled, 0);
        }
        self.reset();

        let mut frame_started = false;
        let mut scan_from = 0usize;

        loop {
            if !frame_started {
                if let Some(pos) = find_marker(&buf[..filled], SOI, 0) {
                    if pos > 0 {
                        buf.copy_within(pos..filled, 0);
                        filled -= pos;
                    }
                    frame_started = true;
                    scan_from = 2;
                } else {
                    // Drop junk, keeping a trailing prefix byte that may open SOI.
                    let keep_prefix = filled > 0 && buf[filled - 1] == MARKER_PREFIX;
                    filled = if keep_prefix {
                        buf[0] = MARKER_PREFIX;
                        1
                    } else {
                        0
                    };
                }
            }

            if frame_started {
                if let Some(pos) = find_marker(&buf[..filled], EOI, scan_from) {
                    let frame_len = pos + 2;
                    self.carry_start = frame_len;
                    self.carry_end = filled;
                    return Ok(Some(frame_len));
                }
                // Re-check the last byte next time in case EOI straddles reads.
                scan_from = filled.saturating_sub(1).max(2);
            }

            if filled >= buf.len() {
                return Err(MjpegError::FrameTooLarge {
                    capacity: buf.len(),
                });
            }

            if stream.is_eof() {
                return Ok(None);
            }

            let want = (buf.len() - filled).min(MJPEG_READ_CHUNK);
            let read = stream
                .read(&mut buf[filled..filled + want])
                .map_err(MjpegError::Stream)?;
            if read == 0 {
                return Ok(None);
            }
            filled += read;
        }
    }
}

fn find_marker(haystack: &[u8], marker: u8, from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(2)
        .position(|pair| pair[0] == MARKER_PREFIX && pair[1] == marker)
        .map(|pos| pos + from)
}
