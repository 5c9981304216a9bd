//! Host-side fakes shared by the unit tests.

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::Cell;
use core::ops::ControlFlow;

use crate::clock::Clock;
use crate::decoder::{FrameDecoder, Scale};
use crate::display::{Display, Region};
use crate::input::{ButtonLine, Level};
use crate::layout::parse_frame_dimensions;
use crate::settings::{DisplayPreference, PreferenceStore};
use crate::storage::{ByteStream, DirEntry, MediaStorage, OpenError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeError {
    MissingFolder,
    Unavailable,
    BadFrame,
}

/// `FF D8 <payload> FF D9`.
pub fn jpeg_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.extend_from_slice(&[0xFF, 0xD8]);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&[0xFF, 0xD9]);
    frame
}

/// Minimal baseline JPEG skeleton: APP0, SOF0, SOS, two scan bytes, EOI.
pub fn jpeg_with_sof(width: u16, height: u16) -> Vec<u8> {
    let [h_hi, h_lo] = height.to_be_bytes();
    let [w_hi, w_lo] = width.to_be_bytes();
    let mut jpeg = alloc::vec![0xFF, 0xD8];
    jpeg.extend_from_slice(&[
        0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00,
        0x01, 0x00, 0x00,
    ]);
    jpeg.extend_from_slice(&[
        0xFF, 0xC0, 0x00, 0x11, 0x08, h_hi, h_lo, w_hi, w_lo, 0x03, 0x01, 0x22, 0x00, 0x02, 0x11,
        0x01, 0x03, 0x11, 0x01,
    ]);
    jpeg.extend_from_slice(&[
        0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00,
    ]);
    jpeg.extend_from_slice(&[0x12, 0x34, 0xFF, 0xD9]);
    jpeg
}

/// `frames` copies of a `width` x `height` frame back to back.
pub fn mjpeg_clip(frames: usize, width: u16, height: u16) -> Vec<u8> {
    let frame = jpeg_with_sof(width, height);
    let mut clip = Vec::with_capacity(frame.len() * frames);
    for _ in 0..frames {
        clip.extend_from_slice(&frame);
    }
    clip
}

/// In-memory stream handing out at most `max_read` bytes per call.
#[derive(Debug, Clone)]
pub struct ChunkedStream {
    data: Vec<u8>,
    pos: usize,
    max_read: usize,
}

impl ChunkedStream {
    pub fn new(data: Vec<u8>, max_read: usize) -> Self {
        Self {
            data,
            pos: 0,
            max_read: max_read.max(1),
        }
    }
}

impl ByteStream for ChunkedStream {
    type Error = FakeError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let remaining = &self.data[self.pos..];
        let n = remaining.len().min(buf.len()).min(self.max_read);
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
    is_hidden: bool,
}

/// One-folder volume held in memory. Records every open attempt.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    folder: String,
    files: Vec<MemoryFile>,
    max_read: usize,
    opened: Vec<String>,
}

impl MemoryStorage {
    pub fn new(folder: &str) -> Self {
        Self {
            folder: folder.to_string(),
            files: Vec::new(),
            max_read: 512,
            opened: Vec::new(),
        }
    }

    pub fn with_file(mut self, name: &str, data: &[u8]) -> Self {
        self.files.push(MemoryFile {
            name: name.to_string(),
            data: data.to_vec(),
            is_dir: false,
            is_hidden: false,
        });
        self
    }

    pub fn with_hidden_file(mut self, name: &str, data: &[u8]) -> Self {
        self.files.push(MemoryFile {
            name: name.to_string(),
            data: data.to_vec(),
            is_dir: false,
            is_hidden: true,
        });
        self
    }

    pub fn with_dir(mut self, name: &str) -> Self {
        self.files.push(MemoryFile {
            name: name.to_string(),
            data: Vec::new(),
            is_dir: true,
            is_hidden: false,
        });
        self
    }

    pub fn with_max_read(mut self, max_read: usize) -> Self {
        self.max_read = max_read;
        self
    }

    pub fn remove(&mut self, name: &str) {
        self.files.retain(|file| file.name != name);
    }

    pub fn opened(&self) -> &[String] {
        &self.opened
    }
}

impl MediaStorage for MemoryStorage {
    type Error = FakeError;
    type Stream<'s>
        = ChunkedStream
    where
        Self: 's;

    fn list_dir<F>(&mut self, folder: &str, mut visit: F) -> Result<(), Self::Error>
    where
        F: FnMut(DirEntry<'_>) -> ControlFlow<()>,
    {
        if folder != self.folder {
            return Err(FakeError::MissingFolder);
        }
        for file in &self.files {
            let entry = DirEntry {
                name: &file.name,
                size_bytes: file.data.len() as u32,
                is_dir: file.is_dir,
                is_hidden: file.is_hidden,
            };
            if visit(entry).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn open<'s>(
        &'s mut self,
        folder: &str,
        name: &str,
    ) -> Result<Self::Stream<'s>, OpenError<Self::Error>> {
        self.opened.push(name.to_string());
        if folder != self.folder {
            return Err(OpenError::Storage(FakeError::MissingFolder));
        }
        let file = self
            .files
            .iter()
            .find(|file| file.name == name)
            .ok_or(OpenError::NotFound)?;
        if file.is_dir {
            return Err(OpenError::IsDirectory);
        }
        Ok(ChunkedStream::new(file.data.clone(), self.max_read))
    }
}

#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    record: Option<DisplayPreference>,
    writes: usize,
}

impl MemoryPreferenceStore {
    pub fn with_record(record: DisplayPreference) -> Self {
        Self {
            record: Some(record),
            writes: 0,
        }
    }

    pub fn record(&self) -> Option<DisplayPreference> {
        self.record
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    type Error = FakeError;

    fn load(&mut self) -> Result<Option<DisplayPreference>, Self::Error> {
        Ok(self.record)
    }

    fn save(&mut self, preference: &DisplayPreference) -> Result<(), Self::Error> {
        self.record = Some(*preference);
        self.writes += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FailingPreferenceStore;

impl PreferenceStore for FailingPreferenceStore {
    type Error = FakeError;

    fn load(&mut self) -> Result<Option<DisplayPreference>, Self::Error> {
        Err(FakeError::Unavailable)
    }

    fn save(&mut self, _preference: &DisplayPreference) -> Result<(), Self::Error> {
        Err(FakeError::Unavailable)
    }
}

/// Shared millisecond clock that advances `tick_ms` on every read.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
    tick_ms: u64,
}

impl ManualClock {
    pub fn new(tick_ms: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(0)),
            tick_ms,
        }
    }

    /// Current time without advancing.
    pub fn peek(&self) -> u64 {
        self.now.get()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        let now = self.now.get() + self.tick_ms;
        self.now.set(now);
        now
    }
}

/// Active-low button pressed during fixed `[start, end)` windows of the
/// shared clock.
#[derive(Debug, Clone)]
pub struct ScriptedButton {
    clock: ManualClock,
    presses: Vec<(u64, u64)>,
}

impl ScriptedButton {
    pub fn new(clock: &ManualClock) -> Self {
        Self {
            clock: clock.clone(),
            presses: Vec::new(),
        }
    }

    pub fn with_press(mut self, start_ms: u64, end_ms: u64) -> Self {
        self.presses.push((start_ms, end_ms));
        self
    }
}

impl ButtonLine for ScriptedButton {
    type Error = FakeError;

    fn sample(&mut self) -> Result<Level, Self::Error> {
        let now = self.clock.peek();
        let pressed = self
            .presses
            .iter()
            .any(|&(start, end)| (start..end).contains(&now));
        Ok(if pressed { Level::Low } else { Level::High })
    }
}

#[derive(Debug)]
pub struct RecordingDisplay {
    size: (u16, u16),
    blits: Vec<Region>,
    inversions: Vec<bool>,
    fail_blits: bool,
}

impl RecordingDisplay {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            size: (width, height),
            blits: Vec::new(),
            inversions: Vec::new(),
            fail_blits: false,
        }
    }

    pub fn failing_blits(mut self) -> Self {
        self.fail_blits = true;
        self
    }

    pub fn blits(&self) -> &[Region] {
        &self.blits
    }

    /// Every inversion state applied, in order.
    pub fn inversions(&self) -> &[bool] {
        &self.inversions
    }

    pub fn inverted(&self) -> Option<bool> {
        self.inversions.last().copied()
    }
}

impl Display for RecordingDisplay {
    type Error = FakeError;

    fn size(&self) -> (u16, u16) {
        self.size
    }

    fn blit(&mut self, region: Region, pixels: &[u16]) -> Result<(), Self::Error> {
        assert_eq!(pixels.len(), region.pixel_count());
        assert!(region.fits_within(self.size.0, self.size.1));
        if self.fail_blits {
            return Err(FakeError::Unavailable);
        }
        self.blits.push(region);
        Ok(())
    }

    fn set_inverted(&mut self, inverted: bool) -> Result<(), Self::Error> {
        self.inversions.push(inverted);
        Ok(())
    }
}

/// Emits 16x8 tiles covering the scaled frame; frames without a SOF fail.
#[derive(Debug, Default)]
pub struct FakeDecoder {
    calls: usize,
}

impl FakeDecoder {
    pub const TILE_W: u16 = 16;
    pub const TILE_H: u16 = 8;

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl FrameDecoder for FakeDecoder {
    type Error = FakeError;

    fn decode<F>(
        &mut self,
        jpeg: &[u8],
        scale: Scale,
        scratch: &mut [u16],
        mut draw: F,
    ) -> Result<(), Self::Error>
    where
        F: FnMut(Region, &[u16]) -> bool,
    {
        self.calls += 1;
        let (width, height) = parse_frame_dimensions(jpeg).ok_or(FakeError::BadFrame)?;
        let (out_w, out_h) = scale.apply(width, height);

        for y in (0..out_h).step_by(Self::TILE_H as usize) {
            for x in (0..out_w).step_by(Self::TILE_W as usize) {
                let region = Region::new(
                    x,
                    y,
                    Self::TILE_W.min(out_w - x),
                    Self::TILE_H.min(out_h - y),
                );
                let pixels = scratch
                    .get_mut(..region.pixel_count())
                    .ok_or(FakeError::Unavailable)?;
                pixels.fill(0xF800);
                if !draw(region, pixels) {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}
