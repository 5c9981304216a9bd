//! Baseline JPEG decoding through the TJpgDec copy in the ESP32-S3 ROM.
//!
//! The ROM decoder pulls input and pushes output blocks through C
//! callbacks that carry no user pointer we control, so the per-decode
//! context lives in a global installed by [`DecodeGuard`] for the
//! duration of one frame.

use core::ffi::c_void;

use log::debug;
use mjpeg_player_core::{
    decoder::{FrameDecoder, Scale},
    display::Region,
};

/// TJpgDec work pool.
pub const JPEG_WORK_BYTES: usize = 8192;
/// Opaque `JDEC` state.
pub const JPEG_DECODER_BYTES: usize = 1536;

#[repr(C)]
#[derive(Clone, Copy, Debug)]
struct JpegRect {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

unsafe extern "C" {
    fn jd_prepare(
        jd: *mut c_void,
        infunc: Option<unsafe extern "C" fn(*mut c_void, *mut u8, u32) -> u32>,
        pool: *mut c_void,
        sz_pool: u32,
        device: *mut c_void,
    ) -> i32;

    fn jd_decomp(
        jd: *mut c_void,
        outfunc: Option<unsafe extern "C" fn(*mut c_void, *mut c_void, *mut JpegRect) -> u32>,
        scale: u8,
    ) -> i32;
}

const JDR_OK: i32 = 0;
const JDR_INTR: i32 = 1;
const JDR_INP: i32 = 2;
const JDR_MEM1: i32 = 3;
const JDR_MEM2: i32 = 4;
const JDR_PAR: i32 = 5;
const JDR_FMT1: i32 = 6;
const JDR_FMT2: i32 = 7;
const JDR_FMT3: i32 = 8;

fn jpeg_jdr_name(status: i32) -> &'static str {
    match status {
        JDR_OK => "ok",
        JDR_INTR => "intr",
        JDR_INP => "inp",
        JDR_MEM1 => "mem1",
        JDR_MEM2 => "mem2",
        JDR_PAR => "par",
        JDR_FMT1 => "fmt1",
        JDR_FMT2 => "fmt2",
        JDR_FMT3 => "fmt3_progressive_or_unsupported",
        _ => "unknown",
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RomJpegError {
    /// Another decode is in flight.
    Busy,
    Prepare(i32),
    Decompress(i32),
    /// Decoded block larger than the scratch buffer.
    BlockTooLarge { pixels: usize },
}

impl RomJpegError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Prepare(status) | Self::Decompress(status) => jpeg_jdr_name(*status),
            Self::BlockTooLarge { .. } => "block_too_large",
        }
    }
}

type EmitFn = unsafe fn(*mut c_void, Region, &[u16]) -> bool;

struct DecodeContext {
    input: *const u8,
    input_len: usize,
    input_pos: usize,
    scratch: *mut u16,
    scratch_len: usize,
    emit: EmitFn,
    draw: *mut c_void,
    aborted: bool,
    oversized_block: Option<usize>,
}

static mut JPEG_DECODE_CTX: *mut DecodeContext = core::ptr::null_mut();

#[inline]
unsafe fn decode_ctx_load() -> *mut DecodeContext {
    // SAFETY: Access is guarded by single-threaded decode guard discipline.
    unsafe { core::ptr::read(core::ptr::addr_of!(JPEG_DECODE_CTX)) }
}

#[inline]
unsafe fn decode_ctx_store(value: *mut DecodeContext) {
    // SAFETY: Access is guarded by single-threaded decode guard discipline.
    unsafe { core::ptr::write(core::ptr::addr_of_mut!(JPEG_DECODE_CTX), value) }
}

struct DecodeGuard;

impl DecodeGuard {
    unsafe fn install(ctx: *mut DecodeContext) -> Option<Self> {
        // SAFETY: Only one decode may own the global context at a time.
        unsafe {
            if !decode_ctx_load().is_null() {
                return None;
            }
            decode_ctx_store(ctx);
        }
        Some(Self)
    }
}

impl Drop for DecodeGuard {
    fn drop(&mut self) {
        // SAFETY: Clear global callback context on scope exit.
        unsafe { decode_ctx_store(core::ptr::null_mut()) }
    }
}

unsafe fn emit_block<F>(draw: *mut c_void, region: Region, pixels: &[u16]) -> bool
where
    F: FnMut(Region, &[u16]) -> bool,
{
    // SAFETY: `draw` points at the caller's closure for the current decode.
    let draw = unsafe { &mut *(draw as *mut F) };
    draw(region, pixels)
}

unsafe extern "C" fn jpeg_in_callback(_jd: *mut c_void, buff: *mut u8, nbyte: u32) -> u32 {
    // SAFETY: Context installed by DecodeGuard for this decode.
    let ctx_ptr = unsafe { decode_ctx_load() };
    if ctx_ptr.is_null() {
        return 0;
    }
    // SAFETY: Pointer stays valid for the whole jd_prepare/jd_decomp scope.
    let ctx = unsafe { &mut *ctx_ptr };

    let want = (nbyte as usize).min(ctx.input_len.saturating_sub(ctx.input_pos));
    if want == 0 {
        return 0;
    }

    // A null buffer asks us to skip input.
    if !buff.is_null() {
        // SAFETY: Source range is inside the frame slice; `buff` holds `nbyte`.
        unsafe { core::ptr::copy_nonoverlapping(ctx.input.add(ctx.input_pos), buff, want) };
    }
    ctx.input_pos += want;
    want as u32
}

unsafe extern "C" fn jpeg_out_callback(
    _jd: *mut c_void,
    bitmap: *mut c_void,
    rect: *mut JpegRect,
) -> u32 {
    if bitmap.is_null() || rect.is_null() {
        return 0;
    }

    // SAFETY: Context installed by DecodeGuard for this decode.
    let ctx_ptr = unsafe { decode_ctx_load() };
    if ctx_ptr.is_null() {
        return 0;
    }
    // SAFETY: Pointer stays valid for the whole jd_decomp scope.
    let ctx = unsafe { &mut *ctx_ptr };

    // SAFETY: Decoder provides a valid rectangle pointer for callback duration.
    let rect = unsafe { *rect };
    if rect.right < rect.left || rect.bottom < rect.top {
        return 0;
    }
    let width = rect.right - rect.left + 1;
    let height = rect.bottom - rect.top + 1;
    let pixels = width as usize * height as usize;
    if pixels > ctx.scratch_len {
        ctx.oversized_block = Some(pixels);
        return 0;
    }

    // ESP32-S3 ROM TJPGD emits RGB888 blocks.
    // SAFETY: TJPGD hands a contiguous `pixels * 3` byte bitmap.
    let rgb = unsafe { core::slice::from_raw_parts(bitmap as *const u8, pixels * 3) };
    // SAFETY: Scratch comes from a live `&mut [u16]` held by `decode`.
    let out = unsafe { core::slice::from_raw_parts_mut(ctx.scratch, pixels) };
    for (dst, src) in out.iter_mut().zip(rgb.chunks_exact(3)) {
        *dst = rgb888_to_rgb565(src[0], src[1], src[2]);
    }

    let region = Region::new(rect.left, rect.top, width, height);
    // SAFETY: `emit` was monomorphized for the closure behind `draw`.
    if unsafe { (ctx.emit)(ctx.draw, region, out) } {
        1
    } else {
        ctx.aborted = true;
        0
    }
}

#[inline]
const fn rgb888_to_rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

/// Frame decoder backed by the ROM TJpgDec. Baseline JPEG only.
pub struct RomJpegDecoder {
    state: [u32; JPEG_DECODER_BYTES / core::mem::size_of::<u32>()],
    work: [u8; JPEG_WORK_BYTES],
}

impl RomJpegDecoder {
    pub const fn new() -> Self {
        Self {
            state: [0; JPEG_DECODER_BYTES / core::mem::size_of::<u32>()],
            work: [0; JPEG_WORK_BYTES],
        }
    }
}

impl Default for RomJpegDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder for RomJpegDecoder {
    type Error = RomJpegError;

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
        let mut ctx = DecodeContext {
            input: jpeg.as_ptr(),
            input_len: jpeg.len(),
            input_pos: 0,
            scratch: scratch.as_mut_ptr(),
            scratch_len: scratch.len(),
            emit: emit_block::<F>,
            draw: (&mut draw as *mut F) as *mut c_void,
            aborted: false,
            oversized_block: None,
        };

        // SAFETY: Context outlives the guard, which clears it on every return.
        let Some(_guard) = (unsafe { DecodeGuard::install(&mut ctx as *mut DecodeContext) }) else {
            return Err(RomJpegError::Busy);
        };

        // SAFETY: ROM TJPGD expects opaque state pointer + callbacks + work pool.
        let prep = unsafe {
            jd_prepare(
                self.state.as_mut_ptr() as *mut c_void,
                Some(jpeg_in_callback),
                self.work.as_mut_ptr() as *mut c_void,
                JPEG_WORK_BYTES as u32,
                core::ptr::null_mut(),
            )
        };
        if prep != JDR_OK {
            debug!(
                "jpeg: jd_prepare status={} kind={}",
                prep,
                jpeg_jdr_name(prep)
            );
            return Err(RomJpegError::Prepare(prep));
        }

        // SAFETY: Decoder state is initialized by jd_prepare.
        let decomp = unsafe {
            jd_decomp(
                self.state.as_mut_ptr() as *mut c_void,
                Some(jpeg_out_callback),
                scale.shift(),
            )
        };

        if let Some(pixels) = ctx.oversized_block {
            return Err(RomJpegError::BlockTooLarge { pixels });
        }
        if ctx.aborted {
            return Ok(());
        }
        if decomp != JDR_OK {
            debug!(
                "jpeg: jd_decomp status={} kind={}",
                decomp,
                jpeg_jdr_name(decomp)
            );
            return Err(RomJpegError::Decompress(decomp));
        }
        Ok(())
    }
}
