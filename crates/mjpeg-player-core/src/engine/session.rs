use crate::layout::FrameLayout;

/// Counters for one file's playback.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PlaybackSession {
    pub frame_count: u32,
    pub decode_errors: u32,
    pub started_ms: u64,
    pub elapsed_ms: u64,
    pub read_ms: u64,
    pub decode_ms: u64,
    pub present_ms: u64,
    /// Placement chosen from the first frame carrying a SOF header.
    pub layout: Option<FrameLayout>,
}

impl PlaybackSession {
    pub const fn start(now_ms: u64) -> Self {
        Self {
            frame_count: 0,
            decode_errors: 0,
            started_ms: now_ms,
            elapsed_ms: 0,
            read_ms: 0,
            decode_ms: 0,
            present_ms: 0,
            layout: None,
        }
    }

    pub fn finish(&mut self, now_ms: u64) {
        self.elapsed_ms = now_ms.saturating_sub(self.started_ms);
    }

    /// Whole frames per second over the session; 0 when no time elapsed.
    pub fn fps(&self) -> u32 {
        if self.elapsed_ms == 0 {
            return 0;
        }
        let fps = 1_000 * self.frame_count as u64 / self.elapsed_ms;
        fps.min(u32::MAX as u64) as u32
    }
}
