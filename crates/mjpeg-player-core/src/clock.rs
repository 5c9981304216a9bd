//! Monotonic millisecond time source.

pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin (usually boot).
    fn now_ms(&self) -> u64;
}
