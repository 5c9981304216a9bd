//! Button input abstraction.

pub mod gesture;

/// Electrical level sampled from the button line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Level {
    High,
    Low,
}

impl Level {
    pub const fn from_high(is_high: bool) -> Self {
        if is_high { Self::High } else { Self::Low }
    }
}

/// Polled digital line feeding the gesture recognizer.
pub trait ButtonLine {
    type Error;

    fn sample(&mut self) -> Result<Level, Self::Error>;
}
