use embedded_hal::digital::InputPin;

use mjpeg_player_core::input::{ButtonLine, Level};

/// Single push button read by polling. Pull configuration is done by the
/// caller when building the pin.
#[derive(Debug)]
pub struct PushButton<PIN> {
    pin: PIN,
}

impl<PIN> PushButton<PIN>
where
    PIN: InputPin,
{
    pub fn new(pin: PIN) -> Self {
        Self { pin }
    }

    pub fn release(self) -> PIN {
        self.pin
    }
}

impl<PIN> ButtonLine for PushButton<PIN>
where
    PIN: InputPin,
{
    type Error = PIN::Error;

    fn sample(&mut self) -> Result<Level, Self::Error> {
        self.pin.is_high().map(Level::from_high)
    }
}
