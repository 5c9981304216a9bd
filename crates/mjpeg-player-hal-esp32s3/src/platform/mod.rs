pub mod clock;
pub mod display;
pub mod spi;

pub use clock::BootClock;
pub use display::PanelDisplay;
pub use spi::{OwnedSpiDevice, OwnedSpiError};
