use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiDevice};
use st7789::{Config, DriverResult, Error, St7789};

use mjpeg_player_core::display::{Display, Region};

/// ST7789 panel exposed through the player's display seam.
#[derive(Debug)]
pub struct PanelDisplay<SPI, DC, RST> {
    panel: St7789<SPI, DC, RST>,
}

impl<SPI, DC, RST> PanelDisplay<SPI, DC, RST>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin,
{
    /// Resets and initializes the panel, then clears it to black.
    pub fn initialize<D>(
        spi: SPI,
        dc: DC,
        rst: RST,
        config: Config,
        delay: &mut D,
    ) -> Result<Self, Error<SPI::Error, DC::Error, RST::Error>>
    where
        D: DelayNs,
    {
        let mut panel = St7789::new(spi, dc, rst, config);
        panel.init(delay)?;
        panel.clear(0x0000)?;
        Ok(Self { panel })
    }

    pub fn panel(&mut self) -> &mut St7789<SPI, DC, RST> {
        &mut self.panel
    }

    pub fn clear(&mut self, color: u16) -> DriverResult<SPI::Error, DC::Error, RST::Error> {
        self.panel.clear(color)
    }
}

impl<SPI, DC, RST> Display for PanelDisplay<SPI, DC, RST>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin,
    SPI::Error: core::fmt::Debug,
    DC::Error: core::fmt::Debug,
    RST::Error: core::fmt::Debug,
{
    type Error = Error<SPI::Error, DC::Error, RST::Error>;

    fn size(&self) -> (u16, u16) {
        self.panel.size()
    }

    fn blit(&mut self, region: Region, pixels: &[u16]) -> Result<(), Self::Error> {
        self.panel
            .blit(region.x, region.y, region.width, region.height, pixels)
    }

    fn set_inverted(&mut self, inverted: bool) -> Result<(), Self::Error> {
        self.panel.set_inverted(inverted)
    }
}
