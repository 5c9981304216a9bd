#![cfg_attr(not(test), no_std)]

//! ST7789 (240x240 / 240x320 IPS TFT) driver over a 4-wire SPI bus.

pub mod protocol;

#[cfg(feature = "embedded-graphics")]
mod graphics;

pub use protocol::Rotation;

use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiDevice};

/// Driver configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// Visible width after rotation.
    pub width: u16,
    /// Visible height after rotation.
    pub height: u16,
    pub rotation: Rotation,
    /// Panel wired with blue and red swapped.
    pub bgr: bool,
    /// Color inversion applied by `init`. Most IPS modules need it on to
    /// show true colors.
    pub invert: bool,
    /// Expected SPI clock in Hz (documented for board glue).
    pub spi_hz: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 240,
            height: 240,
            rotation: Rotation::Deg0,
            bgr: false,
            invert: true,
            spi_hz: 40_000_000,
        }
    }
}

impl Config {
    pub const fn with_size(mut self, width: u16, height: u16) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub const fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub const fn with_bgr(mut self, bgr: bool) -> Self {
        self.bgr = bgr;
        self
    }

    pub const fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    pub const fn with_spi_hz(mut self, spi_hz: u32) -> Self {
        self.spi_hz = spi_hz;
        self
    }
}

/// Driver errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error<SpiErr, DcErr, RstErr> {
    /// SPI transaction failed.
    Spi(SpiErr),
    /// Data/command pin operation failed.
    Dc(DcErr),
    /// Reset pin operation failed.
    Rst(RstErr),
    /// Window outside the panel or pixel count mismatch.
    InvalidInput,
}

pub type DriverResult<SpiErr, DcErr, RstErr> = Result<(), Error<SpiErr, DcErr, RstErr>>;

/// ST7789 driver.
#[derive(Debug)]
pub struct St7789<SPI, DC, RST> {
    spi: SPI,
    dc: DC,
    rst: RST,
    config: Config,
    inverted: bool,
}

impl<SPI, DC, RST> St7789<SPI, DC, RST>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin,
{
    pub fn new(spi: SPI, dc: DC, rst: RST, config: Config) -> Self {
        Self {
            spi,
            dc,
            rst,
            config,
            inverted: config.invert,
        }
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// Visible `(width, height)`.
    pub fn size(&self) -> (u16, u16) {
        (self.config.width, self.config.height)
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Releases owned bus and pins.
    pub fn release(self) -> (SPI, DC, RST) {
        (self.spi, self.dc, self.rst)
    }

    /// Pulses `RST` low.
    pub fn hard_reset<D: DelayNs>(&mut self, delay: &mut D) -> DriverResult<SPI::Error, DC::Error, RST::Error> {
        self.rst.set_high().map_err(Error::Rst)?;
        delay.delay_ms(1);
        self.rst.set_low().map_err(Error::Rst)?;
        delay.delay_ms(10);
        self.rst.set_high().map_err(Error::Rst)?;
        delay.delay_ms(120);
        Ok(())
    }

    /// Resets the controller and brings it up in RGB565 with the configured
    /// rotation and inversion.
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> DriverResult<SPI::Error, DC::Error, RST::Error> {
        self.hard_reset(delay)?;

        self.command(protocol::SWRESET, &[])?;
        delay.delay_ms(150);
        self.command(protocol::SLPOUT, &[])?;
        delay.delay_ms(10);
        self.command(protocol::COLMOD, &[protocol::COLMOD_RGB565])?;
        self.set_rotation(self.config.rotation)?;
        self.set_inverted(self.config.invert)?;
        self.command(protocol::NORON, &[])?;
        delay.delay_ms(10);
        self.command(protocol::DISPON, &[])?;
        delay.delay_ms(10);
        Ok(())
    }

    /// Switches global color inversion (`INVON`/`INVOFF`).
    pub fn set_inverted(&mut self, inverted: bool) -> DriverResult<SPI::Error, DC::Error, RST::Error> {
        let command = if inverted {
            protocol::INVON
        } else {
            protocol::INVOFF
        };
        self.command(command, &[])?;
        self.inverted = inverted;
        Ok(())
    }

    pub fn set_rotation(&mut self, rotation: Rotation) -> DriverResult<SPI::Error, DC::Error, RST::Error> {
        self.command(protocol::MADCTL, &[protocol::madctl(rotation, self.config.bgr)])?;
        self.config.rotation = rotation;
        Ok(())
    }

    /// Selects a `width` x `height` window at `(x, y)` and opens a memory write.
    pub fn set_window(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    ) -> DriverResult<SPI::Error, DC::Error, RST::Error> {
        if width == 0
            || height == 0
            || x as u32 + width as u32 > self.config.width as u32
            || y as u32 + height as u32 > self.config.height as u32
        {
            return Err(Error::InvalidInput);
        }

        let (offset_x, offset_y) =
            protocol::window_offset(self.config.rotation, self.config.width, self.config.height);
        let x0 = x + offset_x;
        let y0 = y + offset_y;
        self.command(protocol::CASET, &protocol::address_range(x0, x0 + width - 1))?;
        self.command(protocol::RASET, &protocol::address_range(y0, y0 + height - 1))?;
        self.command(protocol::RAMWR, &[])
    }

    /// Streams RGB565 pixels into the open window.
    pub fn write_pixels(&mut self, pixels: &[u16]) -> DriverResult<SPI::Error, DC::Error, RST::Error> {
        self.dc.set_high().map_err(Error::Dc)?;
        let mut bytes = [0u8; protocol::PIXEL_CHUNK * 2];
        for chunk in pixels.chunks(protocol::PIXEL_CHUNK) {
            let len = protocol::encode_pixels(chunk, &mut bytes);
            self.spi.write(&bytes[..len]).map_err(Error::Spi)?;
        }
        Ok(())
    }

    /// Writes a row-major block of `width * height` pixels at `(x, y)`.
    pub fn blit(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        pixels: &[u16],
    ) -> DriverResult<SPI::Error, DC::Error, RST::Error> {
        if pixels.len() != width as usize * height as usize {
            return Err(Error::InvalidInput);
        }
        self.set_window(x, y, width, height)?;
        self.write_pixels(pixels)
    }

    pub fn fill_rect(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        color: u16,
    ) -> DriverResult<SPI::Error, DC::Error, RST::Error> {
        self.set_window(x, y, width, height)?;
        self.dc.set_high().map_err(Error::Dc)?;

        let chunk = [color; protocol::PIXEL_CHUNK];
        let mut bytes = [0u8; protocol::PIXEL_CHUNK * 2];
        protocol::encode_pixels(&chunk, &mut bytes);

        let mut remaining = width as usize * height as usize;
        while remaining > 0 {
            let n = remaining.min(protocol::PIXEL_CHUNK);
            self.spi.write(&bytes[..n * 2]).map_err(Error::Spi)?;
            remaining -= n;
        }
        Ok(())
    }

    pub fn clear(&mut self, color: u16) -> DriverResult<SPI::Error, DC::Error, RST::Error> {
        self.fill_rect(0, 0, self.config.width, self.config.height, color)
    }

    fn command(&mut self, command: u8, params: &[u8]) -> DriverResult<SPI::Error, DC::Error, RST::Error> {
        self.dc.set_low().map_err(Error::Dc)?;
        self.spi.write(&[command]).map_err(Error::Spi)?;
        if !params.is_empty() {
            self.dc.set_high().map_err(Error::Dc)?;
            self.spi.write(params).map_err(Error::Spi)?;
        }
        Ok(())
    }
}
