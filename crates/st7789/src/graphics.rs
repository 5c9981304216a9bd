use embedded_graphics_core::{
    Pixel,
    draw_target::DrawTarget,
    geometry::{Dimensions, OriginDimensions, Size},
    pixelcolor::{IntoStorage, Rgb565},
    primitives::Rectangle,
};
use embedded_hal::{digital::OutputPin, spi::SpiDevice};

use crate::{Error, St7789};

impl<SPI, DC, RST> DrawTarget for St7789<SPI, DC, RST>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin,
{
    type Color = Rgb565;
    type Error = Error<SPI::Error, DC::Error, RST::Error>;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = self.size();
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 || point.x >= width as i32 || point.y >= height as i32 {
                continue;
            }
            self.blit(point.x as u16, point.y as u16, 1, 1, &[color.into_storage()])?;
        }

        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        if area.size.width == 0 || area.size.height == 0 {
            return Ok(());
        }

        self.fill_rect(
            area.top_left.x as u16,
            area.top_left.y as u16,
            area.size.width as u16,
            area.size.height as u16,
            color.into_storage(),
        )
    }
}

impl<SPI, DC, RST> OriginDimensions for St7789<SPI, DC, RST> {
    fn size(&self) -> Size {
        Size::new(self.config.width as u32, self.config.height as u32)
    }
}
