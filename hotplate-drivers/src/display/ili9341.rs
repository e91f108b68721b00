//! ILI9341 TFT controller
//!
//! Minimal blocking SPI driver: hardware reset, the power-on command
//! sequence, landscape orientation and 16-bit pixel writes. Exposes the
//! panel as an `embedded-graphics` [`DrawTarget`].

use display_interface::DisplayError;
use embedded_graphics::pixelcolor::raw::RawU16;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{ContainsPoint, Rectangle};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;

/// Panel width in landscape orientation
pub const WIDTH: u32 = 320;
/// Panel height in landscape orientation
pub const HEIGHT: u32 = 240;

mod cmd {
    pub const SOFTWARE_RESET: u8 = 0x01;
    pub const SLEEP_OUT: u8 = 0x11;
    pub const DISPLAY_ON: u8 = 0x29;
    pub const COLUMN_ADDRESS: u8 = 0x2A;
    pub const PAGE_ADDRESS: u8 = 0x2B;
    pub const MEMORY_WRITE: u8 = 0x2C;
    pub const MEMORY_ACCESS: u8 = 0x36;
    pub const PIXEL_FORMAT: u8 = 0x3A;
}

/// Row/column exchange with BGR order: landscape, connector on the left
const MADCTL_LANDSCAPE: u8 = 0x20 | 0x08;

/// 16 bits per pixel
const COLMOD_RGB565: u8 = 0x55;

/// Pixels per SPI write when filling
const FILL_CHUNK: usize = 32;

/// ILI9341 on an SPI bus with data/command and reset pins
pub struct Ili9341<SPI, DC, RST> {
    spi: SPI,
    dc: DC,
    rst: RST,
}

impl<SPI, DC, RST> Ili9341<SPI, DC, RST>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
{
    pub fn new(spi: SPI, dc: DC, rst: RST) -> Self {
        Self { spi, dc, rst }
    }

    /// Reset the controller and bring the panel up in landscape
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), DisplayError> {
        self.reset(delay)?;

        self.send_command(cmd::SOFTWARE_RESET, &[])?;
        delay.delay_ms(120);
        self.send_command(cmd::SLEEP_OUT, &[])?;
        delay.delay_ms(120);

        self.send_command(cmd::PIXEL_FORMAT, &[COLMOD_RGB565])?;
        self.send_command(cmd::MEMORY_ACCESS, &[MADCTL_LANDSCAPE])?;
        self.send_command(cmd::DISPLAY_ON, &[])?;
        delay.delay_ms(20);
        Ok(())
    }

    fn reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), DisplayError> {
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        delay.delay_ms(1);
        self.rst.set_low().map_err(|_| DisplayError::RSError)?;
        delay.delay_ms(10);
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        delay.delay_ms(120);
        Ok(())
    }

    fn send_command(&mut self, command: u8, params: &[u8]) -> Result<(), DisplayError> {
        self.dc.set_low().map_err(|_| DisplayError::DCError)?;
        self.spi
            .write(&[command])
            .map_err(|_| DisplayError::BusWriteError)?;
        if !params.is_empty() {
            self.send_data(params)?;
        }
        Ok(())
    }

    fn send_data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        self.dc.set_high().map_err(|_| DisplayError::DCError)?;
        self.spi
            .write(data)
            .map_err(|_| DisplayError::BusWriteError)
    }

    /// Select the inclusive rectangle the next memory write fills
    fn set_window(&mut self, start: Point, end: Point) -> Result<(), DisplayError> {
        let [x0h, x0l] = (start.x as u16).to_be_bytes();
        let [x1h, x1l] = (end.x as u16).to_be_bytes();
        let [y0h, y0l] = (start.y as u16).to_be_bytes();
        let [y1h, y1l] = (end.y as u16).to_be_bytes();

        self.send_command(cmd::COLUMN_ADDRESS, &[x0h, x0l, x1h, x1l])?;
        self.send_command(cmd::PAGE_ADDRESS, &[y0h, y0l, y1h, y1l])?;
        self.send_command(cmd::MEMORY_WRITE, &[])
    }
}

fn color_bytes(color: Rgb565) -> [u8; 2] {
    RawU16::from(color).into_inner().to_be_bytes()
}

impl<SPI, DC, RST> OriginDimensions for Ili9341<SPI, DC, RST> {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}

impl<SPI, DC, RST> DrawTarget for Ili9341<SPI, DC, RST>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
{
    type Color = Rgb565;
    type Error = DisplayError;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let bounds = self.bounding_box();
        for Pixel(point, color) in pixels {
            if bounds.contains(point) {
                self.set_window(point, point)?;
                self.send_data(&color_bytes(color))?;
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };

        self.set_window(area.top_left, bottom_right)?;

        let [hi, lo] = color_bytes(color);
        let mut chunk = [0u8; FILL_CHUNK * 2];
        for pair in chunk.chunks_exact_mut(2) {
            pair[0] = hi;
            pair[1] = lo;
        }

        let mut remaining = area.size.width as usize * area.size.height as usize;
        while remaining > 0 {
            let n = remaining.min(FILL_CHUNK);
            self.send_data(&chunk[..n * 2])?;
            remaining -= n;
        }
        Ok(())
    }
}
