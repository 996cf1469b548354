/*
 *  drivers/ws2812_spi.rs
 *
 *  ThermoGauge - outdoor temperature on a strip
 *  (c) 2020-26 Stuart Hunter
 *
 *  WS2812 (NeoPixel) strip clocked out of the Raspberry Pi SPI bus
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

/// ws2812-spi wants the bus between 2 and 3.8 MHz.
pub const SPI_CLOCK_HZ: u32 = 3_000_000;
/// Prerendered bytes per pixel, four SPI bytes per color byte.
pub const BUFFER_BYTES_PER_PIXEL: usize = 12;
/// Room for the latch tail after the pixel data.
pub const RESET_HEADROOM: usize = 140;

/// Size of the prerender buffer for a strip of `len` pixels.
pub fn buffer_len(len: usize) -> usize {
    len * BUFFER_BYTES_PER_PIXEL + RESET_HEADROOM
}

/// Splits "/dev/spidevB.S" into bus and slave select numbers.
pub fn parse_spi_device(path: &str) -> Option<(u8, u8)> {
    let tail = path.rsplit('/').next()?.strip_prefix("spidev")?;
    let (bus, ss) = tail.split_once('.')?;
    Some((bus.parse().ok()?, ss.parse().ok()?))
}

#[cfg(feature = "hardware")]
pub use device::Ws2812Spi;

#[cfg(feature = "hardware")]
mod device {
    use super::*;
    use crate::strip::{ColorOrder, PixelStrip, StripError, StripState};
    use log::info;
    use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
    use smart_leds::{SmartLedsWrite, RGB8};
    use ws2812_spi::prerendered::Ws2812;

    /// WS2812 strip on the SPI MOSI line, every write is shown immediately.
    pub struct Ws2812Spi {
        spi: Spi,
        buffer: Vec<u8>,
        order: ColorOrder,
        state: StripState,
    }

    impl Ws2812Spi {
        /// Opens the SPI device; failure here aborts startup.
        pub fn open(device: &str, len: usize, order: ColorOrder, brightness: Option<f32>) -> Result<Self, StripError> {
            let (bus, ss) = parse_spi_device(device)
                .ok_or_else(|| StripError::Unavailable(format!("bad spi device path {device}")))?;
            let bus = match bus {
                0 => Bus::Spi0,
                1 => Bus::Spi1,
                2 => Bus::Spi2,
                other => return Err(StripError::Unavailable(format!("unsupported spi bus {other}"))),
            };
            let ss = match ss {
                0 => SlaveSelect::Ss0,
                1 => SlaveSelect::Ss1,
                2 => SlaveSelect::Ss2,
                other => return Err(StripError::Unavailable(format!("unsupported slave select {other}"))),
            };
            let spi = Spi::new(bus, ss, SPI_CLOCK_HZ, Mode::Mode0)
                .map_err(|e| StripError::Unavailable(e.to_string()))?;
            info!("WS2812 strip of {} pixels on {}", len, device);
            let mut strip = Self {
                spi,
                buffer: vec![0; buffer_len(len)],
                order,
                state: StripState::new(len, brightness),
            };
            strip.show()?;
            Ok(strip)
        }

        fn show(&mut self) -> Result<(), StripError> {
            let order = self.order;
            let pixels: Vec<RGB8> = self.state.output().map(|c| order.to_wire(c)).collect();
            let mut ws = Ws2812::new(&mut self.spi, &mut self.buffer);
            ws.write(pixels.into_iter())
                .map_err(|e| StripError::Write(format!("{e:?}")))
        }
    }

    impl PixelStrip for Ws2812Spi {
        fn len(&self) -> usize {
            self.state.pixels.len()
        }

        fn get(&self, index: usize) -> Option<RGB8> {
            self.state.pixels.get(index).copied()
        }

        fn set(&mut self, index: usize, color: RGB8) -> Result<(), StripError> {
            self.state.set(index, color)?;
            self.show()
        }

        fn fill(&mut self, color: RGB8) -> Result<(), StripError> {
            self.state.fill(color);
            self.show()
        }

        fn brightness(&self) -> Option<f32> {
            self.state.brightness
        }

        fn set_brightness(&mut self, level: Option<f32>) -> Result<(), StripError> {
            self.state.brightness = level;
            self.show()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_len() {
        assert_eq!(buffer_len(25), 25 * 12 + RESET_HEADROOM);
        assert_eq!(buffer_len(0), RESET_HEADROOM);
    }

    #[test]
    fn test_parse_spi_device() {
        assert_eq!(parse_spi_device("/dev/spidev0.0"), Some((0, 0)));
        assert_eq!(parse_spi_device("/dev/spidev1.2"), Some((1, 2)));
        assert_eq!(parse_spi_device("/dev/i2c-1"), None);
    }
}
