/*
 *  drivers/mod.rs
 *
 *  ThermoGauge - outdoor temperature on a strip
 *  (c) 2020-26 Stuart Hunter
 *
 *  Strip driver implementations
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

// The wire encoder is always built so it can be tested off-target,
// the SPI device itself only with the `hardware` feature.
pub mod ws2812_spi;
