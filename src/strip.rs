/*
 *  strip.rs
 *
 *  ThermoGauge - outdoor temperature on a strip
 *  (c) 2020-26 Stuart Hunter
 *
 *  Pixel buffer abstraction and the in-memory strip
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

use log::debug;
use smart_leds::{brightness, RGB8};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors raised by strip drivers.
#[derive(Debug, Error)]
pub enum StripError {
    /// A pixel outside the strip was addressed. The mapper clamps, so this
    /// never surfaces from a render.
    #[error("pixel index {index} outside strip of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// The device could not be opened at startup.
    #[error("strip device unavailable: {0}")]
    Unavailable(String),

    /// Writing to the device failed.
    #[error("strip write failed: {0}")]
    Write(String),
}

/// Channel order on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorOrder {
    #[default]
    Rgb,
    Rbg,
    Grb,
    Gbr,
    Brg,
    Bgr,
}

impl ColorOrder {
    /// Bytes in wire order.
    pub fn arrange(&self, c: RGB8) -> [u8; 3] {
        match self {
            ColorOrder::Rgb => [c.r, c.g, c.b],
            ColorOrder::Rbg => [c.r, c.b, c.g],
            ColorOrder::Grb => [c.g, c.r, c.b],
            ColorOrder::Gbr => [c.g, c.b, c.r],
            ColorOrder::Brg => [c.b, c.r, c.g],
            ColorOrder::Bgr => [c.b, c.g, c.r],
        }
    }

    /// Channel swap ahead of a WS2812 writer, which always clocks out
    /// green, red, blue. The result carries the wire bytes in that order.
    pub fn to_wire(&self, c: RGB8) -> RGB8 {
        let [first, second, third] = self.arrange(c);
        RGB8 { r: second, g: first, b: third }
    }
}

impl FromStr for ColorOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RGB" => Ok(ColorOrder::Rgb),
            "RBG" => Ok(ColorOrder::Rbg),
            "GRB" => Ok(ColorOrder::Grb),
            "GBR" => Ok(ColorOrder::Gbr),
            "BRG" => Ok(ColorOrder::Brg),
            "BGR" => Ok(ColorOrder::Bgr),
            other => Err(format!("unknown color order {other}")),
        }
    }
}

/// Multiplier as the 0..=255 level `smart_leds::brightness` takes,
/// `None` is full scale.
pub fn brightness_level(level: Option<f32>) -> u8 {
    match level {
        None => u8::MAX,
        Some(level) => (level.clamp(0.0, 1.0) * 255.0).round() as u8,
    }
}

/// Last committed visual state of the strip, one RGB triple per slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StripState {
    pub pixels: Vec<RGB8>,
    /// Global multiplier, `None` when scaling is disabled.
    pub brightness: Option<f32>,
}

impl StripState {
    pub fn new(len: usize, brightness: Option<f32>) -> Self {
        Self { pixels: vec![RGB8::default(); len], brightness }
    }

    pub fn set(&mut self, index: usize, color: RGB8) -> Result<(), StripError> {
        let len = self.pixels.len();
        let slot = self.pixels.get_mut(index).ok_or(StripError::IndexOutOfRange { index, len })?;
        *slot = color;
        Ok(())
    }

    pub fn fill(&mut self, color: RGB8) {
        self.pixels.iter_mut().for_each(|p| *p = color);
    }

    /// Pixel values as they leave the driver, brightness applied.
    pub fn output(&self) -> impl Iterator<Item = RGB8> + '_ {
        brightness(self.pixels.iter().copied(), brightness_level(self.brightness))
    }

    /// Number of slots holding exactly `color`.
    pub fn count(&self, color: RGB8) -> usize {
        self.pixels.iter().filter(|p| **p == color).count()
    }
}

/// The pixel buffer every driver exposes. Writes are shown immediately.
pub trait PixelStrip: Send {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current (unscaled) color of a slot.
    fn get(&self, index: usize) -> Option<RGB8>;

    fn set(&mut self, index: usize, color: RGB8) -> Result<(), StripError>;

    fn fill(&mut self, color: RGB8) -> Result<(), StripError>;

    fn brightness(&self) -> Option<f32>;

    /// Sets the global multiplier, `None` disables scaling.
    fn set_brightness(&mut self, level: Option<f32>) -> Result<(), StripError>;
}

impl<S: PixelStrip + ?Sized> PixelStrip for Box<S> {
    fn len(&self) -> usize { (**self).len() }
    fn get(&self, index: usize) -> Option<RGB8> { (**self).get(index) }
    fn set(&mut self, index: usize, color: RGB8) -> Result<(), StripError> { (**self).set(index, color) }
    fn fill(&mut self, color: RGB8) -> Result<(), StripError> { (**self).fill(color) }
    fn brightness(&self) -> Option<f32> { (**self).brightness() }
    fn set_brightness(&mut self, level: Option<f32>) -> Result<(), StripError> { (**self).set_brightness(level) }
}

pub type BoxedStrip = Box<dyn PixelStrip>;

/// Shared state of a [`VirtualStrip`], inspectable from tests and logs.
#[derive(Debug, Default)]
pub struct VirtualStripState {
    pub strip: StripState,
    /// Number of single-pixel writes
    pub set_count: usize,
    /// Number of fill() calls
    pub fill_count: usize,
    /// Every brightness value set, in order
    pub brightness_history: Vec<Option<f32>>,
    /// Single-pixel writes in order, kept only when recording
    pub writes: Vec<(usize, RGB8)>,
    pub recording: bool,
}

/// In-memory strip for running without hardware and for tests.
///
/// Clones share the same state, so a test can keep one handle while the
/// gauge owns the other.
#[derive(Debug, Clone)]
pub struct VirtualStrip {
    len: usize,
    state: Arc<Mutex<VirtualStripState>>,
}

impl VirtualStrip {
    pub fn new(len: usize, brightness: Option<f32>) -> Self {
        let state = VirtualStripState {
            strip: StripState::new(len, brightness),
            ..Default::default()
        };
        Self { len, state: Arc::new(Mutex::new(state)) }
    }

    /// Same as `new`, additionally logging every pixel write in order.
    pub fn recording(len: usize, brightness: Option<f32>) -> Self {
        let strip = Self::new(len, brightness);
        if let Ok(mut s) = strip.state.lock() {
            s.recording = true;
        }
        strip
    }

    /// Ordered pixel writes since the last call.
    pub fn take_writes(&self) -> Vec<(usize, RGB8)> {
        self.state.lock().map(|mut s| std::mem::take(&mut s.writes)).unwrap_or_default()
    }

    /// Shared state for inspection
    pub fn state(&self) -> Arc<Mutex<VirtualStripState>> {
        Arc::clone(&self.state)
    }

    /// Copy of the committed pixels.
    pub fn snapshot(&self) -> StripState {
        self.state.lock().map(|s| s.strip.clone()).unwrap_or_default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut VirtualStripState) -> T) -> Result<T, StripError> {
        let mut guard = self.state.lock().map_err(|e| StripError::Write(e.to_string()))?;
        Ok(f(&mut guard))
    }
}

impl PixelStrip for VirtualStrip {
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize) -> Option<RGB8> {
        self.state.lock().ok()?.strip.pixels.get(index).copied()
    }

    fn set(&mut self, index: usize, color: RGB8) -> Result<(), StripError> {
        self.with_state(|s| {
            s.set_count += 1;
            s.strip.set(index, color)?;
            if s.recording {
                s.writes.push((index, color));
            }
            Ok(())
        })?
    }

    fn fill(&mut self, color: RGB8) -> Result<(), StripError> {
        self.with_state(|s| {
            s.fill_count += 1;
            s.strip.fill(color);
        })?;
        debug!("virtual strip filled with ({},{},{})", color.r, color.g, color.b);
        Ok(())
    }

    fn brightness(&self) -> Option<f32> {
        self.state.lock().ok()?.strip.brightness
    }

    fn set_brightness(&mut self, level: Option<f32>) -> Result<(), StripError> {
        self.with_state(|s| {
            s.strip.brightness = level;
            s.brightness_history.push(level);
        })
    }
}
