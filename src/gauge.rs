/*
 *  gauge.rs
 *
 *  ThermoGauge - outdoor temperature on a strip
 *  (c) 2020-26 Stuart Hunter
 *
 *  Render cycle context: what is shown, what comes next
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
use log::{debug, info, warn};
use smart_leds::RGB8;
use std::time::Duration;

use crate::color_map::{ColorMapper, RenderTarget};
use crate::config::Settings;
use crate::constants::{BLACK, CHASE_PAUSE_MS, CHASE_STEP_MS};
use crate::override_file::OverrideRecord;
use crate::strip::{PixelStrip, StripError};
use crate::transition::{chase, Animator};
use crate::weather::{retry_backoff, TemperatureReading, TemperatureSource};

/// Whether the next cycle may use the temperature hue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Normal,
    /// Next cycle paints in the on color, then falls back to `Normal`.
    SuppressNextColor,
}

/// Outcome of one render cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cycle {
    pub temperature: TemperatureReading,
    pub target: RenderTarget,
    /// False when the source failed and the previous temperature was reused.
    pub fetched: bool,
    /// When the next cycle is due.
    pub next_delay: Duration,
}

/// Everything the render cycle reads and writes, owned by one event loop.
pub struct Gauge<S: PixelStrip> {
    strip: S,
    source: TemperatureSource,
    mapper: ColorMapper,
    animator: Animator,
    interval: Duration,
    disable_proportional_lighting: bool,
    disable_proportional_color: bool,
    on_color: RGB8,
    off_color: RGB8,
    color_mode: ColorMode,
    previous_temp: TemperatureReading,
    previous_target: RenderTarget,
    cycles: u64,
}

impl<S: PixelStrip> Gauge<S> {
    pub fn new(settings: &Settings, strip: S, source: TemperatureSource) -> Self {
        let mapper = ColorMapper::new(settings.mapper.clone());
        let previous_temp = settings.mapper.temp_min;
        let previous_target = RenderTarget { color: settings.off_color, ..mapper.map(previous_temp) };
        Self {
            strip,
            source,
            animator: Animator::new(settings.pixel_delay, settings.mapper.reversed),
            mapper,
            interval: settings.interval,
            disable_proportional_lighting: settings.disable_proportional_lighting,
            disable_proportional_color: settings.disable_proportional_color,
            on_color: settings.on_color,
            off_color: settings.off_color,
            color_mode: ColorMode::Normal,
            previous_temp,
            previous_target,
            cycles: 0,
        }
    }

    pub fn strip(&self) -> &S {
        &self.strip
    }

    pub fn strip_mut(&mut self) -> &mut S {
        &mut self.strip
    }

    pub fn source_mut(&mut self) -> &mut TemperatureSource {
        &mut self.source
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn on_color(&self) -> RGB8 {
        self.on_color
    }

    pub fn off_color(&self) -> RGB8 {
        self.off_color
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn previous_temperature(&self) -> TemperatureReading {
        self.previous_temp
    }

    pub fn previous_target(&self) -> RenderTarget {
        self.previous_target
    }

    /// Number of completed render cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Start-up self test, leaves the strip in the off color.
    pub async fn splash(&mut self) -> Result<(), StripError> {
        info!("Pixel check on {} pixels", self.strip.len());
        chase(
            &mut self.strip,
            self.on_color,
            self.off_color,
            Duration::from_millis(CHASE_STEP_MS),
            Duration::from_millis(CHASE_PAUSE_MS),
        )
        .await
    }

    /// What to show for `temp` given the current modes. Consumes a pending
    /// `SuppressNextColor`.
    fn target_for(&mut self, temp: TemperatureReading) -> RenderTarget {
        let mut target = self.mapper.map(temp);
        if self.disable_proportional_lighting {
            // whole strip lit, the lit run starts at the top when mounted reversed
            target.pixels = if self.animator.reversed() { 0 } else { self.mapper.settings().strip_length };
        }
        let suppressed = std::mem::take(&mut self.color_mode) == ColorMode::SuppressNextColor;
        if self.disable_proportional_color || suppressed {
            target.color = self.on_color;
        }
        target
    }

    /// One pass: read, map, animate. Source failures are absorbed here.
    pub async fn render_cycle(&mut self) -> Result<Cycle, StripError> {
        let (temperature, fetched, next_delay) = match self.source.read().await {
            Ok(t) => (t, true, self.interval),
            Err(e) => {
                let backoff = retry_backoff(self.mapper.settings().temp_max);
                warn!("Temperature unavailable ({}), showing {} again, retry in {}s",
                    e, self.previous_temp, backoff.as_secs());
                (self.previous_temp, false, backoff)
            }
        };

        let target = self.target_for(temperature);
        debug!(
            "{}: hue {:.0}, ({},{},{}) for pixel {}",
            temperature,
            self.mapper.hue(temperature),
            target.color.r, target.color.g, target.color.b,
            target.pixels
        );

        self.animator.render(&mut self.strip, self.previous_target, target, self.off_color).await?;

        self.previous_temp = temperature;
        self.previous_target = target;
        self.cycles += 1;
        Ok(Cycle { temperature, target, fetched, next_delay })
    }

    /// Takes an accepted override into the color state and the strip brightness.
    pub fn apply_override(&mut self, record: &OverrideRecord) -> Result<(), StripError> {
        if self.disable_proportional_lighting {
            self.on_color = record.color;
            self.color_mode = ColorMode::SuppressNextColor;
        } else {
            self.off_color = record.color;
        }
        if record.brightness <= 0.0 {
            self.off_color = BLACK;
            self.strip.set_brightness(None)
        } else {
            self.strip.set_brightness(Some(record.brightness))
        }
    }

    /// Turns every pixel off. The next cycle sweeps up from an empty gauge.
    pub fn blank(&mut self) -> Result<(), StripError> {
        self.strip.fill(BLACK)?;
        let n = self.mapper.settings().strip_length;
        let empty = if self.animator.reversed() { n } else { 0 };
        self.previous_target = RenderTarget { pixels: empty, color: BLACK };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Settings};
    use crate::constants::{ON_COLOR, WHITE};
    use crate::strip::VirtualStrip;
    use std::time::SystemTime;

    const GREEN: RGB8 = RGB8 { r: 0, g: 200, b: 0 };

    fn settings(length: usize) -> Settings {
        let mut s = Settings::resolve(&Config::default()).unwrap();
        s.strip.length = length;
        s.mapper.strip_length = length;
        s.pixel_delay = Duration::ZERO;
        s
    }

    fn record(color: RGB8, brightness: f32) -> OverrideRecord {
        OverrideRecord { color, brightness, timestamp: SystemTime::UNIX_EPOCH }
    }

    #[tokio::test]
    async fn test_cycle_lights_mapped_pixels() {
        let s = settings(18);
        let strip = VirtualStrip::new(18, None);
        let mut gauge = Gauge::new(&s, strip.clone(), TemperatureSource::supplied([140, -40]));

        let hot = gauge.render_cycle().await.unwrap();
        assert!(hot.fetched);
        assert_eq!(hot.target.pixels, 18);
        assert_eq!(hot.next_delay, s.interval);
        assert_eq!(strip.snapshot().count(hot.target.color), 18);

        let cold = gauge.render_cycle().await.unwrap();
        assert_eq!(cold.target.pixels, 0);
        assert_eq!(strip.snapshot().count(s.off_color), 18);
        assert_eq!(gauge.cycles(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_temperature() {
        let s = settings(10);
        let mut gauge = Gauge::new(&s, VirtualStrip::new(10, None), TemperatureSource::supplied([50]));
        let first = gauge.render_cycle().await.unwrap();

        // source exhausted, same temperature again with a randomized retry
        let second = gauge.render_cycle().await.unwrap();
        assert!(!second.fetched);
        assert_eq!(second.temperature, 50);
        assert_eq!(second.target, first.target);
        assert!(second.next_delay < Duration::from_secs(s.mapper.temp_max as u64));

        // the backoff is a one-off, a good reading goes back to the interval
        gauge.source_mut().push(72);
        let third = gauge.render_cycle().await.unwrap();
        assert!(third.fetched);
        assert_eq!(third.temperature, 72);
        assert_eq!(third.next_delay, s.interval);
    }

    #[tokio::test]
    async fn test_override_becomes_background() {
        let s = settings(10);
        let strip = VirtualStrip::new(10, None);
        let mut gauge = Gauge::new(&s, strip.clone(), TemperatureSource::supplied([50]));
        gauge.apply_override(&record(GREEN, 0.5)).unwrap();
        assert_eq!(gauge.off_color(), GREEN);
        assert_eq!(gauge.color_mode(), ColorMode::Normal);
        assert_eq!(strip.brightness(), Some(0.5));

        let cycle = gauge.render_cycle().await.unwrap();
        assert_eq!(strip.snapshot().count(GREEN), 10 - cycle.target.pixels);
    }

    #[tokio::test]
    async fn test_zero_brightness_forces_black_background() {
        let s = settings(10);
        let strip = VirtualStrip::new(10, Some(0.8));
        let mut gauge = Gauge::new(&s, strip.clone(), TemperatureSource::supplied([]));
        gauge.apply_override(&record(GREEN, 0.0)).unwrap();
        assert_eq!(gauge.off_color(), BLACK);
        assert_eq!(strip.brightness(), None);
        assert_eq!(strip.state().lock().unwrap().brightness_history, vec![None]);
    }

    #[tokio::test]
    async fn test_suppressed_color_lasts_one_cycle() {
        let mut s = settings(8);
        s.disable_proportional_lighting = true;
        let strip = VirtualStrip::new(8, None);
        let mut gauge = Gauge::new(&s, strip.clone(), TemperatureSource::supplied([60, 60]));

        gauge.apply_override(&record(GREEN, 1.0)).unwrap();
        assert_eq!(gauge.on_color(), GREEN);
        assert_eq!(gauge.color_mode(), ColorMode::SuppressNextColor);

        let first = gauge.render_cycle().await.unwrap();
        assert_eq!(first.target.pixels, 8);
        assert_eq!(first.target.color, GREEN);
        assert_eq!(strip.snapshot().count(GREEN), 8);
        assert_eq!(gauge.color_mode(), ColorMode::Normal);

        // back to the temperature hue, still all lit
        let second = gauge.render_cycle().await.unwrap();
        assert_eq!(second.target.pixels, 8);
        assert_ne!(second.target.color, GREEN);
    }

    #[tokio::test]
    async fn test_disabled_color_uses_on_color() {
        let mut s = settings(8);
        s.disable_proportional_color = true;
        let mut gauge = Gauge::new(&s, VirtualStrip::new(8, None), TemperatureSource::supplied([70]));
        let cycle = gauge.render_cycle().await.unwrap();
        assert_eq!(cycle.target.color, ON_COLOR);
        assert_eq!(ON_COLOR, WHITE);
    }

    #[tokio::test]
    async fn test_reversed_full_lighting_lights_whole_strip() {
        let mut s = settings(6);
        s.mapper.reversed = true;
        s.disable_proportional_lighting = true;
        let strip = VirtualStrip::new(6, None);
        let mut gauge = Gauge::new(&s, strip.clone(), TemperatureSource::supplied([0]));
        let cycle = gauge.render_cycle().await.unwrap();
        assert_eq!(cycle.target.pixels, 0);
        assert_eq!(strip.snapshot().count(cycle.target.color), 6);
    }

    #[tokio::test]
    async fn test_blank_then_render_sweeps_up() {
        let s = settings(10);
        let strip = VirtualStrip::recording(10, None);
        let mut gauge = Gauge::new(&s, strip.clone(), TemperatureSource::supplied([140, 140]));
        gauge.render_cycle().await.unwrap();
        gauge.blank().unwrap();
        assert_eq!(strip.snapshot().count(BLACK), 10);
        assert_eq!(gauge.previous_target().pixels, 0);

        strip.take_writes();
        gauge.render_cycle().await.unwrap();
        let order: Vec<usize> = strip.take_writes().iter().map(|(i, _)| *i).collect();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }
}
