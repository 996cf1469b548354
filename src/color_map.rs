/*
 *  color_map.rs
 *
 *  ThermoGauge - outdoor temperature on a strip
 *	(c) 2020-26 Stuart Hunter
 *
 *	Temperature to pixel count and hue mapping
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */
//! Maps a temperature onto the gauge: how many pixels to light and in which color.
//! Everything here is pure, the same input always yields the same target.

use smart_leds::RGB8;

/// What the strip should show for one temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderTarget {
    /// Pixels lit, always in `0..=strip_length`.
    pub pixels: usize,
    pub color: RGB8,
}

/// Mapping constants, resolved from config at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct MapperSettings {
    pub strip_length: usize,
    pub reversed: bool,
    pub temp_min: i32,
    pub temp_max: i32,
    pub hue_min: f64,
    pub hue_max: f64,
    pub display_min: i32,
    pub display_max: i32,
    pub lower_bound: i32,
    pub lower_correction: i32,
    pub upper_bound: i32,
    pub upper_correction: i32,
    pub green_scale: f64,
}

#[derive(Debug, Clone)]
pub struct ColorMapper {
    settings: MapperSettings,
}

impl ColorMapper {
    pub fn new(settings: MapperSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MapperSettings {
        &self.settings
    }

    /// Maps a temperature with the configured corrections and orientation.
    pub fn map(&self, temp: i32) -> RenderTarget {
        let s = &self.settings;
        self.map_with(temp, s.lower_correction, s.upper_correction, s.reversed)
    }

    /// Maps a temperature with explicit bound corrections and orientation.
    pub fn map_with(&self, temp: i32, lower_correction: i32, upper_correction: i32, reversed: bool) -> RenderTarget {
        let hue = self.hue(temp);
        RenderTarget {
            pixels: self.pixel_count(temp, lower_correction, upper_correction, reversed),
            color: hue_to_rgb(hue, self.settings.green_scale),
        }
    }

    /// Number of pixels to light, clamped to the strip.
    pub fn pixel_count(&self, temp: i32, lower_correction: i32, upper_correction: i32, reversed: bool) -> usize {
        let s = &self.settings;
        let length = s.strip_length as f64;
        let span = f64::from(s.temp_max) - f64::from(s.temp_min);
        // ties go to even, a half pixel does not tip the gauge upwards;
        // the float to int cast saturates for far off-scale readings
        let raw = ((f64::from(temp) - f64::from(s.temp_min)) * length / span).round_ties_even() as i64;

        let mut count = raw;
        if temp <= s.lower_bound {
            count = count.saturating_add(i64::from(lower_correction));
        }
        if temp >= s.upper_bound {
            count = count.saturating_add(i64::from(upper_correction));
        }
        let count = count.clamp(0, s.strip_length as i64) as usize;

        if reversed { s.strip_length - count } else { count }
    }

    /// Hue on the 0..255 scale, inversely related to temperature.
    ///
    /// Clamped to `0..=display_max`; the upper bound is the display range
    /// constant, not 255.
    pub fn hue(&self, temp: i32) -> f64 {
        let s = &self.settings;
        let slope = (s.hue_max - s.hue_min) / (f64::from(s.display_max) - f64::from(s.display_min));
        let hue = s.hue_min + slope * (f64::from(temp) - f64::from(s.display_min));
        if hue < 0.0 {
            0.0
        } else if hue > f64::from(s.display_max) {
            f64::from(s.display_max)
        } else {
            hue
        }
    }
}

/// Converts a 0..255 hue at full saturation and half lightness into strip RGB,
/// with the green channel scaled to `green_scale` instead of 255.
pub fn hue_to_rgb(hue: f64, green_scale: f64) -> RGB8 {
    let (r, g, b) = hls_to_rgb(hue / 255.0, 0.5, 1.0);
    RGB8::new(
        (r * 255.0) as u8,
        (g * green_scale).clamp(0.0, 255.0) as u8,
        (b * 255.0) as u8,
    )
}

const ONE_THIRD: f64 = 1.0 / 3.0;
const ONE_SIXTH: f64 = 1.0 / 6.0;
const TWO_THIRD: f64 = 2.0 / 3.0;

/// Standard HLS to RGB, all components in 0.0..=1.0.
pub fn hls_to_rgb(h: f64, l: f64, s: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (l, l, l);
    }
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    (
        hls_channel(m1, m2, h + ONE_THIRD),
        hls_channel(m1, m2, h),
        hls_channel(m1, m2, h - ONE_THIRD),
    )
}

fn hls_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < ONE_SIXTH {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < TWO_THIRD {
        m1 + (m2 - m1) * (TWO_THIRD - hue) * 6.0
    } else {
        m1
    }
}

/// Parses "r,g,b" text, whitespace tolerated.
pub fn parse_rgb(text: &str) -> Option<RGB8> {
    let mut parts = text.split(',').map(|p| p.trim().parse::<u8>());
    let r = parts.next()?.ok()?;
    let g = parts.next()?.ok()?;
    let b = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(RGB8::new(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;

    fn settings() -> MapperSettings {
        MapperSettings {
            strip_length: STRIP_LENGTH,
            reversed: false,
            temp_min: TEMP_MIN,
            temp_max: TEMP_MAX,
            hue_min: HUE_MIN,
            hue_max: HUE_MAX,
            display_min: DISPLAY_MIN,
            display_max: DISPLAY_MAX,
            lower_bound: LOWER_BOUND,
            lower_correction: 0,
            upper_bound: UPPER_BOUND,
            upper_correction: 0,
            green_scale: GREEN_SCALE,
        }
    }

    #[test]
    fn test_pixel_count_stays_on_strip() {
        let mapper = ColorMapper::new(MapperSettings { lower_correction: -3, upper_correction: 3, ..settings() });
        for temp in TEMP_MIN - 20..=TEMP_MAX + 20 {
            let target = mapper.map(temp);
            assert!(target.pixels <= STRIP_LENGTH, "{temp} -> {}", target.pixels);
        }
        assert_eq!(mapper.map(TEMP_MIN).pixels, 0);
        assert_eq!(mapper.map(TEMP_MAX).pixels, STRIP_LENGTH);
    }

    #[test]
    fn test_extreme_readings_stay_on_strip() {
        let mapper = ColorMapper::new(MapperSettings { lower_correction: -3, upper_correction: 3, ..settings() });
        assert_eq!(mapper.map(i32::MAX).pixels, STRIP_LENGTH);
        assert_eq!(mapper.map(i32::MIN).pixels, 0);
        assert_eq!(mapper.pixel_count(i32::MAX, 0, 0, true), 0);
        assert_eq!(mapper.pixel_count(i32::MIN, 0, 0, true), STRIP_LENGTH);

        assert_eq!(mapper.hue(i32::MAX), 0.0);
        assert_eq!(mapper.hue(i32::MIN), f64::from(DISPLAY_MAX));
        assert_eq!(mapper.map(i32::MAX).color, RGB8::new(255, 0, 0));
    }

    #[test]
    fn test_full_sweep_returns_to_zero() {
        let mapper = ColorMapper::new(settings());
        let counts: Vec<usize> = [TEMP_MIN, TEMP_MAX, TEMP_MIN].iter().map(|t| mapper.map(*t).pixels).collect();
        assert_eq!(counts, vec![0, STRIP_LENGTH, 0]);
    }

    #[test]
    fn test_mapping_is_idempotent() {
        let mapper = ColorMapper::new(settings());
        for temp in [-40, 0, 32, 55, 72, 95, 140] {
            assert_eq!(mapper.map(temp), mapper.map(temp));
        }
    }

    #[test]
    fn test_banker_rounding() {
        // (50 + 40) * 25 / 180 = 12.5 -> 12
        let mapper = ColorMapper::new(settings());
        assert_eq!(mapper.pixel_count(50, 0, 0, false), 12);
        // (86 + 40) * 25 / 180 = 17.5 -> 18
        assert_eq!(mapper.pixel_count(86, 0, 0, false), 18);
    }

    #[test]
    fn test_upper_correction_applied_then_clamped() {
        let mapper = ColorMapper::new(MapperSettings {
            lower_bound: 90,
            lower_correction: -1,
            upper_bound: 92,
            upper_correction: 1,
            ..settings()
        });
        // raw (92 + 40) * 25 / 180 = 18.33 -> 18, upper bound reached -> 19
        assert_eq!(mapper.pixel_count(92, -1, 1, false), 19);
        // at the top the correction would overflow the strip
        assert_eq!(mapper.pixel_count(TEMP_MAX, -1, 1, false), STRIP_LENGTH);
        // lower bound: 90 -> 18.06 -> 18, minus one
        assert_eq!(mapper.pixel_count(90, -1, 1, false), 17);
        assert_eq!(mapper.pixel_count(TEMP_MIN, -1, 1, false), 0);
    }

    #[test]
    fn test_reversed_mirrors_count() {
        let mapper = ColorMapper::new(settings());
        for temp in [TEMP_MIN, 0, 50, 92, TEMP_MAX] {
            let normal = mapper.pixel_count(temp, 0, 0, false);
            let reversed = mapper.pixel_count(temp, 0, 0, true);
            assert_eq!(normal + reversed, STRIP_LENGTH);
        }
    }

    #[test]
    fn test_hue_non_increasing_and_flat_outside_range() {
        let mapper = ColorMapper::new(settings());
        let mut last = f64::MAX;
        for temp in TEMP_MIN..=TEMP_MAX {
            let hue = mapper.hue(temp);
            assert!(hue <= last, "hue rose at {temp}");
            last = hue;
        }
        assert!(mapper.hue(DISPLAY_MAX).abs() < 1e-9);
        assert_eq!(mapper.hue(TEMP_MAX), 0.0);
        assert_eq!(mapper.hue(DISPLAY_MIN - 30), mapper.hue(TEMP_MIN));
    }

    #[test]
    fn test_hue_upper_clamp_is_display_max() {
        // 104 at display_min exceeds display_max (95), the clamp caps it
        let mapper = ColorMapper::new(settings());
        assert_eq!(mapper.hue(DISPLAY_MIN), f64::from(DISPLAY_MAX));
    }

    #[test]
    fn test_display_range_end_colors() {
        // a display range wide enough that the clamp does not bite
        let mapper = ColorMapper::new(MapperSettings { display_max: 110, ..settings() });
        assert_eq!(mapper.hue(DISPLAY_MIN), HUE_MIN);
        let cold = mapper.map(DISPLAY_MIN).color;
        assert_eq!(cold.r, 0);
        assert!(cold.b > cold.g, "expected blue leaning, got {cold:?}");

        let mapper = ColorMapper::new(settings());
        assert!((mapper.hue(DISPLAY_MAX) - HUE_MAX).abs() < 1e-9);
        assert_eq!(mapper.map(DISPLAY_MAX).color, RGB8::new(255, 0, 0));
    }

    #[test]
    fn test_hls_primaries() {
        assert_eq!(hue_to_rgb(0.0, 255.0), RGB8::new(255, 0, 0));
        assert_eq!(hue_to_rgb(255.0 / 3.0, 255.0), RGB8::new(0, 255, 0));
        assert_eq!(hue_to_rgb(255.0 * 2.0 / 3.0, 255.0), RGB8::new(0, 0, 255));
        // green scaled down
        assert_eq!(hue_to_rgb(255.0 / 3.0, GREEN_SCALE), RGB8::new(0, 64, 0));
        assert_eq!(hls_to_rgb(0.3, 0.5, 0.0), (0.5, 0.5, 0.5));
    }

    #[test]
    fn test_hls_matches_reference_bit_for_bit() {
        // exact reference HLS values, float noise included
        assert_eq!(hls_to_rgb(0.1, 0.5, 1.0), (1.0, 0.6000000000000001, 0.0));
        assert_eq!(hls_to_rgb(0.75, 0.5, 1.0), (0.49999999999999956, 0.0, 1.0));
    }

    #[test]
    fn test_parse_rgb() {
        assert_eq!(parse_rgb("255, 0,16"), Some(RGB8::new(255, 0, 16)));
        assert_eq!(parse_rgb("255,0"), None);
        assert_eq!(parse_rgb("1,2,3,4"), None);
        assert_eq!(parse_rgb("256,0,0"), None);
        assert_eq!(parse_rgb("red"), None);
    }
}
