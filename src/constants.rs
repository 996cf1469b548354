//! This module contains the built-in defaults used when neither the config file
//! nor the command line supplies a value.

use smart_leds::RGB8;

/// Number of pixels on the strip.
pub const STRIP_LENGTH: usize = 25;
/// BCM pin number of the DATA line (informational for SPI, MOSI is fixed).
pub const STRIP_DATA_LINE: u8 = 21;
/// Global brightness multiplier applied by the strip driver.
pub const STRIP_BRIGHTNESS: f32 = 1.0;
/// Default channel order of the physical strip.
pub const STRIP_COLOR_ORDER: &str = "RGB";
/// SPI device used by the hardware driver.
pub const STRIP_SPI_DEVICE: &str = "/dev/spidev0.0";

// Temperatures are Fahrenheit, it maps better to a human perceivable range.
/// Coldest temperature considered for lighting pixels.
pub const TEMP_MIN: i32 = -40;
/// Hottest temperature considered for lighting pixels.
pub const TEMP_MAX: i32 = 140;

// The hue scale is inverted compared to temperature: cold is blue, hot is red.
pub const HUE_MIN: f64 = 104.0;
pub const HUE_MAX: f64 = 0.0;

/// Temperatures at or below this stay blue-ish.
pub const DISPLAY_MIN: i32 = 20;
/// Temperatures at or above this stay red.
pub const DISPLAY_MAX: i32 = 95;

/// Threshold at or below which `LOWER_CORRECTION` is added to the pixel count.
pub const LOWER_BOUND: i32 = 0;
pub const LOWER_CORRECTION: i32 = 0;
/// Threshold at or above which `UPPER_CORRECTION` is added to the pixel count.
pub const UPPER_BOUND: i32 = 115;
pub const UPPER_CORRECTION: i32 = 0;

/// Green is wide on WS2812 parts, scale it down against red/blue (255).
pub const GREEN_SCALE: f64 = 64.0;

/// Seconds between weather polls. wttr.in does not like being hammered.
pub const POLL_INTERVAL_SECS: u64 = 1800;
/// Poll interval used when simulating temperatures.
pub const DEBUG_INTERVAL_SECS: u64 = 3;
/// Poll interval used in interactive mode.
pub const INTERACTIVE_INTERVAL_SECS: u64 = 0;
/// Per-pixel pause while sweeping.
pub const PIXEL_DELAY_MS: u64 = 10;

pub const WEATHER_SERVICE: &str = "http://wttr.in/";
pub const WEATHER_CITY: &str = "Oswego";
pub const WEATHER_REGION: &str = "USA";
/// Plain temperature, USCS units.
pub const WEATHER_OPTS: &str = "?format=%t&u";

pub const OVERRIDE_PATH: &str = "/var/lib/thermogauge/override.json";
pub const OVERRIDE_POLL_SECS: u64 = 1;

/// Pause after cancelling the render timer on shutdown, lets a pixel write land.
pub const SHUTDOWN_GRACE_MS: u64 = 1000;

// start-up chase timing
pub const CHASE_STEP_MS: u64 = 30;
pub const CHASE_PAUSE_MS: u64 = 500;

pub const BLACK: RGB8 = RGB8 { r: 0, g: 0, b: 0 };
pub const WHITE: RGB8 = RGB8 { r: 255, g: 255, b: 255 };
/// Comet trail of the start-up chase.
pub const DIM: RGB8 = RGB8 { r: 64, g: 64, b: 64 };
pub const DIMMEST: RGB8 = RGB8 { r: 17, g: 17, b: 17 };

/// Used for pixels that aren't lit given the current temperature.
pub const OFF_COLOR: RGB8 = BLACK;
/// Used for lit pixels when temperature color coding is disabled.
pub const ON_COLOR: RGB8 = WHITE;
