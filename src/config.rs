use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use smart_leds::RGB8;
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::color_map::{parse_rgb, MapperSettings};
use crate::constants::*;
use crate::strip::ColorOrder;
use crate::window::ActivityWindow;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration, every field optional so layers can be merged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub strip: Option<StripConfig>,
    pub temperature: Option<TemperatureConfig>,
    pub poll: Option<PollConfig>,
    pub modes: Option<ModeConfig>,
    pub colors: Option<ColorConfig>,
    pub window: Option<WindowConfig>,
    #[serde(rename = "override")]
    pub override_file: Option<OverrideConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StripConfig {
    pub length: Option<usize>,
    pub data_line: Option<u8>,
    pub color_order: Option<String>, // "RGB" | "GRB" | ...
    pub brightness: Option<f32>,     // 0.0-1.0
    pub reversed: Option<bool>,      // mounted upside down
    pub spi_device: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TemperatureConfig {
    pub min: Option<i32>,
    pub max: Option<i32>,
    pub hue_min: Option<f64>,
    pub hue_max: Option<f64>,
    pub display_min: Option<i32>,
    pub display_max: Option<i32>,
    pub lower_bound: Option<i32>,
    pub lower_correction: Option<i32>,
    pub upper_bound: Option<i32>,
    pub upper_correction: Option<i32>,
    pub green_scale: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PollConfig {
    pub interval_secs: Option<u64>,
    pub pixel_delay_ms: Option<u64>,
    pub service: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub options: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModeConfig {
    pub disable_proportional_lighting: Option<bool>,
    pub disable_proportional_color: Option<bool>,
    pub debug: Option<bool>,
    pub interactive: Option<bool>,
    pub simulate: Option<bool>,
    pub splash: Option<bool>,
    pub emulated: Option<bool>,
}

/// Colors as "r,g,b" text.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ColorConfig {
    pub on: Option<String>,
    pub off: Option<String>,
}

/// Daily activity window, 24h "HH:MM" clock times.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WindowConfig {
    pub active_at: Option<String>,
    pub inactive_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OverrideConfig {
    pub enabled: Option<bool>,
    pub path: Option<PathBuf>,
    pub poll_secs: Option<u64>,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "thermogauge", version, about = "Outdoor temperature on an LED strip")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, short = 'c', value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Enable debug log level and per-cycle state logging
    #[arg(long, short = 'v', alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Number of pixels on the strip
    #[arg(long)]
    pub length: Option<usize>,
    /// Strip is mounted upside down
    #[arg(long, action = ArgAction::Set)]
    pub reversed: Option<bool>,
    #[arg(long)]
    pub brightness: Option<f32>,
    #[arg(long)]
    pub color_order: Option<String>,
    /// Seconds between renders
    #[arg(long)]
    pub interval: Option<u64>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub region: Option<String>,
    /// Random temperatures instead of the weather service
    #[arg(long, action = ArgAction::SetTrue)]
    pub simulate: bool,
    /// Read temperatures from stdin
    #[arg(long, action = ArgAction::SetTrue)]
    pub interactive: bool,
    /// Skip the start-up chase (shown by default)
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_splash: bool,
    /// Drive an in-memory strip instead of the hardware
    #[arg(long, action = ArgAction::SetTrue)]
    pub emulated: bool,
    /// Clock time rendering resumes, e.g. 07:00
    #[arg(long)]
    pub active_at: Option<String>,
    /// Clock time the strip is blanked, e.g. 23:30
    #[arg(long)]
    pub inactive_at: Option<String>,
    /// External color override record
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub override_path: Option<PathBuf>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Settings, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_from(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Settings::resolve(&cfg)
}

/// Layers defaults, the YAML file and the CLI flags.
pub fn load_from(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/thermogauge/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/thermogauge/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/thermogauge.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["thermogauge.yaml", "config/thermogauge.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Copies every `Some` field of `src` over `dst`.
macro_rules! overlay {
    ($dst:expr, $src:expr, $($field:ident),+ $(,)?) => {
        $( if $src.$field.is_some() { $dst.$field = $src.$field; } )+
    };
}

/// Merges an optional group, taking the source group wholesale if the destination has none.
macro_rules! merge_group {
    ($dst:expr, $src:expr, $($field:ident),+ $(,)?) => {
        match (&mut $dst, $src) {
            (None, Some(s)) => $dst = Some(s),
            (Some(d), Some(s)) => { overlay!(d, s, $($field),+); }
            _ => {}
        }
    };
}

/// Shallow merge `src` into `dst`, Option-by-Option.
pub fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    merge_group!(dst.strip, src.strip,
        length, data_line, color_order, brightness, reversed, spi_device);
    merge_group!(dst.temperature, src.temperature,
        min, max, hue_min, hue_max, display_min, display_max,
        lower_bound, lower_correction, upper_bound, upper_correction, green_scale);
    merge_group!(dst.poll, src.poll,
        interval_secs, pixel_delay_ms, service, city, region, options);
    merge_group!(dst.modes, src.modes,
        disable_proportional_lighting, disable_proportional_color,
        debug, interactive, simulate, splash, emulated);
    merge_group!(dst.colors, src.colors, on, off);
    merge_group!(dst.window, src.window, active_at, inactive_at);
    merge_group!(dst.override_file, src.override_file, enabled, path, poll_secs);
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }

    let strip = cfg.strip.get_or_insert_with(StripConfig::default);
    if cli.length.is_some()      { strip.length = cli.length; }
    if cli.reversed.is_some()    { strip.reversed = cli.reversed; }
    if cli.brightness.is_some()  { strip.brightness = cli.brightness; }
    if cli.color_order.is_some() { strip.color_order = cli.color_order.clone(); }

    let poll = cfg.poll.get_or_insert_with(PollConfig::default);
    if cli.interval.is_some() { poll.interval_secs = cli.interval; }
    if cli.city.is_some()     { poll.city = cli.city.clone(); }
    if cli.region.is_some()   { poll.region = cli.region.clone(); }

    // flags only ever switch things on
    let modes = cfg.modes.get_or_insert_with(ModeConfig::default);
    if cli.debug       { modes.debug = Some(true); }
    if cli.simulate    { modes.simulate = Some(true); }
    if cli.interactive { modes.interactive = Some(true); }
    if cli.no_splash   { modes.splash = Some(false); }
    if cli.emulated    { modes.emulated = Some(true); }

    if cli.active_at.is_some() || cli.inactive_at.is_some() {
        let window = cfg.window.get_or_insert_with(WindowConfig::default);
        if cli.active_at.is_some()   { window.active_at = cli.active_at.clone(); }
        if cli.inactive_at.is_some() { window.inactive_at = cli.inactive_at.clone(); }
    }

    if let Some(path) = cli.override_path.as_ref() {
        let ov = cfg.override_file.get_or_insert_with(OverrideConfig::default);
        ov.path = Some(path.clone());
        ov.enabled = Some(true);
    }
}

/// Resolved strip wiring.
#[derive(Debug, Clone)]
pub struct StripSettings {
    pub length: usize,
    pub data_line: u8,
    pub color_order: ColorOrder,
    pub brightness: f32,
    pub reversed: bool,
    pub spi_device: String,
}

/// Where temperatures come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    Remote { url: String },
    Simulated,
    Interactive,
}

#[derive(Debug, Clone)]
pub struct OverrideSettings {
    pub path: PathBuf,
    pub poll_interval: Duration,
}

/// Fully resolved startup constants, every default filled in.
#[derive(Debug, Clone)]
pub struct Settings {
    pub log_level: String,
    pub strip: StripSettings,
    pub mapper: MapperSettings,
    pub source: SourceKind,
    pub interval: Duration,
    pub pixel_delay: Duration,
    pub disable_proportional_lighting: bool,
    pub disable_proportional_color: bool,
    pub on_color: RGB8,
    pub off_color: RGB8,
    pub splash: bool,
    pub emulated: bool,
    pub window: Option<ActivityWindow>,
    pub override_file: Option<OverrideSettings>,
}

impl Settings {
    /// Fills defaults and validates the merged configuration.
    pub fn resolve(cfg: &Config) -> Result<Self, ConfigError> {
        let strip = cfg.strip.clone().unwrap_or_default();
        let temp = cfg.temperature.clone().unwrap_or_default();
        let poll = cfg.poll.clone().unwrap_or_default();
        let modes = cfg.modes.clone().unwrap_or_default();
        let colors = cfg.colors.clone().unwrap_or_default();

        let length = strip.length.unwrap_or(STRIP_LENGTH);
        if length == 0 {
            return Err(ConfigError::Validation("strip length must be > 0".into()));
        }
        let brightness = strip.brightness.unwrap_or(STRIP_BRIGHTNESS);
        if !(0.0..=1.0).contains(&brightness) {
            return Err(ConfigError::Validation("strip brightness must be 0.0..=1.0".into()));
        }
        let order_text = strip.color_order.unwrap_or_else(|| STRIP_COLOR_ORDER.to_string());
        let color_order: ColorOrder = order_text
            .parse()
            .map_err(|_| ConfigError::Validation(format!("unknown color order: {order_text}")))?;
        let reversed = strip.reversed.unwrap_or(false);

        let mapper = MapperSettings {
            strip_length: length,
            reversed,
            temp_min: temp.min.unwrap_or(TEMP_MIN),
            temp_max: temp.max.unwrap_or(TEMP_MAX),
            hue_min: temp.hue_min.unwrap_or(HUE_MIN),
            hue_max: temp.hue_max.unwrap_or(HUE_MAX),
            display_min: temp.display_min.unwrap_or(DISPLAY_MIN),
            display_max: temp.display_max.unwrap_or(DISPLAY_MAX),
            lower_bound: temp.lower_bound.unwrap_or(LOWER_BOUND),
            lower_correction: temp.lower_correction.unwrap_or(LOWER_CORRECTION),
            upper_bound: temp.upper_bound.unwrap_or(UPPER_BOUND),
            upper_correction: temp.upper_correction.unwrap_or(UPPER_CORRECTION),
            green_scale: temp.green_scale.unwrap_or(GREEN_SCALE),
        };
        if mapper.temp_max <= mapper.temp_min {
            return Err(ConfigError::Validation("temperature max must be > min".into()));
        }
        if mapper.display_max <= mapper.display_min {
            return Err(ConfigError::Validation("display max must be > display min".into()));
        }

        let debug = modes.debug.unwrap_or(false);
        let simulate = modes.simulate.unwrap_or(false);
        let interactive = modes.interactive.unwrap_or(false);

        let source = if interactive {
            SourceKind::Interactive
        } else if simulate {
            SourceKind::Simulated
        } else {
            let service = poll.service.unwrap_or_else(|| WEATHER_SERVICE.to_string());
            let city = poll.city.unwrap_or_else(|| WEATHER_CITY.to_string());
            let region = poll.region.unwrap_or_else(|| WEATHER_REGION.to_string());
            let options = poll.options.unwrap_or_else(|| WEATHER_OPTS.to_string());
            SourceKind::Remote { url: weather_url(&service, &city, &region, &options) }
        };

        // simulated temperatures switch a lot, unless told otherwise
        let interval_secs = poll.interval_secs.unwrap_or(match source {
            SourceKind::Interactive => INTERACTIVE_INTERVAL_SECS,
            SourceKind::Simulated => DEBUG_INTERVAL_SECS,
            SourceKind::Remote { .. } => POLL_INTERVAL_SECS,
        });

        let on_color = resolve_color(colors.on.as_deref(), ON_COLOR, "on")?;
        let off_color = resolve_color(colors.off.as_deref(), OFF_COLOR, "off")?;

        let window = match cfg.window.as_ref() {
            Some(WindowConfig { active_at: Some(a), inactive_at: Some(i) }) => Some(
                ActivityWindow::parse(a, i)
                    .map_err(|e| ConfigError::Validation(e.to_string()))?,
            ),
            Some(WindowConfig { active_at: None, inactive_at: None }) | None => None,
            Some(_) => {
                return Err(ConfigError::Validation(
                    "window needs both active_at and inactive_at".into(),
                ))
            }
        };

        let override_file = match cfg.override_file.as_ref() {
            Some(ov) if ov.enabled.unwrap_or(false) => Some(OverrideSettings {
                path: ov.path.clone().unwrap_or_else(|| PathBuf::from(OVERRIDE_PATH)),
                poll_interval: Duration::from_secs(ov.poll_secs.unwrap_or(OVERRIDE_POLL_SECS).max(1)),
            }),
            _ => None,
        };

        Ok(Settings {
            log_level: cfg.log_level.clone()
                .unwrap_or_else(|| if debug { "debug" } else { "info" }.to_string()),
            strip: StripSettings {
                length,
                data_line: strip.data_line.unwrap_or(STRIP_DATA_LINE),
                color_order,
                brightness,
                reversed,
                spi_device: strip.spi_device.unwrap_or_else(|| STRIP_SPI_DEVICE.to_string()),
            },
            mapper,
            source,
            interval: Duration::from_secs(interval_secs),
            pixel_delay: Duration::from_millis(poll.pixel_delay_ms.unwrap_or(PIXEL_DELAY_MS)),
            disable_proportional_lighting: modes.disable_proportional_lighting.unwrap_or(false),
            disable_proportional_color: modes.disable_proportional_color.unwrap_or(false),
            on_color,
            off_color,
            splash: modes.splash.unwrap_or(true),
            emulated: modes.emulated.unwrap_or(false),
            window,
            override_file,
        })
    }
}

/// `http://<service>/<city>,<region><query-opts>`
pub fn weather_url(service: &str, city: &str, region: &str, options: &str) -> String {
    let service = service.trim_end_matches('/');
    format!("{service}/{city},{region}{options}")
}

fn resolve_color(text: Option<&str>, default: RGB8, name: &str) -> Result<RGB8, ConfigError> {
    match text {
        None => Ok(default),
        Some(t) => parse_rgb(t)
            .ok_or_else(|| ConfigError::Validation(format!("{name} color must be \"r,g,b\", got {t:?}"))),
    }
}
