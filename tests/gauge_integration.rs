/*
 *  tests/gauge_integration.rs
 *
 *  Integration tests for the render loop
 *
 *  ThermoGauge - outdoor temperature on a strip
 *  (c) 2020-26 Stuart Hunter
 */

use smart_leds::RGB8;
use std::fs;
use std::time::Duration;
use tokio::time::Instant;

use thermogauge::config::{Config, OverrideSettings, Settings, SourceKind};
use thermogauge::constants::BLACK;
use thermogauge::daemon::Daemon;
use thermogauge::gauge::Gauge;
use thermogauge::scheduler::{Action, Slot};
use thermogauge::strip::{PixelStrip, VirtualStrip};
use thermogauge::weather::TemperatureSource;

fn settings_from_yaml(yaml: &str) -> Settings {
    let cfg: Config = serde_yaml::from_str(yaml).unwrap();
    let mut settings = Settings::resolve(&cfg).unwrap();
    settings.pixel_delay = Duration::ZERO;
    settings
}

#[tokio::test]
async fn test_override_while_render_pending_renders_once() {
    tokio::time::pause();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("override.json");

    let settings = settings_from_yaml("strip:\n  length: 12\npoll:\n  interval_secs: 1800\n");
    let strip = VirtualStrip::new(12, None);
    let gauge = Gauge::new(&settings, strip.clone(), TemperatureSource::supplied([50, 60, 70]));
    let overrides = OverrideSettings { path: path.clone(), poll_interval: Duration::from_secs(60) };
    let mut daemon = Daemon::new(gauge, None, Some(&overrides));

    let start = Instant::now();
    daemon.start();
    assert_eq!(daemon.step().await, Some(Action::Render));
    assert_eq!(daemon.gauge().cycles(), 1);

    // nothing to read yet
    assert_eq!(daemon.step().await, Some(Action::PollOverride));
    assert_eq!(daemon.gauge().cycles(), 1);

    fs::write(&path, r#"{"color":"0,0,64","brightness":"0.5"}"#).unwrap();
    assert_eq!(daemon.step().await, Some(Action::PollOverride));
    // the half-hour render was swapped for an immediate one
    assert_eq!(daemon.scheduler().pending_action(Slot::Render), Some(Action::Render));
    assert_eq!(daemon.step().await, Some(Action::Render));
    assert_eq!(daemon.gauge().cycles(), 2);

    let shown = daemon.gauge().previous_target();
    let background = RGB8::new(0, 0, 64);
    assert_eq!(strip.snapshot().count(background), 12 - shown.pixels);
    assert_eq!(strip.brightness(), Some(0.5));

    // the next render is a full interval after the override, not at the old deadline
    while daemon.gauge().cycles() < 3 {
        daemon.step().await.unwrap();
    }
    assert!(start.elapsed() >= Duration::from_secs(120 + 1800));
}

#[tokio::test]
async fn test_stale_override_file_is_applied_once() {
    tokio::time::pause();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("override.json");
    fs::write(&path, r#"{"color":"9,9,9","brightness":"1.0"}"#).unwrap();

    let settings = settings_from_yaml("strip:\n  length: 8\n");
    let gauge = Gauge::new(&settings, VirtualStrip::new(8, None), TemperatureSource::supplied([40; 8]));
    let overrides = OverrideSettings { path, poll_interval: Duration::from_secs(1) };
    let mut daemon = Daemon::new(gauge, None, Some(&overrides));
    daemon.start();

    let mut renders = 0;
    for _ in 0..20 {
        if daemon.step().await == Some(Action::Render) {
            renders += 1;
        }
    }
    // start-up render plus one for the override
    assert_eq!(renders, 2);
    assert_eq!(daemon.gauge().off_color(), RGB8::new(9, 9, 9));
}

#[tokio::test]
async fn test_simulated_run_then_shutdown() {
    tokio::time::pause();
    let settings = settings_from_yaml("strip:\n  length: 25\nmodes:\n  simulate: true\n");
    assert_eq!(settings.source, SourceKind::Simulated);
    assert_eq!(settings.interval, Duration::from_secs(3));

    let source = TemperatureSource::from_kind(&settings.source, settings.mapper.temp_min, settings.mapper.temp_max).unwrap();
    let strip = VirtualStrip::new(25, Some(settings.strip.brightness));
    let gauge = Gauge::new(&settings, strip.clone(), source);
    let mut daemon = Daemon::new(gauge, settings.window, settings.override_file.as_ref());

    daemon.run_until(tokio::time::sleep(Duration::from_secs(10))).await;
    // renders at 0, 3, 6 and 9 seconds
    assert_eq!(daemon.gauge().cycles(), 4);
    assert_eq!(strip.snapshot().count(BLACK), 25);
    assert!(!daemon.scheduler().is_pending(Slot::Render));
}

#[tokio::test]
async fn test_reversed_strip_lights_from_the_top() {
    let settings = settings_from_yaml("strip:\n  length: 10\n  reversed: true\n");
    let strip = VirtualStrip::new(10, None);
    let mut gauge = Gauge::new(&settings, strip.clone(), TemperatureSource::supplied([50]));
    let cycle = gauge.render_cycle().await.unwrap();

    // 50F on -40..140 is half the strip, lit at the far end
    assert_eq!(cycle.target.pixels, 5);
    let pixels = strip.snapshot().pixels;
    assert!(pixels[..5].iter().all(|p| *p == BLACK));
    assert!(pixels[5..].iter().all(|p| *p == cycle.target.color));
}
