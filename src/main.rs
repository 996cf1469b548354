/*
 *  main.rs
 *
 *  ThermoGauge - outdoor temperature on a strip
 *	(c) 2020-26 Stuart Hunter
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
use anyhow::Context;
use env_logger::Env;
use log::{error, info, warn};

#[cfg(unix)] // Only compile this block on Unix-like systems
use tokio::signal::unix::{signal, SignalKind}; // Import specific Unix signals

use thermogauge::config::{self, Settings, SourceKind};
use thermogauge::daemon::Daemon;
use thermogauge::gauge::Gauge;
use thermogauge::strip::{BoxedStrip, VirtualStrip};
use thermogauge::weather::TemperatureSource;

#[cfg(feature = "hardware")]
use thermogauge::drivers::ws2812_spi::Ws2812Spi;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Asynchronously waits for a SIGINT, SIGTERM, or SIGHUP signal.
/// Once a signal is caught it is logged and the function returns,
/// letting the daemon turn the strip off before exit.
async fn signal_handler() -> anyhow::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

/// The strip device; failing to get it is the one fatal error.
fn open_strip(settings: &Settings) -> anyhow::Result<BoxedStrip> {
    let len = settings.strip.length;
    let brightness = Some(settings.strip.brightness);

    if settings.emulated {
        info!("Emulated strip of {} pixels", len);
        return Ok(Box::new(VirtualStrip::new(len, brightness)));
    }

    #[cfg(feature = "hardware")]
    let strip: BoxedStrip = {
        info!("Data line GPIO{}, color order {:?}", settings.strip.data_line, settings.strip.color_order);
        let device = Ws2812Spi::open(&settings.strip.spi_device, len, settings.strip.color_order, brightness)
            .with_context(|| format!("opening strip on {}", settings.strip.spi_device))?;
        Box::new(device)
    };

    #[cfg(not(feature = "hardware"))]
    let strip: BoxedStrip = {
        warn!("Built without the hardware feature, using an emulated strip");
        Box::new(VirtualStrip::new(len, brightness))
    };

    Ok(strip)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = config::load().context("loading configuration")?;

    env_logger::Builder::from_env(Env::default().default_filter_or(settings.log_level.as_str()))
        .format_timestamp_secs()
        .init();

    info!("This {} reads the weather", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);
    match &settings.source {
        SourceKind::Remote { url } => info!("Polling {} every {}s", url, settings.interval.as_secs()),
        SourceKind::Simulated => info!("Simulated temperatures every {}s", settings.interval.as_secs()),
        SourceKind::Interactive => info!("Temperatures from the keyboard"),
    }

    let strip = open_strip(&settings)?;
    let source = TemperatureSource::from_kind(&settings.source, settings.mapper.temp_min, settings.mapper.temp_max)
        .context("creating temperature source")?;

    let mut gauge = Gauge::new(&settings, strip, source);
    if settings.splash {
        if let Err(e) = gauge.splash().await {
            warn!("Pixel check failed: {}", e);
        }
    }

    let mut daemon = Daemon::new(gauge, settings.window, settings.override_file.as_ref());
    daemon
        .run_until(async {
            if let Err(e) = signal_handler().await {
                error!("Signal handling unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("Bye");
    Ok(())
}
