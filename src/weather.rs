/*
 *  weather.rs
 *
 *  ThermoGauge - outdoor temperature on a strip
 *	(c) 2020-26 Stuart Hunter
 *
 *	Temperature sources: the weather service, simulation and manual input
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
use flate2::read::GzDecoder;
use log::{debug, info};
use rand::Rng;
use reqwest::{header, Client};
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::config::SourceKind;

/// A temperature in whole degrees.
pub type TemperatureReading = i32;

/// Why a reading could not be produced. Always recovered by the caller.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no temperature in response {0:?}")]
    Parse(String),
    #[error("input error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no more supplied temperatures")]
    Exhausted,
}

/// Pulls the temperature out of free text such as `+72°F`.
///
/// Everything but digits and dots is dropped; a leading minus sign is kept so
/// sub-zero readings stay negative.
pub fn parse_temperature(body: &str) -> Result<TemperatureReading, FetchError> {
    let text = body.trim();
    let negative = text.starts_with('-');
    let digits: String = text.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    let value: i32 = digits.parse().map_err(|_| FetchError::Parse(text.to_string()))?;
    Ok(if negative { -value } else { value })
}

/// Plain-text weather endpoint client, one request per read, no retries.
#[derive(Debug)]
pub struct WeatherClient {
    url: String,
    client: Client,
}

impl WeatherClient {
    pub fn new(url: &str) -> Result<Self, FetchError> {
        const VERSION: &'static str = concat!("ThermoGauge ", env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
        headers.insert("Accept", header::HeaderValue::from_static("text/plain"));
        headers.insert("Accept-Encoding", header::HeaderValue::from_static("gzip"));
        headers.insert("Connection", header::HeaderValue::from_static("close"));

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .default_headers(headers)
            .timeout(Duration::from_secs(5))
            .build()?;

        info!("Weather source {}", url);
        Ok(Self { url: url.to_string(), client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<TemperatureReading, FetchError> {
        let raw = self.client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        // Try to decode as gzip first, fall back to plain text if it fails
        let plain = {
            let mut decoder = GzDecoder::new(&raw[..]);
            let mut decoded = String::new();
            match decoder.read_to_string(&mut decoded) {
                Ok(_) => decoded,
                Err(_) => String::from_utf8_lossy(&raw).to_string(),
            }
        };
        debug!("weather service said {:?}", plain.trim());
        parse_temperature(&plain)
    }
}

/// Pseudo-random temperatures in `min..=max`.
#[derive(Debug, Clone)]
pub struct Simulator {
    min: TemperatureReading,
    max: TemperatureReading,
}

impl Simulator {
    pub fn new(min: TemperatureReading, max: TemperatureReading) -> Self {
        Self { min: min.min(max), max: max.max(min) }
    }

    pub fn read(&self) -> TemperatureReading {
        rand::rng().random_range(self.min..=self.max)
    }
}

/// Temperatures typed on stdin, one per line.
#[derive(Debug)]
pub struct Interactive {
    lines: Lines<BufReader<Stdin>>,
}

impl Interactive {
    pub fn new() -> Self {
        Self { lines: BufReader::new(tokio::io::stdin()).lines() }
    }

    pub async fn read(&mut self) -> Result<TemperatureReading, FetchError> {
        let mut out = std::io::stdout();
        write!(out, "Next temperature: ")?;
        out.flush()?;
        match self.lines.next_line().await? {
            Some(line) => line.trim().parse().map_err(|_| FetchError::Parse(line)),
            None => Err(FetchError::Exhausted),
        }
    }
}

impl Default for Interactive {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the render cycle gets its temperature from.
#[derive(Debug)]
pub enum TemperatureSource {
    Remote(WeatherClient),
    Simulated(Simulator),
    Interactive(Interactive),
    /// Values handed in directly, consumed in order.
    Supplied(VecDeque<TemperatureReading>),
}

impl TemperatureSource {
    pub fn from_kind(kind: &SourceKind, min: TemperatureReading, max: TemperatureReading) -> Result<Self, FetchError> {
        Ok(match kind {
            SourceKind::Remote { url } => TemperatureSource::Remote(WeatherClient::new(url)?),
            SourceKind::Simulated => TemperatureSource::Simulated(Simulator::new(min, max)),
            SourceKind::Interactive => TemperatureSource::Interactive(Interactive::new()),
        })
    }

    pub fn supplied(values: impl IntoIterator<Item = TemperatureReading>) -> Self {
        TemperatureSource::Supplied(values.into_iter().collect())
    }

    /// Queues another reading on a supplied source; other sources ignore it.
    pub fn push(&mut self, value: TemperatureReading) {
        if let TemperatureSource::Supplied(values) = self {
            values.push_back(value);
        }
    }

    /// One reading; on error the caller keeps the last displayed temperature.
    pub async fn read(&mut self) -> Result<TemperatureReading, FetchError> {
        match self {
            TemperatureSource::Remote(client) => client.fetch().await,
            TemperatureSource::Simulated(sim) => Ok(sim.read()),
            TemperatureSource::Interactive(input) => input.read().await,
            TemperatureSource::Supplied(values) => values.pop_front().ok_or(FetchError::Exhausted),
        }
    }
}

/// Randomized retry delay after a failed fetch, bounded by the temperature ceiling
/// (in seconds), so a sulking service is not hammered at a fixed rate.
pub fn retry_backoff(temp_max: TemperatureReading) -> Duration {
    let ceiling = u64::try_from(temp_max).unwrap_or(0).max(1);
    Duration::from_secs(rand::rng().random_range(0..ceiling))
}
