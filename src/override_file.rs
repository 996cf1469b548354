/*
 *  override_file.rs
 *
 *  ThermoGauge - outdoor temperature on a strip
 *  (c) 2020-26 Stuart Hunter
 *
 *  External color/brightness override, watched by modification time
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
//! The override record is a small JSON document written by another process:
//!
//! ```json
//! { "color": "255,64,0", "brightness": "0.4" }
//! ```
//!
//! It is only picked up when its modification time moves past the last one applied.

use log::{debug, info};
use serde::Deserialize;
use smart_leds::RGB8;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

use crate::color_map::parse_rgb;

/// Malformed or unreadable override record. Treated as "no override this poll".
#[derive(Debug, Error)]
pub enum OverrideReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad color {0:?}, expected \"r,g,b\"")]
    Color(String),
    #[error("bad brightness {0:?}, expected 0.0..=1.0")]
    Brightness(String),
}

/// One accepted override.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverrideRecord {
    pub color: RGB8,
    /// 0.0 turns the background black and disables strip scaling.
    pub brightness: f32,
    /// Modification time of the file the record was read from.
    pub timestamp: SystemTime,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Number(f32),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    color: String,
    brightness: TextOrNumber,
}

/// Parses the record body; `timestamp` is supplied by the caller.
pub fn parse_record(text: &str, timestamp: SystemTime) -> Result<OverrideRecord, OverrideReadError> {
    let raw: RawRecord = serde_json::from_str(text)?;
    let color = parse_rgb(&raw.color).ok_or_else(|| OverrideReadError::Color(raw.color.clone()))?;
    let brightness = match raw.brightness {
        TextOrNumber::Number(n) => n,
        TextOrNumber::Text(t) => t.trim().parse().map_err(|_| OverrideReadError::Brightness(t.clone()))?,
    };
    if !(0.0..=1.0).contains(&brightness) {
        return Err(OverrideReadError::Brightness(brightness.to_string()));
    }
    Ok(OverrideRecord { color, brightness, timestamp })
}

/// Reads the record and stamps it with the file's modification time.
pub fn read_record(path: &Path) -> Result<OverrideRecord, OverrideReadError> {
    let modified = fs::metadata(path)?.modified()?;
    let text = fs::read_to_string(path)?;
    parse_record(&text, modified)
}

/// Polls the override file, accepting each new version once.
#[derive(Debug)]
pub struct OverrideChannel {
    path: PathBuf,
    /// Latest accepted modification time, never reset.
    watermark: Option<SystemTime>,
}

impl OverrideChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), watermark: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn watermark(&self) -> Option<SystemTime> {
        self.watermark
    }

    /// Returns the record if the file changed since the last accepted one.
    /// Unreadable or malformed files are skipped and the watermark stays put.
    pub fn poll(&mut self) -> Option<OverrideRecord> {
        let modified = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(m) => m,
            Err(e) => {
                debug!("override file {}: {}", self.path.display(), e);
                return None;
            }
        };
        if self.watermark.is_some_and(|w| modified <= w) {
            return None;
        }
        match read_record(&self.path) {
            Ok(record) => {
                self.watermark = Some(record.timestamp.max(modified));
                info!(
                    "Override accepted: color ({},{},{}) brightness {:.2}",
                    record.color.r, record.color.g, record.color.b, record.brightness
                );
                Some(record)
            }
            Err(e) => {
                debug!("override file {} skipped: {}", self.path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn write_at(path: &Path, body: &str, secs: u64) {
        fs::write(path, body).unwrap();
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs);
        fs::File::options().write(true).open(path).unwrap().set_modified(stamp).unwrap();
    }

    #[test]
    fn test_parse_text_and_number_brightness() {
        let t = SystemTime::UNIX_EPOCH;
        let rec = parse_record(r#"{"color":"255,64,0","brightness":"0.4"}"#, t).unwrap();
        assert_eq!(rec.color, RGB8::new(255, 64, 0));
        assert!((rec.brightness - 0.4).abs() < 1e-6);
        let rec = parse_record(r#"{"color":"1,2,3","brightness":0}"#, t).unwrap();
        assert_eq!(rec.brightness, 0.0);
    }

    #[test]
    fn test_parse_errors() {
        let t = SystemTime::UNIX_EPOCH;
        assert!(matches!(parse_record("not json", t), Err(OverrideReadError::Json(_))));
        assert!(matches!(
            parse_record(r#"{"color":"red","brightness":"1"}"#, t),
            Err(OverrideReadError::Color(_))
        ));
        assert!(matches!(
            parse_record(r#"{"color":"1,2,3","brightness":"bright"}"#, t),
            Err(OverrideReadError::Brightness(_))
        ));
        assert!(parse_record(r#"{"color":"1,2,3","brightness":"1.5"}"#, t).is_err());
    }

    #[test]
    fn test_poll_only_accepts_newer_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("override.json");
        let mut channel = OverrideChannel::new(&path);

        // missing file
        assert!(channel.poll().is_none());

        write_at(&path, r#"{"color":"10,20,30","brightness":"0.5"}"#, 10);
        let rec = channel.poll().expect("first version accepted");
        assert_eq!(rec.color, RGB8::new(10, 20, 30));
        // same mtime, nothing new
        assert!(channel.poll().is_none());

        // rewritten with an older stamp, still ignored
        write_at(&path, r#"{"color":"1,1,1","brightness":"0.5"}"#, 5);
        assert!(channel.poll().is_none());

        write_at(&path, r#"{"color":"40,50,60","brightness":"1"}"#, 20);
        assert_eq!(channel.poll().unwrap().color, RGB8::new(40, 50, 60));
    }

    #[test]
    fn test_malformed_file_keeps_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("override.json");
        let mut channel = OverrideChannel::new(&path);

        write_at(&path, r#"{"color":"10,20,30","brightness":"0.5"}"#, 10);
        assert!(channel.poll().is_some());
        let mark = channel.watermark();

        write_at(&path, "{ half written", 20);
        assert!(channel.poll().is_none());
        assert_eq!(channel.watermark(), mark);

        // fixed up with the same stamp, now accepted
        write_at(&path, r#"{"color":"7,7,7","brightness":"0.2"}"#, 20);
        assert_eq!(channel.poll().unwrap().color, RGB8::new(7, 7, 7));
    }
}
