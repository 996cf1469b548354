/*
 *  window.rs
 *
 *  ThermoGauge - outdoor temperature on a strip
 *  (c) 2020-26 Stuart Hunter
 *
 *  Daily activity window, the strip goes dark overnight
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
use chrono::{NaiveTime, Timelike};
use log::info;
use std::time::Duration;
use thiserror::Error;

const SECS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("invalid clock time {0:?}, expected HH:MM")]
    ClockTime(String),

    #[error("window opens and closes at the same time {0}")]
    Empty(NaiveTime),
}

/// Wait from `now` to the next occurrence of `target`, wrapping past midnight.
/// Always positive: a target equal to `now` is a full day away.
pub fn seconds_until(now: NaiveTime, target: NaiveTime) -> Duration {
    let now_s = i64::from(now.num_seconds_from_midnight());
    let target_s = i64::from(target.num_seconds_from_midnight());
    let mut delta = (target_s - now_s).rem_euclid(SECS_PER_DAY);
    if delta == 0 {
        delta = SECS_PER_DAY;
    }
    Duration::from_secs(delta as u64)
}

fn parse_clock(text: &str) -> Result<NaiveTime, WindowError> {
    NaiveTime::parse_from_str(text.trim(), "%H:%M").map_err(|_| WindowError::ClockTime(text.to_string()))
}

/// Clock times at which rendering starts and stops each day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityWindow {
    active_at: NaiveTime,
    inactive_at: NaiveTime,
}

impl ActivityWindow {
    pub fn new(active_at: NaiveTime, inactive_at: NaiveTime) -> Self {
        Self { active_at, inactive_at }
    }

    /// Both times as 24h `HH:MM`, and they must differ.
    pub fn parse(active_at: &str, inactive_at: &str) -> Result<Self, WindowError> {
        let (active_at, inactive_at) = (parse_clock(active_at)?, parse_clock(inactive_at)?);
        if active_at == inactive_at {
            return Err(WindowError::Empty(active_at));
        }
        Ok(Self::new(active_at, inactive_at))
    }

    pub fn active_at(&self) -> NaiveTime {
        self.active_at
    }

    pub fn inactive_at(&self) -> NaiveTime {
        self.inactive_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// Rendering runs.
    Active,
    /// Strip blanked until the window opens again.
    Inactive,
}

/// Two-state machine driven by the window timers. The caller owns the timers
/// and the strip; this only tracks state and computes the next wait.
#[derive(Debug, Clone)]
pub struct WindowController {
    window: ActivityWindow,
    state: WindowState,
}

impl WindowController {
    /// Starts Active regardless of the current time of day.
    pub fn new(window: ActivityWindow) -> Self {
        Self { window, state: WindowState::Active }
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn window(&self) -> &ActivityWindow {
        &self.window
    }

    /// Delay before the first deactivation.
    pub fn start(&self, now: NaiveTime) -> Duration {
        seconds_until(now, self.window.inactive_at)
    }

    /// Active -> Inactive. Returns the wait until the window opens again.
    pub fn deactivate(&mut self, now: NaiveTime) -> Duration {
        self.state = WindowState::Inactive;
        let wait = seconds_until(now, self.window.active_at);
        info!("Going dark until {} ({}s)", self.window.active_at.format("%H:%M"), wait.as_secs());
        wait
    }

    /// Inactive -> Active. Returns the wait until the window closes.
    pub fn activate(&mut self, now: NaiveTime) -> Duration {
        self.state = WindowState::Active;
        let wait = seconds_until(now, self.window.inactive_at);
        info!("Active until {} ({}s)", self.window.inactive_at.format("%H:%M"), wait.as_secs());
        wait
    }
}
