/*
 *  daemon.rs
 *
 *  ThermoGauge - outdoor temperature on a strip
 *  (c) 2020-26 Stuart Hunter
 *
 *  The event loop: timers in, one action at a time out
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
use chrono::{Local, NaiveTime};
use log::{error, info, warn};
use std::future::Future;
use std::time::Duration;

use crate::config::OverrideSettings;
use crate::constants::SHUTDOWN_GRACE_MS;
use crate::gauge::Gauge;
use crate::override_file::OverrideChannel;
use crate::scheduler::{Action, Scheduler, Slot};
use crate::strip::PixelStrip;
use crate::window::{ActivityWindow, WindowController, WindowState};

fn local_time() -> NaiveTime {
    Local::now().time()
}

/// Owns the gauge and every timer. Actions run strictly one after another,
/// so the strip only ever has one writer.
pub struct Daemon<S: PixelStrip> {
    gauge: Gauge<S>,
    scheduler: Scheduler,
    window: Option<WindowController>,
    overrides: Option<(OverrideChannel, Duration)>,
    clock: fn() -> NaiveTime,
    grace: Duration,
}

impl<S: PixelStrip> Daemon<S> {
    pub fn new(gauge: Gauge<S>, window: Option<ActivityWindow>, overrides: Option<&OverrideSettings>) -> Self {
        Self {
            gauge,
            scheduler: Scheduler::new(),
            window: window.map(WindowController::new),
            overrides: overrides.map(|o| (OverrideChannel::new(&o.path), o.poll_interval)),
            clock: local_time,
            grace: Duration::from_millis(SHUTDOWN_GRACE_MS),
        }
    }

    /// Wall clock used for the activity window.
    pub fn with_clock(mut self, clock: fn() -> NaiveTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn gauge(&self) -> &Gauge<S> {
        &self.gauge
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn window_state(&self) -> Option<WindowState> {
        self.window.as_ref().map(|w| w.state())
    }

    /// Arms the first render, the window timer and the override watcher.
    pub fn start(&mut self) {
        self.scheduler.schedule_once(Duration::ZERO, Action::Render);
        if let Some(window) = self.window.as_ref() {
            let wait = window.start((self.clock)());
            self.scheduler.schedule_once(wait, Action::Deactivate);
        }
        if let Some((channel, every)) = self.overrides.as_ref() {
            info!("Watching {} for overrides", channel.path().display());
            self.scheduler.schedule_once(*every, Action::PollOverride);
        }
    }

    fn active(&self) -> bool {
        self.window_state() != Some(WindowState::Inactive)
    }

    /// Runs one fired action to completion.
    pub async fn handle(&mut self, action: Action) {
        match action {
            Action::Render => {
                if !self.active() {
                    return;
                }
                match self.gauge.render_cycle().await {
                    Ok(cycle) => {
                        self.scheduler.schedule_once(cycle.next_delay, Action::Render);
                    }
                    Err(e) => {
                        // strip trouble is not fatal, try again next interval
                        error!("Render failed: {}", e);
                        self.scheduler.schedule_once(self.gauge.interval(), Action::Render);
                    }
                }
            }
            Action::Deactivate => {
                let now = (self.clock)();
                let Some(window) = self.window.as_mut() else { return };
                let wait = window.deactivate(now);
                self.scheduler.cancel_slot(Slot::Render);
                if let Err(e) = self.gauge.blank() {
                    warn!("Blanking failed: {}", e);
                }
                self.scheduler.schedule_once(wait, Action::Activate);
            }
            Action::Activate => {
                let now = (self.clock)();
                let Some(window) = self.window.as_mut() else { return };
                let wait = window.activate(now);
                self.scheduler.schedule_once(wait, Action::Deactivate);
                self.scheduler.schedule_once(Duration::ZERO, Action::Render);
            }
            Action::PollOverride => {
                let Some((channel, every)) = self.overrides.as_mut() else { return };
                let every = *every;
                if let Some(record) = channel.poll() {
                    match self.gauge.apply_override(&record) {
                        Ok(()) if self.active() => {
                            // replaces the pending render, never runs alongside it
                            self.scheduler.schedule_once(Duration::ZERO, Action::Render);
                        }
                        Ok(()) => {}
                        Err(e) => warn!("Override not applied: {}", e),
                    }
                }
                self.scheduler.schedule_once(every, Action::PollOverride);
            }
        }
    }

    /// Waits for the next timer and runs its action.
    pub async fn step(&mut self) -> Option<Action> {
        let action = self.scheduler.next().await?;
        self.handle(action).await;
        Some(action)
    }

    /// Serves timers until nothing is left to do.
    pub async fn run(&mut self) {
        self.start();
        while self.step().await.is_some() {}
    }

    /// Serves timers until `shutdown` resolves, then releases the strip.
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) {
        tokio::select! {
            _ = self.run() => info!("Nothing left to schedule"),
            _ = shutdown => info!("Shutdown requested"),
        }
        self.shutdown().await;
    }

    /// Cancels every timer, lets a pixel write in flight settle, then turns the strip off.
    pub async fn shutdown(&mut self) {
        self.scheduler.cancel_all();
        tokio::time::sleep(self.grace).await;
        match self.gauge.blank() {
            Ok(()) => info!("Strip released"),
            Err(e) => error!("Could not blank strip on exit: {}", e),
        }
    }
}
