/*
 *  scheduler.rs
 *
 *  ThermoGauge - outdoor temperature on a strip
 *  (c) 2020-26 Stuart Hunter
 *
 *  Cancellable one-shot timers feeding a single event loop
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
//! Timers do no work themselves. When one fires it posts its action back to
//! the owner of the [`Scheduler`], who runs it. Each kind of action lives in a
//! slot and a slot holds at most one pending timer: scheduling into a busy slot
//! aborts the previous timer first. A timer that already fired but whose
//! message is still queued is recognised by its generation and dropped.

use log::debug;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Work the event loop can be asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Fetch, map and animate one gauge update.
    Render,
    /// Activity window closes, blank the strip.
    Deactivate,
    /// Activity window opens, render again.
    Activate,
    /// Look at the override file.
    PollOverride,
}

/// Timer slots, one pending timer each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Render,
    Window,
    Override,
}

impl Action {
    pub fn slot(&self) -> Slot {
        match self {
            Action::Render => Slot::Render,
            Action::Deactivate | Action::Activate => Slot::Window,
            Action::PollOverride => Slot::Override,
        }
    }
}

/// Identifies one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleHandle {
    pub slot: Slot,
    pub generation: u64,
}

#[derive(Debug)]
struct Pending {
    generation: u64,
    action: Action,
    task: JoinHandle<()>,
}

#[derive(Debug)]
struct Fired {
    slot: Slot,
    generation: u64,
}

#[derive(Debug)]
pub struct Scheduler {
    tx: UnboundedSender<Fired>,
    rx: UnboundedReceiver<Fired>,
    pending: HashMap<Slot, Pending>,
    generation: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx, pending: HashMap::new(), generation: 0 }
    }

    /// Runs `action` once after `delay`, replacing whatever was pending in its slot.
    pub fn schedule_once(&mut self, delay: Duration, action: Action) -> ScheduleHandle {
        let slot = action.slot();
        self.cancel_slot(slot);

        self.generation += 1;
        let generation = self.generation;
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let _ = tx.send(Fired { slot, generation });
        });
        debug!("{:?} in {:.1}s (#{})", action, delay.as_secs_f32(), generation);
        self.pending.insert(slot, Pending { generation, action, task });
        ScheduleHandle { slot, generation }
    }

    /// Cancels the timer behind `handle` if it is still the pending one.
    pub fn cancel(&mut self, handle: ScheduleHandle) -> bool {
        match self.pending.get(&handle.slot) {
            Some(p) if p.generation == handle.generation => self.cancel_slot(handle.slot),
            _ => false,
        }
    }

    /// Cancels whatever is pending in `slot`.
    pub fn cancel_slot(&mut self, slot: Slot) -> bool {
        match self.pending.remove(&slot) {
            Some(p) => {
                p.task.abort();
                debug!("{:?} cancelled (#{})", p.action, p.generation);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, p) in self.pending.drain() {
            p.task.abort();
        }
    }

    pub fn is_pending(&self, slot: Slot) -> bool {
        self.pending.contains_key(&slot)
    }

    /// Action waiting in `slot`, if any.
    pub fn pending_action(&self, slot: Slot) -> Option<Action> {
        self.pending.get(&slot).map(|p| p.action)
    }

    /// Waits for the next live timer to fire. Returns `None` once nothing is
    /// pending, so the loop cannot wait forever on an empty schedule.
    pub async fn next(&mut self) -> Option<Action> {
        loop {
            if self.pending.is_empty() {
                return None;
            }
            let fired = self.rx.recv().await?;
            match self.pending.get(&fired.slot) {
                Some(p) if p.generation == fired.generation => {
                    return self.pending.remove(&fired.slot).map(|p| p.action);
                }
                _ => debug!("stale {:?} timer #{} dropped", fired.slot, fired.generation),
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
