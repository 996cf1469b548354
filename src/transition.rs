/*
 *  transition.rs
 *
 *  ThermoGauge - outdoor temperature on a strip
 *  (c) 2020-26 Stuart Hunter
 *
 *  Pixel sweeps between gauge states and the start-up chase
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
use log::debug;
use smart_leds::RGB8;
use std::time::Duration;

use crate::color_map::RenderTarget;
use crate::constants::{DIM, DIMMEST};
use crate::strip::{PixelStrip, StripError};

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Which way a sweep runs and which end of the strip is "hot".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sweep {
    /// Normal mount, count rising: light `[0,t)` up, then clear `[t,N)` up.
    NormalWarming,
    /// Normal mount, count falling: clear `[t,N)` down, then light `[0,t)` down.
    NormalCooling,
    /// Upside down, warming: clear `[0,t)` up, then light `[t,N)` up.
    ReversedWarming,
    /// Upside down, cooling: light `[t,N)` down, then clear `[0,t)` up.
    ReversedCooling,
}

impl Sweep {
    /// Counts are physical lit counts as produced by the mapper. On a reversed
    /// mount the mapper already mirrored them, so warming shows up as a falling
    /// count. Equal counts take the warming path.
    pub fn choose(previous: usize, target: usize, reversed: bool) -> Self {
        match (reversed, previous <= target, previous >= target) {
            (false, true, _) => Sweep::NormalWarming,
            (false, false, _) => Sweep::NormalCooling,
            (true, _, true) => Sweep::ReversedWarming,
            (true, _, false) => Sweep::ReversedCooling,
        }
    }
}

/// Walks the strip from one gauge state to the next, one pixel at a time.
#[derive(Debug, Clone)]
pub struct Animator {
    pixel_delay: Duration,
    reversed: bool,
}

impl Animator {
    pub fn new(pixel_delay: Duration, reversed: bool) -> Self {
        Self { pixel_delay, reversed }
    }

    pub fn reversed(&self) -> bool {
        self.reversed
    }

    async fn paint<S, I>(&self, strip: &mut S, indices: I, color: RGB8) -> Result<(), StripError>
    where
        S: PixelStrip + ?Sized,
        I: Iterator<Item = usize>,
    {
        for i in indices {
            strip.set(i, color)?;
            pause(self.pixel_delay).await;
        }
        Ok(())
    }

    /// Animates from `previous` to `target`; `off` fills the unlit pixels.
    pub async fn render<S>(
        &self,
        strip: &mut S,
        previous: RenderTarget,
        target: RenderTarget,
        off: RGB8,
    ) -> Result<Sweep, StripError>
    where
        S: PixelStrip + ?Sized,
    {
        let n = strip.len();
        let t = target.pixels.min(n);
        let on = target.color;
        let sweep = Sweep::choose(previous.pixels, t, self.reversed);
        debug!("sweep {:?} {} -> {} of {}", sweep, previous.pixels, t, n);

        match sweep {
            Sweep::NormalWarming => {
                self.paint(strip, 0..t, on).await?;
                self.paint(strip, t..n, off).await?;
            }
            Sweep::NormalCooling => {
                self.paint(strip, (t..n).rev(), off).await?;
                self.paint(strip, (0..t).rev(), on).await?;
            }
            Sweep::ReversedWarming => {
                self.paint(strip, 0..t, off).await?;
                self.paint(strip, t..n, on).await?;
            }
            Sweep::ReversedCooling => {
                self.paint(strip, (t..n).rev(), on).await?;
                self.paint(strip, 0..t, off).await?;
            }
        }
        Ok(sweep)
    }
}

/// Three-pixel comet up the strip and back, so a dead pixel shows at start-up.
pub async fn chase<S>(strip: &mut S, on: RGB8, off: RGB8, step: Duration, hold: Duration) -> Result<(), StripError>
where
    S: PixelStrip + ?Sized,
{
    let n = strip.len();
    strip.fill(off)?;
    pause(hold).await;

    for i in 0..n {
        pause(step).await;
        strip.set(i, on)?;
        if i >= 1 {
            strip.set(i - 1, DIM)?;
        }
        if i >= 2 {
            strip.set(i - 2, DIMMEST)?;
        }
        if i >= 3 {
            strip.set(i - 3, off)?;
        }
    }
    if n > 2 {
        // tail runs off the top
        strip.set(n - 1, DIM)?;
        strip.set(n - 2, DIMMEST)?;
        strip.set(n - 3, off)?;
        pause(step).await;
        strip.set(n - 1, DIMMEST)?;
        strip.set(n - 2, off)?;
        pause(step).await;
        strip.set(n - 1, off)?;
    }

    for i in (0..n).rev() {
        pause(step).await;
        strip.set(i, on)?;
        if i + 1 < n {
            strip.set(i + 1, DIM)?;
        }
        if i + 2 < n {
            strip.set(i + 2, DIMMEST)?;
        }
        if i + 3 < n {
            strip.set(i + 3, off)?;
        }
    }
    if n > 2 {
        strip.set(0, DIM)?;
        strip.set(1, DIMMEST)?;
        strip.set(2, off)?;
        pause(step).await;
        strip.set(0, DIMMEST)?;
        strip.set(1, off)?;
        pause(step).await;
        strip.set(0, off)?;
    }
    pause(hold).await;
    Ok(())
}
