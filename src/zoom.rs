// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The zoom driver: walks the window from a start view to a target
//! view in a fixed number of equal steps and runs one round at every
//! stop along the way, the start included.

use std::time::{Duration, Instant};

use log::info;
use serde::Serialize;

use crate::coordinator::{Coordinator, RoundStats};
use crate::dump::RoundSink;
use crate::errors::Result;
use crate::planes::Window;

/// The number of zoom steps in the reference run.
pub const ZOOMS: usize = 10;

/// One round of a zoom sequence, without its field.
#[derive(Clone, Debug, Serialize)]
pub struct RoundReport {
    /// Position in the sequence, starting at 0.
    pub index: usize,
    /// The window sampled.
    pub window: Window,
    /// The checksum of the round's field.
    pub checksum: u64,
    /// Scheduling bookkeeping.
    pub stats: RoundStats,
}

/// Everything a zoom sequence produced.
#[derive(Clone, Debug)]
pub struct ZoomReport {
    /// One entry per round, `steps + 1` of them.
    pub rounds: Vec<RoundReport>,
    /// Wall time for the whole sequence.
    pub elapsed: Duration,
}

impl ZoomReport {
    /// The running sum of every round's checksum.
    pub fn crc(&self) -> u64 {
        self.rounds
            .iter()
            .fold(0u64, |crc, r| crc.wrapping_add(r.checksum))
    }

    /// The checksum of the final round.
    pub fn final_checksum(&self) -> Option<u64> {
        self.rounds.last().map(|r| r.checksum)
    }

    /// Every round's checksum, in order.
    pub fn checksums(&self) -> Vec<u64> {
        self.rounds.iter().map(|r| r.checksum).collect()
    }
}

/// Walks a window from `start` towards `target` in `steps` equal steps.
#[derive(Copy, Clone, Debug)]
pub struct ZoomDriver {
    start: Window,
    target: Window,
    steps: usize,
}

impl ZoomDriver {
    /// A driver for `steps` zooms, so `steps + 1` rounds.
    pub fn new(start: Window, target: Window, steps: usize) -> ZoomDriver {
        ZoomDriver {
            start,
            target,
            steps,
        }
    }

    /// The per-edge change applied between rounds.  With no steps the
    /// window never moves.
    pub fn delta(&self) -> Window {
        if self.steps == 0 {
            return Window {
                x_min: 0.0,
                x_max: 0.0,
                y_min: 0.0,
                y_max: 0.0,
            };
        }
        let n = self.steps as f64;
        Window {
            x_min: (self.target.x_min - self.start.x_min) / n,
            x_max: (self.target.x_max - self.start.x_max) / n,
            y_min: (self.target.y_min - self.start.y_min) / n,
            y_max: (self.target.y_max - self.start.y_max) / n,
        }
    }

    /// Every window in the sequence.  Each is the previous one plus the
    /// delta, so every run of the sequence sees exactly the same windows.
    pub fn windows(&self) -> Vec<Window> {
        let delta = self.delta();
        let mut window = self.start;
        let mut windows = Vec::with_capacity(self.steps + 1);
        windows.push(window);
        for _ in 0..self.steps {
            window = window.shifted(&delta);
            windows.push(window);
        }
        windows
    }

    /// Runs one round per window, in order, handing each finished round
    /// to `sink` before the next begins.
    pub fn run<S: RoundSink>(&self, coordinator: &Coordinator, sink: &mut S) -> Result<ZoomReport> {
        let started = Instant::now();
        let mut rounds = Vec::with_capacity(self.steps + 1);
        for (index, window) in self.windows().iter().enumerate() {
            let round = coordinator.run_round(window)?;
            sink.accept(coordinator.policy(), &round)?;
            rounds.push(RoundReport {
                index,
                window: round.window,
                checksum: round.checksum,
                stats: round.stats,
            });
        }
        let elapsed = started.elapsed();
        info!(
            "{} rounds under {} in {:.3}s",
            rounds.len(),
            coordinator.policy(),
            elapsed.as_secs_f64()
        );
        Ok(ZoomReport { rounds, elapsed })
    }
}

impl Default for ZoomDriver {
    fn default() -> Self {
        ZoomDriver::new(Window::start(), Window::target(), ZOOMS)
    }
}
