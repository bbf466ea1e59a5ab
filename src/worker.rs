// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The worker role.  A worker only ever sees the rows it has been
//! given: it maps each pixel of those rows onto the window, runs the
//! escape kernel on it, and ships the finished rows back to the
//! coordinator.  It never touches the field.

use crossbeam::channel::{Receiver, Sender};
use log::{debug, trace, warn};

use crate::errors::{Error, Result};
use crate::kernel::escape_time;
use crate::message::{Assignment, Rank, Report, RowResult};
use crate::partition::{Policy, RowSet};
use crate::planes::PlaneMapper;

/// One member of the worker pool for one round.
#[derive(Debug, Clone)]
pub struct Worker {
    rank: Rank,
    plane: PlaneMapper,
    threads: usize,
}

impl Worker {
    /// A worker of the given rank, sampling `plane`, splitting each
    /// assignment over `threads` threads.
    pub fn new(rank: Rank, plane: PlaneMapper, threads: usize) -> Worker {
        Worker {
            rank,
            plane,
            threads: threads.max(1),
        }
    }

    /// This worker's rank.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Computes the given rows into a fresh buffer sized exactly for
    /// them.  Rows outside the field are refused.
    pub fn compute(&self, rows: &RowSet) -> Result<RowResult> {
        let height = self.plane.geometry.height;
        let (start, end) = rows.bounds();
        if end > height {
            return Err(Error::MalformedAssignment {
                rank: self.rank,
                start,
                end,
                height,
            });
        }

        let width = self.plane.geometry.width;
        let mut payload = vec![0u32; rows.len() * width];
        let rows_wanted: Vec<usize> = rows.iter().collect();
        self.render(&rows_wanted, &mut payload)?;
        trace!("worker {} computed {}", self.rank, rows);
        Ok(RowResult {
            owner: self.rank,
            rows: *rows,
            payload,
        })
    }

    /// Works out the share `policy` gives this rank in a group of
    /// `ranks`, then computes it.  Nobody has to be asked: the share is a
    /// function of the rank and the group size alone.
    pub fn compute_share(&self, policy: Policy, ranks: usize) -> Result<RowResult> {
        let rows = policy
            .static_rows(self.plane.geometry.height, ranks, self.rank)
            .ok_or_else(|| Error::WorkerFailed {
                rank: self.rank,
                reason: format!("{} has no static share", policy),
            })?;
        self.compute(&rows)
    }

    /// Static policies: compute the one share this worker owns, send it,
    /// and stop.
    pub fn run_static(&self, policy: Policy, ranks: usize, reports: &Sender<Report>) {
        let report = match self.compute_share(policy, ranks) {
            Ok(result) => Report::Done(result),
            Err(error) => Report::Failed {
                rank: self.rank,
                error,
            },
        };
        if reports.send(report).is_err() {
            warn!("worker {}: coordinator gone before results arrived", self.rank);
        }
    }

    /// Dynamic policy: answer assignments until told to stop.  A closed
    /// assignment channel means the coordinator abandoned the round, and
    /// is treated the same as being told to stop.
    pub fn run_dynamic(&self, assignments: &Receiver<Assignment>, reports: &Sender<Report>) {
        let mut answered = 0;
        for assignment in assignments.iter() {
            let rows = match assignment {
                Assignment::Stop => break,
                Assignment::Rows(rows) => rows,
            };
            match self.compute(&rows) {
                Ok(result) => {
                    if reports.send(Report::Done(result)).is_err() {
                        warn!("worker {}: coordinator gone, stopping", self.rank);
                        return;
                    }
                    answered += 1;
                }
                Err(error) => {
                    let failed = Report::Failed {
                        rank: self.rank,
                        error,
                    };
                    if reports.send(failed).is_err() {
                        warn!("worker {}: coordinator gone before the failure arrived", self.rank);
                    }
                    return;
                }
            }
        }
        debug!("worker {} stopping after {} chunks", self.rank, answered);
    }

    /// Fills `pixels` with the escape times of `rows`, row after row.
    /// With more than one thread the rows are split into contiguous
    /// runs, each thread owning a disjoint piece of `pixels`.
    fn render(&self, rows: &[usize], pixels: &mut [u32]) -> Result<()> {
        let width = self.plane.geometry.width;
        if self.threads == 1 || rows.len() < 2 {
            render_rows(&self.plane, rows, pixels);
            return Ok(());
        }

        let per_thread = (rows.len() + self.threads - 1) / self.threads;
        let plane = &self.plane;
        crossbeam::scope(|spawner| {
            for (rows, pixels) in rows
                .chunks(per_thread)
                .zip(pixels.chunks_mut(per_thread * width))
            {
                spawner.spawn(move |_| render_rows(plane, rows, pixels));
            }
        })
        .map_err(|_| Error::WorkerFailed {
            rank: self.rank,
            reason: "a render thread panicked".to_string(),
        })
    }
}

fn render_rows(plane: &PlaneMapper, rows: &[usize], pixels: &mut [u32]) {
    let width = plane.geometry.width;
    let limit = plane.geometry.max_iterations;
    for (&row, out) in rows.iter().zip(pixels.chunks_mut(width)) {
        for (column, cell) in out.iter_mut().enumerate() {
            *cell = escape_time(plane.pixel_to_point(column, row), limit);
        }
    }
}
