// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The coordinator role: rank 0.  It owns the field for the length of a
//! round, hands out work under the active policy, collects whatever
//! comes back, and refuses to produce a checksum until every row has
//! been written exactly once.
//!
//! Under the static policies rank 0 also owns a share of the rows.  It
//! computes that share through its own local `Worker`, the same way
//! every other rank does, while the spawned workers are busy.  Under
//! the dynamic policy rank 0 only schedules.

use crossbeam::channel::{unbounded, Receiver, Sender};
use crossbeam::thread::ScopedJoinHandle;
use log::{debug, info, trace};
use serde::Serialize;

use crate::errors::{Error, Result};
use crate::field::Field;
use crate::message::{Assignment, Rank, Report, RowResult};
use crate::partition::{ChunkCursor, Policy, RowSet};
use crate::planes::{Geometry, PlaneMapper, Window};
use crate::worker::Worker;

/// What happened during a round, for logs, reports and tests.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoundStats {
    /// The policy the round ran under.
    pub policy: Policy,
    /// Ranks taking part, the coordinator included.
    pub ranks: usize,
    /// Results written into the field, the coordinator's own included.
    pub results: usize,
    /// Dynamic policy: chunks handed out.  Static policies: zero.
    pub chunks_issued: usize,
    /// Dynamic policy: chunks handed out but never answered.
    pub outstanding: usize,
}

/// A finished round: a complete field and its checksum.
#[derive(Debug)]
pub struct Round {
    /// The window that was sampled.
    pub window: Window,
    /// Every row, written exactly once.
    pub field: Field,
    /// Sum of every cell of `field`.
    pub checksum: u64,
    /// Bookkeeping from the round.
    pub stats: RoundStats,
}

/// Rank 0.  Runs one round at a time, each round on its own freshly
/// spawned set of workers.
#[derive(Debug, Clone)]
pub struct Coordinator {
    geometry: Geometry,
    ranks: usize,
    policy: Policy,
    threads: usize,
}

impl Coordinator {
    /// A coordinator for a process group of `ranks` members (itself
    /// included), sharing out a field of `geometry` under `policy`.
    /// Each worker may split its rows over `threads` threads.
    pub fn new(geometry: Geometry, ranks: usize, policy: Policy, threads: usize) -> Result<Self> {
        if ranks == 0 || ranks > geometry.height {
            return Err(Error::InvalidWorkerCount {
                count: ranks,
                height: geometry.height,
            });
        }
        if let Policy::Dynamic { chunk_size: 0 } = policy {
            return Err(Error::InvalidChunkSize);
        }
        Ok(Coordinator {
            geometry,
            ranks,
            policy,
            threads: threads.max(1),
        })
    }

    /// The policy rounds run under.
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Computes one complete field over `window`.  The checksum depends
    /// only on the window and the geometry, never on the policy or the
    /// number of ranks.
    pub fn run_round(&self, window: &Window) -> Result<Round> {
        let plane = PlaneMapper::new(*window, self.geometry);
        let mut field = Field::new(self.geometry);

        let stats = match self.policy {
            Policy::Sequential => self.run_sequential(&plane, &mut field)?,
            Policy::Block | Policy::RoundRobin => self.run_static(&plane, &mut field)?,
            Policy::Dynamic { chunk_size } => self.run_dynamic(&plane, &mut field, chunk_size)?,
        };

        field.ensure_complete()?;
        let checksum = field.checksum();
        info!(
            "{} over {} ranks: xmin {:.4} xmax {:.4} ymin {:.4} ymax {:.4} checksum {}",
            self.policy,
            stats.ranks,
            window.x_min,
            window.x_max,
            window.y_min,
            window.y_max,
            checksum
        );
        Ok(Round {
            window: *window,
            field,
            checksum,
            stats,
        })
    }

    // Rank 0's explicit worker role, used only where a policy gives rank 0
    // rows of its own.
    fn local_worker(&self, plane: &PlaneMapper) -> Worker {
        Worker::new(0, *plane, self.threads)
    }

    fn run_sequential(&self, plane: &PlaneMapper, field: &mut Field) -> Result<RoundStats> {
        let result = self.local_worker(plane).compute_share(self.policy, 1)?;
        write_result(field, &result)?;
        Ok(RoundStats {
            policy: self.policy,
            ranks: 1,
            results: 1,
            chunks_issued: 0,
            outstanding: 0,
        })
    }

    /// Block and round-robin: every rank works out and computes its own
    /// share, sends it once, and is done.  Rank 0 computes its share
    /// while the others run, then collects theirs in whatever order they
    /// finish.
    fn run_static(&self, plane: &PlaneMapper, field: &mut Field) -> Result<RoundStats> {
        let (policy, ranks) = (self.policy, self.ranks);
        let (report_tx, report_rx) = unbounded();
        let mut results = 0;
        let outcome = crossbeam::scope(|spawner| {
            let handles: Vec<(Rank, ScopedJoinHandle<()>)> = (1..ranks)
                .map(|rank| {
                    let worker = Worker::new(rank, *plane, self.threads);
                    let reports = report_tx.clone();
                    (
                        rank,
                        spawner.spawn(move |_| worker.run_static(policy, ranks, &reports)),
                    )
                })
                .collect();
            drop(report_tx);

            let collected = self
                .collect_static_round(plane, &report_rx, field)
                .map(|n| results = n);
            join_workers(handles).and(collected)
        });
        flatten(outcome)?;

        Ok(RoundStats {
            policy: self.policy,
            ranks: self.ranks,
            results,
            chunks_issued: 0,
            outstanding: 0,
        })
    }

    // Rank 0's share first, then everyone else's.
    fn collect_static_round(
        &self,
        plane: &PlaneMapper,
        reports: &Receiver<Report>,
        field: &mut Field,
    ) -> Result<usize> {
        let own = self
            .local_worker(plane)
            .compute_share(self.policy, self.ranks)?;
        write_result(field, &own)?;
        Ok(1 + collect_static(reports, field, self.ranks - 1)?)
    }

    /// Dynamic: ranks 1.. pull chunks from the cursor until it runs dry.
    /// Rank 0 never computes here, so a group of one still gets a single
    /// worker.
    fn run_dynamic(
        &self,
        plane: &PlaneMapper,
        field: &mut Field,
        chunk_size: usize,
    ) -> Result<RoundStats> {
        let pool = (self.ranks - 1).max(1);
        let mut cursor = ChunkCursor::new(self.geometry.height, chunk_size)?;
        let (report_tx, report_rx) = unbounded();
        let mut results = 0;

        let outcome = crossbeam::scope(|spawner| {
            let mut assignments = Vec::with_capacity(pool);
            let mut handles = Vec::with_capacity(pool);
            for rank in 1..=pool {
                let (tx, rx) = unbounded();
                let worker = Worker::new(rank, *plane, self.threads);
                let reports = report_tx.clone();
                handles.push((
                    rank,
                    spawner.spawn(move |_| worker.run_dynamic(&rx, &reports)),
                ));
                assignments.push(tx);
            }
            drop(report_tx);

            let served = serve_chunks(&mut cursor, &assignments, &report_rx, field)
                .map(|n| results = n);
            // Hanging up releases any worker still waiting on an
            // assignment after a failed round.
            drop(assignments);
            join_workers(handles).and(served)
        });
        flatten(outcome)?;

        debug!(
            "dynamic round: {} chunks of {} rows, {} outstanding",
            cursor.issued(),
            chunk_size,
            cursor.outstanding()
        );
        Ok(RoundStats {
            policy: self.policy,
            ranks: pool + 1,
            results,
            chunks_issued: cursor.issued(),
            outstanding: cursor.outstanding(),
        })
    }
}

fn write_result(field: &mut Field, result: &RowResult) -> Result<()> {
    trace!("writing {} from rank {}", result.rows, result.owner);
    field.write_rows(&result.rows, &result.payload)
}

/// Receives one result from each of `expected` static workers, in any
/// order.  Stops early if every worker has gone; the field's own
/// bookkeeping then names the rows that never arrived.
fn collect_static(reports: &Receiver<Report>, field: &mut Field, expected: usize) -> Result<usize> {
    let mut received = 0;
    while received < expected {
        match reports.recv() {
            Ok(Report::Done(result)) => {
                write_result(field, &result)?;
                received += 1;
            }
            Ok(Report::Failed { error, .. }) => return Err(error),
            Err(_) => break,
        }
    }
    Ok(received)
}

fn assign(assignments: &[Sender<Assignment>], rank: Rank, next: Assignment) -> Result<()> {
    let tx = rank
        .checked_sub(1)
        .and_then(|i| assignments.get(i))
        .ok_or_else(|| Error::WorkerFailed {
            rank,
            reason: "no such worker".to_string(),
        })?;
    trace!("rank {} <- {:?}", rank, next);
    tx.send(next).map_err(|_| Error::WorkerFailed {
        rank,
        reason: "stopped listening for assignments".to_string(),
    })
}

/// The coordinator's half of the dynamic protocol.  Every worker gets
/// one chunk to start with (or the stop sentinel, if rows ran out
/// first); after that each answer is written at the rows its chunk
/// named and the worker that sent it gets the next chunk or the
/// sentinel.  Returns once the cursor is dry and nothing is
/// outstanding, or once every worker has gone.
fn serve_chunks(
    cursor: &mut ChunkCursor,
    assignments: &[Sender<Assignment>],
    reports: &Receiver<Report>,
    field: &mut Field,
) -> Result<usize> {
    let mut pending: Vec<Option<RowSet>> = vec![None; assignments.len()];
    for rank in 1..=assignments.len() {
        let first = next_assignment(cursor, rank, &mut pending);
        assign(assignments, rank, first)?;
    }

    let mut results = 0;
    while !cursor.is_finished() {
        let result = match reports.recv() {
            Ok(Report::Done(result)) => result,
            Ok(Report::Failed { error, .. }) => return Err(error),
            Err(_) => break,
        };
        let rank = result.owner;
        let asked = pending
            .get_mut(rank.wrapping_sub(1))
            .and_then(|p| p.take())
            .ok_or_else(|| Error::WorkerFailed {
                rank,
                reason: "answered without an assignment".to_string(),
            })?;
        if asked != result.rows {
            return Err(Error::WorkerFailed {
                rank,
                reason: format!("answered {} when asked for {}", result.rows, asked),
            });
        }
        cursor.complete();
        field.write_rows(&asked, &result.payload)?;
        results += 1;

        let next = next_assignment(cursor, rank, &mut pending);
        assign(assignments, rank, next)?;
    }
    Ok(results)
}

// Takes the next chunk off the cursor for `rank`, remembering what it
// was asked so the answer can be checked against it.
fn next_assignment(cursor: &mut ChunkCursor, rank: Rank, pending: &mut [Option<RowSet>]) -> Assignment {
    let chunk = cursor.next_chunk();
    pending[rank - 1] = chunk;
    chunk.map(Assignment::Rows).unwrap_or(Assignment::Stop)
}

fn join_workers(handles: Vec<(Rank, ScopedJoinHandle<()>)>) -> Result<()> {
    let mut failed = None;
    for (rank, handle) in handles {
        if handle.join().is_err() && failed.is_none() {
            failed = Some(Error::WorkerFailed {
                rank,
                reason: "worker thread panicked".to_string(),
            });
        }
    }
    failed.map_or(Ok(()), Err)
}

fn flatten<T>(outcome: std::thread::Result<Result<T>>) -> Result<T> {
    outcome.unwrap_or_else(|_| {
        Err(Error::WorkerFailed {
            rank: 0,
            reason: "worker pool panicked".to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> Geometry {
        Geometry::new(24, 17, 60).unwrap()
    }

    fn baseline(window: &Window) -> u64 {
        Coordinator::new(geometry(), 1, Policy::Sequential, 1)
            .unwrap()
            .run_round(window)
            .unwrap()
            .checksum
    }

    #[test]
    fn rejects_impossible_groups() {
        assert!(Coordinator::new(geometry(), 0, Policy::Block, 1).is_err());
        assert!(Coordinator::new(geometry(), 18, Policy::Block, 1).is_err());
        assert!(Coordinator::new(geometry(), 17, Policy::Block, 1).is_ok());
        assert!(Coordinator::new(geometry(), 4, Policy::Dynamic { chunk_size: 0 }, 1).is_err());
    }

    #[test]
    fn sequential_round_fills_the_field() {
        let round = Coordinator::new(geometry(), 1, Policy::Sequential, 1)
            .unwrap()
            .run_round(&Window::start())
            .unwrap();
        assert!(round.field.is_complete());
        assert_eq!(round.checksum, round.field.checksum());
        assert_eq!(round.stats.results, 1);
    }

    #[test]
    fn block_round_matches_baseline() {
        let window = Window::start();
        for ranks in 1..6 {
            let round = Coordinator::new(geometry(), ranks, Policy::Block, 1)
                .unwrap()
                .run_round(&window)
                .unwrap();
            assert_eq!(round.checksum, baseline(&window), "{} ranks", ranks);
            assert_eq!(round.stats.results, ranks);
        }
    }

    #[test]
    fn round_robin_round_matches_baseline() {
        let window = Window::start();
        for ranks in 1..6 {
            let round = Coordinator::new(geometry(), ranks, Policy::RoundRobin, 2)
                .unwrap()
                .run_round(&window)
                .unwrap();
            assert_eq!(round.checksum, baseline(&window), "{} ranks", ranks);
        }
    }

    #[test]
    fn dynamic_round_issues_every_chunk_once() {
        let window = Window::target();
        for &chunk_size in &[1, 2, 5, 17, 40] {
            for ranks in 1..5 {
                let round = Coordinator::new(geometry(), ranks, Policy::Dynamic { chunk_size }, 1)
                    .unwrap()
                    .run_round(&window)
                    .unwrap();
                assert_eq!(round.checksum, baseline(&window));
                assert_eq!(
                    round.stats.chunks_issued,
                    ChunkCursor::expected_chunks(17, chunk_size)
                );
                assert_eq!(round.stats.results, round.stats.chunks_issued);
                assert_eq!(round.stats.outstanding, 0);
            }
        }
    }

    #[test]
    fn dynamic_group_of_one_still_gets_a_worker() {
        let round = Coordinator::new(geometry(), 1, Policy::dynamic(), 1)
            .unwrap()
            .run_round(&Window::start())
            .unwrap();
        assert_eq!(round.stats.ranks, 2);
        assert_eq!(round.checksum, baseline(&Window::start()));
    }

    #[test]
    fn unanswered_assignments_leave_the_round_incomplete() {
        let (assign_tx, _assign_rx) = unbounded();
        let (report_tx, report_rx) = unbounded::<Report>();
        drop(report_tx);
        let mut cursor = ChunkCursor::new(4, 1).unwrap();
        let mut field = Field::new(Geometry::new(2, 4, 10).unwrap());

        let served = serve_chunks(&mut cursor, &[assign_tx], &report_rx, &mut field).unwrap();
        assert_eq!(served, 0);
        assert_eq!(cursor.outstanding(), 1);
        match field.ensure_complete() {
            Err(e) => assert_eq!(e.rows(), Some(&[0usize, 1, 2, 3][..])),
            Ok(_) => panic!("incomplete round accepted"),
        }
    }

    #[test]
    fn answers_for_the_wrong_rows_abort_the_round() {
        let (assign_tx, assign_rx) = unbounded();
        let (report_tx, report_rx) = unbounded();
        report_tx
            .send(Report::Done(RowResult {
                owner: 1,
                rows: RowSet::span(2, 1),
                payload: vec![0, 0],
            }))
            .unwrap();
        let mut cursor = ChunkCursor::new(4, 1).unwrap();
        let mut field = Field::new(Geometry::new(2, 4, 10).unwrap());

        match serve_chunks(&mut cursor, &[assign_tx], &report_rx, &mut field) {
            Err(Error::WorkerFailed { rank: 1, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(assign_rx.recv().unwrap(), Assignment::Rows(RowSet::span(0, 1)));
    }

    #[test]
    fn worker_failures_surface_from_static_collection() {
        let (report_tx, report_rx) = unbounded();
        report_tx
            .send(Report::Failed {
                rank: 2,
                error: Error::MalformedAssignment {
                    rank: 2,
                    start: 5,
                    end: 9,
                    height: 4,
                },
            })
            .unwrap();
        let mut field = Field::new(Geometry::new(2, 4, 10).unwrap());
        match collect_static(&report_rx, &mut field, 1) {
            Err(Error::MalformedAssignment { rank: 2, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn overlapping_static_results_are_duplicate_writes() {
        let (report_tx, report_rx) = unbounded();
        for owner in 1..3 {
            report_tx
                .send(Report::Done(RowResult {
                    owner,
                    rows: RowSet::span(1, 2),
                    payload: vec![1; 4],
                }))
                .unwrap();
        }
        let mut field = Field::new(Geometry::new(2, 4, 10).unwrap());
        match collect_static(&report_rx, &mut field, 2) {
            Err(e) => assert_eq!(e.rows(), Some(&[1usize, 2][..])),
            Ok(_) => panic!("overlap accepted"),
        }
    }
}
