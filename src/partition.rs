// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! How the rows of a field are shared out.  The two static policies
//! are pure functions of `(height, workers, rank)`, so every worker
//! can work out its own share without being told.  The dynamic policy
//! has no fixed shares at all; the coordinator hands out chunks from a
//! `ChunkCursor` as workers come back for more.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::errors::{Error, Result};

/// The rows one worker is responsible for: either a contiguous span or
/// every `stride`th row from `start`.  A result carries its `RowSet`
/// with it, so the coordinator never has to remember who owns what.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum RowSet {
    /// Rows `start..start + count`.
    Span {
        /// First row.
        start: usize,
        /// Number of rows.
        count: usize,
    },
    /// Rows `start, start + stride, ...`, `count` of them.
    Strided {
        /// First row.
        start: usize,
        /// Distance between consecutive rows.
        stride: usize,
        /// Number of rows.
        count: usize,
    },
}

impl RowSet {
    /// A contiguous span of rows.
    pub fn span(start: usize, count: usize) -> RowSet {
        RowSet::Span { start, count }
    }

    /// A strided set of rows.
    pub fn strided(start: usize, stride: usize, count: usize) -> RowSet {
        RowSet::Strided {
            start,
            stride,
            count,
        }
    }

    /// Number of rows in the set.
    pub fn len(&self) -> usize {
        match *self {
            RowSet::Span { count, .. } | RowSet::Strided { count, .. } => count,
        }
    }

    /// True when the set names no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A zero stride walks like a span.
    fn parts(&self) -> (usize, usize, usize) {
        match *self {
            RowSet::Span { start, count } => (start, 1, count),
            RowSet::Strided {
                start,
                stride,
                count,
            } => (start, stride.max(1), count),
        }
    }

    /// The first row and one past the last row the iterator yields.  For
    /// an empty set both are `start`.  A set that would run past
    /// `usize::MAX` ends at `usize::MAX`, which no field can hold.
    pub fn bounds(&self) -> (usize, usize) {
        let (start, stride, count) = self.parts();
        if count == 0 {
            return (start, start);
        }
        let end = (count - 1)
            .checked_mul(stride)
            .and_then(|span| span.checked_add(start))
            .and_then(|last| last.checked_add(1))
            .unwrap_or(usize::max_value());
        (start, end)
    }

    /// Iterates over the rows in the set, in ascending order.
    pub fn iter(&self) -> std::iter::Take<std::iter::StepBy<std::ops::RangeFrom<usize>>> {
        let (start, stride, count) = self.parts();
        (start..).step_by(stride).take(count)
    }
}

impl fmt::Display for RowSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RowSet::Span { .. } => {
                let (start, end) = self.bounds();
                write!(f, "{}..{}", start, end)
            }
            RowSet::Strided {
                start,
                stride,
                count,
            } => write!(f, "{} rows from {} by {}", count, start, stride),
        }
    }
}

/// The contiguous block owned by `rank`: `height / workers` rows each,
/// with the last rank also taking the remainder.
pub fn block_rows(height: usize, workers: usize, rank: usize) -> RowSet {
    let share = height / workers;
    let remainder = t!(rank == workers - 1, height % workers, 0);
    RowSet::span(rank * share, share + remainder)
}

/// Every `workers`th row starting at `rank`.
pub fn round_robin_rows(height: usize, workers: usize, rank: usize) -> RowSet {
    let count = t!(rank < height, (height - rank + workers - 1) / workers, 0);
    RowSet::strided(rank, workers, count)
}

/// The rows of a dynamic round, handed out one chunk at a time.  The
/// cursor also keeps the books on how many chunks are outstanding, so
/// the coordinator knows when the last answer is in.
#[derive(Debug)]
pub struct ChunkCursor {
    height: usize,
    chunk_size: usize,
    next_row: usize,
    issued: usize,
    outstanding: usize,
}

impl ChunkCursor {
    /// A cursor over `height` rows, `chunk_size` at a time.
    pub fn new(height: usize, chunk_size: usize) -> Result<ChunkCursor> {
        if chunk_size == 0 {
            return Err(Error::InvalidChunkSize);
        }
        Ok(ChunkCursor {
            height,
            chunk_size,
            next_row: 0,
            issued: 0,
            outstanding: 0,
        })
    }

    /// The next chunk, or `None` once every row has been handed out.
    /// The final chunk is cut short at the bottom of the field.
    pub fn next_chunk(&mut self) -> Option<RowSet> {
        if self.next_row >= self.height {
            return None;
        }
        let start = self.next_row;
        let count = self.chunk_size.min(self.height - start);
        self.next_row += count;
        self.issued += 1;
        self.outstanding += 1;
        Some(RowSet::span(start, count))
    }

    /// Records that one outstanding chunk has come back.
    pub fn complete(&mut self) {
        debug_assert!(self.outstanding > 0, "more answers than chunks issued");
        self.outstanding = self.outstanding.saturating_sub(1);
    }

    /// Chunks handed out so far.
    pub fn issued(&self) -> usize {
        self.issued
    }

    /// Chunks handed out and not yet answered.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// True once every row has been handed out and every chunk answered.
    pub fn is_finished(&self) -> bool {
        self.outstanding == 0 && self.next_row >= self.height
    }

    /// The number of chunks a full round issues.
    pub fn expected_chunks(height: usize, chunk_size: usize) -> usize {
        (height + chunk_size - 1) / chunk_size
    }
}

/// The scheduling policy for a round.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Policy {
    /// No workers: the coordinator computes every row itself.  This is
    /// the baseline every other policy is checked against.
    Sequential,
    /// Static contiguous blocks of rows.
    Block,
    /// Static round-robin rows.
    RoundRobin,
    /// Rows handed out on demand, `chunk_size` at a time.
    Dynamic {
        /// Rows per assignment.
        chunk_size: usize,
    },
}

impl Policy {
    /// The dynamic policy with its default chunk size of one row.
    pub fn dynamic() -> Policy {
        Policy::Dynamic { chunk_size: 1 }
    }

    /// The label used to tag dumped fields.
    pub fn label(&self) -> &'static str {
        match self {
            Policy::Sequential => "roadmap-seq",
            Policy::Block => "roadmap-stat",
            Policy::RoundRobin => "roadmap-statRR",
            Policy::Dynamic { .. } => "roadmap-dyn",
        }
    }

    /// The name recorded in the result summary.
    pub fn name(&self) -> &'static str {
        match self {
            Policy::Sequential => "roadmap_seq",
            Policy::Block => "roadmap_static",
            Policy::RoundRobin => "roadmap_staticRR",
            Policy::Dynamic { .. } => "roadmap_dynamic",
        }
    }

    /// The file the result summary is written to.
    pub fn result_file(&self) -> &'static str {
        match self {
            Policy::Sequential => "result-seq.txt",
            Policy::Block => "result-stat.txt",
            Policy::RoundRobin => "result-statRR.txt",
            Policy::Dynamic { .. } => "result-dyna.txt",
        }
    }

    /// The rows `rank` owns under a static policy.  The sequential
    /// baseline gives everything to rank 0; the dynamic policy has no
    /// fixed shares and returns `None`.
    pub fn static_rows(&self, height: usize, workers: usize, rank: usize) -> Option<RowSet> {
        match self {
            Policy::Sequential => Some(RowSet::span(0, height)),
            Policy::Block => Some(block_rows(height, workers, rank)),
            Policy::RoundRobin => Some(round_robin_rows(height, workers, rank)),
            Policy::Dynamic { .. } => None,
        }
    }
}

impl FromStr for Policy {
    type Err = String;

    /// Accepts the names used on the command line: `seq`, `rows`,
    /// `rowsrr`, and `dynamic`.  The chunk size is set separately.
    fn from_str(s: &str) -> std::result::Result<Policy, String> {
        match s {
            "seq" => Ok(Policy::Sequential),
            "rows" => Ok(Policy::Block),
            "rowsrr" => Ok(Policy::RoundRobin),
            "dynamic" => Ok(Policy::dynamic()),
            other => Err(format!("unknown policy '{}'", other)),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Policy::Dynamic { chunk_size } => write!(f, "dynamic({} rows)", chunk_size),
            other => write!(f, "{}", other.name()),
        }
    }
}
