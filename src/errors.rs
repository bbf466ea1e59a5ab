// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Every way a round can go wrong.  None of these are recoverable: a
//! malformed assignment, an overlapping write, or a missing row all
//! mean the scheduling logic itself is broken, so they surface
//! immediately and abort the round.

use failure::Fail;
use itertools::Itertools;

/// Shorthand used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Row lists in error messages get long quickly on a 2000-row field;
/// only the first few are shown.
const SHOWN_ROWS: usize = 16;

fn show_rows(rows: &[usize]) -> String {
    let shown = rows.iter().take(SHOWN_ROWS).join(", ");
    if rows.len() > SHOWN_ROWS {
        format!("[{}, ... ({} total)]", shown, rows.len())
    } else {
        format!("[{}]", shown)
    }
}

/// The error type for the whole crate.
#[derive(Debug, Fail)]
pub enum Error {
    /// A worker was handed rows outside of the field.
    #[fail(
        display = "worker {} received rows {}..{} outside of a field {} rows high",
        rank, start, end, height
    )]
    MalformedAssignment {
        /// The rank of the worker that rejected the assignment.
        rank: usize,
        /// First row of the assignment.
        start: usize,
        /// One past the last row of the assignment.
        end: usize,
        /// The height of the field.
        height: usize,
    },

    /// A result named rows outside of the field.
    #[fail(display = "rows {}..{} lie outside of a field {} rows high", start, end, height)]
    OutOfField {
        /// First row named.
        start: usize,
        /// One past the last row named.
        end: usize,
        /// The height of the field.
        height: usize,
    },

    /// A result whose payload does not hold exactly the rows it names.
    #[fail(display = "result payload holds {} cells, expected {}", actual, expected)]
    PayloadSize {
        /// Cells the named rows need.
        expected: usize,
        /// Cells the payload carried.
        actual: usize,
    },

    /// The coordinator tried to write rows that had already been
    /// written this round.
    #[fail(display = "rows written twice in one round: {}", _0)]
    DuplicateWrite(String, Vec<usize>),

    /// The round finished without every row being written.
    #[fail(display = "round ended with rows never written: {}", _0)]
    IncompleteRound(String, Vec<usize>),

    /// A worker thread died before finishing its share.
    #[fail(display = "worker {} failed: {}", rank, reason)]
    WorkerFailed {
        /// The rank of the failed worker.
        rank: usize,
        /// What the thread reported.
        reason: String,
    },

    /// A window with an empty or inverted extent.
    #[fail(display = "invalid window: {}", _0)]
    InvalidWindow(String),

    /// A field with no pixels, or a kernel with no iterations.
    #[fail(display = "invalid geometry: {}", _0)]
    InvalidGeometry(String),

    /// A worker count of zero or one larger than the field.
    #[fail(display = "invalid worker count {} for a field {} rows high", count, height)]
    InvalidWorkerCount {
        /// The requested worker count.
        count: usize,
        /// The height of the field.
        height: usize,
    },

    /// A dynamic chunk size of zero.
    #[fail(display = "chunk size must be at least one row")]
    InvalidChunkSize,

    /// Failure writing a dump or result file.
    #[fail(display = "I/O error: {}", _0)]
    Io(#[fail(cause)] std::io::Error),

    /// Failure serializing a dump or result record.
    #[fail(display = "serialization error: {}", _0)]
    Json(#[fail(cause)] serde_json::Error),
}

impl Error {
    /// Builds a `DuplicateWrite` from the overlapping rows.
    pub fn duplicate_write(rows: Vec<usize>) -> Error {
        Error::DuplicateWrite(show_rows(&rows), rows)
    }

    /// Builds an `IncompleteRound` from the rows still missing.
    pub fn incomplete_round(missing: Vec<usize>) -> Error {
        Error::IncompleteRound(show_rows(&missing), missing)
    }

    /// The rows named by a `DuplicateWrite` or `IncompleteRound`.
    pub fn rows(&self) -> Option<&[usize]> {
        match self {
            Error::DuplicateWrite(_, rows) | Error::IncompleteRound(_, rows) => Some(rows),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_row_lists_are_shown_whole() {
        let e = Error::duplicate_write(vec![3, 4]);
        assert_eq!(e.to_string(), "rows written twice in one round: [3, 4]");
        assert_eq!(e.rows(), Some(&[3usize, 4][..]));
    }

    #[test]
    fn long_row_lists_are_truncated() {
        let e = Error::incomplete_round((0..100).collect());
        let msg = e.to_string();
        assert!(msg.contains("... (100 total)"));
        assert!(msg.starts_with("round ended with rows never written: [0, 1, 2"));
        assert_eq!(e.rows().map(|r| r.len()), Some(100));
    }

    #[test]
    fn configuration_errors_carry_no_rows() {
        assert!(Error::InvalidChunkSize.rows().is_none());
    }
}
