// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! What travels between the coordinator and its workers.  Workers and
//! coordinator share no memory: a worker's rows are computed into its
//! own buffer and moved into a `RowResult`.

use crate::errors::Error;
use crate::partition::RowSet;

/// A worker's identity within a round.  Rank 0 is always the coordinator.
pub type Rank = usize;

/// Coordinator to worker, dynamic policy only.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// Compute these rows and send them back.
    Rows(RowSet),
    /// No work remains; leave the loop.
    Stop,
}

/// A block of computed rows, tagged with who computed them and where
/// they belong.  `payload` holds `rows.len()` rows back to back.
#[derive(Debug, Clone)]
pub struct RowResult {
    /// The worker that computed the rows.
    pub owner: Rank,
    /// Where the rows go in the field.
    pub rows: RowSet,
    /// The iteration counts, row-major, exactly `rows.len() * width` long.
    pub payload: Vec<u32>,
}

/// Worker to coordinator.
#[derive(Debug)]
pub enum Report {
    /// A finished piece of work.
    Done(RowResult),
    /// The worker could not carry out its assignment and has stopped.
    Failed {
        /// Who failed.
        rank: Rank,
        /// Why.
        error: Error,
    },
}
