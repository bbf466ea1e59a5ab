#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Escape-time road map
//!
//! Samples a window of the complex plane at a fixed resolution, and
//! for every pixel records how many iterations of `z ← z² + c` it
//! takes before `z` escapes.  The window is then zoomed towards a
//! target in a fixed number of steps, and the whole field recomputed
//! at each step.
//!
//! The interesting part is not the kernel but who computes which
//! rows.  A coordinator (rank 0) and a group of workers exchange
//! nothing but messages, and the rows are shared out under one of
//! three policies: contiguous blocks, round-robin rows, or chunks
//! handed out on demand.  Whatever the policy and however many
//! workers, the sum of every cell in the field (the checksum) must come
//! out exactly the same as a plain sequential pass over the same
//! window.

extern crate crossbeam;
extern crate failure;
extern crate itertools;
extern crate num;
extern crate serde;
extern crate serde_json;

macro_rules! t {
    ($condition: expr, $_true: expr, $_false: expr) => {
        if $condition {
            $_true
        } else {
            $_false
        }
    };
}

pub mod coordinator;
pub mod dump;
pub mod errors;
pub mod field;
pub mod kernel;
pub mod message;
pub mod partition;
pub mod planes;
pub mod summary;
pub mod worker;
pub mod zoom;

pub use coordinator::{Coordinator, Round, RoundStats};
pub use dump::{Discard, DumpSink, RoundSink};
pub use errors::{Error, Result};
pub use field::Field;
pub use partition::{Policy, RowSet};
pub use planes::{Geometry, PlaneMapper, Window};
pub use summary::Summary;
pub use zoom::{ZoomDriver, ZoomReport};
