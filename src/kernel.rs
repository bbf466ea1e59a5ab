// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time kernel: how many times can `z ← z² + c` be applied,
//! starting from zero, before `z` leaves the circle of radius two?

use num::Complex;

/// Squared magnitude past which a point is known to diverge.
pub const DIVERGENCE: f64 = 4.0;

/// Returns the number of iterations performed before `c` was seen to
/// diverge, or `max_iterations` if it never did.  Points inside the
/// set return the cap; points far outside return 0 or 1.
#[inline]
pub fn escape_time(c: Complex<f64>, max_iterations: u32) -> u32 {
    let mut z: Complex<f64> = Complex { re: 0.0, im: 0.0 };
    let mut i = 0;
    while i < max_iterations && z.norm_sqr() <= DIVERGENCE {
        z = z * z + c;
        i += 1;
    }
    i
}
