// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the PlaneMapper struct, which describes a relationship
//! between the pixel grid of a field, with an origin at 0,0, and a
//! window onto the complex plane.  Also holds the two small value
//! types that describe a round: the Window being sampled and the
//! Geometry of the field sampling it.
use num::Complex;
use serde::Serialize;

use crate::errors::{Error, Result};

/// Width of the reference field, in pixels.
pub const WIDTH: usize = 2000;
/// Height of the reference field, in pixels.
pub const HEIGHT: usize = 2000;
/// The iteration cap of the reference kernel.  This used to be much
/// higher, but that masks out the variation between 1 and 100, which
/// is where most of the detail lives.
pub const MAX_ITERATIONS: u32 = 100;

/// The rectangular view into the complex plane being sampled.  The
/// real part runs along x, the imaginary part along y.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Window {
    /// Left edge.
    pub x_min: f64,
    /// Right edge.
    pub x_max: f64,
    /// Bottom edge.
    pub y_min: f64,
    /// Top edge.
    pub y_max: f64,
}

impl Window {
    /// Constructor.  Rejects windows whose extent is empty or inverted
    /// on either axis.
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Result<Window> {
        if !(x_min < x_max) {
            return Err(Error::InvalidWindow(format!(
                "x_min {} is not left of x_max {}",
                x_min, x_max
            )));
        }
        if !(y_min < y_max) {
            return Err(Error::InvalidWindow(format!(
                "y_min {} is not below y_max {}",
                y_min, y_max
            )));
        }
        Ok(Window {
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }

    /// The window every zoom sequence starts from.
    pub fn start() -> Window {
        Window {
            x_min: -1.5,
            x_max: 0.5,
            y_min: -1.0,
            y_max: 1.0,
        }
    }

    /// The window every zoom sequence ends on.
    pub fn target() -> Window {
        Window {
            x_min: -0.90,
            x_max: -0.65,
            y_min: -0.40,
            y_max: -0.10,
        }
    }

    /// Shifts every edge by the matching edge of `delta`.  The delta is
    /// not itself a valid window (its "min" may exceed its "max"), so it
    /// is just another `Window` used as four numbers.
    pub fn shifted(&self, delta: &Window) -> Window {
        Window {
            x_min: self.x_min + delta.x_min,
            x_max: self.x_max + delta.x_max,
            y_min: self.y_min + delta.y_min,
            y_max: self.y_max + delta.y_max,
        }
    }
}

impl Default for Window {
    fn default() -> Self {
        Window::start()
    }
}

/// The shape of a field and the cap of the kernel run over it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Geometry {
    /// Columns per row.
    pub width: usize,
    /// Rows per field.
    pub height: usize,
    /// Iteration cap handed to the escape kernel.
    pub max_iterations: u32,
}

impl Geometry {
    /// Constructor.  A field needs at least one pixel and the kernel at
    /// least one iteration.
    pub fn new(width: usize, height: usize, max_iterations: u32) -> Result<Geometry> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidGeometry(format!(
                "a {}x{} field has no pixels",
                width, height
            )));
        }
        if max_iterations == 0 {
            return Err(Error::InvalidGeometry(
                "the iteration cap must be at least one".to_string(),
            ));
        }
        Ok(Geometry {
            width,
            height,
            max_iterations,
        })
    }

    /// The total number of cells in the field.  Used to calculate
    /// memory needs.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Describes that the field is of a size.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry {
            width: WIDTH,
            height: HEIGHT,
            max_iterations: MAX_ITERATIONS,
        }
    }
}

/// Maps pixel coordinates of a field onto the window it samples.
#[derive(Copy, Clone, Debug)]
pub struct PlaneMapper {
    /// The window being sampled.
    pub window: Window,
    /// The pixel grid sampling it.
    pub geometry: Geometry,
    // Complex-plane width and height of a single pixel.
    steps: (f64, f64),
}

impl PlaneMapper {
    /// Constructor.  The pixel steps are worked out once here, in the
    /// same order of operations every policy uses, so that every worker
    /// sees bit-identical plane coordinates for the same pixel.
    pub fn new(window: Window, geometry: Geometry) -> PlaneMapper {
        PlaneMapper {
            window,
            geometry,
            steps: (
                (window.x_max - window.x_min) / (geometry.width as f64),
                (window.y_max - window.y_min) / (geometry.height as f64),
            ),
        }
    }

    /// Translate a pixel column to the real axis.
    #[inline]
    pub fn translate_x(&self, x: usize) -> f64 {
        self.window.x_min + self.steps.0 * (x as f64)
    }

    /// Translate a pixel row to the imaginary axis.
    #[inline]
    pub fn translate_y(&self, y: usize) -> f64 {
        self.window.y_min + self.steps.1 * (y as f64)
    }

    /// Given the column and row of a pixel, return the complex number
    /// at the equivalent location in the window.
    #[inline]
    pub fn pixel_to_point(&self, x: usize, y: usize) -> Complex<f64> {
        Complex::new(self.translate_x(x), self.translate_y(y))
    }

    /// The complex-plane width of one pixel.
    pub fn pixel_width(&self) -> f64 {
        self.steps.0
    }
}
