// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The Field: one iteration count per pixel, row-major, owned by the
//! coordinator for exactly one round.  Every row is written exactly
//! once; the field remembers which rows it has seen so that overlaps
//! and gaps in a partition are caught rather than summed.

use crate::errors::{Error, Result};
use crate::partition::RowSet;
use crate::planes::Geometry;

/// The value every cell holds until its row is written.
pub const UNWRITTEN: u32 = u32::max_value();

/// A `height × width` grid of iteration counts.
#[derive(Debug, Clone)]
pub struct Field {
    width: usize,
    height: usize,
    cells: Vec<u32>,
    written: Vec<bool>,
    rows_written: usize,
}

impl Field {
    /// An empty field, every cell `UNWRITTEN`.
    pub fn new(geometry: Geometry) -> Field {
        Field {
            width: geometry.width,
            height: geometry.height,
            cells: vec![UNWRITTEN; geometry.len()],
            written: vec![false; geometry.height],
            rows_written: 0,
        }
    }

    /// Columns per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows in the field.
    pub fn height(&self) -> usize {
        self.height
    }

    /// One row of the field.
    pub fn row(&self, row: usize) -> &[u32] {
        &self.cells[row * self.width..(row + 1) * self.width]
    }

    /// Iterates over the rows of the field, top to bottom.
    pub fn rows(&self) -> std::slice::Chunks<u32> {
        self.cells.chunks(self.width)
    }

    /// The raw, row-major cells.
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    /// Writes a compact buffer of rows into the positions named by
    /// `rows`, in order.  The whole write is refused if any of the rows
    /// lies outside the field or has already been written this round.
    pub fn write_rows(&mut self, rows: &RowSet, payload: &[u32]) -> Result<()> {
        let (start, end) = rows.bounds();
        if end > self.height {
            return Err(Error::OutOfField {
                start,
                end,
                height: self.height,
            });
        }

        let expected = rows.len() * self.width;
        if payload.len() != expected {
            return Err(Error::PayloadSize {
                expected,
                actual: payload.len(),
            });
        }

        let duplicates: Vec<usize> = rows.iter().filter(|r| self.written[*r]).collect();
        if !duplicates.is_empty() {
            return Err(Error::duplicate_write(duplicates));
        }

        for (row, src) in rows.iter().zip(payload.chunks(self.width)) {
            let offset = row * self.width;
            self.cells[offset..offset + self.width].copy_from_slice(src);
            self.written[row] = true;
            self.rows_written += 1;
        }
        Ok(())
    }

    /// True once every row has been written.
    pub fn is_complete(&self) -> bool {
        self.rows_written == self.height
    }

    /// The rows not yet written, in order.
    pub fn missing_rows(&self) -> Vec<usize> {
        self.written
            .iter()
            .enumerate()
            .filter(|(_, w)| !**w)
            .map(|(r, _)| r)
            .collect()
    }

    /// Fails with the list of missing rows unless the field is complete.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(Error::incomplete_round(self.missing_rows()))
        }
    }

    /// Sum of every iteration count in the field.  Only meaningful once
    /// the field is complete.
    pub fn checksum(&self) -> u64 {
        self.cells.iter().map(|&c| u64::from(c)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> Field {
        Field::new(Geometry::new(3, 4, 10).unwrap())
    }

    #[test]
    fn new_fields_are_unwritten() {
        let f = field();
        assert_eq!((f.width(), f.height()), (3, 4));
        assert!(f.cells().iter().all(|&c| c == UNWRITTEN));
        assert_eq!(f.missing_rows(), vec![0, 1, 2, 3]);
        assert!(!f.is_complete());
    }

    #[test]
    fn strided_rows_land_in_place() {
        let mut f = field();
        f.write_rows(&RowSet::strided(1, 2, 2), &[1, 1, 1, 3, 3, 3])
            .unwrap();
        assert_eq!(f.row(1), &[1, 1, 1]);
        assert_eq!(f.row(3), &[3, 3, 3]);
        assert_eq!(f.row(0), &[UNWRITTEN; 3]);
        assert_eq!(f.missing_rows(), vec![0, 2]);
    }

    #[test]
    fn complete_field_sums_every_cell() {
        let mut f = field();
        f.write_rows(&RowSet::span(0, 2), &[1, 2, 3, 4, 5, 6]).unwrap();
        f.write_rows(&RowSet::span(2, 2), &[0, 0, 0, 10, 10, 10])
            .unwrap();
        assert!(f.is_complete());
        assert!(f.ensure_complete().is_ok());
        assert_eq!(f.checksum(), 51);
        assert_eq!(f.rows().count(), 4);
    }

    #[test]
    fn second_write_is_refused_with_the_overlap() {
        let mut f = field();
        f.write_rows(&RowSet::span(0, 2), &[0; 6]).unwrap();
        match f.write_rows(&RowSet::span(1, 2), &[7; 6]) {
            Err(e) => assert_eq!(e.rows(), Some(&[1usize][..])),
            Ok(_) => panic!("overlapping write accepted"),
        }
        // The refused write left row 2 untouched.
        assert_eq!(f.row(2), &[UNWRITTEN; 3]);
        assert_eq!(f.row(1), &[0; 3]);
    }

    #[test]
    fn incomplete_field_reports_missing_rows() {
        let mut f = field();
        f.write_rows(&RowSet::span(1, 1), &[0; 3]).unwrap();
        match f.ensure_complete() {
            Err(e) => assert_eq!(e.rows(), Some(&[0usize, 2, 3][..])),
            Ok(_) => panic!("incomplete field accepted"),
        }
    }

    #[test]
    fn rows_past_the_bottom_are_refused() {
        let mut f = field();
        match f.write_rows(&RowSet::span(3, 2), &[0; 6]) {
            Err(Error::OutOfField { start, end, .. }) => assert_eq!((start, end), (3, 5)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn short_payloads_are_refused() {
        let mut f = field();
        match f.write_rows(&RowSet::span(0, 2), &[0; 5]) {
            Err(Error::PayloadSize { expected, actual }) => assert_eq!((expected, actual), (6, 5)),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(f.missing_rows().len(), 4);
    }

    #[test]
    fn zero_stride_rows_are_checked_as_they_are_walked() {
        let mut f = field();
        match f.write_rows(&RowSet::strided(0, 0, 5), &[0; 15]) {
            Err(Error::OutOfField { start, end, height }) => {
                assert_eq!((start, end, height), (0, 5, 4))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(f.missing_rows().len(), 4);
    }

    #[test]
    fn rows_at_the_end_of_the_address_space_are_refused() {
        let mut f = field();
        let max = usize::max_value();
        match f.write_rows(&RowSet::span(max, 1), &[0; 3]) {
            Err(Error::OutOfField { start, end, .. }) => assert_eq!((start, end), (max, max)),
            other => panic!("unexpected {:?}", other),
        }
    }
}
