// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Diamond projection between grid cells and screen coordinates.

use kurbo::Point;

/// The isometric grid: origin, cell diagonals, and a global scale
/// multiplier applied to every derived coordinate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IsoGrid {
    /// Screen position of the grid origin (before scaling).
    pub origin: Point,
    /// Length of a cell's horizontal diagonal.
    pub cell_width: f64,
    /// Length of a cell's vertical diagonal.
    pub cell_height: f64,
    /// Scale applied to origin, cell size, and item data alike.
    pub multiplier: f64,
}

impl Default for IsoGrid {
    fn default() -> Self {
        Self {
            origin: Point::new(300.0, 200.0),
            cell_width: 80.0,
            cell_height: 40.0,
            multiplier: 1.0,
        }
    }
}

impl IsoGrid {
    /// Screen coordinates of the center of a cell.
    #[must_use]
    pub fn xy_of(&self, row: f64, col: f64) -> Point {
        let x = self.origin.x * self.multiplier
            + (self.cell_width / 2.0) * self.multiplier * (col - row);
        let y = self.origin.y * self.multiplier
            + (self.cell_height / 2.0) * self.multiplier * (row + col + 1.0);
        Point::new(x, y)
    }

    /// The cell containing a screen point.
    #[must_use]
    pub fn rowcol_at(&self, x: f64, y: f64) -> (i64, i64) {
        let x = x - self.origin.x * self.multiplier;
        let y = y - self.origin.y * self.multiplier;

        let slope = -self.cell_height / self.cell_width;
        let t1 = y / (2.0 * slope);
        let t2 = x / 2.0;
        let t3 = (self.cell_width * self.multiplier) / 2.0;

        let row = ((-t1 - t2) / t3).floor();
        let col = ((-t1 + t2) / t3).floor();
        #[expect(
            clippy::cast_possible_truncation,
            reason = "floored cell indices fit in i64 for any on-screen point"
        )]
        let cell = (row as i64, col as i64);
        cell
    }

    /// Top-left screen position for an item whose image center (for the
    /// topmost cell) is `center`, placed at `(row, col)`.
    #[must_use]
    pub(crate) fn screen_pos(&self, row: f64, col: f64, center: Point) -> Point {
        let left = (self.origin.x + (col - row) * self.cell_width / 2.0 - center.x)
            * self.multiplier;
        let top = (self.origin.y + (col + row) * self.cell_height / 2.0 - center.y
            + self.cell_height / 2.0)
            * self.multiplier;
        Point::new(left, top)
    }
}
