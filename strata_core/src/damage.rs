// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-rectangle folding and compaction.
//!
//! The per-frame damage list must stay free of overlapping entries:
//! a half-transparent item repainted under two overlapping rectangles
//! would be composited twice. [`fold_rect`] unions the incoming
//! rectangle with every rectangle it intersects (repeatedly, since the
//! grown union can reach further entries) before appending.
//!
//! [`compact`] bounds list growth for partial-redraw costs: while the
//! list is longer than the budget, two entries are unioned and the
//! result folded back in.

use alloc::vec::Vec;

use kurbo::Rect;

/// Returns whether `r` has a non-empty area.
#[inline]
#[must_use]
pub fn is_occupied(r: Rect) -> bool {
    r.width() > 0.0 && r.height() > 0.0
}

/// Returns whether two rectangles overlap with non-empty area.
#[inline]
#[must_use]
pub fn overlaps(a: Rect, b: Rect) -> bool {
    is_occupied(a.intersect(b))
}

/// Folds `rect` into `rects`, unioning away every entry it intersects.
///
/// Empty rectangles are dropped. After the call no entry of `rects`
/// intersects any other entry that `rect` touched.
pub fn fold_rect(rects: &mut Vec<Rect>, rect: Rect) {
    if !is_occupied(rect) {
        return;
    }
    let mut merged = rect;
    loop {
        let Some(k) = rects.iter().position(|r| overlaps(merged, *r)) else {
            break;
        };
        merged = merged.union(rects.swap_remove(k));
    }
    rects.push(merged);
}

/// Compacts `rects` until it holds at most `budget` entries.
pub fn compact(rects: &mut Vec<Rect>, budget: usize) {
    while rects.len() > budget {
        let a = rects.swap_remove(0);
        let b = rects.swap_remove(0);
        fold_rect(rects, a.union(b));
    }
}
