// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Depth ordering of cell items and batched re-sorting.
//!
//! Paint order within an iso-managed layer must put an item strictly
//! behind another (smaller row+col footprint, no cell overlap) first.
//! Overlapping items fall back to the explicit z key: the tag band in
//! the integer part, broken by the place-holder fraction.
//!
//! Position changes are batched: the first moved item on a layer queues
//! an in-order relocation; a second moved item on the same layer (or any
//! multi-row change) upgrades the entry to a single full re-sort, since
//! the relocation search is linear per item.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::scene::{INVALID, Scene};
use crate::scene::MultiRowEntry;
use crate::surface::Surface;

/// A queued re-sort: a layer slot and the moved item, or `None` for a
/// full re-sort of that layer.
pub(crate) type PendingSort = (u32, Option<u32>);

/// Queues a re-sort, coalescing with existing marks for the layer.
pub(crate) fn mark_moved(pending: &mut Vec<PendingSort>, layer: u32, item: Option<u32>) {
    match item {
        None => {
            let mut add = true;
            pending.retain(|&(l, i)| {
                if l == layer {
                    if i.is_none() {
                        add = false;
                        true
                    } else {
                        // Absorbed by the full re-sort.
                        false
                    }
                } else {
                    true
                }
            });
            if add {
                pending.push((layer, None));
            }
        }
        Some(item) => {
            for k in 0..pending.len() {
                let (l, existing) = pending[k];
                if l != layer {
                    continue;
                }
                match existing {
                    None => return,
                    Some(e) if e == item => return,
                    Some(_) => {
                        // A second moved item on the same layer: one full
                        // re-sort beats repeated relocation searches.
                        pending.remove(k);
                        pending.push((layer, None));
                        return;
                    }
                }
            }
            pending.push((layer, Some(item)));
        }
    }
}

/// Applies every queued re-sort.
pub(crate) fn resolve<S: Surface>(scene: &mut Scene<S>, pending: &mut Vec<PendingSort>) {
    for (layer, item) in core::mem::take(pending) {
        if layer >= scene.layer_len {
            continue;
        }
        let l = layer as usize;
        let mut items = core::mem::take(&mut scene.layer_items[l]);
        let prev_index: BTreeMap<u32, usize> =
            items.iter().enumerate().map(|(i, &idx)| (idx, i)).collect();
        let multi_row = scene.layer_multi_row[l].clone();

        match item {
            Some(moved) if scene.owner.get(moved as usize) == Some(&layer) => {
                if let Some(pos) = items.iter().position(|&idx| idx == moved) {
                    items.remove(pos);
                    insert_in_order(scene, &multi_row, &prev_index, &mut items, moved);
                }
            }
            Some(_) => {}
            None => {
                items.sort_by(|&a, &b| compare(scene, &multi_row, &prev_index, a, b));
            }
        }
        scene.layer_items[l] = items;
    }
}

/// Inserts `moved` before the first cell item it must paint before.
fn insert_in_order<S: Surface>(
    scene: &Scene<S>,
    multi_row: &[MultiRowEntry],
    prev_index: &BTreeMap<u32, usize>,
    items: &mut Vec<u32>,
    moved: u32,
) {
    for k in 0..items.len() {
        if cell_key(scene, items[k]).is_some()
            && compare(scene, multi_row, prev_index, moved, items[k]) == Ordering::Less
        {
            items.insert(k, moved);
            return;
        }
    }
    items.push(moved);
}

/// The ordering facts of a cell item: row, col, rows, cols, z.
fn cell_key<S: Surface>(scene: &Scene<S>, idx: u32) -> Option<(f64, f64, f64, f64, f64)> {
    scene.cell_sort_key(idx)
}

/// Decides whether `a` paints before `b`.
///
/// Non-cell items keep their previous relative order and paint before
/// any cell item. For two cell items: a multi-row item whose row span
/// contains both rows cuts the comparison by its column extent;
/// otherwise disjoint footprints order by row, then column, and
/// overlapping footprints order by z key.
pub(crate) fn compare<S: Surface>(
    scene: &Scene<S>,
    multi_row: &[MultiRowEntry],
    prev_index: &BTreeMap<u32, usize>,
    a: u32,
    b: u32,
) -> Ordering {
    let ka = cell_key(scene, a);
    let kb = cell_key(scene, b);
    let ((row_a, col_a, rows_a, cols_a, z_a), (row_b, col_b, rows_b, cols_b, z_b)) = match (ka, kb)
    {
        (None, None) => {
            let ia = prev_index.get(&a).copied().unwrap_or(usize::MAX);
            let ib = prev_index.get(&b).copied().unwrap_or(usize::MAX);
            return ia.cmp(&ib);
        }
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(ka), Some(kb)) => (ka, kb),
    };

    // A multi-row item bridging both rows forces the side split by its
    // column extent. Only the first bridging entry decides; behavior
    // with several overlapping multi-row items in one band is out of
    // contract.
    for entry in multi_row {
        if entry.row_from <= row_a
            && row_a <= entry.row_to
            && entry.row_from <= row_b
            && row_b <= entry.row_to
        {
            if col_a < entry.col_from && col_b >= entry.col_from {
                return Ordering::Less;
            }
            if col_b < entry.col_from && col_a >= entry.col_from {
                return Ordering::Greater;
            }
        }
    }

    if row_a + rows_a - 1.0 < row_b {
        return Ordering::Less;
    }
    if row_a > row_b + rows_b - 1.0 {
        return Ordering::Greater;
    }
    if col_a + cols_a - 1.0 < col_b {
        return Ordering::Less;
    }
    if col_a > col_b + cols_b - 1.0 {
        return Ordering::Greater;
    }

    // Overlapping footprints: the explicit key guarantees a total order
    // even for coincident bands.
    z_a.partial_cmp(&z_b).unwrap_or(Ordering::Equal)
}

/// Whether two footprints share at least one cell.
pub(crate) fn footprints_overlap(
    (row_a, col_a): (f64, f64),
    (rows_a, cols_a): (f64, f64),
    (row_b, col_b): (f64, f64),
    (rows_b, cols_b): (f64, f64),
) -> bool {
    row_b + rows_b - 1.0 >= row_a
        && row_b <= row_a + rows_a - 1.0
        && col_b + cols_b - 1.0 >= col_a
        && col_b <= col_a + cols_a - 1.0
}

/// Keeps a layer's multi-row list in sync for one item.
pub(crate) fn update_multi_row<S: Surface>(
    scene: &mut Scene<S>,
    layer: u32,
    item: u32,
    row: f64,
    rows: u32,
    col: f64,
) {
    if layer == INVALID {
        return;
    }
    let entry = MultiRowEntry {
        item,
        row_from: row,
        row_to: row + f64::from(rows) - 1.0,
        col_from: col,
    };
    let list = &mut scene.layer_multi_row[layer as usize];
    match list.iter_mut().find(|e| e.item == item) {
        Some(existing) => *existing = entry,
        None => list.push(entry),
    }
}
