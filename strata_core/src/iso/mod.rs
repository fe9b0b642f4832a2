// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Isometric projection and depth ordering.
//!
//! Cell items live on a diamond-projected grid ([`IsoGrid`]) and are
//! painted depth-correctly inside their layer: an item strictly behind
//! another paints first, overlapping items order by an explicit z key (a
//! band from the closed tag registry plus a place-holder fraction), and
//! multi-row items cut the comparison for single-row items straddling
//! their row span.
//!
//! Item types are declared in an [`IsoCatalog`] of definitions and
//! images, validated against the tag registry when installed on the
//! stage via [`Stage::configure_iso`](crate::stage::Stage::configure_iso).
//!
//! Re-sorting is batched per frame: one moved item relocates with an
//! in-order insertion search; more than one move on a layer (or any
//! multi-row change) coalesces into a single full re-sort, applied
//! before the next hit test or render.

mod cell;
mod def;
mod grid;
mod order;

pub use def::{IsoCatalog, IsoDefState, IsoDefinition, IsoError, IsoPlaceHolder, IsoState};
pub use grid::IsoGrid;

use alloc::string::String;
use alloc::vec::Vec;

use crate::surface::Surface;

/// The isometric state of a stage: grid, catalog, tag registry, and the
/// queued re-sorts.
pub(crate) struct IsoContext<S: Surface> {
    pub(crate) grid: IsoGrid,
    pub(crate) catalog: IsoCatalog<S>,
    pub(crate) tags: Vec<String>,
    pub(crate) pending: Vec<order::PendingSort>,
}
