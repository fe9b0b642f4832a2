// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Each layer owns a [`DirtyTracker`](understory_dirty::DirtyTracker)
//! keyed by item slot index. Item mutators mark the appropriate channel;
//! [`Scene::update_layer`](crate::scene::Scene::update_layer) drains both
//! channels once per frame and turns the marked items into dirty
//! rectangles.
//!
//! # Propagation semantics
//!
//! - **[`BOUNDS`]** — Geometry or visibility changed; the repaint
//!   rectangle is the union of the item's previous and next bounds.
//!   Marked with [`EagerPolicy`](understory_dirty::EagerPolicy): an item
//!   with an attached rollover overlay has a dependency edge from the
//!   overlay to the host, so moving the host marks the overlay in the
//!   same pass.
//!
//! - **[`CONTENT`]** — Pixels changed inside the current bounds (image
//!   swap, alpha, text). Local-only; no propagation.

use understory_dirty::Channel;

/// Position, size, or visibility changed — the previous and next bounds
/// both need repainting. Propagates to attached overlay items.
pub const BOUNDS: Channel = Channel::new(0);

/// Content changed within the current bounds — repaint in place.
pub const CONTENT: Channel = Channel::new(1);
