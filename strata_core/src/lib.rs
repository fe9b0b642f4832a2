// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained-mode 2D scene graph with dirty-rect compositing, routed
//! input, cooperative timers, and isometric depth ordering.
//!
//! `strata_core` keeps a hierarchy of drawable/hit-testable items inside
//! ordered layers and repaints only what changed each frame. It is
//! `no_std` compatible (with `alloc`), single-threaded, and driven
//! entirely by the embedding: input events go in through
//! [`Stage::dispatch`](stage::Stage::dispatch), time comes in through
//! [`Stage::render`](stage::Stage::render), and the dirty rectangles for
//! the platform's present call come back out.
//!
//! # Architecture
//!
//! ```text
//!   InputEvent ──► Stage::dispatch ──► hit test ──► routed ItemEvents
//!                                                        │
//!   Instant ────► Stage::render ─┬─► timers              ▼
//!                                ├─► Scene::update_layer (drain dirty)
//!                                ├─► background / layers / overlays
//!                                └─► Vec<Rect> ──► external present
//! ```
//!
//! **[`scene`]** — Slot-arena storage for items and layers with
//! generational handles. Idempotent mutators mark per-layer dirty
//! channels; `update_layer` drains them into an intersection-free damage
//! list and `draw_layer` repaints it.
//!
//! **[`stage`]** — Composes layers: the frame loop, the keyed timer
//! scheduler with two catch-up policies, the modal-dialog stack, focus,
//! pointer-over tracking, pointer capture, the UI lock, the pre-render
//! buffer, and the cursor/loading overlay layers.
//!
//! **[`iso`]** — The isometric extension: diamond grid projection, the
//! validated definition catalog, and the depth-order comparator with
//! batched re-sorting.
//!
//! **[`surface`]** — The [`Surface`](surface::Surface) paint-target
//! trait backends implement, plus the [`Canvas`](surface::Canvas)
//! drawing handle for custom-draw items.
//!
//! **[`event`]** — Item events, handler types, and the raw input event
//! vocabulary.
//!
//! **[`dirty`]** / **[`damage`]** — Dirty channels and rectangle
//! folding/compaction.
//!
//! **[`time`]** — Millisecond [`Instant`](time::Instant)/
//! [`Duration`](time::Duration); the engine never reads a clock.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) and the zero-overhead
//! [`Tracer`](trace::Tracer) wrapper for frame-loop instrumentation.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod damage;
pub mod dirty;
pub mod event;
pub mod iso;
pub mod scene;
pub mod stage;
pub mod surface;
pub mod time;
pub mod trace;

#[cfg(test)]
pub(crate) mod testutil;
