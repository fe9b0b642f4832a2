// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software RGBA raster surface for strata.
//!
//! [`Pixmap`] implements [`strata_core::surface::Surface`] over a plain
//! RGBA8 buffer with straight (non-premultiplied) alpha and source-over
//! compositing. It serves both as the render target for headless and
//! CPU-presented embeddings and as the in-memory representation of
//! decoded images.

mod pixmap;

pub use pixmap::Pixmap;

#[cfg(test)]
mod stage_tests;
