// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test double for [`Surface`]: records draw calls instead of rasterizing.

use alloc::vec::Vec;
use core::cell::RefCell;
use core::sync::atomic::{AtomicUsize, Ordering};

use kurbo::{Point, Rect};

use crate::surface::{Rgba, Surface};

static STAMPS: AtomicUsize = AtomicUsize::new(0);

/// A recorded drawing operation.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Op {
    Clear,
    Fill(Rect),
    Blit { dest: Point, area: Option<Rect> },
    Line(Point, Point),
    Outline(Rect),
    Clip(Option<Rect>),
}

/// A [`Surface`] that records operations and models per-pixel alpha with
/// a single opaque rectangle.
#[derive(Debug)]
pub(crate) struct TestSurface {
    width: u32,
    height: u32,
    /// Region reporting alpha 255; everywhere else reports 0.
    opaque: Option<Rect>,
    /// Alpha scale applied by `with_alpha` (255 = unscaled).
    scale: u8,
    /// Monotonic creation stamp; derived surfaces get fresh stamps, so
    /// buffer rebuilds are observable by comparing stamps.
    pub(crate) stamp: usize,
    pub(crate) ops: RefCell<Vec<Op>>,
}

impl TestSurface {
    /// Creates a surface reporting alpha 255 everywhere.
    pub(crate) fn opaque(width: u32, height: u32) -> Self {
        let mut s = Self::create(width, height);
        s.opaque = Some(s.bounds());
        s
    }

    /// Marks a region of the surface as opaque for `alpha_at`.
    pub(crate) fn set_opaque_region(&mut self, region: Rect) {
        self.opaque = Some(region);
    }
}

fn next_stamp() -> usize {
    STAMPS.fetch_add(1, Ordering::Relaxed)
}

impl Surface for TestSurface {
    fn create(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            opaque: None,
            scale: 255,
            stamp: next_stamp(),
            ops: RefCell::new(Vec::new()),
        }
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn set_clip(&mut self, clip: Option<Rect>) {
        self.ops.get_mut().push(Op::Clip(clip));
    }

    fn clear(&mut self, _color: Rgba) {
        self.ops.get_mut().push(Op::Clear);
    }

    fn fill(&mut self, _color: Rgba, rect: Rect) {
        self.ops.get_mut().push(Op::Fill(rect));
    }

    fn blit(&mut self, _src: &Self, dest: Point, area: Option<Rect>) {
        self.ops.get_mut().push(Op::Blit { dest, area });
    }

    fn draw_line(&mut self, _color: Rgba, from: Point, to: Point, _width: u32) {
        self.ops.get_mut().push(Op::Line(from, to));
    }

    fn draw_rect(&mut self, _color: Rgba, rect: Rect, _width: u32) {
        self.ops.get_mut().push(Op::Outline(rect));
    }

    fn with_alpha(&self, alpha: u8) -> Self {
        Self {
            width: self.width,
            height: self.height,
            opaque: self.opaque,
            scale: ((u16::from(self.scale) * u16::from(alpha)) / 255) as u8,
            stamp: next_stamp(),
            ops: RefCell::new(Vec::new()),
        }
    }

    fn flipped_h(&self) -> Self {
        let w = f64::from(self.width);
        Self {
            width: self.width,
            height: self.height,
            opaque: self.opaque.map(|r| Rect::new(w - r.x1, r.y0, w - r.x0, r.y1)),
            scale: self.scale,
            stamp: next_stamp(),
            ops: RefCell::new(Vec::new()),
        }
    }

    fn alpha_at(&self, x: f64, y: f64) -> u8 {
        if x < 0.0 || y < 0.0 || x >= f64::from(self.width) || y >= f64::from(self.height) {
            return 0;
        }
        match self.opaque {
            Some(region) if region.contains(Point::new(x, y)) => self.scale,
            _ => 0,
        }
    }
}
