// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint-target contract for backends.
//!
//! Strata splits platform-specific work into *backend* crates. The core
//! composites through the [`Surface`] trait and never touches pixels
//! itself. A backend provides:
//!
//! - **Surface** — Implements [`Surface`] over its pixel storage (e.g.
//!   `strata_raster::Pixmap` over an RGBA8 buffer). The engine creates
//!   off-screen surfaces of the same type for layer-alpha and pre-render
//!   buffers, so images and buffers share one representation.
//!
//! - **Presentation** — The embedding calls
//!   [`Stage::render`](crate::stage::Stage::render) with its surface and
//!   hands the returned dirty rectangles to whatever present/flip
//!   mechanism the platform has. Presentation is not abstracted here.
//!
//! - **Assets** — Image decoding happens outside the engine; decoded
//!   images enter as shared surfaces (`Rc<S>`).
//!
//! [`Canvas`] wraps a surface with a coordinate offset and an optional
//! clip. It is the drawing handle given to custom-draw items, and the
//! engine uses the offset form when rendering a layer into an off-screen
//! buffer anchored at the layer's bounds origin.

use kurbo::{Point, Rect};

/// An RGBA color with 8 bits per channel.
///
/// `a == 255` is fully opaque.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba {
    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    /// Fully transparent.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Creates a color from channel values.
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque color.
    #[inline]
    #[must_use]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }
}

/// A 2D paint target.
///
/// All coordinates are in surface pixels as `f64` (backends round as they
/// see fit). Drawing is clipped to the current clip rectangle when one is
/// set. `blit` composites source-over.
pub trait Surface: Sized {
    /// Creates a new, fully transparent surface.
    fn create(width: u32, height: u32) -> Self;

    /// Width in pixels.
    fn width(&self) -> u32;

    /// Height in pixels.
    fn height(&self) -> u32;

    /// Sets the clip rectangle. `None` removes clipping.
    fn set_clip(&mut self, clip: Option<Rect>);

    /// Fills the whole surface with `color`, replacing existing pixels.
    fn clear(&mut self, color: Rgba);

    /// Fills `rect` with `color` (source-over when `color.a < 255`).
    fn fill(&mut self, color: Rgba, rect: Rect);

    /// Composites `src` (or the `area` portion of it) at `dest`.
    fn blit(&mut self, src: &Self, dest: Point, area: Option<Rect>);

    /// Draws a line of the given width.
    fn draw_line(&mut self, color: Rgba, from: Point, to: Point, width: u32);

    /// Draws a rectangle outline of the given border width.
    fn draw_rect(&mut self, color: Rgba, rect: Rect, width: u32);

    /// Returns a copy of this surface with every pixel's alpha scaled by
    /// `alpha / 255`.
    fn with_alpha(&self, alpha: u8) -> Self;

    /// Returns a horizontally mirrored copy of this surface.
    fn flipped_h(&self) -> Self;

    /// Returns the alpha of the pixel at `(x, y)`, or 0 outside the
    /// surface.
    fn alpha_at(&self, x: f64, y: f64) -> u8;

    /// The full surface rectangle.
    #[inline]
    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width()), f64::from(self.height()))
    }
}

/// A drawing handle over a surface with a coordinate offset and clip.
///
/// Custom-draw items receive a `Canvas` positioned so that stage
/// coordinates draw in the right place regardless of whether the target
/// is the screen surface or a layer's off-screen buffer.
pub struct Canvas<'a, S: Surface> {
    surface: &'a mut S,
    dx: f64,
    dy: f64,
}

impl<S: Surface> core::fmt::Debug for Canvas<'_, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Canvas")
            .field("dx", &self.dx)
            .field("dy", &self.dy)
            .finish_non_exhaustive()
    }
}

impl<'a, S: Surface> Canvas<'a, S> {
    /// Wraps a surface with a drawing offset added to every coordinate.
    #[must_use]
    pub fn new(surface: &'a mut S, dx: f64, dy: f64) -> Self {
        Self { surface, dx, dy }
    }

    /// The offset added to every coordinate.
    #[must_use]
    pub fn offset(&self) -> (f64, f64) {
        (self.dx, self.dy)
    }

    /// Composites a shared surface at `pos` (stage coordinates).
    pub fn blit(&mut self, src: &S, pos: Point, area: Option<Rect>) {
        self.surface
            .blit(src, Point::new(pos.x + self.dx, pos.y + self.dy), area);
    }

    /// Fills `rect` (stage coordinates) with `color`.
    pub fn fill(&mut self, color: Rgba, rect: Rect) {
        self.surface
            .fill(color, rect + kurbo::Vec2::new(self.dx, self.dy));
    }

    /// Draws a line between stage-coordinate points.
    pub fn draw_line(&mut self, color: Rgba, from: Point, to: Point, width: u32) {
        self.surface.draw_line(
            color,
            Point::new(from.x + self.dx, from.y + self.dy),
            Point::new(to.x + self.dx, to.y + self.dy),
            width,
        );
    }

    /// Draws a rectangle outline at stage coordinates.
    pub fn draw_rect(&mut self, color: Rgba, rect: Rect, width: u32) {
        self.surface
            .draw_rect(color, rect + kurbo::Vec2::new(self.dx, self.dy), width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Op, TestSurface};

    #[test]
    fn canvas_offsets_every_operation() {
        let mut s = TestSurface::create(100, 100);
        let mut canvas = Canvas::new(&mut s, 10.0, 20.0);
        canvas.fill(Rgba::WHITE, Rect::new(0.0, 0.0, 5.0, 5.0));
        canvas.draw_line(Rgba::WHITE, Point::new(0.0, 0.0), Point::new(1.0, 0.0), 1);

        let ops = s.ops.borrow();
        assert_eq!(ops[0], Op::Fill(Rect::new(10.0, 20.0, 15.0, 25.0)));
        assert_eq!(
            ops[1],
            Op::Line(Point::new(10.0, 20.0), Point::new(11.0, 20.0))
        );
    }

    #[test]
    fn default_bounds_covers_surface() {
        let s = TestSurface::create(64, 32);
        assert_eq!(s.bounds(), Rect::new(0.0, 0.0, 64.0, 32.0));
    }
}
