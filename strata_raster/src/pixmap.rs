// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The RGBA8 pixel buffer and its raster operations.

use kurbo::{Point, Rect};

use strata_core::surface::{Rgba, Surface};

/// An RGBA8 surface with straight alpha.
///
/// Drawing composites source-over and respects the current clip
/// rectangle. Coordinates are `f64` (matching the scene graph) and are
/// floored to pixels here.
#[derive(Clone, Debug, PartialEq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    /// Row-major RGBA bytes, `width * height * 4` long.
    data: Vec<u8>,
    clip: Option<Rect>,
}

impl Pixmap {
    /// Creates a surface filled with one color.
    #[must_use]
    pub fn solid(width: u32, height: u32, color: Rgba) -> Self {
        let mut pixmap = Self::create(width, height);
        pixmap.clear(color);
        pixmap
    }

    /// Wraps decoded RGBA bytes (row-major, 4 bytes per pixel).
    ///
    /// # Panics
    ///
    /// Panics if `data` is not exactly `width * height * 4` bytes.
    #[must_use]
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * 4,
            "pixel buffer size must match dimensions"
        );
        Self {
            width,
            height,
            data,
            clip: None,
        }
    }

    /// The raw RGBA bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Reads a pixel; out-of-bounds reads are transparent black.
    #[must_use]
    pub fn pixel(&self, x: i64, y: i64) -> Rgba {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return Rgba::TRANSPARENT;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Rgba::new(self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3])
    }

    fn put(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return;
        }
        if let Some(clip) = self.clip
            && !clip.contains(Point::new(x as f64 + 0.5, y as f64 + 0.5))
        {
            return;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let dst = Rgba::new(self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]);
        let out = source_over(color, dst);
        self.data[i] = out.r;
        self.data[i + 1] = out.g;
        self.data[i + 2] = out.b;
        self.data[i + 3] = out.a;
    }

    /// The integer pixel span of `rect` clipped to the surface and the
    /// current clip rectangle.
    fn span(&self, rect: Rect) -> Option<(i64, i64, i64, i64)> {
        let mut r = rect.intersect(self.bounds());
        if let Some(clip) = self.clip {
            r = r.intersect(clip);
        }
        if r.width() <= 0.0 || r.height() <= 0.0 {
            return None;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "clipped to surface bounds, well within i64"
        )]
        let span = (
            r.x0.floor() as i64,
            r.y0.floor() as i64,
            r.x1.ceil() as i64,
            r.y1.ceil() as i64,
        );
        Some(span)
    }
}

/// Straight-alpha source-over compositing of one pixel.
#[expect(
    clippy::cast_possible_truncation,
    reason = "channel math is clamped to 255 before narrowing"
)]
fn source_over(src: Rgba, dst: Rgba) -> Rgba {
    if src.a == 255 {
        return src;
    }
    if src.a == 0 {
        return dst;
    }
    let sa = u32::from(src.a);
    let da = u32::from(dst.a);
    // Contribution of the destination after the source covers it.
    let db = da * (255 - sa) / 255;
    let oa = sa + db;
    if oa == 0 {
        return Rgba::TRANSPARENT;
    }
    let blend = |s: u8, d: u8| -> u8 {
        let v = (u32::from(s) * sa + u32::from(d) * db) / oa;
        v.min(255) as u8
    };
    Rgba::new(
        blend(src.r, dst.r),
        blend(src.g, dst.g),
        blend(src.b, dst.b),
        oa.min(255) as u8,
    )
}

impl Surface for Pixmap {
    fn create(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize) * 4],
            clip: None,
        }
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn set_clip(&mut self, clip: Option<Rect>) {
        self.clip = clip;
    }

    fn clear(&mut self, color: Rgba) {
        for chunk in self.data.chunks_exact_mut(4) {
            chunk[0] = color.r;
            chunk[1] = color.g;
            chunk[2] = color.b;
            chunk[3] = color.a;
        }
    }

    fn fill(&mut self, color: Rgba, rect: Rect) {
        let Some((x0, y0, x1, y1)) = self.span(rect) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                self.put_unclipped_checked(x, y, color);
            }
        }
    }

    fn blit(&mut self, src: &Self, dest: Point, area: Option<Rect>) {
        let area = area.unwrap_or_else(|| src.bounds());
        let area = area.intersect(src.bounds());
        if area.width() <= 0.0 || area.height() <= 0.0 {
            return;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "areas are clipped to surface bounds"
        )]
        let (ax0, ay0, ax1, ay1) = (
            area.x0.floor() as i64,
            area.y0.floor() as i64,
            area.x1.ceil() as i64,
            area.y1.ceil() as i64,
        );
        #[expect(
            clippy::cast_possible_truncation,
            reason = "destinations are scene coordinates, well within i64"
        )]
        let (dx, dy) = (dest.x.floor() as i64, dest.y.floor() as i64);
        for sy in ay0..ay1 {
            for sx in ax0..ax1 {
                let color = src.pixel(sx, sy);
                if color.a == 0 {
                    continue;
                }
                self.put(dx + (sx - ax0), dy + (sy - ay0), color);
            }
        }
    }

    fn draw_line(&mut self, color: Rgba, from: Point, to: Point, width: u32) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "line endpoints are scene coordinates, well within i64"
        )]
        let (mut x0, mut y0, x1, y1) = (
            from.x.floor() as i64,
            from.y.floor() as i64,
            to.x.floor() as i64,
            to.y.floor() as i64,
        );
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let spread = i64::from(width.max(1)) - 1;
        loop {
            for ox in 0..=spread {
                for oy in 0..=spread {
                    self.put(x0 + ox, y0 + oy, color);
                }
            }
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn draw_rect(&mut self, color: Rgba, rect: Rect, width: u32) {
        let w = f64::from(width.max(1));
        self.fill(color, Rect::new(rect.x0, rect.y0, rect.x1, rect.y0 + w));
        self.fill(color, Rect::new(rect.x0, rect.y1 - w, rect.x1, rect.y1));
        self.fill(color, Rect::new(rect.x0, rect.y0 + w, rect.x0 + w, rect.y1 - w));
        self.fill(color, Rect::new(rect.x1 - w, rect.y0 + w, rect.x1, rect.y1 - w));
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "a byte product divided by 255 fits back in a byte"
    )]
    fn with_alpha(&self, alpha: u8) -> Self {
        let mut out = self.clone();
        out.clip = None;
        for chunk in out.data.chunks_exact_mut(4) {
            chunk[3] = ((u16::from(chunk[3]) * u16::from(alpha)) / 255) as u8;
        }
        out
    }

    fn flipped_h(&self) -> Self {
        let mut out = Self::create(self.width, self.height);
        for y in 0..i64::from(self.height) {
            for x in 0..i64::from(self.width) {
                let src = self.pixel(x, y);
                let mx = i64::from(self.width) - 1 - x;
                let i = ((y as usize) * (self.width as usize) + (mx as usize)) * 4;
                out.data[i] = src.r;
                out.data[i + 1] = src.g;
                out.data[i + 2] = src.b;
                out.data[i + 3] = src.a;
            }
        }
        out
    }

    fn alpha_at(&self, x: f64, y: f64) -> u8 {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "sample points are scene coordinates, well within i64"
        )]
        let (px, py) = (x.floor() as i64, y.floor() as i64);
        self.pixel(px, py).a
    }
}

impl Pixmap {
    /// `put` without the per-pixel clip re-check (the caller's span is
    /// already clipped).
    fn put_unclipped_checked(&mut self, x: i64, y: i64, color: Rgba) {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let dst = Rgba::new(self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]);
        let out = source_over(color, dst);
        self.data[i] = out.r;
        self.data[i + 1] = out.g;
        self.data[i + 2] = out.b;
        self.data[i + 3] = out.a;
    }
}
