// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Item content variants and their hit-test behavior.

use alloc::rc::Rc;
use alloc::string::String;

use kurbo::{Point, Rect};

use crate::iso::IsoState;
use crate::surface::{Canvas, Rgba, Surface};

use super::id::ItemId;

/// Per-pixel alpha below which image-backed items reject a hit.
pub const ALPHA_HIT_THRESHOLD: u8 = 40;

/// A custom-draw callback: invoked with the item, its current bounds, and
/// a [`Canvas`] positioned so stage coordinates land correctly on both
/// the screen surface and off-screen layer buffers.
pub type DrawFn<S> = Rc<dyn Fn(ItemId, Rect, &mut Canvas<'_, S>)>;

/// A hit predicate for custom-draw items.
pub type HitFn = Rc<dyn Fn(ItemId, f64, f64) -> bool>;

/// Horizontal or vertical placement of a text surface inside its bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Align {
    /// Left or top edge.
    Start,
    /// Centered.
    #[default]
    Center,
    /// Right or bottom edge.
    End,
}

impl Align {
    /// Offset of a span of `inner` length placed inside `outer`.
    #[must_use]
    pub(crate) fn place(self, outer: f64, inner: f64) -> f64 {
        match self {
            Self::Start => 0.0,
            Self::Center => (outer - inner) / 2.0,
            Self::End => outer - inner,
        }
    }
}

/// An image swap installed while the pointer hovers or presses an image
/// item. `saved` holds the displaced image while the swap is active.
pub(crate) struct ImageSwap<S: Surface> {
    pub(crate) replacement: Rc<S>,
    pub(crate) saved: Option<Rc<S>>,
}

/// The hit region of a custom-draw item.
pub enum HitMask<S: Surface> {
    /// Hit where the mask surface's alpha exceeds
    /// [`ALPHA_HIT_THRESHOLD`].
    Surface(Rc<S>),
    /// Hit where the predicate returns `true`.
    Predicate(HitFn),
}

impl<S: Surface> core::fmt::Debug for HitMask<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Surface(_) => f.write_str("HitMask::Surface"),
            Self::Predicate(_) => f.write_str("HitMask::Predicate"),
        }
    }
}

/// An image item: a shared surface, optionally restricted to an area.
pub(crate) struct ImageContent<S: Surface> {
    /// The image as supplied.
    pub(crate) source: Rc<S>,
    /// The surface actually blitted (alpha-derived when item alpha < 255).
    pub(crate) display: Rc<S>,
    /// Portion of the image to show; `None` shows all of it.
    pub(crate) area: Option<Rect>,
    /// Hit anywhere in the bounds, even over transparent pixels.
    pub(crate) hit_ignores_alpha: bool,
    /// Image swapped in while the pointer is over the item.
    pub(crate) rollover: Option<ImageSwap<S>>,
    /// Image swapped in while the item is pressed.
    pub(crate) pressed: Option<ImageSwap<S>>,
}

/// A text item: an externally shaped surface placed inside the bounds.
pub(crate) struct TextContent<S: Surface> {
    pub(crate) surface: Option<Rc<S>>,
    pub(crate) h_align: Align,
    pub(crate) v_align: Align,
}

/// A filled rectangle with optional border and centered text surface.
pub(crate) struct FillContent<S: Surface> {
    pub(crate) background: Option<Rgba>,
    pub(crate) border: Option<Rgba>,
    pub(crate) text: Option<Rc<S>>,
}

/// A custom-draw item.
pub(crate) struct CustomContent<S: Surface> {
    pub(crate) draw: DrawFn<S>,
    pub(crate) mask: Option<HitMask<S>>,
}

/// A hit-test-only region; never painted.
pub(crate) struct MaskContent<S: Surface> {
    pub(crate) mask: Option<Rc<S>>,
}

/// Shows a dependent cell item only while its container cell (matched by
/// type name) is in one of the listed states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibilityBinding {
    /// Type name of the container cell.
    pub container_kind: String,
    /// States of the container in which the dependent item is visible.
    pub visible_in: alloc::vec::Vec<String>,
}

/// An isometric cell item.
pub(crate) struct CellContent<S: Surface> {
    /// Catalog image for the current state/flip.
    pub(crate) source: Rc<S>,
    /// Alpha-derived display surface.
    pub(crate) display: Rc<S>,
    /// Type name in the catalog.
    pub(crate) kind: String,
    /// Current state.
    pub(crate) state: IsoState,
    /// Horizontally flipped.
    pub(crate) flip_h: bool,
    /// Grid position; fractional while aligned to a place holder.
    pub(crate) row: f64,
    /// Grid column.
    pub(crate) col: f64,
    /// Center of the topmost cell inside the image.
    pub(crate) center: Point,
    /// Footprint in cells (rows, cols), already flip-adjusted.
    pub(crate) size: (u32, u32),
    /// Paint-order key: tag band in the integer part, place-holder
    /// fraction below it.
    pub(crate) z: f64,
    /// Optional visibility binding to a container cell's state.
    pub(crate) visible_in: Option<VisibilityBinding>,
}

/// What an item is.
pub(crate) enum ItemContent<S: Surface> {
    Image(ImageContent<S>),
    Text(TextContent<S>),
    Fill(FillContent<S>),
    Custom(CustomContent<S>),
    Mask(MaskContent<S>),
    Cell(CellContent<S>),
}

impl<S: Surface> ItemContent<S> {
    /// The inert value left in a freed slot.
    pub(crate) fn inert() -> Self {
        Self::Mask(MaskContent { mask: None })
    }

    /// Whether this content ever paints pixels.
    pub(crate) fn paints(&self) -> bool {
        !matches!(self, Self::Mask(_))
    }

    /// Hit test at stage coordinates, given the item's current bounds.
    pub(crate) fn is_over(&self, id: ItemId, bounds: Rect, x: f64, y: f64) -> bool {
        if !bounds.contains(Point::new(x, y)) {
            return false;
        }
        let lx = x - bounds.x0;
        let ly = y - bounds.y0;
        match self {
            Self::Image(img) => {
                if img.hit_ignores_alpha {
                    return true;
                }
                let (sx, sy) = match img.area {
                    Some(area) => (lx + area.x0, ly + area.y0),
                    None => (lx, ly),
                };
                img.display.alpha_at(sx, sy) > ALPHA_HIT_THRESHOLD
            }
            Self::Cell(cell) => cell.display.alpha_at(lx, ly) > ALPHA_HIT_THRESHOLD,
            Self::Text(_) => true,
            Self::Fill(fill) => {
                if fill.background.is_some() {
                    return true;
                }
                // Border-only rectangles hit on the one-pixel perimeter.
                lx < 1.0 || ly < 1.0 || x >= bounds.x1 - 1.0 || y >= bounds.y1 - 1.0
            }
            Self::Custom(custom) => match &custom.mask {
                None => true,
                Some(HitMask::Surface(mask)) => mask.alpha_at(lx, ly) > ALPHA_HIT_THRESHOLD,
                Some(HitMask::Predicate(f)) => f(id, x, y),
            },
            Self::Mask(mask) => match &mask.mask {
                None => true,
                Some(surface) => surface.alpha_at(lx, ly) > ALPHA_HIT_THRESHOLD,
            },
        }
    }

    /// Paints the item through `canvas` at its current bounds.
    pub(crate) fn draw(&self, id: ItemId, bounds: Rect, canvas: &mut Canvas<'_, S>) {
        match self {
            Self::Image(img) => {
                canvas.blit(&img.display, bounds.origin(), img.area);
            }
            Self::Cell(cell) => {
                canvas.blit(&cell.display, bounds.origin(), None);
            }
            Self::Text(text) => {
                if let Some(surface) = &text.surface {
                    let x = bounds.x0
                        + text
                            .h_align
                            .place(bounds.width(), f64::from(surface.width()));
                    let y = bounds.y0
                        + text
                            .v_align
                            .place(bounds.height(), f64::from(surface.height()));
                    canvas.blit(surface, Point::new(x, y), None);
                }
            }
            Self::Fill(fill) => {
                if let Some(background) = fill.background {
                    canvas.fill(background, bounds);
                }
                if let Some(text) = &fill.text {
                    let x = bounds.x0 + (bounds.width() - f64::from(text.width())) / 2.0;
                    let y = bounds.y0 + (bounds.height() - f64::from(text.height())) / 2.0;
                    canvas.blit(text, Point::new(x, y), None);
                }
                if let Some(border) = fill.border {
                    canvas.draw_rect(border, bounds, 1);
                }
            }
            Self::Custom(custom) => {
                (custom.draw)(id, bounds, canvas);
            }
            Self::Mask(_) => {}
        }
    }
}

impl<S: Surface> core::fmt::Debug for ItemContent<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Image(_) => "Image",
            Self::Text(_) => "Text",
            Self::Fill(_) => "Fill",
            Self::Custom(_) => "Custom",
            Self::Mask(_) => "Mask",
            Self::Cell(cell) => return write!(f, "Cell({:?})", cell.kind),
        };
        f.write_str(name)
    }
}
