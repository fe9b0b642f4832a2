// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Item construction, properties, handlers, and hit testing.
//!
//! Every mutator is idempotent: setting a property to its current value
//! marks nothing. A real change marks the owning layer's [`BOUNDS`] or
//! [`CONTENT`](crate::dirty::CONTENT) channel, and a geometry change also
//! repositions the item's rollover overlay.
//!
//! [`BOUNDS`]: crate::dirty::BOUNDS

use alloc::rc::Rc;
use alloc::vec::Vec;

use kurbo::{Point, Rect};
use understory_dirty::EagerPolicy;

use crate::dirty;
use crate::event::{Handler, ItemEvent};
use crate::surface::{Rgba, Surface};

use super::content::{
    CustomContent, DrawFn, FillContent, HitMask, ImageContent, ItemContent, MaskContent,
    TextContent,
};
use super::id::{INVALID, ItemId, LayerId};
use super::store::{Overlay, Scene};

impl<S: Surface> Scene<S> {
    // -- Construction ----------------------------------------------------

    /// Creates a detached image item sized to its image.
    pub fn create_image(&mut self, pos: Point, image: Rc<S>) -> ItemId {
        self.create_image_with(pos, image, None, false)
    }

    /// Creates a detached image item showing `area` of the image, with
    /// control over transparent-pixel hits.
    pub fn create_image_with(
        &mut self,
        pos: Point,
        image: Rc<S>,
        area: Option<Rect>,
        hit_ignores_alpha: bool,
    ) -> ItemId {
        let (w, h) = match area {
            Some(a) => (a.width(), a.height()),
            None => (f64::from(image.width()), f64::from(image.height())),
        };
        let content = ItemContent::Image(ImageContent {
            source: image.clone(),
            display: image,
            area,
            hit_ignores_alpha,
            rollover: None,
            pressed: None,
        });
        self.alloc_item(Rect::new(pos.x, pos.y, pos.x + w, pos.y + h), content)
    }

    /// Creates a detached text item; the shaped surface is aligned inside
    /// the given bounds.
    pub fn create_text(
        &mut self,
        bounds: Rect,
        surface: Option<Rc<S>>,
        h_align: super::content::Align,
        v_align: super::content::Align,
    ) -> ItemId {
        self.alloc_item(
            bounds,
            ItemContent::Text(TextContent {
                surface,
                h_align,
                v_align,
            }),
        )
    }

    /// Creates a detached filled-rectangle item.
    pub fn create_fill(
        &mut self,
        bounds: Rect,
        background: Option<Rgba>,
        border: Option<Rgba>,
    ) -> ItemId {
        self.alloc_item(
            bounds,
            ItemContent::Fill(FillContent {
                background,
                border,
                text: None,
            }),
        )
    }

    /// Creates a detached custom-draw item.
    pub fn create_custom(
        &mut self,
        bounds: Rect,
        draw: DrawFn<S>,
        mask: Option<HitMask<S>>,
    ) -> ItemId {
        self.alloc_item(bounds, ItemContent::Custom(CustomContent { draw, mask }))
    }

    /// Creates a detached hit-test-only mask item. With `mask == None`
    /// the whole rectangle hits.
    pub fn create_mask(&mut self, bounds: Rect, mask: Option<Rc<S>>) -> ItemId {
        let bounds = match &mask {
            Some(m) => Rect::new(
                bounds.x0,
                bounds.y0,
                bounds.x0 + f64::from(m.width()),
                bounds.y0 + f64::from(m.height()),
            ),
            None => bounds,
        };
        self.alloc_item(bounds, ItemContent::Mask(MaskContent { mask }))
    }

    // -- Geometry --------------------------------------------------------

    /// The item's bounds.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale (as do all accessors below).
    #[must_use]
    pub fn item_bounds(&self, id: ItemId) -> Rect {
        self.validate_item(id);
        self.bounds[id.idx as usize]
    }

    /// The layer owning the item, if attached.
    #[must_use]
    pub fn item_layer(&self, id: ItemId) -> Option<LayerId> {
        self.validate_item(id);
        let owner = self.owner[id.idx as usize];
        (owner != INVALID).then(|| self.layer_id_at(owner))
    }

    /// Whether the item is visible.
    #[must_use]
    pub fn item_visible(&self, id: ItemId) -> bool {
        self.validate_item(id);
        self.visible[id.idx as usize]
    }

    /// The item's alpha (255 = opaque).
    #[must_use]
    pub fn item_alpha(&self, id: ItemId) -> u8 {
        self.validate_item(id);
        self.item_alpha[id.idx as usize]
    }

    /// Sets the left edge, keeping the size.
    pub fn set_left(&mut self, id: ItemId, left: f64) {
        let b = self.item_bounds(id);
        self.set_pos(id, Point::new(left, b.y0));
    }

    /// Sets the top edge, keeping the size.
    pub fn set_top(&mut self, id: ItemId, top: f64) {
        let b = self.item_bounds(id);
        self.set_pos(id, Point::new(b.x0, top));
    }

    /// Moves the item's top-left corner. A no-op unless the position
    /// actually changes.
    pub fn set_pos(&mut self, id: ItemId, pos: Point) {
        self.validate_item(id);
        let i = id.idx as usize;
        let b = self.bounds[i];
        if b.x0 != pos.x || b.y0 != pos.y {
            self.bounds[i] = Rect::new(pos.x, pos.y, pos.x + b.width(), pos.y + b.height());
            self.mark_bounds(id.idx);
        }
    }

    /// Resizes the item. A no-op unless the size actually changes.
    pub fn set_size(&mut self, id: ItemId, width: f64, height: f64) {
        self.validate_item(id);
        let i = id.idx as usize;
        let b = self.bounds[i];
        if b.width() != width || b.height() != height {
            self.bounds[i] = Rect::new(b.x0, b.y0, b.x0 + width, b.y0 + height);
            self.mark_bounds(id.idx);
        }
    }

    /// Shows or hides the item. A real toggle marks it dirty.
    pub fn set_visible(&mut self, id: ItemId, visible: bool) {
        self.validate_item(id);
        let i = id.idx as usize;
        if self.visible[i] != visible {
            self.visible[i] = visible;
            self.mark_bounds(id.idx);
        }
    }

    /// Sets the item's alpha. Image-backed items re-derive their display
    /// surface.
    pub fn set_item_alpha(&mut self, id: ItemId, alpha: u8) {
        self.validate_item(id);
        let i = id.idx as usize;
        if self.item_alpha[i] == alpha {
            return;
        }
        self.item_alpha[i] = alpha;
        match &mut self.content[i] {
            ItemContent::Image(img) => {
                img.display = derive_display(&img.source, alpha);
            }
            ItemContent::Cell(cell) => {
                cell.display = derive_display(&cell.source, alpha);
            }
            _ => {}
        }
        self.mark_content(id.idx);
    }

    // -- Content ---------------------------------------------------------

    /// Replaces an image item's image.
    ///
    /// While a rollover or pressed swap is active the new image lands in
    /// the swap's saved slot, so it appears once the swap ends.
    ///
    /// # Panics
    ///
    /// Panics if the item is not image-backed.
    pub fn set_image(&mut self, id: ItemId, image: Rc<S>, area: Option<Rect>) {
        self.validate_item(id);
        let i = id.idx as usize;
        let ItemContent::Image(img) = &mut self.content[i] else {
            panic!("set_image on non-image item {id:?}");
        };
        if let Some(rollover) = &mut img.rollover
            && rollover.saved.is_some()
        {
            rollover.saved = Some(image);
            return;
        }
        if let Some(pressed) = &mut img.pressed
            && pressed.saved.is_some()
        {
            pressed.saved = Some(image);
            return;
        }
        self.set_image_internal(id.idx, image, area);
    }

    /// Installs the image directly, bypassing active swaps.
    pub(crate) fn set_image_internal(&mut self, idx: u32, image: Rc<S>, area: Option<Rect>) {
        let i = idx as usize;
        let alpha = self.item_alpha[i];
        let (w, h) = match area {
            Some(a) => (a.width(), a.height()),
            None => (f64::from(image.width()), f64::from(image.height())),
        };
        let ItemContent::Image(img) = &mut self.content[i] else {
            unreachable!("checked by caller");
        };
        img.display = derive_display(&image, alpha);
        img.source = image;
        img.area = area;
        self.mark_content(idx);
        let id = self.item_id_at(idx);
        self.set_size(id, w, h);
    }

    /// Replaces a text item's shaped surface.
    ///
    /// # Panics
    ///
    /// Panics if the item is not a text item.
    pub fn set_text_surface(&mut self, id: ItemId, surface: Option<Rc<S>>) {
        self.validate_item(id);
        let ItemContent::Text(text) = &mut self.content[id.idx as usize] else {
            panic!("set_text_surface on non-text item {id:?}");
        };
        text.surface = surface;
        self.mark_content(id.idx);
    }

    /// Changes a fill item's colors. No-op when nothing changes.
    ///
    /// # Panics
    ///
    /// Panics if the item is not a fill item.
    pub fn set_fill_colors(&mut self, id: ItemId, background: Option<Rgba>, border: Option<Rgba>) {
        self.validate_item(id);
        let ItemContent::Fill(fill) = &mut self.content[id.idx as usize] else {
            panic!("set_fill_colors on non-fill item {id:?}");
        };
        if fill.background == background && fill.border == border {
            return;
        }
        fill.background = background;
        fill.border = border;
        self.mark_content(id.idx);
    }

    /// Sets the text surface centered in a fill item.
    ///
    /// # Panics
    ///
    /// Panics if the item is not a fill item.
    pub fn set_fill_text(&mut self, id: ItemId, text: Option<Rc<S>>) {
        self.validate_item(id);
        let ItemContent::Fill(fill) = &mut self.content[id.idx as usize] else {
            panic!("set_fill_text on non-fill item {id:?}");
        };
        fill.text = text;
        self.mark_content(id.idx);
    }

    // -- Hit testing -----------------------------------------------------

    /// Whether the point is over the item. Rectangle containment by
    /// default; image-backed items also require the backing pixel's alpha
    /// to clear [`ALPHA_HIT_THRESHOLD`](super::ALPHA_HIT_THRESHOLD)
    /// unless configured otherwise.
    #[must_use]
    pub fn is_over(&self, id: ItemId, x: f64, y: f64) -> bool {
        self.validate_item(id);
        let i = id.idx as usize;
        self.content[i].is_over(id, self.bounds[i], x, y)
    }

    // -- Event handlers --------------------------------------------------

    /// Registers a handler for an event. Multiple handlers per event are
    /// invoked in registration order.
    pub fn add_handler(&mut self, id: ItemId, event: ItemEvent, handler: Handler<S>) {
        self.validate_item(id);
        self.handlers[id.idx as usize]
            .entry(event)
            .or_default()
            .push(handler);
    }

    /// Unregisters a handler previously passed to [`add_handler`]
    /// (matched by `Rc` identity). Unknown handlers are ignored.
    ///
    /// [`add_handler`]: Self::add_handler
    pub fn remove_handler(&mut self, id: ItemId, event: ItemEvent, handler: &Handler<S>) {
        self.validate_item(id);
        let table = &mut self.handlers[id.idx as usize];
        if let Some(list) = table.get_mut(&event) {
            list.retain(|h| !Rc::ptr_eq(h, handler));
            if list.is_empty() {
                table.remove(&event);
            }
        }
    }

    /// Whether the item has at least one handler for the event.
    #[must_use]
    pub fn has_handler(&self, id: ItemId, event: ItemEvent) -> bool {
        self.validate_item(id);
        self.handlers[id.idx as usize]
            .get(&event)
            .is_some_and(|l| !l.is_empty())
    }

    /// Snapshot of an item's handlers for one event, by raw slot.
    pub(crate) fn handler_snapshot(&self, idx: u32, event: ItemEvent) -> Vec<Handler<S>> {
        self.handlers[idx as usize]
            .get(&event)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether the item takes part in pointer-over tracking: it has an
    /// enter/leave handler, a rollover overlay, or a rollover image swap.
    pub(crate) fn wants_enter_leave(&self, idx: u32) -> bool {
        let table = &self.handlers[idx as usize];
        if table.contains_key(&ItemEvent::MouseEnter) || table.contains_key(&ItemEvent::MouseLeave)
        {
            return true;
        }
        if self.overlay[idx as usize].is_some() {
            return true;
        }
        matches!(
            &self.content[idx as usize],
            ItemContent::Image(img) if img.rollover.is_some() || img.pressed.is_some()
        )
    }

    // -- Rollover overlay ------------------------------------------------

    /// Shows `image` under the item while the pointer is over it.
    /// `dx`/`dy` offset the overlay from the item's corner; `None`
    /// centers on that axis. Replaces any existing overlay.
    pub fn set_overlay(&mut self, id: ItemId, image: Rc<S>, dx: Option<f64>, dy: Option<f64>) {
        self.validate_item(id);
        self.clear_overlay(id);
        let overlay_item = self.create_image(Point::ZERO, image);
        self.overlay[id.idx as usize] = Some(Overlay {
            item: overlay_item.idx,
            dx,
            dy,
        });
        self.reposition_overlay(id.idx);
    }

    /// Removes the item's overlay, destroying the auxiliary image item.
    pub fn clear_overlay(&mut self, id: ItemId) {
        self.validate_item(id);
        if let Some(overlay) = self.overlay[id.idx as usize].take() {
            let overlay_id = self.item_id_at(overlay.item);
            self.destroy_item(overlay_id);
        }
    }

    /// The overlay's image item, if an overlay is installed.
    #[must_use]
    pub fn overlay_item(&self, id: ItemId) -> Option<ItemId> {
        self.validate_item(id);
        self.overlay[id.idx as usize]
            .as_ref()
            .map(|o| self.item_id_at(o.item))
    }

    /// Moves the overlay item to track its host.
    pub(crate) fn reposition_overlay(&mut self, idx: u32) {
        let Some(overlay) = self.overlay[idx as usize] else {
            return;
        };
        let host = self.bounds[idx as usize];
        let size = self.bounds[overlay.item as usize];
        let dx = overlay
            .dx
            .unwrap_or_else(|| (host.width() - size.width()) / 2.0);
        let dy = overlay
            .dy
            .unwrap_or_else(|| (host.height() - size.height()) / 2.0);
        let pos = Point::new(host.x0 + dx, host.y0 + dy);
        let id = self.item_id_at(overlay.item);
        self.set_pos(id, pos);
    }

    // -- Dirty marking ---------------------------------------------------

    /// Marks a geometry/visibility change: the owning layer's BOUNDS
    /// channel (propagating to overlay dependents), plus overlay
    /// repositioning.
    pub(crate) fn mark_bounds(&mut self, idx: u32) {
        let owner = self.owner[idx as usize];
        if owner != INVALID {
            self.layer_tracker[owner as usize].mark_with(idx, dirty::BOUNDS, &EagerPolicy);
        }
        if self.overlay[idx as usize].is_some() {
            self.reposition_overlay(idx);
        }
    }

    /// Marks a content change on the owning layer.
    pub(crate) fn mark_content(&mut self, idx: u32) {
        let owner = self.owner[idx as usize];
        if owner != INVALID {
            self.layer_tracker[owner as usize].mark(idx, dirty::CONTENT);
        }
    }
}

impl<S: Surface> Scene<S> {
    // -- Rollover / pressed image swaps ----------------------------------

    /// Configures an image item to swap to `image` while the pointer is
    /// over it. `None` removes the swap, restoring the displaced image.
    ///
    /// # Panics
    ///
    /// Panics if the item is not image-backed.
    pub fn set_rollover_image(&mut self, id: ItemId, image: Option<Rc<S>>) {
        self.validate_item(id);
        let i = id.idx as usize;
        let ItemContent::Image(img) = &mut self.content[i] else {
            panic!("set_rollover_image on non-image item {id:?}");
        };
        let displaced = img.rollover.take().and_then(|swap| swap.saved);
        if let Some(old) = displaced {
            self.set_image(id, old, None);
        }
        let ItemContent::Image(img) = &mut self.content[i] else {
            unreachable!("checked above");
        };
        if let Some(image) = image {
            img.rollover = Some(super::content::ImageSwap {
                replacement: image,
                saved: None,
            });
        }
    }

    /// Configures an image item to swap to `image` while it is pressed.
    /// `None` removes the swap, restoring the displaced image.
    ///
    /// # Panics
    ///
    /// Panics if the item is not image-backed.
    pub fn set_pressed_image(&mut self, id: ItemId, image: Option<Rc<S>>) {
        self.validate_item(id);
        let i = id.idx as usize;
        let ItemContent::Image(img) = &mut self.content[i] else {
            panic!("set_pressed_image on non-image item {id:?}");
        };
        let displaced = img.pressed.take().and_then(|swap| swap.saved);
        if let Some(old) = displaced {
            self.set_image(id, old, None);
        }
        let ItemContent::Image(img) = &mut self.content[i] else {
            unreachable!("checked above");
        };
        if let Some(image) = image {
            img.pressed = Some(super::content::ImageSwap {
                replacement: image,
                saved: None,
            });
        }
    }

    /// Applies the rollover swap on pointer enter.
    pub(crate) fn apply_rollover_swap(&mut self, idx: u32) {
        let i = idx as usize;
        let ItemContent::Image(img) = &mut self.content[i] else {
            return;
        };
        let Some(rollover) = &img.rollover else {
            return;
        };
        if rollover.saved.is_some() {
            return;
        }
        let replacement = rollover.replacement.clone();
        let pressed_active = img.pressed.as_ref().is_some_and(|p| p.saved.is_some());
        if pressed_active {
            // The pressed image is showing: leave the display alone and
            // arrange for the release to restore to the rollover image.
            let displaced = img
                .pressed
                .as_mut()
                .and_then(|p| p.saved.replace(replacement));
            if let Some(rollover) = &mut img.rollover {
                rollover.saved = displaced;
            }
            return;
        }
        let current = img.source.clone();
        if let Some(rollover) = &mut img.rollover {
            rollover.saved = Some(current);
        }
        self.set_image_internal(idx, replacement, None);
    }

    /// Undoes the rollover swap on pointer leave.
    pub(crate) fn remove_rollover_swap(&mut self, idx: u32) {
        let i = idx as usize;
        let ItemContent::Image(img) = &mut self.content[i] else {
            return;
        };
        let Some(rollover) = &mut img.rollover else {
            return;
        };
        let saved = rollover.saved.take();
        if let Some(pressed) = &mut img.pressed
            && pressed.saved.is_some()
        {
            // Still pressed: the release restores to the true original.
            pressed.saved = saved;
            return;
        }
        if let Some(old) = saved {
            self.set_image_internal(idx, old, None);
        }
    }

    /// Applies the pressed swap. Returns whether a swap took place (the
    /// stage then captures the pointer to observe the release).
    pub(crate) fn apply_pressed_swap(&mut self, idx: u32) -> bool {
        let i = idx as usize;
        let ItemContent::Image(img) = &mut self.content[i] else {
            return false;
        };
        let Some(pressed) = &mut img.pressed else {
            return false;
        };
        if pressed.saved.is_some() {
            return false;
        }
        let replacement = pressed.replacement.clone();
        let current = img.source.clone();
        if let Some(pressed) = &mut img.pressed {
            pressed.saved = Some(current);
        }
        self.set_image_internal(idx, replacement, None);
        true
    }

    /// Restores the image displaced by the pressed swap.
    pub(crate) fn restore_pressed_swap(&mut self, idx: u32) {
        let i = idx as usize;
        let ItemContent::Image(img) = &mut self.content[i] else {
            return;
        };
        let Some(pressed) = &mut img.pressed else {
            return;
        };
        if let Some(old) = pressed.saved.take() {
            self.set_image_internal(idx, old, None);
        }
    }
}

/// Derives the displayed surface for an item alpha value.
fn derive_display<S: Surface>(source: &Rc<S>, alpha: u8) -> Rc<S> {
    if alpha == 255 {
        source.clone()
    } else {
        Rc::new(source.with_alpha(alpha))
    }
}
