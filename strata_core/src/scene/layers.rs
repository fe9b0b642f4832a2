// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer membership, per-frame update, and drawing.
//!
//! `update_layer` drains the layer's dirty state into the frame's damage
//! list; `draw_layer` repaints the damaged areas. The two calls are kept
//! separate because the stage accumulates damage across *all* layers
//! before any layer paints: an item moving in one layer must repaint
//! whatever other layers show through the vacated area.
//!
//! # Alpha compositing
//!
//! A layer with alpha below 255 cannot paint its items directly: where
//! items overlap, compositing each at partial alpha would double-blend.
//! Instead the layer renders its content into an off-screen buffer
//! (rebuilt only on frames where the content changed), derives an
//! alpha-scaled blit surface from it, and `draw_layer` blits that.

use alloc::vec::Vec;

use kurbo::{Point, Rect};

use crate::damage::{fold_rect, is_occupied, overlaps};
use crate::dirty;
use crate::surface::{Canvas, Surface};
use crate::time::Duration;

use super::id::{INVALID, ItemId, LayerId};
use super::store::{AlphaBuffer, Scene};

impl<S: Surface> Scene<S> {
    // -- Membership ------------------------------------------------------

    /// Attaches an item to a layer, appended or at `index` in the paint
    /// order.
    ///
    /// An item already owned by another layer is detached from it first
    /// (folding its vacated rectangle into that layer's damage), so
    /// exclusive ownership always holds.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn add_to_layer(&mut self, layer: LayerId, item: ItemId, index: Option<usize>) {
        self.validate_layer(layer);
        self.validate_item(item);
        if self.owner[item.idx as usize] != INVALID {
            self.remove_from_layer(item);
        }
        let l = layer.idx as usize;
        match index {
            Some(i) if i < self.layer_items[l].len() => {
                self.layer_items[l].insert(i, item.idx);
            }
            _ => self.layer_items[l].push(item.idx),
        }
        self.owner[item.idx as usize] = layer.idx;
        self.mark_bounds(item.idx);
    }

    /// Detaches an item from its layer, folding its last painted
    /// rectangle into the layer's damage so the vacated area repaints.
    ///
    /// Detaching an unattached item is a no-op.
    pub fn remove_from_layer(&mut self, item: ItemId) {
        self.validate_item(item);
        let owner = self.owner[item.idx as usize];
        if owner == INVALID {
            return;
        }
        let l = owner as usize;
        self.layer_items[l].retain(|&idx| idx != item.idx);
        self.owner[item.idx as usize] = INVALID;

        let vacated = self.painted[item.idx as usize];
        if is_occupied(vacated) {
            fold_rect(&mut self.layer_rects[l], vacated);
        }
        self.painted[item.idx as usize] = Rect::ZERO;

        // A shown overlay leaves with its host. Dependency edges die
        // with `remove_key` below.
        if let Some(overlay) = self.overlay[item.idx as usize]
            && self.owner[overlay.item as usize] != INVALID
        {
            let overlay_id = self.item_id_at(overlay.item);
            self.remove_from_layer(overlay_id);
        }
        self.layer_tracker[l].remove_key(item.idx);
        self.layer_multi_row[l].retain(|e| e.item != item.idx);
    }

    /// Whether the layer contains the item.
    #[must_use]
    pub fn layer_contains(&self, layer: LayerId, item: ItemId) -> bool {
        self.validate_layer(layer);
        self.is_item_alive(item) && self.owner[item.idx as usize] == layer.idx
    }

    /// The paint-order index of an item in its layer.
    #[must_use]
    pub fn index_of(&self, layer: LayerId, item: ItemId) -> Option<usize> {
        self.validate_layer(layer);
        self.validate_item(item);
        self.layer_items[layer.idx as usize]
            .iter()
            .position(|&idx| idx == item.idx)
    }

    /// The items of a layer in paint order.
    #[must_use]
    pub fn layer_items(&self, layer: LayerId) -> Vec<ItemId> {
        self.validate_layer(layer);
        self.layer_items[layer.idx as usize]
            .iter()
            .map(|&idx| self.item_id_at(idx))
            .collect()
    }

    /// Number of items in the layer.
    #[must_use]
    pub fn layer_count(&self, layer: LayerId) -> usize {
        self.validate_layer(layer);
        self.layer_items[layer.idx as usize].len()
    }

    /// Detaches every item from the layer.
    pub fn empty_layer(&mut self, layer: LayerId) {
        self.validate_layer(layer);
        while let Some(&idx) = self.layer_items[layer.idx as usize].first() {
            let id = self.item_id_at(idx);
            self.remove_from_layer(id);
        }
    }

    // -- Layer properties ------------------------------------------------

    /// Whether the layer is drawn.
    #[must_use]
    pub fn layer_visible(&self, layer: LayerId) -> bool {
        self.validate_layer(layer);
        self.layer_visible[layer.idx as usize]
    }

    /// Shows or hides the layer. A real toggle marks the whole layer
    /// dirty so the area repaints either way.
    pub fn set_layer_visible(&mut self, layer: LayerId, visible: bool) {
        self.validate_layer(layer);
        let l = layer.idx as usize;
        if self.layer_visible[l] != visible {
            self.layer_visible[l] = visible;
            self.layer_all_dirty[l] = true;
        }
    }

    /// The layer's alpha (255 = opaque).
    #[must_use]
    pub fn layer_alpha(&self, layer: LayerId) -> u8 {
        self.validate_layer(layer);
        self.layer_alpha[layer.idx as usize]
    }

    /// Sets the layer's alpha. Returning to 255 drops the compositing
    /// buffer; other values re-derive the blit surface if a buffer
    /// already exists.
    pub fn set_layer_alpha(&mut self, layer: LayerId, alpha: u8) {
        self.validate_layer(layer);
        let l = layer.idx as usize;
        if self.layer_alpha[l] == alpha {
            return;
        }
        self.layer_alpha[l] = alpha;
        if alpha == 255 {
            self.layer_alpha_buffer[l] = None;
        } else if let Some(ab) = &mut self.layer_alpha_buffer[l] {
            ab.blit = ab.buffer.with_alpha(alpha);
        }
        self.layer_all_dirty[l] = true;
    }

    /// The layer's clip rectangle.
    #[must_use]
    pub fn layer_clip(&self, layer: LayerId) -> Option<Rect> {
        self.validate_layer(layer);
        self.layer_clip[layer.idx as usize]
    }

    /// Sets or removes the layer's clip rectangle.
    ///
    /// On a layer that has already painted, the full union of the old and
    /// new clip areas is invalidated (a missing clip counts as the whole
    /// view). A layer that never painted takes a full-layer dirty mark
    /// instead.
    pub fn set_layer_clip(&mut self, layer: LayerId, clip: Option<Rect>) {
        self.validate_layer(layer);
        let l = layer.idx as usize;
        if self.layer_items[l].is_empty() || !self.layer_painted[l] {
            self.layer_all_dirty[l] = true;
        } else if self.layer_clip[l] != clip {
            let view = self.view_rect();
            let old = self.layer_clip[l].unwrap_or(view);
            let new = clip.unwrap_or(view);
            fold_rect(&mut self.layer_rects[l], old.union(new));
        }
        self.layer_clip[l] = clip;
    }

    /// Whether the point falls inside the layer's clip (always true
    /// without one).
    #[must_use]
    pub fn is_inside_clip(&self, layer: LayerId, x: f64, y: f64) -> bool {
        self.validate_layer(layer);
        match self.layer_clip[layer.idx as usize] {
            None => true,
            Some(clip) => clip.contains(Point::new(x, y)),
        }
    }

    /// Marks every item of the layer for repaint.
    pub fn mark_layer_dirty(&mut self, layer: LayerId) {
        self.validate_layer(layer);
        self.layer_all_dirty[layer.idx as usize] = true;
    }

    /// The union of the layer's visible item bounds.
    #[must_use]
    pub fn layer_bounds(&self, layer: LayerId) -> Rect {
        self.validate_layer(layer);
        let mut bounds: Option<Rect> = None;
        for &idx in &self.layer_items[layer.idx as usize] {
            if self.visible[idx as usize] {
                let b = self.bounds[idx as usize];
                bounds = Some(match bounds {
                    Some(acc) => acc.union(b),
                    None => b,
                });
            }
        }
        bounds.unwrap_or(Rect::ZERO)
    }

    // -- Frame update ----------------------------------------------------

    /// Drains the layer's dirty state into `out`.
    ///
    /// Carried rectangles (vacated areas, clip changes) are folded first;
    /// then each dirty item contributes the union of its previous and
    /// current rectangles, clipped to the layer clip. Overlapping entries
    /// of `out` are unioned away as they are folded, so the resulting
    /// list is intersection-free.
    ///
    /// After this returns, the layer's dirty-item set and rectangle list
    /// are empty.
    pub fn update_layer(&mut self, layer: LayerId, out: &mut Vec<Rect>, _frame_delta: Duration) {
        self.validate_layer(layer);
        let l = layer.idx as usize;

        let carried = core::mem::take(&mut self.layer_rects[l]);
        let dirty_bounds: Vec<u32> = self.layer_tracker[l]
            .drain(dirty::BOUNDS)
            .affected()
            .deterministic()
            .run()
            .collect();
        let dirty_content: Vec<u32> = self.layer_tracker[l]
            .drain(dirty::CONTENT)
            .deterministic()
            .run()
            .collect();
        let full = core::mem::replace(&mut self.layer_all_dirty[l], false);
        let changed = full || !carried.is_empty() || !dirty_bounds.is_empty()
            || !dirty_content.is_empty();

        for rect in carried {
            fold_rect(out, rect);
        }

        let clip = self.layer_clip[l];
        let mut refresh = |scene: &mut Self, idx: u32, out: &mut Vec<Rect>| {
            let i = idx as usize;
            let next = if scene.visible[i] && scene.content[i].paints() {
                scene.bounds[i]
            } else {
                Rect::ZERO
            };
            let prev = core::mem::replace(&mut scene.painted[i], next);
            let mut repaint = if is_occupied(prev) {
                if is_occupied(next) { prev.union(next) } else { prev }
            } else {
                next
            };
            if let Some(clip) = clip {
                repaint = repaint.intersect(clip);
            }
            fold_rect(out, repaint);
        };

        if full {
            for idx in self.layer_items[l].clone() {
                refresh(self, idx, out);
            }
        } else {
            let mut seen: Vec<u32> = Vec::new();
            for idx in dirty_bounds.into_iter().chain(dirty_content) {
                // An item may sit in both channels; refresh it once. A
                // drained index may also belong to an item detached after
                // marking, which remove_from_layer already folded.
                if seen.contains(&idx) || self.owner[idx as usize] != layer.idx {
                    continue;
                }
                seen.push(idx);
                refresh(self, idx, out);
            }
        }

        if self.layer_alpha[l] != 255
            && (changed || self.layer_alpha_buffer[l].is_none())
        {
            self.rebuild_alpha_buffer(layer);
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "buffer dimensions are ceiled item bounds and fit in u32"
    )]
    fn rebuild_alpha_buffer(&mut self, layer: LayerId) {
        let bounds = self.layer_bounds(layer);
        let l = layer.idx as usize;
        if !is_occupied(bounds) {
            self.layer_alpha_buffer[l] = None;
            return;
        }
        let mut buffer = S::create(bounds.width().ceil() as u32, bounds.height().ceil() as u32);
        {
            let mut canvas = Canvas::new(&mut buffer, -bounds.x0, -bounds.y0);
            for &idx in &self.layer_items[l] {
                if self.visible[idx as usize] {
                    let id = self.item_id_at(idx);
                    self.content[idx as usize].draw(id, self.bounds[idx as usize], &mut canvas);
                }
            }
        }
        let blit = buffer.with_alpha(self.layer_alpha[l]);
        self.layer_alpha_buffer[l] = Some(AlphaBuffer {
            buffer,
            blit,
            bounds,
        });
    }

    // -- Drawing ---------------------------------------------------------

    /// Paints the layer's contribution to the damaged areas.
    ///
    /// For each damage rectangle, drawing is clipped to it (intersected
    /// with the layer clip) and only items whose current rectangle
    /// intersects it are painted. Alpha-composited layers blit from the
    /// derived surface instead.
    pub fn draw_layer(&mut self, layer: LayerId, target: &mut S, rects: &[Rect]) {
        self.validate_layer(layer);
        let l = layer.idx as usize;
        let clip = self.layer_clip[l];
        if let Some(clip) = clip
            && !is_occupied(clip)
        {
            return;
        }

        if !rects.is_empty() {
            if let Some(ab) = &self.layer_alpha_buffer[l] {
                let limit = match clip {
                    Some(clip) => ab.bounds.intersect(clip),
                    None => ab.bounds,
                };
                target.set_clip(Some(limit));
                for &rect in rects {
                    let part = rect.intersect(ab.bounds);
                    if !is_occupied(part) {
                        continue;
                    }
                    let area = part - ab.bounds.origin().to_vec2();
                    target.blit(&ab.blit, part.origin(), Some(area));
                }
            } else {
                for &rect in rects {
                    let scope = match clip {
                        Some(clip) => rect.intersect(clip),
                        None => rect,
                    };
                    if !is_occupied(scope) {
                        continue;
                    }
                    target.set_clip(Some(scope));
                    for &idx in &self.layer_items[l] {
                        let i = idx as usize;
                        if !self.visible[i] || !overlaps(self.painted[i], scope) {
                            continue;
                        }
                        let id = self.item_id_at(idx);
                        let mut canvas = Canvas::new(target, 0.0, 0.0);
                        self.content[i].draw(id, self.bounds[i], &mut canvas);
                    }
                }
            }
            target.set_clip(None);
        }

        if !self.layer_painted[l] && !self.layer_items[l].is_empty() {
            self.layer_painted[l] = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::surface::Rgba;
    use crate::testutil::{Op, TestSurface};

    fn scene() -> Scene<TestSurface> {
        Scene::new(600, 450)
    }

    fn fill(s: &mut Scene<TestSurface>, rect: Rect) -> ItemId {
        s.create_fill(rect, Some(Rgba::BLACK), None)
    }

    fn update(s: &mut Scene<TestSurface>, layer: LayerId) -> Vec<Rect> {
        let mut out = Vec::new();
        s.update_layer(layer, &mut out, Duration::ZERO);
        out
    }

    #[test]
    fn move_produces_covering_dirty_union() {
        let mut s = scene();
        let layer = s.create_layer();
        let a = fill(&mut s, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = fill(&mut s, Rect::new(100.0, 0.0, 110.0, 10.0));
        let c = fill(&mut s, Rect::new(200.0, 0.0, 210.0, 10.0));
        for item in [a, b, c] {
            s.add_to_layer(layer, item, None);
        }
        let _ = update(&mut s, layer); // first paint pass

        s.set_pos(a, Point::new(10.0, 0.0));
        let rects = update(&mut s, layer);
        assert!(!rects.is_empty());
        let covering = rects
            .iter()
            .fold(Rect::ZERO, |acc, r| if acc == Rect::ZERO { *r } else { acc.union(*r) });
        let expected = Rect::new(0.0, 0.0, 20.0, 10.0); // old ∪ new
        assert_eq!(covering.union(expected), covering, "old and new covered");

        // The dirty queue is drained: a second update reports nothing.
        assert!(update(&mut s, layer).is_empty());
    }

    #[test]
    fn remove_folds_vacated_rect() {
        let mut s = scene();
        let layer = s.create_layer();
        let item = fill(&mut s, Rect::new(5.0, 5.0, 15.0, 15.0));
        s.add_to_layer(layer, item, None);
        let _ = update(&mut s, layer);

        s.remove_from_layer(item);
        let rects = update(&mut s, layer);
        assert_eq!(rects, vec![Rect::new(5.0, 5.0, 15.0, 15.0)]);
        assert_eq!(s.item_layer(item), None);
    }

    #[test]
    fn detach_then_attach_on_second_add() {
        let mut s = scene();
        let first = s.create_layer();
        let second = s.create_layer();
        let item = fill(&mut s, Rect::new(0.0, 0.0, 8.0, 8.0));
        s.add_to_layer(first, item, None);
        let _ = update(&mut s, first);

        s.add_to_layer(second, item, None);
        assert_eq!(s.item_layer(item), Some(second));
        assert_eq!(s.layer_count(first), 0);
        let rects = update(&mut s, first);
        assert_eq!(
            rects,
            vec![Rect::new(0.0, 0.0, 8.0, 8.0)],
            "vacated area repaints in the first layer"
        );
    }

    #[test]
    fn add_at_index_controls_paint_order() {
        let mut s = scene();
        let layer = s.create_layer();
        let a = fill(&mut s, Rect::new(0.0, 0.0, 4.0, 4.0));
        let b = fill(&mut s, Rect::new(0.0, 0.0, 4.0, 4.0));
        let c = fill(&mut s, Rect::new(0.0, 0.0, 4.0, 4.0));
        s.add_to_layer(layer, a, None);
        s.add_to_layer(layer, c, None);
        s.add_to_layer(layer, b, Some(1));
        assert_eq!(s.layer_items(layer), vec![a, b, c]);
    }

    #[test]
    fn full_dirty_refreshes_every_item() {
        let mut s = scene();
        let layer = s.create_layer();
        let a = fill(&mut s, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = fill(&mut s, Rect::new(50.0, 0.0, 60.0, 10.0));
        s.add_to_layer(layer, a, None);
        s.add_to_layer(layer, b, None);
        let _ = update(&mut s, layer);

        s.mark_layer_dirty(layer);
        let rects = update(&mut s, layer);
        let union = rects.iter().fold(Rect::ZERO, |acc, r| {
            if acc == Rect::ZERO { *r } else { acc.union(*r) }
        });
        assert!(union.union(Rect::new(0.0, 0.0, 10.0, 10.0)) == union);
        assert!(union.union(Rect::new(50.0, 0.0, 60.0, 10.0)) == union);
    }

    #[test]
    fn clip_change_invalidates_old_and_new_union() {
        let mut s = scene();
        let layer = s.create_layer();
        let item = fill(&mut s, Rect::new(0.0, 0.0, 100.0, 100.0));
        s.add_to_layer(layer, item, None);
        let _ = update(&mut s, layer);
        let mut target = TestSurface::create(600, 450);
        s.draw_layer(layer, &mut target, &[Rect::new(0.0, 0.0, 100.0, 100.0)]);

        s.set_layer_clip(layer, Some(Rect::new(10.0, 10.0, 40.0, 40.0)));
        let _ = update(&mut s, layer); // drain the None→clip transition

        s.set_layer_clip(layer, Some(Rect::new(20.0, 20.0, 50.0, 50.0)));
        let rects = update(&mut s, layer);
        assert_eq!(
            rects,
            vec![Rect::new(10.0, 10.0, 50.0, 50.0)],
            "exactly the old ∪ new clip area is invalidated"
        );
    }

    #[test]
    fn clip_change_before_first_paint_marks_layer() {
        let mut s = scene();
        let layer = s.create_layer();
        let item = fill(&mut s, Rect::new(0.0, 0.0, 30.0, 30.0));
        s.add_to_layer(layer, item, None);
        // Never painted: the clip change falls back to a full mark.
        s.set_layer_clip(layer, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert!(s.layer_all_dirty[layer.idx as usize]);
    }

    #[test]
    fn draw_clips_and_skips_nonintersecting_items() {
        let mut s = scene();
        let layer = s.create_layer();
        let near = fill(&mut s, Rect::new(0.0, 0.0, 10.0, 10.0));
        let far = fill(&mut s, Rect::new(300.0, 300.0, 310.0, 310.0));
        s.add_to_layer(layer, near, None);
        s.add_to_layer(layer, far, None);
        let rects = update(&mut s, layer);

        let mut target = TestSurface::create(600, 450);
        // Restrict damage to the first item's area only.
        let damage: Vec<Rect> = rects
            .into_iter()
            .filter(|r| overlaps(*r, Rect::new(0.0, 0.0, 20.0, 20.0)))
            .collect();
        s.draw_layer(layer, &mut target, &damage);

        let ops = target.ops.borrow();
        let fills = ops.iter().filter(|op| matches!(op, Op::Fill(_))).count();
        assert_eq!(fills, 1, "only the item inside the damage paints");
    }

    #[test]
    fn invisible_item_does_not_paint_but_vacates() {
        let mut s = scene();
        let layer = s.create_layer();
        let item = fill(&mut s, Rect::new(0.0, 0.0, 10.0, 10.0));
        s.add_to_layer(layer, item, None);
        let _ = update(&mut s, layer);

        s.set_visible(item, false);
        let rects = update(&mut s, layer);
        assert_eq!(rects, vec![Rect::new(0.0, 0.0, 10.0, 10.0)]);

        let mut target = TestSurface::create(600, 450);
        s.draw_layer(layer, &mut target, &rects);
        let ops = target.ops.borrow();
        assert!(
            !ops.iter().any(|op| matches!(op, Op::Fill(_))),
            "hidden item must not paint"
        );
    }

    #[test]
    fn alpha_layer_rebuilds_buffer_only_on_change() {
        let mut s = scene();
        let layer = s.create_layer();
        let item = fill(&mut s, Rect::new(0.0, 0.0, 10.0, 10.0));
        s.add_to_layer(layer, item, None);
        s.set_layer_alpha(layer, 128);
        let _ = update(&mut s, layer);
        let stamp = |s: &Scene<TestSurface>| {
            s.layer_alpha_buffer[layer.idx as usize]
                .as_ref()
                .expect("buffer exists")
                .buffer
                .stamp
        };
        let first = stamp(&s);

        // Clean frame: no rebuild.
        let _ = update(&mut s, layer);
        assert_eq!(stamp(&s), first, "clean frame must not rebuild");

        // Content change: rebuild.
        s.set_pos(item, Point::new(5.0, 0.0));
        let _ = update(&mut s, layer);
        assert_ne!(stamp(&s), first, "moved content forces one rebuild");
    }

    #[test]
    fn alpha_layer_draws_via_blit() {
        let mut s = scene();
        let layer = s.create_layer();
        let item = fill(&mut s, Rect::new(0.0, 0.0, 10.0, 10.0));
        s.add_to_layer(layer, item, None);
        s.set_layer_alpha(layer, 100);
        let rects = update(&mut s, layer);

        let mut target = TestSurface::create(600, 450);
        s.draw_layer(layer, &mut target, &rects);
        let ops = target.ops.borrow();
        assert!(
            ops.iter().any(|op| matches!(op, Op::Blit { .. })),
            "alpha layer must composite through its buffer"
        );
        assert!(
            !ops.iter().any(|op| matches!(op, Op::Fill(_))),
            "items must not be painted individually"
        );
    }

    #[test]
    fn layer_bounds_unions_visible_items() {
        let mut s = scene();
        let layer = s.create_layer();
        let a = fill(&mut s, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = fill(&mut s, Rect::new(90.0, 90.0, 100.0, 100.0));
        s.add_to_layer(layer, a, None);
        s.add_to_layer(layer, b, None);
        s.set_visible(b, false);
        assert_eq!(s.layer_bounds(layer), Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn empty_layer_detaches_everything() {
        let mut s = scene();
        let layer = s.create_layer();
        let a = fill(&mut s, Rect::new(0.0, 0.0, 4.0, 4.0));
        let b = fill(&mut s, Rect::new(8.0, 0.0, 12.0, 4.0));
        s.add_to_layer(layer, a, None);
        s.add_to_layer(layer, b, None);
        s.empty_layer(layer);
        assert_eq!(s.layer_count(layer), 0);
        assert_eq!(s.item_layer(a), None);
        assert_eq!(s.item_layer(b), None);
    }
}
