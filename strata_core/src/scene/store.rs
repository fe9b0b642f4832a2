// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene storage: slot arenas for items and layers.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::Rect;
use understory_dirty::{CycleHandling, DirtyTracker};

use crate::event::{Handler, ItemEvent};
use crate::surface::Surface;

use super::content::ItemContent;
use super::id::{INVALID, ItemId, LayerId};

/// A rollover overlay: an auxiliary image item shown under its host while
/// the pointer is over it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Overlay {
    /// Slot of the overlay image item.
    pub(crate) item: u32,
    /// Horizontal offset from the host; `None` centers.
    pub(crate) dx: Option<f64>,
    /// Vertical offset from the host; `None` centers.
    pub(crate) dy: Option<f64>,
}

/// A multi-row cell item tracked for the isometric comparator's
/// occlusion cut.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct MultiRowEntry {
    pub(crate) item: u32,
    pub(crate) row_from: f64,
    pub(crate) row_to: f64,
    pub(crate) col_from: f64,
}

/// A layer's alpha-compositing state: the rendered content, the
/// alpha-derived blit surface, and the bounds the buffer covers.
pub(crate) struct AlphaBuffer<S: Surface> {
    pub(crate) buffer: S,
    pub(crate) blit: S,
    pub(crate) bounds: Rect,
}

/// Slot-arena storage for every item and layer of a stage.
///
/// Items and layers are addressed by generational handles ([`ItemId`],
/// [`LayerId`]). Destroyed slots are recycled through free lists; the
/// generation counter makes stale handles fail validation instead of
/// aliasing the new occupant.
///
/// Ownership is exclusive: an item's slot records its owning layer
/// (`INVALID` when detached), and attaching an item that is owned
/// elsewhere detaches it first.
pub struct Scene<S: Surface> {
    // -- Item slots --
    pub(crate) item_generation: Vec<u32>,
    pub(crate) item_free: Vec<u32>,
    pub(crate) item_len: u32,
    pub(crate) bounds: Vec<Rect>,
    pub(crate) visible: Vec<bool>,
    pub(crate) item_alpha: Vec<u8>,
    pub(crate) owner: Vec<u32>,
    /// The rectangle each item occupied when last painted (zero-sized
    /// when never painted or invisible).
    pub(crate) painted: Vec<Rect>,
    pub(crate) content: Vec<ItemContent<S>>,
    pub(crate) handlers: Vec<BTreeMap<ItemEvent, Vec<Handler<S>>>>,
    pub(crate) overlay: Vec<Option<Overlay>>,

    // -- Layer slots --
    pub(crate) layer_generation: Vec<u32>,
    pub(crate) layer_free: Vec<u32>,
    pub(crate) layer_len: u32,
    /// Paint order of each layer's items (slot indices).
    pub(crate) layer_items: Vec<Vec<u32>>,
    pub(crate) layer_visible: Vec<bool>,
    pub(crate) layer_alpha: Vec<u8>,
    pub(crate) layer_clip: Vec<Option<Rect>>,
    /// Dirty rectangles carried into the next update (vacated areas,
    /// clip changes).
    pub(crate) layer_rects: Vec<Vec<Rect>>,
    pub(crate) layer_tracker: Vec<DirtyTracker<u32>>,
    pub(crate) layer_all_dirty: Vec<bool>,
    pub(crate) layer_painted: Vec<bool>,
    pub(crate) layer_alpha_buffer: Vec<Option<AlphaBuffer<S>>>,
    pub(crate) layer_multi_row: Vec<Vec<MultiRowEntry>>,

    // -- View --
    pub(crate) view_width: u32,
    pub(crate) view_height: u32,
}

impl<S: Surface> core::fmt::Debug for Scene<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scene")
            .field("items", &(self.item_len as usize - self.item_free.len()))
            .field("layers", &(self.layer_len as usize - self.layer_free.len()))
            .field("view", &(self.view_width, self.view_height))
            .finish_non_exhaustive()
    }
}

impl<S: Surface> Scene<S> {
    /// Creates an empty scene for a view of the given pixel size.
    ///
    /// The view size bounds full-view invalidation (background redraws,
    /// clip removal).
    #[must_use]
    pub fn new(view_width: u32, view_height: u32) -> Self {
        Self {
            item_generation: Vec::new(),
            item_free: Vec::new(),
            item_len: 0,
            bounds: Vec::new(),
            visible: Vec::new(),
            item_alpha: Vec::new(),
            owner: Vec::new(),
            painted: Vec::new(),
            content: Vec::new(),
            handlers: Vec::new(),
            overlay: Vec::new(),
            layer_generation: Vec::new(),
            layer_free: Vec::new(),
            layer_len: 0,
            layer_items: Vec::new(),
            layer_visible: Vec::new(),
            layer_alpha: Vec::new(),
            layer_clip: Vec::new(),
            layer_rects: Vec::new(),
            layer_tracker: Vec::new(),
            layer_all_dirty: Vec::new(),
            layer_painted: Vec::new(),
            layer_alpha_buffer: Vec::new(),
            layer_multi_row: Vec::new(),
            view_width,
            view_height,
        }
    }

    /// The full view rectangle.
    #[must_use]
    pub fn view_rect(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            f64::from(self.view_width),
            f64::from(self.view_height),
        )
    }

    // -- Item allocation -------------------------------------------------

    /// Allocates a detached item slot.
    pub(crate) fn alloc_item(&mut self, bounds: Rect, content: ItemContent<S>) -> ItemId {
        let idx = if let Some(idx) = self.item_free.pop() {
            let i = idx as usize;
            self.item_generation[i] += 1;
            self.bounds[i] = bounds;
            self.visible[i] = true;
            self.item_alpha[i] = 255;
            self.owner[i] = INVALID;
            self.painted[i] = Rect::ZERO;
            self.content[i] = content;
            self.handlers[i].clear();
            self.overlay[i] = None;
            idx
        } else {
            let idx = self.item_len;
            self.item_len += 1;
            self.item_generation.push(0);
            self.bounds.push(bounds);
            self.visible.push(true);
            self.item_alpha.push(255);
            self.owner.push(INVALID);
            self.painted.push(Rect::ZERO);
            self.content.push(content);
            self.handlers.push(BTreeMap::new());
            self.overlay.push(None);
            idx
        };
        ItemId {
            idx,
            generation: self.item_generation[idx as usize],
        }
    }

    /// Destroys an item: detaches it, tears down its handlers, overlay
    /// and content, and frees the slot.
    ///
    /// Stage-held references (focus, pointer-over, captures) are cleared
    /// by [`Stage::destroy_item`](crate::stage::Stage::destroy_item),
    /// which delegates here.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy_item(&mut self, id: ItemId) {
        self.validate_item(id);
        if self.owner[id.idx as usize] != INVALID {
            self.remove_from_layer(id);
        }
        if let Some(overlay) = self.overlay[id.idx as usize] {
            let overlay_id = self.item_id_at(overlay.item);
            self.overlay[id.idx as usize] = None;
            self.destroy_item(overlay_id);
        }
        let i = id.idx as usize;
        self.handlers[i].clear();
        self.content[i] = ItemContent::inert();
        self.item_generation[i] += 1;
        self.item_free.push(id.idx);
    }

    /// Returns whether the handle refers to a live item.
    #[must_use]
    pub fn is_item_alive(&self, id: ItemId) -> bool {
        id.idx < self.item_len && self.item_generation[id.idx as usize] == id.generation
    }

    /// Reconstructs the current handle for a live slot index.
    pub(crate) fn item_id_at(&self, idx: u32) -> ItemId {
        ItemId {
            idx,
            generation: self.item_generation[idx as usize],
        }
    }

    /// Panics if the item handle is stale.
    #[track_caller]
    pub(crate) fn validate_item(&self, id: ItemId) {
        assert!(
            self.is_item_alive(id),
            "stale ItemId: {id:?} (current gen: {})",
            if id.idx < self.item_len {
                self.item_generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    // -- Layer allocation ------------------------------------------------

    /// Creates an empty layer.
    ///
    /// The layer starts visible, fully opaque, unclipped, and outside any
    /// stage paint order.
    pub fn create_layer(&mut self) -> LayerId {
        let idx = if let Some(idx) = self.layer_free.pop() {
            let i = idx as usize;
            self.layer_generation[i] += 1;
            self.layer_items[i].clear();
            self.layer_visible[i] = true;
            self.layer_alpha[i] = 255;
            self.layer_clip[i] = None;
            self.layer_rects[i].clear();
            self.layer_tracker[i] = DirtyTracker::with_cycle_handling(CycleHandling::Error);
            self.layer_all_dirty[i] = false;
            self.layer_painted[i] = false;
            self.layer_alpha_buffer[i] = None;
            self.layer_multi_row[i].clear();
            idx
        } else {
            let idx = self.layer_len;
            self.layer_len += 1;
            self.layer_generation.push(0);
            self.layer_items.push(Vec::new());
            self.layer_visible.push(true);
            self.layer_alpha.push(255);
            self.layer_clip.push(None);
            self.layer_rects.push(Vec::new());
            self.layer_tracker
                .push(DirtyTracker::with_cycle_handling(CycleHandling::Error));
            self.layer_all_dirty.push(false);
            self.layer_painted.push(false);
            self.layer_alpha_buffer.push(None);
            self.layer_multi_row.push(Vec::new());
            idx
        };
        LayerId {
            idx,
            generation: self.layer_generation[idx as usize],
        }
    }

    /// Destroys a layer, detaching any items it still holds.
    ///
    /// The items survive (detached); destroy them separately if they are
    /// not coming back.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy_layer(&mut self, id: LayerId) {
        self.validate_layer(id);
        let i = id.idx as usize;
        for idx in core::mem::take(&mut self.layer_items[i]) {
            self.owner[idx as usize] = INVALID;
            self.painted[idx as usize] = Rect::ZERO;
            self.layer_tracker[i].remove_key(idx);
        }
        self.layer_alpha_buffer[i] = None;
        self.layer_multi_row[i].clear();
        self.layer_rects[i].clear();
        self.layer_generation[i] += 1;
        self.layer_free.push(id.idx);
    }

    /// Returns whether the handle refers to a live layer.
    #[must_use]
    pub fn is_layer_alive(&self, id: LayerId) -> bool {
        id.idx < self.layer_len && self.layer_generation[id.idx as usize] == id.generation
    }

    /// Reconstructs the current handle for a live layer slot.
    pub(crate) fn layer_id_at(&self, idx: u32) -> LayerId {
        LayerId {
            idx,
            generation: self.layer_generation[idx as usize],
        }
    }

    /// Panics if the layer handle is stale.
    #[track_caller]
    pub(crate) fn validate_layer(&self, id: LayerId) {
        assert!(
            self.is_layer_alive(id),
            "stale LayerId: {id:?} (current gen: {})",
            if id.idx < self.layer_len {
                self.layer_generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }
}
