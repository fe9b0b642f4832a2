// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The stage: layer composition, the frame loop, input dispatch, timers,
//! modal dialogs, focus and pointer state.
//!
//! A [`Stage`] owns a [`Scene`] plus everything per-frame: the layer
//! paint order, the keyed timer scheduler, the modal-dialog stack,
//! focus/pointer-over/capture state, the UI-lock counter, the pre-render
//! buffer, and the background.
//!
//! # Frame loop
//!
//! The embedding drives the stage cooperatively: feed input through
//! [`dispatch`](Stage::dispatch) as it arrives, then call
//! [`render`](Stage::render) once per frame with the current time. Each
//! `render`, in order:
//!
//! 1. resolves pending isometric re-sorts and the pointer-over item (if
//!    the pointer moved or a refresh was forced),
//! 2. drains due timers (callbacks may freely start/stop/re-arm timers),
//! 3. updates every layer, accumulating dirty rectangles — split at the
//!    pre-render boundary when one is set,
//! 4. draws background, layers, the loading overlay and the cursor
//!    layer, restricted to the dirty rectangles, and returns them for
//!    the external present call.
//!
//! Everything is single-threaded and run-to-completion: no handler or
//! timer callback is ever preempted, and the engine never blocks.

mod dialog;
mod input;
mod timer;

pub use dialog::DialogRecord;
pub use input::DOUBLE_CLICK_WINDOW;
pub use timer::TimerCallback;

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{Point, Rect};

use crate::damage::{compact, fold_rect, is_occupied};
use crate::event::{CaptureHandler, FallbackHandler, PointerButtons};
use crate::iso::IsoContext;
use crate::scene::{ItemId, LayerId, Scene};
use crate::surface::{Rgba, Surface};
use crate::time::{Duration, Instant};
use crate::trace::{FrameBeginEvent, FrameEndEvent, Tracer};

use timer::Timer;

/// Dirty-rect lists are compacted once they grow past this many entries.
const DAMAGE_BUDGET: usize = 6;

/// What fills the area behind all layers.
pub enum Background<S: Surface> {
    /// A solid color.
    Color(Rgba),
    /// An image; tiled if smaller than the view.
    Image(Rc<S>),
}

impl<S: Surface> core::fmt::Debug for Background<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Color(c) => write!(f, "Background::Color({c:?})"),
            Self::Image(_) => f.write_str("Background::Image"),
        }
    }
}

/// The background, prepared for per-rect drawing.
enum PreparedBackground<S: Surface> {
    Color(Rgba),
    /// The image covers the view; blit dirty areas straight from it.
    Image(Rc<S>),
    /// The image was smaller than the view and has been pre-tiled.
    Tiled(S),
}

/// The currently focused item and its opaque payload.
struct FocusRecord {
    item: ItemId,
    data: Option<Box<dyn core::any::Any>>,
}

/// A retained-mode stage compositing [`Scene`] layers with incremental
/// damage, routed input, and a cooperative timer scheduler.
pub struct Stage<S: Surface> {
    /// The items and layers. Layer *membership* lives here; the paint
    /// order of layers on screen lives in the stage.
    pub scene: Scene<S>,

    pub(crate) order: Vec<u32>,
    background: PreparedBackground<S>,
    background_dirty: bool,

    pub(crate) timers: BTreeMap<String, Timer<S>>,
    pub(crate) arm_seq: u64,

    pub(crate) dialogs: Vec<DialogRecord<S>>,
    fallback: Option<FallbackHandler<S>>,
    locks: u32,

    focus: Option<FocusRecord>,
    pub(crate) over_item: Option<ItemId>,
    pub(crate) captures: Vec<(ItemId, CaptureHandler<S>)>,

    pub(crate) pointer: Point,
    pub(crate) pointer_buttons: PointerButtons,
    pointer_refresh: bool,
    pub(crate) last_click: Option<Instant>,
    pub(crate) last_press_stack: Vec<ItemId>,

    pub(crate) prerender_to: Option<u32>,
    prerender_buffer: Option<S>,
    prerender_refresh: bool,

    cursor_layer: Option<LayerId>,
    cursor_item: Option<ItemId>,
    cursor_hotspot: Point,
    loading_layer: Option<LayerId>,
    window_active: bool,

    pub(crate) iso: Option<IsoContext<S>>,

    quit_requested: bool,
    frame_index: u64,
    pub(crate) last_now: Option<Instant>,
    pub(crate) tracer: Tracer,
}

impl<S: Surface> core::fmt::Debug for Stage<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stage")
            .field("scene", &self.scene)
            .field("layers", &self.order.len())
            .field("timers", &self.timers.len())
            .field("dialogs", &self.dialogs.len())
            .field("frame_index", &self.frame_index)
            .finish_non_exhaustive()
    }
}

impl<S: Surface> Stage<S> {
    /// Creates a stage for a view of the given pixel size.
    #[must_use]
    pub fn new(view_width: u32, view_height: u32, background: Background<S>) -> Self {
        let scene = Scene::new(view_width, view_height);
        let mut stage = Self {
            scene,
            order: Vec::new(),
            background: PreparedBackground::Color(Rgba::BLACK),
            background_dirty: true,
            timers: BTreeMap::new(),
            arm_seq: 0,
            dialogs: Vec::new(),
            fallback: None,
            locks: 0,
            focus: None,
            over_item: None,
            captures: Vec::new(),
            pointer: Point::ZERO,
            pointer_buttons: PointerButtons::default(),
            pointer_refresh: false,
            last_click: None,
            last_press_stack: Vec::new(),
            prerender_to: None,
            prerender_buffer: None,
            prerender_refresh: false,
            cursor_layer: None,
            cursor_item: None,
            cursor_hotspot: Point::ZERO,
            loading_layer: None,
            window_active: true,
            iso: None,
            quit_requested: false,
            frame_index: 0,
            last_now: None,
            tracer: Tracer::none(),
        };
        stage.set_background(background);
        stage
    }

    /// Replaces the background, forcing a full repaint.
    pub fn set_background(&mut self, background: Background<S>) {
        self.background = match background {
            Background::Color(color) => PreparedBackground::Color(color),
            Background::Image(image) => {
                let (iw, ih) = (f64::from(image.width()), f64::from(image.height()));
                let view = self.scene.view_rect();
                if iw >= view.width() && ih >= view.height() {
                    PreparedBackground::Image(image)
                } else {
                    // Tile the image once rather than per frame.
                    let mut tiled = S::create(self.scene.view_width, self.scene.view_height);
                    let mut y = 0.0;
                    while y < view.height() {
                        let mut x = 0.0;
                        while x < view.width() {
                            tiled.blit(&image, Point::new(x, y), None);
                            x += iw;
                        }
                        y += ih;
                    }
                    PreparedBackground::Tiled(tiled)
                }
            }
        };
        self.redraw();
    }

    /// Marks the whole stage for repaint and refreshes the pointer-over
    /// item on the next frame.
    pub fn redraw(&mut self) {
        self.background_dirty = true;
        self.update_mouse();
    }

    // -- Layer composition -----------------------------------------------

    /// Adds a layer to the paint order, appended or at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the layer is already staged.
    pub fn add_layer(&mut self, layer: LayerId, index: Option<usize>) {
        self.scene.validate_layer(layer);
        assert!(
            !self.order.contains(&layer.idx),
            "layer {layer:?} is already part of the stage"
        );
        match index {
            Some(i) if i < self.order.len() => self.order.insert(i, layer.idx),
            _ => self.order.push(layer.idx),
        }
        self.scene.mark_layer_dirty(layer);
        if self.iso.is_some() {
            self.mark_layer_positions(layer);
        }
        self.update_mouse();
    }

    /// Removes a layer from the paint order. Unknown layers are ignored.
    ///
    /// Releases focus if the focused item lives on the layer, drops the
    /// pre-render boundary if it pointed here, and closes the dialog
    /// record associated with the layer, if any.
    pub fn remove_layer(&mut self, layer: LayerId) {
        if !self.scene.is_layer_alive(layer) || !self.order.contains(&layer.idx) {
            return;
        }
        let focus_in_layer = self.focus.as_ref().is_some_and(|record| {
            self.scene.is_item_alive(record.item)
                && self.scene.item_layer(record.item) == Some(layer)
        });
        if focus_in_layer {
            self.set_focus(None, None);
        }
        self.order.retain(|&slot| slot != layer.idx);
        if self.prerender_to == Some(layer.idx) {
            self.set_prerender_boundary(None);
        }
        self.dialogs.retain(|d| d.layer != layer.idx);
        self.redraw();
    }

    /// Removes every layer (and any open dialogs).
    pub fn empty_layers(&mut self) {
        self.order.clear();
        self.dialogs.clear();
        self.set_prerender_boundary(None);
        self.redraw();
    }

    /// Whether the layer is part of the paint order.
    #[must_use]
    pub fn contains_layer(&self, layer: LayerId) -> bool {
        self.scene.is_layer_alive(layer) && self.order.contains(&layer.idx)
    }

    /// The staged layers, bottom to top.
    #[must_use]
    pub fn layer_order(&self) -> Vec<LayerId> {
        self.order
            .iter()
            .map(|&slot| self.scene.layer_id_at(slot))
            .collect()
    }

    // -- Item convenience ------------------------------------------------

    /// Attaches an item to a layer (appended), with stage bookkeeping:
    /// cell items queue a depth re-sort, and the pointer-over item is
    /// refreshed.
    pub fn add_item(&mut self, layer: LayerId, item: ItemId) {
        self.add_item_at(layer, item, None);
    }

    /// Like [`add_item`](Self::add_item) at a paint-order index.
    pub fn add_item_at(&mut self, layer: LayerId, item: ItemId, index: Option<usize>) {
        self.scene.add_to_layer(layer, item, index);
        self.note_cell_attached(layer, item);
        self.update_mouse();
    }

    /// Detaches an item from its layer, clearing any stage state that
    /// pointed at it (focus, pointer-over, captures).
    pub fn remove_item(&mut self, item: ItemId) {
        if !self.scene.is_item_alive(item) {
            return;
        }
        if self.focused_item() == Some(item) {
            self.set_focus(None, None);
        }
        if self.over_item == Some(item) {
            self.over_item = None;
        }
        self.captures.retain(|(captured, _)| *captured != item);
        self.note_cell_detached(item);
        self.scene.remove_from_layer(item);
        self.update_mouse();
    }

    /// Destroys an item outright: detaches it, clears stage references,
    /// and frees its slot.
    pub fn destroy_item(&mut self, item: ItemId) {
        if !self.scene.is_item_alive(item) {
            return;
        }
        self.remove_item(item);
        self.scene.destroy_item(item);
    }

    // -- UI lock ---------------------------------------------------------

    /// Locks the UI: while locked no hit-testing or item dispatch
    /// happens. Locks nest.
    pub fn lock_ui(&mut self) {
        self.locks += 1;
        self.update_mouse();
    }

    /// Releases one UI lock.
    pub fn unlock_ui(&mut self) {
        debug_assert!(self.locks > 0, "unlock_ui without matching lock_ui");
        self.locks = self.locks.saturating_sub(1);
        self.update_mouse();
    }

    /// Whether the UI is currently locked.
    #[must_use]
    pub fn ui_locked(&self) -> bool {
        self.locks > 0
    }

    // -- Pre-render buffer -----------------------------------------------

    /// Sets the pre-render boundary: all layers up to and including
    /// `to_layer` are composited once into a cached buffer and blitted
    /// as a unit until one of them changes.
    pub fn set_prerender_boundary(&mut self, to_layer: Option<LayerId>) {
        match to_layer {
            Some(layer) => {
                self.scene.validate_layer(layer);
                self.prerender_to = Some(layer.idx);
                if self.prerender_buffer.is_none() {
                    self.prerender_buffer =
                        Some(S::create(self.scene.view_width, self.scene.view_height));
                }
                self.prerender_refresh = true;
            }
            None => self.prerender_to = None,
        }
    }

    /// The current pre-render boundary layer.
    #[must_use]
    pub fn prerender_boundary(&self) -> Option<LayerId> {
        self.prerender_to.map(|slot| self.scene.layer_id_at(slot))
    }

    // -- Cursor and loading overlays -------------------------------------

    /// Installs an item as the mouse cursor, drawn above everything and
    /// following the pointer. The hotspot is the point inside the item
    /// that tracks the pointer position. `None` removes the cursor.
    pub fn set_cursor(&mut self, cursor: Option<ItemId>, hotspot: Point) {
        if self.cursor_item == cursor {
            return;
        }
        let layer = match self.cursor_layer {
            Some(layer) => layer,
            None => {
                let layer = self.scene.create_layer();
                self.cursor_layer = Some(layer);
                layer
            }
        };
        self.scene.empty_layer(layer);
        if let Some(item) = cursor {
            self.scene.add_to_layer(layer, item, None);
            let pos = Point::new(
                self.pointer.x - hotspot.x,
                self.pointer.y - hotspot.y,
            );
            self.scene.set_pos(item, pos);
        }
        self.cursor_item = cursor;
        self.cursor_hotspot = hotspot;
        self.update_mouse();
    }

    /// The current cursor item.
    #[must_use]
    pub fn cursor(&self) -> Option<ItemId> {
        self.cursor_item
    }

    /// Marks the cursor layer for repaint.
    pub fn redraw_cursor(&mut self) {
        if let Some(layer) = self.cursor_layer {
            self.scene.mark_layer_dirty(layer);
        }
    }

    /// Sets the loading overlay layer, drawn above all staged layers but
    /// below the cursor. The layer must not be part of the paint order.
    pub fn set_loading_layer(&mut self, layer: Option<LayerId>) {
        if let Some(layer) = layer {
            self.scene.validate_layer(layer);
            self.scene.mark_layer_dirty(layer);
        }
        self.loading_layer = layer;
        self.redraw();
    }

    // -- Miscellany ------------------------------------------------------

    /// Installs the stage's fallback input handler, invoked for events
    /// no item consumed (while no dialog is open).
    pub fn set_fallback_handler(&mut self, handler: Option<FallbackHandler<S>>) {
        self.fallback = handler;
    }

    /// Whether a quit request has been dispatched.
    #[must_use]
    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Frames rendered so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The last `now` passed to [`render`](Self::render), used as the
    /// stage clock between frames.
    pub(crate) fn clock(&self) -> Instant {
        self.last_now.unwrap_or_default()
    }

    /// Installs a trace sink receiving frame-loop events (active with
    /// the `trace` feature).
    pub fn set_trace_sink(&mut self, sink: Option<Box<dyn crate::trace::TraceSink>>) {
        self.tracer = match sink {
            Some(sink) => Tracer::new(sink),
            None => Tracer::none(),
        };
    }

    /// Whether the window currently has input focus.
    #[must_use]
    pub fn window_active(&self) -> bool {
        self.window_active
    }

    pub(crate) fn set_window_active(&mut self, active: bool) {
        self.window_active = active;
        if let Some(layer) = self.cursor_layer {
            self.scene.set_layer_visible(layer, active);
        }
    }

    // -- Frame loop ------------------------------------------------------

    /// Renders one frame into `target` and returns the dirty rectangles
    /// for the external present call.
    pub fn render(&mut self, target: &mut S, now: Instant) -> Vec<Rect> {
        let frame_delta = match self.last_now {
            Some(prev) => now.saturating_since(prev),
            None => Duration::ZERO,
        };
        self.last_now = Some(now);
        self.frame_index += 1;
        self.tracer.frame_begin(&FrameBeginEvent {
            frame_index: self.frame_index,
            now,
            frame_delta,
        });

        // Re-sorts queued by cell moves since the last frame.
        self.resolve_iso_pending();

        // Pointer-over refresh and cursor tracking.
        if self.pointer_refresh {
            self.pointer_refresh = false;
            self.refresh_over_item();
            if let Some(cursor) = self.cursor_item
                && self.scene.is_item_alive(cursor)
            {
                let pos = Point::new(
                    self.pointer.x - self.cursor_hotspot.x,
                    self.pointer.y - self.cursor_hotspot.y,
                );
                self.scene.set_pos(cursor, pos);
            }
        }

        // Due timers, tolerant of callbacks mutating the timer table.
        self.run_timers(now);

        // Accumulate damage across all layers, split at the pre-render
        // boundary.
        let mut dirty: Vec<Rect> = Vec::new();
        let mut pre_dirty: Vec<Rect> = Vec::new();
        let mut in_pre = self.prerender_to.is_some();
        for slot in self.order.clone() {
            let layer = self.scene.layer_id_at(slot);
            if in_pre {
                self.scene.update_layer(layer, &mut pre_dirty, frame_delta);
                in_pre = self.prerender_to != Some(slot);
                if pre_dirty.len() > DAMAGE_BUDGET {
                    compact(&mut pre_dirty, DAMAGE_BUDGET);
                }
            } else {
                self.scene.update_layer(layer, &mut dirty, frame_delta);
                if dirty.len() > DAMAGE_BUDGET {
                    compact(&mut dirty, DAMAGE_BUDGET);
                }
            }
        }
        if let Some(layer) = self.loading_layer {
            self.scene.update_layer(layer, &mut dirty, frame_delta);
        }
        if let Some(layer) = self.cursor_layer {
            self.scene.update_layer(layer, &mut dirty, frame_delta);
        }

        let view = self.scene.view_rect();
        if self.background_dirty {
            self.background_dirty = false;
            if self.prerender_to.is_some() {
                pre_dirty.clear();
                pre_dirty.push(view);
                dirty.clear();
            } else {
                dirty.clear();
                dirty.push(view);
            }
        }

        // Rects to redraw inside the pre-render buffer: everything on a
        // rebuild, otherwise just the below-boundary damage.
        let prerender = self.prerender_to.is_some();
        let pre_rects: Vec<Rect> = if prerender && self.prerender_refresh {
            self.prerender_refresh = false;
            alloc::vec![view]
        } else {
            pre_dirty.clone()
        };

        // Background.
        if prerender {
            let mut buffer = self.prerender_buffer.take();
            if let Some(buffer) = &mut buffer {
                self.draw_background(buffer, &pre_rects);
            }
            self.prerender_buffer = buffer;
        } else {
            self.draw_background(target, &dirty);
        }

        // Layers: below the boundary into the buffer, the buffer as a
        // unit onto the target, the rest directly onto the target.
        let mut in_pre = prerender;
        for slot in self.order.clone() {
            let layer = self.scene.layer_id_at(slot);
            if in_pre {
                let mut buffer = self.prerender_buffer.take();
                if let Some(buffer) = &mut buffer {
                    if self.scene.layer_visible(layer) {
                        self.scene.draw_layer(layer, buffer, &pre_rects);
                    }
                }
                self.prerender_buffer = buffer;
                if self.prerender_to == Some(slot) {
                    for rect in pre_dirty.drain(..) {
                        fold_rect(&mut dirty, rect);
                    }
                    if !dirty.is_empty() {
                        self.blit_prerender(target, &dirty);
                    }
                    in_pre = false;
                }
            } else if self.scene.layer_visible(layer) {
                self.scene.draw_layer(layer, target, &dirty);
            }
        }
        if let Some(layer) = self.loading_layer
            && self.scene.layer_visible(layer)
        {
            self.scene.draw_layer(layer, target, &dirty);
        }
        if let Some(layer) = self.cursor_layer
            && self.scene.layer_visible(layer)
        {
            self.scene.draw_layer(layer, target, &dirty);
        }

        self.tracer.frame_end(&FrameEndEvent {
            frame_index: self.frame_index,
            dirty_rects: dirty.len(),
            dirty_area: dirty.iter().map(|r| r.area()).sum(),
        });
        dirty
    }

    fn draw_background(&self, target: &mut S, rects: &[Rect]) {
        if rects.is_empty() {
            return;
        }
        target.set_clip(None);
        match &self.background {
            PreparedBackground::Color(color) => {
                for &rect in rects {
                    target.fill(*color, rect);
                }
            }
            PreparedBackground::Image(image) => {
                for &rect in rects {
                    target.blit(image, rect.origin(), Some(rect));
                }
            }
            PreparedBackground::Tiled(tiled) => {
                for &rect in rects {
                    target.blit(tiled, rect.origin(), Some(rect));
                }
            }
        }
    }

    fn blit_prerender(&mut self, target: &mut S, rects: &[Rect]) {
        let Some(buffer) = &self.prerender_buffer else {
            return;
        };
        for &rect in rects {
            if !is_occupied(rect) {
                continue;
            }
            target.set_clip(Some(rect));
            target.blit(buffer, rect.origin(), Some(rect));
        }
        target.set_clip(None);
    }
}
