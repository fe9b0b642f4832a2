// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Modal dialogs: a stack of scopes narrowing input to the top entry.
//!
//! Showing a dialog stages its layer on top and records it on the
//! dialog stack; from then on hit testing only considers the dialog's
//! layer and layers staged after it, and unrouted events go to the
//! dialog's handler instead of the stage fallback. Dialogs nest: a
//! second dialog narrows the scope further.
//!
//! A dialog can bring a translucent backdrop (a fill item covering the
//! view, staged just below it) and can move the pre-render boundary to
//! the layers underneath, so the static content below is composited
//! once and blitted while the dialog is up.

use kurbo::Point;

use crate::event::FallbackHandler;
use crate::scene::{ItemId, LayerId};
use crate::surface::{Rgba, Surface};

use super::Stage;

/// One open dialog.
pub struct DialogRecord<S: Surface> {
    /// Slot of the dialog's layer.
    pub(crate) layer: u32,
    /// Receives events no item handled while this dialog is topmost.
    pub(crate) handler: Option<FallbackHandler<S>>,
    /// Slot of the backdrop layer, if one was created.
    pub(crate) backdrop: Option<u32>,
    /// The backdrop's fill item (destroyed with the dialog).
    pub(crate) backdrop_item: Option<ItemId>,
    /// Pre-render boundary to restore on close, if one was replaced.
    pub(crate) restore_prerender: Option<u32>,
}

impl<S: Surface> core::fmt::Debug for DialogRecord<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DialogRecord")
            .field("layer", &self.layer)
            .field("backdrop", &self.backdrop)
            .finish_non_exhaustive()
    }
}

impl<S: Surface> Stage<S> {
    /// Opens `layer` as a modal dialog.
    ///
    /// The layer is staged on top; layers added afterwards stay in the
    /// dialog's scope until [`close_dialog`](Self::close_dialog) removes
    /// them with it. `backdrop` fills the view behind the dialog with a
    /// (typically translucent) color. With `prerender_below`, the
    /// pre-render boundary moves to the current topmost layer so
    /// everything underneath is composited once; the previous boundary
    /// is restored on close. Any active pointer captures are released.
    ///
    /// # Panics
    ///
    /// Panics if the layer is stale or already staged.
    pub fn show_dialog(
        &mut self,
        layer: LayerId,
        handler: Option<FallbackHandler<S>>,
        backdrop: Option<Rgba>,
        prerender_below: bool,
    ) {
        self.scene.validate_layer(layer);
        assert!(
            !self.order.contains(&layer.idx),
            "a dialog layer must not already be staged: {layer:?}"
        );

        let restore_prerender = if prerender_below && !self.order.is_empty() {
            let previous = self.prerender_to;
            let top = self.scene.layer_id_at(*self.order.last().expect("non-empty"));
            self.set_prerender_boundary(Some(top));
            previous
        } else {
            None
        };

        let (backdrop_layer, backdrop_item) = match backdrop {
            Some(color) => {
                let backdrop_layer = self.scene.create_layer();
                let view = self.scene.view_rect();
                let item = self.scene.create_fill(view, Some(color), None);
                self.scene.add_to_layer(backdrop_layer, item, None);
                self.add_layer(backdrop_layer, None);
                (Some(backdrop_layer.idx), Some(item))
            }
            None => (None, None),
        };

        // A held capture must not keep feeding a handler under the new
        // modal scope.
        self.captures.clear();

        self.add_layer(layer, None);
        self.dialogs.push(DialogRecord {
            layer: layer.idx,
            handler,
            backdrop: backdrop_layer,
            backdrop_item,
            restore_prerender,
        });
    }

    /// Closes a dialog: removes its layer and every layer staged after
    /// it, destroys the backdrop, and restores the previous pre-render
    /// boundary if its layer is still staged. Unknown layers are
    /// ignored.
    pub fn close_dialog(&mut self, layer: LayerId) {
        let Some(pos) = self
            .dialogs
            .iter()
            .position(|d| d.layer == layer.idx)
        else {
            return;
        };
        let record = self.dialogs.remove(pos);

        // The dialog layer and everything stacked above it go together.
        if let Some(start) = self.order.iter().position(|&slot| slot == record.layer) {
            for slot in self.order[start..].to_vec() {
                let doomed = self.scene.layer_id_at(slot);
                self.remove_layer(doomed);
            }
        }

        if let Some(backdrop) = record.backdrop {
            let backdrop = self.scene.layer_id_at(backdrop);
            self.remove_layer(backdrop);
            if let Some(item) = record.backdrop_item {
                self.destroy_item(item);
            }
            self.scene.destroy_layer(backdrop);
        }

        if let Some(slot) = record.restore_prerender {
            if self.order.contains(&slot) {
                let boundary = self.scene.layer_id_at(slot);
                self.set_prerender_boundary(Some(boundary));
            } else {
                self.set_prerender_boundary(None);
            }
        }
    }

    /// Whether any dialog is open.
    #[must_use]
    pub fn has_open_dialog(&self) -> bool {
        !self.dialogs.is_empty()
    }

    /// The layer of the topmost open dialog.
    #[must_use]
    pub fn top_dialog(&self) -> Option<LayerId> {
        self.dialogs
            .last()
            .map(|d| self.scene.layer_id_at(d.layer))
    }

    /// Positions an item centered in the view, a convenience for dialog
    /// content.
    pub fn center_in_view(&mut self, item: ItemId) {
        let view = self.scene.view_rect();
        let bounds = self.scene.item_bounds(item);
        self.scene.set_pos(
            item,
            Point::new(
                (view.width() - bounds.width()) / 2.0,
                (view.height() - bounds.height()) / 2.0,
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use kurbo::Rect;

    use super::*;
    use crate::event::{InputEvent, ItemEvent, PointerButton, handler};
    use crate::stage::Background;
    use crate::testutil::TestSurface;

    fn stage() -> Stage<TestSurface> {
        Stage::new(600, 450, Background::Color(Rgba::BLACK))
    }

    fn fill_item(s: &mut Stage<TestSurface>, layer: LayerId, rect: Rect) -> ItemId {
        let item = s.scene.create_fill(rect, Some(Rgba::WHITE), None);
        s.add_item(layer, item);
        item
    }

    fn press(x: f64, y: f64) -> InputEvent {
        InputEvent::ButtonDown {
            x,
            y,
            button: PointerButton::Primary,
        }
    }

    #[test]
    fn dialog_scopes_hit_testing_to_itself_and_above() {
        let mut s = stage();
        let base = s.scene.create_layer();
        s.add_layer(base, None);
        let base_item = fill_item(&mut s, base, Rect::new(0.0, 0.0, 600.0, 450.0));

        let dialog = s.scene.create_layer();
        let dialog_item = s
            .scene
            .create_fill(Rect::new(200.0, 150.0, 400.0, 300.0), Some(Rgba::WHITE), None);
        s.scene.add_to_layer(dialog, dialog_item, None);
        s.show_dialog(dialog, None, None, false);

        assert_eq!(s.hit_test(250.0, 200.0), Some(dialog_item));
        assert_eq!(
            s.hit_test(50.0, 50.0),
            None,
            "outside the dialog, layers below must not hit"
        );

        s.close_dialog(dialog);
        assert_eq!(s.hit_test(50.0, 50.0), Some(base_item));
    }

    #[test]
    fn hidden_base_layers_stay_unhittable_while_dialog_open() {
        let mut s = stage();
        let base = s.scene.create_layer();
        s.add_layer(base, None);
        let _base_item = fill_item(&mut s, base, Rect::new(0.0, 0.0, 600.0, 450.0));

        let dialog = s.scene.create_layer();
        let dialog_item = s
            .scene
            .create_fill(Rect::new(200.0, 150.0, 400.0, 300.0), Some(Rgba::WHITE), None);
        s.scene.add_to_layer(dialog, dialog_item, None);
        s.show_dialog(dialog, None, None, false);

        s.scene.set_layer_visible(base, false);
        assert_eq!(s.hit_test(50.0, 50.0), None);
        assert_eq!(s.hit_test(250.0, 200.0), Some(dialog_item));
    }

    #[test]
    fn nested_dialogs_narrow_the_scope() {
        let mut s = stage();
        let base = s.scene.create_layer();
        s.add_layer(base, None);
        let _ = fill_item(&mut s, base, Rect::new(0.0, 0.0, 600.0, 450.0));

        let first = s.scene.create_layer();
        let first_item = s
            .scene
            .create_fill(Rect::new(0.0, 0.0, 600.0, 450.0), Some(Rgba::WHITE), None);
        s.scene.add_to_layer(first, first_item, None);
        s.show_dialog(first, None, None, false);

        let second = s.scene.create_layer();
        let second_item = s
            .scene
            .create_fill(Rect::new(200.0, 150.0, 400.0, 300.0), Some(Rgba::WHITE), None);
        s.scene.add_to_layer(second, second_item, None);
        s.show_dialog(second, None, None, false);

        assert_eq!(s.hit_test(250.0, 200.0), Some(second_item));
        assert_eq!(
            s.hit_test(50.0, 50.0),
            None,
            "the first dialog is no longer in scope"
        );

        s.close_dialog(second);
        assert_eq!(s.hit_test(50.0, 50.0), Some(first_item));
    }

    #[test]
    fn dialog_handler_receives_unhandled_events() {
        let mut s = stage();
        let base = s.scene.create_layer();
        s.add_layer(base, None);
        let base_item = fill_item(&mut s, base, Rect::new(0.0, 0.0, 600.0, 450.0));

        let base_presses = Rc::new(RefCell::new(0));
        let base_presses2 = base_presses.clone();
        s.scene.add_handler(
            base_item,
            ItemEvent::Press,
            handler(move |_, _, _| {
                *base_presses2.borrow_mut() += 1;
                true
            }),
        );

        let stage_events = Rc::new(RefCell::new(0));
        let stage_events2 = stage_events.clone();
        s.set_fallback_handler(Some(crate::event::fallback_handler(move |_, _| {
            *stage_events2.borrow_mut() += 1;
        })));

        let dialog_events = Rc::new(RefCell::new(0));
        let dialog_events2 = dialog_events.clone();
        let dialog = s.scene.create_layer();
        s.show_dialog(
            dialog,
            Some(crate::event::fallback_handler(move |_, _| {
                *dialog_events2.borrow_mut() += 1;
            })),
            None,
            false,
        );

        s.dispatch(press(50.0, 50.0));
        assert_eq!(*base_presses.borrow(), 0, "base item is out of scope");
        assert_eq!(*dialog_events.borrow(), 1, "dialog handler sees the event");
        assert_eq!(*stage_events.borrow(), 0, "stage fallback is shadowed");

        s.close_dialog(dialog);
        s.dispatch(press(50.0, 50.0));
        assert_eq!(*base_presses.borrow(), 1);
        assert_eq!(*stage_events.borrow(), 1);
    }

    #[test]
    fn backdrop_layer_is_created_and_removed() {
        let mut s = stage();
        let base = s.scene.create_layer();
        s.add_layer(base, None);

        let dialog = s.scene.create_layer();
        s.show_dialog(dialog, None, Some(Rgba::new(0, 0, 0, 180)), false);
        assert_eq!(s.layer_order().len(), 3, "base + backdrop + dialog");

        s.close_dialog(dialog);
        assert_eq!(s.layer_order().len(), 1, "only the base layer remains");
    }

    #[test]
    fn close_removes_layers_added_after_the_dialog() {
        let mut s = stage();
        let base = s.scene.create_layer();
        s.add_layer(base, None);

        let dialog = s.scene.create_layer();
        s.show_dialog(dialog, None, None, false);
        let extra = s.scene.create_layer();
        s.add_layer(extra, None);

        s.close_dialog(dialog);
        let remaining: Vec<LayerId> = s.layer_order();
        assert_eq!(remaining, vec![base]);
        assert!(!s.has_open_dialog());
    }

    #[test]
    fn prerender_boundary_moves_and_restores() {
        let mut s = stage();
        let a = s.scene.create_layer();
        let b = s.scene.create_layer();
        s.add_layer(a, None);
        s.add_layer(b, None);
        s.set_prerender_boundary(Some(a));

        let dialog = s.scene.create_layer();
        s.show_dialog(dialog, None, None, true);
        assert_eq!(s.prerender_boundary(), Some(b), "boundary moved to the top");

        s.close_dialog(dialog);
        assert_eq!(s.prerender_boundary(), Some(a), "previous boundary restored");
    }

    #[test]
    fn focus_is_released_when_its_layer_goes_with_the_dialog() {
        let mut s = stage();
        let base = s.scene.create_layer();
        s.add_layer(base, None);

        let dialog = s.scene.create_layer();
        let field = s
            .scene
            .create_fill(Rect::new(10.0, 10.0, 60.0, 30.0), Some(Rgba::WHITE), None);
        s.scene.add_to_layer(dialog, field, None);
        s.show_dialog(dialog, None, None, false);
        s.set_focus(Some(field), None);

        s.close_dialog(dialog);
        assert_eq!(s.focused_item(), None);
    }
}
