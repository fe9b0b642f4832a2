// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input dispatch: hit testing, routed events, pointer-over tracking,
//! focus, and pointer capture.
//!
//! # Scoping
//!
//! Hit testing honors the UI lock (no items hit while locked) and the
//! modal-dialog stack: with dialogs open, only the topmost dialog's
//! layer and layers staged after it are eligible, so nested dialogs
//! narrow the scope further.
//!
//! # Routed events
//!
//! `Press`, `Click`, `DoubleClick` and `MouseMove` walk the hit stack
//! topmost-first and stop at the first item reporting the event handled.
//! `Click` is synthesized on primary release when the hit stack equals
//! the stack recorded at press time; `DoubleClick` fires on a second
//! press inside a fixed window of the first.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;

use kurbo::Point;

use crate::event::{
    CaptureHandler, EventArgs, FallbackHandler, InputEvent, ItemEvent, PointerButton,
};
use crate::scene::ItemId;
use crate::surface::Surface;
use crate::time::Duration;
use crate::trace::DispatchEvent;

use super::Stage;

/// Maximum time between two primary presses treated as a double click.
pub const DOUBLE_CLICK_WINDOW: Duration = Duration(500);

impl<S: Surface> Stage<S> {
    // -- Entry point -----------------------------------------------------

    /// Feeds one input event through the stage.
    ///
    /// Pointer events hit-test and route to items; key events go to the
    /// focused item first. Whatever the items leave unhandled reaches
    /// the active fallback: the topmost dialog's handler while dialogs
    /// are open, the stage handler otherwise, and nothing while the UI
    /// is locked.
    pub fn dispatch(&mut self, event: InputEvent) {
        let mut consumed = false;
        match &event {
            InputEvent::PointerMoved {
                x, y, buttons, ..
            } => {
                self.pointer = Point::new(*x, *y);
                self.pointer_buttons = *buttons;
                self.set_window_active(true);
                self.on_pointer_moved(*x, *y);
            }
            InputEvent::ButtonDown { x, y, button } => {
                self.pointer = Point::new(*x, *y);
                if *button == PointerButton::Primary {
                    self.pointer_buttons.primary = true;
                    self.on_primary_down(*x, *y);
                }
            }
            InputEvent::ButtonUp { x, y, button } => {
                self.pointer = Point::new(*x, *y);
                if *button == PointerButton::Primary {
                    self.pointer_buttons.primary = false;
                    self.on_primary_up(*x, *y);
                }
            }
            InputEvent::KeyDown { code, mods } => {
                consumed = self.fire_focused(
                    ItemEvent::KeyDown,
                    &EventArgs::Key {
                        code: *code,
                        mods: *mods,
                    },
                );
            }
            InputEvent::KeyUp { code, mods } => {
                consumed = self.fire_focused(
                    ItemEvent::KeyUp,
                    &EventArgs::Key {
                        code: *code,
                        mods: *mods,
                    },
                );
            }
            InputEvent::WindowActive { active } => {
                self.set_window_active(*active);
            }
            InputEvent::Quit => {
                self.quit_requested = true;
                consumed = true;
            }
        }

        if !consumed
            && let Some(handler) = self.active_fallback()
        {
            (handler.borrow_mut())(self, &event);
        }
    }

    /// The handler receiving events items left unhandled: none while
    /// locked, the topmost dialog's handler while dialogs are open, the
    /// stage's own fallback otherwise.
    fn active_fallback(&self) -> Option<FallbackHandler<S>> {
        if self.locks > 0 {
            return None;
        }
        match self.dialogs.last() {
            Some(dialog) => dialog.handler.clone(),
            None => self.fallback.clone(),
        }
    }

    // -- Hit testing -----------------------------------------------------

    /// The stack of items under the point, topmost first.
    ///
    /// Empty while the UI is locked. With dialogs open, only the topmost
    /// dialog's layer and layers staged after it take part.
    pub fn hit_test_stack(&mut self, x: f64, y: f64) -> Vec<ItemId> {
        self.resolve_iso_pending();
        let mut stack = Vec::new();
        if self.locks > 0 {
            return stack;
        }
        let start = match self.dialogs.last() {
            Some(dialog) => self
                .order
                .iter()
                .position(|&slot| slot == dialog.layer)
                .unwrap_or(0),
            None => 0,
        };
        for &slot in &self.order[start..] {
            let layer = self.scene.layer_id_at(slot);
            if !self.scene.layer_visible(layer) || !self.scene.is_inside_clip(layer, x, y) {
                continue;
            }
            for item in self.scene.layer_items(layer) {
                if self.scene.item_visible(item) && self.scene.is_over(item, x, y) {
                    stack.push(item);
                }
            }
        }
        stack.reverse();
        stack
    }

    /// The topmost item under the point, if any.
    pub fn hit_test(&mut self, x: f64, y: f64) -> Option<ItemId> {
        self.hit_test_stack(x, y).first().copied()
    }

    // -- Pointer-over tracking -------------------------------------------

    /// Forces a pointer-over recomputation on the next frame (after
    /// items or layers changed under a stationary pointer).
    pub fn update_mouse(&mut self) {
        self.pointer_refresh = true;
    }

    /// The item currently under the pointer. Only items interested in
    /// enter/leave events are eligible.
    #[must_use]
    pub fn over_item(&self) -> Option<ItemId> {
        self.over_item
    }

    /// Recomputes the pointer-over item, firing `MouseLeave`/`MouseEnter`
    /// on the transition. Returns the full hit stack, topmost first.
    pub(crate) fn refresh_over_item(&mut self) -> Vec<ItemId> {
        let (x, y) = (self.pointer.x, self.pointer.y);
        let stack = self.hit_test_stack(x, y);

        let mut new_over = stack
            .iter()
            .copied()
            .find(|item| self.scene.wants_enter_leave(item.idx));

        // While captures are active, enter/leave stays confined to the
        // capturing items.
        if !self.captures.is_empty()
            && let Some(candidate) = new_over
            && !self.captures.iter().any(|(item, _)| *item == candidate)
        {
            new_over = None;
        }

        if self.over_item != new_over {
            let old = self.over_item.take();
            self.over_item = new_over;
            let args = EventArgs::Pointer { x, y };
            if let Some(old) = old {
                self.fire(old, ItemEvent::MouseLeave, &args);
            }
            if let Some(new) = new_over {
                self.fire(new, ItemEvent::MouseEnter, &args);
            }
        }
        stack
    }

    // -- Pointer event handling ------------------------------------------

    fn on_pointer_moved(&mut self, x: f64, y: f64) {
        let stack = self.refresh_over_item();
        self.route(&stack, ItemEvent::MouseMove, &EventArgs::Pointer { x, y });

        if self.pointer_buttons.primary && !self.captures.is_empty() {
            let pos = Point::new(x, y);
            for (_, handler) in self.captures.clone() {
                (handler.borrow_mut())(self, pos, false);
            }
        }

        // The cursor item tracks the pointer on the next frame.
        self.update_mouse();
    }

    fn on_primary_down(&mut self, x: f64, y: f64) {
        let stack = self.hit_test_stack(x, y);

        if let Some(focused) = self.focused_item()
            && !stack.contains(&focused)
        {
            self.set_focus(None, None);
        }

        let now = self.clock();
        let double = match self.last_click {
            Some(at) => now.saturating_since(at) < DOUBLE_CLICK_WINDOW,
            None => false,
        };
        if double {
            self.last_click = None;
        } else {
            self.last_click = Some(now);
        }

        if !stack.is_empty() {
            let args = EventArgs::Pointer { x, y };
            self.route(&stack, ItemEvent::Press, &args);
            self.last_press_stack = stack.clone();
            if double {
                self.route(&stack, ItemEvent::DoubleClick, &args);
            }
        }
    }

    fn on_primary_up(&mut self, x: f64, y: f64) {
        let stack = self.hit_test_stack(x, y);
        if !stack.is_empty() && stack == self.last_press_stack {
            self.route(&stack, ItemEvent::Click, &EventArgs::Pointer { x, y });
        }

        if !self.captures.is_empty() {
            let pos = Point::new(x, y);
            let captures = core::mem::take(&mut self.captures);
            for (_, handler) in &captures {
                (handler.borrow_mut())(self, pos, true);
            }
            // Capture suppressed normal enter/leave routing; catch up.
            self.refresh_over_item();
        }
    }

    // -- Pointer capture -------------------------------------------------

    /// Registers a handler receiving every pointer motion while the
    /// primary button stays held, and a final call with `released =
    /// true` when it is let go — bypassing normal enter/leave routing.
    ///
    /// If the primary button is not held, the handler is invoked
    /// immediately with `released = true` and not registered.
    pub fn capture_pointer(&mut self, item: ItemId, handler: CaptureHandler<S>) {
        if !self.pointer_buttons.primary {
            let pos = self.pointer;
            (handler.borrow_mut())(self, pos, true);
            return;
        }
        let registered = self
            .captures
            .iter()
            .any(|(i, h)| *i == item && alloc::rc::Rc::ptr_eq(h, &handler));
        if !registered {
            self.captures.push((item, handler));
        }
    }

    /// The items currently holding a pointer capture.
    #[must_use]
    pub fn capturing_items(&self) -> Vec<ItemId> {
        self.captures.iter().map(|(item, _)| *item).collect()
    }

    // -- Focus -----------------------------------------------------------

    /// Moves keyboard focus. Focus is exclusive: the previous holder
    /// receives `LostFocus` first, then the new holder receives
    /// `GotFocus` with `data` installed as the focus payload. Setting
    /// focus to the current holder is a no-op.
    pub fn set_focus(&mut self, item: Option<ItemId>, data: Option<Box<dyn Any>>) {
        let old = self.focus.take();
        if old.as_ref().map(|record| record.item) == item {
            self.focus = old;
            return;
        }
        if let Some(record) = old {
            self.fire(record.item, ItemEvent::LostFocus, &EventArgs::None);
        }
        if let Some(item) = item {
            self.focus = Some(super::FocusRecord { item, data });
            self.fire(item, ItemEvent::GotFocus, &EventArgs::None);
        }
    }

    /// The focused item.
    #[must_use]
    pub fn focused_item(&self) -> Option<ItemId> {
        self.focus.as_ref().map(|record| record.item)
    }

    /// The focus payload supplied with [`set_focus`](Self::set_focus).
    #[must_use]
    pub fn focus_data(&self) -> Option<&dyn Any> {
        self.focus.as_ref().and_then(|record| record.data.as_deref())
    }

    fn fire_focused(&mut self, event: ItemEvent, args: &EventArgs) -> bool {
        match self.focused_item() {
            Some(item) => self.fire(item, event, args),
            None => false,
        }
    }

    // -- Firing ----------------------------------------------------------

    /// Fires an event on one item, running built-in behavior (rollover
    /// overlay and image swaps, pressed-image capture) and then every
    /// registered handler from a snapshot of the handler list.
    ///
    /// Returns whether the event was handled: `true` when built-in
    /// behavior consumed it or at least one handler returned `true`.
    /// Dead handles are ignored.
    pub fn fire(&mut self, item: ItemId, event: ItemEvent, args: &EventArgs) -> bool {
        if !self.scene.is_item_alive(item) {
            return false;
        }
        let mut handled = self.builtin_behavior(item, event);
        let handlers = self.scene.handler_snapshot(item.idx, event);
        for handler in handlers {
            if (handler.borrow_mut())(self, item, args) {
                handled = true;
            }
        }
        self.tracer.dispatch(&DispatchEvent { event, handled });
        handled
    }

    /// Walks a topmost-first stack, stopping at the first item that
    /// handles the event.
    pub(crate) fn route(&mut self, stack: &[ItemId], event: ItemEvent, args: &EventArgs) {
        for &item in stack {
            if self.fire(item, event, args) {
                break;
            }
        }
    }

    /// Rollover/pressed built-ins attached to item state rather than
    /// registered handlers.
    fn builtin_behavior(&mut self, item: ItemId, event: ItemEvent) -> bool {
        match event {
            ItemEvent::MouseEnter => {
                self.show_overlay(item);
                self.scene.apply_rollover_swap(item.idx);
                false
            }
            ItemEvent::MouseLeave => {
                self.hide_overlay(item);
                self.scene.remove_rollover_swap(item.idx);
                false
            }
            ItemEvent::Press => {
                if self.scene.apply_pressed_swap(item.idx) {
                    // Watch for the release anywhere on the stage.
                    let slot = item;
                    let restore: CaptureHandler<S> = alloc::rc::Rc::new(core::cell::RefCell::new(
                        move |stage: &mut Self, _pos: Point, released: bool| {
                            if released && stage.scene.is_item_alive(slot) {
                                stage.scene.restore_pressed_swap(slot.idx);
                            }
                        },
                    ));
                    self.capture_pointer(item, restore);
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// Adds the rollover overlay item to the host's layer, just under
    /// the host.
    fn show_overlay(&mut self, item: ItemId) {
        let Some(overlay) = self.scene.overlay_item(item) else {
            return;
        };
        let Some(layer) = self.scene.item_layer(item) else {
            return;
        };
        self.scene.reposition_overlay(item.idx);
        let index = self.scene.index_of(layer, item);
        self.scene.add_to_layer(layer, overlay, index);
        // While shown, the overlay follows its host through the BOUNDS
        // channel; the edge dies with either item's layer membership.
        let _ = self.scene.layer_tracker[layer.idx as usize].add_dependency(
            overlay.idx,
            item.idx,
            crate::dirty::BOUNDS,
        );
    }

    /// Removes the rollover overlay item from its layer.
    fn hide_overlay(&mut self, item: ItemId) {
        let Some(overlay) = self.scene.overlay_item(item) else {
            return;
        };
        if self.scene.item_layer(overlay).is_some() {
            self.scene.remove_from_layer(overlay);
        }
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
    use crate::event::{PointerButtons, handler};
    use crate::scene::LayerId;
    use crate::stage::Background;
    use crate::surface::Rgba;
    use crate::testutil::TestSurface;
    use crate::time::Instant;

    fn stage() -> Stage<TestSurface> {
        Stage::new(600, 450, Background::Color(Rgba::BLACK))
    }

    fn fill_item(s: &mut Stage<TestSurface>, layer: LayerId, rect: Rect) -> ItemId {
        let item = s.scene.create_fill(rect, Some(Rgba::WHITE), None);
        s.add_item(layer, item);
        item
    }

    fn motion(x: f64, y: f64) -> InputEvent {
        InputEvent::PointerMoved {
            x,
            y,
            buttons: PointerButtons::default(),
            dx: 0.0,
            dy: 0.0,
        }
    }

    fn press(x: f64, y: f64) -> InputEvent {
        InputEvent::ButtonDown {
            x,
            y,
            button: PointerButton::Primary,
        }
    }

    fn release(x: f64, y: f64) -> InputEvent {
        InputEvent::ButtonUp {
            x,
            y,
            button: PointerButton::Primary,
        }
    }

    fn render(stage: &mut Stage<TestSurface>, at: u64) {
        let mut target = TestSurface::create(600, 450);
        let _ = stage.render(&mut target, Instant(at));
    }

    /// Records which tags' handlers ran, in order.
    fn tagging(
        log: &Rc<RefCell<Vec<&'static str>>>,
        tag: &'static str,
        handled: bool,
    ) -> crate::event::Handler<TestSurface> {
        let log = log.clone();
        handler(move |_, _, _| {
            log.borrow_mut().push(tag);
            handled
        })
    }

    #[test]
    fn routed_click_stops_at_first_handler_reporting_handled() {
        let mut s = stage();
        let layer = s.scene.create_layer();
        s.add_layer(layer, None);
        let rect = Rect::new(0.0, 0.0, 50.0, 50.0);
        let a = fill_item(&mut s, layer, rect);
        let b = fill_item(&mut s, layer, rect);
        let c = fill_item(&mut s, layer, rect); // topmost

        let log = Rc::new(RefCell::new(Vec::new()));
        s.scene.add_handler(a, ItemEvent::Click, tagging(&log, "a", true));
        s.scene.add_handler(b, ItemEvent::Click, tagging(&log, "b", true));
        s.scene.add_handler(c, ItemEvent::Click, tagging(&log, "c", false));

        render(&mut s, 0);
        s.dispatch(press(10.0, 10.0));
        s.dispatch(release(10.0, 10.0));

        assert_eq!(
            *log.borrow(),
            vec!["c", "b"],
            "topmost first, stop at first handled, never reach a"
        );
    }

    #[test]
    fn press_and_click_require_matching_stacks() {
        let mut s = stage();
        let layer = s.scene.create_layer();
        s.add_layer(layer, None);
        let item = fill_item(&mut s, layer, Rect::new(0.0, 0.0, 20.0, 20.0));

        let clicks = Rc::new(RefCell::new(0));
        let clicks2 = clicks.clone();
        s.scene.add_handler(
            item,
            ItemEvent::Click,
            handler(move |_, _, _| {
                *clicks2.borrow_mut() += 1;
                true
            }),
        );

        render(&mut s, 0);
        s.dispatch(press(5.0, 5.0));
        s.dispatch(release(100.0, 100.0)); // released elsewhere
        assert_eq!(*clicks.borrow(), 0, "stacks differ: no click");

        s.dispatch(press(5.0, 5.0));
        s.dispatch(release(6.0, 6.0)); // same stack
        assert_eq!(*clicks.borrow(), 1);
    }

    #[test]
    fn double_click_window_resets_on_late_press() {
        let mut s = stage();
        let layer = s.scene.create_layer();
        s.add_layer(layer, None);
        let item = fill_item(&mut s, layer, Rect::new(0.0, 0.0, 20.0, 20.0));

        let doubles = Rc::new(RefCell::new(0));
        let doubles2 = doubles.clone();
        s.scene.add_handler(
            item,
            ItemEvent::DoubleClick,
            handler(move |_, _, _| {
                *doubles2.borrow_mut() += 1;
                true
            }),
        );

        render(&mut s, 0);
        s.dispatch(press(5.0, 5.0));
        render(&mut s, 100);
        s.dispatch(press(5.0, 5.0)); // within 500ms
        assert_eq!(*doubles.borrow(), 1);

        render(&mut s, 1000);
        s.dispatch(press(5.0, 5.0)); // outside the window: resets
        assert_eq!(*doubles.borrow(), 1);
        render(&mut s, 1100);
        s.dispatch(press(5.0, 5.0));
        assert_eq!(*doubles.borrow(), 2);
    }

    #[test]
    fn enter_and_leave_fire_on_over_transitions() {
        let mut s = stage();
        let layer = s.scene.create_layer();
        s.add_layer(layer, None);
        let item = fill_item(&mut s, layer, Rect::new(0.0, 0.0, 20.0, 20.0));

        let log = Rc::new(RefCell::new(Vec::new()));
        s.scene
            .add_handler(item, ItemEvent::MouseEnter, tagging(&log, "enter", true));
        s.scene
            .add_handler(item, ItemEvent::MouseLeave, tagging(&log, "leave", true));

        s.dispatch(motion(5.0, 5.0));
        s.dispatch(motion(6.0, 6.0)); // still inside: no re-enter
        s.dispatch(motion(100.0, 100.0));
        assert_eq!(*log.borrow(), vec!["enter", "leave"]);
    }

    #[test]
    fn items_without_enter_leave_interest_are_not_over_candidates() {
        let mut s = stage();
        let layer = s.scene.create_layer();
        s.add_layer(layer, None);
        let below = fill_item(&mut s, layer, Rect::new(0.0, 0.0, 20.0, 20.0));
        let top = fill_item(&mut s, layer, Rect::new(0.0, 0.0, 20.0, 20.0));

        let log = Rc::new(RefCell::new(Vec::new()));
        s.scene
            .add_handler(below, ItemEvent::MouseEnter, tagging(&log, "below", true));
        // `top` registers nothing: it must not shadow `below`.
        let _ = top;

        s.dispatch(motion(5.0, 5.0));
        assert_eq!(s.over_item(), Some(below));
        assert_eq!(*log.borrow(), vec!["below"]);
    }

    #[test]
    fn ui_lock_suppresses_hit_testing() {
        let mut s = stage();
        let layer = s.scene.create_layer();
        s.add_layer(layer, None);
        let item = fill_item(&mut s, layer, Rect::new(0.0, 0.0, 20.0, 20.0));

        let log = Rc::new(RefCell::new(Vec::new()));
        s.scene
            .add_handler(item, ItemEvent::Press, tagging(&log, "press", true));

        s.lock_ui();
        s.dispatch(press(5.0, 5.0));
        assert!(log.borrow().is_empty(), "locked UI must not dispatch");
        assert!(s.hit_test(5.0, 5.0).is_none());

        s.unlock_ui();
        s.dispatch(press(5.0, 5.0));
        assert_eq!(*log.borrow(), vec!["press"]);
    }

    #[test]
    fn focus_transition_fires_lost_then_got() {
        let mut s = stage();
        let layer = s.scene.create_layer();
        s.add_layer(layer, None);
        let first = fill_item(&mut s, layer, Rect::new(0.0, 0.0, 10.0, 10.0));
        let second = fill_item(&mut s, layer, Rect::new(20.0, 0.0, 30.0, 10.0));

        let log = Rc::new(RefCell::new(Vec::new()));
        s.scene
            .add_handler(first, ItemEvent::LostFocus, tagging(&log, "lost", true));
        s.scene
            .add_handler(second, ItemEvent::GotFocus, tagging(&log, "got", true));

        s.set_focus(Some(first), None);
        s.set_focus(Some(second), Some(alloc::boxed::Box::new(42_u8)));
        assert_eq!(*log.borrow(), vec!["lost", "got"]);
        assert_eq!(s.focused_item(), Some(second));
        assert_eq!(
            s.focus_data().and_then(|d| d.downcast_ref::<u8>()),
            Some(&42)
        );

        // Re-focusing the holder is a no-op keeping the payload.
        s.set_focus(Some(second), None);
        assert_eq!(
            s.focus_data().and_then(|d| d.downcast_ref::<u8>()),
            Some(&42)
        );
    }

    #[test]
    fn key_events_reach_the_focused_item_first() {
        let mut s = stage();
        let layer = s.scene.create_layer();
        s.add_layer(layer, None);
        let item = fill_item(&mut s, layer, Rect::new(0.0, 0.0, 10.0, 10.0));

        let keys = Rc::new(RefCell::new(0));
        let keys2 = keys.clone();
        s.scene.add_handler(
            item,
            ItemEvent::KeyDown,
            handler(move |_, _, args| {
                assert!(matches!(args, EventArgs::Key { code: 13, .. }));
                *keys2.borrow_mut() += 1;
                true
            }),
        );
        let fallback_hits = Rc::new(RefCell::new(0));
        let fallback_hits2 = fallback_hits.clone();
        s.set_fallback_handler(Some(crate::event::fallback_handler(move |_, _| {
            *fallback_hits2.borrow_mut() += 1;
        })));

        s.set_focus(Some(item), None);
        s.dispatch(InputEvent::KeyDown {
            code: 13,
            mods: Default::default(),
        });
        assert_eq!(*keys.borrow(), 1);
        assert_eq!(
            *fallback_hits.borrow(),
            0,
            "handled key must not reach the fallback"
        );

        s.set_focus(None, None);
        s.dispatch(InputEvent::KeyDown {
            code: 13,
            mods: Default::default(),
        });
        assert_eq!(*keys.borrow(), 1);
        assert_eq!(*fallback_hits.borrow(), 1);
    }

    #[test]
    fn press_outside_focused_item_clears_focus() {
        let mut s = stage();
        let layer = s.scene.create_layer();
        s.add_layer(layer, None);
        let item = fill_item(&mut s, layer, Rect::new(0.0, 0.0, 10.0, 10.0));
        s.set_focus(Some(item), None);
        render(&mut s, 0);

        s.dispatch(press(300.0, 300.0));
        assert_eq!(s.focused_item(), None);
    }

    #[test]
    fn capture_receives_motion_and_release_then_clears() {
        let mut s = stage();
        let layer = s.scene.create_layer();
        s.add_layer(layer, None);
        let item = fill_item(&mut s, layer, Rect::new(0.0, 0.0, 10.0, 10.0));

        let log: Rc<RefCell<Vec<(f64, bool)>>> = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        let capture: CaptureHandler<TestSurface> =
            Rc::new(RefCell::new(move |_: &mut Stage<TestSurface>, pos: Point, released| {
                log2.borrow_mut().push((pos.x, released));
            }));

        s.dispatch(press(5.0, 5.0));
        s.capture_pointer(item, capture);
        s.dispatch(InputEvent::PointerMoved {
            x: 50.0,
            y: 5.0,
            buttons: PointerButtons {
                primary: true,
                ..Default::default()
            },
            dx: 45.0,
            dy: 0.0,
        });
        s.dispatch(release(60.0, 5.0));
        s.dispatch(InputEvent::PointerMoved {
            x: 70.0,
            y: 5.0,
            buttons: PointerButtons::default(),
            dx: 10.0,
            dy: 0.0,
        });

        assert_eq!(
            *log.borrow(),
            vec![(50.0, false), (60.0, true)],
            "motion while held, one release, nothing after"
        );
        assert!(s.capturing_items().is_empty(), "all captures cleared");
    }

    #[test]
    fn capture_without_button_held_releases_immediately() {
        let mut s = stage();
        let layer = s.scene.create_layer();
        s.add_layer(layer, None);
        let item = fill_item(&mut s, layer, Rect::new(0.0, 0.0, 10.0, 10.0));

        let log: Rc<RefCell<Vec<bool>>> = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        let capture: CaptureHandler<TestSurface> =
            Rc::new(RefCell::new(move |_: &mut Stage<TestSurface>, _: Point, released| {
                log2.borrow_mut().push(released);
            }));
        s.capture_pointer(item, capture);
        assert_eq!(*log.borrow(), vec![true]);
        assert!(s.capturing_items().is_empty());
    }

    #[test]
    fn handler_returning_false_keeps_propagating() {
        let mut s = stage();
        let layer = s.scene.create_layer();
        s.add_layer(layer, None);
        let item = fill_item(&mut s, layer, Rect::new(0.0, 0.0, 10.0, 10.0));

        let log = Rc::new(RefCell::new(Vec::new()));
        s.scene
            .add_handler(item, ItemEvent::Press, tagging(&log, "first", false));
        s.scene
            .add_handler(item, ItemEvent::Press, tagging(&log, "second", true));

        let handled = s.fire(item, ItemEvent::Press, &EventArgs::None);
        assert!(handled, "one true is enough");
        assert_eq!(*log.borrow(), vec!["first", "second"], "all handlers run");
    }

    fn current_image(s: &Stage<TestSurface>, item: ItemId) -> Rc<TestSurface> {
        match &s.scene.content[item.index() as usize] {
            crate::scene::ItemContent::Image(img) => img.source.clone(),
            other => panic!("expected an image item, got {other:?}"),
        }
    }

    #[test]
    fn pressed_image_swaps_until_release_anywhere() {
        let mut s = stage();
        let layer = s.scene.create_layer();
        s.add_layer(layer, None);
        let normal = Rc::new(TestSurface::opaque(20, 20));
        let pressed_img = Rc::new(TestSurface::opaque(20, 20));
        let item = s.scene.create_image(kurbo::Point::ZERO, normal.clone());
        s.add_item(layer, item);
        s.scene.set_pressed_image(item, Some(pressed_img.clone()));
        render(&mut s, 0);

        s.dispatch(press(5.0, 5.0));
        assert!(
            Rc::ptr_eq(&current_image(&s, item), &pressed_img),
            "press swaps the image in"
        );
        assert_eq!(s.capturing_items(), vec![item], "release is watched");

        s.dispatch(release(500.0, 300.0)); // released far away
        assert!(
            Rc::ptr_eq(&current_image(&s, item), &normal),
            "release anywhere restores the image"
        );
    }

    #[test]
    fn rollover_image_swaps_on_enter_and_leave() {
        let mut s = stage();
        let layer = s.scene.create_layer();
        s.add_layer(layer, None);
        let normal = Rc::new(TestSurface::opaque(20, 20));
        let hover = Rc::new(TestSurface::opaque(20, 20));
        let item = s.scene.create_image(kurbo::Point::ZERO, normal.clone());
        s.add_item(layer, item);
        s.scene.set_rollover_image(item, Some(hover.clone()));

        s.dispatch(motion(5.0, 5.0));
        assert_eq!(s.over_item(), Some(item), "rollover makes the item eligible");
        assert!(Rc::ptr_eq(&current_image(&s, item), &hover));

        s.dispatch(motion(200.0, 200.0));
        assert!(Rc::ptr_eq(&current_image(&s, item), &normal));
    }

    #[test]
    fn rollover_overlay_shows_under_item_while_hovered() {
        let mut s = stage();
        let layer = s.scene.create_layer();
        s.add_layer(layer, None);
        let item = s
            .scene
            .create_image(kurbo::Point::new(10.0, 10.0), Rc::new(TestSurface::opaque(20, 20)));
        s.add_item(layer, item);
        s.scene
            .set_overlay(item, Rc::new(TestSurface::opaque(30, 30)), None, None);
        let overlay = s.scene.overlay_item(item).expect("overlay installed");

        s.dispatch(motion(15.0, 15.0));
        assert_eq!(s.scene.item_layer(overlay), Some(layer));
        assert_eq!(
            s.scene.index_of(layer, overlay),
            Some(0),
            "overlay sits just under its host"
        );

        s.dispatch(motion(200.0, 200.0));
        assert_eq!(s.scene.item_layer(overlay), None, "hidden on leave");
    }

    #[test]
    fn quit_request_is_latched() {
        let mut s = stage();
        assert!(!s.quit_requested());
        s.dispatch(InputEvent::Quit);
        assert!(s.quit_requested());
    }

    #[test]
    fn removing_item_clears_stage_references() {
        let mut s = stage();
        let layer = s.scene.create_layer();
        s.add_layer(layer, None);
        let item = fill_item(&mut s, layer, Rect::new(0.0, 0.0, 10.0, 10.0));
        s.scene
            .add_handler(item, ItemEvent::MouseEnter, handler(|_, _, _| true));

        s.dispatch(motion(5.0, 5.0));
        s.set_focus(Some(item), None);
        assert_eq!(s.over_item(), Some(item));

        s.remove_item(item);
        assert_eq!(s.over_item(), None);
        assert_eq!(s.focused_item(), None);
        assert!(s.hit_test(5.0, 5.0).is_none());
    }
}
