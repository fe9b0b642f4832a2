// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Item events, event arguments, and raw input events.
//!
//! Two event vocabularies meet here:
//!
//! - [`InputEvent`] is what the embedding feeds into
//!   [`Stage::dispatch`](crate::stage::Stage::dispatch): pointer motion,
//!   button and key transitions, window activation, quit.
//!
//! - [`ItemEvent`] is what items observe. The stage synthesizes these
//!   from input (press/click/double-click, enter/leave) and from its own
//!   state machine (focus transitions, isometric state changes).
//!
//! # Routing
//!
//! [`Click`](ItemEvent::Click), [`Press`](ItemEvent::Press),
//! [`DoubleClick`](ItemEvent::DoubleClick) and
//! [`MouseMove`](ItemEvent::MouseMove) are *routed*: the stage walks the
//! hit stack topmost-first and stops at the first item whose handlers
//! report the event handled. A handler returns `false` to let the event
//! keep propagating; anything it does while running (adding handlers,
//! moving items, starting timers) is allowed because dispatch works on
//! snapshots.

use alloc::rc::Rc;
use core::cell::RefCell;

use crate::scene::ItemId;
use crate::stage::Stage;
use crate::surface::Surface;

/// Events that can be fired on an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemEvent {
    /// Primary button released over the same item stack it was pressed
    /// on. Routed.
    Click,
    /// Second primary press within the double-click window. Routed.
    DoubleClick,
    /// The item became the pointer-over item. Only items with an
    /// enter/leave handler are eligible.
    MouseEnter,
    /// The item stopped being the pointer-over item.
    MouseLeave,
    /// The pointer moved over the item. Routed.
    MouseMove,
    /// The item received focus.
    GotFocus,
    /// The item lost focus.
    LostFocus,
    /// An isometric cell item changed state.
    StateChanged,
    /// Primary button pressed over the item. Routed.
    Press,
    /// Key pressed while the item holds focus.
    KeyDown,
    /// Key released while the item holds focus.
    KeyUp,
}

impl ItemEvent {
    /// Returns whether this event walks the hit stack topmost-first.
    #[must_use]
    pub const fn is_routed(self) -> bool {
        matches!(
            self,
            Self::Click | Self::DoubleClick | Self::MouseMove | Self::Press
        )
    }
}

/// Pointer button identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerButton {
    /// The primary (usually left) button.
    Primary,
    /// The middle button.
    Middle,
    /// The secondary (usually right) button.
    Secondary,
}

/// Pointer button hold state carried by motion events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PointerButtons {
    /// Primary button held.
    pub primary: bool,
    /// Middle button held.
    pub middle: bool,
    /// Secondary button held.
    pub secondary: bool,
}

/// Keyboard modifier state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct KeyMods {
    /// A shift key is held.
    pub shift: bool,
    /// A control key is held.
    pub ctrl: bool,
    /// An alt key is held.
    pub alt: bool,
}

/// Arguments attached to a fired [`ItemEvent`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum EventArgs {
    /// No arguments (focus transitions).
    #[default]
    None,
    /// Pointer position in stage coordinates.
    Pointer {
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
    },
    /// Key identity and modifiers.
    Key {
        /// Platform key code.
        code: u32,
        /// Modifier state.
        mods: KeyMods,
    },
    /// Previous state of a cell item.
    StateChanged {
        /// The state the item left.
        previous: crate::iso::IsoState,
    },
}

/// Raw input consumed by [`Stage::dispatch`](crate::stage::Stage::dispatch).
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    /// The pointer moved.
    PointerMoved {
        /// New X coordinate in stage space.
        x: f64,
        /// New Y coordinate in stage space.
        y: f64,
        /// Buttons held during the motion.
        buttons: PointerButtons,
        /// Relative X motion.
        dx: f64,
        /// Relative Y motion.
        dy: f64,
    },
    /// A pointer button was pressed.
    ButtonDown {
        /// X coordinate of the press.
        x: f64,
        /// Y coordinate of the press.
        y: f64,
        /// Which button.
        button: PointerButton,
    },
    /// A pointer button was released.
    ButtonUp {
        /// X coordinate of the release.
        x: f64,
        /// Y coordinate of the release.
        y: f64,
        /// Which button.
        button: PointerButton,
    },
    /// A key was pressed.
    KeyDown {
        /// Platform key code.
        code: u32,
        /// Modifier state.
        mods: KeyMods,
    },
    /// A key was released.
    KeyUp {
        /// Platform key code.
        code: u32,
        /// Modifier state.
        mods: KeyMods,
    },
    /// The window gained or lost input focus.
    WindowActive {
        /// Whether the window is now active.
        active: bool,
    },
    /// The platform asked the application to quit.
    Quit,
}

/// An item event handler.
///
/// Returns `true` when the event is handled. For routed events a `false`
/// return lets the event continue down the hit stack.
pub type Handler<S> = Rc<RefCell<dyn FnMut(&mut Stage<S>, ItemId, &EventArgs) -> bool>>;

/// A pointer-capture handler: invoked with the pointer position for every
/// motion while the primary button stays held, and once more with
/// `released = true` when it is let go.
pub type CaptureHandler<S> = Rc<RefCell<dyn FnMut(&mut Stage<S>, kurbo::Point, bool)>>;

/// The input hook of a modal dialog (or of the stage itself): receives
/// events that neither the focused item nor routing consumed.
pub type FallbackHandler<S> = Rc<RefCell<dyn FnMut(&mut Stage<S>, &InputEvent)>>;

/// Wraps a closure as a [`Handler`].
pub fn handler<S, F>(f: F) -> Handler<S>
where
    S: Surface,
    F: FnMut(&mut Stage<S>, ItemId, &EventArgs) -> bool + 'static,
{
    Rc::new(RefCell::new(f))
}

/// Wraps a closure as a [`CaptureHandler`].
pub fn capture_handler<S, F>(f: F) -> CaptureHandler<S>
where
    S: Surface,
    F: FnMut(&mut Stage<S>, kurbo::Point, bool) + 'static,
{
    Rc::new(RefCell::new(f))
}

/// Wraps a closure as a [`FallbackHandler`].
pub fn fallback_handler<S, F>(f: F) -> FallbackHandler<S>
where
    S: Surface,
    F: FnMut(&mut Stage<S>, &InputEvent) + 'static,
{
    Rc::new(RefCell::new(f))
}
