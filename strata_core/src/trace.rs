// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame loop.
//!
//! [`TraceSink`] has a no-op default method per event, so sinks
//! implement only what they care about. [`Tracer`] wraps an optional
//! boxed sink: with the `trace` feature **off**, every `Tracer` method
//! compiles to nothing; with it **on**, each method performs a single
//! `Option` branch before dispatching.
//!
//! The recording/export tooling lives in the `strata_debug` crate.

use crate::event::ItemEvent;
use crate::time::{Duration, Instant};

/// Emitted at the top of [`Stage::render`](crate::stage::Stage::render).
#[derive(Clone, Copy, Debug)]
pub struct FrameBeginEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// The time the frame renders at.
    pub now: Instant,
    /// Time since the previous frame (zero on the first).
    pub frame_delta: Duration,
}

/// Emitted for each timer invocation.
#[derive(Clone, Copy, Debug)]
pub struct TimerFireEvent<'a> {
    /// The timer's key.
    pub key: &'a str,
    /// The frame time the fire was observed at.
    pub at: Instant,
}

/// Emitted after an item event finished dispatching.
#[derive(Clone, Copy, Debug)]
pub struct DispatchEvent {
    /// The event kind.
    pub event: ItemEvent,
    /// Whether built-in behavior or a handler reported it handled.
    pub handled: bool,
}

/// Emitted at the bottom of `render` with the frame's damage.
#[derive(Clone, Copy, Debug)]
pub struct FrameEndEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Number of dirty rectangles handed to the present call.
    pub dirty_rects: usize,
    /// Total dirty area in square pixels.
    pub dirty_area: f64,
}

/// Receives trace events from the frame loop.
pub trait TraceSink {
    /// Called when a frame starts rendering.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called for each timer invocation.
    fn on_timer_fire(&mut self, e: &TimerFireEvent<'_>) {
        _ = e;
    }

    /// Called after an item event dispatch.
    fn on_dispatch(&mut self, e: &DispatchEvent) {
        _ = e;
    }

    /// Called when a frame finishes rendering.
    fn on_frame_end(&mut self, e: &FrameEndEvent) {
        _ = e;
    }
}

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

/// Thin wrapper around an optional [`TraceSink`].
///
/// With the `trace` feature off, every method compiles to nothing.
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<alloc::boxed::Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Tracer {
    /// Creates a tracer dispatching to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: alloc::boxed::Box<dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {}
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TimerFireEvent`].
    #[inline]
    pub fn timer_fire(&mut self, e: &TimerFireEvent<'_>) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_timer_fire(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DispatchEvent`].
    #[inline]
    pub fn dispatch(&mut self, e: &DispatchEvent) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_dispatch(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameEndEvent`].
    #[inline]
    pub fn frame_end(&mut self, e: &FrameEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}
