// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as tag-byte + little-endian records; timer keys are
//! length-prefixed UTF-8. [`decode`] reads them back as an iterator of
//! [`RecordedEvent`].

use strata_core::event::ItemEvent;
use strata_core::trace::{
    DispatchEvent, FrameBeginEvent, FrameEndEvent, TimerFireEvent, TraceSink,
};

const TAG_FRAME_BEGIN: u8 = 1;
const TAG_TIMER_FIRE: u8 = 2;
const TAG_DISPATCH: u8 = 3;
const TAG_FRAME_END: u8 = 4;

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_str(&mut self, s: &str) {
        let bytes = s.as_bytes();
        #[expect(
            clippy::cast_possible_truncation,
            reason = "timer keys are short; longer keys are truncated at 64 KiB"
        )]
        let len = bytes.len().min(u16::MAX as usize) as u16;
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(&bytes[..len as usize]);
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.write_u8(TAG_FRAME_BEGIN);
        self.write_u64(e.frame_index);
        self.write_u64(e.now.as_millis());
        self.write_u64(e.frame_delta.as_millis());
    }

    fn on_timer_fire(&mut self, e: &TimerFireEvent<'_>) {
        self.write_u8(TAG_TIMER_FIRE);
        self.write_u64(e.at.as_millis());
        self.write_str(e.key);
    }

    fn on_dispatch(&mut self, e: &DispatchEvent) {
        self.write_u8(TAG_DISPATCH);
        self.write_u8(event_code(e.event));
        self.write_u8(u8::from(e.handled));
    }

    fn on_frame_end(&mut self, e: &FrameEndEvent) {
        self.write_u8(TAG_FRAME_END);
        self.write_u64(e.frame_index);
        self.write_u64(e.dirty_rects as u64);
        self.write_f64(e.dirty_area);
    }
}

fn event_code(event: ItemEvent) -> u8 {
    match event {
        ItemEvent::Click => 0,
        ItemEvent::DoubleClick => 1,
        ItemEvent::MouseEnter => 2,
        ItemEvent::MouseLeave => 3,
        ItemEvent::MouseMove => 4,
        ItemEvent::GotFocus => 5,
        ItemEvent::LostFocus => 6,
        ItemEvent::StateChanged => 7,
        ItemEvent::Press => 8,
        ItemEvent::KeyDown => 9,
        ItemEvent::KeyUp => 10,
    }
}

fn event_from_code(code: u8) -> Option<ItemEvent> {
    Some(match code {
        0 => ItemEvent::Click,
        1 => ItemEvent::DoubleClick,
        2 => ItemEvent::MouseEnter,
        3 => ItemEvent::MouseLeave,
        4 => ItemEvent::MouseMove,
        5 => ItemEvent::GotFocus,
        6 => ItemEvent::LostFocus,
        7 => ItemEvent::StateChanged,
        8 => ItemEvent::Press,
        9 => ItemEvent::KeyDown,
        10 => ItemEvent::KeyUp,
        _ => return None,
    })
}

/// A decoded trace record.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A frame began rendering.
    FrameBegin {
        /// Frame counter.
        frame_index: u64,
        /// Frame time in milliseconds.
        now_ms: u64,
        /// Delta since the previous frame.
        delta_ms: u64,
    },
    /// A timer fired.
    TimerFire {
        /// Frame time of the fire.
        at_ms: u64,
        /// Timer key.
        key: String,
    },
    /// An item event was dispatched.
    Dispatch {
        /// The event kind.
        event: ItemEvent,
        /// Whether anything handled it.
        handled: bool,
    },
    /// A frame finished rendering.
    FrameEnd {
        /// Frame counter.
        frame_index: u64,
        /// Dirty rectangles presented.
        dirty_rects: u64,
        /// Total dirty area in square pixels.
        dirty_area: f64,
    },
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn u8(&mut self) -> Option<u8> {
        let v = *self.buf.get(self.pos)?;
        self.pos += 1;
        Some(v)
    }

    fn u64(&mut self) -> Option<u64> {
        let bytes = self.buf.get(self.pos..self.pos + 8)?;
        self.pos += 8;
        Some(u64::from_le_bytes(bytes.try_into().ok()?))
    }

    fn f64(&mut self) -> Option<f64> {
        let bytes = self.buf.get(self.pos..self.pos + 8)?;
        self.pos += 8;
        Some(f64::from_le_bytes(bytes.try_into().ok()?))
    }

    fn string(&mut self) -> Option<String> {
        let bytes = self.buf.get(self.pos..self.pos + 2)?;
        let len = u16::from_le_bytes(bytes.try_into().ok()?) as usize;
        self.pos += 2;
        let raw = self.buf.get(self.pos..self.pos + len)?;
        self.pos += len;
        String::from_utf8(raw.to_vec()).ok()
    }
}

/// Decodes a recording. Stops at the first malformed record.
pub fn decode(bytes: &[u8]) -> impl Iterator<Item = RecordedEvent> + '_ {
    let mut reader = Reader { buf: bytes, pos: 0 };
    core::iter::from_fn(move || match reader.u8()? {
        TAG_FRAME_BEGIN => Some(RecordedEvent::FrameBegin {
            frame_index: reader.u64()?,
            now_ms: reader.u64()?,
            delta_ms: reader.u64()?,
        }),
        TAG_TIMER_FIRE => Some(RecordedEvent::TimerFire {
            at_ms: reader.u64()?,
            key: reader.string()?,
        }),
        TAG_DISPATCH => Some(RecordedEvent::Dispatch {
            event: event_from_code(reader.u8()?)?,
            handled: reader.u8()? != 0,
        }),
        TAG_FRAME_END => Some(RecordedEvent::FrameEnd {
            frame_index: reader.u64()?,
            dirty_rects: reader.u64()?,
            dirty_area: reader.f64()?,
        }),
        _ => None,
    })
}
