// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON-lines export of decoded recordings.

use serde_json::json;

use crate::recorder::RecordedEvent;

/// Renders a recording as one JSON object per line, suitable for
/// `jq`-style tooling or log ingestion.
#[must_use]
pub fn to_json_lines(events: impl IntoIterator<Item = RecordedEvent>) -> String {
    let mut out = String::new();
    for event in events {
        let value = match event {
            RecordedEvent::FrameBegin {
                frame_index,
                now_ms,
                delta_ms,
            } => json!({
                "type": "frame_begin",
                "frame": frame_index,
                "now_ms": now_ms,
                "delta_ms": delta_ms,
            }),
            RecordedEvent::TimerFire { at_ms, key } => json!({
                "type": "timer_fire",
                "at_ms": at_ms,
                "key": key,
            }),
            RecordedEvent::Dispatch { event, handled } => json!({
                "type": "dispatch",
                "event": format!("{event:?}"),
                "handled": handled,
            }),
            RecordedEvent::FrameEnd {
                frame_index,
                dirty_rects,
                dirty_area,
            } => json!({
                "type": "frame_end",
                "frame": frame_index,
                "dirty_rects": dirty_rects,
                "dirty_area": dirty_area,
            }),
        };
        out.push_str(&value.to_string());
        out.push('\n');
    }
    out
}
