// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording and export tooling for strata frame-loop diagnostics.
//!
//! [`RecorderSink`] implements
//! [`TraceSink`](strata_core::trace::TraceSink) and encodes events into
//! a compact binary buffer; [`decode`] reads them back; [`json`] turns
//! recordings into JSON lines for external tooling.

mod json;
mod recorder;

pub use json::to_json_lines;
pub use recorder::{RecordedEvent, RecorderSink, decode};
