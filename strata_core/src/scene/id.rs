// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Item and layer identity types.

use core::fmt;

/// Sentinel value indicating "no item" or "no layer" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to an item in a [`Scene`](super::Scene).
///
/// Contains both a slot index and a generation counter so that stale
/// handles are detected after an item is destroyed and the slot reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId {
    /// Slot index into the scene's item arrays.
    pub(crate) idx: u32,
    /// Generation counter, matched against the slot's generation.
    pub(crate) generation: u32,
}

impl ItemId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({}@gen{})", self.idx, self.generation)
    }
}

/// A handle to a layer in a [`Scene`](super::Scene).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId {
    /// Slot index into the scene's layer arrays.
    pub(crate) idx: u32,
    /// Generation counter, matched against the slot's generation.
    pub(crate) generation: u32,
}

impl LayerId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({}@gen{})", self.idx, self.generation)
    }
}
