// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Millisecond time points and durations.
//!
//! The engine never reads a clock. The embedding delivers an [`Instant`]
//! with every frame (and the engine derives the frame delta from the
//! previous one), so tests and replays can drive time explicitly.
//!
//! [`Duration`] is a span in the same millisecond units. Arithmetic that
//! could overflow is offered in checked and saturating forms.

use core::fmt;
use core::ops::{Add, Sub};

/// A point in time, in milliseconds since an arbitrary epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Instant(pub u64);

impl Instant {
    /// Returns the raw millisecond value.
    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Returns the duration since an earlier instant, or zero if `earlier`
    /// is actually later.
    #[inline]
    #[must_use]
    pub const fn saturating_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    /// Checked addition of a duration.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, duration: Duration) -> Option<Self> {
        match self.0.checked_add(duration.0) {
            Some(t) => Some(Self(t)),
            None => None,
        }
    }
}

impl Add<Duration> for Instant {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub<Duration> for Instant {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Duration) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sub for Instant {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl fmt::Debug for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instant({}ms)", self.0)
    }
}

/// A span of time in milliseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Creates a duration from a millisecond count.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the raw millisecond value.
    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Returns the larger of `self` and `other`.
    #[inline]
    #[must_use]
    pub const fn max(self, other: Self) -> Self {
        if self.0 >= other.0 { self } else { other }
    }

    /// Saturating addition.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Add for Duration {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Duration {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({}ms)", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_duration_ops() {
        let t = Instant(1000);
        let d = Duration(200);
        assert_eq!((t + d).as_millis(), 1200);
        assert_eq!((t - d).as_millis(), 800);
        assert_eq!(Instant(1500) - t, Duration(500));
    }

    #[test]
    fn saturating_since_clamps_to_zero() {
        let t = Instant(1000);
        assert_eq!(t.saturating_since(Instant(1500)), Duration::ZERO);
        assert_eq!(t.saturating_since(Instant(400)), Duration(600));
    }

    #[test]
    fn checked_add_detects_overflow() {
        assert_eq!(Instant(u64::MAX).checked_add(Duration(1)), None);
        assert_eq!(Instant(1).checked_add(Duration(2)), Some(Instant(3)));
    }

    #[test]
    fn duration_saturating_arithmetic() {
        let a = Duration(100);
        assert_eq!(a.saturating_sub(Duration(200)), Duration::ZERO);
        assert_eq!(a.saturating_add(Duration(50)), Duration(150));
        assert_eq!(a.max(Duration(70)), a);
        assert_eq!(Duration(30).max(a), a);
    }
}
