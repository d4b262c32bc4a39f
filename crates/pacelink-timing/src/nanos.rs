use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::clock::monotonic_now_ns;

/// Nanoseconds on the process-local monotonic clock.
///
/// Not comparable across processes: each side of a link stamps with its own
/// clock and only deltas taken on the same side mean anything.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, Hash, PartialEq)]
pub struct Nanos(pub u64);

impl Nanos {
    pub const MAX: Nanos = Nanos(u64::MAX);
    pub const ZERO: Nanos = Nanos(0);

    #[inline]
    pub const fn from_secs(s: u64) -> Self {
        Nanos(s * 1_000_000_000)
    }

    #[inline]
    pub const fn from_millis(s: u64) -> Self {
        Nanos(s * 1_000_000)
    }

    #[inline]
    pub const fn from_micros(s: u64) -> Self {
        Nanos(s * 1_000)
    }

    #[inline]
    pub fn from_millis_f64(s: f64) -> Self {
        Nanos((s * 1_000_000.0).round() as u64)
    }

    #[inline]
    pub fn as_secs(&self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }

    #[inline]
    pub fn as_millis(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    #[inline]
    pub fn as_millis_u64(&self) -> u64 {
        self.0 / 1_000_000
    }

    #[inline]
    pub fn as_micros(&self) -> f64 {
        self.0 as f64 / 1_000.0
    }

    #[inline]
    pub fn now() -> Self {
        Nanos(monotonic_now_ns())
    }

    #[inline]
    pub fn saturating_sub(self, rhs: Nanos) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    #[inline]
    pub fn elapsed(&self) -> Self {
        Self::now().saturating_sub(*self)
    }

    #[inline]
    pub fn elapsed_since(&self, since: Self) -> Self {
        self.saturating_sub(since)
    }
}

impl std::fmt::Display for Nanos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self < Nanos::from_micros(1) {
            write!(f, "{}ns", self.0)
        } else if *self < Nanos::from_millis(1) {
            write!(f, "{}μs", self.0 as f64 / 1000.0)
        } else if *self < Nanos::from_secs(1) {
            write!(f, "{}ms", (self.0 / 1000) as f64 / 1000.0)
        } else {
            write!(f, "{:.3}s", self.as_secs())
        }
    }
}

impl From<u64> for Nanos {
    #[inline]
    fn from(value: u64) -> Self {
        Nanos(value)
    }
}

impl From<Nanos> for u64 {
    #[inline]
    fn from(value: Nanos) -> Self {
        value.0
    }
}

impl From<Nanos> for f64 {
    #[inline]
    fn from(value: Nanos) -> Self {
        value.0 as f64
    }
}

impl From<Nanos> for std::time::Duration {
    #[inline]
    fn from(value: Nanos) -> Self {
        std::time::Duration::from_nanos(value.0)
    }
}

impl Add for Nanos {
    type Output = Nanos;

    #[inline]
    fn add(self, rhs: Nanos) -> Nanos {
        Nanos(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for Nanos {
    #[inline]
    fn add_assign(&mut self, rhs: Nanos) {
        *self = *self + rhs;
    }
}

impl Sub for Nanos {
    type Output = Nanos;

    #[inline]
    fn sub(self, rhs: Nanos) -> Nanos {
        Nanos(self.0 - rhs.0)
    }
}

impl SubAssign for Nanos {
    #[inline]
    fn sub_assign(&mut self, rhs: Nanos) {
        *self = *self - rhs;
    }
}

impl Eq for Nanos {}

impl PartialOrd for Nanos {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Nanos {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl std::iter::Sum for Nanos {
    #[inline]
    fn sum<I>(iter: I) -> Self
    where
        I: Iterator<Item = Self>,
    {
        Nanos(iter.map(|v| v.0).sum())
    }
}
