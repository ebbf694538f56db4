// Copyright (c) 2024 Botho Foundation

//! Consensus timestamps.
//!
//! Buckets only ever see consensus time, never the wall clock, so every
//! replica computes the same leak for the same sequence of decisions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Nanoseconds in one second.
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// A point in consensus time with nanosecond resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Whole seconds since the epoch
    pub seconds: i64,
    /// Nanoseconds within the second, always below one billion
    pub nanos: u32,
}

impl Timestamp {
    /// Create a timestamp, normalizing any nanosecond overflow into seconds.
    pub fn new(seconds: i64, nanos: u32) -> Self {
        let carry = (nanos as u64 / NANOS_PER_SECOND) as i64;
        Self {
            seconds: seconds.saturating_add(carry),
            nanos: (nanos as u64 % NANOS_PER_SECOND) as u32,
        }
    }

    /// Create a timestamp on a whole second.
    pub fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    /// Total nanoseconds since the epoch.
    pub fn as_nanos(&self) -> i128 {
        self.seconds as i128 * NANOS_PER_SECOND as i128 + self.nanos as i128
    }

    /// Nanoseconds elapsed from `earlier` to `self`, or zero if time went
    /// backwards.
    pub fn nanos_since(&self, earlier: &Timestamp) -> u128 {
        let delta = self.as_nanos() - earlier.as_nanos();
        if delta > 0 {
            delta as u128
        } else {
            0
        }
    }

    /// This timestamp shifted forward by `nanos`.
    pub fn plus_nanos(&self, nanos: u64) -> Self {
        let total = self.nanos as u64 + nanos % NANOS_PER_SECOND;
        let seconds = self
            .seconds
            .saturating_add((nanos / NANOS_PER_SECOND) as i64)
            .saturating_add((total / NANOS_PER_SECOND) as i64);
        Self {
            seconds,
            nanos: (total % NANOS_PER_SECOND) as u32,
        }
    }

    /// This timestamp shifted forward by whole seconds.
    pub fn plus_seconds(&self, seconds: i64) -> Self {
        Self {
            seconds: self.seconds.saturating_add(seconds),
            nanos: self.nanos,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_nanos() {
        let ts = Timestamp::new(10, 2_500_000_000);
        assert_eq!(ts, Timestamp::new(12, 500_000_000));
    }

    #[test]
    fn test_nanos_since() {
        let a = Timestamp::new(100, 900_000_000);
        let b = Timestamp::new(101, 100_000_000);
        assert_eq!(b.nanos_since(&a), 200_000_000);
        // Backwards time never produces a negative elapsed
        assert_eq!(a.nanos_since(&b), 0);
    }

    #[test]
    fn test_plus_nanos_carries() {
        let ts = Timestamp::new(1, 999_999_999).plus_nanos(2);
        assert_eq!(ts, Timestamp::new(2, 1));
        let ts = Timestamp::from_seconds(5).plus_nanos(3 * NANOS_PER_SECOND + 7);
        assert_eq!(ts, Timestamp::new(8, 7));
    }

    #[test]
    fn test_display() {
        assert_eq!(Timestamp::new(3, 42).to_string(), "3.000000042");
    }
}
