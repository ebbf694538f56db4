// Copyright (c) 2024 Botho Foundation

//! Leaky-bucket capacity accounting driven by consensus time.
//!
//! A [`CapacityBucket`] holds `capacity` units that refill continuously over
//! one burst period. Usage drains ("leaks") in proportion to the consensus
//! time elapsed since the last decision. The sub-unit remainder of each leak
//! is carried forward, so the amount leaked over an interval does not depend
//! on how many decisions happened inside it.
//!
//! # Provisional draws
//!
//! Every unit granted by [`CapacityBucket::allow`] is also recorded as
//! provisional until [`CapacityBucket::reset_last_allowed_use`] commits it.
//! [`CapacityBucket::reclaim_last_allowed_use`] hands the provisional units
//! back instead, which is how a rejected multi-bucket decision is undone.

use crate::time::Timestamp;

/// A single leaky bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityBucket {
    /// Units available over one burst period
    capacity: u64,
    /// Units currently in use
    used: u64,
    /// Length of the burst period in nanoseconds
    burst_nanos: u128,
    /// Consensus time of the latest leak
    last_decision_time: Option<Timestamp>,
    /// Leak remainder in units of `1 / burst_nanos`
    leak_carry: u128,
    /// Units granted since the last reset
    last_allowed_units: u64,
}

impl CapacityBucket {
    /// Create an empty bucket. A zero-length burst period is treated as one
    /// nanosecond.
    pub fn new(capacity: u64, burst_nanos: u64) -> Self {
        Self {
            capacity,
            used: 0,
            burst_nanos: burst_nanos.max(1) as u128,
            last_decision_time: None,
            leak_carry: 0,
            last_allowed_units: 0,
        }
    }

    /// Total units available over one burst period.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Units in use as of the last decision.
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Length of the burst period in nanoseconds.
    pub fn burst_nanos(&self) -> u128 {
        self.burst_nanos
    }

    /// Consensus time of the last decision, if any.
    pub fn last_decision_time(&self) -> Option<Timestamp> {
        self.last_decision_time
    }

    /// Units granted since the last reset.
    pub fn last_allowed_units(&self) -> u64 {
        self.last_allowed_units
    }

    /// Compute `(used, carry, time)` after leaking up to `now`, without
    /// touching the bucket.
    fn leaked_state(&self, now: Timestamp) -> (u64, u128, Option<Timestamp>) {
        let Some(last) = self.last_decision_time else {
            return (self.used, self.leak_carry, Some(now));
        };
        if now <= last {
            return (self.used, self.leak_carry, Some(last));
        }

        let elapsed = now.nanos_since(&last);
        if elapsed >= self.burst_nanos {
            return (0, 0, Some(now));
        }

        let total = elapsed
            .saturating_mul(self.capacity as u128)
            .saturating_add(self.leak_carry);
        let leaked = total / self.burst_nanos;
        if leaked >= self.used as u128 {
            (0, 0, Some(now))
        } else {
            (
                self.used - leaked as u64,
                total % self.burst_nanos,
                Some(now),
            )
        }
    }

    /// Leak up to `now`, then try to draw `units`.
    ///
    /// Returns true and consumes the units if they fit. A denied draw leaves
    /// the bucket exactly as it was. A bucket with zero capacity denies every
    /// draw.
    pub fn allow(&mut self, now: Timestamp, units: u64) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let (used, carry, time) = self.leaked_state(now);
        match used.checked_add(units) {
            Some(next) if next <= self.capacity => {
                self.used = next;
                self.leak_carry = if next == 0 { 0 } else { carry };
                self.last_decision_time = time;
                // Units that leaked away can no longer be reclaimed
                self.last_allowed_units = self.last_allowed_units.min(used).saturating_add(units);
                true
            }
            _ => false,
        }
    }

    /// Return every unit granted since the last reset.
    ///
    /// The decision time is kept, so replaying the same draw at the same
    /// instant sees no extra leak and reaches the same verdict.
    pub fn reclaim_last_allowed_use(&mut self) {
        let units = self.last_allowed_units.min(self.used);
        self.used -= units;
        if self.used == 0 {
            self.leak_carry = 0;
        }
        self.last_allowed_units = 0;
    }

    /// Commit the units granted since the last reset. Idempotent.
    pub fn reset_last_allowed_use(&mut self) {
        self.last_allowed_units = 0;
    }

    /// Permanently free up to `units` of capacity.
    pub fn leak_capacity(&mut self, units: u64) {
        self.used = self.used.saturating_sub(units);
        if self.used == 0 {
            self.leak_carry = 0;
        }
        self.last_allowed_units = self.last_allowed_units.min(self.used);
    }

    /// Take back `units` granted earlier in the current decision.
    pub(crate) fn revoke(&mut self, units: u64) {
        let units = units.min(self.used);
        self.used -= units;
        if self.used == 0 {
            self.leak_carry = 0;
        }
        self.last_allowed_units = self.last_allowed_units.saturating_sub(units);
    }

    /// Overwrite the usage level, clamping it to capacity. Clears any
    /// provisional record.
    pub fn reset_used_to(&mut self, used: u64, last_decision_time: Option<Timestamp>) {
        self.used = used.min(self.capacity);
        self.last_decision_time = last_decision_time;
        self.leak_carry = 0;
        self.last_allowed_units = 0;
    }

    /// Units that would be free at `now`.
    pub fn capacity_free(&self, now: Timestamp) -> u64 {
        let (used, _, _) = self.leaked_state(now);
        self.capacity - used
    }

    /// Share of capacity in use at `now`, as a percentage.
    pub fn percent_used(&self, now: Timestamp) -> f64 {
        let (used, _, _) = self.leaked_state(now);
        Self::percent(used, self.capacity)
    }

    /// Share of capacity in use as of the last decision, as a percentage.
    pub fn instantaneous_percent_used(&self) -> f64 {
        Self::percent(self.used, self.capacity)
    }

    fn percent(used: u64, capacity: u64) -> f64 {
        if capacity == 0 {
            return 100.0;
        }
        100.0 * used as f64 / capacity as f64
    }
}
