// Copyright (c) 2024 Botho Foundation

//! Named resource throttles built on a [`CapacityBucket`].
//!
//! Two flavours exist:
//!
//! - **TPS throttles** compiled from a throttle-definitions bucket. Draws are
//!   expressed in milli-operations and stored as micro-operations, so a rate
//!   given in milli-ops per second over a burst in milliseconds maps onto an
//!   integer capacity.
//! - **Single-resource throttles** for gas, jumbo payload bytes and contract
//!   ops duration. Draws are in the resource's own unit and the capacity is
//!   `rate × burst_seconds`.

use crate::{
    bucket::CapacityBucket,
    error::{ThrottleError, ThrottleResult},
    time::{Timestamp, NANOS_PER_SECOND},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Burst used by single-resource throttles configured with a zero burst.
pub const DEFAULT_BURST_SECONDS: u64 = 1;

const NANOS_PER_MILLI: u64 = 1_000_000;

/// Micro-ops per milli-op; the storage unit of TPS buckets.
const MICROS_PER_MILLI: u64 = 1_000;

/// The resource a throttle meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Operations per second
    Tps,
    /// Contract gas per second
    Gas,
    /// Jumbo transaction payload bytes per second
    Bytes,
    /// Contract execution ops duration per second
    OpsDuration,
}

impl ResourceKind {
    fn unit(&self) -> &'static str {
        match self {
            ResourceKind::Tps => "ops",
            ResourceKind::Gas => "gas",
            ResourceKind::Bytes => "bytes",
            ResourceKind::OpsDuration => "ops duration",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Tps => write!(f, "TPS"),
            ResourceKind::Gas => write!(f, "Gas"),
            ResourceKind::Bytes => write!(f, "Bytes"),
            ResourceKind::OpsDuration => write!(f, "OpsDuration"),
        }
    }
}

/// Persistable usage level of one throttle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleUsageSnapshot {
    /// Bucket units in use
    pub used: u64,
    /// Consensus time of the last decision
    pub last_decision_time: Option<Timestamp>,
}

/// Usage levels of every throttle an orchestrator owns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleUsageSnapshots {
    /// TPS throttles, in bucket order
    #[serde(default)]
    pub tps_throttles: Vec<ThrottleUsageSnapshot>,
    /// Gas throttle, if configured
    #[serde(default)]
    pub gas_throttle: Option<ThrottleUsageSnapshot>,
    /// Ops-duration throttle, if configured
    #[serde(default)]
    pub ops_duration_throttle: Option<ThrottleUsageSnapshot>,
}

/// A named throttle wrapping a single bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceThrottle {
    name: String,
    kind: ResourceKind,
    /// Rate in the draw unit per second, times 1000 for TPS throttles
    rate: u64,
    burst_nanos: u64,
    /// Bucket units per drawn amount
    units_per_amount: u64,
    bucket: CapacityBucket,
}

impl ResourceThrottle {
    /// A TPS throttle running at `mtps` milli-ops per second over a burst of
    /// `burst_ms` milliseconds.
    pub fn tps(name: impl Into<String>, mtps: u64, burst_ms: u64) -> ThrottleResult<Self> {
        let name = name.into();
        // milli-ops/s × ms = micro-ops
        let capacity = mtps
            .checked_mul(burst_ms)
            .ok_or_else(|| ThrottleError::MalformedBucket {
                name: name.clone(),
                reason: format!("capacity of {mtps} mtps over {burst_ms}ms overflows"),
            })?;
        let burst_nanos = burst_ms.saturating_mul(NANOS_PER_MILLI);
        Ok(Self {
            name,
            kind: ResourceKind::Tps,
            rate: mtps,
            burst_nanos,
            units_per_amount: MICROS_PER_MILLI,
            bucket: CapacityBucket::new(capacity, burst_nanos),
        })
    }

    /// A gas, bytes or ops-duration throttle allowing `rate_per_sec` units
    /// per second over `burst_seconds`.
    pub fn per_second(kind: ResourceKind, rate_per_sec: u64, burst_seconds: u64) -> Self {
        let burst_seconds = if burst_seconds == 0 {
            DEFAULT_BURST_SECONDS
        } else {
            burst_seconds
        };
        let burst_nanos = burst_seconds.saturating_mul(NANOS_PER_SECOND);
        Self {
            name: kind.to_string(),
            kind,
            rate: rate_per_sec,
            burst_nanos,
            units_per_amount: 1,
            bucket: CapacityBucket::new(rate_per_sec.saturating_mul(burst_seconds), burst_nanos),
        }
    }

    /// Name of the throttle; the bucket name for TPS throttles.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resource metered by this throttle.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Configured rate: milli-ops per second for TPS throttles, resource
    /// units per second otherwise.
    pub fn rate(&self) -> u64 {
        self.rate
    }

    /// Burst period in nanoseconds.
    pub fn burst_nanos(&self) -> u64 {
        self.burst_nanos
    }

    /// Bucket capacity in storage units.
    pub fn capacity(&self) -> u64 {
        self.bucket.capacity()
    }

    /// Bucket usage in storage units.
    pub fn used(&self) -> u64 {
        self.bucket.used()
    }

    /// The underlying bucket.
    pub fn bucket(&self) -> &CapacityBucket {
        &self.bucket
    }

    fn units(&self, amount: u64) -> u64 {
        amount.saturating_mul(self.units_per_amount)
    }

    /// Try to draw `amount` at `now`.
    pub fn allow(&mut self, now: Timestamp, amount: u64) -> bool {
        let units = self.units(amount);
        self.bucket.allow(now, units)
    }

    /// Return everything drawn since the last reset.
    pub fn reclaim_last_allowed_use(&mut self) {
        self.bucket.reclaim_last_allowed_use();
    }

    /// Commit everything drawn since the last reset.
    pub fn reset_last_allowed_use(&mut self) {
        self.bucket.reset_last_allowed_use();
    }

    /// Permanently free `amount`.
    pub fn leak_capacity(&mut self, amount: u64) {
        let units = self.units(amount);
        self.bucket.leak_capacity(units);
    }

    pub(crate) fn revoke(&mut self, amount: u64) {
        let units = self.units(amount);
        self.bucket.revoke(units);
    }

    /// Share of capacity in use at `now`.
    pub fn percent_used(&self, now: Timestamp) -> f64 {
        self.bucket.percent_used(now)
    }

    /// Share of capacity in use as of the last decision.
    pub fn instantaneous_percent_used(&self) -> f64 {
        self.bucket.instantaneous_percent_used()
    }

    /// Current usage level.
    pub fn usage_snapshot(&self) -> ThrottleUsageSnapshot {
        ThrottleUsageSnapshot {
            used: self.bucket.used(),
            last_decision_time: self.bucket.last_decision_time(),
        }
    }

    /// Restore a usage level; `used` is clamped to capacity.
    pub fn reset_usage_to(&mut self, snapshot: &ThrottleUsageSnapshot) {
        self.bucket
            .reset_used_to(snapshot.used, snapshot.last_decision_time);
    }
}

impl fmt::Display for ResourceThrottle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ResourceKind::Tps => write!(
                f,
                "{} ({:.2} tps, {}ms burst)",
                self.name,
                self.rate as f64 / 1000.0,
                self.burst_nanos / NANOS_PER_MILLI
            ),
            kind => write!(
                f,
                "{} throttle ({} {}/sec, {}s burst)",
                kind,
                self.rate,
                kind.unit(),
                self.burst_nanos / NANOS_PER_SECOND
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tps_capacity_in_micro_ops() {
        // 10 tps over a 2s burst holds 20 transactions of 1000 milli-ops
        let mut throttle = ResourceThrottle::tps("ThroughputLimits", 10_000, 2_000).unwrap();
        assert_eq!(throttle.capacity(), 20_000_000);

        let now = Timestamp::from_seconds(1);
        for _ in 0..20 {
            assert!(throttle.allow(now, 1_000));
        }
        assert!(!throttle.allow(now, 1_000));
        // A fractional draw still fits once a bit of time passes
        assert!(throttle.allow(now.plus_nanos(60_000_000), 500));
    }

    #[test]
    fn test_tps_overflow_is_malformed() {
        assert!(matches!(
            ResourceThrottle::tps("Huge", u64::MAX, 2),
            Err(ThrottleError::MalformedBucket { .. })
        ));
    }

    #[test]
    fn test_per_second_capacity() {
        let throttle = ResourceThrottle::per_second(ResourceKind::Gas, 15_000_000, 3);
        assert_eq!(throttle.capacity(), 45_000_000);
        assert_eq!(throttle.name(), "Gas");

        let zero_burst = ResourceThrottle::per_second(ResourceKind::Bytes, 1024, 0);
        assert_eq!(zero_burst.capacity(), 1024);
        assert_eq!(zero_burst.burst_nanos(), NANOS_PER_SECOND);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut throttle = ResourceThrottle::per_second(ResourceKind::Gas, 1_000, 1);
        let now = Timestamp::from_seconds(10);
        assert!(throttle.allow(now, 400));
        let snapshot = throttle.usage_snapshot();
        assert_eq!(snapshot.used, 400);

        let mut restored = ResourceThrottle::per_second(ResourceKind::Gas, 1_000, 1);
        restored.reset_usage_to(&snapshot);
        assert_eq!(restored.usage_snapshot(), snapshot);
        assert!(!restored.allow(now, 700));

        restored.reset_usage_to(&ThrottleUsageSnapshot {
            used: 9_999,
            last_decision_time: Some(now),
        });
        assert_eq!(restored.used(), 1_000);
    }

    #[test]
    fn test_display() {
        let tps = ResourceThrottle::tps("PriorityReservations", 2_500, 1_000).unwrap();
        assert_eq!(tps.to_string(), "PriorityReservations (2.50 tps, 1000ms burst)");
        let gas = ResourceThrottle::per_second(ResourceKind::Gas, 7, 2);
        assert_eq!(gas.to_string(), "Gas throttle (7 gas/sec, 2s burst)");
    }
}
