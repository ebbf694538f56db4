// Copyright (c) 2024 Botho Foundation

//! Reporting hooks for notable throttle engine events.
//!
//! The orchestrator never logs directly. It reports through a
//! [`ThrottleObserver`], which by default forwards to `tracing`.

use crate::{error::ThrottleError, throttle::ResourceThrottle};
use tracing::{debug, error, info, warn};

/// Receives notable events from the throttle engine.
///
/// Every method has an empty default so observers only implement what they
/// care about.
pub trait ThrottleObserver: Send + Sync {
    /// A bucket could not be compiled and was left out of the rebuild.
    fn bucket_rejected(&self, _bucket: &str, _error: &ThrottleError) {}

    /// A single-resource throttle is enabled but configured with a zero rate,
    /// so every metered transaction will be denied.
    fn zero_rate_enabled(&self, _throttle_type: &str, _throttle: &ResourceThrottle) {}

    /// The effective requirements after a rebuild.
    fn definitions_resolved(&self, _summary: &str) {}

    /// A single-resource throttle was (re)configured.
    fn resource_throttle_resolved(
        &self,
        _throttle_type: &str,
        _throttle: &ResourceThrottle,
        _enabled: bool,
    ) {
    }

    /// A schedule create carried a transaction that cannot be scheduled.
    fn invalid_scheduled_transaction(&self, _error: &ThrottleError) {}

    /// A decision needed a single-resource throttle that was never configured.
    fn unconfigured_throttle(&self, _error: &ThrottleError) {}

    /// A usage snapshot did not line up with the current throttles.
    fn snapshot_mismatch(&self, _expected: usize, _actual: usize) {}
}

/// Forwards engine events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ThrottleObserver for TracingObserver {
    fn bucket_rejected(&self, bucket: &str, error: &ThrottleError) {
        error!(bucket, %error, "When constructing throttle bucket from definitions");
    }

    fn zero_rate_enabled(&self, throttle_type: &str, throttle: &ResourceThrottle) {
        warn!(
            throttle_type,
            resource = %throttle.kind(),
            "{} throttling enabled, but limited to 0/sec",
            throttle.kind()
        );
    }

    fn definitions_resolved(&self, summary: &str) {
        info!("{}", summary);
    }

    fn resource_throttle_resolved(
        &self,
        throttle_type: &str,
        throttle: &ResourceThrottle,
        enabled: bool,
    ) {
        info!(
            throttle_type,
            capacity = throttle.capacity(),
            "Resolved {} (throttling {})",
            throttle,
            if enabled { "ON" } else { "OFF" }
        );
    }

    fn invalid_scheduled_transaction(&self, error: &ThrottleError) {
        debug!(%error, "ScheduleCreate was associated with an invalid txn");
    }

    fn unconfigured_throttle(&self, error: &ThrottleError) {
        warn!(%error, "Denying transaction");
    }

    fn snapshot_mismatch(&self, expected: usize, actual: usize) {
        warn!(
            expected,
            actual, "Usage snapshot does not match the active throttles"
        );
    }
}
