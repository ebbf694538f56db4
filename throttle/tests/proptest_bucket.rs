// Copyright (c) 2024 Botho Foundation

//! Property-based tests for the capacity bucket and multi-bucket draws.
//!
//! These tests check that bucket accounting holds for arbitrary sequences of
//! draws, leaks and rollbacks, not just hand-picked timelines.

use bth_throttle::{
    AccountId, CapacityBucket, Functionality, InMemoryLedger, ScaleFactor, StaticConfig,
    ThrottleConfig, ThrottleDefinitions, ThrottleOrchestrator, ThrottleType, Timestamp,
    TransactionBody, TransactionData, TransactionInfo,
};
use proptest::prelude::*;
use std::sync::Arc;

const BURST_NANOS: u64 = 1_000_000_000;

#[derive(Debug, Clone)]
enum Op {
    Allow { advance_nanos: u64, units: u64 },
    Reclaim,
    Reset,
    Leak(u64),
}

fn op_strategy(capacity: u64) -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..2 * BURST_NANOS, 0..=capacity + 10)
            .prop_map(|(advance_nanos, units)| Op::Allow { advance_nanos, units }),
        1 => Just(Op::Reclaim),
        1 => Just(Op::Reset),
        1 => (0..=capacity).prop_map(Op::Leak),
    ]
}

fn start() -> Timestamp {
    Timestamp::from_seconds(1_000)
}

// ============================================================================
// Bucket Property Tests
// ============================================================================

proptest! {
    /// Property: usage never leaves `0..=capacity`.
    /// Holds after every operation of any sequence.
    #[test]
    fn prop_used_within_capacity(
        capacity in 0u64..10_000,
        ops in prop::collection::vec(op_strategy(10_000), 1..64),
    ) {
        let mut bucket = CapacityBucket::new(capacity, BURST_NANOS);
        let mut now = start();
        for op in ops {
            match op {
                Op::Allow { advance_nanos, units } => {
                    now = now.plus_nanos(advance_nanos);
                    bucket.allow(now, units);
                }
                Op::Reclaim => bucket.reclaim_last_allowed_use(),
                Op::Reset => bucket.reset_last_allowed_use(),
                Op::Leak(units) => bucket.leak_capacity(units),
            }
            prop_assert!(bucket.used() <= bucket.capacity());
            prop_assert!(bucket.last_allowed_units() <= bucket.used());
        }
    }

    /// Property: reclaiming right after a granted draw restores the usage
    /// seen by that draw before it was granted.
    #[test]
    fn prop_reclaim_restores_usage(
        capacity in 1u64..10_000,
        first in 0u64..10_000,
        advance_nanos in 0..BURST_NANOS,
        units in 0u64..10_000,
    ) {
        let mut bucket = CapacityBucket::new(capacity, BURST_NANOS);
        bucket.allow(start(), first.min(capacity));
        bucket.reset_last_allowed_use();

        let later = start().plus_nanos(advance_nanos);
        let before = capacity - bucket.capacity_free(later);
        if bucket.allow(later, units) {
            bucket.reclaim_last_allowed_use();
            prop_assert_eq!(bucket.used(), before);
        } else {
            prop_assert_eq!(bucket.used(), first.min(capacity));
        }
    }

    /// Property: replaying a reclaimed draw at the same instant reaches the
    /// same verdict.
    #[test]
    fn prop_replay_is_idempotent(
        capacity in 1u64..10_000,
        prior in 0u64..10_000,
        units in 0u64..20_000,
    ) {
        let mut bucket = CapacityBucket::new(capacity, BURST_NANOS);
        bucket.allow(start(), prior.min(capacity));
        bucket.reset_last_allowed_use();

        let now = start().plus_nanos(1_000);
        let verdict = bucket.allow(now, units);
        bucket.reclaim_last_allowed_use();
        prop_assert_eq!(bucket.allow(now, units), verdict);
    }

    /// Property: a bucket drained to capacity is fully free again after one
    /// burst period without draws.
    #[test]
    fn prop_full_burst_drains(capacity in 1u64..1_000_000, extra_nanos in 0u64..BURST_NANOS) {
        let mut bucket = CapacityBucket::new(capacity, BURST_NANOS);
        prop_assert!(bucket.allow(start(), capacity));
        let later = start().plus_nanos(BURST_NANOS + extra_nanos);
        prop_assert_eq!(bucket.capacity_free(later), capacity);
        prop_assert!(bucket.allow(later, capacity));
    }

    /// Property: leaking in many small steps frees exactly as much as one
    /// long step.
    #[test]
    fn prop_leak_is_path_independent(
        capacity in 1u64..1_000_000,
        steps in prop::collection::vec(1u64..50_000_000, 1..16),
    ) {
        let mut stepped = CapacityBucket::new(capacity, BURST_NANOS);
        let mut single = CapacityBucket::new(capacity, BURST_NANOS);
        stepped.allow(start(), capacity);
        single.allow(start(), capacity);

        let mut now = start();
        for step in &steps {
            now = now.plus_nanos(*step);
            stepped.allow(now, 0);
        }
        single.allow(now, 0);
        prop_assert_eq!(stepped.used(), single.used());
    }

    /// Property: scaling never yields zero and never exceeds the exact
    /// product.
    #[test]
    fn prop_scaling_floor(
        numerator in 1u32..100,
        denominator in 1u32..100,
        nominal in 0u64..1_000_000,
    ) {
        let scale = ScaleFactor::new(numerator, denominator).unwrap();
        let scaled = scale.scaling(nominal);
        prop_assert!(scaled >= 1);
        let exact = u128::from(nominal) * u128::from(numerator);
        let bound = exact.max(u128::from(denominator));
        prop_assert!(u128::from(scaled) * u128::from(denominator) <= bound);
    }
}

// ============================================================================
// Orchestrator Property Tests
// ============================================================================

fn orchestrator() -> ThrottleOrchestrator {
    let definitions = ThrottleDefinitions::from_json_str(
        r#"{
            "buckets": [
                { "name": "Wide", "burstPeriod": 1, "throttleGroups": [{ "opsPerSec": 50, "operations": ["CryptoCreate", "CryptoTransfer"] }] },
                { "name": "Narrow", "burstPeriod": 1, "throttleGroups": [{ "opsPerSec": 7, "operations": ["CryptoCreate"] }] }
            ]
        }"#,
    )
    .unwrap();
    let mut orchestrator = ThrottleOrchestrator::new(
        ThrottleType::Frontend,
        Arc::new(StaticConfig::new(ThrottleConfig::default())),
    );
    orchestrator.rebuild(&definitions);
    orchestrator
}

/// Usage of every TPS bucket as seen at `now`.
fn levels(orchestrator: &ThrottleOrchestrator, now: Timestamp) -> Vec<u64> {
    orchestrator
        .all_active_throttles()
        .iter()
        .map(|throttle| throttle.capacity() - throttle.bucket().capacity_free(now))
        .collect()
}

proptest! {
    /// Property: a denied decision leaves every bucket as it found it.
    #[test]
    fn prop_denied_decision_leaves_no_trace(
        decisions in prop::collection::vec((any::<bool>(), 0u64..200_000_000), 1..40),
    ) {
        let mut orchestrator = orchestrator();
        let ledger = InMemoryLedger::new();
        let mut now = start();
        for (create, advance_nanos) in decisions {
            now = now.plus_nanos(advance_nanos);
            let function = if create {
                Functionality::CryptoCreate
            } else {
                Functionality::CryptoTransfer
            };
            let txn = TransactionInfo::new(
                AccountId::num(5000),
                TransactionBody::new(TransactionData::Other(function)),
                100,
            );
            let before = levels(&orchestrator, now);
            let verdict = orchestrator.check_and_enforce_throttle(&txn, now, &ledger, None);
            if verdict.should_throttle {
                let after = levels(&orchestrator, now);
                prop_assert_eq!(after, before);
            }
        }
    }
}
