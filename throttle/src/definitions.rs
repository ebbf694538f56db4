// Copyright (c) 2024 Botho Foundation

//! Throttle definition documents and their compilation into throttles.
//!
//! A definitions document lists named buckets. Each bucket has a burst
//! period and one or more throttle groups, and each group grants a rate to a
//! set of functionalities:
//!
//! ```json
//! {
//!   "buckets": [
//!     {
//!       "name": "ThroughputLimits",
//!       "burstPeriodMs": 1000,
//!       "throttleGroups": [
//!         { "opsPerSec": 10000, "operations": ["CryptoTransfer", "CryptoCreate"] }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! All groups of a bucket share one throttle. The throttle runs at a logical
//! rate `L = lcm(g) × Σ lcm(g) / gᵢ` and a functionality of group `i` costs
//! `L / gᵢ` logical operations, so each group alone is held to its own rate
//! while the groups together compete for the bucket.

use crate::{
    error::{ThrottleError, ThrottleResult},
    functionality::Functionality,
    throttle::ResourceThrottle,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Milli-ops in one operation.
const MILLI_OPS_PER_OP: u64 = 1_000;

/// A full throttle definitions document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleDefinitions {
    /// Buckets, in priority order
    #[serde(default)]
    pub buckets: Vec<ThrottleBucketDef>,
}

impl ThrottleDefinitions {
    /// Parse a JSON definitions document.
    pub fn from_json_str(json: &str) -> ThrottleResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a JSON definitions document from raw bytes.
    pub fn from_json_slice(bytes: &[u8]) -> ThrottleResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// One named bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleBucketDef {
    /// Bucket name, used in logs and summaries
    pub name: String,
    /// Burst period in seconds, used when `burst_period_ms` is zero
    #[serde(default)]
    pub burst_period: u64,
    /// Burst period in milliseconds
    #[serde(default)]
    pub burst_period_ms: u64,
    /// Groups sharing this bucket
    #[serde(default)]
    pub throttle_groups: Vec<ThrottleGroupDef>,
}

/// A rate granted to a set of functionalities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleGroupDef {
    /// Rate in whole operations per second, used when `milli_ops_per_sec` is zero
    #[serde(default)]
    pub ops_per_sec: u64,
    /// Rate in milli-operations per second
    #[serde(default)]
    pub milli_ops_per_sec: u64,
    /// Functionalities covered by this group
    #[serde(default)]
    pub operations: Vec<Functionality>,
}

impl ThrottleGroupDef {
    /// Effective rate in milli-ops per second.
    pub fn milli_ops_per_sec(&self) -> u64 {
        if self.milli_ops_per_sec > 0 {
            self.milli_ops_per_sec
        } else {
            self.ops_per_sec.saturating_mul(MILLI_OPS_PER_OP)
        }
    }
}

/// A bucket compiled into a throttle plus the requirements it imposes.
#[derive(Debug, Clone)]
pub struct CompiledBucket {
    /// The shared throttle
    pub throttle: ResourceThrottle,
    /// Milli-ops each functionality draws per unit, in definition order
    pub requirements: Vec<(Functionality, u64)>,
}

impl ThrottleBucketDef {
    /// Effective burst period in milliseconds.
    pub fn burst_period_ms(&self) -> u64 {
        if self.burst_period_ms > 0 {
            self.burst_period_ms
        } else {
            self.burst_period.saturating_mul(1_000)
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> ThrottleError {
        ThrottleError::MalformedBucket {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// Compile this bucket for a network whose capacity is split
    /// `capacity_split` ways.
    pub fn compile(&self, capacity_split: u32) -> ThrottleResult<CompiledBucket> {
        let split = u64::from(capacity_split.max(1));
        if self.throttle_groups.is_empty() {
            return Err(self.malformed("no throttle groups"));
        }
        let burst_ms = self.burst_period_ms();
        if burst_ms == 0 {
            return Err(self.malformed("burst period is zero"));
        }

        let rates = self
            .throttle_groups
            .iter()
            .map(ThrottleGroupDef::milli_ops_per_sec)
            .collect::<Vec<_>>();
        if let Some(rate) = rates.iter().find(|rate| **rate == 0 || **rate < split) {
            return Err(self.malformed(format!(
                "group rate of {rate} mtps cannot be split {split} ways"
            )));
        }

        let overflow = || self.malformed("logical rate overflows");
        let lcm = rates
            .iter()
            .try_fold(1u64, |acc, rate| checked_lcm(acc, *rate))
            .ok_or_else(overflow)?;
        let weight = rates
            .iter()
            .try_fold(0u64, |acc, rate| acc.checked_add(lcm / rate))
            .ok_or_else(overflow)?;
        let logical_mtps = lcm.checked_mul(weight).ok_or_else(overflow)?;

        let throttle = ResourceThrottle::tps(self.name.clone(), logical_mtps / split, burst_ms)?;

        let mut seen = HashSet::new();
        let mut requirements = Vec::new();
        for (group, rate) in self.throttle_groups.iter().zip(&rates) {
            let milli_ops = (logical_mtps / rate)
                .checked_mul(MILLI_OPS_PER_OP)
                .ok_or_else(overflow)?;
            if milli_ops.saturating_mul(MILLI_OPS_PER_OP) > throttle.capacity() {
                return Err(self.malformed(format!(
                    "a single {rate} mtps operation exceeds the bucket capacity"
                )));
            }
            for function in &group.operations {
                if !seen.insert(*function) {
                    return Err(self.malformed(format!("{function} appears more than once")));
                }
                requirements.push((*function, milli_ops));
            }
        }

        Ok(CompiledBucket {
            throttle,
            requirements,
        })
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn checked_lcm(a: u64, b: u64) -> Option<u64> {
    (a / gcd(a, b)).checked_mul(b)
}
