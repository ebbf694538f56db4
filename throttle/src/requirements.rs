// Copyright (c) 2024 Botho Foundation

//! Per-functionality requirement lists and all-or-nothing multi-bucket draws.
//!
//! A [`RequirementManager`] does not own its throttles. It holds indices into
//! the throttle arena of a compiled throttle set and borrows the arena
//! mutably for each draw.

use crate::{
    functionality::Functionality,
    scale::ScaleFactor,
    throttle::ResourceThrottle,
    time::Timestamp,
};
use serde::{Deserialize, Serialize};

/// One throttle a functionality draws from, and the cost per logical unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThrottleRequirement {
    /// Index of the throttle in its compiled set
    pub throttle: usize,
    /// Milli-ops drawn per unit of the functionality
    pub milli_ops_per_unit: u64,
}

/// Identifies the throttle a recorded usage was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThrottleRef {
    /// TPS throttle at this index of the compiled set
    Tps(usize),
    /// The gas throttle
    Gas,
    /// The jumbo bytes throttle
    Bytes,
    /// The ops-duration throttle
    OpsDuration,
}

/// What a single decision drew from one throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleUsage {
    /// Throttle drawn from
    pub throttle: ThrottleRef,
    /// Amount drawn, in the throttle's draw unit
    pub amount: u64,
    /// Generation of the compiled set the draw was made against
    pub generation: u64,
}

/// The ordered requirements of one functionality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementManager {
    functionality: Functionality,
    requirements: Vec<ThrottleRequirement>,
    generation: u64,
}

impl RequirementManager {
    /// An empty manager for `functionality`.
    pub fn new(functionality: Functionality, generation: u64) -> Self {
        Self {
            functionality,
            requirements: Vec::new(),
            generation,
        }
    }

    /// Append a requirement.
    pub fn push(&mut self, requirement: ThrottleRequirement) {
        self.requirements.push(requirement);
    }

    /// The functionality these requirements belong to.
    pub fn functionality(&self) -> Functionality {
        self.functionality
    }

    /// The requirements, in draw order.
    pub fn requirements(&self) -> &[ThrottleRequirement] {
        &self.requirements
    }

    /// Draw one unit from every throttle.
    pub fn all_reqs_met(
        &self,
        throttles: &mut [ResourceThrottle],
        now: Timestamp,
        usages: Option<&mut Vec<ThrottleUsage>>,
    ) -> bool {
        self.all_reqs_met_at(throttles, now, 1, ScaleFactor::ONE_TO_ONE, usages)
    }

    /// Draw `quantity` units, scaled by `scale`, from every throttle.
    ///
    /// Either every draw succeeds, or none of them leaves a trace. On success
    /// one [`ThrottleUsage`] per draw is appended to `usages`.
    pub fn all_reqs_met_at(
        &self,
        throttles: &mut [ResourceThrottle],
        now: Timestamp,
        quantity: u64,
        scale: ScaleFactor,
        usages: Option<&mut Vec<ThrottleUsage>>,
    ) -> bool {
        let mut drawn: Vec<(usize, u64)> = Vec::with_capacity(self.requirements.len());
        for requirement in &self.requirements {
            let needed = scale.scaling(requirement.milli_ops_per_unit.saturating_mul(quantity));
            let granted = throttles
                .get_mut(requirement.throttle)
                .is_some_and(|throttle| throttle.allow(now, needed));
            if !granted {
                for (index, amount) in drawn {
                    if let Some(throttle) = throttles.get_mut(index) {
                        throttle.revoke(amount);
                    }
                }
                return false;
            }
            drawn.push((requirement.throttle, needed));
        }

        if let Some(usages) = usages {
            usages.extend(drawn.into_iter().map(|(index, amount)| ThrottleUsage {
                throttle: ThrottleRef::Tps(index),
                amount,
                generation: self.generation,
            }));
        }
        true
    }

    /// Give back the capacity previously claimed for `quantity` units.
    pub fn undo_claimed_reqs_for(&self, throttles: &mut [ResourceThrottle], quantity: u64) {
        for requirement in &self.requirements {
            if let Some(throttle) = throttles.get_mut(requirement.throttle) {
                throttle.leak_capacity(requirement.milli_ops_per_unit.saturating_mul(quantity));
            }
        }
    }

    /// The throttles these requirements draw from.
    pub fn managed_throttles<'a>(
        &self,
        throttles: &'a [ResourceThrottle],
    ) -> Vec<&'a ResourceThrottle> {
        self.requirements
            .iter()
            .filter_map(|requirement| throttles.get(requirement.throttle))
            .collect()
    }

    /// Effective rates, e.g. `min(10.00 tps (ThroughputLimits), 2.00 tps (CreationLimits))`.
    pub fn as_readable_requirements(&self, throttles: &[ResourceThrottle]) -> String {
        let parts = self
            .requirements
            .iter()
            .filter_map(|requirement| {
                let throttle = throttles.get(requirement.throttle)?;
                let tps = throttle.rate() as f64 / requirement.milli_ops_per_unit.max(1) as f64;
                Some(format!("{:.2} tps ({})", tps, throttle.name()))
            })
            .collect::<Vec<_>>();
        format!("min({})", parts.join(", "))
    }
}
