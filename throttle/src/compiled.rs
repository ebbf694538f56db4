// Copyright (c) 2024 Botho Foundation

//! The compiled, swappable snapshot of all TPS throttles and requirements.

use crate::{
    definitions::ThrottleDefinitions,
    error::{ThrottleError, ThrottleResult},
    functionality::Functionality,
    observer::ThrottleObserver,
    requirements::{RequirementManager, ThrottleRequirement, ThrottleUsage},
    scale::ScaleFactor,
    throttle::ResourceThrottle,
    time::Timestamp,
};
use std::collections::HashMap;

/// Every TPS throttle built from one definitions document, and the
/// requirement manager of each functionality that draws from them.
///
/// A set is built in one piece by [`CompiledThrottleSet::compile`] and
/// replaced in one piece on reconfiguration.
#[derive(Debug, Clone, Default)]
pub struct CompiledThrottleSet {
    throttles: Vec<ResourceThrottle>,
    managers: HashMap<Functionality, RequirementManager>,
    capacity_split: u32,
    generation: u64,
}

impl CompiledThrottleSet {
    /// A set with no throttles; every functionality lacks a manager.
    pub fn empty(generation: u64) -> Self {
        Self {
            generation,
            capacity_split: 1,
            ..Default::default()
        }
    }

    /// Compile `definitions`. Malformed buckets are reported to `observer`
    /// and left out; the rest still compile.
    pub fn compile(
        definitions: &ThrottleDefinitions,
        capacity_split: u32,
        generation: u64,
        observer: &dyn ThrottleObserver,
    ) -> Self {
        let mut throttles = Vec::new();
        let mut managers: HashMap<Functionality, RequirementManager> = HashMap::new();

        for def in &definitions.buckets {
            let compiled = match def.compile(capacity_split) {
                Ok(compiled) => compiled,
                Err(err) => {
                    observer.bucket_rejected(&def.name, &err);
                    continue;
                }
            };
            let index = throttles.len();
            throttles.push(compiled.throttle);
            for (function, milli_ops_per_unit) in compiled.requirements {
                managers
                    .entry(function)
                    .or_insert_with(|| RequirementManager::new(function, generation))
                    .push(ThrottleRequirement {
                        throttle: index,
                        milli_ops_per_unit,
                    });
            }
        }

        Self {
            throttles,
            managers,
            capacity_split: capacity_split.max(1),
            generation,
        }
    }

    /// All active TPS throttles, in bucket order.
    pub fn throttles(&self) -> &[ResourceThrottle] {
        &self.throttles
    }

    pub(crate) fn throttles_mut(&mut self) -> &mut [ResourceThrottle] {
        &mut self.throttles
    }

    /// The manager for `function`, if any bucket covers it.
    pub fn manager(&self, function: Functionality) -> Option<&RequirementManager> {
        self.managers.get(&function)
    }

    /// Functionalities with a manager, sorted by name.
    pub fn functionalities(&self) -> Vec<Functionality> {
        let mut functions = self.managers.keys().copied().collect::<Vec<_>>();
        functions.sort_by_key(|function| function.as_str());
        functions
    }

    /// Number of ways capacity was split at compile time.
    pub fn capacity_split(&self) -> u32 {
        self.capacity_split
    }

    /// Generation stamped on usages drawn from this set.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Draw for `function`. Returns `None` when no manager exists.
    pub fn all_reqs_met_at(
        &mut self,
        function: Functionality,
        now: Timestamp,
        quantity: u64,
        scale: ScaleFactor,
        usages: Option<&mut Vec<ThrottleUsage>>,
    ) -> Option<bool> {
        let manager = self.managers.get(&function)?;
        Some(manager.all_reqs_met_at(&mut self.throttles, now, quantity, scale, usages))
    }

    /// Give back what `quantity` units of `function` claimed.
    pub fn undo_claimed_reqs_for(
        &mut self,
        function: Functionality,
        quantity: u64,
    ) -> ThrottleResult<()> {
        let manager = self
            .managers
            .get(&function)
            .ok_or(ThrottleError::NoRequirements(function))?;
        manager.undo_claimed_reqs_for(&mut self.throttles, quantity);
        Ok(())
    }

    /// The throttles `function` draws from; empty without a manager.
    pub fn active_throttles_for(&self, function: Functionality) -> Vec<&ResourceThrottle> {
        self.managers
            .get(&function)
            .map(|manager| manager.managed_throttles(&self.throttles))
            .unwrap_or_default()
    }

    /// Commit provisional draws on every throttle.
    pub fn reset_last_allowed_use(&mut self) {
        self.throttles
            .iter_mut()
            .for_each(ResourceThrottle::reset_last_allowed_use);
    }

    /// Return provisional draws on every throttle.
    pub fn reclaim_last_allowed_use(&mut self) {
        self.throttles
            .iter_mut()
            .for_each(ResourceThrottle::reclaim_last_allowed_use);
    }

    /// One line per functionality with its effective rates.
    pub fn readable_requirements(&self) -> Vec<String> {
        self.functionalities()
            .into_iter()
            .filter_map(|function| {
                let manager = self.managers.get(&function)?;
                Some(format!(
                    "{}: {}",
                    function,
                    manager.as_readable_requirements(&self.throttles)
                ))
            })
            .collect()
    }
}
