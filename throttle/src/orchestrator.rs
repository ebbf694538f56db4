// Copyright (c) 2024 Botho Foundation

//! The throttle orchestrator: the decision API of the engine.
//!
//! An orchestrator owns one [`CompiledThrottleSet`] plus the gas, jumbo
//! bytes and ops-duration throttles, and turns a transaction or query into
//! draws against them.
//!
//! # Decision protocol
//!
//! Every transaction decision starts by committing whatever the previous
//! decision drew (`reset_last_allowed_use` on every throttle). Draws made
//! while deciding are provisional; if the decision ends in a deny, every
//! throttle reclaims its provisional draws, so a rejected transaction leaves
//! no trace.
//!
//! The coarse reset and reclaim across all throttles is only sound because
//! decisions are strictly sequential. All entry points take `&mut self`;
//! embedders wanting concurrent ingestion run one orchestrator per worker or
//! serialize access to a shared one.

use crate::{
    compiled::CompiledThrottleSet,
    config::{ConfigSource, ThrottleConfig},
    definitions::ThrottleDefinitions,
    derived::{gas_limit_for, schedule_expiry_second, DerivedCosts, ImplicitCreations},
    entity::AccountId,
    error::{ThrottleError, ThrottleResult},
    functionality::Functionality,
    ledger::LedgerView,
    observer::{ThrottleObserver, TracingObserver},
    requirements::{ThrottleRef, ThrottleUsage},
    scale::ScaleFactor,
    throttle::{
        ResourceKind, ResourceThrottle, ThrottleUsageSnapshots, DEFAULT_BURST_SECONDS,
    },
    time::Timestamp,
    transaction::{Query, TransactionData, TransactionInfo},
};
use std::{fmt, sync::Arc};

/// Where in the pipeline an orchestrator decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrottleType {
    /// Ingest: enforces the long-term schedule expiry cap and uses the
    /// ingest gas rate with a one second burst
    Frontend,
    /// Consensus handle: uses the backend gas rate and burst
    Backend,
    /// Admits everything and touches nothing
    Noop,
}

impl ThrottleType {
    /// Upper-case name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThrottleType::Frontend => "FRONTEND",
            ThrottleType::Backend => "BACKEND",
            ThrottleType::Noop => "NOOP",
        }
    }
}

impl fmt::Display for ThrottleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of a transaction decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThrottleVerdict {
    /// Whether the transaction must be rejected
    pub should_throttle: bool,
    /// Set when the rejection is due to malformed input rather than load
    pub validation_error: Option<ThrottleError>,
    /// Whether the gas throttle rejected the transaction
    pub gas_throttled: bool,
}

impl ThrottleVerdict {
    /// Admit.
    pub fn allowed() -> Self {
        Self::default()
    }

    /// Reject for lack of capacity.
    pub fn throttled() -> Self {
        Self {
            should_throttle: true,
            ..Default::default()
        }
    }

    /// Reject for lack of gas capacity.
    pub fn gas_throttled() -> Self {
        Self {
            should_throttle: true,
            gas_throttled: true,
            ..Default::default()
        }
    }

    /// Reject because the transaction cannot be classified.
    pub fn invalid(error: ThrottleError) -> Self {
        Self {
            should_throttle: true,
            validation_error: Some(error),
            ..Default::default()
        }
    }

    fn from_met(met: bool) -> Self {
        if met {
            Self::allowed()
        } else {
            Self::throttled()
        }
    }
}

/// Admission control for one stage of the pipeline.
pub struct ThrottleOrchestrator {
    throttle_type: ThrottleType,
    config: Arc<dyn ConfigSource>,
    observer: Arc<dyn ThrottleObserver>,
    verbose: bool,
    capacity_split: u32,
    compiled: CompiledThrottleSet,
    next_generation: u64,
    gas_throttle: Option<ResourceThrottle>,
    bytes_throttle: Option<ResourceThrottle>,
    ops_duration_throttle: Option<ResourceThrottle>,
    last_txn_gas_throttled: bool,
}

impl fmt::Debug for ThrottleOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottleOrchestrator")
            .field("throttle_type", &self.throttle_type)
            .field("capacity_split", &self.capacity_split)
            .field("compiled", &self.compiled)
            .field("gas_throttle", &self.gas_throttle)
            .field("bytes_throttle", &self.bytes_throttle)
            .field("ops_duration_throttle", &self.ops_duration_throttle)
            .finish_non_exhaustive()
    }
}

impl ThrottleOrchestrator {
    /// Create an orchestrator with no throttles. Call [`Self::rebuild`] and
    /// the `apply_*_config` methods before deciding.
    pub fn new(throttle_type: ThrottleType, config: Arc<dyn ConfigSource>) -> Self {
        Self {
            throttle_type,
            config,
            observer: Arc::new(TracingObserver),
            verbose: false,
            capacity_split: 1,
            compiled: CompiledThrottleSet::empty(0),
            next_generation: 1,
            gas_throttle: None,
            bytes_throttle: None,
            ops_duration_throttle: None,
            last_txn_gas_throttled: false,
        }
    }

    /// Report events to `observer` instead of `tracing`.
    pub fn with_observer(mut self, observer: Arc<dyn ThrottleObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Report resolved throttles after every reconfiguration.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Split bucket capacity `split` ways.
    pub fn with_capacity_split(mut self, split: u32) -> Self {
        self.set_capacity_split(split);
        self
    }

    /// Change the capacity split; takes effect at the next rebuild.
    pub fn set_capacity_split(&mut self, split: u32) {
        self.capacity_split = split.max(1);
    }

    /// The stage this orchestrator decides for.
    pub fn throttle_type(&self) -> ThrottleType {
        self.throttle_type
    }

    /// The compiled TPS throttles and requirements.
    pub fn compiled(&self) -> &CompiledThrottleSet {
        &self.compiled
    }

    fn is_exempt(config: &ThrottleConfig, payer: Option<&AccountId>) -> bool {
        payer
            .and_then(AccountId::account_num)
            .is_some_and(|num| config.is_throttle_exempt(num))
    }

    fn reset_last_allowed_use(&mut self) {
        self.compiled.reset_last_allowed_use();
        for throttle in [self.gas_throttle.as_mut(), self.bytes_throttle.as_mut()]
            .into_iter()
            .flatten()
        {
            throttle.reset_last_allowed_use();
        }
    }

    fn reclaim_last_allowed_use(&mut self) {
        self.compiled.reclaim_last_allowed_use();
        for throttle in [self.gas_throttle.as_mut(), self.bytes_throttle.as_mut()]
            .into_iter()
            .flatten()
        {
            throttle.reclaim_last_allowed_use();
        }
    }

    fn usage(&self, throttle: ThrottleRef, amount: u64) -> ThrottleUsage {
        ThrottleUsage {
            throttle,
            amount,
            generation: self.compiled.generation(),
        }
    }

    /// Decide whether a transaction should be throttled, claiming capacity
    /// if it is admitted.
    ///
    /// When admitted, what was drawn is appended to `usages`.
    pub fn check_and_enforce_throttle(
        &mut self,
        txn: &TransactionInfo,
        now: Timestamp,
        ledger: &dyn LedgerView,
        usages: Option<&mut Vec<ThrottleUsage>>,
    ) -> ThrottleVerdict {
        if self.throttle_type == ThrottleType::Noop {
            return ThrottleVerdict::allowed();
        }
        self.reset_last_allowed_use();
        self.last_txn_gas_throttled = false;

        let config = self.config.current();
        let mut drawn = Vec::new();
        let verdict = self.should_throttle_txn(txn, now, &config, ledger, &mut drawn);
        if verdict.should_throttle {
            self.reclaim_last_allowed_use();
        } else if let Some(usages) = usages {
            usages.extend(drawn);
        }
        verdict
    }

    fn should_throttle_txn(
        &mut self,
        txn: &TransactionInfo,
        now: Timestamp,
        config: &ThrottleConfig,
        ledger: &dyn LedgerView,
        drawn: &mut Vec<ThrottleUsage>,
    ) -> ThrottleVerdict {
        let function = txn.functionality;

        // Exempt payers neither affect nor are affected by the throttles
        if Self::is_exempt(config, Some(&txn.payer)) {
            return ThrottleVerdict::allowed();
        }

        if config.contracts.throttle_by_gas && function.is_gas_throttled() {
            let amount = gas_limit_for(&txn.body, function);
            let Some(gas) = self.gas_throttle.as_mut() else {
                self.observer
                    .unconfigured_throttle(&ThrottleError::NotConfigured(ResourceKind::Gas));
                return ThrottleVerdict::throttled();
            };
            if !gas.allow(now, amount) {
                self.last_txn_gas_throttled = true;
                return ThrottleVerdict::gas_throttled();
            }
            drawn.push(self.usage(ThrottleRef::Gas, amount));
        }

        if config.jumbo.enabled && config.jumbo.allowed_functionalities.contains(&function) {
            let excess = (txn.serialized_size as u64)
                .saturating_sub(config.ledger.transaction_max_bytes);
            if excess > 0 {
                let Some(bytes) = self.bytes_throttle.as_mut() else {
                    self.observer
                        .unconfigured_throttle(&ThrottleError::NotConfigured(ResourceKind::Bytes));
                    return ThrottleVerdict::throttled();
                };
                if !bytes.allow(now, excess) {
                    return ThrottleVerdict::throttled();
                }
                drawn.push(self.usage(ThrottleRef::Bytes, excess));
            }
        }

        if self.compiled.manager(function).is_none() {
            return ThrottleVerdict::throttled();
        }

        let costs = DerivedCosts::new(ledger, config.ledger.shard, config.ledger.realm);
        match function {
            Functionality::ScheduleCreate => {
                self.schedule_create_verdict(txn, now, config, ledger, drawn)
            }
            Functionality::TokenMint => {
                let nfts = match &txn.body.data {
                    TransactionData::TokenMint(op) => op.metadata.len() as u64,
                    _ => 0,
                };
                let met = if nfts == 0 {
                    self.reqs_met(function, now, 1, ScaleFactor::ONE_TO_ONE, drawn)
                } else {
                    let scale = config.tokens.nfts_mint_throttle_scale_factor;
                    self.reqs_met(function, now, nfts, scale, drawn)
                };
                ThrottleVerdict::from_met(met)
            }
            Functionality::CryptoTransfer => {
                let implicit = costs.implicit_creations(&txn.body).known().unwrap_or(0);
                let met = if implicit > 0 {
                    self.implicit_creations_met(implicit, now, drawn)
                } else {
                    let associations = costs.auto_associations(&txn.body);
                    if config.entities.unlimited_auto_associations_enabled && associations > 0 {
                        self.reqs_met(
                            Functionality::TokenAssociateToAccount,
                            now,
                            associations,
                            ScaleFactor::ONE_TO_ONE,
                            drawn,
                        )
                    } else {
                        self.reqs_met(function, now, 1, ScaleFactor::ONE_TO_ONE, drawn)
                    }
                };
                ThrottleVerdict::from_met(met)
            }
            Functionality::EthereumTransaction => match costs.implicit_creations(&txn.body) {
                ImplicitCreations::Unknown => ThrottleVerdict::invalid(
                    ThrottleError::InvalidEthereumData("implicit creations unknown".to_string()),
                ),
                ImplicitCreations::Known(0) => ThrottleVerdict::from_met(self.reqs_met(
                    function,
                    now,
                    1,
                    ScaleFactor::ONE_TO_ONE,
                    drawn,
                )),
                ImplicitCreations::Known(count) => {
                    ThrottleVerdict::from_met(self.implicit_creations_met(count, now, drawn))
                }
            },
            _ => ThrottleVerdict::from_met(self.reqs_met(
                function,
                now,
                1,
                ScaleFactor::ONE_TO_ONE,
                drawn,
            )),
        }
    }

    fn schedule_create_verdict(
        &mut self,
        txn: &TransactionInfo,
        now: Timestamp,
        config: &ThrottleConfig,
        ledger: &dyn LedgerView,
        drawn: &mut Vec<ThrottleUsage>,
    ) -> ThrottleVerdict {
        let valid_start = txn.body.valid_start();
        let classified = match &txn.body.data {
            TransactionData::ScheduleCreate(op) => op
                .inner_transaction(&txn.payer, valid_start)
                .map(|(inner, function)| (op, inner, function)),
            _ => Err(ThrottleError::InvalidScheduledTransaction(
                "missing schedule create body".to_string(),
            )),
        };
        let (op, inner, inner_function) = match classified {
            Ok(classified) => classified,
            Err(err) => {
                self.observer.invalid_scheduled_transaction(&err);
                return ThrottleVerdict::invalid(err);
            }
        };

        if !config.scheduling.long_term_enabled {
            if inner_function == Functionality::CryptoTransfer {
                if let Some(transfer) = inner.crypto_transfer().filter(|op| op.uses_aliases()) {
                    let costs = DerivedCosts::new(ledger, config.ledger.shard, config.ledger.realm);
                    let implicit = costs.transfer_implicit_creations(transfer);
                    if implicit > 0 {
                        return ThrottleVerdict::from_met(
                            self.implicit_creations_met(implicit, now, drawn),
                        );
                    }
                }
            }
            return ThrottleVerdict::from_met(self.reqs_met(
                Functionality::ScheduleCreate,
                now,
                1,
                ScaleFactor::ONE_TO_ONE,
                drawn,
            ));
        }

        if !self.reqs_met(
            Functionality::ScheduleCreate,
            now,
            1,
            ScaleFactor::ONE_TO_ONE,
            drawn,
        ) {
            return ThrottleVerdict::throttled();
        }
        if self.throttle_type == ThrottleType::Frontend {
            let expiry = schedule_expiry_second(
                op,
                valid_start,
                config.ledger.schedule_tx_expiry_time_secs,
            );
            if ledger.num_schedules_expiring_at(expiry) >= config.scheduling.max_txn_per_sec {
                return ThrottleVerdict::throttled();
            }
        }
        ThrottleVerdict::allowed()
    }

    fn reqs_met(
        &mut self,
        function: Functionality,
        now: Timestamp,
        quantity: u64,
        scale: ScaleFactor,
        drawn: &mut Vec<ThrottleUsage>,
    ) -> bool {
        self.compiled
            .all_reqs_met_at(function, now, quantity, scale, Some(drawn))
            .unwrap_or(false)
    }

    fn implicit_creations_met(
        &mut self,
        count: u64,
        now: Timestamp,
        drawn: &mut Vec<ThrottleUsage>,
    ) -> bool {
        self.reqs_met(
            Functionality::CryptoCreate,
            now,
            count,
            ScaleFactor::ONE_TO_ONE,
            drawn,
        )
    }

    /// Decide whether a query should be throttled.
    pub fn check_and_enforce_query_throttle(
        &mut self,
        query: &Query,
        now: Timestamp,
        payer: Option<&AccountId>,
        ledger: &dyn LedgerView,
    ) -> bool {
        if self.throttle_type == ThrottleType::Noop {
            return false;
        }
        let config = self.config.current();
        if Self::is_exempt(&config, payer) {
            return false;
        }

        let function = query.functionality();
        if function.is_gas_throttled() {
            if !config.contracts.throttle_by_gas {
                return false;
            }
            let gas = match query {
                Query::ContractCallLocal { gas } => u64::try_from(*gas).unwrap_or(i64::MAX as u64),
                _ => 0,
            };
            let Some(throttle) = self.gas_throttle.as_mut() else {
                self.observer
                    .unconfigured_throttle(&ThrottleError::NotConfigured(ResourceKind::Gas));
                return true;
            };
            // A lone draw needs no rollback, so commit it straight away
            throttle.reset_last_allowed_use();
            let allowed = throttle.allow(now, gas);
            throttle.reset_last_allowed_use();
            return !allowed;
        }

        self.reset_last_allowed_use();
        let met = if function == Functionality::CryptoGetAccountBalance
            && config.tokens.counting_get_balance_throttle_enabled
        {
            let associations = match query {
                Query::CryptoGetAccountBalance {
                    account_id: Some(account),
                } => ledger.num_associations(account).unwrap_or(0),
                _ => 0,
            };
            let charged = associations.clamp(1, config.tokens.max_rels_per_info_query.max(1));
            self.compiled
                .all_reqs_met_at(function, now, charged, ScaleFactor::ONE_TO_ONE, None)
        } else {
            self.compiled
                .all_reqs_met_at(function, now, 1, ScaleFactor::ONE_TO_ONE, None)
        };

        match met {
            None => true,
            Some(true) => false,
            Some(false) => {
                self.reclaim_last_allowed_use();
                true
            }
        }
    }

    /// Decide whether a contract execution that has used
    /// `current_ops_duration` so far must be stopped.
    pub fn check_ops_duration(&mut self, current_ops_duration: u64, now: Timestamp) -> bool {
        if self.throttle_type == ThrottleType::Noop {
            return false;
        }
        let enabled = self.config.current().contracts.throttle_by_ops_duration;
        let Some(throttle) = self.ops_duration_throttle.as_mut() else {
            if enabled {
                let error = ThrottleError::NotConfigured(ResourceKind::OpsDuration);
                self.observer.unconfigured_throttle(&error);
            }
            return enabled;
        };
        throttle.reset_last_allowed_use();
        if enabled && !throttle.allow(now, current_ops_duration) {
            throttle.reclaim_last_allowed_use();
            return true;
        }
        false
    }

    /// Decide whether `n` operations of `function` should be throttled,
    /// bypassing the per-functionality dispatch policy.
    pub fn should_throttle_n_of_unscaled(
        &mut self,
        n: u64,
        function: Functionality,
        now: Timestamp,
    ) -> bool {
        if self.throttle_type == ThrottleType::Noop {
            return false;
        }
        self.reset_last_allowed_use();
        match self
            .compiled
            .all_reqs_met_at(function, now, n, ScaleFactor::ONE_TO_ONE, None)
        {
            None => true,
            Some(true) => false,
            Some(false) => {
                self.reclaim_last_allowed_use();
                true
            }
        }
    }

    /// Give back the capacity `n` operations of `function` claimed.
    pub fn leak_capacity_for_n_of_unscaled(
        &mut self,
        n: u64,
        function: Functionality,
    ) -> ThrottleResult<()> {
        if self.throttle_type == ThrottleType::Noop {
            return Ok(());
        }
        self.compiled.undo_claimed_reqs_for(function, n)
    }

    /// Refund gas reserved by `payer` but not consumed.
    pub fn leak_unused_gas_previously_reserved(&mut self, payer: &AccountId, amount: u64) {
        if self.throttle_type == ThrottleType::Noop {
            return;
        }
        if Self::is_exempt(&self.config.current(), Some(payer)) {
            return;
        }
        if let Some(gas) = self.gas_throttle.as_mut() {
            gas.leak_capacity(amount);
        }
    }

    /// Return exactly what an admitted decision recorded.
    ///
    /// TPS usages drawn from a previous compiled set are skipped.
    pub fn reclaim_usages(&mut self, usages: &[ThrottleUsage]) {
        let generation = self.compiled.generation();
        for usage in usages {
            let throttle = match usage.throttle {
                ThrottleRef::Tps(index) if usage.generation == generation => {
                    self.compiled.throttles_mut().get_mut(index)
                }
                ThrottleRef::Tps(_) => None,
                ThrottleRef::Gas => self.gas_throttle.as_mut(),
                ThrottleRef::Bytes => self.bytes_throttle.as_mut(),
                ThrottleRef::OpsDuration => self.ops_duration_throttle.as_mut(),
            };
            if let Some(throttle) = throttle {
                throttle.leak_capacity(usage.amount);
            }
        }
    }

    /// Replace every TPS throttle with ones compiled from `definitions`.
    pub fn rebuild(&mut self, definitions: &ThrottleDefinitions) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.compiled = CompiledThrottleSet::compile(
            definitions,
            self.capacity_split,
            generation,
            self.observer.as_ref(),
        );
        if self.verbose {
            self.observer.definitions_resolved(&self.resolved_summary());
        }
    }

    /// Human-readable effective rates of every functionality.
    pub fn resolved_summary(&self) -> String {
        let mut summary = format!(
            "Resolved {} (after splitting capacity {} ways) -",
            self.throttle_type,
            self.compiled.capacity_split()
        );
        for line in self.compiled.readable_requirements() {
            summary.push_str("\n  ");
            summary.push_str(&line);
        }
        summary
    }

    fn report_resolved(&self, throttle: &ResourceThrottle, enabled: bool) {
        if enabled && throttle.rate() == 0 {
            self.observer
                .zero_rate_enabled(self.throttle_type.as_str(), throttle);
        }
        if self.verbose {
            self.observer
                .resource_throttle_resolved(self.throttle_type.as_str(), throttle, enabled);
        }
    }

    /// Rebuild the gas throttle from the current configuration.
    pub fn apply_gas_config(&mut self) {
        let contracts = self.config.current().contracts.clone();
        let (rate, burst_seconds) = match self.throttle_type {
            ThrottleType::Backend => (
                contracts.max_gas_per_sec_backend,
                contracts.gas_throttle_burst_seconds,
            ),
            _ => (contracts.max_gas_per_sec, DEFAULT_BURST_SECONDS),
        };
        let throttle = ResourceThrottle::per_second(ResourceKind::Gas, rate, burst_seconds);
        self.report_resolved(&throttle, contracts.throttle_by_gas);
        self.gas_throttle = Some(throttle);
    }

    /// Rebuild the jumbo bytes throttle from the current configuration.
    pub fn apply_bytes_config(&mut self) {
        let jumbo = self.config.current().jumbo.clone();
        let throttle = ResourceThrottle::per_second(
            ResourceKind::Bytes,
            jumbo.max_bytes_per_sec,
            DEFAULT_BURST_SECONDS,
        );
        self.report_resolved(&throttle, jumbo.enabled);
        self.bytes_throttle = Some(throttle);
    }

    /// Rebuild the ops-duration throttle from the current configuration.
    pub fn apply_duration_config(&mut self) {
        let contracts = self.config.current().contracts.clone();
        let throttle = ResourceThrottle::per_second(
            ResourceKind::OpsDuration,
            contracts.max_ops_duration,
            DEFAULT_BURST_SECONDS,
        );
        self.report_resolved(&throttle, contracts.throttle_by_ops_duration);
        self.ops_duration_throttle = Some(throttle);
    }

    /// Every active TPS throttle.
    pub fn all_active_throttles(&self) -> &[ResourceThrottle] {
        self.compiled.throttles()
    }

    /// The TPS throttles `function` draws from.
    pub fn active_throttles_for(&self, function: Functionality) -> Vec<&ResourceThrottle> {
        self.compiled.active_throttles_for(function)
    }

    /// Whether the last transaction decision was rejected by the gas throttle.
    pub fn was_last_txn_gas_throttled(&self) -> bool {
        self.last_txn_gas_throttled
    }

    /// The gas throttle.
    pub fn gas_limit_throttle(&self) -> ThrottleResult<&ResourceThrottle> {
        self.gas_throttle
            .as_ref()
            .ok_or(ThrottleError::NotConfigured(ResourceKind::Gas))
    }

    /// The jumbo bytes throttle.
    pub fn bytes_limit_throttle(&self) -> ThrottleResult<&ResourceThrottle> {
        self.bytes_throttle
            .as_ref()
            .ok_or(ThrottleError::NotConfigured(ResourceKind::Bytes))
    }

    /// The ops-duration throttle.
    pub fn ops_duration_throttle(&self) -> ThrottleResult<&ResourceThrottle> {
        self.ops_duration_throttle
            .as_ref()
            .ok_or(ThrottleError::NotConfigured(ResourceKind::OpsDuration))
    }

    /// Usage levels of the TPS, gas and ops-duration throttles.
    pub fn usage_snapshots(&self) -> ThrottleUsageSnapshots {
        ThrottleUsageSnapshots {
            tps_throttles: self
                .compiled
                .throttles()
                .iter()
                .map(ResourceThrottle::usage_snapshot)
                .collect(),
            gas_throttle: self
                .gas_throttle
                .as_ref()
                .map(ResourceThrottle::usage_snapshot),
            ops_duration_throttle: self
                .ops_duration_throttle
                .as_ref()
                .map(ResourceThrottle::usage_snapshot),
        }
    }

    /// Restore usage levels positionally. Entries without a counterpart are
    /// ignored.
    pub fn reset_usage_to(&mut self, snapshots: &ThrottleUsageSnapshots) {
        let expected = self.compiled.throttles().len();
        if expected != snapshots.tps_throttles.len() {
            self.observer
                .snapshot_mismatch(expected, snapshots.tps_throttles.len());
        }
        let throttles = self.compiled.throttles_mut();
        for (throttle, snapshot) in throttles.iter_mut().zip(&snapshots.tps_throttles) {
            throttle.reset_usage_to(snapshot);
        }
        if let (Some(throttle), Some(snapshot)) =
            (self.gas_throttle.as_mut(), snapshots.gas_throttle.as_ref())
        {
            throttle.reset_usage_to(snapshot);
        }
        if let (Some(throttle), Some(snapshot)) = (
            self.ops_duration_throttle.as_mut(),
            snapshots.ops_duration_throttle.as_ref(),
        ) {
            throttle.reset_usage_to(snapshot);
        }
    }
}
