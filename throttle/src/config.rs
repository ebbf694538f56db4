// Copyright (c) 2024 Botho Foundation

//! Live configuration consulted by the throttle engine.
//!
//! Configuration is grouped in sections that mirror the node's TOML file:
//!
//! ```toml
//! [accounts]
//! last_throttle_exempt = 1000
//!
//! [contracts]
//! throttle_by_gas = true
//! max_gas_per_sec = 15000000
//!
//! [tokens]
//! nfts_mint_throttle_scale_factor = "5:2"
//! ```
//!
//! Every field has a default, so a partial file is always accepted.

use crate::{
    error::{ThrottleError, ThrottleResult},
    functionality::Functionality,
    scale::ScaleFactor,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, sync::Arc};

/// All throttle-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Payer exemptions
    pub accounts: AccountsConfig,
    /// Gas and ops-duration throttling
    pub contracts: ContractsConfig,
    /// Jumbo transaction byte throttling
    pub jumbo: JumboConfig,
    /// Network-wide ledger limits
    pub ledger: LedgerConfig,
    /// Token-specific scaling
    pub tokens: TokensConfig,
    /// Entity side effects
    pub entities: EntitiesConfig,
    /// Long-term scheduling
    pub scheduling: SchedulingConfig,
}

/// Payer exemptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    /// Payers numbered `1..=last_throttle_exempt` are never throttled
    pub last_throttle_exempt: u64,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            last_throttle_exempt: 1000,
        }
    }
}

/// Gas and ops-duration throttling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    /// Whether contract transactions are metered by gas
    pub throttle_by_gas: bool,
    /// Gas per second at ingest
    pub max_gas_per_sec: u64,
    /// Gas per second at consensus
    pub max_gas_per_sec_backend: u64,
    /// Burst period of the consensus gas throttle
    pub gas_throttle_burst_seconds: u64,
    /// Whether contract execution is metered by ops duration
    pub throttle_by_ops_duration: bool,
    /// Ops duration units per second
    pub max_ops_duration: u64,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            throttle_by_gas: true,
            max_gas_per_sec: 15_000_000,
            max_gas_per_sec_backend: 15_000_000,
            gas_throttle_burst_seconds: 1,
            throttle_by_ops_duration: false,
            max_ops_duration: 6_000_000_000,
        }
    }
}

/// Jumbo transaction byte throttling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumboConfig {
    /// Whether transactions above the standard size are accepted and metered
    pub enabled: bool,
    /// Excess bytes per second
    pub max_bytes_per_sec: u64,
    /// Functionalities allowed to exceed the standard size
    #[serde(default = "default_jumbo_functionalities")]
    pub allowed_functionalities: Vec<Functionality>,
}

fn default_jumbo_functionalities() -> Vec<Functionality> {
    vec![Functionality::EthereumTransaction]
}

impl Default for JumboConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_bytes_per_sec: 10 * 1024 * 1024,
            allowed_functionalities: default_jumbo_functionalities(),
        }
    }
}

/// Network-wide ledger limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Standard maximum serialized transaction size
    pub transaction_max_bytes: u64,
    /// Shard of this network
    pub shard: u64,
    /// Realm of this network
    pub realm: u64,
    /// Lifetime of a schedule that does not wait for expiry
    pub schedule_tx_expiry_time_secs: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            transaction_max_bytes: 6144,
            shard: 0,
            realm: 0,
            schedule_tx_expiry_time_secs: 1800,
        }
    }
}

/// Token-specific scaling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokensConfig {
    /// Cost of each minted NFT relative to a plain mint
    pub nfts_mint_throttle_scale_factor: ScaleFactor,
    /// Whether balance queries are charged per token association
    pub counting_get_balance_throttle_enabled: bool,
    /// Cap on the associations charged to one balance query
    pub max_rels_per_info_query: u64,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            nfts_mint_throttle_scale_factor: ScaleFactor::new(5, 2)
                .unwrap_or(ScaleFactor::ONE_TO_ONE),
            counting_get_balance_throttle_enabled: false,
            max_rels_per_info_query: 1000,
        }
    }
}

/// Entity side effects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitiesConfig {
    /// Whether transfers can create any number of token associations
    pub unlimited_auto_associations_enabled: bool,
}

/// Long-term scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Whether schedules may wait for an explicit expiry
    pub long_term_enabled: bool,
    /// Schedules allowed to expire in a single second
    pub max_txn_per_sec: u64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            long_term_enabled: false,
            max_txn_per_sec: 100,
        }
    }
}

impl ThrottleConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(contents: &str) -> ThrottleResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load a TOML file.
    pub fn load(path: &Path) -> ThrottleResult<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            ThrottleError::Config(format!("failed to read {}: {}", path.display(), err))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> ThrottleResult<String> {
        toml::to_string_pretty(self).map_err(|err| ThrottleError::Config(err.to_string()))
    }

    /// Whether `account_num` falls in the throttle-exempt range.
    pub fn is_throttle_exempt(&self, account_num: u64) -> bool {
        (1..=self.accounts.last_throttle_exempt).contains(&account_num)
    }
}

/// Builder for ThrottleConfig.
#[derive(Debug, Default)]
pub struct ThrottleConfigBuilder {
    config: ThrottleConfig,
}

impl ThrottleConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the last throttle-exempt account number.
    pub fn last_throttle_exempt(mut self, num: u64) -> Self {
        self.config.accounts.last_throttle_exempt = num;
        self
    }

    /// Enable or disable gas throttling.
    pub fn throttle_by_gas(mut self, enable: bool) -> Self {
        self.config.contracts.throttle_by_gas = enable;
        self
    }

    /// Set the ingest gas rate.
    pub fn max_gas_per_sec(mut self, gas: u64) -> Self {
        self.config.contracts.max_gas_per_sec = gas;
        self
    }

    /// Set the consensus gas rate and burst.
    pub fn backend_gas(mut self, gas: u64, burst_seconds: u64) -> Self {
        self.config.contracts.max_gas_per_sec_backend = gas;
        self.config.contracts.gas_throttle_burst_seconds = burst_seconds;
        self
    }

    /// Enable ops-duration throttling at the given rate.
    pub fn ops_duration(mut self, enable: bool, max_ops_duration: u64) -> Self {
        self.config.contracts.throttle_by_ops_duration = enable;
        self.config.contracts.max_ops_duration = max_ops_duration;
        self
    }

    /// Enable jumbo transactions at the given byte rate.
    pub fn jumbo(mut self, enable: bool, max_bytes_per_sec: u64) -> Self {
        self.config.jumbo.enabled = enable;
        self.config.jumbo.max_bytes_per_sec = max_bytes_per_sec;
        self
    }

    /// Set the standard maximum transaction size.
    pub fn transaction_max_bytes(mut self, bytes: u64) -> Self {
        self.config.ledger.transaction_max_bytes = bytes;
        self
    }

    /// Set the NFT mint scale factor.
    pub fn nfts_mint_scale_factor(mut self, scale: ScaleFactor) -> Self {
        self.config.tokens.nfts_mint_throttle_scale_factor = scale;
        self
    }

    /// Enable counting balance queries by association, capped at `max_rels`.
    pub fn counting_get_balance(mut self, enable: bool, max_rels: u64) -> Self {
        self.config.tokens.counting_get_balance_throttle_enabled = enable;
        self.config.tokens.max_rels_per_info_query = max_rels;
        self
    }

    /// Enable or disable unlimited auto-associations.
    pub fn unlimited_auto_associations(mut self, enable: bool) -> Self {
        self.config.entities.unlimited_auto_associations_enabled = enable;
        self
    }

    /// Enable long-term scheduling with a per-second expiry cap.
    pub fn long_term_scheduling(mut self, enable: bool, max_txn_per_sec: u64) -> Self {
        self.config.scheduling.long_term_enabled = enable;
        self.config.scheduling.max_txn_per_sec = max_txn_per_sec;
        self
    }

    /// Build the config.
    pub fn build(self) -> ThrottleConfig {
        self.config
    }
}

/// Supplies the configuration in effect for the next decision.
pub trait ConfigSource: Send + Sync {
    /// The current configuration.
    fn current(&self) -> Arc<ThrottleConfig>;
}

/// A configuration that never changes.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig(Arc<ThrottleConfig>);

impl StaticConfig {
    /// Wrap a configuration.
    pub fn new(config: ThrottleConfig) -> Self {
        Self(Arc::new(config))
    }
}

impl ConfigSource for StaticConfig {
    fn current(&self) -> Arc<ThrottleConfig> {
        self.0.clone()
    }
}

/// A configuration the embedding node may replace at runtime.
///
/// Clones share the same underlying value.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<Arc<ThrottleConfig>>>,
}

impl SharedConfig {
    /// Share a configuration.
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Replace the configuration seen by subsequent reads.
    pub fn update(&self, config: ThrottleConfig) {
        *self.inner.write() = Arc::new(config);
    }
}

impl ConfigSource for SharedConfig {
    fn current(&self) -> Arc<ThrottleConfig> {
        self.inner.read().clone()
    }
}
