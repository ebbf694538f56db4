// Copyright (c) 2024 Botho Foundation

//! Deterministic leaky-bucket admission control for Botho nodes.
//!
//! This crate decides, for each incoming transaction or query, whether the
//! node has capacity to accept it:
//!
//! - **TPS Throttles**: Named buckets compiled from a JSON definitions
//!   document, shared by groups of functionalities at different rates
//! - **Resource Throttles**: Gas, jumbo payload bytes and contract ops
//!   duration, each metered by its own bucket
//! - **Derived Costs**: Implicit account creations, auto-associations and
//!   NFT counts are charged against the buckets of the work they cause
//! - **Deterministic Rollback**: A rejected transaction leaves every bucket
//!   exactly as it found it
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    ThrottleOrchestrator                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────────────┐  ┌──────────────┐  ┌───────────────┐  │
//! │  │ CompiledThrottle  │  │ Gas / Bytes /│  │ DerivedCosts  │  │
//! │  │ Set (TPS buckets) │  │ OpsDuration  │  │ (LedgerView)  │  │
//! │  └───────────────────┘  └──────────────┘  └───────────────┘  │
//! │            │                    │                            │
//! │            └──────── CapacityBucket ─────────                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use bth_throttle::{
//!     StaticConfig, ThrottleConfig, ThrottleDefinitions, ThrottleOrchestrator, ThrottleType,
//! };
//! use std::sync::Arc;
//!
//! let config = Arc::new(StaticConfig::new(ThrottleConfig::default()));
//! let mut orchestrator = ThrottleOrchestrator::new(ThrottleType::Frontend, config)
//!     .with_capacity_split(4);
//!
//! orchestrator.rebuild(&ThrottleDefinitions::from_json_str(&json)?);
//! orchestrator.apply_gas_config();
//! orchestrator.apply_bytes_config();
//! orchestrator.apply_duration_config();
//!
//! let verdict = orchestrator.check_and_enforce_throttle(&txn, now, &ledger, None);
//! if verdict.should_throttle {
//!     return Err(Busy);
//! }
//! ```
//!
//! # Determinism
//!
//! Every decision depends only on the consensus time passed in, the current
//! configuration and the ledger view. There is no wall clock and no
//! randomness, so nodes replaying the same inputs reach the same verdicts.
//!
//! # Configuration
//!
//! See [`ThrottleConfig`] for all configuration options including:
//!
//! - Throttle-exempt payers
//! - Gas, bytes and ops-duration rates
//! - NFT mint scaling and balance query counting
//! - Long-term scheduling caps

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod bucket;
pub mod compiled;
pub mod config;
pub mod definitions;
pub mod derived;
pub mod entity;
pub mod error;
pub mod ethereum;
pub mod functionality;
pub mod ledger;
pub mod observer;
pub mod orchestrator;
pub mod requirements;
pub mod scale;
pub mod throttle;
pub mod time;
pub mod transaction;

// Re-export main types for convenience
pub use bucket::CapacityBucket;
pub use compiled::CompiledThrottleSet;
pub use config::{
    ConfigSource, SharedConfig, StaticConfig, ThrottleConfig, ThrottleConfigBuilder,
};
pub use definitions::{CompiledBucket, ThrottleBucketDef, ThrottleDefinitions, ThrottleGroupDef};
pub use derived::{gas_limit_for, schedule_expiry_second, DerivedCosts, ImplicitCreations};
pub use entity::{AccountId, AccountRef, TokenId};
pub use error::{ThrottleError, ThrottleResult};
pub use ethereum::EthTxData;
pub use functionality::Functionality;
pub use ledger::{InMemoryLedger, LedgerView};
pub use observer::{ThrottleObserver, TracingObserver};
pub use orchestrator::{ThrottleOrchestrator, ThrottleType, ThrottleVerdict};
pub use requirements::{RequirementManager, ThrottleRef, ThrottleRequirement, ThrottleUsage};
pub use scale::ScaleFactor;
pub use throttle::{
    ResourceKind, ResourceThrottle, ThrottleUsageSnapshot, ThrottleUsageSnapshots,
    DEFAULT_BURST_SECONDS,
};
pub use time::Timestamp;
pub use transaction::{
    AccountAmount, CryptoTransferBody, NftTransfer, Query, ScheduleCreateBody, TokenMintBody,
    TokenTransferList, TransactionBody, TransactionData, TransactionId, TransactionInfo,
};
