// Copyright (c) 2024 Botho Foundation

//! End-to-end admission scenarios driven through the public orchestrator API.

use alloy_rlp::{Encodable, Header};
use bth_throttle::{
    AccountAmount, AccountId, CryptoTransferBody, Functionality, InMemoryLedger, ResourceThrottle,
    SharedConfig, StaticConfig, ThrottleConfig, ThrottleConfigBuilder, ThrottleDefinitions,
    ThrottleError, ThrottleObserver, ThrottleOrchestrator, ThrottleType, ThrottleVerdict,
    Timestamp, TokenMintBody, TransactionBody, TransactionData, TransactionInfo,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const MICROS_PER_OP: u64 = 1_000_000;

const DEFINITIONS: &str = r#"{
    "buckets": [
        {
            "name": "TransferLimits",
            "burstPeriod": 1,
            "throttleGroups": [{ "opsPerSec": 10, "operations": ["CryptoTransfer", "EthereumTransaction"] }]
        },
        {
            "name": "CreationLimits",
            "burstPeriod": 1,
            "throttleGroups": [{ "opsPerSec": 5, "operations": ["CryptoCreate"] }]
        },
        {
            "name": "MintLimits",
            "burstPeriod": 1,
            "throttleGroups": [{ "opsPerSec": 4, "operations": ["TokenMint", "ContractCall"] }]
        }
    ]
}"#;

#[derive(Default)]
struct CollectingObserver {
    rejected: Mutex<Vec<String>>,
    zero_rate: Mutex<Vec<String>>,
}

impl ThrottleObserver for CollectingObserver {
    fn bucket_rejected(&self, bucket: &str, _error: &ThrottleError) {
        self.rejected.lock().push(bucket.to_string());
    }

    fn zero_rate_enabled(&self, _throttle_type: &str, throttle: &ResourceThrottle) {
        self.zero_rate.lock().push(throttle.name().to_string());
    }
}

fn now() -> Timestamp {
    Timestamp::new(1_700_000_000, 0)
}

/// Route the default observer's events to the test output; set `RUST_LOG`
/// to see them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn frontend(config: ThrottleConfig) -> ThrottleOrchestrator {
    init_tracing();
    let mut orchestrator =
        ThrottleOrchestrator::new(ThrottleType::Frontend, Arc::new(StaticConfig::new(config)));
    orchestrator.rebuild(&ThrottleDefinitions::from_json_str(DEFINITIONS).unwrap());
    orchestrator.apply_gas_config();
    orchestrator.apply_bytes_config();
    orchestrator.apply_duration_config();
    orchestrator
}

fn used(orchestrator: &ThrottleOrchestrator, name: &str) -> u64 {
    orchestrator
        .all_active_throttles()
        .iter()
        .find(|throttle| throttle.name() == name)
        .map(ResourceThrottle::used)
        .unwrap()
}

fn submit(payer: u64, data: TransactionData) -> TransactionInfo {
    TransactionInfo::new(AccountId::num(payer), TransactionBody::new(data), 256)
}

fn ed25519_alias(seed: u8) -> Vec<u8> {
    let mut alias = vec![0x12, 0x20];
    alias.extend_from_slice(&[seed; 32]);
    alias
}

fn legacy_eth(gas_limit: u64, to: &[u8], value: u64) -> Vec<u8> {
    let empty: &[u8] = &[];
    let mut fields = Vec::new();
    1u64.encode(&mut fields);
    10u64.encode(&mut fields);
    gas_limit.encode(&mut fields);
    to.encode(&mut fields);
    value.encode(&mut fields);
    empty.encode(&mut fields);
    27u64.encode(&mut fields);
    (&[1u8; 32][..]).encode(&mut fields);
    (&[2u8; 32][..]).encode(&mut fields);

    let mut out = Vec::new();
    Header {
        list: true,
        payload_length: fields.len(),
    }
    .encode(&mut out);
    out.extend(fields);
    out
}

// ============================================================================
// Derived costs
// ============================================================================

#[test]
fn implicit_creations_draw_from_crypto_create_only() {
    let mut orchestrator = frontend(ThrottleConfig::default());
    let transfer = submit(
        5000,
        TransactionData::CryptoTransfer(CryptoTransferBody {
            transfers: vec![
                AccountAmount::new(AccountId::num(5000), -2),
                AccountAmount::new(AccountId::alias(ed25519_alias(1)), 1),
                AccountAmount::new(AccountId::alias(ed25519_alias(2)), 1),
            ],
            token_transfers: vec![],
        }),
    );

    let verdict =
        orchestrator.check_and_enforce_throttle(&transfer, now(), &InMemoryLedger::new(), None);
    assert_eq!(verdict, ThrottleVerdict::allowed());
    assert_eq!(used(&orchestrator, "CreationLimits"), 2 * MICROS_PER_OP);
    assert_eq!(used(&orchestrator, "TransferLimits"), 0);
}

#[test]
fn resolvable_aliases_are_plain_transfers() {
    let mut orchestrator = frontend(ThrottleConfig::default());
    let ledger = InMemoryLedger::new().with_alias(ed25519_alias(1), 6001);
    let transfer = submit(
        5000,
        TransactionData::CryptoTransfer(CryptoTransferBody {
            transfers: vec![
                AccountAmount::new(AccountId::num(5000), -1),
                AccountAmount::new(AccountId::alias(ed25519_alias(1)), 1),
            ],
            token_transfers: vec![],
        }),
    );

    assert!(
        !orchestrator.check_and_enforce_throttle(&transfer, now(), &ledger, None).should_throttle
    );
    assert_eq!(used(&orchestrator, "CreationLimits"), 0);
    assert_eq!(used(&orchestrator, "TransferLimits"), MICROS_PER_OP);
}

#[test]
fn ethereum_transfer_to_new_alias_is_an_implicit_creation() {
    let mut orchestrator = frontend(ThrottleConfig::default());
    let ledger = InMemoryLedger::new().with_alias(vec![0x77; 20], 6001);

    let to_new = submit(
        5000,
        TransactionData::EthereumTransaction {
            ethereum_data: legacy_eth(21_000, &[0x66; 20], 1),
        },
    );
    assert!(
        !orchestrator.check_and_enforce_throttle(&to_new, now(), &ledger, None).should_throttle
    );
    assert_eq!(used(&orchestrator, "CreationLimits"), MICROS_PER_OP);
    assert_eq!(used(&orchestrator, "TransferLimits"), 0);
    assert_eq!(orchestrator.gas_limit_throttle().unwrap().used(), 21_000);

    let to_existing = submit(
        5000,
        TransactionData::EthereumTransaction {
            ethereum_data: legacy_eth(21_000, &[0x77; 20], 1),
        },
    );
    assert!(
        !orchestrator.check_and_enforce_throttle(&to_existing, now(), &ledger, None).should_throttle
    );
    assert_eq!(used(&orchestrator, "TransferLimits"), MICROS_PER_OP);
}

#[test]
fn ethereum_contract_creation_with_value_is_an_implicit_creation() {
    let config = ThrottleConfigBuilder::new().throttle_by_gas(false).build();
    let mut orchestrator = frontend(config);
    let empty: &[u8] = &[];
    let create = submit(
        5000,
        TransactionData::EthereumTransaction {
            ethereum_data: legacy_eth(21_000, empty, 5),
        },
    );

    let verdict =
        orchestrator.check_and_enforce_throttle(&create, now(), &InMemoryLedger::new(), None);
    assert_eq!(verdict, ThrottleVerdict::allowed());
    assert_eq!(used(&orchestrator, "CreationLimits"), MICROS_PER_OP);
    assert_eq!(used(&orchestrator, "TransferLimits"), 0);
}

// ============================================================================
// Exemptions and gas
// ============================================================================

#[test]
fn exempt_payer_is_admitted_when_saturated() {
    let mut orchestrator = frontend(ThrottleConfig::default());
    let ledger = InMemoryLedger::new();
    let create = |payer| submit(payer, TransactionData::Other(Functionality::CryptoCreate));

    for _ in 0..5 {
        assert!(
            !orchestrator
                .check_and_enforce_throttle(&create(5000), now(), &ledger, None)
                .should_throttle
        );
    }
    assert!(
        orchestrator.check_and_enforce_throttle(&create(5000), now(), &ledger, None).should_throttle
    );

    let before = orchestrator.usage_snapshots();
    for payer in [1, 500, 1000] {
        let verdict = orchestrator.check_and_enforce_throttle(&create(payer), now(), &ledger, None);
        assert_eq!(verdict, ThrottleVerdict::allowed());
    }
    assert_eq!(orchestrator.usage_snapshots(), before);
}

#[test]
fn zero_gas_rate_denies_every_contract_call() {
    let observer = Arc::new(CollectingObserver::default());
    let config = ThrottleConfigBuilder::new().max_gas_per_sec(0).build();
    let mut orchestrator =
        ThrottleOrchestrator::new(ThrottleType::Frontend, Arc::new(StaticConfig::new(config)))
            .with_observer(observer.clone());
    orchestrator.rebuild(&ThrottleDefinitions::from_json_str(DEFINITIONS).unwrap());
    orchestrator.apply_gas_config();
    assert_eq!(*observer.zero_rate.lock(), vec!["Gas".to_string()]);

    let ledger = InMemoryLedger::new();
    for gas in [0, 1, 100_000] {
        let call = submit(5000, TransactionData::ContractCall { gas });
        let verdict = orchestrator.check_and_enforce_throttle(&call, now(), &ledger, None);
        assert!(verdict.should_throttle);
        assert!(verdict.gas_throttled);
        assert!(orchestrator.was_last_txn_gas_throttled());
    }
    assert_eq!(used(&orchestrator, "MintLimits"), 0);
}

#[test]
fn gas_is_not_metered_when_disabled() {
    let config = ThrottleConfigBuilder::new()
        .throttle_by_gas(false)
        .max_gas_per_sec(0)
        .build();
    let mut orchestrator = frontend(config);
    let call = submit(5000, TransactionData::ContractCall { gas: 1_000_000 });
    let verdict =
        orchestrator.check_and_enforce_throttle(&call, now(), &InMemoryLedger::new(), None);
    assert_eq!(verdict, ThrottleVerdict::allowed());
    assert_eq!(used(&orchestrator, "MintLimits"), MICROS_PER_OP);
}

// ============================================================================
// Mint scaling
// ============================================================================

#[test]
fn empty_mint_is_one_unscaled_unit() {
    let config = ThrottleConfigBuilder::new()
        .nfts_mint_scale_factor("10:1".parse().unwrap())
        .build();
    let mut orchestrator = frontend(config);
    let mint = submit(5000, TransactionData::TokenMint(TokenMintBody::default()));

    assert!(
        !orchestrator
            .check_and_enforce_throttle(&mint, now(), &InMemoryLedger::new(), None)
            .should_throttle
    );
    assert_eq!(used(&orchestrator, "MintLimits"), MICROS_PER_OP);
}

#[test]
fn nft_mints_are_scaled() {
    let config = ThrottleConfigBuilder::new()
        .nfts_mint_scale_factor("2:1".parse().unwrap())
        .build();
    let mut orchestrator = frontend(config);
    let mint = submit(
        5000,
        TransactionData::TokenMint(TokenMintBody {
            metadata: vec![vec![0xaa], vec![0xbb]],
            ..Default::default()
        }),
    );
    let ledger = InMemoryLedger::new();

    assert!(!orchestrator.check_and_enforce_throttle(&mint, now(), &ledger, None).should_throttle);
    assert_eq!(used(&orchestrator, "MintLimits"), 4 * MICROS_PER_OP);
    assert!(orchestrator.check_and_enforce_throttle(&mint, now(), &ledger, None).should_throttle);

    // A full burst later the bucket has drained
    let later = now().plus_seconds(1);
    assert!(!orchestrator.check_and_enforce_throttle(&mint, later, &ledger, None).should_throttle);
}

// ============================================================================
// Reconfiguration
// ============================================================================

#[test]
fn malformed_bucket_is_dropped() {
    let observer = Arc::new(CollectingObserver::default());
    let mut orchestrator = ThrottleOrchestrator::new(
        ThrottleType::Backend,
        Arc::new(StaticConfig::new(ThrottleConfig::default())),
    )
    .with_observer(observer.clone());

    let definitions = ThrottleDefinitions::from_json_str(
        r#"{
            "buckets": [
                { "name": "A", "burstPeriod": 1, "throttleGroups": [{ "opsPerSec": 10, "operations": ["CryptoTransfer"] }] },
                { "name": "Broken", "burstPeriod": 0, "throttleGroups": [{ "opsPerSec": 10, "operations": ["FileCreate"] }] },
                { "name": "B", "burstPeriod": 1, "throttleGroups": [{ "opsPerSec": 3, "operations": ["TokenMint"] }] }
            ]
        }"#,
    )
    .unwrap();
    orchestrator.rebuild(&definitions);

    assert_eq!(*observer.rejected.lock(), vec!["Broken".to_string()]);
    assert_eq!(
        orchestrator.compiled().functionalities(),
        vec![Functionality::CryptoTransfer, Functionality::TokenMint]
    );
    assert!(orchestrator.active_throttles_for(Functionality::FileCreate).is_empty());
    assert_eq!(orchestrator.all_active_throttles().len(), 2);
}

#[test]
fn live_config_changes_apply_on_next_decision() {
    let shared = SharedConfig::new(ThrottleConfig::default());
    let mut orchestrator =
        ThrottleOrchestrator::new(ThrottleType::Frontend, Arc::new(shared.clone()));
    orchestrator.rebuild(&ThrottleDefinitions::from_json_str(DEFINITIONS).unwrap());
    let ledger = InMemoryLedger::new();
    let create = submit(20, TransactionData::Other(Functionality::CryptoCreate));

    assert!(
        !orchestrator.check_and_enforce_throttle(&create, now(), &ledger, None).should_throttle
    );
    assert_eq!(used(&orchestrator, "CreationLimits"), 0);

    shared.update(ThrottleConfigBuilder::new().last_throttle_exempt(10).build());
    assert!(
        !orchestrator.check_and_enforce_throttle(&create, now(), &ledger, None).should_throttle
    );
    assert_eq!(used(&orchestrator, "CreationLimits"), MICROS_PER_OP);
}

#[test]
fn capacity_is_split_across_nodes() {
    init_tracing();
    let mut orchestrator = ThrottleOrchestrator::new(
        ThrottleType::Frontend,
        Arc::new(StaticConfig::new(ThrottleConfig::default())),
    )
    .with_capacity_split(5);
    orchestrator.rebuild(&ThrottleDefinitions::from_json_str(DEFINITIONS).unwrap());
    let ledger = InMemoryLedger::new();
    let create = submit(5000, TransactionData::Other(Functionality::CryptoCreate));

    // 5 tps split five ways leaves one per second
    assert!(
        !orchestrator.check_and_enforce_throttle(&create, now(), &ledger, None).should_throttle
    );
    assert!(orchestrator.check_and_enforce_throttle(&create, now(), &ledger, None).should_throttle);
    assert!(orchestrator
        .resolved_summary()
        .contains("CryptoCreate: min(1.00 tps (CreationLimits))"));
}
