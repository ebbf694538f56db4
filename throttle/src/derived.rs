// Copyright (c) 2024 Botho Foundation

//! Secondary costs derived from a transaction body and ledger state.
//!
//! These calculators are pure: they read the body and the [`LedgerView`]
//! and never touch a throttle.

use crate::{
    entity::{is_entity_num_alias, is_of_evm_address_size, is_serialized_key, AccountId},
    ethereum::EthTxData,
    functionality::Functionality,
    ledger::LedgerView,
    time::Timestamp,
    transaction::{CryptoTransferBody, ScheduleCreateBody, TransactionBody, TransactionData},
};

/// Number of accounts a transaction will create implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImplicitCreations {
    /// A definite count, possibly zero
    Known(u64),
    /// The payload could not be decoded; the transaction must be denied
    Unknown,
}

impl ImplicitCreations {
    /// The count, if known.
    pub fn known(&self) -> Option<u64> {
        match self {
            ImplicitCreations::Known(count) => Some(*count),
            ImplicitCreations::Unknown => None,
        }
    }
}

/// Computes derived costs in the context of one shard and realm.
#[derive(Clone, Copy)]
pub struct DerivedCosts<'a> {
    ledger: &'a dyn LedgerView,
    shard: u64,
    realm: u64,
}

impl<'a> DerivedCosts<'a> {
    /// Create a calculator over `ledger`.
    pub fn new(ledger: &'a dyn LedgerView, shard: u64, realm: u64) -> Self {
        Self {
            ledger,
            shard,
            realm,
        }
    }

    /// Implicit account creations caused by `body`.
    ///
    /// Ethereum payloads that cannot be decoded yield
    /// [`ImplicitCreations::Unknown`]. Bodies other than transfers and
    /// Ethereum transactions create nothing.
    pub fn implicit_creations(&self, body: &TransactionBody) -> ImplicitCreations {
        match &body.data {
            TransactionData::EthereumTransaction { ethereum_data } => {
                match EthTxData::decode(ethereum_data) {
                    Ok(tx) => ImplicitCreations::Known(self.eth_implicit_creations(&tx)),
                    Err(_) => ImplicitCreations::Unknown,
                }
            }
            TransactionData::CryptoTransfer(op) => {
                ImplicitCreations::Known(self.transfer_implicit_creations(op))
            }
            _ => ImplicitCreations::Known(0),
        }
    }

    fn eth_implicit_creations(&self, tx: &EthTxData) -> u64 {
        if !tx.value_is_positive {
            return 0;
        }
        match tx.to {
            Some(to) if self.ledger.contains_alias(self.shard, self.realm, &to) => 0,
            // An empty recipient never resolves to an existing account
            _ => 1,
        }
    }

    /// Implicit creations of a crypto transfer: hbar legs, then fungible
    /// token legs, then NFT receivers.
    pub fn transfer_implicit_creations(&self, op: &CryptoTransferBody) -> u64 {
        let hbar = op
            .transfers
            .iter()
            .filter(|adjust| self.creates_account(&adjust.account_id, adjust.amount))
            .count();
        let tokens = op
            .token_transfers
            .iter()
            .map(|list| {
                let fungible = list
                    .transfers
                    .iter()
                    .filter(|adjust| self.creates_account(&adjust.account_id, adjust.amount))
                    .count();
                let nfts = list
                    .nft_transfers
                    .iter()
                    .filter(|change| {
                        change.receiver.as_ref().is_some_and(|receiver| {
                            self.creates_account(receiver, change.serial_number)
                        })
                    })
                    .count();
                fungible + nfts
            })
            .sum::<usize>();
        (hbar + tokens) as u64
    }

    fn creates_account(&self, account: &AccountId, asset_change: i64) -> bool {
        self.references_alias_not_in_use(account) && is_plausible_auto_create(account, asset_change)
    }

    fn references_alias_not_in_use(&self, account: &AccountId) -> bool {
        let Some(alias) = account.alias_bytes() else {
            return false;
        };
        if is_entity_num_alias(alias, self.shard, self.realm) {
            return false;
        }
        !self.ledger.contains_alias(account.shard, account.realm, alias)
    }

    /// Token associations a crypto transfer would create automatically.
    pub fn auto_associations(&self, body: &TransactionBody) -> u64 {
        let Some(op) = body.crypto_transfer() else {
            return 0;
        };
        op.token_transfers
            .iter()
            .map(|list| {
                let credited = list
                    .transfers
                    .iter()
                    .filter(|adjust| adjust.amount > 0)
                    .filter(|adjust| {
                        !self
                            .ledger
                            .has_token_relation(&adjust.account_id, &list.token)
                    })
                    .count();
                let received = list
                    .nft_transfers
                    .iter()
                    .filter_map(|change| change.receiver.as_ref())
                    .filter(|receiver| !self.ledger.has_token_relation(receiver, &list.token))
                    .count();
                (credited + received) as u64
            })
            .sum()
    }
}

fn is_plausible_auto_create(account: &AccountId, asset_change: i64) -> bool {
    asset_change > 0
        && account
            .alias_bytes()
            .is_some_and(|alias| is_serialized_key(alias) || is_of_evm_address_size(alias))
}

/// The gas limit a contract transaction reserves.
///
/// A negative limit is treated as unbounded. Undecodable Ethereum payloads
/// and non-contract bodies reserve nothing.
pub fn gas_limit_for(body: &TransactionBody, function: Functionality) -> u64 {
    let nominal = match (&body.data, function) {
        (TransactionData::ContractCreate { gas }, Functionality::ContractCreate)
        | (TransactionData::ContractCall { gas }, Functionality::ContractCall) => *gas,
        (
            TransactionData::EthereumTransaction { ethereum_data },
            Functionality::EthereumTransaction,
        ) => {
            return EthTxData::decode(ethereum_data)
                .map(|tx| tx.gas_limit.min(i64::MAX as u64))
                .unwrap_or(0);
        }
        _ => 0,
    };
    u64::try_from(nominal).unwrap_or(i64::MAX as u64)
}

/// The consensus second a schedule created by `op` expires in.
pub fn schedule_expiry_second(
    op: &ScheduleCreateBody,
    valid_start: Timestamp,
    default_lifetime_secs: i64,
) -> i64 {
    if op.wait_for_expiry {
        op.expiration_time.unwrap_or_default().seconds
    } else {
        valid_start.seconds.saturating_add(default_lifetime_secs)
    }
}
