// Copyright (c) 2024 Botho Foundation

//! Read-only ledger lookups consulted while computing derived costs.

use crate::entity::{AccountId, AccountRef, TokenId};
use std::collections::{HashMap, HashSet};

/// Read-only view of the ledger state a decision may consult.
///
/// Implementations are shared between orchestrators and must not change
/// while a decision is in flight.
pub trait LedgerView {
    /// The account number an alias resolves to in the given shard and realm.
    fn account_num_by_alias(&self, shard: u64, realm: u64, alias: &[u8]) -> Option<u64>;

    /// Whether an account already has a relationship with a token.
    fn has_token_relation(&self, account: &AccountId, token: &TokenId) -> bool;

    /// Number of token associations of an account, or `None` if it does
    /// not exist.
    fn num_associations(&self, account: &AccountId) -> Option<u64>;

    /// Number of scheduled transactions set to expire in a consensus second.
    fn num_schedules_expiring_at(&self, second: i64) -> u64;

    /// Whether an alias already resolves to an account.
    fn contains_alias(&self, shard: u64, realm: u64, alias: &[u8]) -> bool {
        self.account_num_by_alias(shard, realm, alias).is_some()
    }
}

/// A [`LedgerView`] backed by in-memory maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    aliases: HashMap<(u64, u64, Vec<u8>), u64>,
    accounts: HashMap<(u64, u64, u64), u64>,
    relations: HashSet<(AccountId, TokenId)>,
    schedules: HashMap<i64, u64>,
}

impl InMemoryLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account with its association count.
    pub fn with_account(mut self, num: u64, associations: u64) -> Self {
        self.accounts.insert((0, 0, num), associations);
        self
    }

    /// Register an alias for an account in shard 0, realm 0.
    pub fn with_alias(mut self, alias: impl Into<Vec<u8>>, num: u64) -> Self {
        self.aliases.insert((0, 0, alias.into()), num);
        self.accounts.entry((0, 0, num)).or_insert(0);
        self
    }

    /// Register a token relationship.
    pub fn with_relation(mut self, account: AccountId, token: TokenId) -> Self {
        self.relations.insert((account, token));
        self
    }

    /// Set the number of schedules expiring in a second.
    pub fn with_schedules_expiring_at(mut self, second: i64, count: u64) -> Self {
        self.schedules.insert(second, count);
        self
    }

    fn resolve(&self, account: &AccountId) -> Option<u64> {
        match account.alias_bytes() {
            Some(alias) => self.account_num_by_alias(account.shard, account.realm, alias),
            None => account.account_num(),
        }
    }
}

impl LedgerView for InMemoryLedger {
    fn account_num_by_alias(&self, shard: u64, realm: u64, alias: &[u8]) -> Option<u64> {
        self.aliases.get(&(shard, realm, alias.to_vec())).copied()
    }

    fn has_token_relation(&self, account: &AccountId, token: &TokenId) -> bool {
        if self.relations.contains(&(account.clone(), *token)) {
            return true;
        }
        // Relations are keyed by number, so look aliases up through their account
        match (account.is_alias(), self.resolve(account)) {
            (true, Some(num)) => {
                let by_num = AccountId {
                    shard: account.shard,
                    realm: account.realm,
                    account: AccountRef::Num(num),
                };
                self.relations.contains(&(by_num, *token))
            }
            _ => false,
        }
    }

    fn num_associations(&self, account: &AccountId) -> Option<u64> {
        let num = self.resolve(account)?;
        self.accounts
            .get(&(account.shard, account.realm, num))
            .copied()
    }

    fn num_schedules_expiring_at(&self, second: i64) -> u64 {
        self.schedules.get(&second).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_resolution() {
        let ledger = InMemoryLedger::new().with_alias(vec![0xaa; 20], 1001);
        assert_eq!(ledger.account_num_by_alias(0, 0, &[0xaa; 20]), Some(1001));
        assert!(ledger.contains_alias(0, 0, &[0xaa; 20]));
        assert!(!ledger.contains_alias(0, 1, &[0xaa; 20]));
        assert!(!ledger.contains_alias(0, 0, &[0xbb; 20]));
    }

    #[test]
    fn test_relations_through_alias() {
        let token = TokenId::num(5000);
        let ledger = InMemoryLedger::new()
            .with_alias(vec![0xaa; 20], 1001)
            .with_relation(AccountId::num(1001), token);
        assert!(ledger.has_token_relation(&AccountId::num(1001), &token));
        assert!(ledger.has_token_relation(&AccountId::alias(vec![0xaa; 20]), &token));
        assert!(!ledger.has_token_relation(&AccountId::num(1002), &token));
    }

    #[test]
    fn test_associations_and_schedules() {
        let ledger = InMemoryLedger::new()
            .with_account(1001, 12)
            .with_schedules_expiring_at(1_800, 3);
        assert_eq!(ledger.num_associations(&AccountId::num(1001)), Some(12));
        assert_eq!(ledger.num_associations(&AccountId::num(1002)), None);
        assert_eq!(ledger.num_schedules_expiring_at(1_800), 3);
        assert_eq!(ledger.num_schedules_expiring_at(1_801), 0);
    }
}
