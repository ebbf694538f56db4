// Copyright (c) 2024 Botho Foundation

//! Account and token identifiers, and the alias shape predicates used to
//! spot transfers that will create accounts on the fly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of an EVM address in bytes.
pub const EVM_ADDRESS_SIZE: usize = 20;

/// Serialized key prefix for an Ed25519 public key (field 2, 32 bytes).
const ED25519_KEY_PREFIX: [u8; 2] = [0x12, 0x20];

/// Serialized key prefix for a compressed ECDSA secp256k1 key (field 7, 33 bytes).
const ECDSA_SECP256K1_KEY_PREFIX: [u8; 2] = [0x3a, 0x21];

/// How an account is referenced from a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccountRef {
    /// Entity number of an existing account
    Num(u64),
    /// Alias bytes (serialized public key or EVM address)
    Alias(Vec<u8>),
}

/// A fully qualified account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId {
    /// Shard number
    pub shard: u64,
    /// Realm number
    pub realm: u64,
    /// Number or alias
    pub account: AccountRef,
}

impl AccountId {
    /// An account referenced by number in shard 0, realm 0.
    pub fn num(num: u64) -> Self {
        Self {
            shard: 0,
            realm: 0,
            account: AccountRef::Num(num),
        }
    }

    /// An account referenced by alias in shard 0, realm 0.
    pub fn alias(alias: impl Into<Vec<u8>>) -> Self {
        Self {
            shard: 0,
            realm: 0,
            account: AccountRef::Alias(alias.into()),
        }
    }

    /// The account number, if referenced by number.
    pub fn account_num(&self) -> Option<u64> {
        match self.account {
            AccountRef::Num(num) => Some(num),
            AccountRef::Alias(_) => None,
        }
    }

    /// The alias bytes, if referenced by alias.
    pub fn alias_bytes(&self) -> Option<&[u8]> {
        match &self.account {
            AccountRef::Num(_) => None,
            AccountRef::Alias(alias) => Some(alias),
        }
    }

    /// Whether this identifier is an alias reference.
    pub fn is_alias(&self) -> bool {
        matches!(self.account, AccountRef::Alias(_))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.account {
            AccountRef::Num(num) => write!(f, "{}.{}.{}", self.shard, self.realm, num),
            AccountRef::Alias(alias) => {
                write!(f, "{}.{}.0x{}", self.shard, self.realm, hex::encode(alias))
            }
        }
    }
}

/// A fully qualified token identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId {
    /// Shard number
    pub shard: u64,
    /// Realm number
    pub realm: u64,
    /// Token number
    pub num: u64,
}

impl TokenId {
    /// A token in shard 0, realm 0.
    pub fn num(num: u64) -> Self {
        Self {
            shard: 0,
            realm: 0,
            num,
        }
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

/// Whether the alias has the size of an EVM address.
pub fn is_of_evm_address_size(alias: &[u8]) -> bool {
    alias.len() == EVM_ADDRESS_SIZE
}

/// Whether the alias is a serialized Ed25519 or ECDSA secp256k1 public key.
pub fn is_serialized_key(alias: &[u8]) -> bool {
    match alias {
        [a, b, key @ ..] if [*a, *b] == ED25519_KEY_PREFIX => key.len() == 32,
        [a, b, key @ ..] if [*a, *b] == ECDSA_SECP256K1_KEY_PREFIX => {
            key.len() == 33 && matches!(key[0], 0x02 | 0x03)
        }
        _ => false,
    }
}

/// Whether a 20-byte alias encodes an existing entity number of the given
/// shard and realm, rather than a real EVM address.
pub fn is_entity_num_alias(alias: &[u8], shard: u64, realm: u64) -> bool {
    if !is_of_evm_address_size(alias) {
        return false;
    }
    let Ok(shard) = u32::try_from(shard) else {
        return false;
    };
    let shard_bytes = shard.to_be_bytes();
    let realm_bytes = realm.to_be_bytes();
    alias[..4] == shard_bytes && alias[4..12] == realm_bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ed25519_alias() -> Vec<u8> {
        let mut alias = ED25519_KEY_PREFIX.to_vec();
        alias.extend_from_slice(&[7u8; 32]);
        alias
    }

    fn ecdsa_alias(parity: u8) -> Vec<u8> {
        let mut alias = ECDSA_SECP256K1_KEY_PREFIX.to_vec();
        alias.push(parity);
        alias.extend_from_slice(&[9u8; 32]);
        alias
    }

    #[test]
    fn test_serialized_key_shapes() {
        assert!(is_serialized_key(&ed25519_alias()));
        assert!(is_serialized_key(&ecdsa_alias(0x02)));
        assert!(is_serialized_key(&ecdsa_alias(0x03)));
        assert!(!is_serialized_key(&ecdsa_alias(0x04)));
        assert!(!is_serialized_key(&ed25519_alias()[..20]));
        assert!(!is_serialized_key(&[]));
    }

    #[test]
    fn test_entity_num_alias() {
        let mut long_zero = [0u8; 20];
        long_zero[19] = 0x42;
        assert!(is_entity_num_alias(&long_zero, 0, 0));
        assert!(!is_entity_num_alias(&long_zero, 1, 0));

        let mut other_realm = [0u8; 20];
        other_realm[11] = 2;
        other_realm[19] = 1;
        assert!(is_entity_num_alias(&other_realm, 0, 2));

        let evm = [0xabu8; 20];
        assert!(!is_entity_num_alias(&evm, 0, 0));
        assert!(!is_entity_num_alias(&ed25519_alias(), 0, 0));
    }

    #[test]
    fn test_entity_num_alias_rejects_wide_shard() {
        let mut alias = [0u8; 20];
        alias[3] = 1;
        alias[19] = 7;
        assert!(is_entity_num_alias(&alias, 1, 0));
        // Only the low 32 bits of this shard match the alias
        assert!(!is_entity_num_alias(&alias, (1 << 32) | 1, 0));
    }

    #[test]
    fn test_account_id_accessors() {
        let by_num = AccountId::num(1001);
        assert_eq!(by_num.account_num(), Some(1001));
        assert!(!by_num.is_alias());
        assert_eq!(by_num.to_string(), "0.0.1001");

        let by_alias = AccountId::alias(vec![0xab, 0xcd]);
        assert!(by_alias.is_alias());
        assert_eq!(by_alias.account_num(), None);
        assert_eq!(by_alias.alias_bytes(), Some(&[0xab, 0xcd][..]));
        assert_eq!(by_alias.to_string(), "0.0.0xabcd");
    }
}
