// Copyright (c) 2024 Botho Foundation

//! The already-parsed view of transactions and queries that the throttle
//! engine inspects.
//!
//! Parsing and validation happen upstream. Only the fields that feed a
//! throttle decision are modeled here; every other transaction kind is
//! carried as [`TransactionData::Other`] with its functionality tag.

use crate::{
    entity::{AccountId, TokenId},
    error::{ThrottleError, ThrottleResult},
    functionality::Functionality,
    time::Timestamp,
};
use serde::{Deserialize, Serialize};

/// An hbar or fungible token adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAmount {
    /// Account being debited or credited
    pub account_id: AccountId,
    /// Signed adjustment; positive values credit the account
    pub amount: i64,
}

impl AccountAmount {
    /// Create an adjustment.
    pub fn new(account_id: AccountId, amount: i64) -> Self {
        Self { account_id, amount }
    }
}

/// A change of ownership for one NFT serial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftTransfer {
    /// Current owner
    pub sender: AccountId,
    /// New owner
    pub receiver: Option<AccountId>,
    /// Serial number of the NFT
    pub serial_number: i64,
}

/// All adjustments for a single token within a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransferList {
    /// Token being moved
    pub token: TokenId,
    /// Fungible adjustments
    #[serde(default)]
    pub transfers: Vec<AccountAmount>,
    /// NFT ownership changes
    #[serde(default)]
    pub nft_transfers: Vec<NftTransfer>,
}

/// Body of a crypto transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoTransferBody {
    /// Hbar adjustments
    #[serde(default)]
    pub transfers: Vec<AccountAmount>,
    /// Token adjustments, grouped by token
    #[serde(default)]
    pub token_transfers: Vec<TokenTransferList>,
}

impl CryptoTransferBody {
    /// Whether any account in the transfer is referenced by alias.
    pub fn uses_aliases(&self) -> bool {
        self.transfers.iter().any(|adjust| adjust.account_id.is_alias())
            || self.token_transfers.iter().any(|list| {
                list.transfers.iter().any(|adjust| adjust.account_id.is_alias())
                    || list.nft_transfers.iter().any(|change| {
                        change.sender.is_alias()
                            || change.receiver.as_ref().is_some_and(AccountId::is_alias)
                    })
            })
    }
}

/// Body of a token mint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMintBody {
    /// Token being minted
    pub token: Option<TokenId>,
    /// Fungible amount to mint
    #[serde(default)]
    pub amount: u64,
    /// One metadata entry per NFT to mint
    #[serde(default)]
    pub metadata: Vec<Vec<u8>>,
}

/// Body of a schedule create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleCreateBody {
    /// The transaction to schedule
    pub scheduled: Option<Box<TransactionData>>,
    /// Whether execution waits for the explicit expiration time
    #[serde(default)]
    pub wait_for_expiry: bool,
    /// Explicit expiration time
    pub expiration_time: Option<Timestamp>,
}

impl ScheduleCreateBody {
    /// Build the scheduled transaction as an ordinary transaction paid by
    /// `payer` and classify its functionality.
    pub fn inner_transaction(
        &self,
        payer: &AccountId,
        valid_start: Timestamp,
    ) -> ThrottleResult<(TransactionBody, Functionality)> {
        let scheduled = self.scheduled.as_deref().ok_or_else(|| {
            ThrottleError::InvalidScheduledTransaction("missing scheduled body".to_string())
        })?;
        let function = scheduled.functionality();
        if function == Functionality::ScheduleCreate || function.is_query() {
            return Err(ThrottleError::InvalidScheduledTransaction(format!(
                "{} cannot be scheduled",
                function
            )));
        }
        let body = TransactionBody {
            transaction_id: Some(TransactionId {
                payer: payer.clone(),
                valid_start,
            }),
            data: scheduled.clone(),
        };
        Ok((body, function))
    }
}

/// Transaction identifier: payer and valid-start time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionId {
    /// Paying account
    pub payer: AccountId,
    /// Start of the validity window
    pub valid_start: Timestamp,
}

/// Functionality-specific payload of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionData {
    /// Hbar, token and NFT transfers
    CryptoTransfer(CryptoTransferBody),
    /// Contract deployment
    ContractCreate {
        /// Gas limit offered by the sender
        gas: i64,
    },
    /// Contract call
    ContractCall {
        /// Gas limit offered by the sender
        gas: i64,
    },
    /// Raw RLP-encoded Ethereum transaction
    EthereumTransaction {
        /// Encoded payload
        ethereum_data: Vec<u8>,
    },
    /// Token mint
    TokenMint(TokenMintBody),
    /// Schedule create
    ScheduleCreate(ScheduleCreateBody),
    /// Any other transaction kind; nothing beyond its tag affects throttling
    Other(Functionality),
}

impl TransactionData {
    /// The functionality tag of this payload.
    pub fn functionality(&self) -> Functionality {
        match self {
            TransactionData::CryptoTransfer(_) => Functionality::CryptoTransfer,
            TransactionData::ContractCreate { .. } => Functionality::ContractCreate,
            TransactionData::ContractCall { .. } => Functionality::ContractCall,
            TransactionData::EthereumTransaction { .. } => Functionality::EthereumTransaction,
            TransactionData::TokenMint(_) => Functionality::TokenMint,
            TransactionData::ScheduleCreate(_) => Functionality::ScheduleCreate,
            TransactionData::Other(function) => *function,
        }
    }
}

/// A parsed transaction body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    /// Identifier, if present
    pub transaction_id: Option<TransactionId>,
    /// Functionality-specific payload
    pub data: TransactionData,
}

impl TransactionBody {
    /// A body without a transaction id.
    pub fn new(data: TransactionData) -> Self {
        Self {
            transaction_id: None,
            data,
        }
    }

    /// The crypto transfer payload, if this is a transfer.
    pub fn crypto_transfer(&self) -> Option<&CryptoTransferBody> {
        match &self.data {
            TransactionData::CryptoTransfer(op) => Some(op),
            _ => None,
        }
    }

    /// The Ethereum payload, if this is an Ethereum transaction.
    pub fn ethereum_data(&self) -> Option<&[u8]> {
        match &self.data {
            TransactionData::EthereumTransaction { ethereum_data } => Some(ethereum_data),
            _ => None,
        }
    }

    /// Start of the validity window, or the epoch if unset.
    pub fn valid_start(&self) -> Timestamp {
        self.transaction_id
            .as_ref()
            .map(|id| id.valid_start)
            .unwrap_or_default()
    }
}

/// Everything the engine needs to know about a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInfo {
    /// Parsed body
    pub body: TransactionBody,
    /// Account paying for the transaction
    pub payer: AccountId,
    /// Functionality of the body
    pub functionality: Functionality,
    /// Serialized size of the signed transaction in bytes
    pub serialized_size: usize,
}

impl TransactionInfo {
    /// Describe a transaction, deriving its functionality from the body.
    pub fn new(payer: AccountId, body: TransactionBody, serialized_size: usize) -> Self {
        let functionality = body.data.functionality();
        Self {
            body,
            payer,
            functionality,
            serialized_size,
        }
    }
}

/// A parsed query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    /// Balance lookup
    CryptoGetAccountBalance {
        /// Account whose balance is requested
        account_id: Option<AccountId>,
    },
    /// Read-only contract call
    ContractCallLocal {
        /// Gas limit offered by the sender
        gas: i64,
    },
    /// Any other query kind
    Other(Functionality),
}

impl Query {
    /// The functionality tag of this query.
    pub fn functionality(&self) -> Functionality {
        match self {
            Query::CryptoGetAccountBalance { .. } => Functionality::CryptoGetAccountBalance,
            Query::ContractCallLocal { .. } => Functionality::ContractCallLocal,
            Query::Other(function) => *function,
        }
    }
}
