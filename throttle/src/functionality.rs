// Copyright (c) 2024 Botho Foundation

//! The closed set of transaction and query kinds the engine can throttle.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A transaction or query kind.
///
/// Names serialize in PascalCase, matching the operation names used in
/// throttle definition documents.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Functionality {
    // Crypto
    CryptoTransfer,
    CryptoCreate,
    CryptoUpdate,
    CryptoDelete,
    CryptoApproveAllowance,
    CryptoDeleteAllowance,
    CryptoGetAccountBalance,
    CryptoGetInfo,
    CryptoGetAccountRecords,

    // Smart contracts
    ContractCall,
    ContractCreate,
    ContractUpdate,
    ContractDelete,
    ContractCallLocal,
    ContractGetInfo,
    EthereumTransaction,

    // Consensus topics
    ConsensusCreateTopic,
    ConsensusUpdateTopic,
    ConsensusDeleteTopic,
    ConsensusSubmitMessage,
    ConsensusGetTopicInfo,

    // Files
    FileCreate,
    FileUpdate,
    FileAppend,
    FileDelete,
    FileGetContents,
    FileGetInfo,

    // Tokens
    TokenCreate,
    TokenUpdate,
    TokenDelete,
    TokenMint,
    TokenBurn,
    TokenAssociateToAccount,
    TokenDissociateFromAccount,
    TokenFreezeAccount,
    TokenUnfreezeAccount,
    TokenGrantKycToAccount,
    TokenRevokeKycFromAccount,
    TokenAccountWipe,
    TokenPause,
    TokenUnpause,
    TokenAirdrop,
    TokenClaimAirdrop,
    TokenCancelAirdrop,
    TokenGetInfo,
    TokenGetNftInfo,

    // Scheduling
    ScheduleCreate,
    ScheduleSign,
    ScheduleDelete,
    ScheduleGetInfo,

    // Network and utility
    UtilPrng,
    AtomicBatch,
    Freeze,
    SystemDelete,
    SystemUndelete,
    NodeCreate,
    NodeUpdate,
    NodeDelete,
    GetVersionInfo,
    TransactionGetReceipt,
    TransactionGetRecord,
    NetworkGetExecutionTime,
}

impl Functionality {
    /// Every functionality, in declaration order.
    pub const ALL: &'static [Functionality] = &[
        Functionality::CryptoTransfer,
        Functionality::CryptoCreate,
        Functionality::CryptoUpdate,
        Functionality::CryptoDelete,
        Functionality::CryptoApproveAllowance,
        Functionality::CryptoDeleteAllowance,
        Functionality::CryptoGetAccountBalance,
        Functionality::CryptoGetInfo,
        Functionality::CryptoGetAccountRecords,
        Functionality::ContractCall,
        Functionality::ContractCreate,
        Functionality::ContractUpdate,
        Functionality::ContractDelete,
        Functionality::ContractCallLocal,
        Functionality::ContractGetInfo,
        Functionality::EthereumTransaction,
        Functionality::ConsensusCreateTopic,
        Functionality::ConsensusUpdateTopic,
        Functionality::ConsensusDeleteTopic,
        Functionality::ConsensusSubmitMessage,
        Functionality::ConsensusGetTopicInfo,
        Functionality::FileCreate,
        Functionality::FileUpdate,
        Functionality::FileAppend,
        Functionality::FileDelete,
        Functionality::FileGetContents,
        Functionality::FileGetInfo,
        Functionality::TokenCreate,
        Functionality::TokenUpdate,
        Functionality::TokenDelete,
        Functionality::TokenMint,
        Functionality::TokenBurn,
        Functionality::TokenAssociateToAccount,
        Functionality::TokenDissociateFromAccount,
        Functionality::TokenFreezeAccount,
        Functionality::TokenUnfreezeAccount,
        Functionality::TokenGrantKycToAccount,
        Functionality::TokenRevokeKycFromAccount,
        Functionality::TokenAccountWipe,
        Functionality::TokenPause,
        Functionality::TokenUnpause,
        Functionality::TokenAirdrop,
        Functionality::TokenClaimAirdrop,
        Functionality::TokenCancelAirdrop,
        Functionality::TokenGetInfo,
        Functionality::TokenGetNftInfo,
        Functionality::ScheduleCreate,
        Functionality::ScheduleSign,
        Functionality::ScheduleDelete,
        Functionality::ScheduleGetInfo,
        Functionality::UtilPrng,
        Functionality::AtomicBatch,
        Functionality::Freeze,
        Functionality::SystemDelete,
        Functionality::SystemUndelete,
        Functionality::NodeCreate,
        Functionality::NodeUpdate,
        Functionality::NodeDelete,
        Functionality::GetVersionInfo,
        Functionality::TransactionGetReceipt,
        Functionality::TransactionGetRecord,
        Functionality::NetworkGetExecutionTime,
    ];

    /// The canonical name of this functionality.
    pub fn as_str(&self) -> &'static str {
        match self {
            Functionality::CryptoTransfer => "CryptoTransfer",
            Functionality::CryptoCreate => "CryptoCreate",
            Functionality::CryptoUpdate => "CryptoUpdate",
            Functionality::CryptoDelete => "CryptoDelete",
            Functionality::CryptoApproveAllowance => "CryptoApproveAllowance",
            Functionality::CryptoDeleteAllowance => "CryptoDeleteAllowance",
            Functionality::CryptoGetAccountBalance => "CryptoGetAccountBalance",
            Functionality::CryptoGetInfo => "CryptoGetInfo",
            Functionality::CryptoGetAccountRecords => "CryptoGetAccountRecords",
            Functionality::ContractCall => "ContractCall",
            Functionality::ContractCreate => "ContractCreate",
            Functionality::ContractUpdate => "ContractUpdate",
            Functionality::ContractDelete => "ContractDelete",
            Functionality::ContractCallLocal => "ContractCallLocal",
            Functionality::ContractGetInfo => "ContractGetInfo",
            Functionality::EthereumTransaction => "EthereumTransaction",
            Functionality::ConsensusCreateTopic => "ConsensusCreateTopic",
            Functionality::ConsensusUpdateTopic => "ConsensusUpdateTopic",
            Functionality::ConsensusDeleteTopic => "ConsensusDeleteTopic",
            Functionality::ConsensusSubmitMessage => "ConsensusSubmitMessage",
            Functionality::ConsensusGetTopicInfo => "ConsensusGetTopicInfo",
            Functionality::FileCreate => "FileCreate",
            Functionality::FileUpdate => "FileUpdate",
            Functionality::FileAppend => "FileAppend",
            Functionality::FileDelete => "FileDelete",
            Functionality::FileGetContents => "FileGetContents",
            Functionality::FileGetInfo => "FileGetInfo",
            Functionality::TokenCreate => "TokenCreate",
            Functionality::TokenUpdate => "TokenUpdate",
            Functionality::TokenDelete => "TokenDelete",
            Functionality::TokenMint => "TokenMint",
            Functionality::TokenBurn => "TokenBurn",
            Functionality::TokenAssociateToAccount => "TokenAssociateToAccount",
            Functionality::TokenDissociateFromAccount => "TokenDissociateFromAccount",
            Functionality::TokenFreezeAccount => "TokenFreezeAccount",
            Functionality::TokenUnfreezeAccount => "TokenUnfreezeAccount",
            Functionality::TokenGrantKycToAccount => "TokenGrantKycToAccount",
            Functionality::TokenRevokeKycFromAccount => "TokenRevokeKycFromAccount",
            Functionality::TokenAccountWipe => "TokenAccountWipe",
            Functionality::TokenPause => "TokenPause",
            Functionality::TokenUnpause => "TokenUnpause",
            Functionality::TokenAirdrop => "TokenAirdrop",
            Functionality::TokenClaimAirdrop => "TokenClaimAirdrop",
            Functionality::TokenCancelAirdrop => "TokenCancelAirdrop",
            Functionality::TokenGetInfo => "TokenGetInfo",
            Functionality::TokenGetNftInfo => "TokenGetNftInfo",
            Functionality::ScheduleCreate => "ScheduleCreate",
            Functionality::ScheduleSign => "ScheduleSign",
            Functionality::ScheduleDelete => "ScheduleDelete",
            Functionality::ScheduleGetInfo => "ScheduleGetInfo",
            Functionality::UtilPrng => "UtilPrng",
            Functionality::AtomicBatch => "AtomicBatch",
            Functionality::Freeze => "Freeze",
            Functionality::SystemDelete => "SystemDelete",
            Functionality::SystemUndelete => "SystemUndelete",
            Functionality::NodeCreate => "NodeCreate",
            Functionality::NodeUpdate => "NodeUpdate",
            Functionality::NodeDelete => "NodeDelete",
            Functionality::GetVersionInfo => "GetVersionInfo",
            Functionality::TransactionGetReceipt => "TransactionGetReceipt",
            Functionality::TransactionGetRecord => "TransactionGetRecord",
            Functionality::NetworkGetExecutionTime => "NetworkGetExecutionTime",
        }
    }

    /// Whether this functionality is metered by the gas throttle.
    pub fn is_gas_throttled(&self) -> bool {
        matches!(
            self,
            Functionality::ContractCallLocal
                | Functionality::ContractCall
                | Functionality::ContractCreate
                | Functionality::EthereumTransaction
        )
    }

    /// Whether this functionality can create accounts as a side effect.
    pub fn can_auto_create(&self) -> bool {
        matches!(
            self,
            Functionality::CryptoTransfer | Functionality::EthereumTransaction
        )
    }

    /// Whether this functionality can create token associations as a side
    /// effect.
    pub fn can_auto_associate(&self) -> bool {
        *self == Functionality::CryptoTransfer
    }

    /// Whether this functionality is answered as a query rather than
    /// submitted as a transaction.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Functionality::CryptoGetAccountBalance
                | Functionality::CryptoGetInfo
                | Functionality::CryptoGetAccountRecords
                | Functionality::ContractCallLocal
                | Functionality::ContractGetInfo
                | Functionality::ConsensusGetTopicInfo
                | Functionality::FileGetContents
                | Functionality::FileGetInfo
                | Functionality::TokenGetInfo
                | Functionality::TokenGetNftInfo
                | Functionality::ScheduleGetInfo
                | Functionality::GetVersionInfo
                | Functionality::TransactionGetReceipt
                | Functionality::TransactionGetRecord
                | Functionality::NetworkGetExecutionTime
        )
    }
}

impl fmt::Display for Functionality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Functionality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Functionality::ALL
            .iter()
            .find(|function| function.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown functionality '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_from_str() {
        for function in Functionality::ALL {
            assert_eq!(function.as_str().parse::<Functionality>(), Ok(*function));
        }
        assert!("NotAThing".parse::<Functionality>().is_err());
    }

    #[test]
    fn test_serde_name_matches_display() {
        for function in Functionality::ALL {
            let json = serde_json::to_string(function).unwrap();
            assert_eq!(json, format!("\"{}\"", function));
        }
    }

    #[test]
    fn test_gas_throttled_set() {
        let gas: Vec<_> = Functionality::ALL
            .iter()
            .filter(|f| f.is_gas_throttled())
            .collect();
        assert_eq!(gas.len(), 4);
        assert!(Functionality::EthereumTransaction.is_gas_throttled());
        assert!(!Functionality::CryptoTransfer.is_gas_throttled());
    }

    #[test]
    fn test_side_effect_predicates() {
        assert!(Functionality::CryptoTransfer.can_auto_create());
        assert!(Functionality::EthereumTransaction.can_auto_create());
        assert!(!Functionality::TokenMint.can_auto_create());
        assert!(Functionality::CryptoTransfer.can_auto_associate());
        assert!(!Functionality::EthereumTransaction.can_auto_associate());
    }
}
