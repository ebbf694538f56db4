// Copyright (c) 2024 Botho Foundation

//! Error types for the throttle engine.
//!
//! Being throttled is not an error. These variants describe misconfiguration
//! and malformed input that the engine either reports or folds into a deny.

use crate::{functionality::Functionality, throttle::ResourceKind};
use displaydoc::Display;
use thiserror::Error;

/// Errors that can occur while building or driving the throttle engine.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ThrottleError {
    /// Bucket '{name}' is malformed: {reason}
    MalformedBucket {
        /// Name of the offending bucket
        name: String,
        /// Why it could not be compiled
        reason: String,
    },

    /// The {0} throttle has not been configured yet
    NotConfigured(ResourceKind),

    /// No throttle requirements are defined for {0}
    NoRequirements(Functionality),

    /// Invalid scale factor '{0}', expected '<numerator>:<denominator>'
    InvalidScaleFactor(String),

    /// Failed to parse configuration: {0}
    Config(String),

    /// Failed to parse throttle definitions: {0}
    Definitions(String),

    /// Scheduled transaction cannot be classified: {0}
    InvalidScheduledTransaction(String),

    /// Ethereum transaction payload could not be decoded: {0}
    InvalidEthereumData(String),
}

impl From<toml::de::Error> for ThrottleError {
    fn from(err: toml::de::Error) -> Self {
        ThrottleError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ThrottleError {
    fn from(err: serde_json::Error) -> Self {
        ThrottleError::Definitions(err.to_string())
    }
}

impl From<alloy_rlp::Error> for ThrottleError {
    fn from(err: alloy_rlp::Error) -> Self {
        ThrottleError::InvalidEthereumData(err.to_string())
    }
}

/// Result type for throttle operations.
pub type ThrottleResult<T> = Result<T, ThrottleError>;
