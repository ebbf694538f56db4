// Copyright (c) 2024 Botho Foundation

//! Minimal decoding of RLP-encoded Ethereum transactions.
//!
//! Only the fields that drive throttling are extracted: the gas limit, the
//! recipient and whether any value is transferred. Legacy, EIP-2930 and
//! EIP-1559 envelopes are understood; anything else is undecodable.

use crate::{
    entity::EVM_ADDRESS_SIZE,
    error::{ThrottleError, ThrottleResult},
};
use alloy_rlp::Header;

const EIP2930_TX_TYPE: u8 = 0x01;
const EIP1559_TX_TYPE: u8 = 0x02;

/// First byte of an RLP list header.
const RLP_LIST_OFFSET: u8 = 0xc0;

/// The throttle-relevant fields of an Ethereum transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthTxData {
    /// Gas limit offered by the sender
    pub gas_limit: u64,
    /// Recipient address; `None` for contract creation
    pub to: Option<[u8; EVM_ADDRESS_SIZE]>,
    /// Whether a non-zero value is transferred
    pub value_is_positive: bool,
}

impl EthTxData {
    /// Decode an encoded transaction envelope.
    pub fn decode(data: &[u8]) -> ThrottleResult<Self> {
        // Fields preceding the gas limit for each envelope
        let (leading_fields, mut envelope) = match data.first() {
            Some(&EIP2930_TX_TYPE) => (3, &data[1..]),
            Some(&EIP1559_TX_TYPE) => (4, &data[1..]),
            Some(first) if *first >= RLP_LIST_OFFSET => (2, data),
            Some(first) => {
                return Err(ThrottleError::InvalidEthereumData(format!(
                    "unsupported transaction type 0x{first:02x}"
                )))
            }
            None => {
                return Err(ThrottleError::InvalidEthereumData(
                    "empty payload".to_string(),
                ))
            }
        };

        let (is_list, mut fields) = next_item(&mut envelope)?;
        if !is_list {
            return Err(alloy_rlp::Error::UnexpectedString.into());
        }
        if !envelope.is_empty() {
            return Err(ThrottleError::InvalidEthereumData(
                "trailing bytes after transaction".to_string(),
            ));
        }

        for _ in 0..leading_fields {
            next_string(&mut fields)?;
        }
        let gas_limit = be_u64(next_string(&mut fields)?)?;
        let to = match next_string(&mut fields)? {
            [] => None,
            address => Some(
                <[u8; EVM_ADDRESS_SIZE]>::try_from(address)
                    .map_err(|_| alloy_rlp::Error::UnexpectedLength)?,
            ),
        };
        let value_is_positive = next_string(&mut fields)?.iter().any(|byte| *byte != 0);
        // Call data must be present even though it is not inspected
        next_string(&mut fields)?;

        Ok(Self {
            gas_limit,
            to,
            value_is_positive,
        })
    }
}

/// Split the next item off `buf`, returning whether it is a list and its
/// payload.
fn next_item<'a>(buf: &mut &'a [u8]) -> Result<(bool, &'a [u8]), alloy_rlp::Error> {
    let header = Header::decode(buf)?;
    if buf.len() < header.payload_length {
        return Err(alloy_rlp::Error::InputTooShort);
    }
    let (payload, rest) = buf.split_at(header.payload_length);
    *buf = rest;
    Ok((header.list, payload))
}

fn next_string<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], alloy_rlp::Error> {
    match next_item(buf)? {
        (false, payload) => Ok(payload),
        (true, _) => Err(alloy_rlp::Error::UnexpectedList),
    }
}

fn be_u64(bytes: &[u8]) -> Result<u64, alloy_rlp::Error> {
    if bytes.len() > 8 {
        return Err(alloy_rlp::Error::Overflow);
    }
    Ok(bytes
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)))
}
