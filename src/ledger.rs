//! The narrow interface to the chain backend
//!
//! Everything this crate knows about the chain flows through [`Ledger`]:
//! read-only contract calls, state-changing submissions and the identity of
//! the account acting. Transport, signing, gas estimation and ABI encoding
//! all live behind the trait, which keeps the router logic testable against
//! a recording mock and portable across client stacks.

use crate::error::RouterError;
use crate::types::Token;
use async_trait::async_trait;
use clarity::abi::AbiToken;
use clarity::{Address, Uint256};

/// Optional per-transaction overrides forwarded to the ledger untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendTxOption {
    GasLimit(Uint256),
    GasPrice(Uint256),
}

/// A signing chain backend
///
/// Implementations are expected to ABI-encode `sig` + `args`, perform the
/// call and hand back the raw response bytes (for reads) or the transaction
/// id once the transaction has been accepted by the node (for submissions).
/// `submit` returning is the acknowledgement the router relies on to order
/// an approval before its dependent swap.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Executes a read-only contract call and returns the raw ABI-encoded
    /// response
    async fn read_call(
        &self,
        contract: Address,
        sig: &str,
        args: &[AbiToken],
    ) -> Result<Vec<u8>, RouterError>;

    /// Signs and submits a state-changing contract call, returning its
    /// transaction id
    async fn submit(
        &self,
        contract: Address,
        sig: &str,
        args: &[AbiToken],
        value: Uint256,
        options: Vec<SendTxOption>,
    ) -> Result<Uint256, RouterError>;

    /// The account on whose behalf calls are made, also the default swap
    /// recipient
    fn account(&self) -> Address;

    /// The id of the network the backing node is currently connected to
    async fn network(&self) -> Result<u64, RouterError>;

    /// The timestamp of the latest confirmed block, used for deadlines
    async fn latest_block_timestamp(&self) -> Result<Uint256, RouterError>;

    /// Whether the given token denotes the chain's native asset
    fn is_native(&self, token: &Token) -> bool {
        matches!(token, Token::Native)
    }
}

/// Every swap and mint carries a deadline of the latest block time plus ten
/// minutes, bounding how long it can sit in the mempool before the chain
/// itself rejects it
pub(crate) async fn tx_deadline<L: Ledger + ?Sized>(ledger: &L) -> Result<Uint256, RouterError> {
    Ok(ledger.latest_block_timestamp().await? + (10u64 * 60u64).into())
}

/// Reads the 32 byte word at `index` out of a response buffer
pub(crate) fn response_word(buf: &[u8], index: usize) -> Result<&[u8], RouterError> {
    let start = index * 32;
    match buf.get(start..start + 32) {
        Some(word) => Ok(word),
        None => Err(RouterError::BadResponse(format!(
            "response of {} bytes has no word {index}",
            buf.len()
        ))),
    }
}

/// Decodes the uint256 at word `index` of a response
pub(crate) fn decode_uint_word(buf: &[u8], index: usize) -> Result<Uint256, RouterError> {
    Ok(Uint256::from_be_bytes(response_word(buf, index)?))
}

/// Decodes the address at word `index` of a response, addresses occupy the
/// rightmost 20 bytes of their word
pub(crate) fn decode_address_word(buf: &[u8], index: usize) -> Result<Address, RouterError> {
    let word = response_word(buf, index)?;
    Ok(Address::from_slice(&word[12..32])?)
}

/// Decodes the int24 at word `index` of a response, sign-extending from the
/// low three bytes
pub(crate) fn decode_int24_word(buf: &[u8], index: usize) -> Result<i32, RouterError> {
    let word = response_word(buf, index)?;
    let bytes = [word[29], word[30], word[31]];
    if bytes[0] >= 0x80 {
        Ok(i32::from_be_bytes([0xFF, bytes[0], bytes[1], bytes[2]]))
    } else {
        Ok(i32::from_be_bytes([0x00, bytes[0], bytes[1], bytes[2]]))
    }
}
