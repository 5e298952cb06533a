//! Shared data types used across the router, the version proxies and the
//! pool reader

use crate::error::RouterError;
use crate::ledger::{decode_address_word, Ledger};
use crate::registry::ContractSet;
use clarity::{Address, Uint256};
use std::fmt::Display;
use std::fmt::Formatter;
use tokio::sync::OnceCell;

/// The AMM protocol generation a router instance speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    V2,
    V3,
}

/// A swappable asset, either the chain's native asset or an ERC20 contract
///
/// The native sentinel exists because native-asset swaps take a different
/// shape on-chain (value attached to the call, no approval step) than ERC20
/// swaps do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    Native,
    Erc20(Address),
}

impl Token {
    /// The ERC20 contract address, None for the native asset
    pub fn address(&self) -> Option<Address> {
        match self {
            Token::Native => None,
            Token::Erc20(address) => Some(*address),
        }
    }
}

impl From<Address> for Token {
    fn from(address: Address) -> Self {
        Token::Erc20(address)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Token::Native => write!(f, "native"),
            Token::Erc20(address) => write!(f, "{address}"),
        }
    }
}

/// Returns the ERC20 address behind a token, erroring out for the native
/// sentinel where a contract address is required
pub(crate) fn erc20_address(token: &Token) -> Result<Address, RouterError> {
    token.address().ok_or_else(|| {
        RouterError::BadInput("expected an ERC20 token address, got the native asset".to_string())
    })
}

/// An ordered hop route for v2 path swaps
///
/// The first element is always the input token and the last the output
/// token. Pairs that do not include the wrapped native token are routed
/// through it as the intermediary hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPath {
    tokens: Vec<Address>,
}

impl SwapPath {
    /// Builds the route between two tokens: direct when either endpoint is
    /// the wrapped native token, otherwise three hops through it
    pub fn between(input: Address, output: Address, wrapped_native: Address) -> Self {
        if input == wrapped_native || output == wrapped_native {
            SwapPath {
                tokens: vec![input, output],
            }
        } else {
            SwapPath {
                tokens: vec![input, wrapped_native, output],
            }
        }
    }

    pub fn input(&self) -> Address {
        self.tokens[0]
    }

    pub fn output(&self) -> Address {
        self.tokens[self.tokens.len() - 1]
    }

    pub fn tokens(&self) -> &[Address] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A single-pool price quote from the v3 quoter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleQuote {
    /// The counter amount: output for exact-input quotes, input for
    /// exact-output quotes
    pub amount: Uint256,
    /// The pool sqrt price after the simulated swap, a Q64.96
    pub sqrt_price_x96_after: Uint256,
    pub initialized_ticks_crossed: u32,
    pub gas_estimate: Uint256,
}

/// Static pool metadata, set at pool creation and immutable afterwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolData {
    pub factory: Address,
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
    pub tick_spacing: i32,
    pub max_liquidity_per_tick: Uint256,
}

/// Live pool state as of the latest confirmed block at call time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub liquidity: Uint256,
    pub sqrt_price_x96: Uint256,
    pub tick: i32,
    pub observation_index: u16,
    pub observation_cardinality: u16,
    pub observation_cardinality_next: u16,
    pub fee_protocol: u8,
    pub unlocked: bool,
}

/// The full per-network state of a router instance
///
/// A config is an immutable snapshot: when the ledger reports a different
/// network the facade builds a fresh config and swaps it in whole, readers
/// never observe a partially updated contract set. The wrapped native
/// address memo lives here so its lifetime is tied to the config's, a
/// network change drops it automatically.
#[derive(Debug)]
pub struct RouterConfig {
    pub network: u64,
    pub contracts: ContractSet,
    wrapped_native: OnceCell<Address>,
}

impl RouterConfig {
    pub fn new(network: u64, contracts: ContractSet) -> Self {
        RouterConfig {
            network,
            contracts,
            wrapped_native: OnceCell::new(),
        }
    }

    /// The wrapped native token address, fetched from the router contract on
    /// first use (`sig` names the version-specific getter) and memoized for
    /// the lifetime of this config
    pub(crate) async fn wrapped_native<L: Ledger + ?Sized>(
        &self,
        ledger: &L,
        sig: &str,
    ) -> Result<Address, RouterError> {
        self.wrapped_native
            .get_or_try_init(|| async {
                let response = ledger.read_call(self.contracts.router, sig, &[]).await?;
                decode_address_word(&response, 0)
            })
            .await
            .map(|address| *address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_slice(&[byte; 20]).unwrap()
    }

    #[test]
    fn test_path_direct_when_endpoint_is_wrapped_native() {
        let weth = addr(0xee);
        let other = addr(0x22);

        let path = SwapPath::between(weth, other, weth);
        assert_eq!(path.tokens(), &[weth, other]);
        assert_eq!(path.input(), weth);
        assert_eq!(path.output(), other);

        let path = SwapPath::between(other, weth, weth);
        assert_eq!(path.tokens(), &[other, weth]);
    }

    #[test]
    fn test_path_routes_through_wrapped_native() {
        let weth = addr(0xee);
        let a = addr(0x11);
        let b = addr(0x22);

        let path = SwapPath::between(a, b, weth);
        assert_eq!(path.len(), 3);
        assert_eq!(path.tokens(), &[a, weth, b]);
        assert_eq!(path.input(), a);
        assert_eq!(path.output(), b);
    }

    #[test]
    fn test_token_address() {
        let a = addr(0x33);
        assert_eq!(Token::Erc20(a).address(), Some(a));
        assert_eq!(Token::Native.address(), None);
        assert!(erc20_address(&Token::Native).is_err());
    }
}
