use clarity::Address;
use clarity::Error as ClarityError;
use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

/// The error type for every fallible operation in this crate
///
/// Failures coming out of the ledger backend are carried in the `Transport`
/// variant untouched, this layer never retries or rewrites them. The
/// not-found and validation variants enumerate the valid alternatives so a
/// caller can correct the request without a second lookup.
#[derive(Debug)]
pub enum RouterError {
    BadInput(String),
    BadResponse(String),
    /// The fee value is not one of the supported pool fee tiers
    UnsupportedFee(u32),
    /// The registry has no contract set for this exchange on this network
    ContractNotFound {
        exchange: String,
        network: u64,
        supported: Vec<u64>,
    },
    /// The factory returned the zero address for this token pair and fee
    PoolNotFound {
        token0: Address,
        token1: Address,
        fee: u32,
    },
    /// The token is not usable with this exchange on the current network
    UnsupportedToken {
        token: String,
        exchange: String,
        supported: Vec<String>,
    },
    /// Any failure reported by the ledger backend, passed through verbatim
    Transport(Box<dyn Error + Send + Sync>),
    ClarityError(ClarityError),
}

impl From<ClarityError> for RouterError {
    fn from(error: ClarityError) -> Self {
        RouterError::ClarityError(error)
    }
}

impl Display for RouterError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            RouterError::BadInput(val) => write!(f, "Router bad input {val}"),
            RouterError::BadResponse(val) => write!(f, "Router bad response {val}"),
            RouterError::UnsupportedFee(fee) => {
                write!(
                    f,
                    "Fee {fee} is not a supported pool fee tier, supported tiers are 500, 3000 and 10000"
                )
            }
            RouterError::ContractNotFound {
                exchange,
                network,
                supported,
            } => {
                let networks = supported
                    .iter()
                    .map(|n| n.to_string())
                    .collect::<Vec<String>>()
                    .join(", ");
                write!(
                    f,
                    "No contracts found on network {network}. {exchange} supports the following networks: {networks}"
                )
            }
            RouterError::PoolNotFound {
                token0,
                token1,
                fee,
            } => {
                write!(
                    f,
                    "No pool exists for the pair {token0} / {token1} at fee tier {fee}"
                )
            }
            RouterError::UnsupportedToken {
                token,
                exchange,
                supported,
            } => {
                write!(
                    f,
                    "Token {token} is not supported by {exchange}. Supported tokens: {}",
                    supported.join(", ")
                )
            }
            RouterError::Transport(val) => write!(f, "Ledger transport error {val}"),
            RouterError::ClarityError(val) => write!(f, "ClarityError {val}"),
        }
    }
}

impl Error for RouterError {}
