//! The version-dispatching router facade
//!
//! [`DexRouter`] is the single entry point callers use. It owns the active
//! [`RouterConfig`], validates fee tiers before anything touches the
//! network, keeps the config in step with the network the ledger is
//! actually connected to and forwards each operation to the v2 or v3 proxy
//! picked at construction.

use crate::error::RouterError;
use crate::fee::{FeeTier, DEFAULT_FEE};
use crate::ledger::{Ledger, SendTxOption};
use crate::registry::{ContractRegistry, ContractSet};
use crate::types::{ProtocolVersion, RouterConfig, Token};
use crate::v2::V2Proxy;
use crate::v3::V3Proxy;
use clarity::{Address, Uint256};
use num_traits::Inv;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// One whole native unit, eighteen decimals as on Ether-style chains
const NATIVE_UNIT: u64 = 1_000_000_000_000_000_000;

/// A network-aware router over one exchange deployment
///
/// The protocol version is fixed at construction, the contract set is not:
/// before every operation the recorded network is compared against the
/// ledger's current one and on a mismatch the full contract set is
/// re-resolved (through a per-network cache) and swapped in atomically.
/// Concurrent readers always observe either the old or the new config,
/// never a mix.
pub struct DexRouter<L, R> {
    ledger: Arc<L>,
    registry: Arc<R>,
    exchange: String,
    version: ProtocolVersion,
    config: RwLock<Arc<RouterConfig>>,
    contract_cache: Mutex<HashMap<u64, ContractSet>>,
}

fn validate_contract_set(
    contracts: &ContractSet,
    version: ProtocolVersion,
) -> Result<(), RouterError> {
    if version == ProtocolVersion::V3 {
        if contracts.quoter.is_none() {
            return Err(RouterError::BadInput(
                "v3 routing requires a quoter contract in the set".to_string(),
            ));
        }
        if contracts.position_manager.is_none() {
            return Err(RouterError::BadInput(
                "v3 routing requires a position manager contract in the set".to_string(),
            ));
        }
    }
    Ok(())
}

impl<L: Ledger, R: ContractRegistry> DexRouter<L, R> {
    /// Builds a router for `exchange` at the given protocol version,
    /// resolving the contract set for whatever network the ledger is
    /// currently on
    pub async fn new(
        ledger: Arc<L>,
        registry: Arc<R>,
        exchange: &str,
        version: ProtocolVersion,
    ) -> Result<Self, RouterError> {
        let network = ledger.network().await?;
        let contracts = registry.resolve(exchange, network, version).await?;
        validate_contract_set(&contracts, version)?;
        debug!("router for {exchange} {version:?} on network {network}: {contracts:?}");

        let config = Arc::new(RouterConfig::new(network, contracts.clone()));
        Ok(DexRouter {
            ledger,
            registry,
            exchange: exchange.to_string(),
            version,
            config: RwLock::new(config),
            contract_cache: Mutex::new(HashMap::from([(network, contracts)])),
        })
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// The network guard run at the top of every operation
    ///
    /// Returns the current config when the ledger still reports the network
    /// it was built for, otherwise resolves the set for the new network
    /// (consulting the cache first) and replaces the stored config in one
    /// swap.
    async fn active_config(&self) -> Result<Arc<RouterConfig>, RouterError> {
        let network = self.ledger.network().await?;
        {
            let config = self.config.read().unwrap();
            if config.network == network {
                return Ok(config.clone());
            }
        }

        let cached = self.contract_cache.lock().unwrap().get(&network).cloned();
        let contracts = match cached {
            Some(contracts) => contracts,
            None => {
                let resolved = self
                    .registry
                    .resolve(&self.exchange, network, self.version)
                    .await?;
                validate_contract_set(&resolved, self.version)?;
                self.contract_cache
                    .lock()
                    .unwrap()
                    .insert(network, resolved.clone());
                resolved
            }
        };

        info!(
            "network changed to {network}, refreshing {} contracts",
            self.exchange
        );
        let fresh = Arc::new(RouterConfig::new(network, contracts));
        let mut slot = self.config.write().unwrap();
        *slot = fresh.clone();
        Ok(fresh)
    }

    /// Swaps a fixed `input_amount` of `input_token` for as much
    /// `output_token` as the pool gives, bounded below by the slippage
    /// tolerance
    ///
    /// Non-native inputs are approved to the router for exactly
    /// `input_amount` before the swap is submitted. The recipient defaults
    /// to the ledger account. Returns the swap's transaction id.
    #[allow(clippy::too_many_arguments)]
    pub async fn swap(
        &self,
        input_token: Token,
        output_token: Token,
        input_amount: Uint256,
        slippage: f64,
        fee: u32,
        recipient: Option<Address>,
        options: Vec<SendTxOption>,
    ) -> Result<Uint256, RouterError> {
        let fee = FeeTier::from_value(fee)?;
        let config = self.active_config().await?;
        let recipient = recipient.unwrap_or_else(|| self.ledger.account());

        match self.version {
            ProtocolVersion::V2 => {
                V2Proxy::new(self.ledger.as_ref(), &config)
                    .swap(
                        &input_token,
                        &output_token,
                        input_amount,
                        slippage,
                        recipient,
                        options,
                    )
                    .await
            }
            ProtocolVersion::V3 => {
                V3Proxy::new(self.ledger.as_ref(), &config)
                    .swap(
                        &input_token,
                        &output_token,
                        input_amount,
                        slippage,
                        fee,
                        recipient,
                        options,
                    )
                    .await
            }
        }
    }

    /// Swaps as little `input_token` as possible for exactly
    /// `output_amount` of `output_token`, bounded above by the slippage
    /// tolerance
    #[allow(clippy::too_many_arguments)]
    pub async fn swap_output(
        &self,
        input_token: Token,
        output_token: Token,
        output_amount: Uint256,
        slippage: f64,
        fee: u32,
        recipient: Option<Address>,
        options: Vec<SendTxOption>,
    ) -> Result<Uint256, RouterError> {
        let fee = FeeTier::from_value(fee)?;
        let config = self.active_config().await?;
        let recipient = recipient.unwrap_or_else(|| self.ledger.account());

        match self.version {
            ProtocolVersion::V2 => {
                V2Proxy::new(self.ledger.as_ref(), &config)
                    .swap_output(
                        &input_token,
                        &output_token,
                        output_amount,
                        slippage,
                        recipient,
                        options,
                    )
                    .await
            }
            ProtocolVersion::V3 => {
                V3Proxy::new(self.ledger.as_ref(), &config)
                    .swap_output(
                        &input_token,
                        &output_token,
                        output_amount,
                        slippage,
                        fee,
                        recipient,
                        options,
                    )
                    .await
            }
        }
    }

    /// Mints a full-range liquidity position for the pair, v3 only
    ///
    /// When `amount1` is omitted it is derived from `amount0` at the pool's
    /// exact reference ratio. Returns the mint's transaction id.
    pub async fn add_liquidity(
        &self,
        token0: Token,
        token1: Token,
        amount0: Uint256,
        amount1: Option<Uint256>,
        fee: u32,
    ) -> Result<Uint256, RouterError> {
        let fee = FeeTier::from_value(fee)?;
        let config = self.active_config().await?;

        match self.version {
            ProtocolVersion::V2 => Err(RouterError::BadInput(
                "liquidity provision is only supported on v3 routers".to_string(),
            )),
            ProtocolVersion::V3 => {
                V3Proxy::new(self.ledger.as_ref(), &config)
                    .add_liquidity(&token0, &token1, amount0, amount1, fee)
                    .await
            }
        }
    }

    /// Resolves the pool (v3) or pair (v2) contract address for two tokens
    pub async fn get_pool(
        &self,
        token0: Address,
        token1: Address,
        fee: u32,
    ) -> Result<Address, RouterError> {
        let fee = FeeTier::from_value(fee)?;
        let config = self.active_config().await?;

        match self.version {
            ProtocolVersion::V2 => {
                V2Proxy::new(self.ledger.as_ref(), &config)
                    .get_pool(token0, token1, fee)
                    .await
            }
            ProtocolVersion::V3 => {
                V3Proxy::new(self.ledger.as_ref(), &config)
                    .get_pool(token0, token1, fee)
                    .await
            }
        }
    }

    /// Quotes the output for `input_amount` of `input` in `output`, scaled
    /// down by `slippage`
    ///
    /// A slippage of zero returns the raw on-chain quote untouched.
    pub async fn get_output_amount(
        &self,
        input_amount: Uint256,
        input: Address,
        output: Address,
        slippage: f64,
        fee: u32,
    ) -> Result<Uint256, RouterError> {
        let fee = FeeTier::from_value(fee)?;
        let config = self.active_config().await?;
        self.min_output(&config, input_amount, input, output, slippage, fee)
            .await
    }

    /// The token0/token1 exchange rate: the reciprocal of the zero-slippage
    /// quote for one base unit of `token0` in `token1`
    pub async fn get_exchange_rate(
        &self,
        token0: Address,
        token1: Address,
    ) -> Result<f64, RouterError> {
        let config = self.active_config().await?;
        let amount = self
            .min_output(&config, 1u8.into(), token0, token1, 0.0, DEFAULT_FEE)
            .await?;
        quote_reciprocal(amount)
    }

    /// How much native asset, in whole eighteen-decimal units, one base
    /// unit of `token` is worth
    ///
    /// Derived by quoting one whole native unit through the wrapped native
    /// token at zero slippage and inverting.
    pub async fn get_native_per_token(&self, token: Address) -> Result<f64, RouterError> {
        let config = self.active_config().await?;
        let weth = match self.version {
            ProtocolVersion::V2 => {
                V2Proxy::new(self.ledger.as_ref(), &config)
                    .wrapped_native()
                    .await?
            }
            ProtocolVersion::V3 => {
                V3Proxy::new(self.ledger.as_ref(), &config)
                    .wrapped_native()
                    .await?
            }
        };
        let amount = self
            .min_output(
                &config,
                NATIVE_UNIT.into(),
                weth,
                token,
                0.0,
                DEFAULT_FEE,
            )
            .await?;
        quote_reciprocal(amount)
    }

    async fn min_output(
        &self,
        config: &RouterConfig,
        input_amount: Uint256,
        input: Address,
        output: Address,
        slippage: f64,
        fee: FeeTier,
    ) -> Result<Uint256, RouterError> {
        match self.version {
            ProtocolVersion::V2 => {
                V2Proxy::new(self.ledger.as_ref(), config)
                    .min_output_amount(input_amount, input, output, slippage)
                    .await
            }
            ProtocolVersion::V3 => {
                V3Proxy::new(self.ledger.as_ref(), config)
                    .min_output_amount(input_amount, input, output, slippage, fee)
                    .await
            }
        }
    }
}

fn quote_reciprocal(amount: Uint256) -> Result<f64, RouterError> {
    let raw = amount.to_string().parse::<f64>().unwrap();
    if raw == 0.0 {
        return Err(RouterError::BadResponse(
            "quote returned zero, rate is undefined".to_string(),
        ));
    }
    Ok(raw.inv())
}
