//! The v3 proxy: single-pool quoting, swapping and concentrated liquidity
//! against a SwapRouter / QuoterV2 / NonfungiblePositionManager deployment
//!
//! Every v3 operation is pinned to one fee tier, there is no path
//! discovery: the quoter prices a single pool and the swap functions name
//! the pool by (tokenIn, tokenOut, fee).

use crate::erc20::approve_erc20;
use crate::error::RouterError;
use crate::fee::{
    check_slippage, full_tick_range, initial_sqrt_price_x96, scale_amount, FeeTier,
};
use crate::ledger::{
    decode_address_word, decode_uint_word, response_word, tx_deadline, Ledger, SendTxOption,
};
use crate::pool;
use crate::types::{erc20_address, RouterConfig, SingleQuote, Token};
use clarity::abi::{encode_call, AbiToken};
use clarity::{Address, Int256, Uint256};

/// Stateless v3 engine over a borrowed config, built fresh for every facade
/// call
pub(crate) struct V3Proxy<'a, L: Ledger + ?Sized> {
    ledger: &'a L,
    config: &'a RouterConfig,
}

impl<'a, L: Ledger + ?Sized> V3Proxy<'a, L> {
    pub(crate) fn new(ledger: &'a L, config: &'a RouterConfig) -> Self {
        V3Proxy { ledger, config }
    }

    pub(crate) async fn wrapped_native(&self) -> Result<Address, RouterError> {
        self.config.wrapped_native(self.ledger, "WETH9()").await
    }

    fn quoter(&self) -> Result<Address, RouterError> {
        self.config.contracts.quoter.ok_or_else(|| {
            RouterError::BadInput("v3 contract set is missing the quoter".to_string())
        })
    }

    fn position_manager(&self) -> Result<Address, RouterError> {
        self.config.contracts.position_manager.ok_or_else(|| {
            RouterError::BadInput("v3 contract set is missing the position manager".to_string())
        })
    }

    /// Prices `input_amount` of `input` in `output` through the pool of the
    /// given fee tier, a read-only quoter simulation
    pub(crate) async fn quote_exact_input_single(
        &self,
        input_amount: Uint256,
        input: Address,
        output: Address,
        fee: FeeTier,
    ) -> Result<SingleQuote, RouterError> {
        self.quote_single(
            "quoteExactInputSingle((address,address,uint256,uint24,uint160))",
            input_amount,
            input,
            output,
            fee,
        )
        .await
    }

    /// The inverse quote: how much `input` buys exactly `output_amount` of
    /// `output`
    pub(crate) async fn quote_exact_output_single(
        &self,
        output_amount: Uint256,
        input: Address,
        output: Address,
        fee: FeeTier,
    ) -> Result<SingleQuote, RouterError> {
        self.quote_single(
            "quoteExactOutputSingle((address,address,uint256,uint24,uint160))",
            output_amount,
            input,
            output,
            fee,
        )
        .await
    }

    async fn quote_single(
        &self,
        sig: &str,
        amount: Uint256,
        input: Address,
        output: Address,
        fee: FeeTier,
    ) -> Result<SingleQuote, RouterError> {
        let quoter = self.quoter()?;
        // no price limit on quotes
        let params = AbiToken::Struct(vec![
            input.into(),
            output.into(),
            amount.into(),
            AbiToken::Uint(fee.value().into()),
            AbiToken::Uint(0u8.into()),
        ]);
        let response = self.ledger.read_call(quoter, sig, &[params]).await?;
        trace!("{sig} response is {:02X?}", response);
        if response.len() < 128 {
            return Err(RouterError::BadResponse(format!(
                "quoter response too short: {} bytes",
                response.len()
            )));
        }

        let amount = decode_uint_word(&response, 0)?;
        let sqrt_price_x96_after = {
            let word = response_word(&response, 1)?;
            Uint256::from_be_bytes(&word[12..32])
        };
        let initialized_ticks_crossed = {
            let word = response_word(&response, 2)?;
            u32::from_be_bytes([word[28], word[29], word[30], word[31]])
        };
        let gas_estimate = decode_uint_word(&response, 3)?;

        Ok(SingleQuote {
            amount,
            sqrt_price_x96_after,
            initialized_ticks_crossed,
            gas_estimate,
        })
    }

    /// The minimum acceptable output for an exact-input swap at the given
    /// slippage, the raw quote scaled down and truncated
    pub(crate) async fn min_output_amount(
        &self,
        input_amount: Uint256,
        input: Address,
        output: Address,
        slippage: f64,
        fee: FeeTier,
    ) -> Result<Uint256, RouterError> {
        check_slippage(slippage)?;
        let quote = self
            .quote_exact_input_single(input_amount, input, output, fee)
            .await?;
        Ok(scale_amount(quote.amount, 1.0 - slippage))
    }

    /// The maximum acceptable input for an exact-output swap at the given
    /// slippage, the raw quote scaled up and truncated
    pub(crate) async fn max_input_amount(
        &self,
        output_amount: Uint256,
        input: Address,
        output: Address,
        slippage: f64,
        fee: FeeTier,
    ) -> Result<Uint256, RouterError> {
        check_slippage(slippage)?;
        let quote = self
            .quote_exact_output_single(output_amount, input, output, fee)
            .await?;
        Ok(scale_amount(quote.amount, 1.0 + slippage))
    }

    /// Exact-input swap dispatch
    ///
    /// Native input rides along as the transaction value and the router
    /// wraps it, native output is delivered as the wrapped token. Non-native
    /// inputs get an exact-amount router allowance first.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn swap(
        &self,
        input_token: &Token,
        output_token: &Token,
        input_amount: Uint256,
        slippage: f64,
        fee: FeeTier,
        recipient: Address,
        options: Vec<SendTxOption>,
    ) -> Result<Uint256, RouterError> {
        check_slippage(slippage)?;
        let weth = self.wrapped_native().await?;
        let router = self.config.contracts.router;

        if self.ledger.is_native(input_token) {
            let output = erc20_address(output_token)?;
            let min_out = self
                .min_output_amount(input_amount, weth, output, slippage, fee)
                .await?;
            self.exact_input_single(
                weth,
                output,
                input_amount,
                min_out,
                fee,
                recipient,
                input_amount,
                options,
            )
            .await
        } else if self.ledger.is_native(output_token) {
            let input = erc20_address(input_token)?;
            let min_out = self
                .min_output_amount(input_amount, input, weth, slippage, fee)
                .await?;
            approve_erc20(self.ledger, input, router, input_amount).await?;
            self.exact_input_single(
                input,
                weth,
                input_amount,
                min_out,
                fee,
                recipient,
                0u8.into(),
                options,
            )
            .await
        } else {
            let input = erc20_address(input_token)?;
            let output = erc20_address(output_token)?;
            let min_out = self
                .min_output_amount(input_amount, input, output, slippage, fee)
                .await?;
            approve_erc20(self.ledger, input, router, input_amount).await?;
            self.exact_input_single(
                input,
                output,
                input_amount,
                min_out,
                fee,
                recipient,
                0u8.into(),
                options,
            )
            .await
        }
    }

    /// Exact-output swap dispatch, the approval covers the maximum input
    /// the slippage tolerance allows
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn swap_output(
        &self,
        input_token: &Token,
        output_token: &Token,
        output_amount: Uint256,
        slippage: f64,
        fee: FeeTier,
        recipient: Address,
        options: Vec<SendTxOption>,
    ) -> Result<Uint256, RouterError> {
        check_slippage(slippage)?;
        let weth = self.wrapped_native().await?;
        let router = self.config.contracts.router;

        if self.ledger.is_native(input_token) {
            let output = erc20_address(output_token)?;
            let max_in = self
                .max_input_amount(output_amount, weth, output, slippage, fee)
                .await?;
            self.exact_output_single(
                weth,
                output,
                output_amount,
                max_in,
                fee,
                recipient,
                max_in,
                options,
            )
            .await
        } else if self.ledger.is_native(output_token) {
            let input = erc20_address(input_token)?;
            let max_in = self
                .max_input_amount(output_amount, input, weth, slippage, fee)
                .await?;
            approve_erc20(self.ledger, input, router, max_in).await?;
            self.exact_output_single(
                input,
                weth,
                output_amount,
                max_in,
                fee,
                recipient,
                0u8.into(),
                options,
            )
            .await
        } else {
            let input = erc20_address(input_token)?;
            let output = erc20_address(output_token)?;
            let max_in = self
                .max_input_amount(output_amount, input, output, slippage, fee)
                .await?;
            approve_erc20(self.ledger, input, router, max_in).await?;
            self.exact_output_single(
                input,
                output,
                output_amount,
                max_in,
                fee,
                recipient,
                0u8.into(),
                options,
            )
            .await
        }
    }

    //struct ExactInputSingleParams {
    //    address tokenIn;
    //    address tokenOut;
    //    uint24 fee;
    //    address recipient;
    //    uint256 deadline;
    //    uint256 amountIn;
    //    uint256 amountOutMinimum;
    //    uint160 sqrtPriceLimitX96;
    //}
    #[allow(clippy::too_many_arguments)]
    async fn exact_input_single(
        &self,
        input: Address,
        output: Address,
        amount_in: Uint256,
        min_amount_out: Uint256,
        fee: FeeTier,
        recipient: Address,
        value: Uint256,
        options: Vec<SendTxOption>,
    ) -> Result<Uint256, RouterError> {
        let deadline = tx_deadline(self.ledger).await?;
        let params = AbiToken::Struct(vec![
            input.into(),
            output.into(),
            AbiToken::Uint(fee.value().into()),
            recipient.into(),
            deadline.into(),
            amount_in.into(),
            min_amount_out.into(),
            AbiToken::Uint(0u8.into()),
        ]);
        let txid = self
            .ledger
            .submit(
                self.config.contracts.router,
                "exactInputSingle((address,address,uint24,address,uint256,uint256,uint256,uint160))",
                &[params],
                value,
                options,
            )
            .await?;
        debug!("txid for v3 swap is {txid}");
        Ok(txid)
    }

    //struct ExactOutputSingleParams {
    //    address tokenIn;
    //    address tokenOut;
    //    uint24 fee;
    //    address recipient;
    //    uint256 deadline;
    //    uint256 amountOut;
    //    uint256 amountInMaximum;
    //    uint160 sqrtPriceLimitX96;
    //}
    #[allow(clippy::too_many_arguments)]
    async fn exact_output_single(
        &self,
        input: Address,
        output: Address,
        amount_out: Uint256,
        max_amount_in: Uint256,
        fee: FeeTier,
        recipient: Address,
        value: Uint256,
        options: Vec<SendTxOption>,
    ) -> Result<Uint256, RouterError> {
        let deadline = tx_deadline(self.ledger).await?;
        let params = AbiToken::Struct(vec![
            input.into(),
            output.into(),
            AbiToken::Uint(fee.value().into()),
            recipient.into(),
            deadline.into(),
            amount_out.into(),
            max_amount_in.into(),
            AbiToken::Uint(0u8.into()),
        ]);
        let txid = self
            .ledger
            .submit(
                self.config.contracts.router,
                "exactOutputSingle((address,address,uint24,address,uint256,uint256,uint256,uint160))",
                &[params],
                value,
                options,
            )
            .await?;
        debug!("txid for v3 exact output swap is {txid}");
        Ok(txid)
    }

    /// Requests the pool contract address for (token0, token1, fee) from the
    /// factory
    pub(crate) async fn get_pool(
        &self,
        token0: Address,
        token1: Address,
        fee: FeeTier,
    ) -> Result<Address, RouterError> {
        let response = self
            .ledger
            .read_call(
                self.config.contracts.factory,
                "getPool(address,address,uint24)",
                &[
                    token0.into(),
                    token1.into(),
                    AbiToken::Uint(fee.value().into()),
                ],
            )
            .await?;
        trace!("getPool response is {:X?}", response);
        if response.len() < 32 || response.iter().all(|b| *b == 0) {
            return Err(RouterError::PoolNotFound {
                token0,
                token1,
                fee: fee.value(),
            });
        }
        decode_address_word(&response, 0)
    }

    /// Mints a full-range liquidity position for the pair
    ///
    /// A missing `amount1` is derived by quoting `amount0` at zero slippage
    /// so both sides enter at the pool's own reference ratio. The native
    /// side of a pair, if any, is attached as the transaction value instead
    /// of being approved.
    pub(crate) async fn add_liquidity(
        &self,
        token0: &Token,
        token1: &Token,
        amount0: Uint256,
        amount1: Option<Uint256>,
        fee: FeeTier,
    ) -> Result<Uint256, RouterError> {
        let weth = self.wrapped_native().await?;
        let native0 = self.ledger.is_native(token0);
        let native1 = self.ledger.is_native(token1);
        let address0 = if native0 { weth } else { erc20_address(token0)? };
        let address1 = if native1 { weth } else { erc20_address(token1)? };

        let amount1 = match amount1 {
            Some(amount) => amount,
            None => {
                self.min_output_amount(amount0, address0, address1, 0.0, fee)
                    .await?
            }
        };

        let value: Uint256 = if native0 {
            amount0
        } else if native1 {
            amount1
        } else {
            0u8.into()
        };

        self.mint_liquidity(
            address0, address1, amount0, amount1, fee, value, !native0, !native1,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn mint_liquidity(
        &self,
        token0: Address,
        token1: Address,
        amount0: Uint256,
        amount1: Uint256,
        fee: FeeTier,
        value: Uint256,
        approve0: bool,
        approve1: bool,
    ) -> Result<Uint256, RouterError> {
        let nft_manager = self.position_manager()?;
        let pool = self.get_pool(token0, token1, fee).await?;
        let range = full_tick_range(fee);

        let state = pool::get_pool_state(self.ledger, pool).await?;
        if !state.unlocked {
            // no price set yet, the pool must be initialized before minting
            let sqrt_price = initial_sqrt_price_x96(amount0, amount1);
            debug!("initializing pool {pool} at sqrt price {sqrt_price}");
            self.ledger
                .submit(
                    pool,
                    "initialize(uint160)",
                    &[AbiToken::Uint(sqrt_price)],
                    0u8.into(),
                    Vec::new(),
                )
                .await?;
        }

        if approve0 {
            approve_erc20(self.ledger, token0, nft_manager, amount0).await?;
        }
        if approve1 {
            approve_erc20(self.ledger, token1, nft_manager, amount1).await?;
        }

        let deadline = tx_deadline(self.ledger).await?;
        //struct MintParams {
        //    address token0;
        //    address token1;
        //    uint24 fee;
        //    int24 tickLower;
        //    int24 tickUpper;
        //    uint256 amount0Desired;
        //    uint256 amount1Desired;
        //    uint256 amount0Min;
        //    uint256 amount1Min;
        //    address recipient;
        //    uint256 deadline;
        //}
        let params = AbiToken::Struct(vec![
            token0.into(),
            token1.into(),
            AbiToken::Uint(fee.value().into()),
            AbiToken::Int(Int256::from(range.lower)),
            AbiToken::Int(Int256::from(range.upper)),
            amount0.into(),
            amount1.into(),
            AbiToken::Uint(0u8.into()),
            AbiToken::Uint(0u8.into()),
            self.ledger.account().into(),
            deadline.into(),
        ]);
        let mint_call = encode_call(
            "mint((address,address,uint24,int24,int24,uint256,uint256,uint256,uint256,address,uint256))",
            &[params],
        )?;

        // the position manager is driven through its multicall entry point
        let txid = self
            .ledger
            .submit(
                nft_manager,
                "multicall(bytes[])",
                &[AbiToken::Dynamic(vec![AbiToken::UnboundedBytes(mint_call)])],
                value,
                Vec::new(),
            )
            .await?;
        debug!("txid for liquidity mint is {txid}");
        Ok(txid)
    }
}
