//! The v2 proxy: path-based quoting and swapping against a Router02-style
//! contract
//!
//! v2 has no fee tiers and no quoter contract, prices come from the
//! router's own getAmountsOut / getAmountsIn path simulation. Pairs that do
//! not touch the wrapped native token are routed through it.

use crate::erc20::approve_erc20;
use crate::error::RouterError;
use crate::fee::{check_slippage, scale_amount, FeeTier};
use crate::ledger::{decode_address_word, tx_deadline, Ledger, SendTxOption};
use crate::types::{erc20_address, RouterConfig, SwapPath, Token};
use clarity::abi::AbiToken;
use clarity::{Address, Uint256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwapSide {
    ExactInput,
    ExactOutput,
}

/// Stateless v2 engine over a borrowed config, built fresh for every facade
/// call
pub(crate) struct V2Proxy<'a, L: Ledger + ?Sized> {
    ledger: &'a L,
    config: &'a RouterConfig,
}

impl<'a, L: Ledger + ?Sized> V2Proxy<'a, L> {
    pub(crate) fn new(ledger: &'a L, config: &'a RouterConfig) -> Self {
        V2Proxy { ledger, config }
    }

    pub(crate) async fn wrapped_native(&self) -> Result<Address, RouterError> {
        self.config.wrapped_native(self.ledger, "WETH()").await
    }

    /// The minimum acceptable output for swapping `input_amount` of `input`
    /// into `output`, the raw path quote scaled down by the slippage
    pub(crate) async fn min_output_amount(
        &self,
        input_amount: Uint256,
        input: Address,
        output: Address,
        slippage: f64,
    ) -> Result<Uint256, RouterError> {
        check_slippage(slippage)?;
        let weth = self.wrapped_native().await?;
        let path = SwapPath::between(input, output, weth);
        self.min_output_for_path(input_amount, &path, slippage).await
    }

    /// The maximum acceptable input for receiving `output_amount` of the
    /// path's output token, the raw path quote scaled up by the slippage
    pub(crate) async fn max_input_amount(
        &self,
        output_amount: Uint256,
        input: Address,
        output: Address,
        slippage: f64,
    ) -> Result<Uint256, RouterError> {
        check_slippage(slippage)?;
        let weth = self.wrapped_native().await?;
        let path = SwapPath::between(input, output, weth);
        self.max_input_for_path(output_amount, &path, slippage).await
    }

    async fn min_output_for_path(
        &self,
        input_amount: Uint256,
        path: &SwapPath,
        slippage: f64,
    ) -> Result<Uint256, RouterError> {
        let amounts = self
            .get_path_amounts("getAmountsOut(uint256,address[])", input_amount, path)
            .await?;
        // the last leg is the output amount
        let amount_out = amounts[amounts.len() - 1];
        Ok(scale_amount(amount_out, 1.0 - slippage))
    }

    async fn max_input_for_path(
        &self,
        output_amount: Uint256,
        path: &SwapPath,
        slippage: f64,
    ) -> Result<Uint256, RouterError> {
        let amounts = self
            .get_path_amounts("getAmountsIn(uint256,address[])", output_amount, path)
            .await?;
        // the first leg is the input amount
        let amount_in = amounts[0];
        Ok(scale_amount(amount_in, 1.0 + slippage))
    }

    /// Runs one of the router's path pricing functions and decodes the
    /// hop-by-hop amounts
    async fn get_path_amounts(
        &self,
        sig: &str,
        amount: Uint256,
        path: &SwapPath,
    ) -> Result<Vec<Uint256>, RouterError> {
        let args: [AbiToken; 2] = [AbiToken::Uint(amount), path.tokens().to_vec().into()];
        let response = self
            .ledger
            .read_call(self.config.contracts.router, sig, &args)
            .await?;
        trace!("{sig} response is {:02X?}", response);

        // throw away the type code and length words, then parse a Uint256
        // from each 32 byte chunk
        if response.len() % 32 != 0 || response.len() <= 64 {
            return Err(RouterError::BadResponse(format!(
                "unexpected {sig} response byte length: {}",
                response.len()
            )));
        }
        let amounts = response[64..]
            .chunks(32)
            .map(Uint256::from_be_bytes)
            .collect::<Vec<Uint256>>();
        debug!("path amounts from {sig}: {:?}", amounts);
        if amounts.len() != path.len() {
            return Err(RouterError::BadResponse(format!(
                "expected {} legs from {sig}, got {}",
                path.len(),
                amounts.len()
            )));
        }
        Ok(amounts)
    }

    /// Exact-input swap dispatch: picks the router function by which side of
    /// the pair is the native asset and grants the router an allowance for
    /// non-native inputs before submitting
    pub(crate) async fn swap(
        &self,
        input_token: &Token,
        output_token: &Token,
        input_amount: Uint256,
        slippage: f64,
        recipient: Address,
        options: Vec<SendTxOption>,
    ) -> Result<Uint256, RouterError> {
        check_slippage(slippage)?;
        let weth = self.wrapped_native().await?;
        let router = self.config.contracts.router;

        if self.ledger.is_native(input_token) {
            let output = erc20_address(output_token)?;
            let path = SwapPath::between(weth, output, weth);
            self.input_swap(
                "swapExactETHForTokens(uint256,address[],address,uint256)",
                input_amount,
                &path,
                slippage,
                recipient,
                options,
                true,
            )
            .await
        } else if self.ledger.is_native(output_token) {
            let input = erc20_address(input_token)?;
            let path = SwapPath::between(input, weth, weth);
            approve_erc20(self.ledger, input, router, input_amount).await?;
            self.input_swap(
                "swapExactTokensForETH(uint256,uint256,address[],address,uint256)",
                input_amount,
                &path,
                slippage,
                recipient,
                options,
                false,
            )
            .await
        } else {
            let input = erc20_address(input_token)?;
            let output = erc20_address(output_token)?;
            let path = SwapPath::between(input, output, weth);
            approve_erc20(self.ledger, input, router, input_amount).await?;
            self.input_swap(
                "swapExactTokensForTokens(uint256,uint256,address[],address,uint256)",
                input_amount,
                &path,
                slippage,
                recipient,
                options,
                false,
            )
            .await
        }
    }

    /// Exact-output swap dispatch, the approval covers the maximum input the
    /// slippage tolerance allows
    pub(crate) async fn swap_output(
        &self,
        input_token: &Token,
        output_token: &Token,
        output_amount: Uint256,
        slippage: f64,
        recipient: Address,
        options: Vec<SendTxOption>,
    ) -> Result<Uint256, RouterError> {
        check_slippage(slippage)?;
        let weth = self.wrapped_native().await?;
        let router = self.config.contracts.router;

        if self.ledger.is_native(input_token) {
            let output = erc20_address(output_token)?;
            let path = SwapPath::between(weth, output, weth);
            let max_in = self.max_input_for_path(output_amount, &path, slippage).await?;
            self.submit_swap(
                "swapETHForExactTokens(uint256,address[],address,uint256)",
                SwapSide::ExactOutput,
                output_amount,
                max_in,
                &path,
                recipient,
                options,
                true,
            )
            .await
        } else if self.ledger.is_native(output_token) {
            let input = erc20_address(input_token)?;
            let path = SwapPath::between(input, weth, weth);
            let max_in = self.max_input_for_path(output_amount, &path, slippage).await?;
            approve_erc20(self.ledger, input, router, max_in).await?;
            self.submit_swap(
                "swapTokensForExactETH(uint256,uint256,address[],address,uint256)",
                SwapSide::ExactOutput,
                output_amount,
                max_in,
                &path,
                recipient,
                options,
                false,
            )
            .await
        } else {
            let input = erc20_address(input_token)?;
            let output = erc20_address(output_token)?;
            let path = SwapPath::between(input, output, weth);
            let max_in = self.max_input_for_path(output_amount, &path, slippage).await?;
            approve_erc20(self.ledger, input, router, max_in).await?;
            self.submit_swap(
                "swapTokensForExactTokens(uint256,uint256,address[],address,uint256)",
                SwapSide::ExactOutput,
                output_amount,
                max_in,
                &path,
                recipient,
                options,
                false,
            )
            .await
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn input_swap(
        &self,
        sig: &str,
        input_amount: Uint256,
        path: &SwapPath,
        slippage: f64,
        recipient: Address,
        options: Vec<SendTxOption>,
        payable: bool,
    ) -> Result<Uint256, RouterError> {
        let min_out = self.min_output_for_path(input_amount, path, slippage).await?;
        self.submit_swap(
            sig,
            SwapSide::ExactInput,
            input_amount,
            min_out,
            path,
            recipient,
            options,
            payable,
        )
        .await
    }

    /// Assembles and submits one router path-swap call
    ///
    /// `amount` is the fixed leg (input for exact-input, output for
    /// exact-output) and `required_amount` the computed counter bound
    /// (minimum output or maximum input). Payable calls carry the native
    /// input as the transaction value and drop it from the arguments.
    #[allow(clippy::too_many_arguments)]
    async fn submit_swap(
        &self,
        sig: &str,
        side: SwapSide,
        amount: Uint256,
        required_amount: Uint256,
        path: &SwapPath,
        recipient: Address,
        options: Vec<SendTxOption>,
        payable: bool,
    ) -> Result<Uint256, RouterError> {
        let deadline = tx_deadline(self.ledger).await?;
        let path_tokens: AbiToken = path.tokens().to_vec().into();

        let (args, value): (Vec<AbiToken>, Uint256) = if payable {
            match side {
                SwapSide::ExactInput => (
                    vec![
                        required_amount.into(),
                        path_tokens,
                        recipient.into(),
                        deadline.into(),
                    ],
                    amount,
                ),
                SwapSide::ExactOutput => (
                    vec![amount.into(), path_tokens, recipient.into(), deadline.into()],
                    required_amount,
                ),
            }
        } else {
            (
                vec![
                    amount.into(),
                    required_amount.into(),
                    path_tokens,
                    recipient.into(),
                    deadline.into(),
                ],
                0u8.into(),
            )
        };

        trace!("v2 {sig} args {:?}", args);
        let txid = self
            .ledger
            .submit(self.config.contracts.router, sig, &args, value, options)
            .await?;
        debug!("txid for v2 swap is {txid}");
        Ok(txid)
    }

    /// Resolves the pair contract for two tokens from the factory
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
                "getPair(address,address)",
                &[token0.into(), token1.into()],
            )
            .await?;
        if response.len() < 32 || response.iter().all(|b| *b == 0) {
            return Err(RouterError::PoolNotFound {
                token0,
                token1,
                fee: fee.value(),
            });
        }
        decode_address_word(&response, 0)
    }
}
