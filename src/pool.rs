//! Read-only access to v3 pool contracts
//!
//! A pool handle is just its address, everything here is a pure decode of
//! contract reads. Nothing is cached: callers get the state of the latest
//! confirmed block at call time.

use crate::error::RouterError;
use crate::ledger::{
    decode_address_word, decode_int24_word, decode_uint_word, response_word, Ledger,
};
use crate::types::{PoolData, PoolState};
use clarity::{Address, Uint256};
use futures::try_join;

async fn read_address<L: Ledger + ?Sized>(
    ledger: &L,
    pool: Address,
    sig: &str,
) -> Result<Address, RouterError> {
    let response = ledger.read_call(pool, sig, &[]).await?;
    decode_address_word(&response, 0)
}

async fn read_uint<L: Ledger + ?Sized>(
    ledger: &L,
    pool: Address,
    sig: &str,
) -> Result<Uint256, RouterError> {
    let response = ledger.read_call(pool, sig, &[]).await?;
    decode_uint_word(&response, 0)
}

async fn read_int24<L: Ledger + ?Sized>(
    ledger: &L,
    pool: Address,
    sig: &str,
) -> Result<i32, RouterError> {
    let response = ledger.read_call(pool, sig, &[]).await?;
    decode_int24_word(&response, 0)
}

/// Fetches the static metadata of a pool
///
/// These values are fixed at pool creation so the six reads are issued
/// concurrently.
pub async fn get_pool_data<L: Ledger + ?Sized>(
    ledger: &L,
    pool: Address,
) -> Result<PoolData, RouterError> {
    let (factory, token0, token1, fee, tick_spacing, max_liquidity_per_tick) = try_join!(
        read_address(ledger, pool, "factory()"),
        read_address(ledger, pool, "token0()"),
        read_address(ledger, pool, "token1()"),
        read_uint(ledger, pool, "fee()"),
        read_int24(ledger, pool, "tickSpacing()"),
        read_uint(ledger, pool, "maxLiquidityPerTick()"),
    )?;

    let fee = fee.to_string().parse::<u32>().map_err(|_| {
        RouterError::BadResponse(format!("pool {pool} reported a fee beyond uint24: {fee}"))
    })?;

    Ok(PoolData {
        factory,
        token0,
        token1,
        fee,
        tick_spacing,
        max_liquidity_per_tick,
    })
}

/// Fetches the live state of a pool: its liquidity plus the decoded slot0
///
/// slot0 packs, in order: sqrtPriceX96 (uint160), tick (int24),
/// observationIndex (uint16), observationCardinality (uint16),
/// observationCardinalityNext (uint16), feeProtocol (uint8),
/// unlocked (bool).
pub async fn get_pool_state<L: Ledger + ?Sized>(
    ledger: &L,
    pool: Address,
) -> Result<PoolState, RouterError> {
    let (liquidity, slot0) = try_join!(
        read_uint(ledger, pool, "liquidity()"),
        read_slot0(ledger, pool),
    )?;

    let sqrt_price_x96 = {
        let word = response_word(&slot0, 0)?;
        Uint256::from_be_bytes(&word[12..32])
    };
    let tick = decode_int24_word(&slot0, 1)?;
    let observation_index = decode_u16(&slot0, 2)?;
    let observation_cardinality = decode_u16(&slot0, 3)?;
    let observation_cardinality_next = decode_u16(&slot0, 4)?;
    let fee_protocol = response_word(&slot0, 5)?[31];
    let unlocked = response_word(&slot0, 6)?[31] != 0;

    Ok(PoolState {
        liquidity,
        sqrt_price_x96,
        tick,
        observation_index,
        observation_cardinality,
        observation_cardinality_next,
        fee_protocol,
        unlocked,
    })
}

async fn read_slot0<L: Ledger + ?Sized>(
    ledger: &L,
    pool: Address,
) -> Result<Vec<u8>, RouterError> {
    let slot0 = ledger.read_call(pool, "slot0()", &[]).await?;
    trace!("slot0 response: {:X?}", slot0);
    if slot0.len() < 7 * 32 {
        return Err(RouterError::BadResponse(format!(
            "slot0 response too short: {} bytes",
            slot0.len()
        )));
    }
    Ok(slot0)
}

fn decode_u16(buf: &[u8], index: usize) -> Result<u16, RouterError> {
    let word = response_word(buf, index)?;
    Ok(u16::from_be_bytes([word[30], word[31]]))
}
