//! Pool fee tiers and the tick / sqrt price math that depends on them
//!
//! Fee values are given in hundredths of basis points the way the pool
//! contracts store them, so 3000 is a 0.3% pool.

use crate::error::RouterError;
use clarity::Uint256;

/// The lowest tick a pool can represent
pub const MIN_TICK: i32 = -887272;
/// The highest tick a pool can represent
pub const MAX_TICK: i32 = 887272;

/// The supported pool fee tiers
///
/// Each tier fixes the tick spacing of its pools. Any raw fee value outside
/// this set is rejected by [`FeeTier::from_value`] before a single network
/// call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeTier {
    /// 0.05%, for stable pairs
    Low,
    /// 0.3%, the default for most pairs
    Medium,
    /// 1%, for exotic pairs
    High,
}

/// The fee tier used when a caller does not care, 0.3%
pub const DEFAULT_FEE: FeeTier = FeeTier::Medium;

impl FeeTier {
    /// Validates a raw on-chain fee value against the supported set
    pub fn from_value(fee: u32) -> Result<Self, RouterError> {
        match fee {
            500 => Ok(FeeTier::Low),
            3000 => Ok(FeeTier::Medium),
            10000 => Ok(FeeTier::High),
            _ => Err(RouterError::UnsupportedFee(fee)),
        }
    }

    /// The raw fee value in hundredths of basis points
    pub fn value(self) -> u32 {
        match self {
            FeeTier::Low => 500,
            FeeTier::Medium => 3000,
            FeeTier::High => 10000,
        }
    }

    /// The tick spacing every pool of this tier uses
    pub fn tick_spacing(self) -> i32 {
        match self {
            FeeTier::Low => 10,
            FeeTier::Medium => 60,
            FeeTier::High => 200,
        }
    }
}

/// A liquidity position's tick bounds, both multiples of the tick spacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickRange {
    pub lower: i32,
    pub upper: i32,
}

/// Computes the widest usable tick range for a fee tier
///
/// The global bounds are rounded toward zero to the nearest multiple of the
/// tier's tick spacing so the range stays representable by the pool.
pub fn full_tick_range(fee: FeeTier) -> TickRange {
    let spacing = fee.tick_spacing();
    TickRange {
        lower: -(-MIN_TICK / spacing) * spacing,
        upper: (MAX_TICK / spacing) * spacing,
    }
}

/// Scales an amount by a float factor, truncating the result
///
/// Used for slippage adjustment of raw quotes: (1 - slippage) for minimum
/// outputs and (1 + slippage) for maximum inputs. A factor of exactly 1
/// returns the amount untouched so zero-slippage quotes stay exact.
pub(crate) fn scale_amount(amount: Uint256, factor: f64) -> Uint256 {
    if factor == 1.0 {
        return amount;
    }
    let raw = amount.to_string().parse::<f64>().unwrap();
    let scaled = (raw * factor).floor();
    scaled.to_string().parse::<Uint256>().unwrap()
}

/// Rejects slippage values outside [0, 1)
pub(crate) fn check_slippage(slippage: f64) -> Result<(), RouterError> {
    if !(0.0..1.0).contains(&slippage) {
        return Err(RouterError::BadInput(format!(
            "slippage must be a fraction in [0, 1), got {slippage}"
        )));
    }
    Ok(())
}

/// Computes the initial Q64.96 sqrt price for a pool from the desired
/// amounts of its two tokens
///
/// This is sqrt((amount1 << 192) / amount0) with integer truncation
/// throughout, matching what the pool contract expects from initialize()
pub fn initial_sqrt_price_x96(amount0: Uint256, amount1: Uint256) -> Uint256 {
    let numerator: Uint256 = amount1 << 192u8.into();
    let ratio_x192 = numerator / amount0;
    Uint256::sqrt(&ratio_x192)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_tier_values() {
        assert_eq!(FeeTier::from_value(500).unwrap(), FeeTier::Low);
        assert_eq!(FeeTier::from_value(3000).unwrap(), FeeTier::Medium);
        assert_eq!(FeeTier::from_value(10000).unwrap(), FeeTier::High);
        for tier in [FeeTier::Low, FeeTier::Medium, FeeTier::High] {
            assert_eq!(FeeTier::from_value(tier.value()).unwrap(), tier);
        }
    }

    #[test]
    fn test_unsupported_fees_rejected() {
        for fee in [0, 1, 100, 499, 501, 2999, 3001, 9999, 10001, 1_000_000] {
            match FeeTier::from_value(fee) {
                Err(RouterError::UnsupportedFee(value)) => assert_eq!(value, fee),
                other => panic!("expected UnsupportedFee for {fee}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_tick_spacing_per_tier() {
        assert_eq!(FeeTier::Low.tick_spacing(), 10);
        assert_eq!(FeeTier::Medium.tick_spacing(), 60);
        assert_eq!(FeeTier::High.tick_spacing(), 200);
    }

    #[test]
    fn test_full_tick_range_invariants() {
        for tier in [FeeTier::Low, FeeTier::Medium, FeeTier::High] {
            let spacing = tier.tick_spacing();
            let range = full_tick_range(tier);
            assert!(range.lower <= 0);
            assert!(range.upper >= 0);
            assert!(range.lower <= range.upper);
            assert_eq!(range.lower % spacing, 0);
            assert_eq!(range.upper % spacing, 0);
            assert!(range.lower >= MIN_TICK);
            assert!(range.upper <= MAX_TICK);
            // rounding toward zero never moves by more than one spacing
            assert!(MIN_TICK - range.lower > -spacing);
            assert!(MAX_TICK - range.upper < spacing);
        }
    }

    #[test]
    fn test_full_tick_range_medium() {
        // 887272 rounded down to a multiple of 60
        let range = full_tick_range(FeeTier::Medium);
        assert_eq!(range.lower, -887220);
        assert_eq!(range.upper, 887220);
    }

    #[test]
    fn test_scale_amount_floor() {
        let amount: Uint256 = 1_000_000u64.into();
        assert_eq!(scale_amount(amount, 0.999), 999_000u64.into());
        assert_eq!(scale_amount(amount, 1.001), 1_001_000u64.into());
        // truncation, not rounding
        let odd: Uint256 = 3u8.into();
        assert_eq!(scale_amount(odd, 0.5), 1u8.into());
        // a factor of exactly one is the identity, bit for bit
        let huge = Uint256::from_be_bytes(&[0xffu8; 32]);
        assert_eq!(scale_amount(huge, 1.0), huge);
    }

    #[test]
    fn test_check_slippage_bounds() {
        assert!(check_slippage(0.0).is_ok());
        assert!(check_slippage(0.005).is_ok());
        assert!(check_slippage(0.999).is_ok());
        assert!(check_slippage(1.0).is_err());
        assert!(check_slippage(-0.1).is_err());
    }

    #[test]
    fn test_initial_sqrt_price() {
        // equal amounts price at exactly 2^96
        let one: Uint256 = 1u8.into();
        let tt96: Uint256 = one << 96u8.into();
        assert_eq!(initial_sqrt_price_x96(1u8.into(), 1u8.into()), tt96);
        // four token1 per token0 doubles the sqrt price
        assert_eq!(
            initial_sqrt_price_x96(1u8.into(), 4u8.into()),
            tt96 * 2u8.into()
        );
        // truncation: sqrt(2) * 2^96 rounded down
        let sqrt2 = initial_sqrt_price_x96(1u8.into(), 2u8.into());
        assert!(sqrt2 > tt96);
        assert!(sqrt2 < tt96 * 2u8.into());
    }
}
