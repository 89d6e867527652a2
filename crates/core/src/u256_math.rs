//! U256 helpers for collateral valuation.
//!
//! Comet reports prices and values with 8 decimals and factors with 18.
//! Amounts stay in U256 throughout; f64 is only produced for thresholds
//! and logging.

use alloy::primitives::U256;

/// WAD constant: 1e18, the scale of Comet factors
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

/// Oracle price decimals (8)
pub const PRICE_DECIMALS: u8 = 8;

const PRICE_SCALE: f64 = 1e8;

/// Power of 10 as U256.
#[inline(always)]
pub fn pow10(exp: u8) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// Decimals encoded by a Comet `scale` (`10^decimals`). `None` unless the
/// scale is an exact power of ten.
pub fn decimals_from_scale(scale: u64) -> Option<u8> {
    if scale == 0 {
        return None;
    }
    let mut rest = scale;
    let mut decimals = 0u8;
    while rest % 10 == 0 {
        rest /= 10;
        decimals += 1;
    }
    (rest == 1).then_some(decimals)
}

/// `a * b / denominator`, saturating on overflow. Zero denominator gives zero.
#[inline(always)]
pub fn mul_div(a: U256, b: U256, denominator: U256) -> U256 {
    if denominator.is_zero() {
        return U256::ZERO;
    }
    a.saturating_mul(b) / denominator
}

/// Portion of `value` not retained by the protocol under a 1e18-scaled factor:
/// `value * (1 - factor)`.
#[inline(always)]
pub fn discount_by_factor(value: U256, factor_wad: u64) -> U256 {
    let complement = WAD.saturating_sub(U256::from(factor_wad));
    mul_div(value, complement, WAD)
}

/// 8-decimal USD value of `amount` tokens with `decimals` at an 8-decimal
/// `price`.
#[inline(always)]
pub fn token_value_usd8(amount: U256, price: U256, decimals: u8) -> U256 {
    mul_div(amount, price, pow10(decimals))
}

/// Convert an 8-decimal USD amount to f64.
/// Use only for thresholds and logging, not for computation.
pub fn usd8_to_f64(value: U256) -> f64 {
    const LIMB: f64 = 18_446_744_073_709_551_616.0; // 2^64
    let whole = value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, &limb| acc * LIMB + limb as f64);
    whole / PRICE_SCALE
}
