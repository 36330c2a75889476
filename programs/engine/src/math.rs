//! Constant product AMM math (x·y=k)
//!
//! All intermediate products are computed in 256 bits; reserves, shares and
//! amounts are 128-bit and any result that does not fit is rejected. Every
//! rounding step favors the pool.

use alloy_primitives::U256;
use packswap_common::{
    add_reserve, div_ceil, isqrt, mul_div_ceil, mul_div_floor, to_u128, EngineError, BPS_SCALE,
    PPT_SCALE,
};

/// Swap quote with updated reserves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapQuote {
    /// Full input charged to the caller
    pub amount_in: u128,

    /// Output paid to the caller
    pub amount_out: u128,

    /// Part of the input skimmed to the protocol (never enters reserves)
    pub protocol_fee: u128,

    /// New input-side reserve
    pub new_reserve_in: u128,

    /// New output-side reserve
    pub new_reserve_out: u128,
}

/// Calculate an exact-input swap
///
/// With protocol skim and LP fee on input:
/// - skim = Δin * ppt / 1000
/// - Δnet = Δin - skim
/// - Δeff = Δnet * (10000 - fee) / 10000
/// - x1 = x0 + Δnet
/// - y1 = ceil(x0·y0 / (x0 + Δeff))
/// - Δout = y0 - y1
///
/// The LP fee (Δnet - Δeff) stays in the input reserve.
pub fn quote_swap(
    reserve_in: u128,
    reserve_out: u128,
    amount_in: u128,
    fee_bps: u16,
    protocol_fee_ppt: u16,
) -> Result<SwapQuote, EngineError> {
    // Validate inputs
    if reserve_in == 0 || reserve_out == 0 {
        return Err(EngineError::PoolNotInitialized);
    }
    if amount_in == 0 {
        return Err(EngineError::ZeroAmount);
    }
    if fee_bps as u128 >= BPS_SCALE || protocol_fee_ppt as u128 >= PPT_SCALE {
        return Err(EngineError::InvalidFeeSettings("fee out of range"));
    }

    let protocol_fee = to_u128(mul_div_floor(amount_in, protocol_fee_ppt as u128, PPT_SCALE)?)?;
    let net_in = amount_in - protocol_fee;

    let effective_in = mul_div_floor(net_in, BPS_SCALE - fee_bps as u128, BPS_SCALE)?;

    let new_reserve_in = add_reserve(reserve_in, net_in)?;

    // y1 = ceil(k / (x0 + Δeff)), rounded up so the output rounds down
    let k = U256::from(reserve_in) * U256::from(reserve_out);
    let denominator = U256::from(reserve_in) + effective_in;
    let new_reserve_out = to_u128(div_ceil(k, denominator)?)?;

    // x0 + Δeff >= x0, so y1 <= y0
    let amount_out = reserve_out - new_reserve_out;

    Ok(SwapQuote {
        amount_in,
        amount_out,
        protocol_fee,
        new_reserve_in,
        new_reserve_out,
    })
}

/// Liquidity mint quote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintQuote {
    pub shares: u128,
    pub amount0: u128,
    pub amount1: u128,
}

/// Calculate shares minted for a deposit of at most (max0, max1)
///
/// Empty pool: both maxima are taken and shares = sqrt(max0 · max1), which
/// sets the initial price.
///
/// Existing pool: shares = min(max0·T/r0, max1·T/r1) is the largest amount
/// whose required deposit, ceil(shares·r/T) per side, fits under both maxima.
/// The non-binding side is charged only what the price requires.
pub fn quote_mint(
    reserve0: u128,
    reserve1: u128,
    total_shares: u128,
    max0: u128,
    max1: u128,
) -> Result<MintQuote, EngineError> {
    if max0 == 0 || max1 == 0 {
        return Err(EngineError::ZeroAmount);
    }

    if total_shares == 0 {
        // sqrt of a product of two u128 always fits in u128
        let shares = to_u128(isqrt(U256::from(max0) * U256::from(max1)))?;
        if shares == 0 {
            return Err(EngineError::InsufficientLiquidityMinted);
        }
        return Ok(MintQuote {
            shares,
            amount0: max0,
            amount1: max1,
        });
    }

    if reserve0 == 0 || reserve1 == 0 {
        return Err(EngineError::PoolNotInitialized);
    }

    let by0 = mul_div_floor(max0, total_shares, reserve0)?;
    let by1 = mul_div_floor(max1, total_shares, reserve1)?;
    let shares = to_u128(by0.min(by1))?;
    if shares == 0 {
        return Err(EngineError::InsufficientLiquidityMinted);
    }

    let amount0 = to_u128(mul_div_ceil(shares, reserve0, total_shares)?)?;
    let amount1 = to_u128(mul_div_ceil(shares, reserve1, total_shares)?)?;

    Ok(MintQuote {
        shares,
        amount0,
        amount1,
    })
}

/// Liquidity burn quote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurnQuote {
    pub amount0: u128,
    pub amount1: u128,
}

/// Calculate the reserves released by burning `shares`: floor(shares · r / T)
pub fn quote_burn(
    reserve0: u128,
    reserve1: u128,
    total_shares: u128,
    shares: u128,
) -> Result<BurnQuote, EngineError> {
    if shares == 0 {
        return Err(EngineError::ZeroAmount);
    }
    if total_shares == 0 {
        return Err(EngineError::PoolNotInitialized);
    }
    if shares > total_shares {
        return Err(EngineError::Overflow);
    }

    let amount0 = to_u128(mul_div_floor(shares, reserve0, total_shares)?)?;
    let amount1 = to_u128(mul_div_floor(shares, reserve1, total_shares)?)?;

    Ok(BurnQuote { amount0, amount1 })
}
