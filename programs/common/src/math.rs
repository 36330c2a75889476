//! Checked arithmetic helpers - no wrapping, no panics

use alloy_primitives::{I256, U256};

use crate::error::EngineError;

/// floor(a * b / d) computed in 256 bits
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Result<U256, EngineError> {
    if d == 0 {
        return Err(EngineError::PoolNotInitialized);
    }
    // a, b < 2^128, so the product always fits
    let product = U256::from(a) * U256::from(b);
    Ok(product / U256::from(d))
}

/// ceil(a * b / d) computed in 256 bits
pub fn mul_div_ceil(a: u128, b: u128, d: u128) -> Result<U256, EngineError> {
    if d == 0 {
        return Err(EngineError::PoolNotInitialized);
    }
    let product = U256::from(a) * U256::from(b);
    let d = U256::from(d);
    let q = product / d;
    if product % d == U256::ZERO {
        Ok(q)
    } else {
        Ok(q + U256::from(1u8))
    }
}

/// ceil(n / d)
pub fn div_ceil(n: U256, d: U256) -> Result<U256, EngineError> {
    if d == U256::ZERO {
        return Err(EngineError::PoolNotInitialized);
    }
    let q = n / d;
    if n % d == U256::ZERO {
        Ok(q)
    } else {
        Ok(q + U256::from(1u8))
    }
}

/// Narrow a 256-bit value into a u128 reserve/amount
pub fn to_u128(value: U256) -> Result<u128, EngineError> {
    u128::try_from(value).map_err(|_| EngineError::ReserveOverflow)
}

/// Checked u128 addition that reports reserve overflow
pub fn add_reserve(a: u128, b: u128) -> Result<u128, EngineError> {
    a.checked_add(b).ok_or(EngineError::ReserveOverflow)
}

/// Checked u128 subtraction
pub fn sub_u128(a: u128, b: u128) -> Result<u128, EngineError> {
    a.checked_sub(b).ok_or(EngineError::Overflow)
}

/// Integer square root, floor(sqrt(n)) (Newton's method)
pub fn isqrt(n: U256) -> U256 {
    let one = U256::from(1u8);
    // The seed below equals n at n = 2, which would skip the iteration
    if n < U256::from(4u8) {
        return if n.is_zero() { n } else { one };
    }
    let mut x = n;
    // n / 2 + 1 instead of (n + 1) / 2 to avoid overflow at U256::MAX
    let mut y = (n >> 1) + one;
    while y < x {
        x = y;
        y = (x + n / x) >> 1;
    }
    x
}

/// Delta for an amount the caller owes the pool
#[inline]
pub fn owed_to_pool(amount: u128) -> I256 {
    // amount < 2^128 so the sign bit is clear
    I256::from_raw(U256::from(amount))
}

/// Delta for an amount the pool owes the caller
#[inline]
pub fn owed_to_caller(amount: u128) -> I256 {
    -owed_to_pool(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div_floor(10, 10, 3).unwrap(), U256::from(33u8));
        assert_eq!(mul_div_ceil(10, 10, 3).unwrap(), U256::from(34u8));
        assert_eq!(mul_div_ceil(10, 9, 3).unwrap(), U256::from(30u8));
    }

    #[test]
    fn test_mul_div_by_zero() {
        assert_eq!(mul_div_floor(1, 1, 0), Err(EngineError::PoolNotInitialized));
        assert_eq!(mul_div_ceil(1, 1, 0), Err(EngineError::PoolNotInitialized));
    }

    #[test]
    fn test_mul_div_full_width() {
        let r = mul_div_floor(u128::MAX, u128::MAX, u128::MAX).unwrap();
        assert_eq!(r, U256::from(u128::MAX));
    }

    #[test]
    fn test_to_u128() {
        assert_eq!(to_u128(U256::from(7u8)).unwrap(), 7);
        let too_big = U256::from(u128::MAX) + U256::from(1u8);
        assert_eq!(to_u128(too_big), Err(EngineError::ReserveOverflow));
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(U256::ZERO), U256::ZERO);
        assert_eq!(isqrt(U256::from(1u8)), U256::from(1u8));
        assert_eq!(isqrt(U256::from(2u8)), U256::from(1u8));
        assert_eq!(isqrt(U256::from(3u8)), U256::from(1u8));
        assert_eq!(isqrt(U256::from(4u8)), U256::from(2u8));
        assert_eq!(isqrt(U256::from(8u8)), U256::from(2u8));
        assert_eq!(isqrt(U256::from(9u8)), U256::from(3u8));
        assert_eq!(isqrt(U256::from(99u8)), U256::from(9u8));
        assert_eq!(isqrt(U256::from(1_000_000u32)), U256::from(1000u32));
        assert_eq!(isqrt(U256::MAX), U256::from(u128::MAX));
    }

    #[test]
    fn test_delta_signs() {
        assert!(owed_to_pool(5).is_positive());
        assert!(owed_to_caller(5).is_negative());
        assert_eq!(owed_to_pool(5) + owed_to_caller(5), I256::ZERO);
        assert_eq!(owed_to_caller(u128::MAX).unsigned_abs(), U256::from(u128::MAX));
    }
}
