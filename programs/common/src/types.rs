//! Core identifiers and scales

use alloy_primitives::Address;

use crate::error::EngineError;

/// Token identifier (20-byte address). The zero address is never a token.
pub type TokenId = Address;

/// Width of a token identifier field in a program
pub const TOKEN_ID_LEN: usize = 20;

/// Basis points scale (10,000 bps = 100%)
pub const BPS_SCALE: u128 = 10_000;

/// Protocol fee scale (parts per thousand)
pub const PPT_SCALE: u128 = 1_000;

/// Which reserve a swap takes its input from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapDirection {
    /// Pay token0, receive token1
    ZeroForOne,
    /// Pay token1, receive token0
    OneForZero,
}

impl SwapDirection {
    pub fn from_flag(zero_for_one: bool) -> Self {
        if zero_for_one {
            SwapDirection::ZeroForOne
        } else {
            SwapDirection::OneForZero
        }
    }

    pub fn is_zero_for_one(self) -> bool {
        matches!(self, SwapDirection::ZeroForOne)
    }
}

/// Reject the zero sentinel
#[inline]
pub fn require_token(token: TokenId) -> Result<TokenId, EngineError> {
    if token == Address::ZERO {
        return Err(EngineError::ZeroToken);
    }
    Ok(token)
}
