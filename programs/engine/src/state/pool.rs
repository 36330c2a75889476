//! Constant-product pool record

use std::collections::BTreeMap;

use alloy_primitives::Address;
use packswap_common::{
    add_reserve, require_token, sub_u128, EngineError, SwapDirection, TokenId,
};
use serde::{Deserialize, Serialize};

use crate::math::{quote_burn, quote_mint, quote_swap, BurnQuote, MintQuote, SwapQuote};
use crate::state::FeeSettings;

/// Canonical token pair: token0 < token1, neither zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    pub token0: TokenId,
    pub token1: TokenId,
}

impl PoolKey {
    /// Build a key from a pair that must already be in canonical order
    pub fn new(token0: TokenId, token1: TokenId) -> Result<Self, EngineError> {
        require_token(token0)?;
        require_token(token1)?;
        if token0 >= token1 {
            return Err(EngineError::UnsortedPair { token0, token1 });
        }
        Ok(Self { token0, token1 })
    }

    /// Build a key from two tokens in any order
    pub fn sorted(a: TokenId, b: TokenId) -> Result<Self, EngineError> {
        if a <= b {
            Self::new(a, b)
        } else {
            Self::new(b, a)
        }
    }

    /// (input token, output token) for a swap direction
    pub fn route(&self, direction: SwapDirection) -> (TokenId, TokenId) {
        match direction {
            SwapDirection::ZeroForOne => (self.token0, self.token1),
            SwapDirection::OneForZero => (self.token1, self.token0),
        }
    }
}

/// Pool reserves, liquidity shares and accrued protocol fees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub key: PoolKey,

    /// Side-0 reserve used for pricing
    pub reserve0: u128,

    /// Side-1 reserve used for pricing
    pub reserve1: u128,

    /// Outstanding liquidity shares
    pub total_shares: u128,

    /// Protocol fees accrued on side 0, claimable by the fee receiver
    pub accrued_fee0: u128,

    /// Protocol fees accrued on side 1
    pub accrued_fee1: u128,

    /// Share balance per owner
    #[serde(default)]
    shares: BTreeMap<Address, u128>,
}

impl Pool {
    /// Uninitialized pool for `key`
    pub fn new(key: PoolKey) -> Self {
        Self {
            key,
            reserve0: 0,
            reserve1: 0,
            total_shares: 0,
            accrued_fee0: 0,
            accrued_fee1: 0,
            shares: BTreeMap::new(),
        }
    }

    /// A pool is live while shares are outstanding
    pub fn is_initialized(&self) -> bool {
        self.total_shares > 0
    }

    pub fn shares_of(&self, owner: &Address) -> u128 {
        self.shares.get(owner).copied().unwrap_or(0)
    }

    /// Owners with a non-zero share balance
    pub fn owners(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.shares.iter()
    }

    /// Apply an exact-input swap
    pub fn swap(
        &mut self,
        direction: SwapDirection,
        amount_in: u128,
        fees: &FeeSettings,
    ) -> Result<SwapQuote, EngineError> {
        if !self.is_initialized() {
            return Err(EngineError::PoolNotInitialized);
        }

        let (reserve_in, reserve_out) = match direction {
            SwapDirection::ZeroForOne => (self.reserve0, self.reserve1),
            SwapDirection::OneForZero => (self.reserve1, self.reserve0),
        };

        let quote = quote_swap(
            reserve_in,
            reserve_out,
            amount_in,
            fees.swap_fee_bps,
            fees.protocol_fee_ppt,
        )?;

        match direction {
            SwapDirection::ZeroForOne => {
                let accrued = add_reserve(self.accrued_fee0, quote.protocol_fee)?;
                self.reserve0 = quote.new_reserve_in;
                self.reserve1 = quote.new_reserve_out;
                self.accrued_fee0 = accrued;
            }
            SwapDirection::OneForZero => {
                let accrued = add_reserve(self.accrued_fee1, quote.protocol_fee)?;
                self.reserve1 = quote.new_reserve_in;
                self.reserve0 = quote.new_reserve_out;
                self.accrued_fee1 = accrued;
            }
        }

        Ok(quote)
    }

    /// Mint shares to `recipient` for a deposit of at most (max0, max1)
    pub fn add_liquidity(
        &mut self,
        recipient: Address,
        max0: u128,
        max1: u128,
    ) -> Result<MintQuote, EngineError> {
        let quote = quote_mint(self.reserve0, self.reserve1, self.total_shares, max0, max1)?;

        let reserve0 = add_reserve(self.reserve0, quote.amount0)?;
        let reserve1 = add_reserve(self.reserve1, quote.amount1)?;
        let total = add_reserve(self.total_shares, quote.shares)?;
        let owned = add_reserve(self.shares_of(&recipient), quote.shares)?;

        self.reserve0 = reserve0;
        self.reserve1 = reserve1;
        self.total_shares = total;
        self.shares.insert(recipient, owned);

        Ok(quote)
    }

    /// Burn `shares` held by `owner` for a proportional slice of reserves
    pub fn remove_liquidity(
        &mut self,
        owner: Address,
        shares: u128,
    ) -> Result<BurnQuote, EngineError> {
        let available = self.shares_of(&owner);
        if available < shares {
            return Err(EngineError::InsufficientShares {
                owner,
                available,
                requested: shares,
            });
        }

        let quote = quote_burn(self.reserve0, self.reserve1, self.total_shares, shares)?;

        self.reserve0 = sub_u128(self.reserve0, quote.amount0)?;
        self.reserve1 = sub_u128(self.reserve1, quote.amount1)?;
        self.total_shares = sub_u128(self.total_shares, shares)?;

        let remaining = available - shares;
        if remaining == 0 {
            self.shares.remove(&owner);
        } else {
            self.shares.insert(owner, remaining);
        }

        Ok(quote)
    }

    /// Take all accrued protocol fees
    pub fn take_accrued_fees(&mut self) -> (u128, u128) {
        let taken = (self.accrued_fee0, self.accrued_fee1);
        self.accrued_fee0 = 0;
        self.accrued_fee1 = 0;
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    const E18: u128 = 1_000_000_000_000_000_000;

    fn key() -> PoolKey {
        PoolKey::new(Address::with_last_byte(1), Address::with_last_byte(2)).unwrap()
    }

    fn lp() -> Address {
        Address::repeat_byte(0x77)
    }

    fn fees(bps: u16) -> FeeSettings {
        FeeSettings {
            swap_fee_bps: bps,
            ..FeeSettings::default()
        }
    }

    #[test]
    fn test_key_ordering() {
        let a = Address::with_last_byte(1);
        let b = Address::with_last_byte(2);

        assert!(PoolKey::new(a, b).is_ok());
        assert_eq!(
            PoolKey::new(b, a),
            Err(EngineError::UnsortedPair { token0: b, token1: a })
        );
        assert!(PoolKey::new(a, a).is_err());
        assert_eq!(PoolKey::new(Address::ZERO, b), Err(EngineError::ZeroToken));
        assert_eq!(PoolKey::sorted(b, a).unwrap(), PoolKey::new(a, b).unwrap());
    }

    #[test]
    fn test_route() {
        let key = key();
        assert_eq!(key.route(SwapDirection::ZeroForOne), (key.token0, key.token1));
        assert_eq!(key.route(SwapDirection::OneForZero), (key.token1, key.token0));
    }

    #[test]
    fn test_first_deposit_sets_price() {
        let mut pool = Pool::new(key());
        let minted = pool.add_liquidity(lp(), 10 * E18, 10 * E18).unwrap();

        assert_eq!(minted.shares, 10 * E18);
        assert_eq!((pool.reserve0, pool.reserve1), (10 * E18, 10 * E18));
        assert_eq!(pool.total_shares, 10 * E18);
        assert_eq!(pool.shares_of(&lp()), 10 * E18);
    }

    #[test]
    fn test_swap_on_empty_pool_fails() {
        let mut pool = Pool::new(key());
        assert_eq!(
            pool.swap(SwapDirection::ZeroForOne, 1, &fees(30)),
            Err(EngineError::PoolNotInitialized)
        );
    }

    #[test]
    fn test_swap_updates_reserves_both_directions() {
        let mut pool = Pool::new(key());
        pool.add_liquidity(lp(), 10 * E18, 10 * E18).unwrap();

        let q = pool.swap(SwapDirection::ZeroForOne, E18 / 10, &fees(10)).unwrap();
        assert_eq!(pool.reserve0, 10 * E18 + E18 / 10);
        assert_eq!(pool.reserve1, 10 * E18 - q.amount_out);

        let r0 = pool.reserve0;
        let q = pool.swap(SwapDirection::OneForZero, E18 / 10, &fees(10)).unwrap();
        assert_eq!(pool.reserve0, r0 - q.amount_out);
    }

    #[test]
    fn test_protocol_fee_accrues_outside_reserves() {
        let mut pool = Pool::new(key());
        pool.add_liquidity(lp(), 1_000 * E18, 1_000 * E18).unwrap();

        let settings = FeeSettings {
            swap_fee_bps: 30,
            protocol_fee_ppt: 50,
            fee_receiver: Address::repeat_byte(0xfe),
        };
        pool.swap(SwapDirection::OneForZero, 20 * E18, &settings).unwrap();

        assert_eq!(pool.accrued_fee1, E18);
        assert_eq!(pool.accrued_fee0, 0);
        assert_eq!(pool.reserve1, 1_019 * E18);

        assert_eq!(pool.take_accrued_fees(), (0, E18));
        assert_eq!(pool.take_accrued_fees(), (0, 0));
    }

    #[test]
    fn test_remove_requires_shares() {
        let mut pool = Pool::new(key());
        pool.add_liquidity(lp(), 100, 100).unwrap();

        let stranger = Address::repeat_byte(0x99);
        assert_eq!(
            pool.remove_liquidity(stranger, 1),
            Err(EngineError::InsufficientShares {
                owner: stranger,
                available: 0,
                requested: 1,
            })
        );
    }

    #[test]
    fn test_full_withdrawal_drains_pool() {
        let mut pool = Pool::new(key());
        pool.add_liquidity(lp(), 5 * E18, 20 * E18).unwrap();

        let shares = pool.shares_of(&lp());
        let out = pool.remove_liquidity(lp(), shares).unwrap();

        assert_eq!((out.amount0, out.amount1), (5 * E18, 20 * E18));
        assert!(!pool.is_initialized());
        assert_eq!((pool.reserve0, pool.reserve1), (0, 0));
        assert_eq!(pool.owners().count(), 0);

        // A drained pool can be seeded again at a new price
        let minted = pool.add_liquidity(lp(), 1, 100).unwrap();
        assert_eq!(minted.shares, 10);
    }

    #[test]
    fn test_fees_grow_share_value() {
        let mut pool = Pool::new(key());
        pool.add_liquidity(lp(), 1_000 * E18, 1_000 * E18).unwrap();

        for _ in 0..10 {
            let q = pool.swap(SwapDirection::ZeroForOne, 10 * E18, &fees(30)).unwrap();
            pool.swap(SwapDirection::OneForZero, q.amount_out, &fees(30)).unwrap();
        }

        let k_after = U256::from(pool.reserve0) * U256::from(pool.reserve1);
        let k_before = U256::from(1_000 * E18) * U256::from(1_000 * E18);
        assert!(k_after > k_before);
    }

    #[test]
    fn test_second_depositor_pays_current_price() {
        let mut pool = Pool::new(key());
        pool.add_liquidity(lp(), 100, 400).unwrap();

        let other = Address::repeat_byte(0x55);
        let minted = pool.add_liquidity(other, 50, 50).unwrap();

        // Side 1 binds: 50 * 200 / 400 = 25 shares, needs 13 (ceil 12.5) of side 0
        assert_eq!(minted.shares, 25);
        assert_eq!(minted.amount0, 13);
        assert_eq!(minted.amount1, 50);
        assert_eq!(pool.shares_of(&other), 25);
        assert_eq!(pool.total_shares, 225);
    }
}
