//! Add/remove liquidity instructions

use alloy_primitives::{Address, U256};
use packswap_common::{owed_to_caller, owed_to_pool, EngineError, TokenId};

use crate::entrypoint::ExecutionContext;
use crate::host::Host;
use crate::receipt::ExecutionEvent;
use crate::state::PoolKey;

/// Mint shares to `recipient`; the caller owes the required amounts
pub fn process_add_liquidity<H: Host + ?Sized>(
    ctx: &mut ExecutionContext<'_, H>,
    token0: TokenId,
    token1: TokenId,
    recipient: Address,
    max0: u128,
    max1: u128,
    min_shares: Option<u128>,
) -> Result<(), EngineError> {
    let key = PoolKey::new(token0, token1)?;
    let minted = ctx.pools.pool_mut(key)?.add_liquidity(recipient, max0, max1)?;

    if let Some(min) = min_shares {
        if minted.shares < min {
            return Err(EngineError::BoundViolation {
                amount: U256::from(minted.shares),
                min,
                max: u128::MAX,
            });
        }
    }

    ctx.ledger.account_change(token0, owed_to_pool(minted.amount0))?;
    ctx.ledger.account_change(token1, owed_to_pool(minted.amount1))?;

    log::debug!(
        "add liquidity {}/{}: {} shares to {} for ({}, {})",
        token0,
        token1,
        minted.shares,
        recipient,
        minted.amount0,
        minted.amount1
    );

    ctx.events.push(ExecutionEvent::LiquidityAdded {
        token0,
        token1,
        recipient,
        shares: minted.shares,
        amount0: minted.amount0,
        amount1: minted.amount1,
    });

    Ok(())
}

/// Burn the caller's shares; the pool owes the caller both sides.
/// `shares == None` burns the caller's whole balance.
pub fn process_remove_liquidity<H: Host + ?Sized>(
    ctx: &mut ExecutionContext<'_, H>,
    token0: TokenId,
    token1: TokenId,
    shares: Option<u128>,
) -> Result<(), EngineError> {
    let key = PoolKey::new(token0, token1)?;
    let owner = ctx.caller;

    let pool = ctx.pools.pool_mut(key)?;
    let shares = shares.unwrap_or_else(|| pool.shares_of(&owner));
    let burned = pool.remove_liquidity(owner, shares)?;

    ctx.ledger.account_change(token0, owed_to_caller(burned.amount0))?;
    ctx.ledger.account_change(token1, owed_to_caller(burned.amount1))?;

    log::debug!(
        "remove liquidity {}/{}: {} shares from {} for ({}, {})",
        token0,
        token1,
        shares,
        owner,
        burned.amount0,
        burned.amount1
    );

    ctx.events.push(ExecutionEvent::LiquidityRemoved {
        token0,
        token1,
        owner,
        shares,
        amount0: burned.amount0,
        amount1: burned.amount1,
    });

    Ok(())
}
