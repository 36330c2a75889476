//! Claim accrued protocol fees

use packswap_common::{owed_to_caller, EngineError, TokenId};

use crate::entrypoint::ExecutionContext;
use crate::host::Host;
use crate::receipt::ExecutionEvent;
use crate::state::PoolKey;

/// Move a pool's accrued protocol fees to the ledger as owed to the caller.
/// Only the configured fee receiver may claim.
pub fn process_claim_fees<H: Host + ?Sized>(
    ctx: &mut ExecutionContext<'_, H>,
    token0: TokenId,
    token1: TokenId,
) -> Result<(), EngineError> {
    if ctx.caller != ctx.fees.fee_receiver {
        return Err(EngineError::Unauthorized(ctx.caller));
    }

    let key = PoolKey::new(token0, token1)?;
    let (amount0, amount1) = ctx.pools.pool_mut(key)?.take_accrued_fees();

    ctx.ledger.account_change(token0, owed_to_caller(amount0))?;
    ctx.ledger.account_change(token1, owed_to_caller(amount1))?;

    log::debug!("claim fees {}/{}: ({}, {})", token0, token1, amount0, amount1);
    ctx.events.push(ExecutionEvent::FeesClaimed {
        token0,
        token1,
        amount0,
        amount1,
    });
    Ok(())
}
