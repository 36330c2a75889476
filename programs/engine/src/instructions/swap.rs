//! Swap instruction

use packswap_common::{owed_to_caller, owed_to_pool, to_u128, EngineError, SwapDirection, TokenId};

use super::SwapAmount;
use crate::entrypoint::ExecutionContext;
use crate::host::Host;
use crate::receipt::ExecutionEvent;
use crate::state::PoolKey;

/// Exact-input swap against the (token0, token1) pool
///
/// The caller owes the full input and is owed the output. With
/// [`SwapAmount::FromLedger`] the input is what the pool already owes the
/// caller in the input token, which chains hops without settling in between.
pub fn process_swap<H: Host + ?Sized>(
    ctx: &mut ExecutionContext<'_, H>,
    token0: TokenId,
    token1: TokenId,
    zero_for_one: bool,
    amount: SwapAmount,
) -> Result<(), EngineError> {
    let key = PoolKey::new(token0, token1)?;
    let direction = SwapDirection::from_flag(zero_for_one);
    let (token_in, token_out) = key.route(direction);

    let amount_in = match amount {
        SwapAmount::Exact(amount) => amount,
        SwapAmount::FromLedger => {
            let delta = ctx.ledger.get_change(token_in);
            if !delta.is_negative() {
                return Err(EngineError::WrongSettlementSign {
                    token: token_in,
                    delta,
                });
            }
            to_u128(delta.unsigned_abs())?
        }
    };

    let fees = ctx.fees;
    let quote = ctx.pools.pool_mut(key)?.swap(direction, amount_in, &fees)?;

    ctx.ledger.account_change(token_in, owed_to_pool(quote.amount_in))?;
    ctx.ledger.account_change(token_out, owed_to_caller(quote.amount_out))?;

    log::debug!(
        "swap {} {} -> {} {} (protocol fee {})",
        quote.amount_in,
        token_in,
        quote.amount_out,
        token_out,
        quote.protocol_fee
    );

    ctx.events.push(ExecutionEvent::Swap {
        token_in,
        token_out,
        amount_in: quote.amount_in,
        amount_out: quote.amount_out,
        protocol_fee: quote.protocol_fee,
    });

    Ok(())
}
