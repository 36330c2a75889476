//! Deposit and withdraw instructions

use alloy_primitives::{Address, U256};
use packswap_common::{owed_to_caller, owed_to_pool, require_token, EngineError, TokenId};

use crate::entrypoint::ExecutionContext;
use crate::host::Host;
use crate::receipt::ExecutionEvent;

/// Pull `amount` from the caller and credit it on the ledger
pub fn process_deposit<H: Host + ?Sized>(
    ctx: &mut ExecutionContext<'_, H>,
    token: TokenId,
    amount: u128,
) -> Result<(), EngineError> {
    require_token(token)?;
    if amount == 0 {
        return Ok(());
    }

    let caller = ctx.caller;
    ctx.host
        .transfer_in(token, caller, U256::from(amount))
        .map_err(EngineError::Transfer)?;
    ctx.ledger.account_change(token, owed_to_caller(amount))?;

    log::debug!("deposit {} of {} from {}", amount, token, caller);
    ctx.events.push(ExecutionEvent::Deposited { token, amount });
    Ok(())
}

/// Pay `amount` to `recipient` and debit the caller on the ledger
pub fn process_withdraw<H: Host + ?Sized>(
    ctx: &mut ExecutionContext<'_, H>,
    token: TokenId,
    recipient: Address,
    amount: u128,
) -> Result<(), EngineError> {
    require_token(token)?;
    if amount == 0 {
        return Ok(());
    }

    ctx.host
        .transfer_out(token, recipient, U256::from(amount))
        .map_err(EngineError::Transfer)?;
    ctx.ledger.account_change(token, owed_to_pool(amount))?;

    log::debug!("withdraw {} of {} to {}", amount, token, recipient);
    ctx.events.push(ExecutionEvent::Withdrawn {
        token,
        recipient,
        amount,
    });
    Ok(())
}
