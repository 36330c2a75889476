//! Settlement instructions
//!
//! Each one clears a token's ledger entry in full and moves the amount
//! between the engine and the caller. An entry with the wrong sign for the
//! operation is an invariant fault; a zero entry settles without a host call.

use alloy_primitives::{Address, U256};
use packswap_common::{require_token, EngineError, TokenId};

use super::SettleBounds;
use crate::entrypoint::ExecutionContext;
use crate::host::{Host, SETTLEMENT_ACK};
use crate::receipt::{ExecutionEvent, SettlementKind};

/// Which way a settlement moves value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owed {
    /// Pool owes the caller (delta <= 0)
    ToCaller,
    /// Caller owes the pool (delta >= 0)
    ToPool,
}

/// Clear the entry for `token` and return its magnitude
fn take_balance<H: Host + ?Sized>(
    ctx: &mut ExecutionContext<'_, H>,
    token: TokenId,
    owed: Owed,
    bounds: &SettleBounds,
) -> Result<U256, EngineError> {
    require_token(token)?;
    let delta = ctx.ledger.reset_change(token);

    let wrong_sign = match owed {
        Owed::ToCaller => delta.is_positive(),
        Owed::ToPool => delta.is_negative(),
    };
    if wrong_sign {
        return Err(EngineError::WrongSettlementSign { token, delta });
    }

    let amount = delta.unsigned_abs();
    bounds.check(amount)?;
    Ok(amount)
}

fn record<H: Host + ?Sized>(
    ctx: &mut ExecutionContext<'_, H>,
    token: TokenId,
    kind: SettlementKind,
    amount: U256,
) {
    log::debug!("settle {:?} {} of {}", kind, amount, token);
    ctx.events.push(ExecutionEvent::Settled {
        token,
        kind,
        amount,
    });
}

/// Pay `recipient` everything the pool owes the caller in `token`
pub fn process_send_all<H: Host + ?Sized>(
    ctx: &mut ExecutionContext<'_, H>,
    token: TokenId,
    recipient: Address,
    bounds: SettleBounds,
) -> Result<(), EngineError> {
    let amount = take_balance(ctx, token, Owed::ToCaller, &bounds)?;
    if !amount.is_zero() {
        ctx.host
            .transfer_out(token, recipient, amount)
            .map_err(EngineError::Transfer)?;
    }
    record(ctx, token, SettlementKind::Sent { recipient }, amount);
    Ok(())
}

/// Pull everything the caller owes in `token` under its allowance
pub fn process_receive_all<H: Host + ?Sized>(
    ctx: &mut ExecutionContext<'_, H>,
    token: TokenId,
    bounds: SettleBounds,
) -> Result<(), EngineError> {
    let amount = take_balance(ctx, token, Owed::ToPool, &bounds)?;
    if !amount.is_zero() {
        let caller = ctx.caller;
        ctx.host
            .transfer_in(token, caller, amount)
            .map_err(EngineError::Transfer)?;
    }
    record(ctx, token, SettlementKind::Received, amount);
    Ok(())
}

/// Ask the caller to push everything it owes in `token`, then verify the
/// engine's balance actually grew by that much
pub fn process_receive_all_via_callback<H: Host + ?Sized>(
    ctx: &mut ExecutionContext<'_, H>,
    token: TokenId,
    bounds: SettleBounds,
) -> Result<(), EngineError> {
    let amount = take_balance(ctx, token, Owed::ToPool, &bounds)?;
    if !amount.is_zero() {
        let (caller, engine) = (ctx.caller, ctx.engine);

        let before = ctx.host.balance_of(token, engine);
        if ctx.host.request_settlement(caller, token, amount) != SETTLEMENT_ACK {
            return Err(EngineError::SettlementRefused { token });
        }
        let received = ctx.host.balance_of(token, engine).saturating_sub(before);

        if received < amount {
            return Err(EngineError::SettlementShortfall {
                token,
                expected: amount,
                received,
            });
        }
    }
    record(ctx, token, SettlementKind::ReceivedViaCallback, amount);
    Ok(())
}

/// Clear what the pool owes the caller without moving tokens. The amount is
/// reported in the receipt for delivery outside the engine.
pub fn process_mark_received<H: Host + ?Sized>(
    ctx: &mut ExecutionContext<'_, H>,
    token: TokenId,
    bounds: SettleBounds,
) -> Result<(), EngineError> {
    let amount = take_balance(ctx, token, Owed::ToCaller, &bounds)?;
    if !amount.is_zero() {
        ctx.released.push((token, amount));
    }
    record(ctx, token, SettlementKind::MarkedReceived, amount);
    Ok(())
}
