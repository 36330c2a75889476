//! Permit instruction

use packswap_common::{require_token, EngineError, TokenId};

use crate::entrypoint::ExecutionContext;
use crate::host::{Host, PermitSignature};
use crate::receipt::ExecutionEvent;

/// Forward a signed allowance for the caller to the host. Consumes no value.
pub fn process_permit<H: Host + ?Sized>(
    ctx: &mut ExecutionContext<'_, H>,
    token: TokenId,
    amount: u128,
    deadline: u64,
    signature: &PermitSignature,
) -> Result<(), EngineError> {
    require_token(token)?;
    let owner = ctx.caller;
    ctx.host
        .grant_permit(owner, token, amount, deadline, signature)
        .map_err(EngineError::Permit)?;

    log::debug!("permit {} of {} from {} until {}", amount, token, owner, deadline);
    ctx.events.push(ExecutionEvent::PermitGranted {
        token,
        amount,
        deadline,
    });
    Ok(())
}
