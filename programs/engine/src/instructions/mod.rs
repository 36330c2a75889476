//! Program operations and their handlers

pub mod claim_fees;
pub mod codec;
pub mod liquidity;
pub mod permit;
pub mod settle;
pub mod swap;
pub mod transfer;

pub use claim_fees::*;
pub use codec::*;
pub use liquidity::*;
pub use permit::*;
pub use settle::*;
pub use swap::*;
pub use transfer::*;

use alloy_primitives::{Address, U256};
use packswap_common::{EngineError, TokenId};
use serde::{Deserialize, Serialize};

use crate::entrypoint::ExecutionContext;
use crate::host::{Host, PermitSignature};

/// Operation kind, the high nibble of an opcode byte
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// Exact-input swap against one pool
    Swap = 0x0,
    /// Deposit both sides for liquidity shares
    AddLiquidity = 0x1,
    /// Burn liquidity shares
    RemoveLiquidity = 0x2,
    /// Pay out everything the pool owes the caller in a token
    SendAll = 0x3,
    /// Pull everything the caller owes in a token
    ReceiveAll = 0x4,
    /// Ask the caller to push everything it owes in a token
    ReceiveAllViaCallback = 0x5,
    /// Clear an amount owed to the caller, delivered outside the engine
    MarkReceived = 0x6,
    /// Pull tokens in and credit the caller
    Deposit = 0x7,
    /// Push tokens out and debit the caller
    Withdraw = 0x8,
    /// Grant the engine an allowance by signature
    Permit = 0x9,
    /// Fee receiver collects accrued protocol fees
    ClaimFees = 0xA,
}

impl TryFrom<u8> for OpKind {
    type Error = EngineError;

    /// Decode from a full opcode byte
    fn try_from(opcode: u8) -> Result<Self, Self::Error> {
        let kind = match opcode >> 4 {
            0x0 => OpKind::Swap,
            0x1 => OpKind::AddLiquidity,
            0x2 => OpKind::RemoveLiquidity,
            0x3 => OpKind::SendAll,
            0x4 => OpKind::ReceiveAll,
            0x5 => OpKind::ReceiveAllViaCallback,
            0x6 => OpKind::MarkReceived,
            0x7 => OpKind::Deposit,
            0x8 => OpKind::Withdraw,
            0x9 => OpKind::Permit,
            0xA => OpKind::ClaimFees,
            _ => return Err(EngineError::UnknownOperation(opcode)),
        };
        Ok(kind)
    }
}

impl OpKind {
    /// Opcode byte for this kind with the given flag nibble
    #[inline]
    pub fn opcode(self, flags: u8) -> u8 {
        ((self as u8) << 4) | (flags & 0x0f)
    }
}

const FLAG_0: u8 = 0b0001;
const FLAG_1: u8 = 0b0010;

/// Swap opcode flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapFlags {
    pub zero_for_one: bool,
    /// Input is whatever the pool owes the caller in the input token
    pub amount_from_ledger: bool,
}

impl SwapFlags {
    pub fn from_bits(bits: u8) -> Self {
        Self {
            zero_for_one: bits & FLAG_0 != 0,
            amount_from_ledger: bits & FLAG_1 != 0,
        }
    }

    pub fn bits(self) -> u8 {
        (self.zero_for_one as u8) | ((self.amount_from_ledger as u8) << 1)
    }
}

/// Add-liquidity opcode flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddLiquidityFlags {
    pub has_min_shares: bool,
}

impl AddLiquidityFlags {
    pub fn from_bits(bits: u8) -> Self {
        Self {
            has_min_shares: bits & FLAG_0 != 0,
        }
    }

    pub fn bits(self) -> u8 {
        self.has_min_shares as u8
    }
}

/// Remove-liquidity opcode flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveLiquidityFlags {
    /// Burn the caller's whole share balance
    pub all_shares: bool,
}

impl RemoveLiquidityFlags {
    pub fn from_bits(bits: u8) -> Self {
        Self {
            all_shares: bits & FLAG_0 != 0,
        }
    }

    pub fn bits(self) -> u8 {
        self.all_shares as u8
    }
}

/// Settlement opcode flags: which bounds follow the token fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundFlags {
    pub has_min: bool,
    pub has_max: bool,
}

impl BoundFlags {
    pub fn from_bits(bits: u8) -> Self {
        Self {
            has_min: bits & FLAG_0 != 0,
            has_max: bits & FLAG_1 != 0,
        }
    }

    pub fn bits(self) -> u8 {
        (self.has_min as u8) | ((self.has_max as u8) << 1)
    }
}

/// Optional bounds on a settled amount. Absent min is 0, absent max is
/// `u128::MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u128>,
}

impl SettleBounds {
    pub fn flags(&self) -> BoundFlags {
        BoundFlags {
            has_min: self.min.is_some(),
            has_max: self.max.is_some(),
        }
    }

    pub fn check(&self, amount: U256) -> Result<(), EngineError> {
        let min = self.min.unwrap_or(0);
        let max = self.max.unwrap_or(u128::MAX);
        if amount < U256::from(min) || amount > U256::from(max) {
            return Err(EngineError::BoundViolation { amount, min, max });
        }
        Ok(())
    }
}

/// Input amount of a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapAmount {
    Exact(u128),
    /// Use what the pool currently owes the caller in the input token
    FromLedger,
}

/// One decoded program operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Swap {
        token0: TokenId,
        token1: TokenId,
        zero_for_one: bool,
        amount: SwapAmount,
    },
    AddLiquidity {
        token0: TokenId,
        token1: TokenId,
        recipient: Address,
        max0: u128,
        max1: u128,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_shares: Option<u128>,
    },
    RemoveLiquidity {
        token0: TokenId,
        token1: TokenId,
        /// `None` burns the caller's whole balance
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shares: Option<u128>,
    },
    SendAll {
        token: TokenId,
        recipient: Address,
        #[serde(default)]
        bounds: SettleBounds,
    },
    ReceiveAll {
        token: TokenId,
        #[serde(default)]
        bounds: SettleBounds,
    },
    ReceiveAllViaCallback {
        token: TokenId,
        #[serde(default)]
        bounds: SettleBounds,
    },
    MarkReceived {
        token: TokenId,
        #[serde(default)]
        bounds: SettleBounds,
    },
    Deposit {
        token: TokenId,
        amount: u128,
    },
    Withdraw {
        token: TokenId,
        recipient: Address,
        amount: u128,
    },
    Permit {
        token: TokenId,
        amount: u128,
        deadline: u64,
        signature: PermitSignature,
    },
    ClaimFees {
        token0: TokenId,
        token1: TokenId,
    },
}

impl Operation {
    pub fn kind(&self) -> OpKind {
        match self {
            Operation::Swap { .. } => OpKind::Swap,
            Operation::AddLiquidity { .. } => OpKind::AddLiquidity,
            Operation::RemoveLiquidity { .. } => OpKind::RemoveLiquidity,
            Operation::SendAll { .. } => OpKind::SendAll,
            Operation::ReceiveAll { .. } => OpKind::ReceiveAll,
            Operation::ReceiveAllViaCallback { .. } => OpKind::ReceiveAllViaCallback,
            Operation::MarkReceived { .. } => OpKind::MarkReceived,
            Operation::Deposit { .. } => OpKind::Deposit,
            Operation::Withdraw { .. } => OpKind::Withdraw,
            Operation::Permit { .. } => OpKind::Permit,
            Operation::ClaimFees { .. } => OpKind::ClaimFees,
        }
    }
}

/// Run one operation against the execution context
pub fn process<H: Host + ?Sized>(
    ctx: &mut ExecutionContext<'_, H>,
    op: &Operation,
) -> Result<(), EngineError> {
    match *op {
        Operation::Swap {
            token0,
            token1,
            zero_for_one,
            amount,
        } => process_swap(ctx, token0, token1, zero_for_one, amount),
        Operation::AddLiquidity {
            token0,
            token1,
            recipient,
            max0,
            max1,
            min_shares,
        } => process_add_liquidity(ctx, token0, token1, recipient, max0, max1, min_shares),
        Operation::RemoveLiquidity {
            token0,
            token1,
            shares,
        } => process_remove_liquidity(ctx, token0, token1, shares),
        Operation::SendAll {
            token,
            recipient,
            bounds,
        } => process_send_all(ctx, token, recipient, bounds),
        Operation::ReceiveAll { token, bounds } => process_receive_all(ctx, token, bounds),
        Operation::ReceiveAllViaCallback { token, bounds } => {
            process_receive_all_via_callback(ctx, token, bounds)
        }
        Operation::MarkReceived { token, bounds } => process_mark_received(ctx, token, bounds),
        Operation::Deposit { token, amount } => process_deposit(ctx, token, amount),
        Operation::Withdraw {
            token,
            recipient,
            amount,
        } => process_withdraw(ctx, token, recipient, amount),
        Operation::Permit {
            token,
            amount,
            deadline,
            ref signature,
        } => process_permit(ctx, token, amount, deadline, signature),
        Operation::ClaimFees { token0, token1 } => process_claim_fees(ctx, token0, token1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_nibbles() {
        assert_eq!(OpKind::try_from(0x03).unwrap(), OpKind::Swap);
        assert_eq!(OpKind::try_from(0xa0).unwrap(), OpKind::ClaimFees);
        assert_eq!(
            OpKind::try_from(0xb0),
            Err(EngineError::UnknownOperation(0xb0))
        );
        assert_eq!(
            OpKind::try_from(0xff),
            Err(EngineError::UnknownOperation(0xff))
        );
        assert_eq!(OpKind::ReceiveAll.opcode(0b11), 0x43);
        // Flags never leak into the kind nibble
        assert_eq!(OpKind::Swap.opcode(0xff), 0x0f);
    }

    #[test]
    fn test_flag_bits() {
        let flags = SwapFlags::from_bits(0b0010);
        assert!(!flags.zero_for_one);
        assert!(flags.amount_from_ledger);
        assert_eq!(flags.bits(), 0b0010);

        // Unused bits are ignored
        assert_eq!(BoundFlags::from_bits(0b1101).bits(), 0b0001);
        assert!(RemoveLiquidityFlags::from_bits(0b1111).all_shares);
        assert!(!AddLiquidityFlags::from_bits(0b1110).has_min_shares);
    }

    #[test]
    fn test_bounds_check() {
        let open = SettleBounds::default();
        assert!(open.check(U256::ZERO).is_ok());
        assert!(open.check(U256::from(u128::MAX)).is_ok());
        assert!(open.check(U256::from(u128::MAX) + U256::from(1u8)).is_err());

        let bounded = SettleBounds {
            min: Some(10),
            max: Some(20),
        };
        assert!(bounded.check(U256::from(10u8)).is_ok());
        assert!(bounded.check(U256::from(20u8)).is_ok());
        assert_eq!(
            bounded.check(U256::from(21u8)),
            Err(EngineError::BoundViolation {
                amount: U256::from(21u8),
                min: 10,
                max: 20
            })
        );
        assert!(bounded.check(U256::from(9u8)).is_err());
        assert_eq!(bounded.flags().bits(), 0b11);
    }
}
