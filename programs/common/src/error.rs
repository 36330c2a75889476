//! Error types shared by the engine and its collaborators

use alloy_primitives::{Address, I256, U256};
use thiserror::Error;

/// Coarse classification of a fault, so a client can tell a malformed program
/// apart from a slippage bound or a failed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultClass {
    /// Unknown opcode, truncated buffer, bad field
    MalformedProgram,
    /// Outstanding balance at program end, or no ledger slot left
    LedgerViolation,
    /// Overflow or an undefined division (empty pool)
    Arithmetic,
    /// Operation observed state it must never see (wrong sign, missing shares)
    InvariantViolation,
    /// Settled or minted amount outside a caller bound
    BoundViolation,
    /// Token movement, settlement callback or permit collaborator failed
    External,
    /// Re-entrant call or an administrative call by the wrong party
    Access,
}

/// Faults raised by a collaborator (token movement, settlement, allowance)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("insufficient balance of {token} for {holder}: have {available}, need {required}")]
    InsufficientBalance {
        token: Address,
        holder: Address,
        available: U256,
        required: U256,
    },

    #[error("insufficient allowance of {token} from {owner}: have {available}, need {required}")]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        available: U256,
        required: U256,
    },

    #[error("permit expired at {deadline} (now {now})")]
    PermitExpired { deadline: u64, now: u64 },

    #[error("invalid permit signature")]
    InvalidSignature,

    #[error("host rejected the request: {0}")]
    Rejected(String),
}

/// Every way an execution can fail. Any of these voids the whole execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    // Malformed program
    #[error("program truncated at offset {offset}: {needed} more bytes needed")]
    TruncatedProgram { offset: usize, needed: usize },

    #[error("unknown operation in opcode 0x{0:02x}")]
    UnknownOperation(u8),

    #[error("invalid field width {0} (must be 1..=32)")]
    InvalidFieldWidth(usize),

    #[error("ledger capacity must be non-zero")]
    ZeroLedgerCapacity,

    #[error("zero token identifier")]
    ZeroToken,

    #[error("pool tokens {token0} / {token1} are not in canonical order")]
    UnsortedPair { token0: Address, token1: Address },

    // Ledger violation
    #[error("{outstanding} token balance(s) left unsettled")]
    UnsettledBalances { outstanding: usize },

    #[error("ledger full: no free slot among {capacity}")]
    LedgerFull { capacity: usize },

    // Arithmetic
    #[error("arithmetic overflow")]
    Overflow,

    #[error("reserve exceeds 128 bits")]
    ReserveOverflow,

    #[error("pool has no liquidity")]
    PoolNotInitialized,

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("deposit too small to mint any liquidity")]
    InsufficientLiquidityMinted,

    // Invariant violation
    #[error("settlement of {token} observed delta {delta} with the wrong sign")]
    WrongSettlementSign { token: Address, delta: I256 },

    #[error("owner {owner} holds {available} shares, {requested} requested")]
    InsufficientShares {
        owner: Address,
        available: u128,
        requested: u128,
    },

    // Bound violation
    #[error("amount {amount} outside bounds [{min}, {max}]")]
    BoundViolation { amount: U256, min: u128, max: u128 },

    // External collaborator
    #[error("token transfer failed: {0}")]
    Transfer(#[source] HostError),

    #[error("settlement callback refused for {token}")]
    SettlementRefused { token: Address },

    #[error("settlement of {token} short: expected {expected}, received {received}")]
    SettlementShortfall {
        token: Address,
        expected: U256,
        received: U256,
    },

    #[error("permit failed: {0}")]
    Permit(#[source] HostError),

    // Access
    #[error("re-entrant execution rejected")]
    Reentrancy,

    #[error("caller {0} is not authorized")]
    Unauthorized(Address),

    #[error("invalid fee settings: {0}")]
    InvalidFeeSettings(&'static str),

    #[error("engine state lock poisoned")]
    StatePoisoned,
}

impl EngineError {
    /// Which family of fault this is
    pub fn class(&self) -> FaultClass {
        use EngineError::*;
        match self {
            TruncatedProgram { .. }
            | UnknownOperation(_)
            | InvalidFieldWidth(_)
            | ZeroLedgerCapacity
            | ZeroToken
            | UnsortedPair { .. } => FaultClass::MalformedProgram,

            UnsettledBalances { .. } | LedgerFull { .. } => FaultClass::LedgerViolation,

            Overflow
            | ReserveOverflow
            | PoolNotInitialized
            | ZeroAmount
            | InsufficientLiquidityMinted => FaultClass::Arithmetic,

            WrongSettlementSign { .. } | InsufficientShares { .. } => {
                FaultClass::InvariantViolation
            }

            BoundViolation { .. } => FaultClass::BoundViolation,

            Transfer(_) | SettlementRefused { .. } | SettlementShortfall { .. } | Permit(_) => {
                FaultClass::External
            }

            Reentrancy | Unauthorized(_) | InvalidFeeSettings(_) | StatePoisoned => {
                FaultClass::Access
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_classes() {
        assert_eq!(
            EngineError::UnknownOperation(0xf0).class(),
            FaultClass::MalformedProgram
        );
        assert_eq!(
            EngineError::UnsettledBalances { outstanding: 1 }.class(),
            FaultClass::LedgerViolation
        );
        assert_eq!(
            EngineError::BoundViolation {
                amount: U256::from(5u8),
                min: 0,
                max: 4
            }
            .class(),
            FaultClass::BoundViolation
        );
        assert_eq!(
            EngineError::Transfer(HostError::InvalidSignature).class(),
            FaultClass::External
        );
        assert_eq!(EngineError::Reentrancy.class(), FaultClass::Access);
    }

    #[test]
    fn test_error_messages() {
        let err = EngineError::UnknownOperation(0xf3);
        assert_eq!(err.to_string(), "unknown operation in opcode 0xf3");

        let err = EngineError::TruncatedProgram { offset: 7, needed: 16 };
        assert!(err.to_string().contains("offset 7"));
    }
}
