//! Execution receipt
//!
//! Returned only for committed executions. Describes what each operation did
//! and what must be delivered outside the engine.

use alloy_primitives::{Address, U256};
use packswap_common::TokenId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementKind {
    Sent { recipient: Address },
    Received,
    ReceivedViaCallback,
    MarkedReceived,
}

/// One step of a committed execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionEvent {
    Swap {
        token_in: TokenId,
        token_out: TokenId,
        amount_in: u128,
        amount_out: u128,
        protocol_fee: u128,
    },
    LiquidityAdded {
        token0: TokenId,
        token1: TokenId,
        recipient: Address,
        shares: u128,
        amount0: u128,
        amount1: u128,
    },
    LiquidityRemoved {
        token0: TokenId,
        token1: TokenId,
        owner: Address,
        shares: u128,
        amount0: u128,
        amount1: u128,
    },
    Settled {
        token: TokenId,
        kind: SettlementKind,
        amount: U256,
    },
    Deposited {
        token: TokenId,
        amount: u128,
    },
    Withdrawn {
        token: TokenId,
        recipient: Address,
        amount: u128,
    },
    PermitGranted {
        token: TokenId,
        amount: u128,
        deadline: u64,
    },
    FeesClaimed {
        token0: TokenId,
        token1: TokenId,
        amount0: u128,
        amount1: u128,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    pub caller: Address,

    /// Operations executed
    pub operations: usize,

    /// Ledger capacity from the program header
    pub ledger_capacity: usize,

    /// Probe steps the ledger took
    pub ledger_probes: u64,

    /// Amounts cleared by mark-received, to be delivered by the surrounding system
    pub released: Vec<(TokenId, U256)>,

    pub events: Vec<ExecutionEvent>,
}

impl ExecutionReceipt {
    /// Total released for `token`
    pub fn released_of(&self, token: TokenId) -> U256 {
        self.released
            .iter()
            .filter(|(t, _)| *t == token)
            .fold(U256::ZERO, |acc, (_, amount)| acc.saturating_add(*amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_released_of_sums_per_token() {
        let a = Address::with_last_byte(1);
        let b = Address::with_last_byte(2);
        let receipt = ExecutionReceipt {
            caller: Address::repeat_byte(9),
            operations: 2,
            ledger_capacity: 2,
            ledger_probes: 4,
            released: vec![(a, U256::from(3u8)), (b, U256::from(1u8)), (a, U256::from(4u8))],
            events: Vec::new(),
        };
        assert_eq!(receipt.released_of(a), U256::from(7u8));
        assert_eq!(receipt.released_of(Address::with_last_byte(3)), U256::ZERO);
    }

    #[test]
    fn test_receipt_json() {
        let receipt = ExecutionReceipt {
            caller: Address::repeat_byte(9),
            operations: 1,
            ledger_capacity: 1,
            ledger_probes: 1,
            released: Vec::new(),
            events: vec![ExecutionEvent::Settled {
                token: Address::with_last_byte(1),
                kind: SettlementKind::Sent {
                    recipient: Address::repeat_byte(2),
                },
                amount: U256::from(u128::MAX),
            }],
        };

        let json = serde_json::to_string(&receipt).unwrap();
        assert!(json.contains("\"settled\""));
        assert_eq!(serde_json::from_str::<ExecutionReceipt>(&json).unwrap(), receipt);
    }
}
