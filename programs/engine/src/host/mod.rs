//! Collaborator interfaces
//!
//! Token movement, the caller's settlement hook and signature-based allowance
//! are external to the engine. The engine calls them through these traits and
//! treats any failure as a fault of the whole execution.

pub mod memory;

pub use memory::*;

use alloy_primitives::{Address, B256, U256};
use packswap_common::{HostError, TokenId};
use serde::{Deserialize, Serialize};

/// Marker a settlement hook must return to accept a request
pub const SETTLEMENT_ACK: [u8; 4] = [0x5e, 0x77, 0x1e, 0xac];

/// ECDSA-style signature carried by a permit operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitSignature {
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

/// Token movement primitive. `transfer_out` pays from the engine's holdings,
/// `transfer_in` pulls into them under an allowance granted to the engine.
pub trait TokenMover {
    fn transfer_out(&mut self, token: TokenId, to: Address, amount: U256) -> Result<(), HostError>;

    fn transfer_in(&mut self, token: TokenId, from: Address, amount: U256)
        -> Result<(), HostError>;

    fn balance_of(&self, token: TokenId, holder: Address) -> U256;
}

/// Pull-based settlement: ask the caller to push `amount` of `token` to the
/// engine. Must return [`SETTLEMENT_ACK`].
pub trait SettlementCallback {
    fn request_settlement(&mut self, caller: Address, token: TokenId, amount: U256) -> [u8; 4];
}

/// Signature-based allowance grant
pub trait PermitGranter {
    fn grant_permit(
        &mut self,
        owner: Address,
        token: TokenId,
        amount: u128,
        deadline: u64,
        signature: &PermitSignature,
    ) -> Result<(), HostError>;
}

/// Everything an execution needs from the outside world
pub trait Host: TokenMover + SettlementCallback + PermitGranter {}

impl<T: TokenMover + SettlementCallback + PermitGranter + ?Sized> Host for T {}
