//! In-memory host for simulation and tests
//!
//! Keeps token balances and allowances in maps. The whole host is `Clone`, so
//! the caller can snapshot it before an execution and restore it on a fault,
//! which is the outer atomic boundary for token movements.

use std::collections::BTreeMap;

use alloy_primitives::{Address, B256, U256};
use packswap_common::{HostError, TokenId};
use serde::{Deserialize, Serialize};

use super::{PermitGranter, PermitSignature, SettlementCallback, TokenMover, SETTLEMENT_ACK};

/// How the simulated caller answers a settlement request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackBehavior {
    /// Push the full amount and acknowledge
    #[default]
    Pay,
    /// Return a wrong marker without paying
    Refuse,
    /// Push one unit less than requested but acknowledge
    Underpay,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryHost {
    /// Address the engine holds its tokens under
    engine: Address,

    /// token -> holder -> balance
    #[serde(default)]
    balances: BTreeMap<TokenId, BTreeMap<Address, U256>>,

    /// token -> owner -> allowance granted to the engine
    #[serde(default)]
    allowances: BTreeMap<TokenId, BTreeMap<Address, U256>>,

    #[serde(default)]
    callback: CallbackBehavior,

    /// Clock used to check permit deadlines
    #[serde(default)]
    now: u64,
}

impl MemoryHost {
    pub fn new(engine: Address) -> Self {
        Self {
            engine,
            ..Self::default()
        }
    }

    pub fn engine(&self) -> Address {
        self.engine
    }

    pub fn set_callback_behavior(&mut self, behavior: CallbackBehavior) {
        self.callback = behavior;
    }

    pub fn set_now(&mut self, now: u64) {
        self.now = now;
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Credit `holder` out of thin air (test and config seeding)
    pub fn mint(&mut self, token: TokenId, holder: Address, amount: U256) {
        let balance = self.balance_mut(token, holder);
        *balance = balance.saturating_add(amount);
    }

    /// Allow the engine to pull `amount` of `token` from `owner`
    pub fn approve(&mut self, token: TokenId, owner: Address, amount: U256) {
        self.allowances
            .entry(token)
            .or_default()
            .insert(owner, amount);
    }

    pub fn balance(&self, token: TokenId, holder: Address) -> U256 {
        self.balances
            .get(&token)
            .and_then(|m| m.get(&holder))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn allowance(&self, token: TokenId, owner: Address) -> U256 {
        self.allowances
            .get(&token)
            .and_then(|m| m.get(&owner))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Every non-zero balance as (token, holder, amount)
    pub fn balances(&self) -> impl Iterator<Item = (TokenId, Address, U256)> + '_ {
        self.balances.iter().flat_map(|(token, holders)| {
            holders
                .iter()
                .filter(|(_, amount)| **amount != U256::ZERO)
                .map(move |(holder, amount)| (*token, *holder, *amount))
        })
    }

    fn balance_mut(&mut self, token: TokenId, holder: Address) -> &mut U256 {
        self.balances
            .entry(token)
            .or_default()
            .entry(holder)
            .or_insert(U256::ZERO)
    }

    /// Plain transfer between two holders
    pub fn transfer(
        &mut self,
        token: TokenId,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        let available = self.balance(token, from);
        if available < amount {
            return Err(HostError::InsufficientBalance {
                token,
                holder: from,
                available,
                required: amount,
            });
        }
        *self.balance_mut(token, from) = available - amount;
        let to_balance = self.balance_mut(token, to);
        *to_balance = to_balance.saturating_add(amount);
        Ok(())
    }
}

impl TokenMover for MemoryHost {
    fn transfer_out(&mut self, token: TokenId, to: Address, amount: U256) -> Result<(), HostError> {
        let engine = self.engine;
        self.transfer(token, engine, to, amount)
    }

    fn transfer_in(
        &mut self,
        token: TokenId,
        from: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        let allowance = self.allowance(token, from);
        if allowance < amount {
            return Err(HostError::InsufficientAllowance {
                token,
                owner: from,
                available: allowance,
                required: amount,
            });
        }
        let engine = self.engine;
        self.transfer(token, from, engine, amount)?;
        self.approve(token, from, allowance - amount);
        Ok(())
    }

    fn balance_of(&self, token: TokenId, holder: Address) -> U256 {
        self.balance(token, holder)
    }
}

impl SettlementCallback for MemoryHost {
    fn request_settlement(&mut self, caller: Address, token: TokenId, amount: U256) -> [u8; 4] {
        let engine = self.engine;
        let pay = match self.callback {
            CallbackBehavior::Refuse => return [0u8; 4],
            CallbackBehavior::Pay => amount,
            CallbackBehavior::Underpay => amount.saturating_sub(U256::from(1u8)),
        };
        match self.transfer(token, caller, engine, pay) {
            Ok(()) => SETTLEMENT_ACK,
            Err(e) => {
                log::warn!("simulated caller could not settle: {}", e);
                [0u8; 4]
            }
        }
    }
}

impl PermitGranter for MemoryHost {
    fn grant_permit(
        &mut self,
        owner: Address,
        token: TokenId,
        amount: u128,
        deadline: u64,
        signature: &PermitSignature,
    ) -> Result<(), HostError> {
        if deadline < self.now {
            return Err(HostError::PermitExpired {
                deadline,
                now: self.now,
            });
        }
        // Signature recovery belongs to the token; only reject the obviously empty one
        if signature.r == B256::ZERO || signature.s == B256::ZERO {
            return Err(HostError::InvalidSignature);
        }
        self.approve(token, owner, U256::from(amount));
        Ok(())
    }
}
