//! Per-execution accounting ledger
//!
//! Fixed-capacity open-addressing table of token -> signed delta. Positive
//! deltas are owed to the pool by the caller, negative deltas are owed to the
//! caller by the pool. A running count of non-zero entries makes the
//! end-of-program settlement check O(1).

use alloy_primitives::{Address, I256};
use packswap_common::{EngineError, TokenId};

#[derive(Debug, Clone, Copy)]
struct Slot {
    token: TokenId,
    delta: I256,
}

impl Slot {
    const EMPTY: Slot = Slot {
        token: Address::ZERO,
        delta: I256::ZERO,
    };

    fn is_empty(&self) -> bool {
        self.token == Address::ZERO
    }
}

/// Outcome of probing for a key
enum Probe {
    Found(usize),
    /// Key absent; this slot can take it
    Vacant(usize),
    Full,
}

/// Open-addressing ledger keyed by token
#[derive(Debug, Clone)]
pub struct Ledger {
    slots: Vec<Slot>,
    nonzero: usize,
    probes: u64,
}

impl Ledger {
    /// Allocate `capacity` empty slots
    pub fn new(capacity: usize) -> Result<Self, EngineError> {
        if capacity == 0 {
            return Err(EngineError::ZeroLedgerCapacity);
        }
        Ok(Self {
            slots: vec![Slot::EMPTY; capacity],
            nonzero: 0,
            probes: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of tokens with an outstanding delta
    pub fn nonzero_count(&self) -> usize {
        self.nonzero
    }

    /// Total probe steps taken so far
    pub fn probe_count(&self) -> u64 {
        self.probes
    }

    fn home(&self, token: &TokenId) -> usize {
        let mut low = [0u8; 8];
        low.copy_from_slice(&token.as_slice()[12..]);
        (u64::from_be_bytes(low) % self.slots.len() as u64) as usize
    }

    /// Linear probe from the home slot. Stops at the key or at an empty slot;
    /// a slot whose delta went back to zero may be claimed by a new key, since
    /// slots are never emptied and the chain stays intact.
    fn probe(&mut self, token: &TokenId) -> Probe {
        let cap = self.slots.len();
        let start = self.home(token);
        let mut reusable = None;

        for step in 0..cap {
            let idx = (start + step) % cap;
            self.probes += 1;
            let slot = &self.slots[idx];

            if slot.token == *token {
                return Probe::Found(idx);
            }
            if slot.is_empty() {
                return Probe::Vacant(reusable.unwrap_or(idx));
            }
            if reusable.is_none() && slot.delta.is_zero() {
                reusable = Some(idx);
            }
        }

        match reusable {
            Some(idx) => Probe::Vacant(idx),
            None => Probe::Full,
        }
    }

    /// Add `delta` to the token's outstanding balance
    pub fn account_change(&mut self, token: TokenId, delta: I256) -> Result<(), EngineError> {
        if token == Address::ZERO {
            return Err(EngineError::ZeroToken);
        }
        if delta.is_zero() {
            return Ok(());
        }

        let idx = match self.probe(&token) {
            Probe::Found(idx) => idx,
            Probe::Vacant(idx) => {
                self.slots[idx] = Slot {
                    token,
                    delta: I256::ZERO,
                };
                idx
            }
            Probe::Full => {
                return Err(EngineError::LedgerFull {
                    capacity: self.slots.len(),
                })
            }
        };

        let prior = self.slots[idx].delta;
        let next = prior.checked_add(delta).ok_or(EngineError::Overflow)?;

        if prior.is_zero() && !next.is_zero() {
            self.nonzero += 1;
        } else if !prior.is_zero() && next.is_zero() {
            self.nonzero -= 1;
        }

        self.slots[idx].delta = next;
        Ok(())
    }

    /// Current outstanding balance (zero when never touched)
    pub fn get_change(&mut self, token: TokenId) -> I256 {
        match self.probe(&token) {
            Probe::Found(idx) => self.slots[idx].delta,
            _ => I256::ZERO,
        }
    }

    /// Return the outstanding balance and clear it
    pub fn reset_change(&mut self, token: TokenId) -> I256 {
        match self.probe(&token) {
            Probe::Found(idx) => {
                let prior = self.slots[idx].delta;
                if !prior.is_zero() {
                    self.nonzero -= 1;
                }
                self.slots[idx].delta = I256::ZERO;
                prior
            }
            _ => I256::ZERO,
        }
    }

    /// Every touched token must be back at zero
    pub fn assert_settled(&self) -> Result<(), EngineError> {
        if self.nonzero != 0 {
            return Err(EngineError::UnsettledBalances {
                outstanding: self.nonzero,
            });
        }
        Ok(())
    }

    /// Outstanding (token, delta) pairs, for diagnostics
    pub fn outstanding(&self) -> Vec<(TokenId, I256)> {
        self.slots
            .iter()
            .filter(|s| !s.is_empty() && !s.delta.is_zero())
            .map(|s| (s.token, s.delta))
            .collect()
    }
}
