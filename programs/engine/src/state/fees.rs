//! Administrative fee configuration

use alloy_primitives::Address;
use packswap_common::{EngineError, BPS_SCALE, PPT_SCALE};
use serde::{Deserialize, Serialize};

/// Fee settings read by the swap and claim handlers. Only the engine admin
/// may change them, and never from inside a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSettings {
    /// LP fee on swap input, in basis points (e.g., 30 = 0.3%)
    pub swap_fee_bps: u16,

    /// Protocol share skimmed from swap input, in parts per thousand (0 = off)
    pub protocol_fee_ppt: u16,

    /// Only identity allowed to claim accrued protocol fees
    pub fee_receiver: Address,
}

impl Default for FeeSettings {
    fn default() -> Self {
        Self {
            swap_fee_bps: 30,
            protocol_fee_ppt: 0,
            fee_receiver: Address::ZERO,
        }
    }
}

impl FeeSettings {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.swap_fee_bps as u128 >= BPS_SCALE {
            return Err(EngineError::InvalidFeeSettings(
                "swap fee must be below 10000 bps",
            ));
        }
        if self.protocol_fee_ppt as u128 >= PPT_SCALE {
            return Err(EngineError::InvalidFeeSettings(
                "protocol fee must be below 1000 ppt",
            ));
        }
        if self.protocol_fee_enabled() && self.fee_receiver == Address::ZERO {
            return Err(EngineError::InvalidFeeSettings(
                "protocol fee needs a fee receiver",
            ));
        }
        Ok(())
    }

    pub fn protocol_fee_enabled(&self) -> bool {
        self.protocol_fee_ppt > 0
    }
}
