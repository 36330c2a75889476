//! Packed program encoding
//!
//! Layout: a 2-byte ledger capacity header, then operations back to back.
//! Each operation is one opcode byte (kind in the high nibble, flags in the
//! low nibble) followed by its fields. Optional fields are present only when
//! their flag bit is set.

use packswap_common::{require_token, EngineError, ProgramReader, ProgramWriter, TokenId};
use serde::{Deserialize, Serialize};

use super::{
    AddLiquidityFlags, BoundFlags, OpKind, Operation, RemoveLiquidityFlags, SettleBounds,
    SwapAmount, SwapFlags,
};
use crate::host::PermitSignature;

fn read_bounds(
    reader: &mut ProgramReader<'_>,
    flags: BoundFlags,
) -> Result<SettleBounds, EngineError> {
    let min = if flags.has_min {
        Some(reader.read_u128()?)
    } else {
        None
    };
    let max = if flags.has_max {
        Some(reader.read_u128()?)
    } else {
        None
    };
    Ok(SettleBounds { min, max })
}

fn write_bounds(writer: &mut ProgramWriter, bounds: &SettleBounds) {
    if let Some(min) = bounds.min {
        writer.write_u128(min);
    }
    if let Some(max) = bounds.max {
        writer.write_u128(max);
    }
}

fn read_token(reader: &mut ProgramReader<'_>) -> Result<TokenId, EngineError> {
    require_token(reader.read_address()?)
}

impl Operation {
    /// Decode the operation at the reader's cursor
    pub fn decode(reader: &mut ProgramReader<'_>) -> Result<Self, EngineError> {
        let opcode = reader.read_u8()?;
        let kind = OpKind::try_from(opcode)?;
        let bits = opcode & 0x0f;

        let op = match kind {
            OpKind::Swap => {
                let flags = SwapFlags::from_bits(bits);
                let token0 = read_token(reader)?;
                let token1 = read_token(reader)?;
                let amount = if flags.amount_from_ledger {
                    SwapAmount::FromLedger
                } else {
                    SwapAmount::Exact(reader.read_u128()?)
                };
                Operation::Swap {
                    token0,
                    token1,
                    zero_for_one: flags.zero_for_one,
                    amount,
                }
            }
            OpKind::AddLiquidity => {
                let flags = AddLiquidityFlags::from_bits(bits);
                let token0 = read_token(reader)?;
                let token1 = read_token(reader)?;
                let recipient = reader.read_address()?;
                let max0 = reader.read_u128()?;
                let max1 = reader.read_u128()?;
                let min_shares = if flags.has_min_shares {
                    Some(reader.read_u128()?)
                } else {
                    None
                };
                Operation::AddLiquidity {
                    token0,
                    token1,
                    recipient,
                    max0,
                    max1,
                    min_shares,
                }
            }
            OpKind::RemoveLiquidity => {
                let flags = RemoveLiquidityFlags::from_bits(bits);
                let token0 = read_token(reader)?;
                let token1 = read_token(reader)?;
                let shares = if flags.all_shares {
                    None
                } else {
                    Some(reader.read_u128()?)
                };
                Operation::RemoveLiquidity {
                    token0,
                    token1,
                    shares,
                }
            }
            OpKind::SendAll => {
                let token = read_token(reader)?;
                let recipient = reader.read_address()?;
                let bounds = read_bounds(reader, BoundFlags::from_bits(bits))?;
                Operation::SendAll {
                    token,
                    recipient,
                    bounds,
                }
            }
            OpKind::ReceiveAll => {
                let token = read_token(reader)?;
                let bounds = read_bounds(reader, BoundFlags::from_bits(bits))?;
                Operation::ReceiveAll { token, bounds }
            }
            OpKind::ReceiveAllViaCallback => {
                let token = read_token(reader)?;
                let bounds = read_bounds(reader, BoundFlags::from_bits(bits))?;
                Operation::ReceiveAllViaCallback { token, bounds }
            }
            OpKind::MarkReceived => {
                let token = read_token(reader)?;
                let bounds = read_bounds(reader, BoundFlags::from_bits(bits))?;
                Operation::MarkReceived { token, bounds }
            }
            OpKind::Deposit => Operation::Deposit {
                token: read_token(reader)?,
                amount: reader.read_u128()?,
            },
            OpKind::Withdraw => Operation::Withdraw {
                token: read_token(reader)?,
                recipient: reader.read_address()?,
                amount: reader.read_u128()?,
            },
            OpKind::Permit => {
                let token = read_token(reader)?;
                let amount = reader.read_u128()?;
                let deadline = reader.read_u64()?;
                let v = reader.read_u8()?;
                let r = reader.read_word()?;
                let s = reader.read_word()?;
                Operation::Permit {
                    token,
                    amount,
                    deadline,
                    signature: PermitSignature { v, r, s },
                }
            }
            OpKind::ClaimFees => Operation::ClaimFees {
                token0: read_token(reader)?,
                token1: read_token(reader)?,
            },
        };

        Ok(op)
    }

    /// Flag nibble this operation encodes with
    pub fn flags(&self) -> u8 {
        match self {
            Operation::Swap {
                zero_for_one,
                amount,
                ..
            } => SwapFlags {
                zero_for_one: *zero_for_one,
                amount_from_ledger: matches!(amount, SwapAmount::FromLedger),
            }
            .bits(),
            Operation::AddLiquidity { min_shares, .. } => AddLiquidityFlags {
                has_min_shares: min_shares.is_some(),
            }
            .bits(),
            Operation::RemoveLiquidity { shares, .. } => RemoveLiquidityFlags {
                all_shares: shares.is_none(),
            }
            .bits(),
            Operation::SendAll { bounds, .. }
            | Operation::ReceiveAll { bounds, .. }
            | Operation::ReceiveAllViaCallback { bounds, .. }
            | Operation::MarkReceived { bounds, .. } => bounds.flags().bits(),
            Operation::Deposit { .. }
            | Operation::Withdraw { .. }
            | Operation::Permit { .. }
            | Operation::ClaimFees { .. } => 0,
        }
    }

    /// Append this operation's opcode and fields
    pub fn encode(&self, writer: &mut ProgramWriter) {
        writer.write_u8(self.kind().opcode(self.flags()));

        match self {
            Operation::Swap {
                token0,
                token1,
                amount,
                ..
            } => {
                writer.write_address(*token0).write_address(*token1);
                if let SwapAmount::Exact(amount) = amount {
                    writer.write_u128(*amount);
                }
            }
            Operation::AddLiquidity {
                token0,
                token1,
                recipient,
                max0,
                max1,
                min_shares,
            } => {
                writer
                    .write_address(*token0)
                    .write_address(*token1)
                    .write_address(*recipient)
                    .write_u128(*max0)
                    .write_u128(*max1);
                if let Some(min) = min_shares {
                    writer.write_u128(*min);
                }
            }
            Operation::RemoveLiquidity {
                token0,
                token1,
                shares,
            } => {
                writer.write_address(*token0).write_address(*token1);
                if let Some(shares) = shares {
                    writer.write_u128(*shares);
                }
            }
            Operation::SendAll {
                token,
                recipient,
                bounds,
            } => {
                writer.write_address(*token).write_address(*recipient);
                write_bounds(writer, bounds);
            }
            Operation::ReceiveAll { token, bounds }
            | Operation::ReceiveAllViaCallback { token, bounds }
            | Operation::MarkReceived { token, bounds } => {
                writer.write_address(*token);
                write_bounds(writer, bounds);
            }
            Operation::Deposit { token, amount } => {
                writer.write_address(*token).write_u128(*amount);
            }
            Operation::Withdraw {
                token,
                recipient,
                amount,
            } => {
                writer
                    .write_address(*token)
                    .write_address(*recipient)
                    .write_u128(*amount);
            }
            Operation::Permit {
                token,
                amount,
                deadline,
                signature,
            } => {
                writer
                    .write_address(*token)
                    .write_u128(*amount)
                    .write_u64(*deadline)
                    .write_u8(signature.v)
                    .write_word(signature.r)
                    .write_word(signature.s);
            }
            Operation::ClaimFees { token0, token1 } => {
                writer.write_address(*token0).write_address(*token1);
            }
        }
    }
}

/// A whole program: ledger capacity plus operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub ledger_capacity: u16,
    pub operations: Vec<Operation>,
}

impl Program {
    pub fn new(ledger_capacity: u16) -> Self {
        Self {
            ledger_capacity,
            operations: Vec::new(),
        }
    }

    /// Builder-style append
    pub fn push(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    /// Decode every operation up front (the engine itself decodes lazily)
    pub fn decode(bytes: &[u8]) -> Result<Self, EngineError> {
        let mut reader = ProgramReader::new(bytes);
        let ledger_capacity = reader.read_u16()?;
        let mut operations = Vec::new();
        while !reader.is_at_end() {
            operations.push(Operation::decode(&mut reader)?);
        }
        Ok(Self {
            ledger_capacity,
            operations,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ProgramWriter::new();
        writer.write_u16(self.ledger_capacity);
        for op in &self.operations {
            op.encode(&mut writer);
        }
        writer.into_bytes()
    }
}
