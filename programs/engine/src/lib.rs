//! Packswap engine - packed-program constant product AMM (x·y=k)
//!
//! A caller submits one byte buffer of packed operations. Operations move
//! value between the caller and the pools through a per-execution ledger of
//! signed token deltas:
//! - swaps, liquidity and fee claims record what each side owes
//! - settlement operations clear those entries through the host
//! - the execution commits only if every entry nets to zero

#![allow(clippy::too_many_arguments)]

pub mod entrypoint;
pub mod host;
pub mod instructions;
pub mod math;
pub mod receipt;
pub mod state;

pub use entrypoint::{Engine, ExecutionContext};
pub use host::*;
pub use instructions::{OpKind, Operation, Program, SettleBounds, SwapAmount};
pub use receipt::*;
pub use state::*;
