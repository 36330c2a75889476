//! Shared types for the packswap engine: errors, token identifiers, the
//! big-endian program reader and checked math.

pub mod types;
pub mod math;
pub mod error;
pub mod instruction;

pub use types::*;
pub use math::*;
pub use error::*;
pub use instruction::*;
