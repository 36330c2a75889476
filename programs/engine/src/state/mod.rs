pub mod book;
pub mod fees;
pub mod ledger;
pub mod pool;

pub use book::*;
pub use fees::*;
pub use ledger::*;
pub use pool::*;
