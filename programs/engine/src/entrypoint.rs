//! Engine entrypoint
//!
//! `Engine::execute` runs one packed program to completion: read the ledger
//! capacity header, decode and dispatch operations until the buffer ends, then
//! require every ledger entry to be back at zero. Pool changes are committed
//! only after that check, so any fault leaves the pools as they were.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use alloy_primitives::{Address, U256};
use packswap_common::{EngineError, ProgramReader, TokenId};

use crate::host::Host;
use crate::instructions::{self, Operation};
use crate::receipt::{ExecutionEvent, ExecutionReceipt};
use crate::state::{FeeSettings, Ledger, Pool, PoolBook, PoolKey, PoolOverlay};

/// Everything a handler may touch during one execution
pub struct ExecutionContext<'a, H: Host + ?Sized> {
    /// Address the engine holds tokens under
    pub engine: Address,
    pub caller: Address,
    /// Fee settings as of the start of the execution
    pub fees: FeeSettings,
    pub ledger: Ledger,
    pub pools: PoolOverlay<'a>,
    pub host: &'a mut H,
    pub released: Vec<(TokenId, U256)>,
    pub events: Vec<ExecutionEvent>,
}

/// Holds the re-entrancy flag for the duration of an execution and clears it
/// on every exit path
struct ExecutionGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ExecutionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, EngineError> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| EngineError::Reentrancy)?;
        Ok(Self { flag })
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Packed-program AMM engine
pub struct Engine {
    address: Address,
    admin: Address,
    fees: Mutex<FeeSettings>,
    pools: Mutex<PoolBook>,
    executing: AtomicBool,
}

impl Engine {
    pub fn new(address: Address, admin: Address, fees: FeeSettings) -> Result<Self, EngineError> {
        fees.validate()?;
        Ok(Self {
            address,
            admin,
            fees: Mutex::new(fees),
            pools: Mutex::new(PoolBook::new()),
            executing: AtomicBool::new(false),
        })
    }

    /// Start from previously persisted pools
    pub fn with_pools(self, pools: impl IntoIterator<Item = Pool>) -> Self {
        Self {
            pools: Mutex::new(PoolBook::from_pools(pools)),
            ..self
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn fee_settings(&self) -> Result<FeeSettings, EngineError> {
        let fees = self.fees.lock().map_err(|_| EngineError::StatePoisoned)?;
        Ok(*fees)
    }

    /// Replace the fee settings. Admin only.
    pub fn set_fee_settings(
        &self,
        caller: Address,
        settings: FeeSettings,
    ) -> Result<(), EngineError> {
        if caller != self.admin {
            return Err(EngineError::Unauthorized(caller));
        }
        settings.validate()?;

        let mut fees = self.fees.lock().map_err(|_| EngineError::StatePoisoned)?;
        *fees = settings;

        log::info!(
            "fee settings updated: swap fee {} bps, protocol fee {} ppt, receiver {}",
            settings.swap_fee_bps,
            settings.protocol_fee_ppt,
            settings.fee_receiver
        );
        Ok(())
    }

    pub fn pool(&self, key: &PoolKey) -> Result<Option<Pool>, EngineError> {
        let pools = self.pools.lock().map_err(|_| EngineError::StatePoisoned)?;
        Ok(pools.get(key).cloned())
    }

    /// Copy of every pool, in key order
    pub fn pools_snapshot(&self) -> Result<Vec<Pool>, EngineError> {
        let pools = self.pools.lock().map_err(|_| EngineError::StatePoisoned)?;
        Ok(pools.snapshot())
    }

    /// Run `program` on behalf of `caller`
    ///
    /// Either every operation succeeds and the ledger nets to zero, or the
    /// execution fails and no pool changes. Token movements already made
    /// through `host` are the host's to roll back.
    pub fn execute<H: Host + ?Sized>(
        &self,
        caller: Address,
        program: &[u8],
        host: &mut H,
    ) -> Result<ExecutionReceipt, EngineError> {
        let _guard = ExecutionGuard::acquire(&self.executing)?;

        let result = self.run(caller, program, host);
        match &result {
            Ok(receipt) => log::info!(
                "execution by {} committed: {} operations, {} ledger probes",
                caller,
                receipt.operations,
                receipt.ledger_probes
            ),
            Err(e) => log::warn!(
                "execution by {} failed ({:?}): {}",
                caller,
                e.class(),
                e
            ),
        }
        result
    }

    fn run<H: Host + ?Sized>(
        &self,
        caller: Address,
        program: &[u8],
        host: &mut H,
    ) -> Result<ExecutionReceipt, EngineError> {
        let mut reader = ProgramReader::new(program);
        let capacity = reader.read_u16()? as usize;

        let mut ctx = ExecutionContext {
            engine: self.address,
            caller,
            fees: self.fee_settings()?,
            ledger: Ledger::new(capacity)?,
            pools: PoolOverlay::new(&self.pools),
            host,
            released: Vec::new(),
            events: Vec::new(),
        };

        let mut operations = 0usize;
        while !reader.is_at_end() {
            let offset = reader.offset();
            let op = Operation::decode(&mut reader)?;
            log::debug!("op #{} at offset {}: {:?}", operations, offset, op.kind());

            instructions::process(&mut ctx, &op)?;
            operations += 1;
        }

        if let Err(e) = ctx.ledger.assert_settled() {
            for (token, delta) in ctx.ledger.outstanding() {
                log::debug!("unsettled {}: {}", token, delta);
            }
            return Err(e);
        }

        let ExecutionContext {
            ledger,
            pools,
            released,
            events,
            ..
        } = ctx;
        pools.commit()?;

        Ok(ExecutionReceipt {
            caller,
            operations,
            ledger_capacity: ledger.capacity(),
            ledger_probes: ledger.probe_count(),
            released,
            events,
        })
    }
}
