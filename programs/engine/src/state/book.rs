//! Pool book and the per-execution overlay

use std::collections::BTreeMap;
use std::sync::Mutex;

use packswap_common::EngineError;

use super::pool::{Pool, PoolKey};

/// All pools, keyed by canonical token pair
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PoolBook {
    pools: BTreeMap<PoolKey, Pool>,
}

impl PoolBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a flat list (as persisted)
    pub fn from_pools(pools: impl IntoIterator<Item = Pool>) -> Self {
        Self {
            pools: pools.into_iter().map(|p| (p.key, p)).collect(),
        }
    }

    pub fn get(&self, key: &PoolKey) -> Option<&Pool> {
        self.pools.get(key)
    }

    pub fn insert(&mut self, pool: Pool) {
        self.pools.insert(pool.key, pool);
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    /// Flat copy of every pool, in key order
    pub fn snapshot(&self) -> Vec<Pool> {
        self.pools.values().cloned().collect()
    }
}

/// Copy-on-touch view of the pool book for one execution
///
/// Pools are cloned out of the shared book on first use and written back only
/// by [`PoolOverlay::commit`], so a faulted execution leaves the book as it
/// was. The book lock is never held across a handler.
pub struct PoolOverlay<'a> {
    base: &'a Mutex<PoolBook>,
    touched: BTreeMap<PoolKey, Pool>,
}

impl<'a> PoolOverlay<'a> {
    pub fn new(base: &'a Mutex<PoolBook>) -> Self {
        Self {
            base,
            touched: BTreeMap::new(),
        }
    }

    /// Working copy of the pool for `key`, created empty if it does not exist
    pub fn pool_mut(&mut self, key: PoolKey) -> Result<&mut Pool, EngineError> {
        if !self.touched.contains_key(&key) {
            let pool = {
                let book = self.base.lock().map_err(|_| EngineError::StatePoisoned)?;
                book.get(&key).cloned().unwrap_or_else(|| Pool::new(key))
            };
            self.touched.insert(key, pool);
        }
        self.touched.get_mut(&key).ok_or(EngineError::StatePoisoned)
    }

    /// Number of pools this execution touched
    pub fn touched(&self) -> usize {
        self.touched.len()
    }

    /// Write every touched pool back to the shared book. A pool that never
    /// existed and is still pristine is not materialized.
    pub fn commit(self) -> Result<(), EngineError> {
        let mut book = self.base.lock().map_err(|_| EngineError::StatePoisoned)?;
        for (key, pool) in self.touched {
            if book.get(&key).is_none() && pool == Pool::new(key) {
                continue;
            }
            book.insert(pool);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    fn key() -> PoolKey {
        PoolKey::new(Address::with_last_byte(1), Address::with_last_byte(2)).unwrap()
    }

    #[test]
    fn test_overlay_commit() {
        let book = Mutex::new(PoolBook::new());

        let mut overlay = PoolOverlay::new(&book);
        overlay
            .pool_mut(key())
            .unwrap()
            .add_liquidity(Address::repeat_byte(7), 100, 100)
            .unwrap();
        assert_eq!(overlay.touched(), 1);

        // Nothing visible before commit
        assert!(book.lock().unwrap().is_empty());

        overlay.commit().unwrap();
        let book = book.lock().unwrap();
        assert_eq!(book.get(&key()).unwrap().reserve0, 100);
    }

    #[test]
    fn test_overlay_discard() {
        let mut initial = Pool::new(key());
        initial.add_liquidity(Address::repeat_byte(7), 100, 100).unwrap();
        let book = Mutex::new(PoolBook::from_pools(vec![initial.clone()]));

        {
            let mut overlay = PoolOverlay::new(&book);
            let pool = overlay.pool_mut(key()).unwrap();
            pool.reserve0 = 1;
            // dropped without commit
        }

        assert_eq!(book.lock().unwrap().get(&key()), Some(&initial));
    }

    #[test]
    fn test_pristine_pool_not_committed() {
        let book = Mutex::new(PoolBook::new());

        let mut overlay = PoolOverlay::new(&book);
        assert_eq!(overlay.pool_mut(key()).unwrap().take_accrued_fees(), (0, 0));
        overlay.commit().unwrap();

        assert!(book.lock().unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut pool = Pool::new(key());
        pool.add_liquidity(Address::repeat_byte(7), 4, 9).unwrap();
        let book = PoolBook::from_pools(vec![pool]);

        assert_eq!(PoolBook::from_pools(book.snapshot()), book);
        assert_eq!(book.len(), 1);
        assert_eq!(book.iter().count(), 1);
    }
}
