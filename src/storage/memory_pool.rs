use crate::core::Transaction;
use std::sync::RwLock;

/// Signed transactions waiting for the next block, in submission order.
/// Duplicates are not filtered.
pub struct PendingPool {
    inner: RwLock<Vec<Transaction>>,
}

impl Default for PendingPool {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingPool {
    pub fn new() -> PendingPool {
        PendingPool {
            inner: RwLock::new(Vec::new()),
        }
    }

    pub fn add(&self, tx: Transaction) {
        match self.inner.write() {
            Ok(mut pool) => pool.push(tx),
            Err(_) => {
                log::error!("Failed to acquire write lock on pending pool");
            }
        }
    }

    /// Snapshot of the pool, oldest first
    pub fn list(&self) -> Vec<Transaction> {
        match self.inner.read() {
            Ok(pool) => pool.clone(),
            Err(_) => {
                log::error!("Failed to acquire read lock on pending pool");
                Vec::new()
            }
        }
    }

    /// Empties the pool and hands back everything that was in it
    pub fn take_all(&self) -> Vec<Transaction> {
        match self.inner.write() {
            Ok(mut pool) => std::mem::take(&mut *pool),
            Err(_) => {
                log::error!("Failed to acquire write lock on pending pool");
                Vec::new()
            }
        }
    }

    // Puts drained transactions back in front of anything submitted meanwhile
    pub fn restore(&self, mut txs: Vec<Transaction>) {
        match self.inner.write() {
            Ok(mut pool) => {
                txs.append(&mut pool);
                *pool = txs;
            }
            Err(_) => {
                log::error!("Failed to acquire write lock on pending pool");
            }
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(pool) => pool.len(),
            Err(_) => {
                log::error!("Failed to acquire read lock on pending pool");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        match self.inner.write() {
            Ok(mut pool) => pool.clear(),
            Err(_) => {
                log::error!("Failed to acquire write lock on pending pool");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_submission_order_and_duplicates() {
        let pool = PendingPool::new();
        let a = Transaction::new("A", "B", 1);
        let b = Transaction::new("B", "C", 2);
        pool.add(a.clone());
        pool.add(b.clone());
        pool.add(a.clone());

        assert_eq!(pool.list(), vec![a.clone(), b, a]);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_take_all_empties_pool() {
        let pool = PendingPool::new();
        pool.add(Transaction::new("A", "B", 1));

        assert_eq!(pool.take_all().len(), 1);
        assert!(pool.is_empty());
        assert!(pool.take_all().is_empty());
    }

    #[test]
    fn test_restore_puts_drained_first() {
        let pool = PendingPool::new();
        let old = Transaction::new("A", "B", 1);
        let new = Transaction::new("C", "D", 2);
        pool.add(old.clone());
        let drained = pool.take_all();
        pool.add(new.clone());

        pool.restore(drained);
        assert_eq!(pool.list(), vec![old, new]);

        pool.clear();
        assert!(pool.is_empty());
    }
}
