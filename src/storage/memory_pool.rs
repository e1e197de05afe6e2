use crate::core::Transaction;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Ordered buffer of verified transactions waiting for the next candidate block
pub struct MemoryPool {
    inner: Mutex<Vec<Transaction>>,
    arrived: Condvar,
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool {
            inner: Mutex::new(Vec::new()),
            arrived: Condvar::new(),
        }
    }

    pub fn add(&self, tx: Transaction) {
        match self.inner.lock() {
            Ok(mut pool) => {
                pool.push(tx);
                self.arrived.notify_all();
            }
            Err(_) => {
                log::error!("Failed to acquire lock on memory pool");
            }
        }
    }

    /// Take every pending transaction, leaving the pool empty
    pub fn drain(&self) -> Vec<Transaction> {
        match self.inner.lock() {
            Ok(mut pool) => std::mem::take(&mut *pool),
            Err(_) => {
                log::error!("Failed to acquire lock on memory pool");
                Vec::new()
            }
        }
    }

    /// Put transactions from an abandoned candidate back ahead of newer arrivals
    pub fn restore(&self, txs: Vec<Transaction>) {
        if txs.is_empty() {
            return;
        }
        match self.inner.lock() {
            Ok(mut pool) => {
                let newer = std::mem::replace(&mut *pool, txs);
                pool.extend(newer);
                self.arrived.notify_all();
            }
            Err(_) => {
                log::error!("Failed to acquire lock on memory pool");
            }
        }
    }

    /// Block until the pool is non-empty or `timeout` elapses.
    /// Returns whether transactions are pending.
    pub fn wait_for_transactions(&self, timeout: Duration) -> bool {
        let pool = match self.inner.lock() {
            Ok(pool) => pool,
            Err(_) => {
                log::error!("Failed to acquire lock on memory pool");
                return false;
            }
        };
        match self
            .arrived
            .wait_timeout_while(pool, timeout, |pool| pool.is_empty())
        {
            Ok((pool, _)) => !pool.is_empty(),
            Err(_) => false,
        }
    }

    pub fn get_all(&self) -> Vec<Transaction> {
        match self.inner.lock() {
            Ok(pool) => pool.clone(),
            Err(_) => {
                log::error!("Failed to acquire lock on memory pool");
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(pool) => pool.len(),
            Err(_) => {
                log::error!("Failed to acquire lock on memory pool");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn tx(value: i64) -> Transaction {
        Transaction::new("C1", "C2", value, value)
    }

    #[test]
    fn test_add_and_drain() {
        let pool = MemoryPool::new();
        pool.add(tx(1));
        pool.add(tx(2));
        assert_eq!(pool.len(), 2);

        let drained = pool.drain();
        assert_eq!(drained, vec![tx(1), tx(2)]);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_restore_keeps_older_first() {
        let pool = MemoryPool::new();
        pool.add(tx(1));
        let taken = pool.drain();
        pool.add(tx(2));
        pool.restore(taken);
        assert_eq!(pool.get_all(), vec![tx(1), tx(2)]);
    }

    #[test]
    fn test_wait_times_out_when_empty() {
        let pool = MemoryPool::new();
        assert!(!pool.wait_for_transactions(Duration::from_millis(20)));
    }

    #[test]
    fn test_wait_wakes_on_add() {
        let pool = Arc::new(MemoryPool::new());
        let producer = Arc::clone(&pool);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.add(tx(3));
        });
        assert!(pool.wait_for_transactions(Duration::from_secs(5)));
        handle.join().unwrap();
    }
}
