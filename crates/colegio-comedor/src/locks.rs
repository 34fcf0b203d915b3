//! Per-key async locks.
//!
//! Check-then-write sequences on one (institution, term, student) key run
//! under that key's mutex. Distinct keys never contend. Entries are
//! dropped from the table once no task holds or waits on them.

use std::sync::Arc;

use colegio_core::models::meal_benefit::MealKey;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<MealKey, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: MealKey) -> KeyGuard<'_> {
        // Clone the mutex out so the shard is not held across the await.
        let mutex = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        KeyGuard {
            owner: self,
            key,
            guard: Some(guard),
        }
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Holds a key's lock until dropped.
#[derive(Debug)]
pub struct KeyGuard<'a> {
    owner: &'a KeyedLocks,
    key: MealKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // The table's own reference is the only one left when nobody else
        // holds or awaits this key.
        self.owner
            .locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;

    fn key() -> MealKey {
        MealKey::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
    }

    #[tokio::test]
    async fn released_keys_are_removed() {
        let locks = KeyedLocks::new();
        {
            let _guard = locks.lock(key()).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn distinct_keys_do_not_contend() {
        let locks = KeyedLocks::new();
        let _a = locks.lock(key()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock(key())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn same_key_waits_for_release() {
        let locks = Arc::new(KeyedLocks::new());
        let k = key();

        let first = locks.lock(k).await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.lock(k)).await;
        assert!(blocked.is_err());

        drop(first);
        let second = tokio::time::timeout(Duration::from_millis(100), locks.lock(k)).await;
        assert!(second.is_ok());
    }
}
