//! Thread-Safe Storage Engine with Lazy Expiry
//!
//! This module implements the in-memory [`Storage`] backend: a sharded
//! `HashMap` of typed values with TTL support.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Instead of one big lock, keys are spread over shards
//!    so writers to different keys rarely contend.
//! 2. **Lazy Expiry**: Expired values are hidden on every access and evicted
//!    when a writer (or `get`, after a lock upgrade) touches them.
//! 3. **Whole-Value Swaps**: `put` replaces the stored value in one step, so a
//!    reader sees either the old value or the new one, never a mix.
//! 4. **Store-Wide Lock**: `lock` takes every shard's write lock in index
//!    order. Single-key writers hold one shard at a time, so no cycle can form.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::error::Result;
use crate::storage::value::{Key, Value};
use crate::storage::{Storage, StorageGuard};
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockWriteGuard};
use tracing::trace;

/// Default number of shards.
pub const DEFAULT_SHARDS: usize = 64;

type Shard = RwLock<HashMap<Key, Value>>;

/// The in-memory storage engine.
///
/// Designed to be wrapped in an `Arc` and shared by every connection task.
///
/// # Example
///
/// ```
/// use nimbuskv::storage::{Storage, StorageEngine, Value};
///
/// let engine = StorageEngine::new();
///
/// engine
///     .put("session".to_string(), |_| Ok(Some(Value::string("abc123"))))
///     .unwrap();
/// assert!(engine.get("session").unwrap().is_some());
///
/// engine.delete("session").unwrap();
/// assert!(engine.get("session").unwrap().is_none());
/// ```
pub struct StorageEngine {
    shards: Vec<Shard>,

    /// Statistics: total get operations
    get_count: AtomicU64,

    /// Statistics: total put operations
    put_count: AtomicU64,

    /// Statistics: total delete operations
    del_count: AtomicU64,

    /// Statistics: expired values evicted
    expired_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates an engine with [`DEFAULT_SHARDS`] shards.
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Creates an engine with `count` shards (at least one).
    pub fn with_shards(count: usize) -> Self {
        let shards = (0..count.max(1)).map(|_| RwLock::new(HashMap::new())).collect();

        Self {
            shards,
            get_count: AtomicU64::new(0),
            put_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    /// Creates an engine pre-populated with `entries`, stored as given.
    ///
    /// Entries that are already expired are kept and hidden lazily like any
    /// other expired value.
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<Key>,
    {
        let mut engine = Self::new();
        for (key, value) in entries {
            let key = key.into();
            let index = engine.shard_index(&key);
            engine.shards[index]
                .get_mut()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .insert(key, value);
        }
        engine
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Determines which shard a key belongs to.
    #[inline]
    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    #[inline]
    fn shard(&self, key: &str) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Number of live keys.
    pub fn len(&self) -> Result<usize> {
        let mut count = 0;
        for shard in &self.shards {
            count += shard.read()?.values().filter(|v| !v.is_expired()).count();
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn stats(&self) -> StorageStats {
        StorageStats {
            get_ops: self.get_count.load(Ordering::Relaxed),
            put_ops: self.put_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }

    fn record_evicted(&self, count: u64) {
        if count > 0 {
            self.expired_count.fetch_add(count, Ordering::Relaxed);
        }
    }
}

/// Runs `updater` against the live value under `key` and commits the result.
fn update_entry<F>(data: &mut HashMap<Key, Value>, key: Key, updater: F) -> Result<()>
where
    F: FnOnce(Option<&Value>) -> Result<Option<Value>>,
{
    let current = data.get(&key).filter(|v| !v.is_expired());

    match updater(current)? {
        Some(value) => {
            data.insert(key, value);
        }
        None => {
            data.remove(&key);
        }
    }

    Ok(())
}

impl Storage for StorageEngine {
    type Guard<'a>
        = LockedStorage<'a>
    where
        Self: 'a;

    fn get(&self, key: &str) -> Result<Option<Value>> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.shard(key);

        // Fast path under the read lock
        {
            let data = shard.read()?;
            match data.get(key) {
                Some(value) if !value.is_expired() => return Ok(Some(value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: upgrade to a write lock and evict
        let mut data = shard.write()?;
        if let Some(value) = data.get(key) {
            // A writer may have replaced it between the two locks
            if !value.is_expired() {
                return Ok(Some(value.clone()));
            }
            data.remove(key);
            self.record_evicted(1);
            trace!(key = %key, "Evicted expired key");
        }

        Ok(None)
    }

    fn put<F>(&self, key: Key, updater: F) -> Result<()>
    where
        F: FnOnce(Option<&Value>) -> Result<Option<Value>>,
    {
        self.put_count.fetch_add(1, Ordering::Relaxed);

        let mut data = self.shard(&key).write()?;
        update_entry(&mut data, key, updater)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        self.shard(key).write()?.remove(key);
        Ok(())
    }

    fn all(&self) -> Result<HashMap<Key, Value>> {
        let mut entries = HashMap::new();

        for shard in &self.shards {
            let mut data = shard.write()?;
            let before = data.len();

            data.retain(|_, value| !value.is_expired());
            self.record_evicted((before - data.len()) as u64);

            entries.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        Ok(entries)
    }

    fn lock(&self) -> Result<LockedStorage<'_>> {
        let shards = self
            .shards
            .iter()
            .map(|shard| shard.write())
            .collect::<std::result::Result<Vec<_>, _>>()?;

        trace!(shards = shards.len(), "Store-wide lock acquired");

        Ok(LockedStorage {
            engine: self,
            shards,
        })
    }
}

/// Guard returned by [`StorageEngine::lock`]. Holds every shard's write lock.
pub struct LockedStorage<'a> {
    engine: &'a StorageEngine,
    shards: Vec<RwLockWriteGuard<'a, HashMap<Key, Value>>>,
}

impl StorageGuard for LockedStorage<'_> {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        self.engine.get_count.fetch_add(1, Ordering::Relaxed);

        let data = &self.shards[self.engine.shard_index(key)];
        Ok(data.get(key).filter(|v| !v.is_expired()).cloned())
    }

    fn put<F>(&mut self, key: Key, updater: F) -> Result<()>
    where
        F: FnOnce(Option<&Value>) -> Result<Option<Value>>,
    {
        self.engine.put_count.fetch_add(1, Ordering::Relaxed);

        let index = self.engine.shard_index(&key);
        update_entry(&mut self.shards[index], key, updater)
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.engine.del_count.fetch_add(1, Ordering::Relaxed);

        let index = self.engine.shard_index(key);
        self.shards[index].remove(key);
        Ok(())
    }
}

impl Drop for LockedStorage<'_> {
    fn drop(&mut self) {
        trace!("Store-wide lock released");
    }
}

/// Operation counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Total get operations
    pub get_ops: u64,
    /// Total put operations
    pub put_ops: u64,
    /// Total delete operations
    pub del_ops: u64,
    /// Total expired values evicted
    pub expired: u64,
}
