//! Thread-Safe Sharded Cache Engine
//!
//! This module implements the cache engine: a fixed array of shards, each
//! guarded by its own mutex, with keys routed to shards by hash.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Instead of one big lock, every shard has its own `Mutex`.
//!    Keys in different shards never contend.
//! 2. **Exclusive Locks Only**: A read promotes the key in the LRU order and
//!    slides its expiry, so every operation mutates and a `RwLock` buys nothing.
//! 3. **Lazy Expiry**: Expired keys are discovered and purged on access only.
//! 4. **Bounded Shards**: Each shard holds at most `shard_capacity` entries and
//!    evicts its least recently used entry to stay within that bound.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CacheEngine                             │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐            │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │            │
//! │  │ Mutex   │ │ Mutex   │ │ Mutex   │ │ Mutex   │            │
//! │  │ Map+LRU │ │ Map+LRU │ │ Map+LRU │ │ Map+LRU │            │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each operation locks exactly one shard, and only for the in-memory map and
//! list update. The API is synchronous, so a lock can never be held across an
//! `.await` or any I/O.

use crate::storage::router::shard_index;
use crate::storage::shard::{Lookup, Presence, Shard};
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use thiserror::Error;
use tracing::trace;

/// Default number of shards.
pub const DEFAULT_SHARDS: usize = 1024;

/// Default maximum number of entries per shard.
pub const DEFAULT_SHARD_CAPACITY: usize = 1024;

/// Errors raised by the engine.
///
/// The cache operations themselves are total; the only failure is an
/// internal one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A thread panicked while holding this shard's lock
    #[error("shard {shard} lock poisoned")]
    ShardPoisoned { shard: usize },
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of independently locked shards
    pub shards: usize,
    /// Maximum entries per shard
    pub shard_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            shard_capacity: DEFAULT_SHARD_CAPACITY,
        }
    }
}

/// The cache engine.
///
/// # Thread Safety
///
/// This struct is designed to be wrapped in an `Arc` and shared across
/// all connection tasks. All operations are thread-safe.
///
/// # Example
///
/// ```
/// use shardcache::storage::{CacheEngine, EngineConfig};
/// use bytes::Bytes;
///
/// let engine = CacheEngine::new(EngineConfig::default());
///
/// engine.set("name", Bytes::from("Ariz"), 0, 7).unwrap();
/// assert_eq!(engine.get("name").unwrap(), Some((Bytes::from("Ariz"), 7)));
///
/// assert!(engine.delete("name").unwrap());
/// assert_eq!(engine.get("name").unwrap(), None);
/// ```
pub struct CacheEngine {
    shards: Vec<Mutex<Shard>>,
    shard_capacity: usize,

    /// Statistics: GETs that found a live entry
    get_hits: AtomicU64,

    /// Statistics: GETs that found nothing (including expired entries)
    get_misses: AtomicU64,

    /// Statistics: total SET operations
    set_count: AtomicU64,

    /// Statistics: DELETEs that removed a live entry
    delete_count: AtomicU64,

    /// Statistics: TOUCHes that found a live entry
    touch_count: AtomicU64,

    /// Statistics: entries evicted to respect shard capacity
    eviction_count: AtomicU64,

    /// Statistics: expired entries purged on access
    expired_count: AtomicU64,
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("shards", &self.shards.len())
            .field("shard_capacity", &self.shard_capacity)
            .field("get_hits", &self.get_hits.load(Ordering::Relaxed))
            .field("get_misses", &self.get_misses.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for CacheEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl CacheEngine {
    /// Creates an engine with `config.shards` empty shards.
    ///
    /// A shard count of zero is bumped to one.
    pub fn new(config: EngineConfig) -> Self {
        let shards = (0..config.shards.max(1))
            .map(|_| Mutex::new(Shard::new(config.shard_capacity)))
            .collect();

        Self {
            shards,
            shard_capacity: config.shard_capacity,
            get_hits: AtomicU64::new(0),
            get_misses: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            delete_count: AtomicU64::new(0),
            touch_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Maximum entries per shard.
    pub fn shard_capacity(&self) -> usize {
        self.shard_capacity
    }

    /// Locks the shard that owns `key`.
    #[inline]
    fn lock_shard(&self, key: &str) -> EngineResult<MutexGuard<'_, Shard>> {
        let index = shard_index(key.as_bytes(), self.shards.len());
        self.shards[index]
            .lock()
            .map_err(|_| EngineError::ShardPoisoned { shard: index })
    }

    /// Gets the value and flags stored under `key`.
    ///
    /// A hit refreshes the entry's expiry window and marks it most recently
    /// used. An expired entry is purged and reported as a miss.
    pub fn get(&self, key: &str) -> EngineResult<Option<(Bytes, u32)>> {
        let lookup = self.lock_shard(key)?.get(key, Instant::now());

        match lookup {
            Lookup::Hit { value, flags } => {
                self.get_hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some((value, flags)))
            }
            Lookup::Miss => {
                self.get_misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Lookup::Expired => {
                trace!(key = %key, "expired on read");
                self.get_misses.fetch_add(1, Ordering::Relaxed);
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    /// Stores `value` under `key`.
    ///
    /// `ttl` is in seconds (0 = never expires). The engine takes ownership of
    /// `value`; `Bytes` is immutable, so neither the caller nor a later reader
    /// can change what is stored.
    ///
    /// # Returns
    ///
    /// Returns `true` if a new key was created, `false` if an existing key was updated.
    pub fn set(&self, key: &str, value: Bytes, ttl: u64, flags: u32) -> EngineResult<bool> {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let stored = self
            .lock_shard(key)?
            .set(key, value, ttl, flags, Instant::now());

        if stored.evicted > 0 {
            trace!(key = %key, evicted = stored.evicted, "evicted to make room");
            self.eviction_count
                .fetch_add(stored.evicted as u64, Ordering::Relaxed);
        }

        Ok(stored.inserted)
    }

    /// Copies `value` into the cache. Later changes to the caller's buffer
    /// are not observed.
    pub fn set_from_slice(&self, key: &str, value: &[u8], ttl: u64, flags: u32) -> EngineResult<bool> {
        self.set(key, Bytes::copy_from_slice(value), ttl, flags)
    }

    /// Deletes `key`.
    ///
    /// # Returns
    ///
    /// Returns `true` if the key was deleted, `false` if it didn't exist.
    pub fn delete(&self, key: &str) -> EngineResult<bool> {
        let presence = self.lock_shard(key)?.delete(key, Instant::now());
        Ok(self.count_presence(presence, &self.delete_count))
    }

    /// Sets a new ttl on `key` without changing its value.
    ///
    /// # Returns
    ///
    /// Returns `true` if the key was found, `false` if it didn't exist.
    pub fn touch(&self, key: &str, ttl: u64) -> EngineResult<bool> {
        let presence = self.lock_shard(key)?.touch(key, ttl, Instant::now());
        Ok(self.count_presence(presence, &self.touch_count))
    }

    fn count_presence(&self, presence: Presence, counter: &AtomicU64) -> bool {
        match presence {
            Presence::Found => {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            Presence::Expired => {
                self.expired_count.fetch_add(1, Ordering::Relaxed);
            }
            Presence::Absent => {}
        }
        presence.is_found()
    }

    /// Returns the number of entries, including expired ones not yet purged.
    ///
    /// Shards are locked one at a time, so the count is approximate under
    /// concurrent writes. A poisoned shard is skipped.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .filter_map(|shard| shard.lock().ok().map(|s| s.len()))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns engine statistics.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            entries: self.len() as u64,
            get_hits: self.get_hits.load(Ordering::Relaxed),
            get_misses: self.get_misses.load(Ordering::Relaxed),
            sets: self.set_count.load(Ordering::Relaxed),
            deletes: self.delete_count.load(Ordering::Relaxed),
            touches: self.touch_count.load(Ordering::Relaxed),
            evictions: self.eviction_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }

    /// Poisons the shard that owns `key` by panicking while holding its lock.
    #[cfg(test)]
    pub(crate) fn poison_shard_of(&self, key: &str) {
        std::thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = self.lock_shard(key);
                    panic!("poisoning shard");
                })
                .join();
        });
    }
}

/// Engine statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Entries currently stored
    pub entries: u64,
    pub get_hits: u64,
    pub get_misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub touches: u64,
    pub evictions: u64,
    pub expired: u64,
}
