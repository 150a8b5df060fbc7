//! Storage Engine Module
//!
//! This module provides the cache engine: a fixed number of independently
//! locked shards, each a bounded map with LRU eviction and lazy TTL expiry.
//!
//! ## Architecture
//!
//! ```text
//!                 key
//!                  │
//!                  ▼
//!        ┌───────────────────┐
//!        │  router (FNV-1)   │   hash32(key) % N
//!        └─────────┬─────────┘
//!                  │
//!                  ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CacheEngine                             │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐            │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ ...N    │            │
//! │  │ Mutex   │ │ Mutex   │ │ Mutex   │ │ shards  │            │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Sharded Storage**: independent shards reduce lock contention
//! - **LRU Eviction**: each shard is bounded and evicts its least recently used entry
//! - **Sliding TTL**: every read restarts an entry's expiry window
//! - **Lazy Expiry**: expired keys are cleaned on access, there is no sweeper
//!
//! ## Example
//!
//! ```
//! use shardcache::storage::{CacheEngine, EngineConfig};
//! use bytes::Bytes;
//!
//! let engine = CacheEngine::new(EngineConfig { shards: 16, shard_capacity: 128 });
//!
//! engine.set("session", Bytes::from("token123"), 3600, 0).unwrap();
//! assert!(engine.touch("session", 60).unwrap());
//! ```

pub mod engine;
pub mod lru;
pub mod router;
pub mod shard;

// Re-export commonly used types
pub use engine::{CacheEngine, EngineConfig, EngineError, EngineResult, EngineStats};
pub use shard::{Entry, Shard};
