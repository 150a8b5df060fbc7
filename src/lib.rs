//! # shardcache - A Sharded In-Memory Cache
//!
//! shardcache is an in-memory cache server speaking a subset of the memcached
//! text protocol. Values live in a fixed number of independently locked
//! shards, each bounded by an LRU eviction policy, with sliding TTL expiry.
//!
//! ## Features
//!
//! - **memcached text protocol**: `get`, `set`, `delete` and `touch`, with `noreply`
//! - **Sharded Storage**: FNV-1 hash routing over per-shard mutexes
//! - **LRU Eviction**: every shard holds a bounded number of entries
//! - **Sliding TTL**: every read restarts an entry's expiry window
//! - **Async I/O**: Built on Tokio for handling thousands of concurrent connections
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             shardcache                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐    │
//! │  │ FrameReader │    │              CacheEngine                     │    │
//! │  │ + Parser    │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │    │
//! │  │             │    │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │    │
//! │  └─────────────┘    │  │Mutex   │ │Mutex   │ │Mutex   │ │shards  │ │    │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │    │
//! │                     └──────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use shardcache::commands::CommandHandler;
//! use shardcache::connection::{handle_connection, ConnectionStats, FrameLimits};
//! use shardcache::storage::CacheEngine;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = Arc::new(CacheEngine::default());
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:3333").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let handler = CommandHandler::new(Arc::clone(&storage));
//!         let stats = Arc::clone(&stats);
//!
//!         tokio::spawn(handle_connection(stream, addr, handler, stats, FrameLimits::default()));
//!     }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: Command line parser and response types
//! - [`storage`]: Sharded cache engine with LRU eviction and TTL support
//! - [`commands`]: Executes requests against the engine
//! - [`connection`]: Request framing and client connection management
//! - [`config`]: Command-line configuration
//!
//! ## Design Highlights
//!
//! ### No Locks Across I/O
//!
//! The engine API is synchronous. A shard lock is taken, the map and LRU list
//! are updated, and the lock is released before any response is written.
//!
//! ### Lazy Expiry
//!
//! Expired entries are detected and purged when they are next touched by any
//! operation. Until then they still occupy a slot and can be evicted by LRU.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use config::{CliAction, Config, ConfigError};
pub use connection::{handle_connection, ConnectionStats, FrameLimits};
pub use protocol::{parse_command, Command, ParseError, Response};
pub use storage::{CacheEngine, EngineConfig, EngineError};

/// The default port shardcache listens on
pub const DEFAULT_PORT: u16 = 3333;

/// The default host shardcache binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of shardcache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
