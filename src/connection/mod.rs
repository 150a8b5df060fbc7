//! Connection Handling
//!
//! This module turns a client byte stream into framed requests and drives
//! each connection's read-execute-respond loop. Every connection runs in its
//! own async task; all of them share one `CacheEngine`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (main.rs)                                │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept() + spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ FrameReader │───>│ Command     │───>│ Send resp   │      │
//! │  │ line + body │    │ Handler     │    │             │      │
//! │  └─────────────┘    └─────────────┘    └─────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `frame`: Reassembles command lines and SET payloads across partial reads
//! - `handler`: The per-connection loop and connection statistics
//!
//! ## Example
//!
//! ```ignore
//! use shardcache::connection::{handle_connection, ConnectionStats, FrameLimits};
//! use shardcache::commands::CommandHandler;
//! use shardcache::storage::CacheEngine;
//! use std::sync::Arc;
//!
//! let storage = Arc::new(CacheEngine::default());
//! let stats = Arc::new(ConnectionStats::new());
//! let handler = CommandHandler::new(storage);
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler, stats, FrameLimits::default()));
//! ```

pub mod frame;
pub mod handler;

// Re-export commonly used types
pub use frame::{Frame, FrameError, FrameLimits, FrameReader};
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
