//! Command Handler Module
//!
//! This module executes framed requests against the cache engine and
//! renders the protocol response.
//!
//! ## Supported Commands
//!
//! - `get <key>` - `VALUE ... END` on a hit, `END` on a miss
//! - `set <key> <flags> <exptime> <bytes> [noreply]` - `STORED`
//! - `delete <key> [noreply]` - `DELETED` or `NOT_FOUND`
//! - `touch <key> <exptime> [noreply]` - `TOUCHED` or `NOT_FOUND`
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │   Frame     │───>│  dispatch() │───>│  Response   │      │
//! │  └─────────────┘    └─────────────┘    └─────────────┘      │
//! │                            │                                │
//! │                            ▼                                │
//! │                       CacheEngine                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::connection::frame::Frame;
use crate::protocol::{Command, Response};
use crate::storage::{CacheEngine, EngineError};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{error, trace};

/// Executes requests against a shared [`CacheEngine`].
#[derive(Clone, Debug)]
pub struct CommandHandler {
    /// The cache engine
    storage: Arc<CacheEngine>,
}

impl CommandHandler {
    /// Creates a new command handler with the given engine.
    pub fn new(storage: Arc<CacheEngine>) -> Self {
        Self { storage }
    }

    /// The engine this handler executes against.
    pub fn storage(&self) -> &Arc<CacheEngine> {
        &self.storage
    }

    /// Executes a request and returns the response to send.
    ///
    /// Returns `None` when the client asked for `noreply` and the command
    /// succeeded or missed. Errors are always returned.
    pub fn execute(&self, frame: Frame) -> Option<Response> {
        let noreply = frame.command.noreply();

        let response = self.dispatch(frame).unwrap_or_else(|e| {
            error!(error = %e, "engine failure");
            Response::server_error(e.to_string())
        });

        if noreply && !response.is_error() {
            trace!(response = %response, "reply suppressed");
            None
        } else {
            Some(response)
        }
    }

    /// Dispatches a request to its handler.
    fn dispatch(&self, frame: Frame) -> Result<Response, EngineError> {
        let Frame { command, body } = frame;

        match command {
            Command::Get { key } => self.cmd_get(key),
            Command::Set {
                key,
                flags,
                exptime,
                ..
            } => self.cmd_set(&key, body, exptime, flags),
            Command::Delete { key, .. } => self.cmd_delete(&key),
            Command::Touch { key, exptime, .. } => self.cmd_touch(&key, exptime),
        }
    }

    /// GET key
    fn cmd_get(&self, key: String) -> Result<Response, EngineError> {
        Ok(match self.storage.get(&key)? {
            Some((data, flags)) => Response::Value { key, flags, data },
            None => Response::End,
        })
    }

    /// SET key flags exptime bytes
    fn cmd_set(&self, key: &str, body: Bytes, exptime: u64, flags: u32) -> Result<Response, EngineError> {
        self.storage.set(key, body, exptime, flags)?;
        Ok(Response::Stored)
    }

    /// DELETE key
    fn cmd_delete(&self, key: &str) -> Result<Response, EngineError> {
        Ok(if self.storage.delete(key)? {
            Response::Deleted
        } else {
            Response::NotFound
        })
    }

    /// TOUCH key exptime
    fn cmd_touch(&self, key: &str, exptime: u64) -> Result<Response, EngineError> {
        Ok(if self.storage.touch(key, exptime)? {
            Response::Touched
        } else {
            Response::NotFound
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_command;
    use crate::storage::EngineConfig;

    fn create_handler() -> CommandHandler {
        let storage = Arc::new(CacheEngine::new(EngineConfig::default()));
        CommandHandler::new(storage)
    }

    fn make_frame(line: &str, body: &str) -> Frame {
        let command = parse_command(line.as_bytes()).unwrap();
        Frame::with_body(command, Bytes::from(body.to_string()))
    }

    fn run(handler: &CommandHandler, line: &str) -> Option<Response> {
        handler.execute(make_frame(line, ""))
    }

    #[test]
    fn test_set_get() {
        let handler = create_handler();

        let response = handler.execute(make_frame("set foo 5 0 3", "bar"));
        assert_eq!(response, Some(Response::Stored));

        let response = run(&handler, "get foo");
        assert_eq!(response, Some(Response::value("foo", 5, Bytes::from("bar"))));
    }

    #[test]
    fn test_get_nonexistent() {
        let handler = create_handler();
        assert_eq!(run(&handler, "get nonexistent"), Some(Response::End));
    }

    #[test]
    fn test_delete() {
        let handler = create_handler();

        handler.execute(make_frame("set key 0 0 5", "value"));
        assert_eq!(run(&handler, "delete key"), Some(Response::Deleted));
        assert_eq!(run(&handler, "delete key"), Some(Response::NotFound));
        assert_eq!(run(&handler, "get key"), Some(Response::End));
    }

    #[test]
    fn test_touch() {
        let handler = create_handler();

        assert_eq!(run(&handler, "touch key 10"), Some(Response::NotFound));

        handler.execute(make_frame("set key 3 0 5", "value"));
        assert_eq!(run(&handler, "touch key 10"), Some(Response::Touched));
        assert_eq!(
            run(&handler, "get key"),
            Some(Response::value("key", 3, Bytes::from("value")))
        );
        assert_eq!(handler.storage().stats().touches, 1);
    }

    #[test]
    fn test_noreply_suppresses_response() {
        let handler = create_handler();

        assert_eq!(handler.execute(make_frame("set k 0 0 1 noreply", "v")), None);
        assert_eq!(run(&handler, "touch k 5 noreply"), None);
        assert_eq!(run(&handler, "delete k noreply"), None);
        assert_eq!(run(&handler, "delete k noreply"), None);
        assert_eq!(run(&handler, "get k"), Some(Response::End));
    }

    #[test]
    fn test_overwrite() {
        let handler = create_handler();

        handler.execute(make_frame("set k 1 0 3", "one"));
        handler.execute(make_frame("set k 2 0 3", "two"));
        assert_eq!(
            run(&handler, "get k"),
            Some(Response::value("k", 2, Bytes::from("two")))
        );
    }

    #[test]
    fn test_engine_failure_is_server_error() {
        let handler = create_handler();
        handler.storage().poison_shard_of("k");

        let shard = crate::storage::router::shard_index(b"k", 1024);
        assert_eq!(
            run(&handler, "get k"),
            Some(Response::server_error(format!(
                "shard {} lock poisoned",
                shard
            )))
        );

        // Errors are sent even with noreply
        let response = run(&handler, "delete k noreply");
        assert!(matches!(response, Some(Response::ServerError(_))));
    }
}
