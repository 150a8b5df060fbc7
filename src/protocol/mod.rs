//! Text Protocol Implementation
//!
//! This module provides the memcached-style text protocol spoken by the server.
//!
//! ## Overview
//!
//! A request is one `\r\n`-terminated command line. A `set` line declares the
//! length of a payload which follows it, itself terminated by `\r\n`. Each
//! request gets exactly one response (unless it asked for `noreply`).
//!
//! ## Modules
//!
//! - `types`: Defines the `Response` enum and its serialization
//! - `parser`: Parser turning a command line into a typed `Command`
//!
//! ## Example
//!
//! ```
//! use shardcache::protocol::{parse_command, Command, Response};
//!
//! let cmd = parse_command(b"get foo").unwrap();
//! assert_eq!(cmd, Command::Get { key: "foo".to_string() });
//!
//! assert_eq!(Response::End.serialize(), b"END\r\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse_command, Command, ParseError, ParseResult};
pub use types::{ErrorKind, Response, CRLF};
