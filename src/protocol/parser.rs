//! Command Line Parser
//!
//! Turns one command line (without its `\r\n` terminator) into a typed
//! [`Command`]. Parsing is a pure function of the line; reading the line off
//! the socket and collecting a SET payload is the frame reader's job.
//!
//! ## Grammar
//!
//! ```text
//! get <key>
//! delete <key> [noreply]
//! touch <key> <exptime> [noreply]
//! set <key> <flags> <exptime> <bytes> [noreply]
//! ```
//!
//! Tokens are separated by single spaces and trimmed of surrounding spaces and
//! tabs. There is no quoting. Tokens past the end of the grammar are ignored.

use crate::protocol::types::{ErrorKind, Response};
use thiserror::Error;

/// The token that suppresses the reply to a storage command
const NOREPLY: &str = "noreply";

/// A parsed request.
///
/// Only the fields valid for each command exist on its variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `get <key>`
    Get { key: String },

    /// `set <key> <flags> <exptime> <bytes> [noreply]`, followed by a body of
    /// exactly `bytes` bytes and `\r\n`
    Set {
        key: String,
        flags: u32,
        exptime: u64,
        bytes: usize,
        noreply: bool,
    },

    /// `delete <key> [noreply]`
    Delete { key: String, noreply: bool },

    /// `touch <key> <exptime> [noreply]`
    Touch {
        key: String,
        exptime: u64,
        noreply: bool,
    },
}

impl Command {
    /// The command name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Get { .. } => "get",
            Command::Set { .. } => "set",
            Command::Delete { .. } => "delete",
            Command::Touch { .. } => "touch",
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Command::Get { key }
            | Command::Set { key, .. }
            | Command::Delete { key, .. }
            | Command::Touch { key, .. } => key,
        }
    }

    /// Number of payload bytes that follow the command line, if any.
    pub fn body_len(&self) -> Option<usize> {
        match self {
            Command::Set { bytes, .. } => Some(*bytes),
            _ => None,
        }
    }

    /// True if the client asked for no reply.
    pub fn noreply(&self) -> bool {
        match self {
            Command::Get { .. } => false,
            Command::Set { noreply, .. }
            | Command::Delete { noreply, .. }
            | Command::Touch { noreply, .. } => *noreply,
        }
    }
}

/// Errors that can occur while parsing a command line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The command line is empty
    #[error("empty command line")]
    Empty,

    /// The command name is not one we support
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A required field is absent
    #[error("{command} command lacks {field}")]
    MissingField {
        command: &'static str,
        field: &'static str,
    },

    /// A numeric field did not parse
    #[error("{command} command {field} should be an integer, got {value:?}")]
    InvalidInteger {
        command: &'static str,
        field: &'static str,
        value: String,
    },

    /// A negative exptime; only zero (never) or positive seconds are allowed
    #[error("invalid exptime argument: {0}")]
    NegativeExptime(i64),

    /// A negative payload length
    #[error("bad data chunk: negative length {0}")]
    NegativeLength(i64),

    /// The line is not valid UTF-8
    #[error("invalid UTF-8 in command line")]
    InvalidUtf8,
}

impl ParseError {
    /// The severity class of this error.
    ///
    /// Syntax faults are general errors; a syntactically valid but
    /// semantically invalid argument is a client error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::NegativeExptime(_) | ParseError::NegativeLength(_) => ErrorKind::Client,
            _ => ErrorKind::General,
        }
    }

    /// The response sent to the client for this error.
    pub fn response(&self) -> Response {
        match self {
            ParseError::NegativeExptime(_) => Response::client_error("invalid exptime argument"),
            ParseError::NegativeLength(_) => Response::client_error("bad data chunk"),
            other => Response::error(other.kind(), other.to_string()),
        }
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parses a single command line.
///
/// # Example
///
/// ```
/// use shardcache::protocol::{parse_command, Command};
///
/// let cmd = parse_command(b"touch foo 30").unwrap();
/// assert_eq!(
///     cmd,
///     Command::Touch { key: "foo".to_string(), exptime: 30, noreply: false }
/// );
/// ```
pub fn parse_command(line: &[u8]) -> ParseResult<Command> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8)?;
    let mut tokens = Tokens::new(line);

    let name = match tokens.next() {
        Some(name) => name,
        None => return Err(ParseError::Empty),
    };

    match name {
        "get" => {
            let key = tokens.required("get", "key")?;
            Ok(Command::Get { key })
        }
        "delete" => {
            let key = tokens.required("delete", "key")?;
            let noreply = tokens.noreply();
            Ok(Command::Delete { key, noreply })
        }
        "touch" => {
            let key = tokens.required("touch", "key")?;
            let exptime = tokens.exptime("touch")?;
            let noreply = tokens.noreply();
            Ok(Command::Touch {
                key,
                exptime,
                noreply,
            })
        }
        "set" => {
            let key = tokens.required("set", "key")?;
            let flags = tokens.integer::<u32>("set", "flags")?;
            let exptime = tokens.exptime("set")?;
            let bytes = tokens.integer::<i64>("set", "bytes")?;
            if bytes < 0 {
                return Err(ParseError::NegativeLength(bytes));
            }
            let bytes = usize::try_from(bytes).map_err(|_| ParseError::InvalidInteger {
                command: "set",
                field: "bytes",
                value: bytes.to_string(),
            })?;
            let noreply = tokens.noreply();
            Ok(Command::Set {
                key,
                flags,
                exptime,
                bytes,
                noreply,
            })
        }
        other => Err(ParseError::UnknownCommand(other.to_string())),
    }
}

/// Space-separated tokens of a command line.
///
/// Empty tokens (from repeated spaces) count as absent fields.
struct Tokens<'a> {
    inner: std::str::Split<'a, char>,
}

impl<'a> Tokens<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            inner: line.split(' '),
        }
    }

    fn next(&mut self) -> Option<&'a str> {
        self.inner
            .next()
            .map(|token| token.trim_matches(|c: char| c == ' ' || c == '\t'))
            .filter(|token| !token.is_empty())
    }

    fn required(&mut self, command: &'static str, field: &'static str) -> ParseResult<String> {
        self.next()
            .map(str::to_string)
            .ok_or(ParseError::MissingField { command, field })
    }

    fn integer<T: std::str::FromStr>(
        &mut self,
        command: &'static str,
        field: &'static str,
    ) -> ParseResult<T> {
        let token = self.next().ok_or(ParseError::MissingField { command, field })?;
        token.parse().map_err(|_| ParseError::InvalidInteger {
            command,
            field,
            value: token.to_string(),
        })
    }

    /// Exptime in seconds; negative values are rejected.
    fn exptime(&mut self, command: &'static str) -> ParseResult<u64> {
        let exptime = self.integer::<i64>(command, "exptime")?;
        u64::try_from(exptime).map_err(|_| ParseError::NegativeExptime(exptime))
    }

    fn noreply(&mut self) -> bool {
        self.next() == Some(NOREPLY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get() {
        assert_eq!(
            parse_command(b"get foo").unwrap(),
            Command::Get {
                key: "foo".to_string()
            }
        );
    }

    #[test]
    fn test_parse_set() {
        let cmd = parse_command(b"set foo 5 60 3").unwrap();
        assert_eq!(
            cmd,
            Command::Set {
                key: "foo".to_string(),
                flags: 5,
                exptime: 60,
                bytes: 3,
                noreply: false,
            }
        );
        assert_eq!(cmd.body_len(), Some(3));
        assert_eq!(cmd.name(), "set");
        assert_eq!(cmd.key(), "foo");
    }

    #[test]
    fn test_parse_delete_and_touch() {
        assert_eq!(
            parse_command(b"delete foo").unwrap(),
            Command::Delete {
                key: "foo".to_string(),
                noreply: false
            }
        );
        let touch = parse_command(b"touch foo 0").unwrap();
        assert_eq!(
            touch,
            Command::Touch {
                key: "foo".to_string(),
                exptime: 0,
                noreply: false
            }
        );
        assert_eq!(touch.body_len(), None);
    }

    #[test]
    fn test_parse_noreply() {
        assert!(parse_command(b"set k 0 0 1 noreply").unwrap().noreply());
        assert!(parse_command(b"delete k noreply").unwrap().noreply());
        assert!(parse_command(b"touch k 10 noreply").unwrap().noreply());
        assert!(!parse_command(b"delete k whatever").unwrap().noreply());
        assert!(!parse_command(b"get k noreply").unwrap().noreply());
    }

    #[test]
    fn test_tokens_are_trimmed() {
        // Tabs are trimmed, not split on
        assert_eq!(
            parse_command(b"get\tfoo").unwrap_err(),
            ParseError::UnknownCommand("get\tfoo".to_string())
        );
        assert_eq!(
            parse_command(b"get  foo").unwrap_err(),
            ParseError::MissingField {
                command: "get",
                field: "key"
            }
        );
        assert_eq!(
            parse_command(b"\tget foo\t").unwrap(),
            Command::Get {
                key: "foo".to_string()
            }
        );
    }

    #[test]
    fn test_extra_tokens_ignored() {
        assert_eq!(
            parse_command(b"get foo bar").unwrap(),
            Command::Get {
                key: "foo".to_string()
            }
        );
    }

    #[test]
    fn test_missing_fields() {
        let cases: &[(&[u8], &'static str, &'static str)] = &[
            (b"get", "get", "key"),
            (b"delete", "delete", "key"),
            (b"touch foo", "touch", "exptime"),
            (b"touch", "touch", "key"),
            (b"set foo", "set", "flags"),
            (b"set foo 0", "set", "exptime"),
            (b"set foo 0 0", "set", "bytes"),
        ];

        for &(line, command, field) in cases {
            assert_eq!(
                parse_command(line).unwrap_err(),
                ParseError::MissingField { command, field },
                "line {:?}",
                String::from_utf8_lossy(line)
            );
        }
    }

    #[test]
    fn test_non_integer_fields() {
        for line in [
            &b"set foo x 0 3"[..],
            b"set foo 0 x 3",
            b"set foo 0 0 x",
            b"set foo -1 0 3",
            b"touch foo soon",
        ] {
            let err = parse_command(line).unwrap_err();
            assert!(matches!(err, ParseError::InvalidInteger { .. }), "{:?}", err);
            assert_eq!(err.response(), Response::Error);
        }
    }

    #[test]
    fn test_negative_exptime_is_client_error() {
        let err = parse_command(b"set foo 0 -1 3").unwrap_err();
        assert_eq!(err, ParseError::NegativeExptime(-1));
        assert_eq!(err.kind(), ErrorKind::Client);
        assert_eq!(
            err.response(),
            Response::client_error("invalid exptime argument")
        );

        let err = parse_command(b"touch foo -5").unwrap_err();
        assert_eq!(err, ParseError::NegativeExptime(-5));
    }

    #[test]
    fn test_negative_length_is_client_error() {
        let err = parse_command(b"set foo 0 0 -3").unwrap_err();
        assert_eq!(err, ParseError::NegativeLength(-3));
        assert_eq!(err.response(), Response::client_error("bad data chunk"));
    }

    #[test]
    fn test_unknown_command() {
        let err = parse_command(b"bogus").unwrap_err();
        assert_eq!(err, ParseError::UnknownCommand("bogus".to_string()));
        assert_eq!(err.response(), Response::Error);

        // Names are case-sensitive
        assert!(parse_command(b"GET foo").is_err());
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(parse_command(b"").unwrap_err(), ParseError::Empty);
        assert_eq!(parse_command(b"   ").unwrap_err(), ParseError::Empty);
    }

    #[test]
    fn test_invalid_utf8() {
        let err = parse_command(b"get \xff\xfe").unwrap_err();
        assert_eq!(err, ParseError::InvalidUtf8);
        assert_eq!(err.response(), Response::Error);
    }
}
