//! Text Protocol Response Types
//!
//! This module defines the responses the server sends back to clients.
//! Every response is one or more CRLF-terminated ASCII lines; a GET hit also
//! carries the raw value bytes.
//!
//! ## Protocol Format
//!
//! ```text
//! VALUE <key> <flags> <bytes> \r\n<data>\r\nEND\r\n   GET hit
//! END\r\n                                             GET miss
//! STORED\r\n                                          SET
//! DELETED\r\n | NOT_FOUND\r\n                         DELETE
//! TOUCHED\r\n | NOT_FOUND\r\n                         TOUCH
//! ERROR\r\n                                           malformed command
//! CLIENT_ERROR <msg>\r\n                              bad client input
//! SERVER_ERROR <msg>\r\n                              internal fault
//! ```
//!
//! The space after `<bytes>` on the VALUE line is part of the wire format
//! existing clients of this server expect.

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used by the protocol
pub const CRLF: &[u8] = b"\r\n";

/// Severity class of an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or unrecognized command syntax (`ERROR`)
    General,
    /// Well-formed but invalid input from the client (`CLIENT_ERROR`)
    Client,
    /// Failure executing a valid request (`SERVER_ERROR`)
    Server,
}

/// A response sent to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A GET hit
    Value { key: String, flags: u32, data: Bytes },

    /// End of a GET response; alone it means a miss
    End,

    /// SET succeeded
    Stored,

    /// DELETE removed the key
    Deleted,

    /// TOUCH updated the key
    Touched,

    /// DELETE or TOUCH on a key that does not exist
    NotFound,

    /// `ERROR`
    Error,

    /// `CLIENT_ERROR <msg>`
    ClientError(String),

    /// `SERVER_ERROR <msg>`
    ServerError(String),
}

impl Response {
    /// Creates a GET hit response.
    ///
    /// # Example
    /// ```
    /// use shardcache::protocol::types::Response;
    /// use bytes::Bytes;
    /// let hit = Response::value("foo", 0, Bytes::from("bar"));
    /// assert_eq!(hit.serialize(), b"VALUE foo 0 3 \r\nbar\r\nEND\r\n");
    /// ```
    pub fn value(key: impl Into<String>, flags: u32, data: impl Into<Bytes>) -> Self {
        Response::Value {
            key: key.into(),
            flags,
            data: data.into(),
        }
    }

    /// Creates a new `CLIENT_ERROR` response.
    pub fn client_error(msg: impl Into<String>) -> Self {
        Response::ClientError(msg.into())
    }

    /// Creates a new `SERVER_ERROR` response.
    pub fn server_error(msg: impl Into<String>) -> Self {
        Response::ServerError(msg.into())
    }

    /// Creates an error response of the given severity.
    ///
    /// `ERROR` carries no message, so `msg` is dropped for [`ErrorKind::General`].
    pub fn error(kind: ErrorKind, msg: impl Into<String>) -> Self {
        match kind {
            ErrorKind::General => Response::Error,
            ErrorKind::Client => Response::ClientError(msg.into()),
            ErrorKind::Server => Response::ServerError(msg.into()),
        }
    }

    /// Serializes the response to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the response into an existing buffer.
    ///
    /// This is more efficient than `serialize()` when you want to reuse a buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Response::Value { key, flags, data } => {
                buf.reserve(key.len() + data.len() + 32);
                buf.extend_from_slice(b"VALUE ");
                buf.extend_from_slice(key.as_bytes());
                buf.push(b' ');
                buf.extend_from_slice(flags.to_string().as_bytes());
                buf.push(b' ');
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.push(b' ');
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(b"END");
                buf.extend_from_slice(CRLF);
            }
            Response::ClientError(msg) => {
                buf.extend_from_slice(b"CLIENT_ERROR ");
                buf.extend_from_slice(msg.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Response::ServerError(msg) => {
                buf.extend_from_slice(b"SERVER_ERROR ");
                buf.extend_from_slice(msg.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            simple => {
                buf.extend_from_slice(simple.status_line().as_bytes());
                buf.extend_from_slice(CRLF);
            }
        }
    }

    /// The leading keyword of the response.
    fn status_line(&self) -> &'static str {
        match self {
            Response::Value { .. } => "VALUE",
            Response::End => "END",
            Response::Stored => "STORED",
            Response::Deleted => "DELETED",
            Response::Touched => "TOUCHED",
            Response::NotFound => "NOT_FOUND",
            Response::Error => "ERROR",
            Response::ClientError(_) => "CLIENT_ERROR",
            Response::ServerError(_) => "SERVER_ERROR",
        }
    }

    /// Returns the error class if this is an error response.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Response::Error => Some(ErrorKind::General),
            Response::ClientError(_) => Some(ErrorKind::Client),
            Response::ServerError(_) => Some(ErrorKind::Server),
            _ => None,
        }
    }

    /// Returns true if this value is an error.
    pub fn is_error(&self) -> bool {
        self.error_kind().is_some()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Value { key, flags, data } => {
                write!(f, "VALUE {} {} {}", key, flags, data.len())
            }
            Response::ClientError(msg) | Response::ServerError(msg) => {
                write!(f, "{} {}", self.status_line(), msg)
            }
            other => f.write_str(other.status_line()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_serialize() {
        let value = Response::value("foo", 0, Bytes::from("bar"));
        assert_eq!(value.serialize(), b"VALUE foo 0 3 \r\nbar\r\nEND\r\n");
    }

    #[test]
    fn test_value_binary_data() {
        let value = Response::value("bin", 65535, Bytes::from(&b"a\r\n\x00b"[..]));
        assert_eq!(
            value.serialize(),
            b"VALUE bin 65535 5 \r\na\r\n\x00b\r\nEND\r\n"
        );
    }

    #[test]
    fn test_empty_value_serialize() {
        let value = Response::value("empty", 1, Bytes::new());
        assert_eq!(value.serialize(), b"VALUE empty 1 0 \r\n\r\nEND\r\n");
    }

    #[test]
    fn test_status_lines() {
        assert_eq!(Response::End.serialize(), b"END\r\n");
        assert_eq!(Response::Stored.serialize(), b"STORED\r\n");
        assert_eq!(Response::Deleted.serialize(), b"DELETED\r\n");
        assert_eq!(Response::Touched.serialize(), b"TOUCHED\r\n");
        assert_eq!(Response::NotFound.serialize(), b"NOT_FOUND\r\n");
        assert_eq!(Response::Error.serialize(), b"ERROR\r\n");
    }

    #[test]
    fn test_error_serialize() {
        assert_eq!(
            Response::client_error("bad data chunk").serialize(),
            b"CLIENT_ERROR bad data chunk\r\n"
        );
        assert_eq!(
            Response::server_error("out of memory").serialize(),
            b"SERVER_ERROR out of memory\r\n"
        );
    }

    #[test]
    fn test_error_by_kind() {
        assert_eq!(Response::error(ErrorKind::General, "ignored"), Response::Error);
        assert_eq!(
            Response::error(ErrorKind::Client, "x"),
            Response::ClientError("x".to_string())
        );
        assert_eq!(
            Response::error(ErrorKind::Server, "y").error_kind(),
            Some(ErrorKind::Server)
        );
        assert!(!Response::Stored.is_error());
    }

    #[test]
    fn test_serialize_into_appends() {
        let mut buf = b"STORED\r\n".to_vec();
        Response::End.serialize_into(&mut buf);
        assert_eq!(buf, b"STORED\r\nEND\r\n");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Response::value("k", 2, Bytes::from("abc")).to_string(),
            "VALUE k 2 3"
        );
        assert_eq!(Response::NotFound.to_string(), "NOT_FOUND");
        assert_eq!(
            Response::client_error("line too long").to_string(),
            "CLIENT_ERROR line too long"
        );
    }
}
