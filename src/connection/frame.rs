//! Request Framing
//!
//! TCP is a byte stream: one read may return half a command line, a command
//! line plus part of its payload, or several requests at once. The
//! [`FrameReader`] accumulates bytes in a `BytesMut` buffer and cuts complete
//! requests out of it.
//!
//! ## State Machine
//!
//! ```text
//!                 ┌──────────────────────┐
//!      ┌─────────>│ AwaitingCommandLine  │──── get / delete / touch ───> frame
//!      │          └──────────┬───────────┘
//!      │                     │ set <key> <flags> <exptime> <bytes>
//!      │                     ▼
//!      │          ┌──────────────────────┐
//!      │          │ AwaitingBody         │  read until <bytes> + "\r\n"
//!      │          └──────────┬───────────┘
//!      │                     │
//!      └──── dispatched <────┘ frame
//!
//!   any error ───> Closed (terminal)
//! ```
//!
//! A frame is handed out only once it is complete. Every byte read is kept in
//! the buffer until it has been consumed by a frame, so bytes that arrive
//! ahead of time (a pipelined next request) are kept for the next call.

use crate::protocol::{parse_command, Command, ParseError, Response, CRLF};
use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

/// Maximum length of a command line, excluding its terminator
pub const MAX_LINE_LENGTH: usize = 512;

/// Maximum size of a stored value (1 MiB)
pub const MAX_VALUE_SIZE: usize = 1024 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Size limits enforced while framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    /// Longest accepted command line, excluding `\r\n`
    pub max_line: usize,
    /// Largest accepted SET payload
    pub max_value: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_line: MAX_LINE_LENGTH,
            max_value: MAX_VALUE_SIZE,
        }
    }
}

/// A complete request: the command and, for SET, its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    /// The payload; empty for commands that carry none
    pub body: Bytes,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            body: Bytes::new(),
        }
    }

    pub fn with_body(command: Command, body: Bytes) -> Self {
        Self { command, body }
    }
}

/// Errors that end a connection while framing.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("command line exceeds {max} bytes")]
    LineTooLong { max: usize },

    #[error("stream closed in the middle of a command line")]
    IncompleteLine,

    #[error("stream closed after {received} of {expected} payload bytes")]
    IncompleteBody { expected: usize, received: usize },

    #[error("payload not followed by CRLF")]
    BadDataChunk,

    #[error("payload of {size} bytes exceeds limit of {max}")]
    ValueTooLarge { size: usize, max: usize },

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("frame reader is closed")]
    Closed,
}

impl FrameError {
    /// The response to send before closing, if any.
    pub fn response(&self) -> Option<Response> {
        match self {
            FrameError::Io(_) => Some(Response::client_error("command read error")),
            FrameError::LineTooLong { .. } => Some(Response::client_error("line too long")),
            FrameError::IncompleteLine => Some(Response::client_error("incomplete command line")),
            FrameError::IncompleteBody { .. } => {
                Some(Response::client_error("incomplete command message"))
            }
            FrameError::BadDataChunk => Some(Response::client_error("bad data chunk")),
            FrameError::ValueTooLarge { .. } => {
                Some(Response::client_error("object too large for cache"))
            }
            FrameError::Parse(e) => Some(e.response()),
            FrameError::Closed => None,
        }
    }
}

#[derive(Debug)]
enum ReadState {
    AwaitingCommandLine,
    AwaitingBody { command: Command, len: usize },
    Closed,
}

/// Per-connection framing state.
#[derive(Debug)]
pub struct FrameReader {
    buffer: BytesMut,
    state: ReadState,
    limits: FrameLimits,
    total_read: u64,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new(FrameLimits::default())
    }
}

impl FrameReader {
    pub fn new(limits: FrameLimits) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            state: ReadState::AwaitingCommandLine,
            limits,
            total_read: 0,
        }
    }

    /// Bytes read but not yet consumed by a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Total bytes read from the stream so far.
    pub fn total_read(&self) -> u64 {
        self.total_read
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ReadState::Closed)
    }

    /// Reads the next complete request from `reader`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(frame))` - A complete request
    /// - `Ok(None)` - The peer closed the stream cleanly between requests
    /// - `Err(e)` - A framing, parse or I/O error; the reader is now closed
    ///
    /// Dropping the returned future part way through also leaves the reader
    /// closed.
    pub async fn read_frame<R>(&mut self, reader: &mut R) -> Result<Option<Frame>, FrameError>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            // Anything that bails out of this loop early leaves the state Closed
            match std::mem::replace(&mut self.state, ReadState::Closed) {
                ReadState::Closed => return Err(FrameError::Closed),

                ReadState::AwaitingCommandLine => {
                    if let Some(line) = self.take_line()? {
                        let command = parse_command(&line)?;
                        trace!(command = command.name(), key = command.key(), "parsed command line");

                        match command.body_len() {
                            Some(len) if len > self.limits.max_value => {
                                return Err(FrameError::ValueTooLarge {
                                    size: len,
                                    max: self.limits.max_value,
                                });
                            }
                            Some(len) => {
                                self.state = ReadState::AwaitingBody { command, len };
                            }
                            None => {
                                self.state = ReadState::AwaitingCommandLine;
                                return Ok(Some(Frame::new(command)));
                            }
                        }
                        continue;
                    }

                    if self.fill(reader, 0).await? == 0 {
                        if self.buffer.is_empty() {
                            return Ok(None);
                        }
                        return Err(FrameError::IncompleteLine);
                    }
                    self.state = ReadState::AwaitingCommandLine;
                }

                ReadState::AwaitingBody { command, len } => {
                    if let Some(body) = self.take_body(len)? {
                        self.state = ReadState::AwaitingCommandLine;
                        return Ok(Some(Frame::with_body(command, body)));
                    }

                    let wanted = len + CRLF.len() - self.buffer.len();
                    if self.fill(reader, wanted).await? == 0 {
                        return Err(FrameError::IncompleteBody {
                            expected: len,
                            received: self.buffer.len().min(len),
                        });
                    }
                    self.state = ReadState::AwaitingBody { command, len };
                }
            }
        }
    }

    /// Cuts a complete command line off the front of the buffer.
    fn take_line(&mut self) -> Result<Option<BytesMut>, FrameError> {
        let window = self.buffer.len().min(self.limits.max_line + CRLF.len());

        match find_crlf(&self.buffer[..window]) {
            Some(pos) => {
                let line = self.buffer.split_to(pos);
                self.buffer.advance(CRLF.len());
                Ok(Some(line))
            }
            None if self.buffer.len() >= self.limits.max_line + CRLF.len() => {
                Err(FrameError::LineTooLong {
                    max: self.limits.max_line,
                })
            }
            None => Ok(None),
        }
    }

    /// Cuts a `len`-byte payload and its terminator off the front of the buffer.
    fn take_body(&mut self, len: usize) -> Result<Option<Bytes>, FrameError> {
        let available = self.buffer.len();

        // Fail as soon as a byte where the terminator belongs is wrong
        let terminator = &self.buffer[len.min(available)..available.min(len + CRLF.len())];
        if terminator != &CRLF[..terminator.len()] {
            return Err(FrameError::BadDataChunk);
        }
        if available < len + CRLF.len() {
            return Ok(None);
        }

        // Copy out so the stored value does not pin the connection's buffer
        let body = Bytes::copy_from_slice(&self.buffer[..len]);
        self.buffer.advance(len + CRLF.len());
        Ok(Some(body))
    }

    /// Reads more data from the stream into the buffer, making room for at
    /// least `wanted` bytes. Returns the number of bytes read; 0 means EOF.
    async fn fill<R>(&mut self, reader: &mut R, wanted: usize) -> Result<usize, FrameError>
    where
        R: AsyncRead + Unpin,
    {
        let spare = self.buffer.capacity() - self.buffer.len();
        if spare < wanted.max(1024) {
            self.buffer.reserve(wanted.max(INITIAL_BUFFER_SIZE));
        }

        let n = reader.read_buf(&mut self.buffer).await?;
        self.total_read += n as u64;
        trace!(bytes = n, buffered = self.buffer.len(), "read data");
        Ok(n)
    }
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|window| window == CRLF)
}
