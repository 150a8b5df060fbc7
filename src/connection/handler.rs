//! Connection Handler Module
//!
//! This module handles individual client connections.
//! Each client gets its own handler task that runs in a loop,
//! reading requests and sending responses.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read a complete frame   │ │
//!    │  │ (line + SET payload)    │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Execute command         │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Send response           │ │
//!    │  │ (skipped for noreply)   │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / framing error
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! A framing or parse error is answered with its error line and then the
//! connection is closed; the stream is never resynchronized.

use crate::commands::CommandHandler;
use crate::connection::frame::{FrameError, FrameLimits, FrameReader};
use crate::protocol::Response;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total requests processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: u64) {
        self.bytes_read.fetch_add(count, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Generic over the stream so tests can drive it with scripted I/O.
pub struct ConnectionHandler<S> {
    /// The client stream; writes are buffered, reads go straight through
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Framing state and read buffer
    frames: FrameReader,

    /// The command handler (shared engine)
    command_handler: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    /// Reused response buffer
    out: Vec<u8>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The stream for this connection
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing requests
    /// * `stats` - Shared connection statistics
    /// * `limits` - Line and payload size limits
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
        limits: FrameLimits,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            frames: FrameReader::new(limits),
            command_handler,
            stats,
            out: Vec::with_capacity(256),
        }
    }

    /// Runs the main connection loop.
    ///
    /// Reads requests from the client, executes them and sends back
    /// responses until the client disconnects or an error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) if e.is_connection_reset() => {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(
                client = %self.addr,
                error = %e,
                unconsumed = self.frames.buffered(),
                "Connection error"
            ),
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            let read_before = self.frames.total_read();
            let next = self.frames.read_frame(self.stream.get_mut()).await;
            self.stats
                .bytes_read(self.frames.total_read() - read_before);

            let frame = match next {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(()),
                Err(e) => {
                    debug_assert!(self.frames.is_closed());
                    if let Some(response) = e.response() {
                        // Best effort: the peer may already be gone
                        if let Err(write_err) = self.send_response(&response).await {
                            debug!(
                                client = %self.addr,
                                error = %write_err,
                                "Could not send error response"
                            );
                        }
                    }
                    return Err(ConnectionError::Frame(e));
                }
            };

            trace!(
                client = %self.addr,
                command = frame.command.name(),
                key = frame.command.key(),
                "Executing command"
            );

            let response = self.command_handler.execute(frame);
            self.stats.command_processed();

            if let Some(response) = response {
                self.send_response(&response).await?;
            }
        }
    }

    /// Sends a response to the client.
    async fn send_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        self.out.clear();
        response.serialize_into(&mut self.out);

        self.stream.write_all(&self.out).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(self.out.len());
        trace!(
            client = %self.addr,
            bytes = self.out.len(),
            response = %response,
            "Sent response"
        );
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error while writing
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Framing, parse or read error
    #[error("{0}")]
    Frame(#[from] FrameError),
}

impl ConnectionError {
    /// True if the peer reset the connection.
    pub fn is_connection_reset(&self) -> bool {
        let io_err = match self {
            ConnectionError::IoError(e) | ConnectionError::Frame(FrameError::Io(e)) => e,
            ConnectionError::Frame(_) => return false,
        };
        matches!(
            io_err.kind(),
            std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe
        )
    }
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion.
///
/// # Arguments
///
/// * `stream` - The stream for this connection
/// * `addr` - The client's socket address
/// * `command_handler` - The command handler for executing requests
/// * `stats` - Shared connection statistics
/// * `limits` - Line and payload size limits
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    limits: FrameLimits,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats, limits);
    if let Err(e) = handler.run().await {
        if !e.is_connection_reset() {
            debug!(client = %addr, error = %e, "Connection ended with error");
        }
    }
}
