//! Per-client connection loop.
//!
//! ```text
//! read ──> buffer ──> parse frame ──> dispatch ──> queue reply
//!   ▲                    │ incomplete                  │
//!   │                    ▼                             ▼
//!   └──────────────── flush replies <──────────── more frames?
//! ```
//!
//! TCP is a byte stream: one read may carry half a command or several
//! pipelined ones. Bytes accumulate in a `BytesMut` until the parser finds a
//! whole frame. Every complete frame in the buffer is answered before the
//! replies are flushed in one write.

use crate::commands::CommandHandler;
use crate::protocol::parser::MAX_BULK_SIZE;
use crate::protocol::{ParseError, RespParser, RespValue};
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Room for framing and neighbouring pipelined commands around one bulk string.
const FRAME_HEADROOM: usize = 64 * 1024;

/// Cap on buffered, not yet parsed request bytes per client. A frame holding
/// the largest accepted bulk string always fits.
const MAX_BUFFER_SIZE: usize = MAX_BULK_SIZE + FRAME_HEADROOM;

const INITIAL_BUFFER_SIZE: usize = 4096;

/// Server-wide counters shared by every connection.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    pub connections_accepted: AtomicU64,
    pub active_connections: AtomicU64,
    pub commands_processed: AtomicU64,
    pub bytes_read: AtomicU64,
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    fn closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    fn record_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn record_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// One connected client.
pub struct ConnectionHandler {
    stream: BufWriter<TcpStream>,
    addr: SocketAddr,
    /// Request bytes not yet parsed.
    buffer: BytesMut,
    /// Serialized replies waiting for the next flush.
    replies: Vec<u8>,
    commands: CommandHandler,
    parser: RespParser,
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        commands: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            replies: Vec::new(),
            commands,
            parser: RespParser::new(),
            stats,
        }
    }

    /// Serves the client until it disconnects or the connection fails.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.serve().await;
        match &result {
            Ok(()) | Err(ConnectionError::ClientDisconnected) => {
                info!(client = %self.addr, "Client disconnected")
            }
            Err(ConnectionError::Io(e)) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.closed();
        result
    }

    async fn serve(&mut self) -> Result<(), ConnectionError> {
        loop {
            match self.answer_buffered() {
                Ok(()) => self.flush_replies().await?,
                Err(e) => {
                    // Tell the client why before hanging up
                    RespValue::error(format!("ERR Protocol error: {}", e))
                        .serialize_into(&mut self.replies);
                    self.flush_replies().await?;
                    return Err(e.into());
                }
            }

            self.read_more().await?;
        }
    }

    /// Executes every complete frame in the buffer, queueing the replies.
    fn answer_buffered(&mut self) -> Result<(), ParseError> {
        while let Some((request, consumed)) = self.parser.parse(&self.buffer)? {
            self.buffer.advance(consumed);
            trace!(
                client = %self.addr,
                consumed = consumed,
                remaining = self.buffer.len(),
                "Parsed request"
            );

            let reply = self.commands.execute(request);
            self.stats.commands_processed.fetch_add(1, Ordering::Relaxed);
            reply.serialize_into(&mut self.replies);
        }
        Ok(())
    }

    async fn read_more(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            warn!(client = %self.addr, size = self.buffer.len(), "Request buffer full");
            return Err(ConnectionError::BufferFull);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
        if n == 0 {
            return if self.buffer.is_empty() {
                Err(ConnectionError::ClientDisconnected)
            } else {
                Err(ConnectionError::UnexpectedEof)
            };
        }

        self.stats.record_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");
        Ok(())
    }

    async fn flush_replies(&mut self) -> Result<(), ConnectionError> {
        if self.replies.is_empty() {
            return Ok(());
        }

        self.stream.write_all(&self.replies).await?;
        self.stream.flush().await?;
        self.stats.record_written(self.replies.len());
        trace!(client = %self.addr, bytes = self.replies.len(), "Sent replies");

        self.replies.clear();
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("client disconnected")]
    ClientDisconnected,

    /// Closed in the middle of a request.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error("request buffer limit exceeded")]
    BufferFull,
}

/// Runs a [`ConnectionHandler`] to completion, logging abnormal endings.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    commands: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, commands, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::Io(ref io) if io.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => debug!(client = %addr, error = %e, "Connection ended with error"),
        }
    }
}
