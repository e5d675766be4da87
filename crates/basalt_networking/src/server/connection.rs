//! # Connection Read Loop
//!
//! Drives one [`Session`] from one [`Transport`] until the peer leaves,
//! goes quiet, or breaks the protocol.
//!
//! ## Design
//!
//! - Non-blocking reads; "not ready" yields for the poll interval
//! - Bytes accumulate in a per-connection buffer until whole frames exist
//! - The inactivity clock restarts only when bytes actually arrive
//! - Replies are written in the order their requests arrived

use std::fmt;
use std::io;
use std::time::Duration;

use basalt_shared::{ServerConfig, READ_CHUNK_SIZE};
use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::time::Instant;
use tracing::trace;

use crate::protocol::{ProtocolError, ProtocolState};
use crate::server::session::Session;
use crate::transport::{MeteredTransport, Transport, TransportStats};

/// Process-unique identifier for a connection, used in logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a connection ended without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disconnect {
    /// The peer closed its end of the stream.
    PeerClosed,
    /// No bytes arrived within the read timeout.
    TimedOut,
}

/// Errors that end a connection.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The peer sent bytes that cannot be decoded.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// The socket failed, or the peer stopped accepting replies.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    /// A reply could not be framed; the peer did nothing wrong.
    #[error("outbound frame rejected: {0}")]
    Outbound(ProtocolError),
}

impl ConnectionError {
    fn from_session(error: ProtocolError) -> Self {
        match error {
            ProtocolError::FrameTooLarge { .. } => Self::Outbound(error),
            other => Self::Protocol(other),
        }
    }
}

/// Result type for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// One accepted connection and everything it owns.
#[derive(Debug)]
pub struct Connection<T> {
    id: ConnectionId,
    transport: MeteredTransport<T>,
    session: Session,
    receive: BytesMut,
    replies: Vec<Bytes>,
    read_timeout: Duration,
    poll_interval: Duration,
}

impl<T: Transport> Connection<T> {
    /// Creates a connection with explicit timing.
    #[must_use]
    pub fn new(
        id: ConnectionId,
        transport: T,
        session: Session,
        read_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            id,
            transport: MeteredTransport::new(transport),
            session,
            receive: BytesMut::with_capacity(READ_CHUNK_SIZE),
            replies: Vec::new(),
            read_timeout,
            poll_interval,
        }
    }

    /// Creates a connection timed by `config`.
    #[must_use]
    pub fn with_config(id: ConnectionId, transport: T, session: Session, config: &ServerConfig) -> Self {
        Self::new(id, transport, session, config.read_timeout(), config.poll_interval())
    }

    /// Returns the connection id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the current protocol state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ProtocolState {
        self.session.state()
    }

    /// Returns transport statistics so far.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &TransportStats {
        self.transport.stats()
    }

    /// Returns the number of received bytes not yet part of a whole frame.
    #[inline]
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.receive.len()
    }

    /// Unwraps the transport.
    #[must_use]
    pub fn into_transport(self) -> T {
        self.transport.into_inner()
    }

    /// Runs the read loop to completion.
    ///
    /// # Errors
    ///
    /// [`ConnectionError::Protocol`] on a protocol violation,
    /// [`ConnectionError::Outbound`] if a reply cannot be framed and
    /// [`ConnectionError::Io`] on any socket failure, including a peer that
    /// accepts no reply bytes for the read timeout. In every case the
    /// connection must be dropped.
    pub async fn run(&mut self) -> ConnectionResult<Disconnect> {
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        let mut last_activity = Instant::now();

        loop {
            match self.transport.recv(&mut chunk)? {
                Some(0) => return Ok(Disconnect::PeerClosed),
                Some(n) => {
                    trace!(bytes = n, "read");
                    self.receive.extend_from_slice(&chunk[..n]);
                    self.drain().await?;
                    last_activity = Instant::now();
                }
                None => {
                    if last_activity.elapsed() >= self.read_timeout {
                        return Ok(Disconnect::TimedOut);
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Handles every whole frame received so far and flushes the replies.
    ///
    /// Replies to frames ahead of a failing one are still sent before the
    /// error is returned.
    async fn drain(&mut self) -> ConnectionResult<()> {
        let before = self.session.frames_handled();
        let outcome = self.session.process(&mut self.receive, &mut self.replies);
        self.transport.record_frames(self.session.frames_handled() - before);

        for reply in self.replies.drain(..) {
            self.transport
                .send_frame(&reply, self.poll_interval, self.read_timeout)
                .await?;
        }
        outcome.map(drop).map_err(ConnectionError::from_session)
    }
}
