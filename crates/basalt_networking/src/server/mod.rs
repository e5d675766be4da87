//! # Basalt Server
//!
//! Accepts TCP connections and gives each one its own task.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      BASALT SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐                                           │
//! │  │ Accept Loop  │── spawn ──┬──────────────┬──────────────┐ │
//! │  └──────────────┘           │              │              │ │
//! │                    ┌────────▼─────┐ ┌──────▼───────┐      … │
//! │                    │ Connection   │ │ Connection   │        │
//! │                    │ socket       │ │ socket       │        │
//! │                    │ buffer       │ │ buffer       │        │
//! │                    │ Session      │ │ Session      │        │
//! │                    └──────────────┘ └──────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Connections share nothing but the read-only status provider. Each one
//! ends on its own (peer close, timeout or error) and only releases what it
//! owns.

mod connection;
mod session;
mod status;

pub use connection::{Connection, ConnectionError, ConnectionId, ConnectionResult, Disconnect};
pub use session::Session;
pub use status::{JsonStatus, StatusProvider};

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use basalt_shared::ServerConfig;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, info_span, warn, Instrument};

use crate::transport::Transport;

/// The listening server.
pub struct GameServer {
    listener: TcpListener,
    config: ServerConfig,
    status: Arc<dyn StatusProvider>,
    next_id: u64,
}

impl GameServer {
    /// Binds the listener to `config.bind_address`.
    ///
    /// # Errors
    ///
    /// Returns the socket error if the address cannot be bound.
    pub async fn bind(config: ServerConfig, status: Arc<dyn StatusProvider>) -> io::Result<Self> {
        let listener = TcpListener::bind(config.bind_address).await?;
        info!(address = %listener.local_addr()?, "listening");
        Ok(Self {
            listener,
            config,
            status,
            next_id: 0,
        })
    }

    /// Returns the address actually bound (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns the socket error if the address cannot be queried.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns the configuration the server was bound with.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accepts connections forever.
    ///
    /// A failed accept is logged and retried after the poll interval; it
    /// never stops the loop.
    pub async fn run(mut self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => self.spawn(stream, peer),
                Err(error) => {
                    warn!(%error, "accept failed");
                    tokio::time::sleep(self.config.poll_interval()).await;
                }
            }
        }
    }

    fn spawn(&mut self, stream: TcpStream, peer: SocketAddr) {
        let id = ConnectionId(self.next_id);
        self.next_id += 1;

        if let Err(error) = stream.set_nodelay(true) {
            warn!(%id, %error, "failed to disable Nagle");
        }

        let session = Session::new(Arc::clone(&self.status));
        let connection = Connection::with_config(id, stream, session, &self.config);
        let span = info_span!("connection", id = id.0, %peer);
        tokio::spawn(serve(connection).instrument(span));
    }
}

impl std::fmt::Debug for GameServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameServer")
            .field("listener", &self.listener)
            .field("config", &self.config)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

/// Runs one connection and logs how it ended.
async fn serve<T: Transport>(mut connection: Connection<T>) {
    info!("accepted");
    let outcome = connection.run().await;
    let state = connection.state().name();
    let stats = *connection.stats();

    match outcome {
        Ok(reason) => info!(
            ?reason,
            state,
            bytes_in = stats.bytes_received,
            bytes_out = stats.bytes_sent,
            frames_in = stats.frames_received,
            frames_out = stats.frames_sent,
            "closed"
        ),
        Err(ConnectionError::Protocol(error)) => warn!(
            %error,
            state,
            frames_in = stats.frames_received,
            "protocol violation, closing"
        ),
        Err(ConnectionError::Io(error)) => warn!(
            %error,
            state,
            bytes_in = stats.bytes_received,
            "transport failure, closing"
        ),
        Err(ConnectionError::Outbound(error)) => error!(
            %error,
            state,
            frames_out = stats.frames_sent,
            "reply exceeds the frame limit, closing"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_config() -> ServerConfig {
        ServerConfig {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_bind_reports_ephemeral_port() {
        let server = GameServer::bind(loopback_config(), Arc::new(String::new))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();

        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
        assert_eq!(server.config().read_timeout_ms, 5_000);
    }

    #[tokio::test]
    async fn test_bind_conflict_fails() {
        let first = GameServer::bind(loopback_config(), Arc::new(String::new))
            .await
            .unwrap();
        let taken = ServerConfig {
            bind_address: first.local_addr().unwrap(),
            ..ServerConfig::default()
        };

        assert!(GameServer::bind(taken, Arc::new(String::new)).await.is_err());
    }

    #[tokio::test]
    async fn test_accept_assigns_increasing_ids() {
        let mut server = GameServer::bind(loopback_config(), Arc::new(String::new))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();

        for expected in 0..3 {
            let _client = TcpStream::connect(addr).await.unwrap();
            let (stream, peer) = server.listener.accept().await.unwrap();
            assert_eq!(server.next_id, expected);
            server.spawn(stream, peer);
        }
        assert_eq!(server.next_id, 3);
    }
}
