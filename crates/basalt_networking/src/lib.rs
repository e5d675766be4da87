//! # Basalt Networking - The Wire Protocol
//!
//! Byte-exact codecs and connection handling for a length-prefixed,
//! VarInt-based game protocol.
//!
//! ## Architecture
//!
//! - **Protocol**: VarInt/VarLong, string, position and record codecs,
//!   plus the frame writer/reader built on them
//! - **Server**: one task per connection running a timeout-driven read loop
//!   over a per-connection protocol state machine
//! - **Transport**: non-blocking byte streams with per-connection statistics
//!
//! ## Connection Lifecycle
//!
//! ```text
//! CLIENT                               SERVER
//!   |                                     |
//!   |--- Handshake (next = Status) ------>| Handshaking -> Status
//!   |--- StatusRequest ------------------>|
//!   |<-- StatusResponse (JSON) -----------|
//!   |--- PingRequest (n) ---------------->|
//!   |<-- PongResponse (n) ----------------|
//!   |                                     |
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use basalt_networking::server::{GameServer, JsonStatus};
//! use basalt_shared::ServerConfig;
//!
//! # async fn start() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::default();
//! let status = JsonStatus::from_config(&config.status)?;
//! let server = GameServer::bind(config, Arc::new(status)).await?;
//! server.run().await; // Accepts forever
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod protocol;
pub mod server;
pub mod transport;

// Re-exports for convenience
pub use protocol::{
    Decode, Encode, FrameReader, FrameWriter, PacketHeader, PacketReader, Position, ProtocolError,
    ProtocolResult, ProtocolState, VarInt, VarLong, WireString,
};
pub use server::{
    Connection, ConnectionError, ConnectionId, Disconnect, GameServer, JsonStatus, Session,
    StatusProvider,
};
pub use transport::{MeteredTransport, Transport, TransportStats};
