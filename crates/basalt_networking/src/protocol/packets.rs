//! # Packet Definitions
//!
//! Records exchanged in the handshaking and status phases.
//!
//! ## Phases
//!
//! Every connection starts in [`ProtocolState::Handshaking`]. The single
//! handshake packet names the phase to switch to; the status phase then
//! serves the server-list ping. Login, transfer, configuration and play
//! are reachable but define no packets here.

use super::{VarInt, WireString};
use crate::{record, wire_enum};

wire_enum! {
    /// The sub-protocol a connection is currently speaking.
    ///
    /// Carried on the wire as a VarInt ordinal (the `next_state` field of
    /// the handshake).
    #[derive(Default)]
    pub enum ProtocolState {
        /// Initial phase; expects exactly one handshake.
        #[default]
        Handshaking = 0,
        /// Server-list ping.
        Status = 1,
        /// Authentication.
        Login = 2,
        /// Inbound server transfer.
        Transfer = 3,
        /// Pre-play configuration.
        Configuration = 4,
        /// In-game.
        Play = 5,
    }
}

impl ProtocolState {
    /// Lowercase phase name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Handshaking => "handshaking",
            Self::Status => "status",
            Self::Login => "login",
            Self::Transfer => "transfer",
            Self::Configuration => "configuration",
            Self::Play => "play",
        }
    }
}

/// A record with a fixed packet id within a fixed phase.
pub trait Packet {
    /// Packet id written after the frame length.
    const ID: i32;
    /// Phase in which this id has this meaning.
    const STATE: ProtocolState;
}

macro_rules! packet_id {
    ($($ty:ty => ($state:ident, $id:literal)),* $(,)?) => {$(
        impl Packet for $ty {
            const ID: i32 = $id;
            const STATE: ProtocolState = ProtocolState::$state;
        }
    )*};
}

// =============================================================================
// HANDSHAKING
// =============================================================================

record! {
    /// Client -> Server: opens the connection and picks the next phase.
    pub struct Handshake {
        /// Client protocol version.
        pub protocol_version: VarInt,
        /// Host name the client used to connect.
        pub server_address: WireString,
        /// Port the client used to connect.
        pub server_port: u16,
        /// Phase to switch to.
        pub next_state: ProtocolState,
    }
}

// =============================================================================
// STATUS
// =============================================================================

record! {
    /// Client -> Server: asks for the server-list entry.
    #[derive(Default)]
    pub struct StatusRequest {}
}

record! {
    /// Server -> Client: the server-list entry, as JSON text.
    pub struct StatusResponse {
        /// Opaque status document.
        pub json: WireString,
    }
}

record! {
    /// Client -> Server: latency probe.
    #[derive(Copy, Eq)]
    pub struct PingRequest {
        /// Arbitrary value to echo.
        pub payload: i64,
    }
}

record! {
    /// Server -> Client: echo of [`PingRequest::payload`].
    #[derive(Copy, Eq)]
    pub struct PongResponse {
        /// The echoed value.
        pub payload: i64,
    }
}

packet_id! {
    Handshake => (Handshaking, 0x00),
    StatusRequest => (Status, 0x00),
    StatusResponse => (Status, 0x00),
    PingRequest => (Status, 0x01),
    PongResponse => (Status, 0x01),
}

impl From<PingRequest> for PongResponse {
    fn from(ping: PingRequest) -> Self {
        Self { payload: ping.payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Encode, PacketReader, ProtocolError};

    fn handshake() -> Handshake {
        Handshake {
            protocol_version: VarInt(767),
            server_address: WireString::from("localhost"),
            server_port: 25565,
            next_state: ProtocolState::Status,
        }
    }

    #[test]
    fn test_handshake_layout() {
        let mut buf = Vec::new();
        handshake().encode(&mut buf);

        let mut expected = vec![0xFF, 0x05, 9];
        expected.extend_from_slice(b"localhost");
        expected.extend_from_slice(&[0x63, 0xDD, 1]);
        assert_eq!(buf, expected);

        let decoded: Handshake = PacketReader::new(&buf).read().unwrap();
        assert_eq!(decoded, handshake());
    }

    #[test]
    fn test_handshake_bad_next_state() {
        let mut buf = Vec::new();
        handshake().encode(&mut buf);
        *buf.last_mut().unwrap() = 42;

        assert_eq!(
            PacketReader::new(&buf).read::<Handshake>(),
            Err(ProtocolError::UnknownVariant { kind: "ProtocolState", value: 42 })
        );
    }

    #[test]
    fn test_ping_is_eight_bytes() {
        let mut buf = Vec::new();
        PingRequest { payload: -2 }.encode(&mut buf);
        assert_eq!(buf, (-2_i64).to_be_bytes());
        assert_eq!(PongResponse::from(PingRequest { payload: 9 }).payload, 9);
    }

    #[test]
    fn test_state_ordinals() {
        assert_eq!(ProtocolState::default(), ProtocolState::Handshaking);
        assert_eq!(ProtocolState::from_ordinal(1), Some(ProtocolState::Status));
        assert_eq!(ProtocolState::from_ordinal(3), Some(ProtocolState::Transfer));
        assert_eq!(ProtocolState::from_ordinal(6), None);
        assert_eq!(ProtocolState::Play.ordinal(), 5);
        assert_eq!(ProtocolState::Login.name(), "login");
    }

    #[test]
    fn test_packet_ids() {
        assert_eq!(Handshake::ID, 0);
        assert_eq!(PingRequest::ID, 1);
        assert_eq!(StatusResponse::STATE, ProtocolState::Status);
    }
}
