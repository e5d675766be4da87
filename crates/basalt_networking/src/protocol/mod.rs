//! # Network Protocol
//!
//! Byte-exact codecs for the length-prefixed, VarInt-based wire format.
//!
//! ## Frame Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Length (VarInt, 1-3 bytes) = size of Id + Payload            │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Id (VarInt)                                                  │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Payload (record fields, declaration order, big-endian)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Philosophy
//!
//! - Field order is the whole contract - no tags, no names on the wire
//! - Every read is bounds-checked; malformed lengths never panic
//! - Frames are built in one buffer and backpatched, never copied
//! - Host byte order never leaks onto the wire

mod codec;
mod error;
mod frame;
mod packets;
mod types;
mod varint;

pub use bytes::BufMut;
pub use codec::{Decode, Encode, PacketReader};
pub use error::{ProtocolError, ProtocolResult};
pub use frame::{encode_packet, Frame, FrameReader, FrameWriter, PacketHeader, HEADER_RESERVE};
pub use packets::{
    Handshake, Packet, PingRequest, PongResponse, ProtocolState, StatusRequest, StatusResponse,
};
pub use types::{Position, WireString};
pub use varint::{VarInt, VarLong};
