//! # Protocol Session
//!
//! The per-connection state machine, free of any I/O.
//!
//! ## Dispatch Table
//!
//! ```text
//! state         id   record          effect
//! ───────────── ──── ─────────────── ───────────────────────────────
//! Handshaking   0x00 Handshake       state = next_state
//! Status        0x00 StatusRequest   reply StatusResponse (0x00)
//! Status        0x01 PingRequest     reply PongResponse (0x01)
//! anything else                      logged and ignored
//! ```
//!
//! Frames are consumed strictly front to back. A frame that has not fully
//! arrived stays in the buffer for the next call.

use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::protocol::{
    encode_packet, Decode, Frame, FrameReader, Handshake, Packet, PacketReader, PingRequest,
    PongResponse, ProtocolError, ProtocolResult, ProtocolState, StatusRequest, StatusResponse,
};
use crate::server::status::StatusProvider;

/// Protocol state of one connection.
pub struct Session {
    state: ProtocolState,
    status: Arc<dyn StatusProvider>,
    frames_handled: u64,
}

impl Session {
    /// Creates a session in [`ProtocolState::Handshaking`].
    #[must_use]
    pub fn new(status: Arc<dyn StatusProvider>) -> Self {
        Self {
            state: ProtocolState::Handshaking,
            status,
            frames_handled: 0,
        }
    }

    /// Returns the current protocol state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ProtocolState {
        self.state
    }

    /// Returns the number of frames handled over the session's lifetime.
    #[inline]
    #[must_use]
    pub const fn frames_handled(&self) -> u64 {
        self.frames_handled
    }

    /// Handles every complete frame at the front of `buffer`.
    ///
    /// Handled bytes are removed from `buffer`; an incomplete trailing frame
    /// is left in place. Reply frames are appended to `replies` in order.
    /// Returns the number of frames handled.
    ///
    /// # Errors
    ///
    /// Any [`ProtocolError`] other than a frame still in flight. Frames ahead
    /// of the failing one are still removed and their replies kept; the
    /// buffer then starts at the failing frame and the connection should be
    /// closed.
    pub fn process(&mut self, buffer: &mut BytesMut, replies: &mut Vec<Bytes>) -> ProtocolResult<usize> {
        let mut reader = FrameReader::new(&buffer[..]);
        let mut handled = 0;

        let (consumed, failure) = loop {
            let start = reader.position();
            let frame = match reader.next_frame() {
                Ok(frame) => frame,
                Err(ProtocolError::InsufficientData) => break (start, None),
                Err(error) => break (start, Some(error)),
            };
            match self.handle_frame(&frame) {
                Ok(reply) => {
                    replies.extend(reply);
                    handled += 1;
                    self.frames_handled += 1;
                }
                Err(error) => break (start, Some(error)),
            }
            if !reader.has_remaining() {
                break (reader.position(), None);
            }
        };

        buffer.advance(consumed);
        match failure {
            Some(error) => Err(error),
            None => Ok(handled),
        }
    }

    /// Dispatches one complete frame according to the current state.
    ///
    /// # Errors
    ///
    /// The payload does not decode as the record its id names. Running out
    /// of payload is reported as [`ProtocolError::InvalidLength`], since the
    /// whole declared span is already present.
    pub fn handle_frame(&mut self, frame: &Frame<'_>) -> ProtocolResult<Option<Bytes>> {
        let id = frame.header.id.value();
        let mut payload = frame.payload_reader();
        trace!(state = self.state.name(), id, len = frame.payload.len(), "frame");

        let reply = match (self.state, id) {
            (ProtocolState::Handshaking, id) if id == Handshake::ID => {
                let handshake: Handshake = decode_payload(frame, &mut payload)?;
                debug!(
                    protocol = handshake.protocol_version.value(),
                    address = %handshake.server_address,
                    port = handshake.server_port,
                    next = handshake.next_state.name(),
                    "handshake"
                );
                self.state = handshake.next_state;
                None
            }
            (ProtocolState::Status, id) if id == StatusRequest::ID => {
                let StatusRequest {} = decode_payload(frame, &mut payload)?;
                let response = StatusResponse {
                    json: self.status.status_json().into(),
                };
                Some(encode_packet(&response)?)
            }
            (ProtocolState::Status, id) if id == PingRequest::ID => {
                let ping: PingRequest = decode_payload(frame, &mut payload)?;
                Some(encode_packet(&PongResponse::from(ping))?)
            }
            (state, id) => {
                debug!(state = state.name(), id, "ignoring unhandled packet");
                return Ok(None);
            }
        };

        if !payload.is_empty() {
            debug!(id, trailing = payload.remaining(), "skipping unread payload bytes");
        }
        Ok(reply)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("state", &self.state).finish_non_exhaustive()
    }
}

fn decode_payload<T: Decode>(frame: &Frame<'_>, payload: &mut PacketReader<'_>) -> ProtocolResult<T> {
    payload.read().map_err(|error| match error {
        ProtocolError::InsufficientData => ProtocolError::InvalidLength {
            length: i64::from(frame.header.length.value()),
        },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_shared::MAX_FRAME_LENGTH;
    use crate::protocol::{FrameWriter, VarInt, WireString};

    fn session() -> Session {
        Session::new(Arc::new(|| "{}".to_owned()))
    }

    fn handshake_frame(next_state: ProtocolState) -> Bytes {
        encode_packet(&Handshake {
            protocol_version: VarInt(767),
            server_address: WireString::from("localhost"),
            server_port: 25565,
            next_state,
        })
        .unwrap()
    }

    fn buffer(frames: &[&[u8]]) -> BytesMut {
        let mut buf = BytesMut::new();
        for frame in frames {
            buf.extend_from_slice(frame);
        }
        buf
    }

    #[test]
    fn test_handshake_then_status_request() {
        let mut session = session();
        let mut replies = Vec::new();

        let mut buf = buffer(&[&handshake_frame(ProtocolState::Status)]);
        assert_eq!(session.process(&mut buf, &mut replies).unwrap(), 1);
        assert_eq!(session.state(), ProtocolState::Status);
        assert!(replies.is_empty());
        assert!(buf.is_empty());

        let mut buf = buffer(&[&[1, 0]]);
        assert_eq!(session.process(&mut buf, &mut replies).unwrap(), 1);
        assert_eq!(replies.len(), 1);

        let mut reader = FrameReader::new(&replies[0]);
        let frame = reader.next_frame().unwrap();
        assert_eq!(frame.header.id.value(), 0);
        let response: StatusResponse = frame.payload_reader().read().unwrap();
        assert_eq!(response.json.to_str(), Ok("{}"));
    }

    #[test]
    fn test_ping_is_echoed() {
        let mut session = session();
        let mut replies = Vec::new();
        let ping = encode_packet(&PingRequest { payload: -42 }).unwrap();
        let mut buf = buffer(&[&handshake_frame(ProtocolState::Status), &ping]);

        assert_eq!(session.process(&mut buf, &mut replies).unwrap(), 2);
        assert_eq!(replies, vec![encode_packet(&PongResponse { payload: -42 }).unwrap()]);
    }

    #[test]
    fn test_state_change_applies_to_next_frame_in_same_buffer() {
        let mut session = session();
        let mut replies = Vec::new();
        let mut buf = buffer(&[&handshake_frame(ProtocolState::Status), &[1, 0], &[1, 0]]);

        assert_eq!(session.process(&mut buf, &mut replies).unwrap(), 3);
        assert_eq!(replies.len(), 2);
    }

    #[test]
    fn test_unknown_id_is_ignored() {
        let mut session = session();
        let mut replies = Vec::new();
        let mut buf = buffer(&[&[3, 0x7F, 1, 2]]);

        assert_eq!(session.process(&mut buf, &mut replies).unwrap(), 1);
        assert_eq!(session.state(), ProtocolState::Handshaking);
        assert!(replies.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_inert_states_ignore_everything() {
        for state in [
            ProtocolState::Login,
            ProtocolState::Transfer,
            ProtocolState::Configuration,
            ProtocolState::Play,
        ] {
            let mut session = session();
            let mut replies = Vec::new();
            let mut buf = buffer(&[&handshake_frame(state), &[1, 0], &[1, 1]]);

            assert_eq!(session.process(&mut buf, &mut replies).unwrap(), 3);
            assert_eq!(session.state(), state);
            assert!(replies.is_empty());
        }
    }

    #[test]
    fn test_partial_frame_stays_buffered() {
        let mut session = session();
        let mut replies = Vec::new();
        let handshake = handshake_frame(ProtocolState::Status);
        let (head, tail) = handshake.split_at(5);

        let mut buf = buffer(&[head]);
        assert_eq!(session.process(&mut buf, &mut replies).unwrap(), 0);
        assert_eq!(&buf[..], head);
        assert_eq!(session.state(), ProtocolState::Handshaking);

        buf.extend_from_slice(tail);
        buf.extend_from_slice(&[1]);
        assert_eq!(session.process(&mut buf, &mut replies).unwrap(), 1);
        assert_eq!(session.state(), ProtocolState::Status);
        assert_eq!(&buf[..], &[1]);
    }

    #[test]
    fn test_short_payload_is_violation() {
        let mut session = session();
        let mut replies = Vec::new();
        let mut buf = buffer(&[&handshake_frame(ProtocolState::Status)]);
        session.process(&mut buf, &mut replies).unwrap();

        // ping frame declaring 4 payload bytes instead of 8
        let mut buf = buffer(&[&[5, 1, 0, 0, 0, 1]]);
        assert_eq!(
            session.process(&mut buf, &mut replies),
            Err(ProtocolError::InvalidLength { length: 5 })
        );
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn test_bad_next_state_is_violation() {
        let mut writer = FrameWriter::new();
        writer
            .write(&VarInt(767))
            .write(&WireString::from("h"))
            .write(&1_u16)
            .write(&VarInt(9));
        let mut buf = buffer(&[&writer.finish(0).unwrap()]);

        let result = session().process(&mut buf, &mut Vec::new());
        assert_eq!(
            result,
            Err(ProtocolError::UnknownVariant { kind: "ProtocolState", value: 9 })
        );
    }

    #[test]
    fn test_trailing_payload_is_skipped() {
        let mut session = session();
        let mut replies = Vec::new();
        let mut handshake = FrameWriter::new();
        handshake
            .write(&VarInt(767))
            .write(&WireString::from("h"))
            .write(&1_u16)
            .write(&ProtocolState::Status)
            .write_bytes(&[0xEE, 0xEE]);
        let mut buf = buffer(&[&handshake.finish(0).unwrap(), &[1, 0]]);

        assert_eq!(session.process(&mut buf, &mut replies).unwrap(), 2);
        assert_eq!(session.state(), ProtocolState::Status);
        assert_eq!(replies.len(), 1);
    }

    #[test]
    fn test_violation_keeps_earlier_replies() {
        let mut session = session();
        let mut replies = Vec::new();
        let ping = encode_packet(&PingRequest { payload: 9 }).unwrap();
        let mut buf = buffer(&[&handshake_frame(ProtocolState::Status), &ping, &[0xFF; 6]]);

        assert_eq!(
            session.process(&mut buf, &mut replies),
            Err(ProtocolError::DataOverflow)
        );
        assert_eq!(replies, vec![encode_packet(&PongResponse { payload: 9 }).unwrap()]);
        assert_eq!(&buf[..], &[0xFF; 6]);
        assert_eq!(session.frames_handled(), 2);
    }

    #[test]
    fn test_oversized_status_is_not_a_violation() {
        let mut session = Session::new(Arc::new(|| "x".repeat(MAX_FRAME_LENGTH)));
        let mut replies = Vec::new();
        let mut buf = buffer(&[&handshake_frame(ProtocolState::Status), &[1, 0]]);

        let err = session.process(&mut buf, &mut replies).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { length } if length > MAX_FRAME_LENGTH));
        assert!(!err.is_violation());
        assert!(replies.is_empty());
        assert_eq!(&buf[..], &[1, 0]);
    }

    #[test]
    fn test_oversized_length_is_violation() {
        let mut buf = buffer(&[&[0xFF, 0xFF, 0xFF, 0x01]]);
        assert!(matches!(
            session().process(&mut buf, &mut Vec::new()),
            Err(ProtocolError::InvalidLength { .. })
        ));
    }
}
