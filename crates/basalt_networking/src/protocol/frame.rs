//! # Packet Framing
//!
//! ## Frame Structure
//!
//! ```text
//! ┌────────────────┬────────────────┬──────────────────────────────┐
//! │ length (VarInt)│ id (VarInt)    │ payload (record fields)      │
//! └────────────────┴────────────────┴──────────────────────────────┘
//!                  └──────────── length bytes ───────────────────────┘
//! ```
//!
//! The writer appends the payload first and backpatches the two prefixes
//! into a reserved region once the sizes are known, then trims the unused
//! part of the reserve. The payload is never copied.

use basalt_shared::MAX_FRAME_LENGTH;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::codec::{Decode, Encode, PacketReader};
use super::error::{ProtocolError, ProtocolResult};
use super::packets::Packet;
use super::varint::VarInt;

/// Bytes reserved in front of the payload for the length and id prefixes.
pub const HEADER_RESERVE: usize = 2 * VarInt::MAX_BYTES;

/// The two VarInts in front of every payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketHeader {
    /// Byte count of id + payload.
    pub length: VarInt,
    /// Packet id within the current phase.
    pub id: VarInt,
}

impl PacketHeader {
    /// Payload size implied by the header, assuming a canonical id encoding.
    ///
    /// Returns `None` when the length cannot even hold the id.
    #[must_use]
    pub fn payload_len(&self) -> Option<usize> {
        usize::try_from(self.length.value())
            .ok()?
            .checked_sub(self.id.byte_len())
    }
}

// =============================================================================
// WRITER
// =============================================================================

/// Builds one frame in a single growable buffer.
///
/// ```
/// use basalt_networking::protocol::{FrameWriter, VarInt};
///
/// let mut writer = FrameWriter::new();
/// writer.write(&VarInt(300));
/// let frame = writer.finish(0x02).unwrap();
/// assert_eq!(&frame[..], &[3, 0x02, 0xAC, 0x02]);
/// ```
#[derive(Debug)]
pub struct FrameWriter {
    buffer: BytesMut,
}

impl FrameWriter {
    /// Creates a writer with a small default payload capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Creates a writer able to hold `payload` bytes without reallocating.
    #[must_use]
    pub fn with_capacity(payload: usize) -> Self {
        let mut buffer = BytesMut::with_capacity(HEADER_RESERVE + payload);
        buffer.put_bytes(0, HEADER_RESERVE);
        Self { buffer }
    }

    /// Appends an encoded value to the payload.
    pub fn write<T: Encode + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.encode(&mut self.buffer);
        self
    }

    /// Appends raw bytes to the payload.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer.put_slice(bytes);
        self
    }

    /// Returns the payload size written so far.
    #[inline]
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.buffer.len() - HEADER_RESERVE
    }

    /// Backpatches the prefixes and returns the finished frame.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::FrameTooLarge`] if id + payload exceeds
    /// [`MAX_FRAME_LENGTH`].
    pub fn finish(mut self, id: i32) -> ProtocolResult<Bytes> {
        let (id_bytes, id_len) = VarInt(id).to_array();
        let body_len = id_len + self.payload_len();
        if body_len > MAX_FRAME_LENGTH {
            return Err(ProtocolError::FrameTooLarge { length: body_len });
        }

        let id_start = HEADER_RESERVE - id_len;
        self.buffer[id_start..HEADER_RESERVE].copy_from_slice(&id_bytes[..id_len]);

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let (length_bytes, length_len) = VarInt(body_len as i32).to_array();
        let start = id_start - length_len;
        self.buffer[start..id_start].copy_from_slice(&length_bytes[..length_len]);

        self.buffer.advance(start);
        Ok(self.buffer.freeze())
    }
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Frames a single packet.
///
/// # Errors
///
/// Same as [`FrameWriter::finish`].
pub fn encode_packet<P: Packet + Encode>(packet: &P) -> ProtocolResult<Bytes> {
    let mut writer = FrameWriter::new();
    writer.write(packet);
    writer.finish(P::ID)
}

// =============================================================================
// READER
// =============================================================================

/// One complete frame borrowed from a receive buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Decoded prefixes.
    pub header: PacketHeader,
    /// Exactly the payload bytes covered by the declared length.
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Returns a reader confined to this frame's payload.
    #[must_use]
    pub const fn payload_reader(&self) -> PacketReader<'a> {
        PacketReader::new(self.payload)
    }
}

/// Walks the frames of a receive buffer front to back.
///
/// The reader never looks past the end of the slice it was given; a frame
/// that has not fully arrived yields [`ProtocolError::InsufficientData`].
#[derive(Clone, Debug)]
pub struct FrameReader<'a> {
    reader: PacketReader<'a>,
}

impl<'a> FrameReader<'a> {
    /// Creates a reader at the start of `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { reader: PacketReader::new(buffer) }
    }

    /// Returns the number of bytes consumed so far.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.reader.position()
    }

    /// Returns true if unread bytes remain.
    #[inline]
    #[must_use]
    pub const fn has_remaining(&self) -> bool {
        !self.reader.is_empty()
    }

    /// Decodes the length and id VarInts at the cursor.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InsufficientData`] or [`ProtocolError::DataOverflow`]
    /// from either VarInt.
    pub fn read_header(&mut self) -> ProtocolResult<PacketHeader> {
        Ok(PacketHeader {
            length: self.reader.read()?,
            id: self.reader.read()?,
        })
    }

    /// Decodes a record at the cursor, typically right after
    /// [`FrameReader::read_header`].
    ///
    /// # Errors
    ///
    /// Whatever the record's decoder reports.
    pub fn read<T: Decode>(&mut self) -> ProtocolResult<T> {
        self.reader.read()
    }

    /// Splits off the next complete frame.
    ///
    /// The declared length is authoritative: the returned payload is exactly
    /// the bytes it covers, whatever the record inside turns out to need.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InsufficientData`] if the frame has not fully arrived.
    /// - [`ProtocolError::InvalidLength`] if the length is negative, exceeds
    ///   [`MAX_FRAME_LENGTH`], or cannot hold the id.
    /// - [`ProtocolError::DataOverflow`] for a malformed VarInt.
    pub fn next_frame(&mut self) -> ProtocolResult<Frame<'a>> {
        let length: VarInt = self.reader.read()?;
        let body_len = usize::try_from(length.value())
            .ok()
            .filter(|len| *len <= MAX_FRAME_LENGTH)
            .ok_or(ProtocolError::InvalidLength {
                length: i64::from(length.value()),
            })?;

        let body = self.reader.read_bytes(body_len)?;
        let (id, id_len) = VarInt::decode_prefix(body).map_err(|error| match error {
            ProtocolError::InsufficientData => ProtocolError::InvalidLength {
                length: i64::from(length.value()),
            },
            other => other,
        })?;

        Ok(Frame {
            header: PacketHeader { length, id },
            payload: &body[id_len..],
        })
    }
}
