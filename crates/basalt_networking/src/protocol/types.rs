//! # Compound Wire Types
//!
//! Length-prefixed strings and bit-packed block positions.

use std::borrow::Cow;
use std::fmt;
use std::str::Utf8Error;

use bytes::BufMut;

use super::codec::{Decode, Encode, PacketReader};
use super::error::{ProtocolError, ProtocolResult};
use super::varint::VarInt;

// =============================================================================
// STRING
// =============================================================================

/// A VarInt length followed by that many raw bytes.
///
/// No text encoding is enforced on the wire. Use [`WireString::to_str`] when
/// the bytes must be UTF-8.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct WireString(Vec<u8>);

impl WireString {
    /// Wraps raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the raw payload.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for a zero-length string.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Interprets the payload as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns the UTF-8 error if the bytes are not valid text.
    pub fn to_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.0)
    }

    /// Interprets the payload as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    /// Consumes the string, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<&str> for WireString {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for WireString {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl fmt::Debug for WireString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}

impl fmt::Display for WireString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl Encode for WireString {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn encode<B: BufMut>(&self, buf: &mut B) {
        VarInt(self.0.len() as i32).encode(buf);
        buf.put_slice(&self.0);
    }
}

impl Decode for WireString {
    fn decode(reader: &mut PacketReader<'_>) -> ProtocolResult<Self> {
        let length = reader.read::<VarInt>()?.value();
        let length = usize::try_from(length).map_err(|_| ProtocolError::InvalidLength {
            length: i64::from(length),
        })?;
        Ok(Self(reader.read_bytes(length)?.to_vec()))
    }
}

// =============================================================================
// POSITION
// =============================================================================

/// Mask for the 26-bit horizontal fields.
const MASK_26: u64 = (1 << 26) - 1;

/// Mask for the 12-bit vertical field.
const MASK_12: u64 = (1 << 12) - 1;

/// Integer block coordinate packed into one 64-bit word.
///
/// ```text
/// 63                    38 37                    12 11        0
/// ┌───────────────────────┬───────────────────────┬───────────┐
/// │ x (26 bits, signed)   │ z (26 bits, signed)   │ y (12)    │
/// └───────────────────────┴───────────────────────┴───────────┘
/// ```
///
/// The word is always sent most-significant byte first. Components outside
/// their field width are truncated to it on encode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    /// East-west coordinate, 26 bits.
    pub x: i32,
    /// Height, 12 bits.
    pub y: i32,
    /// North-south coordinate, 26 bits.
    pub z: i32,
}

impl Position {
    /// Smallest representable x/z.
    pub const HORIZONTAL_MIN: i32 = -(1 << 25);
    /// Largest representable x/z.
    pub const HORIZONTAL_MAX: i32 = (1 << 25) - 1;
    /// Smallest representable y.
    pub const VERTICAL_MIN: i32 = -(1 << 11);
    /// Largest representable y.
    pub const VERTICAL_MAX: i32 = (1 << 11) - 1;

    /// Creates a position.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns true if every component fits its field without truncation.
    #[must_use]
    pub const fn is_representable(&self) -> bool {
        self.x >= Self::HORIZONTAL_MIN
            && self.x <= Self::HORIZONTAL_MAX
            && self.z >= Self::HORIZONTAL_MIN
            && self.z <= Self::HORIZONTAL_MAX
            && self.y >= Self::VERTICAL_MIN
            && self.y <= Self::VERTICAL_MAX
    }

    /// Packs into the 64-bit wire word.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn pack(&self) -> u64 {
        ((self.x as u64 & MASK_26) << 38) | ((self.z as u64 & MASK_26) << 12) | (self.y as u64 & MASK_12)
    }

    /// Unpacks the 64-bit wire word, sign-extending each field.
    #[must_use]
    pub const fn unpack(word: u64) -> Self {
        Self {
            x: sign_extend(word >> 38, 26),
            y: sign_extend(word & MASK_12, 12),
            z: sign_extend((word >> 12) & MASK_26, 26),
        }
    }
}

/// Sign-extends the low `bits` bits of `raw`.
#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
const fn sign_extend(raw: u64, bits: u32) -> i32 {
    let shift = 64 - bits;
    (((raw << shift) as i64) >> shift) as i32
}

impl Encode for Position {
    #[inline]
    fn encode<B: BufMut>(&self, buf: &mut B) {
        self.pack().encode(buf);
    }
}

impl Decode for Position {
    #[inline]
    fn decode(reader: &mut PacketReader<'_>) -> ProtocolResult<Self> {
        u64::decode(reader).map(Self::unpack)
    }
}
