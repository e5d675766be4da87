//! # Variable-Length Integers
//!
//! 7-bit groups, least-significant group first, high bit set on every byte
//! except the last.
//!
//! ```text
//! 25565 = 0b1_1000111_1011101
//!       -> [1_1011101] [1_1000111] [0_0000001]
//!       -> [0xDD, 0xC7, 0x01]
//! ```
//!
//! No zigzag transform is applied: a negative value carries its two's
//! complement bit pattern, so it always takes the maximum byte count.

use std::fmt;

use bytes::BufMut;

use super::codec::{Decode, Encode, PacketReader};
use super::error::{ProtocolError, ProtocolResult};

/// Continuation bit.
const CONTINUE: u8 = 0x80;

/// Payload bits of a single byte.
const SEGMENT: u8 = 0x7F;

macro_rules! variable_length {
    (
        $(#[$meta:meta])*
        $name:ident($signed:ty, $unsigned:ty, $max:literal)
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub $signed);

        impl $name {
            /// Maximum number of bytes an encoded value may occupy.
            pub const MAX_BYTES: usize = $max;

            /// Returns the wrapped integer.
            #[inline]
            #[must_use]
            pub const fn value(self) -> $signed {
                self.0
            }

            /// Returns the canonical encoded size in bytes.
            #[inline]
            #[must_use]
            #[allow(clippy::cast_sign_loss)]
            pub const fn byte_len(self) -> usize {
                let bits = <$unsigned>::BITS - (self.0 as $unsigned).leading_zeros();
                if bits == 0 {
                    1
                } else {
                    ((bits + 6) / 7) as usize
                }
            }

            /// Encodes into a stack buffer.
            ///
            /// Returns the buffer and the number of bytes used; the used
            /// prefix is always the canonical encoding.
            #[must_use]
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            pub fn to_array(self) -> ([u8; $max], usize) {
                let mut out = [0u8; $max];
                let mut remaining = self.0 as $unsigned;
                let mut len = 0;
                loop {
                    let byte = (remaining as u8) & SEGMENT;
                    remaining >>= 7;
                    if remaining == 0 {
                        out[len] = byte;
                        return (out, len + 1);
                    }
                    out[len] = byte | CONTINUE;
                    len += 1;
                }
            }

            /// Decodes a value from the start of `bytes`.
            ///
            /// Trailing bytes after the terminal byte are ignored. Returns
            /// the value and the number of bytes it occupied.
            ///
            /// # Errors
            ///
            /// [`ProtocolError::InsufficientData`] if the input ends while
            /// the continuation bit is still set, and
            /// [`ProtocolError::DataOverflow`] if it is still set on the
            /// last permitted byte.
            #[allow(clippy::cast_possible_wrap)]
            pub fn decode_prefix(bytes: &[u8]) -> ProtocolResult<(Self, usize)> {
                let mut result: $unsigned = 0;
                for index in 0..$max {
                    let Some(&byte) = bytes.get(index) else {
                        return Err(ProtocolError::InsufficientData);
                    };
                    result |= <$unsigned>::from(byte & SEGMENT) << (7 * index);
                    if byte & CONTINUE == 0 {
                        return Ok((Self(result as $signed), index + 1));
                    }
                }
                Err(ProtocolError::DataOverflow)
            }
        }

        impl Encode for $name {
            #[inline]
            fn encode<B: BufMut>(&self, buf: &mut B) {
                let (bytes, len) = self.to_array();
                buf.put_slice(&bytes[..len]);
            }
        }

        impl Decode for $name {
            #[inline]
            fn decode(reader: &mut PacketReader<'_>) -> ProtocolResult<Self> {
                let (value, len) = Self::decode_prefix(reader.remaining_slice())?;
                reader.skip(len)?;
                Ok(value)
            }
        }

        impl From<$signed> for $name {
            #[inline]
            fn from(value: $signed) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $signed {
            #[inline]
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

variable_length! {
    /// A 32-bit signed integer encoded in 1..=5 bytes.
    VarInt(i32, u32, 5)
}

variable_length! {
    /// A 64-bit signed integer encoded in 1..=10 bytes.
    VarLong(i64, u64, 10)
}
