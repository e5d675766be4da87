//! # Record Serialization
//!
//! Schema-driven encoding for network records.
//!
//! ## Design
//!
//! - A record's schema is its field list, in declaration order. Nothing
//!   else goes on the wire: no tags, no names.
//! - Every field type implements [`Encode`] and [`Decode`]; records built
//!   with [`record!`](crate::record) are just the concatenation of their
//!   fields, so nesting falls out for free.
//! - Fixed-width numbers are big-endian. Floats travel as the bit pattern of
//!   the unsigned integer of the same width.
//! - Reads are bounds-checked by [`PacketReader`]; running off the end is
//!   always [`ProtocolError::InsufficientData`], never a panic.

use bytes::BufMut;

use super::error::{ProtocolError, ProtocolResult};

/// Types that can be written to the wire.
pub trait Encode {
    /// Appends the encoded form of `self` to `buf`.
    fn encode<B: BufMut>(&self, buf: &mut B);
}

/// Types that can be read from the wire.
pub trait Decode: Sized {
    /// Reads one value, advancing the reader past it.
    ///
    /// # Errors
    ///
    /// Any [`ProtocolError`]; on error the reader position is unspecified.
    fn decode(reader: &mut PacketReader<'_>) -> ProtocolResult<Self>;
}

/// Bounds-checked cursor over a received byte slice.
#[derive(Clone, Debug)]
pub struct PacketReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> PacketReader<'a> {
    /// Creates a reader positioned at the start of `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Returns the current offset from the start of the buffer.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Returns true if every byte has been consumed.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the unread part of the buffer without consuming it.
    #[inline]
    #[must_use]
    pub fn remaining_slice(&self) -> &'a [u8] {
        self.buffer.get(self.position..).unwrap_or_default()
    }

    /// Advances past `len` bytes.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InsufficientData`] if fewer than `len` bytes remain.
    #[inline]
    pub fn skip(&mut self, len: usize) -> ProtocolResult<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Reads a single byte.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InsufficientData`] at end of input.
    #[inline]
    pub fn read_u8(&mut self) -> ProtocolResult<u8> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    /// Reads exactly `len` bytes, borrowing them from the underlying buffer.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InsufficientData`] if fewer than `len` bytes remain.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> ProtocolResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(ProtocolError::InsufficientData);
        }
        let start = self.position;
        self.position += len;
        Ok(&self.buffer[start..self.position])
    }

    /// Reads exactly `N` bytes into an array.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InsufficientData`] if fewer than `N` bytes remain.
    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> ProtocolResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Decodes one value of type `T`.
    ///
    /// # Errors
    ///
    /// Whatever `T::decode` reports.
    #[inline]
    pub fn read<T: Decode>(&mut self) -> ProtocolResult<T> {
        T::decode(self)
    }
}

macro_rules! fixed_width {
    ($($ty:ty),* $(,)?) => {$(
        impl Encode for $ty {
            #[inline]
            fn encode<B: BufMut>(&self, buf: &mut B) {
                buf.put_slice(&self.to_be_bytes());
            }
        }

        impl Decode for $ty {
            #[inline]
            fn decode(reader: &mut PacketReader<'_>) -> ProtocolResult<Self> {
                Ok(Self::from_be_bytes(reader.read_array()?))
            }
        }
    )*};
}

fixed_width!(i8, u8, i16, u16, i32, u32, i64, u64);

macro_rules! floating {
    ($($float:ty => $bits:ty),* $(,)?) => {$(
        impl Encode for $float {
            #[inline]
            fn encode<B: BufMut>(&self, buf: &mut B) {
                self.to_bits().encode(buf);
            }
        }

        impl Decode for $float {
            #[inline]
            fn decode(reader: &mut PacketReader<'_>) -> ProtocolResult<Self> {
                <$bits>::decode(reader).map(<$float>::from_bits)
            }
        }
    )*};
}

floating!(f32 => u32, f64 => u64);

impl Encode for bool {
    #[inline]
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(u8::from(*self));
    }
}

impl Decode for bool {
    #[inline]
    fn decode(reader: &mut PacketReader<'_>) -> ProtocolResult<Self> {
        match reader.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::UnknownVariant {
                kind: "bool",
                value: i64::from(other),
            }),
        }
    }
}

/// Declares a record whose wire layout is its fields in declaration order.
///
/// The struct gets `Clone`, `Debug` and `PartialEq` derives plus
/// [`Encode`] and [`Decode`] implementations that visit every field in the
/// order written. Field types may be any [`Encode`] + [`Decode`] type,
/// including other records.
///
/// ```
/// use basalt_networking::protocol::{Decode, Encode, PacketReader, VarInt};
///
/// basalt_networking::record! {
///     /// A chat message.
///     pub struct Chat {
///         /// Sender entity.
///         pub sender: VarInt,
///         /// Sent at, in ticks.
///         pub tick: u32,
///     }
/// }
///
/// let mut bytes = Vec::new();
/// Chat { sender: VarInt(300), tick: 7 }.encode(&mut bytes);
/// assert_eq!(bytes, [0xAC, 0x02, 0, 0, 0, 7]);
///
/// let decoded = PacketReader::new(&bytes).read::<Chat>().unwrap();
/// assert_eq!(decoded.sender.value(), 300);
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::protocol::Encode for $name {
            #[allow(unused_variables)]
            fn encode<B: $crate::protocol::BufMut>(&self, buf: &mut B) {
                $( $crate::protocol::Encode::encode(&self.$field, buf); )*
            }
        }

        impl $crate::protocol::Decode for $name {
            #[allow(unused_variables)]
            fn decode(
                reader: &mut $crate::protocol::PacketReader<'_>,
            ) -> $crate::protocol::ProtocolResult<Self> {
                Ok(Self {
                    $( $field: $crate::protocol::Decode::decode(reader)?, )*
                })
            }
        }
    };
}

/// Declares an enumeration carried on the wire as a VarInt ordinal.
///
/// Decoding an ordinal with no matching variant fails with
/// [`ProtocolError::UnknownVariant`].
///
/// ```
/// use basalt_networking::protocol::{PacketReader, ProtocolError};
///
/// basalt_networking::wire_enum! {
///     /// Which hand was used.
///     pub enum Hand {
///         /// Main hand.
///         Main = 0,
///         /// Off hand.
///         Off = 1,
///     }
/// }
///
/// assert_eq!(PacketReader::new(&[1]).read::<Hand>(), Ok(Hand::Off));
/// assert!(matches!(
///     PacketReader::new(&[9]).read::<Hand>(),
///     Err(ProtocolError::UnknownVariant { kind: "Hand", value: 9 })
/// ));
/// ```
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $ordinal:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(i32)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant = $ordinal,
            )*
        }

        impl $name {
            /// Returns the ordinal carried on the wire.
            #[inline]
            #[must_use]
            pub const fn ordinal(self) -> i32 {
                self as i32
            }

            /// Maps a wire ordinal back to its variant.
            #[must_use]
            pub const fn from_ordinal(value: i32) -> Option<Self> {
                match value {
                    $( $ordinal => Some(Self::$variant), )*
                    _ => None,
                }
            }
        }

        impl $crate::protocol::Encode for $name {
            #[inline]
            fn encode<B: $crate::protocol::BufMut>(&self, buf: &mut B) {
                $crate::protocol::Encode::encode(&$crate::protocol::VarInt(self.ordinal()), buf);
            }
        }

        impl $crate::protocol::Decode for $name {
            fn decode(
                reader: &mut $crate::protocol::PacketReader<'_>,
            ) -> $crate::protocol::ProtocolResult<Self> {
                let value = reader.read::<$crate::protocol::VarInt>()?.value();
                Self::from_ordinal(value).ok_or($crate::protocol::ProtocolError::UnknownVariant {
                    kind: stringify!($name),
                    value: i64::from(value),
                })
            }
        }
    };
}
