//! # Protocol Error Types
//!
//! Everything that can go wrong while turning bytes into records and back.

use thiserror::Error;

/// Errors raised by the wire codecs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The input ended before the value was complete.
    #[error("insufficient data to complete decode")]
    InsufficientData,

    /// A VarInt/VarLong kept its continuation bit past the maximum byte count.
    #[error("variable-length integer exceeds its maximum byte count")]
    DataOverflow,

    /// An enumerated ordinal has no matching variant.
    #[error("unknown {kind} variant: {value}")]
    UnknownVariant {
        /// Name of the enumeration being decoded.
        kind: &'static str,
        /// The ordinal found on the wire.
        value: i64,
    },

    /// A length prefix that cannot describe a real payload.
    ///
    /// Negative string lengths, frames shorter than their own id, and frames
    /// beyond the size limit all end up here.
    #[error("invalid length prefix: {length}")]
    InvalidLength {
        /// The declared length.
        length: i64,
    },

    /// An outbound frame would exceed the frame size limit.
    ///
    /// Raised by the frame writer, never by bytes received from a peer.
    #[error("outbound frame of {length} bytes exceeds the frame size limit")]
    FrameTooLarge {
        /// Id + payload size of the rejected frame.
        length: usize,
    },
}

impl ProtocolError {
    /// Returns true if this error desynchronises the stream.
    ///
    /// Only [`ProtocolError::InsufficientData`] can be cured by waiting for
    /// more bytes; every other decode error means the cursor no longer lines
    /// up with a value boundary and the connection must be closed.
    /// [`ProtocolError::FrameTooLarge`] is the local side's fault and is not
    /// a violation.
    #[inline]
    #[must_use]
    pub const fn is_violation(&self) -> bool {
        !matches!(self, Self::InsufficientData | Self::FrameTooLarge { .. })
    }
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
