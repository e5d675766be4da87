//! # Network Constants
//!
//! Defaults for the basalt server endpoint and wire limits.
//!
//! **NOTE:** The frame limits are part of the wire contract.
//! Changing them breaks compatibility with existing clients.

// =============================================================================
// NETWORK CONFIGURATION
// =============================================================================

/// Default port for game traffic
pub const DEFAULT_PORT: u16 = 25565;

/// Inactivity window before a silent connection is dropped, in milliseconds
pub const READ_TIMEOUT_MS: u64 = 5_000;

/// Back-off between non-blocking read attempts, in milliseconds
pub const POLL_INTERVAL_MS: u64 = 10;

/// Size of the scratch buffer used for each socket read
pub const READ_CHUNK_SIZE: usize = 4096;

// =============================================================================
// WIRE LIMITS
// =============================================================================

/// Largest declared frame length (id + payload) accepted from a peer.
///
/// This is the largest value a 3-byte VarInt can hold (2^21 - 1).
pub const MAX_FRAME_LENGTH: usize = 2_097_151;

// =============================================================================
// ADVERTISED VERSION
// =============================================================================

/// Protocol version number reported in the status response
pub const PROTOCOL_VERSION: i32 = 767;

/// Human-readable version reported in the status response
pub const VERSION_NAME: &str = "1.21.1";

/// Default player cap reported in the status response
pub const MAX_PLAYERS: u32 = 20;

/// Default message of the day
pub const MOTD: &str = "A Basalt Server";
