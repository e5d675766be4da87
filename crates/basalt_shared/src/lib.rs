//! # Basalt Shared
//!
//! Constants and configuration used by every basalt binary.
//!
//! ## RULE
//!
//! This crate must NEVER depend on:
//! - `tokio`
//! - Socket types
//! - Anything that performs I/O beyond reading a config file
//!
//! If you need the wire protocol, it lives in `basalt_networking`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod constants;

pub use config::{ConfigError, ConfigResult, ServerConfig, StatusConfig};
pub use constants::{
    DEFAULT_PORT, MAX_FRAME_LENGTH, MAX_PLAYERS, MOTD, POLL_INTERVAL_MS,
    PROTOCOL_VERSION, READ_CHUNK_SIZE, READ_TIMEOUT_MS, VERSION_NAME,
};
