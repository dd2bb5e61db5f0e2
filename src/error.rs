//! Error types for simtraci
//!
//! Errors are split in two families:
//! - [`TraciError`]: fatal to the session that hit it (transport, framing,
//!   malformed protocol data). Propagated with `?` and ends the connection.
//! - [`crate::handler::HandlerError`]: recoverable, produced by command
//!   handlers and turned into a status response.

use thiserror::Error;

/// Result type alias using TraciError
pub type Result<T> = std::result::Result<T, TraciError>;

/// Unified fatal error type for simtraci operations
#[derive(Debug, Error)]
pub enum TraciError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    // -------------------------------------------------------------------------
    // Framing / Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Frame error: {0}")]
    Frame(String),

    #[error("Buffer underflow: need {needed} bytes, {available} available")]
    BufferUnderflow { needed: usize, available: usize },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unknown command identifier: 0x{0:02X}")]
    UnknownOpcode(u8),

    #[error("Unknown data type: 0x{0:02X}")]
    UnknownDataType(u8),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    // -------------------------------------------------------------------------
    // Simulation Errors
    // -------------------------------------------------------------------------
    #[error("Simulation driver is not running")]
    DriverStopped,

    #[error("Scenario error: {0}")]
    Scenario(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TraciError {
    /// True if the error means the peer went away rather than misbehaved
    pub fn is_disconnect(&self) -> bool {
        match self {
            TraciError::ConnectionClosed => true,
            TraciError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    /// True for errors caused by malformed traffic from the peer
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            TraciError::Frame(_)
                | TraciError::BufferUnderflow { .. }
                | TraciError::Protocol(_)
                | TraciError::UnknownOpcode(_)
                | TraciError::UnknownDataType(_)
                | TraciError::NotImplemented(_)
        )
    }
}
