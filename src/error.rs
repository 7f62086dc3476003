//! Error types shared by the framing engine, the command translators and the HAL.

use thiserror::Error;

use crate::proto::command::{AckType, Request};

/// The reply did not match what the firmware contract promises.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame of {size} bytes does not fit the {capacity} byte receive buffer")]
    FrameTooLarge { size: usize, capacity: usize },
    #[error("wrong ACK type for {request:?} (expected {expected:?}, got {got:?})")]
    UnexpectedAck {
        request: Request,
        expected: AckType,
        got: AckType,
    },
    #[error("{field} at offset {offset} is out of bounds for a {len} byte payload")]
    Truncated {
        field: &'static str,
        offset: usize,
        len: usize,
    },
    #[error("malformed {0}")]
    Malformed(String),
}

/// Main error type for all concentrator operations.
#[derive(Debug, Error)]
pub enum HalError {
    /// I/O failure on the byte stream (including failing to open it).
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("MCU version mismatch (expected {expected}, got {got})")]
    VersionMismatch { expected: String, got: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("concentrator is not running, start it first")]
    NotStarted,

    #[error("concentrator is running, stop it before touching configuration")]
    AlreadyStarted,

    /// The firmware acknowledged the request with a non-success status code.
    #[error("{request:?} rejected by firmware with 0x{code:02X}")]
    Rejected { request: Request, code: u8 },
}

impl HalError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        HalError::InvalidArgument(msg.into())
    }
}

/// Result type alias using HalError.
pub type Result<T> = std::result::Result<T, HalError>;
