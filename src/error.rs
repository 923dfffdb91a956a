use std::{fmt, io};

use thiserror::Error;

/// Machine-readable status code attached to every error surfaced by a call.
///
/// The numeric values follow the conventional RPC status numbering, so the
/// code a caller reports is meaningful outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    /// The peer reported an unclassified failure.
    Unknown = 2,
    /// The requested method does not exist on the service.
    Unimplemented = 12,
    /// Malformed frames or serialization failures on either side.
    Internal = 13,
    /// The transport could not reach, or lost, the peer.
    Unavailable = 14,
}

impl ErrorCode {
    /// Maps a wire value back to a code, defaulting to `Unknown`.
    pub fn from_u32(code: u32) -> Self {
        match code {
            12 => ErrorCode::Unimplemented,
            13 => ErrorCode::Internal,
            14 => ErrorCode::Unavailable,
            _ => ErrorCode::Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u32)
    }
}

/// Errors that can occur during RPC operations.
#[derive(Error, Debug)]
pub enum RpcError {
    /// Error occurred during I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error occurred while encoding a wire value.
    #[error("Encode error: {0}")]
    Encode(#[from] rmpv::encode::Error),

    /// Error occurred while decoding a wire value.
    #[error("Decode error: {0}")]
    Decode(#[from] rmpv::decode::Error),

    /// Error occurred while serializing a typed message.
    #[error("Serialize error: {0}")]
    Serialize(#[from] rmp_serde::encode::Error),

    /// Error occurred while deserializing a typed message.
    #[error("Deserialize error: {0}")]
    Deserialize(#[from] rmp_serde::decode::Error),

    /// Failed to establish the outbound connection.
    #[error("Connect error: {source}")]
    Connect {
        #[source]
        source: io::Error,
    },

    /// The connection dropped while calls were still in flight.
    #[error("Connection closed")]
    Disconnect,

    /// Error related to the RPC framing protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Error returned by the remote service, carried verbatim.
    #[error("{detail}")]
    Remote { code: ErrorCode, detail: String },
}

impl RpcError {
    /// The machine-readable code for this error. Remote errors keep the code
    /// the peer sent; local errors are classified by origin.
    pub fn code(&self) -> ErrorCode {
        match self {
            RpcError::Io(_) | RpcError::Connect { .. } | RpcError::Disconnect => {
                ErrorCode::Unavailable
            }
            RpcError::Encode(_)
            | RpcError::Decode(_)
            | RpcError::Serialize(_)
            | RpcError::Deserialize(_)
            | RpcError::Protocol(_) => ErrorCode::Internal,
            RpcError::Remote { code, .. } => *code,
        }
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
