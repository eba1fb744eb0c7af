use std::io;

use aero_devremote_protocol::{DecodeError, EncodeError, NopReason, PacketType};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RemoteError>;

/// The byte stream no longer lines up with packet boundaries.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("short read: expected {expected} bytes, stream ended after {got}")]
    ShortRead { expected: usize, got: usize },

    #[error("packet length {len} exceeds limit {max}")]
    PacketTooLarge { len: usize, max: usize },

    #[error("batched response carries {found} results for {expected} commands")]
    EntryCountMismatch { expected: usize, found: usize },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Every failure a remote device operation can report.
///
/// Failures of the device command itself are not errors at this layer: they come back inside
/// the response (`sense`, `error_no`).
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("unexpected packet: expected {expected:?}, received {received:?}")]
    UnexpectedPacket {
        expected: PacketType,
        received: PacketType,
    },

    #[error("server refused the connection ({reason:?}): {text} (errno {errno})")]
    HandshakeRefused {
        reason: NopReason,
        text: String,
        errno: i32,
    },

    #[error("unsupported packet version {found} (expected {expected})")]
    VersionMismatch { found: u8, expected: u8 },

    #[error("{operation:?} is not implemented by the server: {text}")]
    NotImplemented { operation: PacketType, text: String },

    #[error("{operation:?} refused ({reason:?}): {text} (errno {errno})")]
    Refused {
        operation: PacketType,
        reason: NopReason,
        text: String,
        errno: i32,
    },

    #[error("connection is closed")]
    Closed,

    #[error("invalid remote uri {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: &'static str },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<DecodeError> for RemoteError {
    fn from(err: DecodeError) -> Self {
        Self::Framing(FramingError::Decode(err))
    }
}

impl From<EncodeError> for RemoteError {
    fn from(err: EncodeError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl RemoteError {
    /// Numeric error code for callers that report failures as `errno` values.
    ///
    /// Transport failures carry the OS error number when there is one; refusals carry the
    /// peer's error code.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Connect { source, .. } => source.raw_os_error(),
            Self::Transport(err) => err.raw_os_error(),
            Self::HandshakeRefused { errno, .. } | Self::Refused { errno, .. } => Some(*errno),
            _ => None,
        }
    }

    /// Whether the connection is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Connect { .. }
            | Self::Transport(_)
            | Self::Framing(_)
            | Self::UnexpectedPacket { .. }
            | Self::HandshakeRefused { .. }
            | Self::VersionMismatch { .. }
            | Self::Closed => true,
            Self::NotImplemented { .. }
            | Self::Refused { .. }
            | Self::InvalidUri { .. }
            | Self::InvalidArgument(_) => false,
        }
    }
}
