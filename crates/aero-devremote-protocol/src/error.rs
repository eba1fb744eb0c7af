use thiserror::Error;

/// Failure to turn bytes into a packet.
///
/// Every variant means the byte stream cannot be trusted any more: the peer is either not
/// speaking this protocol or is out of sync with us.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("bad remote magic 0x{found:08x} (expected 0x{expected:08x})")]
    BadRemoteMagic { found: u32, expected: u32 },

    #[error("bad packet magic 0x{found:08x} (expected 0x{expected:08x})")]
    BadPacketMagic { found: u32, expected: u32 },

    #[error("declared packet length {len} is smaller than the {min}-byte header")]
    LengthTooSmall { len: u32, min: usize },

    #[error("unknown packet type {code}")]
    UnknownPacketType { code: i8 },

    #[error("{context}: truncated (need {needed} bytes, {remaining} remaining)")]
    Truncated {
        context: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("{packet}: declared length {declared} does not match decoded length {decoded}")]
    LengthMismatch {
        packet: &'static str,
        declared: usize,
        decoded: usize,
    },

    #[error("buffer holds {actual} bytes but header declares {declared}")]
    BufferLengthMismatch { declared: usize, actual: usize },

    #[error("invalid {field} value {value}")]
    InvalidField { field: &'static str, value: i64 },
}

/// Failure to serialize a packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("packet too large: {len} bytes does not fit the u32 length field")]
    PacketTooLarge { len: usize },

    #[error("{field} too large: {len} > {max}")]
    FieldTooLarge {
        field: &'static str,
        len: usize,
        max: usize,
    },
}
