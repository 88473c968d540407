//! Decode and encode failures.

use thiserror::Error;

use crate::MAX_PACKET_SIZE;

/// Errors produced while encoding or decoding packets.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// The buffer ended before the packet did.
    #[error("packet truncated")]
    Truncated,

    /// The leading type byte is not a known packet type.
    #[error("unknown packet type {0}")]
    UnknownPacketType(u8),

    /// An enum or boolean field holds an out-of-range value.
    #[error("invalid value {value} for field `{field}`")]
    InvalidEnum {
        /// Field name.
        field: &'static str,
        /// Raw value received.
        value: u8,
    },

    /// The packet does not fit in the encode buffer.
    #[error("packet exceeds {MAX_PACKET_SIZE} bytes")]
    BufferFull,
}
