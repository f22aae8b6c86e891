//! `starproto`: the slice of the game wire protocol the bookmark shard speaks.
//!
//! Every message, game packet or broker request alike, is carried in the game's
//! packet framing:
//! - packet id: 1 byte
//! - payload length: signed VLQ (negative means a compressed payload)
//! - payload: id-specific
//!
//! Decoders return `bytes::Bytes` slices that reference the original packet payload.

pub mod fly_ship;
pub mod packet;
pub mod player;
pub mod shard;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtoError {
    /// A fixed-layout field runs past the end of the payload.
    Truncated { need: usize, got: usize },
    /// A length prefix kept its continuation bit set past `MAX_VLQ_LEN` bytes.
    VlqOverrun,
    /// Negative length: the game's compressed form, which is never accepted here.
    Compressed { id: u8 },
    PayloadTooLarge { id: u8, len: usize, max: usize },
    /// A fixed-size payload arrived with the wrong size.
    PayloadLen { id: u8, want: usize, got: usize },
    UnknownType(u8),
    BadField(&'static str),
}

impl std::fmt::Display for ProtoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtoError::Truncated { need, got } => {
                write!(f, "payload truncated: need {need} bytes, got {got}")
            }
            ProtoError::VlqOverrun => write!(f, "length prefix longer than {} bytes", packet::MAX_VLQ_LEN),
            ProtoError::Compressed { id } => {
                write!(f, "packet {id} is compressed; compressed packets are not supported")
            }
            ProtoError::PayloadTooLarge { id, len, max } => {
                write!(f, "packet {id} payload of {len} bytes exceeds limit {max}")
            }
            ProtoError::PayloadLen { id, want, got } => {
                write!(f, "packet {id} payload must be {want} bytes, got {got}")
            }
            ProtoError::UnknownType(t) => write!(f, "unknown packet type: 0x{t:02x}"),
            ProtoError::BadField(s) => write!(f, "bad field: {s}"),
        }
    }
}

impl std::error::Error for ProtoError {}
