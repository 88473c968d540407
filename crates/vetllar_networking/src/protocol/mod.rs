//! # Wire Protocol
//!
//! Fixed-layout binary packets for interaction replication.
//!
//! ## Packet Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Type (1 byte)                                                │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Header (8 bytes): Sequence (4) │ Tick (4)                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Payload (fixed size per type, at most 40 bytes)              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every replicated snapshot is a boolean, a small enum, an opaque target
//! handle and an unsigned version counter. All integers are little-endian.

mod error;
mod packets;
mod serialization;

pub use error::ProtocolError;
pub use packets::{
    ConnectAck, InteractableStatePacket, InteractorStatePacket, Packet, PacketHeader, PacketType,
    RequestPacket, WireTarget,
};
pub use serialization::{PacketDeserializer, PacketSerializer};
