//! # Packet Serialization
//!
//! - Encoding writes into one reusable fixed buffer (no heap allocation)
//! - Payloads are Pod and copied as raw bytes
//! - Decoding reads unaligned, so any byte slice is accepted

use bytemuck::{bytes_of, Pod};

use super::error::ProtocolError;
use super::packets::{Packet, PacketHeader, PacketType};
use crate::MAX_PACKET_SIZE;

/// Packet serializer - writes packets to a pre-allocated buffer.
///
/// Reuse one instance across packets to avoid allocations.
pub struct PacketSerializer {
    buffer: [u8; MAX_PACKET_SIZE],
    position: usize,
}

impl PacketSerializer {
    /// Creates a new serializer with a fresh buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0u8; MAX_PACKET_SIZE],
            position: 0,
        }
    }

    /// Resets the serializer for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.position
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> bool {
        if self.position >= MAX_PACKET_SIZE {
            return false;
        }
        self.buffer[self.position] = value;
        self.position += 1;
        true
    }

    /// Writes a Pod type directly.
    #[inline]
    pub fn write_pod<T: Pod>(&mut self, value: &T) -> bool {
        let bytes = bytes_of(value);
        if self.position + bytes.len() > MAX_PACKET_SIZE {
            return false;
        }
        self.buffer[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        true
    }

    /// Writes a packet header.
    #[inline]
    pub fn write_header(&mut self, header: &PacketHeader) -> bool {
        self.write_pod(header)
    }

    /// Serializes a complete packet, replacing any previous contents.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::BufferFull`] if the packet does not fit.
    pub fn serialize(&mut self, packet: &Packet) -> Result<&[u8], ProtocolError> {
        self.reset();
        let written = self.write_u8(packet.packet_type() as u8)
            && self.write_header(&packet.header())
            && match packet {
                Packet::Connect(_) | Packet::Disconnect(_) => true,
                Packet::ConnectAck(_, ack) => self.write_pod(ack),
                Packet::Request(_, request) => self.write_pod(request),
                Packet::Interactor(_, state) => self.write_pod(state),
                Packet::Interactable(_, state) => self.write_pod(state),
            };
        if written {
            Ok(self.as_slice())
        } else {
            Err(ProtocolError::BufferFull)
        }
    }
}

impl Default for PacketSerializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Packet deserializer - reads packets from a buffer.
pub struct PacketDeserializer<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> PacketDeserializer<'a> {
    /// Creates a new deserializer from a buffer.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        let value = *self.buffer.get(self.position)?;
        self.position += 1;
        Some(value)
    }

    /// Reads a Pod type directly.
    #[inline]
    pub fn read_pod<T: Pod>(&mut self) -> Option<T> {
        let size = std::mem::size_of::<T>();
        let slice = self.buffer.get(self.position..self.position + size)?;
        self.position += size;
        bytemuck::try_pod_read_unaligned(slice).ok()
    }

    /// Reads a packet header.
    #[inline]
    pub fn read_header(&mut self) -> Option<PacketHeader> {
        self.read_pod()
    }

    fn payload<T: Pod>(&mut self) -> Result<T, ProtocolError> {
        self.read_pod().ok_or(ProtocolError::Truncated)
    }

    /// Deserializes one packet from the buffer.
    ///
    /// Payloads are checked for length only; field validation happens when
    /// they are converted into domain types.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Truncated`] or [`ProtocolError::UnknownPacketType`].
    pub fn deserialize(&mut self) -> Result<Packet, ProtocolError> {
        let packet_type = PacketType::from_u8(self.read_u8().ok_or(ProtocolError::Truncated)?)?;
        let header = self.read_header().ok_or(ProtocolError::Truncated)?;

        let packet = match packet_type {
            PacketType::Connect => Packet::Connect(header),
            PacketType::ConnectAck => Packet::ConnectAck(header, self.payload()?),
            PacketType::Request => Packet::Request(header, self.payload()?),
            PacketType::InteractorState => Packet::Interactor(header, self.payload()?),
            PacketType::InteractableState => Packet::Interactable(header, self.payload()?),
            PacketType::Disconnect => Packet::Disconnect(header),
        };
        Ok(packet)
    }
}
