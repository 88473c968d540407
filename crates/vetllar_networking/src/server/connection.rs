//! # Client Connection Management
//!
//! One record per connected client: the link, its handshake state, and the
//! single interactor it is allowed to drive.

use vetllar_core::EntityId;

use crate::protocol::{Packet, PacketHeader, PacketSerializer};
use crate::transport::LoopbackEndpoint;

/// Unique identifier for a client connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u32);

/// State of a client connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Link accepted, waiting for the client's Connect.
    #[default]
    Connecting,
    /// Handshake complete, receiving replication.
    Connected,
    /// Closed, pending cleanup.
    Disconnected,
}

/// A connected client.
pub struct ClientConnection {
    /// Connection ID.
    pub id: ConnectionId,
    /// Connection state.
    pub state: ConnectionState,
    /// The only interactor this client may send requests for.
    pub interactor: EntityId,
    /// Last sequence number received from the client.
    pub last_recv_sequence: u32,
    next_send_sequence: u32,
    endpoint: LoopbackEndpoint,
}

impl ClientConnection {
    /// Creates a connection record.
    #[must_use]
    pub fn new(id: ConnectionId, interactor: EntityId, endpoint: LoopbackEndpoint) -> Self {
        Self {
            id,
            state: ConnectionState::Connecting,
            interactor,
            last_recv_sequence: 0,
            next_send_sequence: 0,
            endpoint,
        }
    }

    /// Next datagram from the client.
    pub fn recv(&mut self) -> Option<Vec<u8>> {
        self.endpoint.recv()
    }

    /// True once the client end has gone away.
    #[must_use]
    pub const fn is_link_closed(&self) -> bool {
        self.endpoint.is_closed()
    }

    /// Stamps a header, encodes and sends one packet.
    pub fn send(
        &mut self,
        serializer: &mut PacketSerializer,
        tick: u32,
        build: impl FnOnce(PacketHeader) -> Packet,
    ) -> bool {
        let header = PacketHeader::new(self.next_send_sequence, tick);
        self.next_send_sequence = self.next_send_sequence.wrapping_add(1);
        match serializer.serialize(&build(header)) {
            Ok(bytes) => self.endpoint.send(bytes),
            Err(err) => {
                tracing::warn!(connection = self.id.0, %err, "failed to encode packet");
                false
            }
        }
    }
}
