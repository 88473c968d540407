//! # Interaction Client
//!
//! The observing side of the replication channel.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   INTERACTION CLIENT                     │
//! ├──────────────────────────────────────────────────────────┤
//! │  poll():   datagrams ──> apply_replication ──> events    │
//! │  update(): local scan (focus prediction)                 │
//! │  input:    start / stop ──> request ──> server           │
//! └──────────────────────────────────────────────────────────┘
//! ```

use vetllar_core::EntityId;
use vetllar_interaction::{
    InteractionError, InteractionOutcome, InteractionWorld, ReplicationUpdate, SpatialQuery,
};

use crate::protocol::{Packet, PacketDeserializer, PacketHeader, PacketSerializer, ProtocolError};
use crate::transport::LoopbackEndpoint;

/// Client state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClientState {
    /// Not connected.
    #[default]
    Disconnected,
    /// Connect sent, waiting for the ack.
    Connecting,
    /// Connected and receiving replication.
    Connected,
}

/// A client driving one interactor through the server.
pub struct InteractionClient {
    world: InteractionWorld,
    endpoint: LoopbackEndpoint,
    state: ClientState,
    client_id: Option<u32>,
    interactor: Option<EntityId>,
    serializer: PacketSerializer,
    next_send_sequence: u32,
    tick: u32,
}

impl InteractionClient {
    /// Creates a client around an observer world mirroring the server's.
    #[must_use]
    pub fn new(world: InteractionWorld, endpoint: LoopbackEndpoint) -> Self {
        debug_assert!(!world.role().has_authority());
        Self {
            world,
            endpoint,
            state: ClientState::Disconnected,
            client_id: None,
            interactor: None,
            serializer: PacketSerializer::new(),
            next_send_sequence: 0,
            tick: 0,
        }
    }

    /// Connection state.
    #[must_use]
    pub const fn state(&self) -> ClientState {
        self.state
    }

    /// Server-assigned id, once connected.
    #[must_use]
    pub const fn client_id(&self) -> Option<u32> {
        self.client_id
    }

    /// The interactor this client drives, once connected.
    #[must_use]
    pub const fn interactor(&self) -> Option<EntityId> {
        self.interactor
    }

    /// The local observer world.
    #[must_use]
    pub const fn world(&self) -> &InteractionWorld {
        &self.world
    }

    /// Mutable local observer world.
    pub fn world_mut(&mut self) -> &mut InteractionWorld {
        &mut self.world
    }

    /// Starts the handshake.
    pub fn connect(&mut self) {
        if self.state != ClientState::Disconnected {
            return;
        }
        if self.send(Packet::Connect) {
            self.state = ClientState::Connecting;
        }
    }

    /// Tells the server this client is leaving.
    pub fn disconnect(&mut self) {
        if self.state == ClientState::Disconnected {
            return;
        }
        self.send(Packet::Disconnect);
        self.state = ClientState::Disconnected;
        self.interactor = None;
    }

    /// Applies everything the server sent since the last poll.
    pub fn poll(&mut self) {
        while let Some(datagram) = self.endpoint.recv() {
            let packet = match PacketDeserializer::new(&datagram).deserialize() {
                Ok(packet) => packet,
                Err(err) => {
                    tracing::warn!(%err, "dropping malformed packet from server");
                    continue;
                }
            };
            match packet {
                Packet::ConnectAck(_, ack) => {
                    let interactor = EntityId::from_bits(ack.interactor);
                    let local = self
                        .world
                        .interactor(interactor)
                        .is_some_and(|c| c.is_locally_controlled());
                    if !local {
                        tracing::warn!(%interactor, "server assigned an interactor this client does not control");
                    }
                    self.client_id = Some(ack.client_id);
                    self.interactor = Some(interactor);
                    self.state = ClientState::Connected;
                    tracing::debug!(client_id = ack.client_id, %interactor, "connected");
                }
                Packet::Interactor(_, payload) => self.apply(payload.decode()),
                Packet::Interactable(_, payload) => self.apply(payload.decode()),
                Packet::Disconnect(_) => {
                    self.state = ClientState::Disconnected;
                    self.interactor = None;
                }
                other => {
                    tracing::warn!(packet = ?other.packet_type(), "unexpected packet from server");
                }
            }
        }
    }

    fn apply(&mut self, update: Result<ReplicationUpdate, ProtocolError>) {
        match update {
            Ok(update) => {
                if let Err(err) = self.world.apply_replication(update) {
                    tracing::warn!(%err, "replicated state has no local counterpart");
                }
            }
            Err(err) => tracing::warn!(%err, "dropping malformed snapshot"),
        }
    }

    /// Advances local prediction and flushes queued requests.
    pub fn update(&mut self, dt: f32, spatial: &dyn SpatialQuery) {
        self.world.update(dt, spatial);
        self.flush_requests();
        self.tick = self.tick.wrapping_add(1);
    }

    /// Asks the server to start interacting with the current focus.
    ///
    /// # Errors
    ///
    /// [`InteractionError::NotAnInteractor`] before the handshake completes.
    pub fn start_interaction(&mut self) -> InteractionOutcome<()> {
        let interactor = self.owned()?;
        self.world.start_interaction(interactor)?;
        self.flush_requests();
        Ok(())
    }

    /// Re-focuses from a touch point, then asks the server to start.
    ///
    /// # Errors
    ///
    /// [`InteractionError::NotAnInteractor`] before the handshake completes.
    pub fn start_touch_interaction(&mut self, spatial: &dyn SpatialQuery) -> InteractionOutcome<()> {
        let interactor = self.owned()?;
        self.world.start_touch_interaction(interactor, spatial)?;
        self.flush_requests();
        Ok(())
    }

    /// Asks the server to stop the current hold interaction.
    ///
    /// # Errors
    ///
    /// [`InteractionError::NotAnInteractor`] before the handshake completes.
    pub fn stop_interaction(&mut self) -> InteractionOutcome<()> {
        let interactor = self.owned()?;
        self.world.stop_interaction(interactor)?;
        self.flush_requests();
        Ok(())
    }

    fn owned(&self) -> InteractionOutcome<EntityId> {
        self.interactor
            .ok_or(InteractionError::NotAnInteractor(EntityId::NULL))
    }

    fn flush_requests(&mut self) {
        for request in self.world.drain_requests() {
            if self.state != ClientState::Connected {
                tracing::debug!(?request, "not connected, dropping request");
                continue;
            }
            self.send(|header| Packet::request(header, &request));
        }
    }

    fn send(&mut self, build: impl FnOnce(PacketHeader) -> Packet) -> bool {
        let header = PacketHeader::new(self.next_send_sequence, self.tick);
        self.next_send_sequence = self.next_send_sequence.wrapping_add(1);
        match self.serializer.serialize(&build(header)) {
            Ok(bytes) => self.endpoint.send(bytes),
            Err(err) => {
                tracing::warn!(%err, "failed to encode packet");
                false
            }
        }
    }
}
