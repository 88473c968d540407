//! # Interaction Server
//!
//! The authoritative side of the replication channel.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    INTERACTION SERVER                      │
//! ├────────────────────────────────────────────────────────────┤
//! │  receive ──> ownership check ──> world.handle_request      │
//! │                                                            │
//! │  world.update(dt) ──> collect_replication ──> broadcast    │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! A request is only honored for the interactor the sending connection
//! owns, and is then re-validated by the world against authoritative state.

mod connection;

pub use connection::{ClientConnection, ConnectionId, ConnectionState};

use vetllar_core::EntityId;
use vetllar_interaction::{InteractionWorld, NetRole, ReplicationUpdate, SpatialQuery};

use crate::protocol::{ConnectAck, Packet, PacketDeserializer, PacketSerializer};
use crate::transport::LoopbackEndpoint;
use crate::{MAX_CLIENTS, TICK_RATE};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Server tick rate (updates per second).
    pub tick_rate: u32,
    /// Maximum number of concurrent clients.
    pub max_clients: usize,
    /// Entity registry capacity.
    pub entity_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            max_clients: MAX_CLIENTS,
            entity_capacity: 1024,
        }
    }
}

/// The authoritative interaction server.
pub struct InteractionServer {
    config: ServerConfig,
    world: InteractionWorld,
    connections: Vec<ClientConnection>,
    serializer: PacketSerializer,
    tick: u32,
    next_connection_id: u32,
}

impl InteractionServer {
    /// Creates a server with an empty authoritative world.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let world = InteractionWorld::new(NetRole::Authority, config.entity_capacity);
        Self::with_world(config, world)
    }

    /// Creates a server around an already populated authoritative world.
    #[must_use]
    pub fn with_world(config: ServerConfig, world: InteractionWorld) -> Self {
        debug_assert!(world.role().has_authority());
        Self {
            config,
            world,
            connections: Vec::new(),
            serializer: PacketSerializer::new(),
            tick: 0,
            next_connection_id: 0,
        }
    }

    /// Server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The authoritative world.
    #[must_use]
    pub const fn world(&self) -> &InteractionWorld {
        &self.world
    }

    /// Mutable authoritative world.
    pub fn world_mut(&mut self) -> &mut InteractionWorld {
        &mut self.world
    }

    /// Ticks processed so far.
    #[must_use]
    pub const fn tick_count(&self) -> u32 {
        self.tick
    }

    /// Number of live connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// The connection record for `id`.
    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<&ClientConnection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Registers a link for a client that will drive `interactor`.
    ///
    /// Returns `None` when the server is full or `interactor` has no
    /// controller in the world.
    pub fn accept(&mut self, endpoint: LoopbackEndpoint, interactor: EntityId) -> Option<ConnectionId> {
        if self.connections.len() >= self.config.max_clients {
            tracing::warn!("server full, refusing connection");
            return None;
        }
        if self.world.interactor(interactor).is_none() {
            tracing::warn!(%interactor, "refusing connection for an entity without a controller");
            return None;
        }
        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id = self.next_connection_id.wrapping_add(1);
        self.connections.push(ClientConnection::new(id, interactor, endpoint));
        tracing::debug!(connection = id.0, %interactor, "link accepted");
        Some(id)
    }

    /// One server tick: handle incoming packets, advance the world, then
    /// replicate whatever changed.
    pub fn tick(&mut self, dt: f32, spatial: &dyn SpatialQuery) {
        self.receive();
        self.world.update(dt, spatial);
        let updates = self.world.collect_replication();
        self.broadcast(&updates);
        self.tick = self.tick.wrapping_add(1);
    }

    fn receive(&mut self) {
        for connection in &mut self.connections {
            while let Some(datagram) = connection.recv() {
                let packet = match PacketDeserializer::new(&datagram).deserialize() {
                    Ok(packet) => packet,
                    Err(err) => {
                        tracing::warn!(connection = connection.id.0, %err, "dropping malformed packet");
                        continue;
                    }
                };
                connection.last_recv_sequence = packet.header().sequence;
                match packet {
                    Packet::Connect(_) => {
                        Self::handshake(&self.world, &mut self.serializer, connection, self.tick);
                    }
                    Packet::Request(_, payload) => {
                        let request = match payload.to_request() {
                            Ok(request) => request,
                            Err(err) => {
                                tracing::warn!(connection = connection.id.0, %err, "dropping malformed request");
                                continue;
                            }
                        };
                        if connection.state != ConnectionState::Connected
                            || request.interactor() != connection.interactor
                        {
                            tracing::warn!(
                                connection = connection.id.0,
                                requested = %request.interactor(),
                                owned = %connection.interactor,
                                "rejecting request for an interactor this connection does not own"
                            );
                            continue;
                        }
                        if let Err(err) = self.world.handle_request(request) {
                            tracing::warn!(connection = connection.id.0, %err, "request rejected");
                        }
                    }
                    Packet::Disconnect(_) => {
                        connection.state = ConnectionState::Disconnected;
                    }
                    other => {
                        tracing::warn!(
                            connection = connection.id.0,
                            packet = ?other.packet_type(),
                            "unexpected packet from client"
                        );
                    }
                }
            }
            if connection.is_link_closed() {
                connection.state = ConnectionState::Disconnected;
            }
        }

        let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.connections)
            .into_iter()
            .partition(|c| c.state == ConnectionState::Disconnected);
        self.connections = kept;
        for connection in gone {
            tracing::debug!(connection = connection.id.0, interactor = %connection.interactor, "client left");
            self.world.remove_interactor(connection.interactor);
        }
    }

    fn handshake(
        world: &InteractionWorld,
        serializer: &mut PacketSerializer,
        connection: &mut ClientConnection,
        tick: u32,
    ) {
        let ack = ConnectAck {
            client_id: connection.id.0,
            interactor: connection.interactor.to_bits(),
            ..ConnectAck::default()
        };
        connection.send(serializer, tick, |header| Packet::ConnectAck(header, ack));
        for update in world.full_replication() {
            connection.send(serializer, tick, |header| Packet::replication(header, &update));
        }
        connection.state = ConnectionState::Connected;
        tracing::debug!(connection = connection.id.0, "client connected");
    }

    fn broadcast(&mut self, updates: &[ReplicationUpdate]) {
        if updates.is_empty() {
            return;
        }
        for connection in &mut self.connections {
            if connection.state != ConnectionState::Connected {
                continue;
            }
            for update in updates {
                connection.send(&mut self.serializer, self.tick, |header| {
                    Packet::replication(header, update)
                });
            }
        }
    }
}
