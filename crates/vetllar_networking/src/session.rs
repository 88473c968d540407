//! # Session Harness
//!
//! One server and one client per player, linked over loopback, all built
//! from the same [`Scene`] so entity ids line up on every side.
//!
//! Each tick runs in this order:
//!
//! ```text
//! clients: poll ─> update (scan, flush requests)
//! server:  receive ─> update ─> replicate
//! clients: poll
//! ```
//!
//! so a request issued during a tick is answered within that same tick.

use std::sync::Arc;

use vetllar_core::{EntityId, TargetRef, Vec3};
use vetllar_interaction::{
    InteractionError, InteractionOutcome, InteractionWorld, InteractiveConfig, InteractorSettings,
    NetRole, ScriptedSpace,
};

use crate::client::InteractionClient;
use crate::server::{InteractionServer, ServerConfig};
use crate::transport::loopback_pair;
use crate::TICK_DURATION;

const LINK_CAPACITY: usize = 1024;

struct InteractablePlacement {
    position: Vec3,
    config: Option<Arc<InteractiveConfig>>,
    enabled: bool,
}

struct PlayerPlacement {
    position: Vec3,
    settings: InteractorSettings,
}

/// Level description shared by every side.
#[derive(Default)]
pub struct Scene {
    interactables: Vec<InteractablePlacement>,
    players: Vec<PlayerPlacement>,
}

/// Entity ids produced by [`Scene::build`], in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SceneHandles {
    /// Interactable hosts.
    pub interactables: Vec<EntityId>,
    /// Player interactors.
    pub players: Vec<EntityId>,
}

impl Scene {
    /// Creates an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an enabled interactable. Returns its index.
    pub fn add_interactable(&mut self, position: Vec3, config: Option<Arc<InteractiveConfig>>) -> usize {
        self.interactables.push(InteractablePlacement {
            position,
            config,
            enabled: true,
        });
        self.interactables.len() - 1
    }

    /// Adds an interactable that starts disabled. Returns its index.
    pub fn add_disabled_interactable(
        &mut self,
        position: Vec3,
        config: Option<Arc<InteractiveConfig>>,
    ) -> usize {
        self.interactables.push(InteractablePlacement {
            position,
            config,
            enabled: false,
        });
        self.interactables.len() - 1
    }

    /// Adds a player. Returns its index.
    pub fn add_player(&mut self, position: Vec3, settings: InteractorSettings) -> usize {
        self.players.push(PlayerPlacement { position, settings });
        self.players.len() - 1
    }

    /// Entities the scene spawns.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.interactables.len() + self.players.len()
    }

    /// Spawns the scene into `world`. `local_player` marks the player whose
    /// input this side drives.
    ///
    /// # Errors
    ///
    /// Propagates world errors (bad settings, exhausted capacity).
    pub fn build(
        &self,
        world: &mut InteractionWorld,
        local_player: Option<usize>,
    ) -> InteractionOutcome<SceneHandles> {
        let mut handles = SceneHandles::default();
        for placed in &self.interactables {
            let entity = spawn(world, placed.position)?;
            world.add_interactable(entity, placed.config.clone(), placed.enabled)?;
            handles.interactables.push(entity);
        }
        for (index, placed) in self.players.iter().enumerate() {
            let entity = spawn(world, placed.position)?;
            world.add_interactor(entity, placed.settings.clone(), local_player == Some(index))?;
            handles.players.push(entity);
        }
        Ok(handles)
    }
}

fn spawn(world: &mut InteractionWorld, position: Vec3) -> InteractionOutcome<EntityId> {
    world
        .registry_mut()
        .spawn(position)
        .ok_or_else(|| InteractionError::InvalidConfig("entity capacity exhausted".to_owned()))
}

/// A server with one connected client per player.
pub struct Session {
    server: InteractionServer,
    server_space: ScriptedSpace,
    clients: Vec<InteractionClient>,
    client_spaces: Vec<ScriptedSpace>,
    handles: SceneHandles,
}

impl Session {
    /// Builds the scene on every side, links the clients and completes the
    /// handshake.
    ///
    /// # Errors
    ///
    /// Propagates scene build errors.
    pub fn new(scene: &Scene) -> InteractionOutcome<Self> {
        let capacity = scene.entity_count().max(1);
        let mut world = InteractionWorld::new(NetRole::Authority, capacity);
        let handles = scene.build(&mut world, None)?;
        let mut server = InteractionServer::with_world(ServerConfig::default(), world);

        let mut clients = Vec::with_capacity(handles.players.len());
        for (index, player) in handles.players.iter().enumerate() {
            let mut world = InteractionWorld::new(NetRole::Observer, capacity);
            scene.build(&mut world, Some(index))?;

            let (client_end, server_end) = loopback_pair(LINK_CAPACITY);
            if server.accept(server_end, *player).is_none() {
                tracing::warn!(%player, "server refused player");
            }
            let mut client = InteractionClient::new(world, client_end);
            client.connect();
            clients.push(client);
        }

        let client_spaces = vec![ScriptedSpace::new(); clients.len()];
        let mut session = Self {
            server,
            server_space: ScriptedSpace::new(),
            clients,
            client_spaces,
            handles,
        };
        session.tick(0.0);
        Ok(session)
    }

    /// The server.
    #[must_use]
    pub const fn server(&self) -> &InteractionServer {
        &self.server
    }

    /// Mutable server.
    pub fn server_mut(&mut self) -> &mut InteractionServer {
        &mut self.server
    }

    /// Client for player `index`.
    ///
    /// # Panics
    ///
    /// If `index` is out of range.
    #[must_use]
    pub fn client(&self, index: usize) -> &InteractionClient {
        &self.clients[index]
    }

    /// Mutable client for player `index`.
    ///
    /// # Panics
    ///
    /// If `index` is out of range.
    pub fn client_mut(&mut self, index: usize) -> &mut InteractionClient {
        &mut self.clients[index]
    }

    /// Client for player `index` together with its spatial backend.
    ///
    /// # Panics
    ///
    /// If `index` is out of range.
    pub fn client_with_space(&mut self, index: usize) -> (&mut InteractionClient, &ScriptedSpace) {
        (&mut self.clients[index], &self.client_spaces[index])
    }

    /// Number of clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Player interactor ids.
    #[must_use]
    pub fn players(&self) -> &[EntityId] {
        &self.handles.players
    }

    /// Interactable host ids.
    #[must_use]
    pub fn interactables(&self) -> &[EntityId] {
        &self.handles.interactables
    }

    /// The server's spatial backend.
    pub fn server_space_mut(&mut self) -> &mut ScriptedSpace {
        &mut self.server_space
    }

    /// Player `index`'s spatial backend.
    ///
    /// # Panics
    ///
    /// If `index` is out of range.
    pub fn client_space_mut(&mut self, index: usize) -> &mut ScriptedSpace {
        &mut self.client_spaces[index]
    }

    /// Makes every side's sweeps report `hits`.
    pub fn set_sweep_hits_everywhere(&mut self, hits: Vec<TargetRef>) {
        for space in &mut self.client_spaces {
            space.set_sweep_hits(hits.clone());
        }
        self.server_space.set_sweep_hits(hits);
    }

    /// Advances every side by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        for (client, space) in self.clients.iter_mut().zip(&self.client_spaces) {
            client.poll();
            client.update(dt, space);
        }
        self.server.tick(dt, &self.server_space);
        for client in &mut self.clients {
            client.poll();
        }
    }

    /// Runs fixed ticks covering `seconds`.
    pub fn run(&mut self, seconds: f32) {
        let ticks = (seconds / TICK_DURATION).ceil() as u32;
        for _ in 0..ticks {
            self.tick(TICK_DURATION);
        }
    }
}
