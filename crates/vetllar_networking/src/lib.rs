//! # Vetllar Networking
//!
//! The replication channel between one authoritative server and any number
//! of observing clients.
//!
//! ## Authority Model
//!
//! ```text
//! CLIENT                                   SERVER
//!   |                                         |
//!   |--- Request: "start on my focus" ------->|
//!   |                                         | <- re-validated against
//!   |                                         |    authoritative state
//!   |<-- InteractorState / InteractableState -|
//!   |    (only when changed)                  |
//! ```
//!
//! Clients never decide outcomes. They predict focus for responsiveness and
//! replay whatever the server replicates.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vetllar_core::{TargetRef, Vec3};
//! use vetllar_interaction::{InteractiveConfig, InteractorSettings};
//! use vetllar_networking::{Scene, Session};
//!
//! let mut scene = Scene::new();
//! scene.add_interactable(Vec3::X, Some(Arc::new(InteractiveConfig::instant())));
//! scene.add_player(Vec3::ZERO, InteractorSettings::default());
//!
//! let mut session = Session::new(&scene).unwrap();
//! let lever = session.interactables()[0];
//! session.set_sweep_hits_everywhere(vec![TargetRef::root(lever)]);
//! session.run(0.5);
//!
//! session.client_mut(0).start_interaction().unwrap();
//! session.run(0.1);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;

pub use client::{ClientState, InteractionClient};
pub use protocol::{Packet, PacketDeserializer, PacketSerializer, PacketType, ProtocolError};
pub use server::{ConnectionId, InteractionServer, ServerConfig};
pub use session::{Scene, SceneHandles, Session};
pub use transport::{loopback_pair, LoopbackEndpoint, TransportStats};

/// Simulation rate of the replication loop (updates per second).
pub const TICK_RATE: u32 = 30;

/// Duration of one tick in seconds.
pub const TICK_DURATION: f32 = 1.0 / TICK_RATE as f32;

/// Maximum encoded packet size in bytes.
pub const MAX_PACKET_SIZE: usize = 1200;

/// Maximum concurrent client connections per server.
pub const MAX_CLIENTS: usize = 64;
