//! # Vetllar Interaction
//!
//! Server-authoritative focus-and-interact.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      INTERACTION WORLD                        │
//! │                                                               │
//! │  ┌────────────────┐   scan hits   ┌──────────────────────┐    │
//! │  │  Interactor    │──────────────>│  Focus resolution    │    │
//! │  │  controller    │<──────────────│  (closest wins)      │    │
//! │  └───────┬────────┘     focus     └──────────────────────┘    │
//! │          │ start / stop                                       │
//! │          v                                                    │
//! │  ┌────────────────┐  eligibility  ┌──────────────────────┐    │
//! │  │ Interactable   │<──────────────│  Capability probe    │    │
//! │  │ state machine  │               │  native / scripted   │    │
//! │  └───────┬────────┘               └──────────────────────┘    │
//! │          │ completion notice                                  │
//! │          v                                                    │
//! │   controller bookkeeping ──> events ──> replication snapshots │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority
//!
//! Exactly one side ([`NetRole::Authority`]) mutates interaction state.
//! Observers forward [`InteractionRequest`]s and replay the snapshots they
//! receive; they never decide eligibility themselves.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vetllar_core::{TargetRef, Vec3};
//! use vetllar_interaction::{
//!     InteractionWorld, InteractiveConfig, InteractorSettings, NetRole, ScriptedSpace,
//! };
//!
//! let mut world = InteractionWorld::new(NetRole::Authority, 16);
//! let player = world.registry_mut().spawn(Vec3::ZERO).unwrap();
//! let lever = world.registry_mut().spawn(Vec3::X).unwrap();
//! world.add_interactable(lever, Some(Arc::new(InteractiveConfig::instant())), true).unwrap();
//! world.add_interactor(player, InteractorSettings::default(), true).unwrap();
//!
//! let mut space = ScriptedSpace::new();
//! space.set_sweep_hits(vec![TargetRef::root(lever)]);
//! world.update(0.25, &space);
//! world.start_interaction(player).unwrap();
//!
//! assert!(!world.interactable(lever).unwrap().is_being_interacted_with());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod events;
pub mod focus;
pub mod interactable;
pub mod interactor;
pub mod probe;
pub mod request;
pub mod snapshot;
pub mod spatial;
pub mod timer;
pub mod types;
pub mod world;

pub use config::{ConfigLibrary, InteractiveConfig, InteractorSettings, PrerequisiteCheck};
pub use error::{InteractionError, InteractionOutcome};
pub use events::{EventBus, EventFanout, EventReceiver, EventSender, EventSink, InteractionEvent};
pub use focus::resolve_focus;
pub use interactable::InteractableStateMachine;
pub use interactor::InteractorController;
pub use probe::{CapabilityOverride, CapabilityProbe, OverrideTier};
pub use request::InteractionRequest;
pub use snapshot::{InteractableState, InteractorState, ReplicationUpdate};
pub use spatial::{PointerSource, ScriptedSpace, SpatialQuery};
pub use types::{Interactability, InteractionResult, NetRole, TraceMode};
pub use world::{InteractionContext, InteractionWorld};
