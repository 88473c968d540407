//! # Vetllar Core
//!
//! Entity bookkeeping shared by the interaction and networking crates.
//!
//! ## Handles, not pointers
//!
//! Nothing in the interaction system holds another entity alive. Every
//! cross-entity reference is an [`EntityId`] (or a [`TargetRef`] naming a
//! sub-component of one) that has to be validated against the [`Registry`]
//! on every access. A stale handle simply fails to resolve.
//!
//! ## Example
//!
//! ```rust
//! use vetllar_core::{Registry, Vec3};
//!
//! let mut registry = Registry::new(16);
//! let door = registry.spawn(Vec3::new(1.0, 0.0, 0.0)).unwrap();
//! assert!(registry.is_alive(door));
//!
//! registry.despawn(door);
//! assert!(!registry.is_alive(door));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod ecs;
pub mod math;

pub use ecs::{EntityId, Registry, TargetRef};
pub use math::Vec3;
