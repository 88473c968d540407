//! # Entity Bookkeeping
//!
//! - Entity IDs are indices with generation counters
//! - A [`TargetRef`] names one sub-component of an entity
//! - The [`Registry`] is the only authority on whether a handle is still live

mod entity;
mod registry;

pub use entity::{EntityId, TargetRef};
pub use registry::Registry;
