//! # Entity Handles
//!
//! Entities are lightweight identifiers consisting of:
//! - An index into the registry slots
//! - A generation counter so a recycled slot never answers for an old handle

use bytemuck::{Pod, Zeroable};

/// Unique identifier for an entity.
///
/// The ID is split into two parts:
/// - Lower 32 bits: Index into registry slots
/// - Upper 32 bits: Generation counter for detecting stale references
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new entity ID from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Null/invalid entity ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }

    /// Raw packed value, as sent on the wire.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Rebuilds an ID from its packed wire value.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "Entity(null)")
        } else {
            write!(f, "Entity({}v{})", self.index(), self.generation())
        }
    }
}

/// Weak reference to one sub-component (part) of an entity.
///
/// Scans hit parts, not whole entities: a chest may expose its lid and its
/// lock as separate parts. Part `0` is always the entity's root.
///
/// Holding a `TargetRef` does not keep anything alive. Resolve it through
/// [`Registry::part_location`](super::Registry::part_location) before use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetRef {
    /// Owning entity.
    pub entity: EntityId,
    /// Part index within the entity.
    pub part: u32,
}

impl TargetRef {
    /// Root part index.
    pub const ROOT: u32 = 0;

    /// Creates a reference to a specific part.
    #[inline]
    #[must_use]
    pub const fn new(entity: EntityId, part: u32) -> Self {
        Self { entity, part }
    }

    /// Creates a reference to the root part of an entity.
    #[inline]
    #[must_use]
    pub const fn root(entity: EntityId) -> Self {
        Self::new(entity, Self::ROOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_roundtrip() {
        let id = EntityId::new(12345, 67890);
        assert_eq!(id.index(), 12345);
        assert_eq!(id.generation(), 67890);
        assert_eq!(EntityId::from_bits(id.to_bits()), id);
    }

    #[test]
    fn test_default_is_null() {
        assert!(EntityId::default().is_null());
        assert!(!EntityId::new(0, 0).is_null());
    }

    #[test]
    fn test_target_ref_root() {
        let id = EntityId::new(3, 1);
        let target = TargetRef::root(id);
        assert_eq!(target.part, TargetRef::ROOT);
        assert_ne!(target, TargetRef::new(id, 1));
    }
}
