//! # Entity Registry
//!
//! The container for every entity the interaction system can see.
//! Slots are pre-allocated at creation; a slot's generation is bumped on
//! every reuse so old handles stop resolving.

use super::entity::{EntityId, TargetRef};
use crate::math::Vec3;

/// Per-entity data tracked by the registry.
#[derive(Clone, Debug, Default)]
struct Slot {
    id: EntityId,
    alive: bool,
    position: Vec3,
    forward: Vec3,
    /// Camera / eye point, if the entity has one.
    viewpoint: Option<Vec3>,
    /// Part offsets relative to `position`. Index 0 is the root.
    parts: Vec<Vec3>,
}

impl Slot {
    fn dead() -> Self {
        Self {
            id: EntityId::NULL,
            alive: false,
            position: Vec3::ZERO,
            forward: Vec3::X,
            viewpoint: None,
            parts: Vec::new(),
        }
    }
}

/// The entity registry.
///
/// The registry has a fixed capacity set at creation.
///
/// # Example
///
/// ```rust
/// use vetllar_core::{Registry, TargetRef, Vec3};
///
/// let mut registry = Registry::new(8);
/// let chest = registry.spawn(Vec3::new(2.0, 0.0, 0.0)).unwrap();
/// let lid = registry.add_part(chest, Vec3::new(0.0, 1.0, 0.0)).unwrap();
///
/// assert_eq!(registry.part_location(lid), Some(Vec3::new(2.0, 1.0, 0.0)));
/// assert_eq!(registry.part_location(TargetRef::root(chest)), Some(Vec3::new(2.0, 0.0, 0.0)));
/// ```
pub struct Registry {
    slots: Box<[Slot]>,
    /// Free list of slot indices for reuse.
    free_indices: Vec<u32>,
    alive_count: usize,
    capacity: usize,
}

impl Registry {
    /// Creates a new registry with the specified entity capacity.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or exceeds `u32::MAX`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        assert!(
            u32::try_from(capacity).is_ok(),
            "Capacity cannot exceed u32::MAX"
        );

        let slots = (0..capacity)
            .map(|_| Slot::dead())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        // Reverse so that index 0 is handed out first.
        let free_indices: Vec<u32> = (0..capacity as u32).rev().collect();

        Self {
            slots,
            free_indices,
            alive_count: 0,
            capacity,
        }
    }

    /// Returns the maximum capacity of this registry.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of currently alive entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Spawns a new entity at `position`, returning its ID.
    ///
    /// Returns `None` when capacity is reached.
    pub fn spawn(&mut self, position: Vec3) -> Option<EntityId> {
        let index = self.free_indices.pop()?;
        let slot = &mut self.slots[index as usize];

        // Increment generation to invalidate old references
        let generation = if slot.id.is_null() {
            0
        } else {
            slot.id.generation().wrapping_add(1)
        };
        let id = EntityId::new(index, generation);
        Self::activate(slot, id, position);
        self.alive_count += 1;
        Some(id)
    }

    /// Spawns an entity under an ID chosen by someone else.
    ///
    /// Observers use this to mirror the authoritative host's entity IDs so
    /// replicated handles resolve locally. Returns `false` if the slot is
    /// out of range or already occupied.
    pub fn spawn_with_id(&mut self, id: EntityId, position: Vec3) -> bool {
        if id.is_null() || id.index() as usize >= self.capacity {
            return false;
        }
        let index = id.index();
        if self.slots[index as usize].alive {
            return false;
        }
        let Some(free_pos) = self.free_indices.iter().position(|&i| i == index) else {
            return false;
        };
        self.free_indices.swap_remove(free_pos);

        Self::activate(&mut self.slots[index as usize], id, position);
        self.alive_count += 1;
        true
    }

    fn activate(slot: &mut Slot, id: EntityId, position: Vec3) {
        slot.id = id;
        slot.alive = true;
        slot.position = position;
        slot.forward = Vec3::X;
        slot.viewpoint = None;
        slot.parts.clear();
        slot.parts.push(Vec3::ZERO);
    }

    /// Despawns an entity, freeing its slot for reuse.
    ///
    /// Returns `false` if the entity was already dead or the ID was stale.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        slot.alive = false;
        slot.parts.clear();
        slot.viewpoint = None;
        self.alive_count -= 1;
        self.free_indices.push(id.index());
        true
    }

    /// Checks if an entity is alive and the handle is current.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.slot(id).is_some()
    }

    /// Checks that both the entity and the referenced part still exist.
    #[inline]
    #[must_use]
    pub fn is_valid(&self, target: TargetRef) -> bool {
        self.slot(target.entity)
            .is_some_and(|slot| (target.part as usize) < slot.parts.len())
    }

    /// Returns an entity's position.
    #[must_use]
    pub fn position(&self, id: EntityId) -> Option<Vec3> {
        self.slot(id).map(|slot| slot.position)
    }

    /// Moves an entity. Returns `false` for stale handles.
    pub fn set_position(&mut self, id: EntityId, position: Vec3) -> bool {
        self.slot_mut(id).map(|slot| slot.position = position).is_some()
    }

    /// Returns an entity's facing direction (unit length or zero).
    #[must_use]
    pub fn forward(&self, id: EntityId) -> Option<Vec3> {
        self.slot(id).map(|slot| slot.forward)
    }

    /// Turns an entity. The direction is normalized.
    pub fn set_forward(&mut self, id: EntityId, forward: Vec3) -> bool {
        self.slot_mut(id)
            .map(|slot| slot.forward = forward.normalize_or_zero())
            .is_some()
    }

    /// Returns an entity's viewpoint (camera) location, if it has one.
    #[must_use]
    pub fn viewpoint(&self, id: EntityId) -> Option<Vec3> {
        self.slot(id).and_then(|slot| slot.viewpoint)
    }

    /// Attaches or removes an entity's viewpoint.
    pub fn set_viewpoint(&mut self, id: EntityId, viewpoint: Option<Vec3>) -> bool {
        self.slot_mut(id).map(|slot| slot.viewpoint = viewpoint).is_some()
    }

    /// Adds a part at `offset` from the entity's position.
    pub fn add_part(&mut self, id: EntityId, offset: Vec3) -> Option<TargetRef> {
        let slot = self.slot_mut(id)?;
        let part = u32::try_from(slot.parts.len()).ok()?;
        slot.parts.push(offset);
        Some(TargetRef::new(id, part))
    }

    /// Resolves a part to its world location, validating the handle.
    #[must_use]
    pub fn part_location(&self, target: TargetRef) -> Option<Vec3> {
        let slot = self.slot(target.entity)?;
        let offset = slot.parts.get(target.part as usize)?;
        Some(slot.position + *offset)
    }

    /// Iterates over all alive entity IDs.
    pub fn iter_alive(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots.iter().filter(|s| s.alive).map(|s| s.id)
    }

    fn slot(&self, id: EntityId) -> Option<&Slot> {
        if id.is_null() {
            return None;
        }
        let slot = self.slots.get(id.index() as usize)?;
        (slot.alive && slot.id.generation() == id.generation()).then_some(slot)
    }

    fn slot_mut(&mut self, id: EntityId) -> Option<&mut Slot> {
        if id.is_null() {
            return None;
        }
        let slot = self.slots.get_mut(id.index() as usize)?;
        (slot.alive && slot.id.generation() == id.generation()).then_some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_and_despawn() {
        let mut registry = Registry::new(4);
        let a = registry.spawn(Vec3::ZERO).unwrap();
        let b = registry.spawn(Vec3::X).unwrap();
        assert_eq!(registry.alive_count(), 2);
        assert_ne!(a, b);

        assert!(registry.despawn(a));
        assert!(!registry.despawn(a));
        assert!(!registry.is_alive(a));
        assert_eq!(registry.alive_count(), 1);
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut registry = Registry::new(1);
        let first = registry.spawn(Vec3::ZERO).unwrap();
        registry.despawn(first);

        let second = registry.spawn(Vec3::X).unwrap();
        assert_eq!(first.index(), second.index());
        assert_ne!(first.generation(), second.generation());
        assert!(!registry.is_alive(first));
        assert_eq!(registry.position(first), None);
        assert_eq!(registry.position(second), Some(Vec3::X));
    }

    #[test]
    fn test_capacity_exhausted() {
        let mut registry = Registry::new(1);
        assert!(registry.spawn(Vec3::ZERO).is_some());
        assert!(registry.spawn(Vec3::ZERO).is_none());
    }

    #[test]
    fn test_spawn_with_id_mirrors_host() {
        let mut host = Registry::new(8);
        host.spawn(Vec3::ZERO).unwrap();
        let door = host.spawn(Vec3::X).unwrap();

        let mut mirror = Registry::new(8);
        assert!(mirror.spawn_with_id(door, Vec3::X));
        assert!(mirror.is_alive(door));
        assert!(!mirror.spawn_with_id(door, Vec3::X));

        // The mirrored slot is no longer handed out by `spawn`.
        let other = mirror.spawn(Vec3::ZERO).unwrap();
        assert_ne!(other.index(), door.index());
    }

    #[test]
    fn test_parts_resolve_relative_to_position() {
        let mut registry = Registry::new(2);
        let id = registry.spawn(Vec3::new(1.0, 0.0, 0.0)).unwrap();
        let part = registry.add_part(id, Vec3::new(0.0, 2.0, 0.0)).unwrap();
        assert_eq!(part.part, 1);

        registry.set_position(id, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(registry.part_location(part), Some(Vec3::new(5.0, 2.0, 0.0)));
        assert!(!registry.is_valid(TargetRef::new(id, 7)));

        registry.despawn(id);
        assert_eq!(registry.part_location(part), None);
    }

    #[test]
    fn test_forward_is_normalized() {
        let mut registry = Registry::new(1);
        let id = registry.spawn(Vec3::ZERO).unwrap();
        registry.set_forward(id, Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(registry.forward(id), Some(Vec3::Z));
    }
}
