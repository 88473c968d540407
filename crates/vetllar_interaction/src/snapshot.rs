//! # Replicated State
//!
//! The complete wire contract between the authoritative host and observers:
//! one snapshot per interactor and one per interactable.
//!
//! Each snapshot carries a version counter that is bumped every time the
//! interacting flag is *set*, not only when it changes. An observer that
//! receives `{false, v3}` after `{false, v1}` therefore knows an interaction
//! started and ended in between, which a plain flag comparison would miss.

use vetllar_core::{EntityId, TargetRef};

use crate::types::{Interactability, InteractionResult};

/// Replicated state owned by an interactor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InteractorState {
    is_interacting: bool,
    result: InteractionResult,
    focused: Option<TargetRef>,
    version: u64,
}

impl InteractorState {
    /// True while a timed interaction is in progress.
    #[inline]
    #[must_use]
    pub const fn is_interacting(&self) -> bool {
        self.is_interacting
    }

    /// Sets the interacting flag and bumps the version.
    pub fn set_is_interacting(&mut self, is_interacting: bool) {
        self.is_interacting = is_interacting;
        self.version = self.version.wrapping_add(1);
    }

    /// Result of the most recently ended interaction.
    #[inline]
    #[must_use]
    pub const fn result(&self) -> InteractionResult {
        self.result
    }

    /// Records how the current interaction ended.
    pub fn set_result(&mut self, result: InteractionResult) {
        self.result = result;
    }

    /// Current focus.
    #[inline]
    #[must_use]
    pub const fn focused_target(&self) -> Option<TargetRef> {
        self.focused
    }

    /// Entity owning the current focus.
    #[inline]
    #[must_use]
    pub fn focused_entity(&self) -> Option<EntityId> {
        self.focused.map(|target| target.entity)
    }

    /// Replaces the focus.
    pub fn set_focused_target(&mut self, target: Option<TargetRef>) {
        self.focused = target;
    }

    /// Replication version.
    #[inline]
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Rebuilds a snapshot from decoded wire fields.
    #[must_use]
    pub const fn from_parts(
        is_interacting: bool,
        result: InteractionResult,
        focused: Option<TargetRef>,
        version: u64,
    ) -> Self {
        Self {
            is_interacting,
            result,
            focused,
            version,
        }
    }
}

/// Replicated state owned by an interactable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InteractableState {
    interactability: Interactability,
    result: InteractionResult,
    is_being_interacted_with: bool,
    /// Part focused when the last interaction started. Kept after the
    /// interaction ends so instant interactions still replicate it.
    focused_part: Option<TargetRef>,
    version: u64,
}

impl InteractableState {
    /// Current derived interactability.
    #[inline]
    #[must_use]
    pub const fn interactability(&self) -> Interactability {
        self.interactability
    }

    /// Replaces the derived interactability.
    pub fn set_interactability(&mut self, interactability: Interactability) {
        self.interactability = interactability;
    }

    /// Result of the current or most recent interaction.
    #[inline]
    #[must_use]
    pub const fn result(&self) -> InteractionResult {
        self.result
    }

    /// Records how the current interaction will end.
    pub fn set_result(&mut self, result: InteractionResult) {
        self.result = result;
    }

    /// True while an interaction is in progress.
    #[inline]
    #[must_use]
    pub const fn is_being_interacted_with(&self) -> bool {
        self.is_being_interacted_with
    }

    /// Sets the engaged flag and bumps the version.
    ///
    /// `part` replaces the retained focused part only when it is `Some`.
    pub fn set_is_being_interacted_with(&mut self, engaged: bool, part: Option<TargetRef>) {
        self.is_being_interacted_with = engaged;
        if let Some(part) = part {
            self.focused_part = Some(part);
        }
        self.version = self.version.wrapping_add(1);
    }

    /// Part focused when the last interaction started.
    #[inline]
    #[must_use]
    pub const fn focused_part(&self) -> Option<TargetRef> {
        self.focused_part
    }

    /// Replication version.
    #[inline]
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Rebuilds a snapshot from decoded wire fields.
    #[must_use]
    pub const fn from_parts(
        interactability: Interactability,
        result: InteractionResult,
        is_being_interacted_with: bool,
        focused_part: Option<TargetRef>,
        version: u64,
    ) -> Self {
        Self {
            interactability,
            result,
            is_being_interacted_with,
            focused_part,
            version,
        }
    }
}

/// One replicated snapshot, addressed to its owning entity.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplicationUpdate {
    /// Interactor state for `entity`.
    Interactor {
        /// Interactor entity.
        entity: EntityId,
        /// Snapshot.
        state: InteractorState,
    },
    /// Interactable state for `entity`.
    Interactable {
        /// State machine host.
        entity: EntityId,
        /// Snapshot.
        state: InteractableState,
    },
}

impl ReplicationUpdate {
    /// Entity the snapshot belongs to.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        match self {
            Self::Interactor { entity, .. } | Self::Interactable { entity, .. } => *entity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_strictly_increases_on_every_toggle() {
        let mut state = InteractableState::default();
        let mut last = state.version();
        for engaged in [true, false, true, true, false, false] {
            state.set_is_being_interacted_with(engaged, None);
            assert!(state.version() > last);
            last = state.version();
        }
    }

    #[test]
    fn test_interactor_version_detects_same_tick_revert() {
        let before = InteractorState::default();
        let mut after = before.clone();
        after.set_is_interacting(true);
        after.set_is_interacting(false);

        assert_eq!(before.is_interacting(), after.is_interacting());
        assert_ne!(before.version(), after.version());
    }

    #[test]
    fn test_focused_part_retained_after_end() {
        let part = TargetRef::root(EntityId::new(4, 0));
        let mut state = InteractableState::default();
        state.set_is_being_interacted_with(true, Some(part));
        state.set_is_being_interacted_with(false, None);
        assert_eq!(state.focused_part(), Some(part));
    }
}
