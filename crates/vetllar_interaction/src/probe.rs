//! # Capability Probe
//!
//! Answers eligibility questions about a candidate entity by layering, in
//! order:
//!
//! 1. the internal [`InteractableStateMachine`],
//! 2. an optional scripted override, honored only when it explicitly
//!    answers (`Some`), as an extra AND term,
//! 3. an optional native override, whose answer is final.
//!
//! The probe is a borrowed view. It never mutates anything.

use std::collections::HashMap;
use std::sync::Arc;

use vetllar_core::{EntityId, Registry, TargetRef};

use crate::error::{InteractionError, InteractionOutcome};
use crate::interactable::InteractableStateMachine;
use crate::types::Interactability;

/// Optional behavior layered over an interactable's state machine.
///
/// Every method defaults to "did not answer".
pub trait CapabilityOverride: Send + Sync {
    /// Proposed interactability for `entity`.
    fn interactability(&self, _entity: EntityId) -> Option<Interactability> {
        None
    }

    /// May `interactor` focus on `entity`?
    fn can_be_focused_on(&self, _entity: EntityId, _interactor: EntityId) -> Option<bool> {
        None
    }

    /// May `interactor` interact with `entity`?
    fn can_be_interacted_with(&self, _entity: EntityId, _interactor: EntityId) -> Option<bool> {
        None
    }

    /// Entity hosting the state machine that `entity` delegates to.
    fn state_machine(&self, _entity: EntityId) -> Option<EntityId> {
        None
    }
}

/// Which layer an override provider belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverrideTier {
    /// Final say over eligibility.
    Native,
    /// AND term, honored only when it answers.
    Scripted,
}

/// The override providers registered for one entity.
#[derive(Clone, Default)]
pub struct OverrideProfile {
    native: Option<Arc<dyn CapabilityOverride>>,
    scripted: Option<Arc<dyn CapabilityOverride>>,
}

impl OverrideProfile {
    /// Installs (or replaces) the provider for `tier`.
    pub fn set(&mut self, tier: OverrideTier, provider: Arc<dyn CapabilityOverride>) {
        match tier {
            OverrideTier::Native => self.native = Some(provider),
            OverrideTier::Scripted => self.scripted = Some(provider),
        }
    }

    /// Provider for `tier`, if any.
    #[must_use]
    pub fn get(&self, tier: OverrideTier) -> Option<&dyn CapabilityOverride> {
        match tier {
            OverrideTier::Native => self.native.as_deref(),
            OverrideTier::Scripted => self.scripted.as_deref(),
        }
    }

    /// True when no provider is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.native.is_none() && self.scripted.is_none()
    }

    /// Providers in resolution order: scripted, then native.
    fn ordered(&self) -> impl Iterator<Item = &dyn CapabilityOverride> {
        [self.scripted.as_deref(), self.native.as_deref()].into_iter().flatten()
    }
}

/// Per-entity override providers.
pub type OverrideTable = HashMap<EntityId, OverrideProfile>;

/// Borrowed view answering capability queries.
#[derive(Clone, Copy)]
pub struct CapabilityProbe<'a> {
    registry: &'a Registry,
    machines: &'a HashMap<EntityId, InteractableStateMachine>,
    overrides: &'a OverrideTable,
}

impl<'a> CapabilityProbe<'a> {
    /// Creates a probe over the given tables.
    #[must_use]
    pub const fn new(
        registry: &'a Registry,
        machines: &'a HashMap<EntityId, InteractableStateMachine>,
        overrides: &'a OverrideTable,
    ) -> Self {
        Self {
            registry,
            machines,
            overrides,
        }
    }

    /// Does `entity` expose any interaction capability?
    #[must_use]
    pub fn is_interactive(&self, entity: EntityId) -> bool {
        self.registry.is_alive(entity)
            && (self.machines.contains_key(&entity)
                || self.overrides.get(&entity).is_some_and(|p| !p.is_empty()))
    }

    /// Like [`Self::is_interactive`], as a result.
    ///
    /// # Errors
    ///
    /// [`InteractionError::NotInteractive`] when `entity` is dead or exposes
    /// neither a state machine nor an override.
    pub fn ensure_interactive(&self, entity: EntityId) -> InteractionOutcome<()> {
        if self.is_interactive(entity) {
            Ok(())
        } else {
            Err(InteractionError::NotInteractive(entity))
        }
    }

    /// Finds the entity hosting the state machine that governs `entity`.
    ///
    /// Tries the scripted accessor, then the native accessor, then a state
    /// machine on `entity` itself.
    ///
    /// # Errors
    ///
    /// [`InteractionError::StaleHandle`] if `entity` is dead,
    /// [`InteractionError::UnresolvedStateMachine`] if nothing resolves.
    pub fn resolve_state_machine(&self, entity: EntityId) -> InteractionOutcome<EntityId> {
        if !self.registry.is_alive(entity) {
            return Err(InteractionError::StaleHandle(TargetRef::root(entity)));
        }

        if let Some(profile) = self.overrides.get(&entity) {
            let delegated = profile
                .ordered()
                .filter_map(|provider| provider.state_machine(entity))
                .find(|host| self.registry.is_alive(*host) && self.machines.contains_key(host));
            if let Some(host) = delegated {
                return Ok(host);
            }
        }

        if self.machines.contains_key(&entity) {
            tracing::trace!(%entity, "state machine resolved by component lookup");
            return Ok(entity);
        }

        tracing::warn!(%entity, "no interactable state machine could be resolved");
        Err(InteractionError::UnresolvedStateMachine(entity))
    }

    /// The state machine governing `entity`, if it resolves.
    #[must_use]
    pub fn machine(&self, entity: EntityId) -> Option<&'a InteractableStateMachine> {
        let host = self.resolve_state_machine(entity).ok()?;
        self.machines.get(&host)
    }

    /// Composite interactability: the least available of every answer.
    ///
    /// An internally unavailable entity short-circuits without consulting
    /// overrides.
    #[must_use]
    pub fn interactability(&self, entity: EntityId) -> Interactability {
        let Some(machine) = self.machine(entity) else {
            return Interactability::Unavailable;
        };
        let internal = machine.interactability();
        if internal == Interactability::Unavailable {
            return internal;
        }

        self.overrides.get(&entity).map_or(internal, |profile| {
            profile
                .ordered()
                .filter_map(|provider| provider.interactability(entity))
                .fold(internal, Interactability::merge)
        })
    }

    /// May `interactor` focus on `entity`?
    #[must_use]
    pub fn can_be_focused_on(&self, entity: EntityId, interactor: EntityId) -> bool {
        if self.interactability(entity) == Interactability::Unavailable {
            return false;
        }
        self.layered(
            entity,
            |machine| machine.can_be_focused_on(interactor),
            |provider| provider.can_be_focused_on(entity, interactor),
        )
    }

    /// May `interactor` interact with `entity` right now?
    #[must_use]
    pub fn can_be_interacted_with(&self, entity: EntityId, interactor: EntityId) -> bool {
        if self.interactability(entity) != Interactability::Available {
            return false;
        }
        self.layered(
            entity,
            |machine| machine.can_be_interacted_with(interactor),
            |provider| provider.can_be_interacted_with(entity, interactor),
        )
    }

    fn layered(
        &self,
        entity: EntityId,
        internal: impl Fn(&InteractableStateMachine) -> bool,
        ask: impl Fn(&dyn CapabilityOverride) -> Option<bool>,
    ) -> bool {
        if !self.machine(entity).is_some_and(internal) {
            return false;
        }

        let Some(profile) = self.overrides.get(&entity) else {
            return true;
        };
        if let Some(scripted) = profile.get(OverrideTier::Scripted) {
            if ask(scripted) == Some(false) {
                return false;
            }
        }
        match profile.get(OverrideTier::Native) {
            Some(native) => ask(native).unwrap_or(true),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InteractiveConfig;
    use crate::events::EventFanout;
    use crate::types::NetRole;
    use vetllar_core::Vec3;

    struct Fixed {
        interactability: Option<Interactability>,
        verdict: Option<bool>,
        delegate: Option<EntityId>,
    }

    impl Fixed {
        fn silent() -> Self {
            Self {
                interactability: None,
                verdict: None,
                delegate: None,
            }
        }
    }

    impl CapabilityOverride for Fixed {
        fn interactability(&self, _: EntityId) -> Option<Interactability> {
            self.interactability
        }
        fn can_be_focused_on(&self, _: EntityId, _: EntityId) -> Option<bool> {
            self.verdict
        }
        fn can_be_interacted_with(&self, _: EntityId, _: EntityId) -> Option<bool> {
            self.verdict
        }
        fn state_machine(&self, _: EntityId) -> Option<EntityId> {
            self.delegate
        }
    }

    struct Fixture {
        registry: Registry,
        machines: HashMap<EntityId, InteractableStateMachine>,
        overrides: OverrideTable,
        door: EntityId,
        player: EntityId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registry = Registry::new(16);
            let door = registry.spawn(Vec3::ZERO).unwrap();
            let player = registry.spawn(Vec3::X).unwrap();
            let mut machines = HashMap::new();
            machines.insert(
                door,
                InteractableStateMachine::new(
                    door,
                    NetRole::Authority,
                    Some(Arc::new(InteractiveConfig::instant())),
                    true,
                ),
            );
            Self {
                registry,
                machines,
                overrides: OverrideTable::new(),
                door,
                player,
            }
        }

        fn with(mut self, tier: OverrideTier, provider: Fixed) -> Self {
            self.overrides
                .entry(self.door)
                .or_default()
                .set(tier, Arc::new(provider));
            self
        }

        fn probe(&self) -> CapabilityProbe<'_> {
            CapabilityProbe::new(&self.registry, &self.machines, &self.overrides)
        }
    }

    #[test]
    fn test_interactability_merge_least_available_wins() {
        let fixture = Fixture::new()
            .with(
                OverrideTier::Native,
                Fixed {
                    interactability: Some(Interactability::FocusableButUnavailable),
                    ..Fixed::silent()
                },
            )
            .with(
                OverrideTier::Scripted,
                Fixed {
                    interactability: Some(Interactability::Available),
                    ..Fixed::silent()
                },
            );
        assert_eq!(
            fixture.probe().interactability(fixture.door),
            Interactability::FocusableButUnavailable
        );
    }

    #[test]
    fn test_internal_unavailable_short_circuits() {
        let mut fixture = Fixture::new().with(
            OverrideTier::Native,
            Fixed {
                verdict: Some(true),
                ..Fixed::silent()
            },
        );
        let door = fixture.door;
        fixture
            .machines
            .get_mut(&door)
            .unwrap()
            .set_enabled(false, &mut EventFanout::new());

        let probe = fixture.probe();
        assert_eq!(probe.interactability(door), Interactability::Unavailable);
        assert!(!probe.can_be_focused_on(door, fixture.player));
        assert!(!probe.can_be_interacted_with(door, fixture.player));
    }

    #[test]
    fn test_scripted_denial_is_anded() {
        let fixture = Fixture::new().with(
            OverrideTier::Scripted,
            Fixed {
                verdict: Some(false),
                ..Fixed::silent()
            },
        );
        assert!(!fixture.probe().can_be_interacted_with(fixture.door, fixture.player));
        assert!(!fixture.probe().can_be_focused_on(fixture.door, fixture.player));
    }

    #[test]
    fn test_silent_scripted_override_is_ignored() {
        let fixture = Fixture::new().with(OverrideTier::Scripted, Fixed::silent());
        assert!(fixture.probe().can_be_interacted_with(fixture.door, fixture.player));
    }

    #[test]
    fn test_native_override_has_final_say() {
        let denied = Fixture::new().with(
            OverrideTier::Native,
            Fixed {
                verdict: Some(false),
                ..Fixed::silent()
            },
        );
        assert!(!denied.probe().can_be_interacted_with(denied.door, denied.player));

        // Scripted says yes, native says no: native wins.
        let overruled = Fixture::new()
            .with(
                OverrideTier::Scripted,
                Fixed {
                    verdict: Some(true),
                    ..Fixed::silent()
                },
            )
            .with(
                OverrideTier::Native,
                Fixed {
                    verdict: Some(false),
                    ..Fixed::silent()
                },
            );
        assert!(!overruled
            .probe()
            .can_be_interacted_with(overruled.door, overruled.player));
    }

    #[test]
    fn test_focusable_but_unavailable_blocks_interaction_only() {
        let fixture = Fixture::new().with(
            OverrideTier::Native,
            Fixed {
                interactability: Some(Interactability::FocusableButUnavailable),
                ..Fixed::silent()
            },
        );
        let probe = fixture.probe();
        assert!(probe.can_be_focused_on(fixture.door, fixture.player));
        assert!(!probe.can_be_interacted_with(fixture.door, fixture.player));
    }

    #[test]
    fn test_resolve_via_accessor_then_fallback() {
        let mut fixture = Fixture::new();
        let handle = fixture.registry.spawn(Vec3::Y).unwrap();
        let door = fixture.door;
        fixture.overrides.entry(handle).or_default().set(
            OverrideTier::Scripted,
            Arc::new(Fixed {
                delegate: Some(door),
                ..Fixed::silent()
            }),
        );

        let probe = fixture.probe();
        assert_eq!(probe.resolve_state_machine(handle), Ok(door));
        assert_eq!(probe.resolve_state_machine(door), Ok(door));
        assert_eq!(
            probe.resolve_state_machine(fixture.player),
            Err(InteractionError::UnresolvedStateMachine(fixture.player))
        );
        assert!(probe.is_interactive(handle));
        assert!(!probe.is_interactive(fixture.player));
        assert_eq!(probe.ensure_interactive(handle), Ok(()));
        assert_eq!(
            probe.ensure_interactive(fixture.player),
            Err(InteractionError::NotInteractive(fixture.player))
        );
    }

    #[test]
    fn test_dead_entity_is_stale() {
        let mut fixture = Fixture::new();
        let door = fixture.door;
        fixture.registry.despawn(door);
        let probe = fixture.probe();
        assert_eq!(
            probe.resolve_state_machine(door),
            Err(InteractionError::StaleHandle(TargetRef::root(door)))
        );
        assert_eq!(probe.interactability(door), Interactability::Unavailable);
    }
}
