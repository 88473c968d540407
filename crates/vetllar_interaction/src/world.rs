//! # Interaction World
//!
//! Hosts every interactor controller and interactable state machine for one
//! network role and wires them together.
//!
//! ```text
//!   update(dt)
//!     │
//!     ├─ controllers: scan poll ─> focus resolution ─> set_focused_target
//!     ├─ machines:    progress accumulator ─> completion callback
//!     └─ completion notices ─> controllers.on_interaction_completed
//! ```
//!
//! The authority produces [`ReplicationUpdate`]s for whatever changed since
//! the last collection; observers apply them and replay the events.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use vetllar_core::{EntityId, Registry, TargetRef};

use crate::config::{InteractiveConfig, InteractorSettings};
use crate::error::{InteractionError, InteractionOutcome};
use crate::events::{EventFanout, EventSink};
use crate::interactable::InteractableStateMachine;
use crate::interactor::InteractorController;
use crate::probe::{CapabilityOverride, CapabilityProbe, OverrideTable, OverrideTier};
use crate::request::InteractionRequest;
use crate::snapshot::{InteractableState, InteractorState, ReplicationUpdate};
use crate::spatial::SpatialQuery;
use crate::types::{NetRole, TraceMode};

/// A state machine finished an interaction started by `interactor`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompletionNotice {
    /// Interactor that bound the completion callback.
    pub interactor: EntityId,
    /// Host of the state machine that completed.
    pub machine: EntityId,
}

/// Everything controllers share, split from the controllers themselves so a
/// controller can be borrowed mutably alongside it.
pub struct InteractionContext {
    pub(crate) role: NetRole,
    pub(crate) registry: Registry,
    pub(crate) machines: HashMap<EntityId, InteractableStateMachine>,
    pub(crate) overrides: OverrideTable,
    pub(crate) events: EventFanout,
    pub(crate) outgoing: Vec<InteractionRequest>,
    pub(crate) completion_tx: Sender<CompletionNotice>,
    completion_rx: Receiver<CompletionNotice>,
}

impl InteractionContext {
    /// Creates an empty context with room for `capacity` entities.
    #[must_use]
    pub fn new(role: NetRole, capacity: usize) -> Self {
        let (completion_tx, completion_rx) = unbounded();
        Self {
            role,
            registry: Registry::new(capacity),
            machines: HashMap::new(),
            overrides: OverrideTable::new(),
            events: EventFanout::new(),
            outgoing: Vec::new(),
            completion_tx,
            completion_rx,
        }
    }

    /// Capability queries over the current tables.
    #[must_use]
    pub fn probe(&self) -> CapabilityProbe<'_> {
        CapabilityProbe::new(&self.registry, &self.machines, &self.overrides)
    }

    /// Host of the state machine governing `entity`, if any.
    #[must_use]
    pub fn resolve_host(&self, entity: EntityId) -> Option<EntityId> {
        self.probe().resolve_state_machine(entity).ok()
    }

    pub(crate) fn insert_machine(
        &mut self,
        host: EntityId,
        config: Option<Arc<InteractiveConfig>>,
        enabled: bool,
    ) {
        let machine = InteractableStateMachine::new(host, self.role, config, enabled);
        self.machines.insert(host, machine);
    }
}

/// One side's interaction host.
pub struct InteractionWorld {
    controllers: HashMap<EntityId, InteractorController>,
    ctx: InteractionContext,
    sent_interactors: HashMap<EntityId, InteractorState>,
    sent_interactables: HashMap<EntityId, InteractableState>,
}

impl InteractionWorld {
    /// Creates a world for `role` with room for `capacity` entities.
    #[must_use]
    pub fn new(role: NetRole, capacity: usize) -> Self {
        Self {
            controllers: HashMap::new(),
            ctx: InteractionContext::new(role, capacity),
            sent_interactors: HashMap::new(),
            sent_interactables: HashMap::new(),
        }
    }

    /// Network role of this side.
    #[inline]
    #[must_use]
    pub const fn role(&self) -> NetRole {
        self.ctx.role
    }

    /// Entity registry.
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.ctx.registry
    }

    /// Mutable entity registry (transforms, spawning).
    #[inline]
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.ctx.registry
    }

    /// Capability queries.
    #[must_use]
    pub fn probe(&self) -> CapabilityProbe<'_> {
        self.ctx.probe()
    }

    /// Adds an event subscriber.
    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) {
        self.ctx.events.subscribe(sink);
    }

    // =========================================================================
    // Interactables
    // =========================================================================

    /// Hosts a state machine on `entity`.
    ///
    /// A `None` config is accepted and logged; the interactable is then
    /// permanently unavailable.
    ///
    /// # Errors
    ///
    /// [`InteractionError::StaleHandle`] if `entity` is not alive.
    pub fn add_interactable(
        &mut self,
        entity: EntityId,
        config: Option<Arc<InteractiveConfig>>,
        enabled: bool,
    ) -> InteractionOutcome<()> {
        if !self.ctx.registry.is_alive(entity) {
            return Err(InteractionError::StaleHandle(TargetRef::root(entity)));
        }
        self.ctx.insert_machine(entity, config, enabled);
        Ok(())
    }

    /// Removes the state machine hosted on `entity`. Interactors engaged
    /// with it are interrupted.
    pub fn remove_interactable(&mut self, entity: EntityId) {
        if !self.ctx.machines.contains_key(&entity) {
            return;
        }
        for controller in self.controllers.values_mut() {
            let engaged = controller
                .state()
                .focused_entity()
                .and_then(|focused| self.ctx.resolve_host(focused));
            if engaged == Some(entity) {
                controller.interrupt(&mut self.ctx);
            }
        }
        self.ctx.machines.remove(&entity);
        self.sent_interactables.remove(&entity);
    }

    /// The state machine hosted on `entity`.
    #[must_use]
    pub fn interactable(&self, entity: EntityId) -> Option<&InteractableStateMachine> {
        self.ctx.machines.get(&entity)
    }

    /// Enables or disables the interactable hosted on `entity`.
    ///
    /// # Errors
    ///
    /// [`InteractionError::NotAuthoritative`] on observers,
    /// [`InteractionError::UnresolvedStateMachine`] if nothing is hosted there.
    pub fn set_interactable_enabled(
        &mut self,
        entity: EntityId,
        enabled: bool,
    ) -> InteractionOutcome<()> {
        if !self.ctx.role.has_authority() {
            return Err(InteractionError::NotAuthoritative);
        }
        let machine = self
            .ctx
            .machines
            .get_mut(&entity)
            .ok_or(InteractionError::UnresolvedStateMachine(entity))?;
        machine.set_enabled(enabled, &mut self.ctx.events);
        Ok(())
    }

    /// Installs the native override for `entity`. Its answers are final.
    pub fn set_native_override(&mut self, entity: EntityId, provider: Arc<dyn CapabilityOverride>) {
        self.ctx
            .overrides
            .entry(entity)
            .or_default()
            .set(OverrideTier::Native, provider);
    }

    /// Installs the scripted override for `entity`. Its explicit answers are
    /// ANDed with the internal ones.
    pub fn set_scripted_override(
        &mut self,
        entity: EntityId,
        provider: Arc<dyn CapabilityOverride>,
    ) {
        self.ctx
            .overrides
            .entry(entity)
            .or_default()
            .set(OverrideTier::Scripted, provider);
    }

    // =========================================================================
    // Interactors
    // =========================================================================

    /// Attaches a controller to `entity`.
    ///
    /// # Errors
    ///
    /// [`InteractionError::StaleHandle`] if `entity` is not alive,
    /// [`InteractionError::InvalidConfig`] for bad settings.
    pub fn add_interactor(
        &mut self,
        entity: EntityId,
        settings: InteractorSettings,
        locally_controlled: bool,
    ) -> InteractionOutcome<()> {
        if !self.ctx.registry.is_alive(entity) {
            return Err(InteractionError::StaleHandle(TargetRef::root(entity)));
        }
        settings.validate()?;
        let controller =
            InteractorController::new(entity, self.ctx.role, settings, locally_controlled);
        self.controllers.insert(entity, controller);
        Ok(())
    }

    /// Detaches the controller from `entity`, stopping a hold interaction
    /// and clearing focus first.
    pub fn remove_interactor(&mut self, entity: EntityId) {
        if let Some(mut controller) = self.controllers.remove(&entity) {
            controller.end_play(&mut self.ctx);
            self.sent_interactors.remove(&entity);
            self.dispatch_completions();
        }
    }

    /// The controller on `entity`.
    #[must_use]
    pub fn interactor(&self, entity: EntityId) -> Option<&InteractorController> {
        self.controllers.get(&entity)
    }

    // =========================================================================
    // Frame update
    // =========================================================================

    /// Advances scan polls and interaction progress by `dt` seconds.
    ///
    /// Controllers whose entity has been despawned are interrupted and
    /// detached first.
    pub fn update(&mut self, dt: f32, spatial: &dyn SpatialQuery) {
        self.reap_dead_interactors();

        for controller in self.controllers.values_mut() {
            controller.tick(dt, &mut self.ctx, spatial);
        }

        let registry = &self.ctx.registry;
        let controllers = &self.controllers;
        let events = &mut self.ctx.events;
        for machine in self.ctx.machines.values_mut() {
            machine.tick(
                dt,
                |interactor| registry.is_alive(interactor) && controllers.contains_key(&interactor),
                &mut *events,
            );
        }

        self.dispatch_completions();
    }

    fn reap_dead_interactors(&mut self) {
        let dead: Vec<EntityId> = self
            .controllers
            .keys()
            .copied()
            .filter(|entity| !self.ctx.registry.is_alive(*entity))
            .collect();
        for entity in dead {
            if let Some(mut controller) = self.controllers.remove(&entity) {
                tracing::debug!(interactor = %entity, "interactor despawned, detaching controller");
                controller.interrupt(&mut self.ctx);
                controller.end_play(&mut self.ctx);
                self.sent_interactors.remove(&entity);
            }
        }
    }

    fn dispatch_completions(&mut self) {
        while let Ok(notice) = self.ctx.completion_rx.try_recv() {
            match self.controllers.get_mut(&notice.interactor) {
                Some(controller) => controller.on_interaction_completed(notice.machine, &mut self.ctx),
                None => tracing::debug!(interactor = %notice.interactor, "completion for a removed interactor"),
            }
        }
    }

    // =========================================================================
    // Input entry points
    // =========================================================================

    /// Starts interacting with `interactor`'s focus.
    ///
    /// # Errors
    ///
    /// [`InteractionError::NotAnInteractor`] if no controller is attached.
    pub fn start_interaction(&mut self, interactor: EntityId) -> InteractionOutcome<()> {
        let controller = self
            .controllers
            .get_mut(&interactor)
            .ok_or(InteractionError::NotAnInteractor(interactor))?;
        controller.start_interaction(&mut self.ctx);
        self.dispatch_completions();
        Ok(())
    }

    /// Re-focuses from a touch point, then starts interacting.
    ///
    /// # Errors
    ///
    /// [`InteractionError::NotAnInteractor`] if no controller is attached.
    pub fn start_touch_interaction(
        &mut self,
        interactor: EntityId,
        spatial: &dyn SpatialQuery,
    ) -> InteractionOutcome<()> {
        let controller = self
            .controllers
            .get_mut(&interactor)
            .ok_or(InteractionError::NotAnInteractor(interactor))?;
        controller.start_touch_interaction(&mut self.ctx, spatial);
        self.dispatch_completions();
        Ok(())
    }

    /// Stops `interactor`'s hold interaction.
    ///
    /// # Errors
    ///
    /// [`InteractionError::NotAnInteractor`] if no controller is attached.
    pub fn stop_interaction(&mut self, interactor: EntityId) -> InteractionOutcome<()> {
        let controller = self
            .controllers
            .get_mut(&interactor)
            .ok_or(InteractionError::NotAnInteractor(interactor))?;
        controller.stop_interaction(&mut self.ctx);
        Ok(())
    }

    /// Applies a client request on the authoritative side.
    ///
    /// Cursor-mode starts adopt the client's picked target as focus; the
    /// normal eligibility gate still applies. Sweep-mode starts ignore any
    /// client-supplied target and use the server's own focus.
    ///
    /// # Errors
    ///
    /// [`InteractionError::NotAuthoritative`] on observers,
    /// [`InteractionError::NotAnInteractor`] for unknown interactors,
    /// [`InteractionError::MissingTarget`] / [`InteractionError::StaleHandle`]
    /// for cursor requests without a live target,
    /// [`InteractionError::NotInteractive`] when the picked entity exposes no
    /// interaction capability.
    ///
    /// A start that arrives while the interactor is already interacting is
    /// ignored and leaves focus untouched.
    pub fn handle_request(&mut self, request: InteractionRequest) -> InteractionOutcome<()> {
        if !self.ctx.role.has_authority() {
            return Err(InteractionError::NotAuthoritative);
        }
        let interactor = request.interactor();
        let controller = self
            .controllers
            .get_mut(&interactor)
            .ok_or(InteractionError::NotAnInteractor(interactor))?;

        match request {
            InteractionRequest::Start { focused, .. } => {
                if controller.is_interacting() {
                    tracing::debug!(%interactor, "start request while already interacting, ignoring");
                    return Ok(());
                }
                match controller.settings().trace_mode {
                    TraceMode::CursorFromViewpoint => {
                        let target = focused.ok_or(InteractionError::MissingTarget(interactor))?;
                        if !self.ctx.registry.is_valid(target) {
                            tracing::warn!(%interactor, ?target, "start request targets a stale handle");
                            return Err(InteractionError::StaleHandle(target));
                        }
                        self.ctx.probe().ensure_interactive(target.entity)?;
                        controller.set_focused_target(Some(target), &mut self.ctx);
                    }
                    TraceMode::SweepFromOwner => {
                        if focused.is_some() {
                            tracing::debug!(%interactor, "ignoring client target for sweep-mode start");
                        }
                    }
                }
                controller.start_interaction(&mut self.ctx);
                self.dispatch_completions();
            }
            InteractionRequest::Stop { .. } => controller.stop_interaction(&mut self.ctx),
        }
        Ok(())
    }

    /// Takes the requests queued for the authoritative side.
    pub fn drain_requests(&mut self) -> Vec<InteractionRequest> {
        std::mem::take(&mut self.ctx.outgoing)
    }

    // =========================================================================
    // Replication
    // =========================================================================

    /// Snapshots that changed since the last collection. Empty on observers.
    pub fn collect_replication(&mut self) -> Vec<ReplicationUpdate> {
        if !self.ctx.role.has_authority() {
            return Vec::new();
        }

        let mut updates = Vec::new();
        for (entity, controller) in &self.controllers {
            if self.sent_interactors.get(entity) != Some(controller.state()) {
                self.sent_interactors.insert(*entity, controller.state().clone());
                updates.push(ReplicationUpdate::Interactor {
                    entity: *entity,
                    state: controller.state().clone(),
                });
            }
        }
        for (entity, machine) in &self.ctx.machines {
            if self.sent_interactables.get(entity) != Some(machine.state()) {
                self.sent_interactables.insert(*entity, machine.state().clone());
                updates.push(ReplicationUpdate::Interactable {
                    entity: *entity,
                    state: machine.state().clone(),
                });
            }
        }
        updates.sort_by_key(ReplicationUpdate::entity);
        updates
    }

    /// Every current snapshot, regardless of what was sent before.
    /// Used to bring a newly joined observer up to date.
    #[must_use]
    pub fn full_replication(&self) -> Vec<ReplicationUpdate> {
        let mut updates: Vec<_> = self
            .controllers
            .iter()
            .map(|(entity, controller)| ReplicationUpdate::Interactor {
                entity: *entity,
                state: controller.state().clone(),
            })
            .chain(self.ctx.machines.iter().map(|(entity, machine)| {
                ReplicationUpdate::Interactable {
                    entity: *entity,
                    state: machine.state().clone(),
                }
            }))
            .collect();
        updates.sort_by_key(ReplicationUpdate::entity);
        updates
    }

    /// Applies an authoritative snapshot on an observer.
    ///
    /// # Errors
    ///
    /// [`InteractionError::NotAnInteractor`] /
    /// [`InteractionError::UnresolvedStateMachine`] when the addressed
    /// entity has no local counterpart.
    pub fn apply_replication(&mut self, update: ReplicationUpdate) -> InteractionOutcome<()> {
        if self.ctx.role.has_authority() {
            tracing::warn!(entity = %update.entity(), "authority ignores replicated state");
            return Ok(());
        }
        match update {
            ReplicationUpdate::Interactor { entity, state } => {
                let controller = self
                    .controllers
                    .get_mut(&entity)
                    .ok_or(InteractionError::NotAnInteractor(entity))?;
                controller.on_state_replicated(state, &mut self.ctx);
            }
            ReplicationUpdate::Interactable { entity, state } => {
                let machine = self
                    .ctx
                    .machines
                    .get_mut(&entity)
                    .ok_or(InteractionError::UnresolvedStateMachine(entity))?;
                machine.on_state_replicated(state, &mut self.ctx.events);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventBus, EventReceiver, InteractionEvent};
    use crate::spatial::ScriptedSpace;
    use crate::types::InteractionResult;
    use vetllar_core::Vec3;

    const SCAN: f32 = 0.25;

    struct Scene {
        world: InteractionWorld,
        space: ScriptedSpace,
        events: EventReceiver,
        player: EntityId,
        chest: EntityId,
    }

    fn scene(role: NetRole, config: InteractiveConfig, settings: InteractorSettings) -> Scene {
        let mut world = InteractionWorld::new(role, 32);
        let (tx, events) = EventBus::create_pair(256);
        world.subscribe(Box::new(tx));

        let player = world.registry_mut().spawn(Vec3::ZERO).unwrap();
        let chest = world.registry_mut().spawn(Vec3::new(2.0, 0.0, 0.0)).unwrap();
        world.add_interactable(chest, Some(Arc::new(config)), true).unwrap();
        world.add_interactor(player, settings, true).unwrap();

        let mut space = ScriptedSpace::new();
        space.set_sweep_hits(vec![TargetRef::root(chest)]);
        space.set_cursor(Some(TargetRef::root(chest)));
        Scene {
            world,
            space,
            events,
            player,
            chest,
        }
    }

    fn authority(config: InteractiveConfig) -> Scene {
        let mut s = scene(NetRole::Authority, config, InteractorSettings::default());
        s.world.update(SCAN, &s.space);
        s.events.drain();
        s
    }

    #[test]
    fn test_scan_focuses_the_hit() {
        let s = authority(InteractiveConfig::instant());
        assert_eq!(
            s.world.interactor(s.player).unwrap().focused_target(),
            Some(TargetRef::root(s.chest))
        );
    }

    #[test]
    fn test_instant_interaction_completes_within_start() {
        let mut s = authority(InteractiveConfig::instant());
        let version = s.world.interactor(s.player).unwrap().state().version();

        s.world.start_interaction(s.player).unwrap();

        let controller = s.world.interactor(s.player).unwrap();
        assert!(!controller.is_interacting());
        assert_eq!(controller.state().result(), InteractionResult::Success);
        assert!(controller.state().version() > version);

        let machine = s.world.interactable(s.chest).unwrap();
        assert!(!machine.is_being_interacted_with());
        assert_eq!(machine.state().result(), InteractionResult::Success);

        assert!(s.events.drain().contains(&InteractionEvent::InteractionEnded {
            interactor: s.player,
            interactable: Some(s.chest),
            result: InteractionResult::Success,
        }));
    }

    #[test]
    fn test_timed_interaction_runs_to_completion() {
        let mut s = authority(InteractiveConfig::timed(1.0));
        s.world.start_interaction(s.player).unwrap();
        assert!(s.world.interactor(s.player).unwrap().is_interacting());

        // Non-hold interactions cannot be stopped.
        s.world.stop_interaction(s.player).unwrap();
        assert!(s.world.interactable(s.chest).unwrap().is_being_interacted_with());

        for _ in 0..4 {
            s.world.update(0.25, &s.space);
        }

        let controller = s.world.interactor(s.player).unwrap();
        assert!(!controller.is_interacting());
        assert!(controller.is_scanning());
        assert_eq!(controller.state().result(), InteractionResult::Success);
        let machine = s.world.interactable(s.chest).unwrap();
        assert!(!machine.is_being_interacted_with());
        assert_eq!(machine.state().result(), InteractionResult::Success);
    }

    #[test]
    fn test_hold_interaction_cancelled_midway() {
        let mut s = authority(InteractiveConfig::hold(2.0));
        s.world.start_interaction(s.player).unwrap();
        s.world.update(0.5, &s.space);
        s.world.stop_interaction(s.player).unwrap();

        let controller = s.world.interactor(s.player).unwrap();
        assert!(!controller.is_interacting());
        assert_eq!(controller.state().result(), InteractionResult::Cancelled);
        let machine = s.world.interactable(s.chest).unwrap();
        assert!(!machine.is_being_interacted_with());
        assert_eq!(machine.state().result(), InteractionResult::Cancelled);
        assert_eq!(machine.current_interactor(), None);
    }

    #[test]
    fn test_redundant_start_and_stop_change_nothing() {
        let mut s = authority(InteractiveConfig::hold(2.0));
        s.world.stop_interaction(s.player).unwrap();
        assert_eq!(s.world.interactor(s.player).unwrap().state().version(), 0);
        assert_eq!(s.world.interactable(s.chest).unwrap().state().version(), 0);

        s.world.start_interaction(s.player).unwrap();
        let interactor = s.world.interactor(s.player).unwrap().state().clone();
        let machine = s.world.interactable(s.chest).unwrap().state().clone();

        s.world.start_interaction(s.player).unwrap();
        assert_eq!(s.world.interactor(s.player).unwrap().state(), &interactor);
        assert_eq!(s.world.interactable(s.chest).unwrap().state(), &machine);
    }

    #[test]
    fn test_second_interactor_refused_while_engaged() {
        let mut s = authority(InteractiveConfig::timed(1.0));
        let rival = s.world.registry_mut().spawn(Vec3::new(4.0, 0.0, 0.0)).unwrap();
        s.world
            .add_interactor(rival, InteractorSettings::default(), false)
            .unwrap();
        s.world.start_interaction(s.player).unwrap();
        s.world.update(SCAN, &s.space);

        assert_eq!(
            s.world.interactor(rival).unwrap().focused_target(),
            Some(TargetRef::root(s.chest))
        );
        s.world.start_interaction(rival).unwrap();
        assert!(!s.world.interactor(rival).unwrap().is_interacting());
        assert_eq!(
            s.world.interactable(s.chest).unwrap().current_interactor(),
            Some(s.player)
        );
    }

    #[test]
    fn test_vanished_interactor_cancels_next_update() {
        let mut s = authority(InteractiveConfig::timed(5.0));
        s.world.start_interaction(s.player).unwrap();
        s.world.registry_mut().despawn(s.player);
        s.world.update(0.1, &s.space);

        let machine = s.world.interactable(s.chest).unwrap();
        assert!(!machine.is_being_interacted_with());
        assert_eq!(machine.state().result(), InteractionResult::Cancelled);

        assert!(s.world.interactor(s.player).is_none());
        let events = s.events.drain();
        assert!(events.contains(&InteractionEvent::InteractionEnded {
            interactor: s.player,
            interactable: None,
            result: InteractionResult::Cancelled,
        }));
        assert!(events.iter().any(|e| matches!(
            e,
            InteractionEvent::FocusEnded { interactor, .. } if *interactor == s.player
        )));

        for _ in 0..4 {
            s.world.update(0.25, &s.space);
        }
        assert!(s
            .world
            .collect_replication()
            .iter()
            .all(|update| update.entity() != s.player));
        assert!(s
            .world
            .full_replication()
            .iter()
            .all(|update| update.entity() != s.player));
    }

    #[test]
    fn test_removing_interactor_stops_hold_and_clears_focus() {
        let mut s = authority(InteractiveConfig::hold(5.0));
        s.world.start_interaction(s.player).unwrap();
        s.world.remove_interactor(s.player);

        assert!(!s.world.interactable(s.chest).unwrap().is_being_interacted_with());
        assert!(s.events.drain().contains(&InteractionEvent::FocusEnded {
            interactable: s.chest,
            interactor: s.player,
            part: TargetRef::root(s.chest),
        }));
    }

    #[test]
    fn test_removing_interactable_interrupts_interactor() {
        let mut s = authority(InteractiveConfig::timed(5.0));
        s.world.start_interaction(s.player).unwrap();
        s.world.remove_interactable(s.chest);

        let controller = s.world.interactor(s.player).unwrap();
        assert!(!controller.is_interacting());
        assert_eq!(controller.state().result(), InteractionResult::Cancelled);
        assert_eq!(controller.focused_target(), None);
    }

    #[test]
    fn test_cursor_request_requires_target() {
        let mut s = scene(
            NetRole::Authority,
            InteractiveConfig::instant(),
            InteractorSettings::cursor(),
        );
        let missing = InteractionRequest::Start {
            interactor: s.player,
            focused: None,
        };
        assert_eq!(
            s.world.handle_request(missing),
            Err(InteractionError::MissingTarget(s.player))
        );

        let picked = InteractionRequest::Start {
            interactor: s.player,
            focused: Some(TargetRef::root(s.chest)),
        };
        s.world.handle_request(picked).unwrap();
        assert_eq!(
            s.world.interactable(s.chest).unwrap().state().version(),
            2
        );
    }

    #[test]
    fn test_cursor_restart_mid_interaction_keeps_focus() {
        let mut s = scene(
            NetRole::Authority,
            InteractiveConfig::timed(1.0),
            InteractorSettings::cursor(),
        );
        let crate_box = s.world.registry_mut().spawn(Vec3::new(0.0, 2.0, 0.0)).unwrap();
        s.world
            .add_interactable(crate_box, Some(Arc::new(InteractiveConfig::timed(1.0))), true)
            .unwrap();

        s.world
            .handle_request(InteractionRequest::Start {
                interactor: s.player,
                focused: Some(TargetRef::root(s.chest)),
            })
            .unwrap();
        // Cursor moved before the first reply arrived.
        s.world
            .handle_request(InteractionRequest::Start {
                interactor: s.player,
                focused: Some(TargetRef::root(crate_box)),
            })
            .unwrap();
        assert_eq!(
            s.world.interactor(s.player).unwrap().focused_target(),
            Some(TargetRef::root(s.chest))
        );
        assert!(!s.world.interactable(crate_box).unwrap().is_being_interacted_with());

        for _ in 0..20 {
            s.world.update(0.25, &s.space);
        }

        let controller = s.world.interactor(s.player).unwrap();
        assert!(!controller.is_interacting());
        assert_eq!(controller.state().result(), InteractionResult::Success);
        assert_eq!(
            s.world.interactable(s.chest).unwrap().state().result(),
            InteractionResult::Success
        );
        assert!(!s.world.interactable(crate_box).unwrap().is_being_interacted_with());
    }

    #[test]
    fn test_cursor_request_on_plain_entity_is_rejected() {
        let mut s = scene(
            NetRole::Authority,
            InteractiveConfig::instant(),
            InteractorSettings::cursor(),
        );
        let rock = s.world.registry_mut().spawn(Vec3::X).unwrap();
        let request = InteractionRequest::Start {
            interactor: s.player,
            focused: Some(TargetRef::root(rock)),
        };
        assert_eq!(
            s.world.handle_request(request),
            Err(InteractionError::NotInteractive(rock))
        );
        assert_eq!(s.world.interactor(s.player).unwrap().focused_target(), None);
    }

    #[test]
    fn test_sweep_request_ignores_client_target() {
        let mut s = authority(InteractiveConfig::timed(1.0));
        let decoy = s.world.registry_mut().spawn(Vec3::Y).unwrap();
        s.world
            .add_interactable(decoy, Some(Arc::new(InteractiveConfig::timed(1.0))), true)
            .unwrap();

        let request = InteractionRequest::Start {
            interactor: s.player,
            focused: Some(TargetRef::root(decoy)),
        };
        s.world.handle_request(request).unwrap();
        assert!(s.world.interactable(s.chest).unwrap().is_being_interacted_with());
        assert!(!s.world.interactable(decoy).unwrap().is_being_interacted_with());
    }

    #[test]
    fn test_observer_rejects_requests_and_queues_its_own() {
        let mut s = scene(
            NetRole::Observer,
            InteractiveConfig::instant(),
            InteractorSettings::default(),
        );
        let request = InteractionRequest::Stop { interactor: s.player };
        assert_eq!(
            s.world.handle_request(request),
            Err(InteractionError::NotAuthoritative)
        );

        s.world.update(SCAN, &s.space);
        s.world.start_interaction(s.player).unwrap();
        assert_eq!(
            s.world.drain_requests(),
            vec![InteractionRequest::Start {
                interactor: s.player,
                focused: None,
            }]
        );
        assert!(s.world.drain_requests().is_empty());
    }

    #[test]
    fn test_replication_is_change_driven() {
        let mut s = authority(InteractiveConfig::instant());
        assert!(!s.world.collect_replication().is_empty());
        assert!(s.world.collect_replication().is_empty());

        s.world.start_interaction(s.player).unwrap();
        let updates = s.world.collect_replication();
        assert_eq!(updates.len(), 2);
        assert_eq!(s.world.full_replication().len(), 2);
    }

    #[test]
    fn test_observer_replays_instant_interaction() {
        let mut server = authority(InteractiveConfig::instant());
        let mut client = scene(
            NetRole::Observer,
            InteractiveConfig::instant(),
            InteractorSettings::default(),
        );
        assert_eq!(client.player, server.player);
        assert_eq!(client.chest, server.chest);

        for update in server.world.collect_replication() {
            client.world.apply_replication(update).unwrap();
        }
        client.events.drain();

        server.world.start_interaction(server.player).unwrap();
        for update in server.world.collect_replication() {
            client.world.apply_replication(update).unwrap();
        }

        let events = client.events.drain();
        assert!(events.iter().any(|e| matches!(
            e,
            InteractionEvent::InteractableStarted { interactable, .. } if *interactable == client.chest
        )));
        assert!(events.contains(&InteractionEvent::InteractionEnded {
            interactor: client.player,
            interactable: Some(client.chest),
            result: InteractionResult::Success,
        }));
        assert!(!client.world.interactable(client.chest).unwrap().is_being_interacted_with());
    }

    #[test]
    fn test_observer_progress_is_cosmetic() {
        let mut server = authority(InteractiveConfig::timed(1.0));
        let mut client = scene(
            NetRole::Observer,
            InteractiveConfig::timed(1.0),
            InteractorSettings::default(),
        );

        server.world.start_interaction(server.player).unwrap();
        for update in server.world.collect_replication() {
            client.world.apply_replication(update).unwrap();
        }
        assert!(client.world.interactor(client.player).unwrap().is_interacting());
        assert!(!client.world.interactor(client.player).unwrap().is_scanning());

        client.world.update(3.0, &client.space);
        let machine = client.world.interactable(client.chest).unwrap();
        assert!(machine.is_being_interacted_with());
        assert_eq!(machine.progress_percent(), Some(1.0));
    }

    #[test]
    fn test_disabled_interactable_is_never_focused() {
        let mut s = scene(
            NetRole::Authority,
            InteractiveConfig::instant(),
            InteractorSettings::default(),
        );
        s.world.set_interactable_enabled(s.chest, false).unwrap();
        s.world.update(SCAN, &s.space);
        assert_eq!(s.world.interactor(s.player).unwrap().focused_target(), None);
    }
}
