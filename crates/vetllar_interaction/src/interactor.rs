//! # Interactor Controller
//!
//! Owned by every entity that can interact. Scans for a focus target on a
//! slow poll, and drives start/stop against the focused interactable.
//!
//! ```text
//!            start (timed)
//!   Idle ─────────────────────> Interacting (scan paused)
//!    ^                                │
//!    └────────────────────────────────┘
//!         completion / stop (hold)
//! ```
//!
//! Non-authoritative controllers never mutate interaction state. They queue
//! an [`InteractionRequest`] instead and replay whatever the authoritative
//! side decided when the next snapshot arrives.

use vetllar_core::{EntityId, TargetRef};

use crate::config::InteractorSettings;
use crate::error::InteractionError;
use crate::events::{EventSink, InteractionEvent};
use crate::focus::resolve_focus_in;
use crate::interactable::CompletionCallback;
use crate::request::InteractionRequest;
use crate::snapshot::InteractorState;
use crate::spatial::{PointerSource, SpatialQuery};
use crate::timer::PollTimer;
use crate::types::{InteractionResult, NetRole, TraceMode};
use crate::world::{CompletionNotice, InteractionContext};

/// The per-interactor controller.
pub struct InteractorController {
    entity: EntityId,
    role: NetRole,
    locally_controlled: bool,
    settings: InteractorSettings,
    state: InteractorState,
    scan_timer: PollTimer,
}

impl InteractorController {
    /// Creates a controller for `entity`. Scanning starts enabled when this
    /// side is authorized to scan for the configured trace mode.
    #[must_use]
    pub fn new(
        entity: EntityId,
        role: NetRole,
        settings: InteractorSettings,
        locally_controlled: bool,
    ) -> Self {
        let scan_timer = PollTimer::new(settings.scan_interval);
        let mut controller = Self {
            entity,
            role,
            locally_controlled,
            settings,
            state: InteractorState::default(),
            scan_timer,
        };
        controller.refresh_scanning();
        controller
    }

    /// The interactor entity.
    #[inline]
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// Replicated snapshot.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> &InteractorState {
        &self.state
    }

    /// Scan settings.
    #[inline]
    #[must_use]
    pub const fn settings(&self) -> &InteractorSettings {
        &self.settings
    }

    /// Current focus.
    #[inline]
    #[must_use]
    pub const fn focused_target(&self) -> Option<TargetRef> {
        self.state.focused_target()
    }

    /// True while a timed interaction is in progress.
    #[inline]
    #[must_use]
    pub const fn is_interacting(&self) -> bool {
        self.state.is_interacting()
    }

    /// True on the side whose input drives this interactor.
    #[inline]
    #[must_use]
    pub const fn is_locally_controlled(&self) -> bool {
        self.locally_controlled
    }

    /// True when the periodic scan is running.
    #[inline]
    #[must_use]
    pub const fn is_scanning(&self) -> bool {
        self.scan_timer.is_enabled()
    }

    /// Is this side authorized to scan for the configured trace mode?
    ///
    /// Sweeps run on both the authority and the controlling client. Cursor
    /// picks only exist on the controlling client.
    #[must_use]
    pub fn can_scan(&self) -> bool {
        match self.settings.trace_mode {
            TraceMode::SweepFromOwner => self.role.has_authority() || self.locally_controlled,
            TraceMode::CursorFromViewpoint => self.locally_controlled,
        }
    }

    fn refresh_scanning(&mut self) {
        let scan = self.can_scan() && !self.state.is_interacting();
        self.scan_timer.set_enabled(scan);
    }

    // =========================================================================
    // Scanning
    // =========================================================================

    /// Advances the scan poll, scanning when it fires.
    pub fn tick(&mut self, dt: f32, ctx: &mut InteractionContext, spatial: &dyn SpatialQuery) {
        if self.scan_timer.advance(dt) {
            self.periodic_scan(ctx, spatial);
        }
    }

    /// Queries the environment and focuses on the closest focusable hit.
    pub fn periodic_scan(&mut self, ctx: &mut InteractionContext, spatial: &dyn SpatialQuery) {
        if self.state.is_interacting() || !self.can_scan() {
            return;
        }

        let hits = match self.settings.trace_mode {
            TraceMode::SweepFromOwner => {
                let (Some(origin), Some(direction)) = (
                    ctx.registry.position(self.entity),
                    ctx.registry.forward(self.entity),
                ) else {
                    return;
                };
                spatial.sweep_for_candidates(
                    origin,
                    direction,
                    self.settings.interaction_distance,
                    self.settings.interaction_radius,
                )
            }
            TraceMode::CursorFromViewpoint => spatial
                .query_pointer_target(PointerSource::Cursor)
                .into_iter()
                .collect(),
        };

        let candidates = self.focusable(ctx, hits);
        if self.settings.show_debug_messages {
            tracing::trace!(interactor = %self.entity, hits = ?candidates, "scan hits");
        }
        let target = resolve_focus_in(&ctx.registry, self.entity, &candidates);
        self.set_focused_target(target, ctx);
    }

    fn focusable(&self, ctx: &InteractionContext, hits: Vec<TargetRef>) -> Vec<TargetRef> {
        let probe = ctx.probe();
        hits.into_iter()
            .filter(|hit| {
                hit.entity != self.entity
                    && ctx.registry.is_valid(*hit)
                    && probe.is_interactive(hit.entity)
                    && probe.can_be_focused_on(hit.entity, self.entity)
            })
            .collect()
    }

    /// Moves focus to `target`, ending focus on the old target first.
    pub fn set_focused_target(&mut self, target: Option<TargetRef>, ctx: &mut InteractionContext) {
        let previous = self.state.focused_target();
        if previous == target {
            return;
        }
        self.replay_focus_change(previous, target, ctx);
        self.state.set_focused_target(target);
    }

    fn replay_focus_change(
        &self,
        previous: Option<TargetRef>,
        target: Option<TargetRef>,
        ctx: &mut InteractionContext,
    ) {
        if let Some(old) = previous {
            if let Some(host) = ctx.resolve_host(old.entity) {
                if let Some(machine) = ctx.machines.get_mut(&host) {
                    machine.end_focus(self.entity, old, &mut ctx.events);
                }
            }
        }
        if let Some(new) = target {
            if let Some(host) = ctx.resolve_host(new.entity) {
                if let Some(machine) = ctx.machines.get_mut(&host) {
                    machine.begin_focus(self.entity, new, &mut ctx.events);
                }
            }
        }
        tracing::trace!(interactor = %self.entity, ?target, "focus changed");
        ctx.events.emit(&InteractionEvent::FocusChanged {
            interactor: self.entity,
            target,
        });
    }

    // =========================================================================
    // Start / stop
    // =========================================================================

    /// Starts interacting with the current focus.
    ///
    /// Silent no-op when already interacting, unfocused, or not eligible.
    /// Non-authoritative sides queue a request instead.
    pub fn start_interaction(&mut self, ctx: &mut InteractionContext) {
        if self.state.is_interacting() {
            return;
        }
        let Some(target) = self.state.focused_target() else {
            return;
        };
        if !ctx.probe().can_be_interacted_with(target.entity, self.entity) {
            return;
        }

        if !self.role.has_authority() {
            let focused = match self.settings.trace_mode {
                TraceMode::CursorFromViewpoint => Some(target),
                TraceMode::SweepFromOwner => None,
            };
            ctx.outgoing.push(InteractionRequest::Start {
                interactor: self.entity,
                focused,
            });
            return;
        }

        let Ok(host) = ctx.probe().resolve_state_machine(target.entity) else {
            return;
        };
        let interactor = self.entity;
        let notices = ctx.completion_tx.clone();
        let on_complete: CompletionCallback = Box::new(move |machine| {
            // Receiver lives in the same context; a send can only fail during teardown.
            let _ = notices.send(CompletionNotice {
                interactor,
                machine,
            });
        });

        let Some(machine) = ctx.machines.get_mut(&host) else {
            return;
        };
        let timed = machine.config().is_ok_and(|c| !c.is_instant());
        if !machine.start_interaction(interactor, Some(target), on_complete, &mut ctx.events) {
            return;
        }

        if timed {
            self.state.set_result(InteractionResult::Success);
            self.state.set_is_interacting(true);
            self.refresh_scanning();
            tracing::debug!(%interactor, interactable = %host, "timed interaction started");
            ctx.events.emit(&InteractionEvent::InteractionStarted {
                interactor,
                interactable: Some(host),
            });
        }
    }

    /// Re-focuses from a touch point (cursor mode, controlling side), then
    /// starts interacting.
    pub fn start_touch_interaction(
        &mut self,
        ctx: &mut InteractionContext,
        spatial: &dyn SpatialQuery,
    ) {
        if self.state.is_interacting() {
            return;
        }
        if self.settings.trace_mode == TraceMode::CursorFromViewpoint && self.locally_controlled {
            let hits = spatial
                .query_pointer_target(PointerSource::Touch)
                .into_iter()
                .collect();
            let target = self.focusable(ctx, hits).first().copied();
            self.set_focused_target(target, ctx);
        }
        self.start_interaction(ctx);
    }

    /// Cancels the current hold interaction.
    ///
    /// Instant and non-hold timed interactions cannot be stopped.
    pub fn stop_interaction(&mut self, ctx: &mut InteractionContext) {
        if !self.state.is_interacting() {
            return;
        }
        let Some(target) = self.state.focused_target() else {
            return;
        };
        let Ok(host) = ctx.probe().resolve_state_machine(target.entity) else {
            return;
        };
        let Some(machine) = ctx.machines.get_mut(&host) else {
            return;
        };
        if !machine.config().is_ok_and(|c| c.is_cancellable()) {
            return;
        }

        if !self.role.has_authority() {
            ctx.outgoing.push(InteractionRequest::Stop {
                interactor: self.entity,
            });
            return;
        }

        if machine.current_interactor() != Some(self.entity) {
            let mismatch = InteractionError::InteractorMismatch {
                requester: self.entity,
                current: machine.current_interactor(),
            };
            tracing::error!(interactable = %host, "unexpected stop: {mismatch}");
            return;
        }

        self.state.set_result(InteractionResult::Cancelled);
        machine.set_result(InteractionResult::Cancelled);
        machine.cancel_interaction(&mut ctx.events);
        self.finish_interaction(Some(host), ctx);
    }

    /// Completion callback target: the machine hosted on `machine` finished.
    ///
    /// Ignored unless `machine` is still the focused target's state machine.
    pub fn on_interaction_completed(&mut self, machine: EntityId, ctx: &mut InteractionContext) {
        let Some(target) = self.state.focused_target() else {
            tracing::debug!(interactor = %self.entity, "completion with no focus, ignoring");
            return;
        };
        if ctx.probe().resolve_state_machine(target.entity) != Ok(machine) {
            tracing::warn!(
                interactor = %self.entity,
                %machine,
                "completion from a machine that is no longer focused"
            );
            return;
        }
        self.state.set_result(InteractionResult::Success);
        self.finish_interaction(Some(machine), ctx);
    }

    /// Ends an interaction whose interactable disappeared underneath it.
    pub fn interrupt(&mut self, ctx: &mut InteractionContext) {
        if !self.role.has_authority() || !self.state.is_interacting() {
            return;
        }
        self.state.set_result(InteractionResult::Cancelled);
        self.finish_interaction(None, ctx);
        self.set_focused_target(None, ctx);
    }

    fn finish_interaction(&mut self, machine: Option<EntityId>, ctx: &mut InteractionContext) {
        self.state.set_is_interacting(false);
        self.refresh_scanning();
        tracing::debug!(interactor = %self.entity, result = ?self.state.result(), "interaction ended");
        ctx.events.emit(&InteractionEvent::InteractionEnded {
            interactor: self.entity,
            interactable: machine,
            result: self.state.result(),
        });
    }

    /// Teardown: stops a running hold interaction on the authoritative side
    /// and clears focus.
    pub fn end_play(&mut self, ctx: &mut InteractionContext) {
        if self.role.has_authority() {
            self.stop_interaction(ctx);
        }
        self.set_focused_target(None, ctx);
    }

    // =========================================================================
    // Observer replay
    // =========================================================================

    /// Applies a replicated snapshot and replays the events it implies.
    pub fn on_state_replicated(&mut self, current: InteractorState, ctx: &mut InteractionContext) {
        let previous = std::mem::replace(&mut self.state, current);

        if previous.is_interacting() != self.state.is_interacting()
            || previous.version() != self.state.version()
        {
            let machine = self
                .state
                .focused_entity()
                .and_then(|entity| ctx.probe().resolve_state_machine(entity).ok());
            let event = if self.state.is_interacting() {
                InteractionEvent::InteractionStarted {
                    interactor: self.entity,
                    interactable: machine,
                }
            } else {
                InteractionEvent::InteractionEnded {
                    interactor: self.entity,
                    interactable: machine,
                    result: self.state.result(),
                }
            };
            ctx.events.emit(&event);
            self.refresh_scanning();
        }

        if previous.focused_target() != self.state.focused_target() {
            self.replay_focus_change(previous.focused_target(), self.state.focused_target(), ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::InteractiveConfig;
    use crate::events::EventBus;
    use vetllar_core::Vec3;

    struct Pointer(Option<TargetRef>);

    impl SpatialQuery for Pointer {
        fn sweep_for_candidates(&self, _: Vec3, _: Vec3, _: f32, _: f32) -> Vec<TargetRef> {
            self.0.into_iter().collect()
        }
        fn query_pointer_target(&self, _: PointerSource) -> Option<TargetRef> {
            self.0
        }
    }

    fn context(role: NetRole) -> (InteractionContext, EntityId, EntityId, EntityId) {
        let mut ctx = InteractionContext::new(role, 16);
        let player = ctx.registry.spawn(Vec3::ZERO).unwrap();
        let a = ctx.registry.spawn(Vec3::X).unwrap();
        let b = ctx.registry.spawn(Vec3::Y).unwrap();
        for host in [a, b] {
            ctx.insert_machine(host, Some(Arc::new(InteractiveConfig::timed(1.0))), true);
        }
        (ctx, player, a, b)
    }

    #[test]
    fn test_end_focus_precedes_begin_focus() {
        let (mut ctx, player, a, b) = context(NetRole::Authority);
        let (tx, rx) = EventBus::create_pair(32);
        ctx.events.subscribe(Box::new(tx));
        let mut controller =
            InteractorController::new(player, NetRole::Authority, InteractorSettings::default(), true);

        controller.set_focused_target(Some(TargetRef::root(a)), &mut ctx);
        rx.drain();
        controller.set_focused_target(Some(TargetRef::root(b)), &mut ctx);

        let events = rx.drain();
        let ended = events
            .iter()
            .position(|e| matches!(e, InteractionEvent::FocusEnded { interactable, .. } if *interactable == a));
        let began = events
            .iter()
            .position(|e| matches!(e, InteractionEvent::FocusBegan { interactable, .. } if *interactable == b));
        assert!(ended.unwrap() < began.unwrap());
    }

    #[test]
    fn test_same_focus_is_noop() {
        let (mut ctx, player, a, _) = context(NetRole::Authority);
        let (tx, rx) = EventBus::create_pair(32);
        ctx.events.subscribe(Box::new(tx));
        let mut controller =
            InteractorController::new(player, NetRole::Authority, InteractorSettings::default(), true);

        controller.set_focused_target(None, &mut ctx);
        assert_eq!(rx.pending_count(), 0);

        controller.set_focused_target(Some(TargetRef::root(a)), &mut ctx);
        rx.drain();
        controller.set_focused_target(Some(TargetRef::root(a)), &mut ctx);
        assert_eq!(rx.pending_count(), 0);
    }

    #[test]
    fn test_scan_authorization_by_trace_mode() {
        let sweep = InteractorSettings::default();
        let cursor = InteractorSettings::cursor();

        let scans = |role, settings: &InteractorSettings, local| {
            InteractorController::new(EntityId::new(0, 0), role, settings.clone(), local).can_scan()
        };

        assert!(scans(NetRole::Authority, &sweep, false));
        assert!(scans(NetRole::Observer, &sweep, true));
        assert!(!scans(NetRole::Observer, &sweep, false));

        assert!(!scans(NetRole::Authority, &cursor, false));
        assert!(scans(NetRole::Observer, &cursor, true));
    }

    #[test]
    fn test_scan_ignores_self_and_unfocusable() {
        let (mut ctx, player, a, _) = context(NetRole::Authority);
        let mut controller =
            InteractorController::new(player, NetRole::Authority, InteractorSettings::default(), true);

        controller.periodic_scan(&mut ctx, &Pointer(Some(TargetRef::root(player))));
        assert_eq!(controller.focused_target(), None);

        ctx.machines.get_mut(&a).unwrap().set_enabled(false, &mut ctx.events);
        controller.periodic_scan(&mut ctx, &Pointer(Some(TargetRef::root(a))));
        assert_eq!(controller.focused_target(), None);
    }

    #[test]
    fn test_timed_start_pauses_scanning() {
        let (mut ctx, player, a, _) = context(NetRole::Authority);
        let mut controller =
            InteractorController::new(player, NetRole::Authority, InteractorSettings::default(), true);
        controller.periodic_scan(&mut ctx, &Pointer(Some(TargetRef::root(a))));
        assert!(controller.is_scanning());

        controller.start_interaction(&mut ctx);
        assert!(controller.is_interacting());
        assert!(!controller.is_scanning());
        assert_eq!(ctx.machines[&a].current_interactor(), Some(player));
    }

    #[test]
    fn test_observer_queues_requests() {
        let (mut ctx, player, a, _) = context(NetRole::Observer);
        let mut controller =
            InteractorController::new(player, NetRole::Observer, InteractorSettings::cursor(), true);
        controller.periodic_scan(&mut ctx, &Pointer(Some(TargetRef::root(a))));

        controller.start_interaction(&mut ctx);
        assert!(!controller.is_interacting());
        assert_eq!(
            ctx.outgoing,
            vec![InteractionRequest::Start {
                interactor: player,
                focused: Some(TargetRef::root(a)),
            }]
        );
        assert!(!ctx.machines[&a].is_being_interacted_with());
    }

    #[test]
    fn test_replicated_focus_replays_focus_events() {
        let (mut ctx, player, a, _) = context(NetRole::Observer);
        let (tx, rx) = EventBus::create_pair(32);
        ctx.events.subscribe(Box::new(tx));
        let mut controller =
            InteractorController::new(player, NetRole::Observer, InteractorSettings::default(), false);

        let incoming = InteractorState::from_parts(
            true,
            InteractionResult::Success,
            Some(TargetRef::root(a)),
            1,
        );
        controller.on_state_replicated(incoming, &mut ctx);

        let events = rx.drain();
        assert!(events.contains(&InteractionEvent::InteractionStarted {
            interactor: player,
            interactable: Some(a),
        }));
        assert!(events.contains(&InteractionEvent::FocusBegan {
            interactable: a,
            interactor: player,
            part: TargetRef::root(a),
        }));
        assert!(controller.is_interacting());
    }
}
