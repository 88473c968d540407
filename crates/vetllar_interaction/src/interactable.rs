//! # Interactable State Machine
//!
//! Owned by every interactable entity.
//!
//! ```text
//!          start (eligible)                 elapsed >= time
//!  Idle ───────────────────> InProgress ────────────────────> Completed ─┐
//!   ^                           │                                        │
//!   │                           │ cancel / interactor vanished           │
//!   │                           v                                        │
//!   └──────────────────────  Cancelled <─────────────────────────────────┘
//! ```
//!
//! Only the authoritative side drives transitions. Observers receive
//! [`InteractableState`] snapshots and replay the resulting events through
//! [`InteractableStateMachine::on_state_replicated`]; they still accumulate
//! progress locally so UI can show a bar, but never complete on their own.

use std::sync::Arc;

use vetllar_core::{EntityId, TargetRef};

use crate::config::InteractiveConfig;
use crate::error::{InteractionError, InteractionOutcome};
use crate::events::{EventSink, InteractionEvent};
use crate::snapshot::InteractableState;
use crate::timer::ProgressTimer;
use crate::types::{Interactability, InteractionResult, NetRole};

/// Invoked once when an interaction completes successfully, with the state
/// machine's host entity.
pub type CompletionCallback = Box<dyn FnOnce(EntityId) + Send>;

/// The per-interactable state machine.
pub struct InteractableStateMachine {
    host: EntityId,
    role: NetRole,
    config: Option<Arc<InteractiveConfig>>,
    enabled: bool,
    state: InteractableState,
    /// Weak: validated by the host every tick.
    current_interactor: Option<EntityId>,
    /// Not replicated. Predicted on observers for cosmetic purposes only.
    progress: ProgressTimer,
    on_complete: Option<CompletionCallback>,
}

impl InteractableStateMachine {
    /// Creates a state machine hosted on `host`.
    ///
    /// A missing config is a configuration error: the interactable is
    /// permanently unavailable.
    #[must_use]
    pub fn new(
        host: EntityId,
        role: NetRole,
        config: Option<Arc<InteractiveConfig>>,
        enabled: bool,
    ) -> Self {
        let mut machine = Self {
            host,
            role,
            config,
            enabled,
            state: InteractableState::default(),
            current_interactor: None,
            progress: ProgressTimer::new(),
            on_complete: None,
        };
        if let Err(err) = machine.config() {
            tracing::error!(interactable = %host, "{err}");
        }
        let initial = machine.derive_interactability();
        machine.state.set_interactability(initial);
        machine
    }

    /// Entity hosting this state machine.
    #[inline]
    #[must_use]
    pub const fn host(&self) -> EntityId {
        self.host
    }

    /// Shared interaction config.
    ///
    /// # Errors
    ///
    /// [`InteractionError::MissingConfig`] if the interactable was created
    /// without one.
    #[inline]
    pub fn config(&self) -> InteractionOutcome<&Arc<InteractiveConfig>> {
        self.config
            .as_ref()
            .ok_or(InteractionError::MissingConfig(self.host))
    }

    /// Replicated snapshot.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> &InteractableState {
        &self.state
    }

    /// Current derived interactability.
    #[inline]
    #[must_use]
    pub const fn interactability(&self) -> Interactability {
        self.state.interactability()
    }

    /// True while an interaction is in progress.
    #[inline]
    #[must_use]
    pub const fn is_being_interacted_with(&self) -> bool {
        self.state.is_being_interacted_with()
    }

    /// The interactor currently engaged. Only known on the authoritative side.
    #[inline]
    #[must_use]
    pub const fn current_interactor(&self) -> Option<EntityId> {
        self.current_interactor
    }

    /// Enabled flag.
    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Seconds into the current interaction.
    #[inline]
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.progress.elapsed()
    }

    fn interaction_time(&self) -> f32 {
        self.config.as_ref().map_or(0.0, |c| c.interaction_time)
    }

    // =========================================================================
    // Eligibility
    // =========================================================================

    /// May `interactor` focus on this interactable?
    #[must_use]
    pub fn can_be_focused_on(&self, interactor: EntityId) -> bool {
        let Some(config) = &self.config else {
            return false;
        };
        if self.state.interactability() == Interactability::Unavailable {
            return false;
        }
        match &config.prerequisite {
            Some(check) => {
                check.can_be_focused_on(interactor)
                    && (!config.unavailable_if_prerequisites_not_met
                        || check.can_be_interacted_with(interactor))
            }
            None => true,
        }
    }

    /// May `interactor` interact with this interactable right now?
    #[must_use]
    pub fn can_be_interacted_with(&self, interactor: EntityId) -> bool {
        let Some(config) = &self.config else {
            return false;
        };
        if self.state.interactability() != Interactability::Available {
            return false;
        }
        config
            .prerequisite
            .as_ref()
            .map_or(true, |check| check.can_be_interacted_with(interactor))
    }

    // =========================================================================
    // Authoritative transitions
    // =========================================================================

    /// Starts an interaction. Authoritative only.
    ///
    /// Returns false without touching state if `interactor` is not eligible.
    /// Instant interactions complete (and invoke `on_complete`) before this
    /// returns.
    pub fn start_interaction(
        &mut self,
        interactor: EntityId,
        part: Option<TargetRef>,
        on_complete: CompletionCallback,
        events: &mut dyn EventSink,
    ) -> bool {
        if !self.role.has_authority() {
            tracing::warn!(interactable = %self.host, "start_interaction called without authority");
            return false;
        }
        if !self.can_be_interacted_with(interactor) {
            return false;
        }

        self.current_interactor = Some(interactor);
        self.state.set_result(InteractionResult::Success);
        self.state.set_is_being_interacted_with(true, part);
        self.on_complete = Some(on_complete);
        self.refresh_interactability(events);

        tracing::debug!(interactable = %self.host, %interactor, "interaction started");
        self.on_interaction_started(events);
        true
    }

    /// Records how the current interaction will end. Authoritative only.
    pub fn set_result(&mut self, result: InteractionResult) {
        if self.role.has_authority() {
            self.state.set_result(result);
        }
    }

    /// Ends the current interaction with whatever result is set.
    /// Authoritative only. The completion callback is dropped, not invoked.
    pub fn cancel_interaction(&mut self, events: &mut dyn EventSink) {
        if !self.role.has_authority() || !self.state.is_being_interacted_with() {
            return;
        }
        self.on_complete = None;
        self.end_interaction(events);
    }

    /// Enables or disables the interactable. Authoritative only.
    pub fn set_enabled(&mut self, enabled: bool, events: &mut dyn EventSink) {
        if !self.role.has_authority() {
            tracing::warn!(interactable = %self.host, "set_enabled called without authority");
            return;
        }
        if self.enabled != enabled {
            self.enabled = enabled;
            self.refresh_interactability(events);
        }
    }

    /// Per-frame update.
    ///
    /// On the authoritative side, an engaged interactor that no longer
    /// passes `interactor_alive` cancels the interaction.
    pub fn tick(
        &mut self,
        dt: f32,
        interactor_alive: impl Fn(EntityId) -> bool,
        events: &mut dyn EventSink,
    ) {
        if !self.state.is_being_interacted_with() {
            return;
        }

        if self.role.has_authority() {
            let alive = self.current_interactor.is_some_and(&interactor_alive);
            if !alive {
                tracing::debug!(interactable = %self.host, "interactor vanished mid-interaction, cancelling");
                self.state.set_result(InteractionResult::Cancelled);
                self.cancel_interaction(events);
                return;
            }
        }

        let duration = self.interaction_time();
        if self.progress.advance(dt, duration) && self.role.has_authority() {
            self.complete_interaction(events);
        }
    }

    fn on_interaction_started(&mut self, events: &mut dyn EventSink) {
        events.emit(&InteractionEvent::InteractableStarted {
            interactable: self.host,
            interactor: self.current_interactor,
            part: self.state.focused_part(),
        });

        if self.interaction_time() > 0.0 {
            self.progress.start();
        } else if self.role.has_authority() {
            self.complete_interaction(events);
        }
    }

    fn on_interaction_ended(&mut self, result: InteractionResult, events: &mut dyn EventSink) {
        self.progress.stop();
        events.emit(&InteractionEvent::InteractableEnded {
            interactable: self.host,
            interactor: self.current_interactor,
            result,
            part: self.state.focused_part(),
        });
    }

    fn complete_interaction(&mut self, events: &mut dyn EventSink) {
        match self.on_complete.take() {
            Some(callback) => callback(self.host),
            None => {
                debug_assert!(false, "completion fired twice for {}", self.host);
                tracing::error!(interactable = %self.host, "completion fired without a pending callback");
            }
        }
        self.end_interaction(events);
    }

    fn end_interaction(&mut self, events: &mut dyn EventSink) {
        self.on_interaction_ended(self.state.result(), events);
        tracing::debug!(interactable = %self.host, result = ?self.state.result(), "interaction ended");
        self.current_interactor = None;
        self.state.set_is_being_interacted_with(false, None);
        self.refresh_interactability(events);
    }

    fn derive_interactability(&self) -> Interactability {
        if self.config.is_none() {
            Interactability::Unavailable
        } else if self.current_interactor.is_some() {
            Interactability::FocusableButUnavailable
        } else if self.enabled {
            Interactability::Available
        } else {
            Interactability::Unavailable
        }
    }

    fn refresh_interactability(&mut self, events: &mut dyn EventSink) {
        let derived = self.derive_interactability();
        if derived != self.state.interactability() {
            self.state.set_interactability(derived);
            events.emit(&InteractionEvent::InteractabilityChanged {
                interactable: self.host,
                interactability: derived,
            });
        }
    }

    // =========================================================================
    // Local effects (any side)
    // =========================================================================

    /// An interactor started focusing `part`.
    pub fn begin_focus(&mut self, interactor: EntityId, part: TargetRef, events: &mut dyn EventSink) {
        events.emit(&InteractionEvent::FocusBegan {
            interactable: self.host,
            interactor,
            part,
        });
    }

    /// An interactor stopped focusing `part`.
    pub fn end_focus(&mut self, interactor: EntityId, part: TargetRef, events: &mut dyn EventSink) {
        events.emit(&InteractionEvent::FocusEnded {
            interactable: self.host,
            interactor,
            part,
        });
    }

    /// Progress of the current timed interaction in `[0, 1]`.
    ///
    /// `None` when nothing is in progress or the interaction is instant.
    #[must_use]
    pub fn progress_percent(&self) -> Option<f32> {
        let required = self.timed_requirement()?;
        Some(self.progress.elapsed() / required)
    }

    /// `(remaining, required)` seconds of the current timed interaction.
    ///
    /// `None` when nothing is in progress or the interaction is instant.
    #[must_use]
    pub fn remaining_time(&self) -> Option<(f32, f32)> {
        let required = self.timed_requirement()?;
        Some((required - self.progress.elapsed(), required))
    }

    fn timed_requirement(&self) -> Option<f32> {
        let required = self.interaction_time();
        (self.state.is_being_interacted_with() && required > 0.0).then_some(required)
    }

    // =========================================================================
    // Observer replay
    // =========================================================================

    /// Applies a replicated snapshot and replays the events it implies.
    ///
    /// A version change with an unchanged flag means a whole episode (or an
    /// end and a restart) happened between snapshots; both edges are
    /// replayed in order.
    pub fn on_state_replicated(&mut self, current: InteractableState, events: &mut dyn EventSink) {
        let previous = std::mem::replace(&mut self.state, current);

        if previous.interactability() != self.state.interactability() {
            events.emit(&InteractionEvent::InteractabilityChanged {
                interactable: self.host,
                interactability: self.state.interactability(),
            });
        }

        let was_engaged = previous.is_being_interacted_with();
        let engaged = self.state.is_being_interacted_with();
        if was_engaged == engaged && previous.version() == self.state.version() {
            return;
        }

        match (was_engaged, engaged) {
            (false, true) => self.on_interaction_started(events),
            (true, false) => self.on_interaction_ended(self.state.result(), events),
            (false, false) => {
                self.on_interaction_started(events);
                self.on_interaction_ended(self.state.result(), events);
            }
            (true, true) => {
                self.on_interaction_ended(self.state.result(), events);
                self.on_interaction_started(events);
            }
        }
    }
}
