//! # Interaction Events
//!
//! Everything UI, audio and gameplay need to react to, as plain data.
//!
//! ```text
//! ┌──────────────┐    ┌─────────────┐    ┌──────────────┐
//! │  Controller  │───>│             │───>│  UI prompts  │
//! └──────────────┘    │ EventFanout │    └──────────────┘
//! ┌──────────────┐    │             │    ┌──────────────┐
//! │ State machine│───>│             │───>│ EventBus rx  │
//! └──────────────┘    └─────────────┘    └──────────────┘
//! ```
//!
//! Emission is fire-and-forget: sinks return nothing and a full channel
//! drops the event rather than stalling the tick.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use vetllar_core::{EntityId, TargetRef};

use crate::types::{Interactability, InteractionResult};

/// Notifications produced by interactors and interactables.
#[derive(Clone, Debug, PartialEq)]
pub enum InteractionEvent {
    // =========================================================================
    // Interactor side
    // =========================================================================
    /// The interactor's focus moved (or was cleared).
    FocusChanged {
        /// The interactor.
        interactor: EntityId,
        /// The new focus, `None` when focus was lost.
        target: Option<TargetRef>,
    },

    /// A timed interaction began on the interactor.
    InteractionStarted {
        /// The interactor.
        interactor: EntityId,
        /// State machine host being interacted with, if it resolved.
        interactable: Option<EntityId>,
    },

    /// The interactor's interaction ended.
    InteractionEnded {
        /// The interactor.
        interactor: EntityId,
        /// State machine host, if it still resolves.
        interactable: Option<EntityId>,
        /// How it ended.
        result: InteractionResult,
    },

    // =========================================================================
    // Interactable side
    // =========================================================================
    /// An interactor started focusing this interactable.
    FocusBegan {
        /// State machine host.
        interactable: EntityId,
        /// The interactor.
        interactor: EntityId,
        /// The part that was focused.
        part: TargetRef,
    },

    /// An interactor stopped focusing this interactable.
    FocusEnded {
        /// State machine host.
        interactable: EntityId,
        /// The interactor.
        interactor: EntityId,
        /// The part that had been focused.
        part: TargetRef,
    },

    /// Someone started interacting with this interactable.
    InteractableStarted {
        /// State machine host.
        interactable: EntityId,
        /// The interactor, known only on the authoritative side.
        interactor: Option<EntityId>,
        /// The part focused when the interaction started.
        part: Option<TargetRef>,
    },

    /// The interaction with this interactable ended.
    InteractableEnded {
        /// State machine host.
        interactable: EntityId,
        /// The interactor, known only on the authoritative side.
        interactor: Option<EntityId>,
        /// How it ended.
        result: InteractionResult,
        /// The part focused when the interaction started.
        part: Option<TargetRef>,
    },

    /// The derived interactability of an interactable changed.
    InteractabilityChanged {
        /// State machine host.
        interactable: EntityId,
        /// The new value.
        interactability: Interactability,
    },
}

/// Receives interaction events.
pub trait EventSink: Send {
    /// Handles one event. Must not block.
    fn emit(&mut self, event: &InteractionEvent);
}

/// Explicit list of subscribers. Every event goes to every sink, in order.
#[derive(Default)]
pub struct EventFanout {
    sinks: Vec<Box<dyn EventSink>>,
}

impl EventFanout {
    /// Creates a fan-out with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber.
    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// True when nobody is listening.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for EventFanout {
    fn emit(&mut self, event: &InteractionEvent) {
        for sink in &mut self.sinks {
            sink.emit(event);
        }
    }
}

/// Channel-backed event bus.
///
/// Pre-allocates a bounded channel so a stalled consumer cannot grow memory
/// without bound.
pub struct EventBus {
    sender: Sender<InteractionEvent>,
    receiver: Receiver<InteractionEvent>,
}

impl EventBus {
    /// Creates a new event bus holding at most `capacity` pending events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a sender handle.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Creates a receiver handle.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }

    /// Creates a connected sender/receiver pair.
    #[must_use]
    pub fn create_pair(capacity: usize) -> (EventSender, EventReceiver) {
        let bus = Self::new(capacity);
        (bus.sender(), bus.receiver())
    }
}

/// Handle for sending events.
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<InteractionEvent>,
}

impl EventSender {
    /// Sends an event (non-blocking).
    ///
    /// Returns `false` if the event was dropped.
    #[inline]
    pub fn send(&self, event: InteractionEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(?event, "interaction event channel full, dropping event");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl EventSink for EventSender {
    fn emit(&mut self, event: &InteractionEvent) {
        self.send(event.clone());
    }
}

/// Handle for receiving events.
#[derive(Clone)]
pub struct EventReceiver {
    receiver: Receiver<InteractionEvent>,
}

impl EventReceiver {
    /// Receives all pending events (non-blocking).
    pub fn drain(&self) -> Vec<InteractionEvent> {
        self.receiver.try_iter().collect()
    }

    /// Receives one event (non-blocking).
    pub fn try_recv(&self) -> Option<InteractionEvent> {
        self.receiver.try_recv().ok()
    }

    /// Number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn focus_lost(interactor: EntityId) -> InteractionEvent {
        InteractionEvent::FocusChanged {
            interactor,
            target: None,
        }
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let (tx_a, rx_a) = EventBus::create_pair(8);
        let (tx_b, rx_b) = EventBus::create_pair(8);

        let mut fanout = EventFanout::new();
        fanout.subscribe(Box::new(tx_a));
        fanout.subscribe(Box::new(tx_b));
        assert_eq!(fanout.len(), 2);

        let id = EntityId::new(1, 0);
        fanout.emit(&focus_lost(id));

        assert_eq!(rx_a.drain(), vec![focus_lost(id)]);
        assert_eq!(rx_b.drain(), vec![focus_lost(id)]);
    }

    #[test]
    fn test_full_channel_drops() {
        let (tx, rx) = EventBus::create_pair(1);
        let id = EntityId::new(1, 0);
        assert!(tx.send(focus_lost(id)));
        assert!(!tx.send(focus_lost(id)));
        assert_eq!(rx.pending_count(), 1);
    }
}
