//! Client → server interaction requests.

use vetllar_core::{EntityId, TargetRef};

/// A mutation a non-authoritative side asks the authoritative side to make.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionRequest {
    /// Start interacting with the current focus.
    Start {
        /// Requesting interactor.
        interactor: EntityId,
        /// Client-picked target. Only carried, and only honored, for
        /// cursor-based trace modes.
        focused: Option<TargetRef>,
    },
    /// Stop the current hold interaction.
    Stop {
        /// Requesting interactor.
        interactor: EntityId,
    },
}

impl InteractionRequest {
    /// The interactor the request is for.
    #[must_use]
    pub const fn interactor(&self) -> EntityId {
        match self {
            Self::Start { interactor, .. } | Self::Stop { interactor } => *interactor,
        }
    }
}
