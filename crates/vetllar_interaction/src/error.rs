//! # Interaction Error Types
//!
//! Most interaction operations never fail from the caller's point of view:
//! a request that arrives in the wrong state is a silent no-op. These errors
//! cover lookups, configuration and invariant checks, which are logged and
//! then degraded to "unavailable" or "nothing happened".

use thiserror::Error;
use vetllar_core::{EntityId, TargetRef};

/// Errors that can occur in the interaction system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InteractionError {
    /// An interactable was created without an interactive config.
    #[error("interactable {0} has no interactive config")]
    MissingConfig(EntityId),

    /// No interactable state machine could be found for an entity.
    #[error("entity {0} does not have an interactable state machine")]
    UnresolvedStateMachine(EntityId),

    /// A handle no longer resolves in the registry.
    #[error("stale handle to {0:?}")]
    StaleHandle(TargetRef),

    /// The entity does not expose any interaction capability.
    #[error("entity {0} is not interactive")]
    NotInteractive(EntityId),

    /// No interactor controller is registered for the entity.
    #[error("entity {0} is not an interactor")]
    NotAnInteractor(EntityId),

    /// A cursor-mode start request arrived without a usable target.
    #[error("start request from {0} carried no valid target")]
    MissingTarget(EntityId),

    /// A mutating operation reached a non-authoritative side.
    #[error("operation requires authority")]
    NotAuthoritative,

    /// The authoritative interactable is engaged by someone else.
    #[error("interactor {requester} does not match current interactor {current:?}")]
    InteractorMismatch {
        /// The interactor that asked.
        requester: EntityId,
        /// The interactor recorded on the state machine.
        current: Option<EntityId>,
    },

    /// Invalid configuration file or value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for interaction operations.
pub type InteractionOutcome<T> = Result<T, InteractionError>;
