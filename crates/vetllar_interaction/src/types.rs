//! Small enums shared by every part of the interaction system.

use serde::{Deserialize, Serialize};

/// How available an interactable currently is.
///
/// Variants are ordered by restrictiveness. When several sources propose a
/// value, the maximum (least available) wins; see [`Interactability::merge`].
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Interactability {
    /// Can be focused on and interacted with.
    #[default]
    Available = 0,
    /// Can be focused on but not interacted with (e.g. already engaged).
    FocusableButUnavailable = 1,
    /// Can neither be focused on nor interacted with.
    Unavailable = 2,
}

impl Interactability {
    /// Conservative merge: the least available of the two.
    #[inline]
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        self.max(other)
    }

    /// Converts from the wire representation.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Available),
            1 => Some(Self::FocusableButUnavailable),
            2 => Some(Self::Unavailable),
            _ => None,
        }
    }
}

/// How an interaction episode ended.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InteractionResult {
    /// Ran to completion.
    #[default]
    Success = 0,
    /// Stopped before completion (released hold, interactor vanished).
    Cancelled = 1,
}

impl InteractionResult {
    /// Converts from the wire representation.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Success),
            1 => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// How an interactor looks for interactables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceMode {
    /// Swept sphere forward from the interactor's own position.
    /// Runs on the authoritative host and on the controlling client.
    #[default]
    SweepFromOwner,
    /// Single pick under the local cursor / touch point.
    /// Runs on the controlling client only; the picked target travels with
    /// the start request.
    CursorFromViewpoint,
}

/// The network role of a process with respect to interaction state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NetRole {
    /// The single writer of interaction state (server / listen host).
    Authority,
    /// Reads replicated snapshots and replays their effects.
    Observer,
}

impl NetRole {
    /// Returns true for the authoritative side.
    #[inline]
    #[must_use]
    pub const fn has_authority(self) -> bool {
        matches!(self, Self::Authority)
    }
}
