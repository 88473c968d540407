//! Spatial query collaborator.
//!
//! The interaction core never casts rays itself. Hosts implement
//! [`SpatialQuery`] against whatever physics or picking backend they have.

use vetllar_core::{TargetRef, Vec3};

/// Where a pointer query originates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerSource {
    /// Persistent hover cursor.
    Cursor,
    /// A touch or tap point.
    Touch,
}

/// Environment queries consumed by interactor scans.
pub trait SpatialQuery {
    /// Everything a sphere of `radius` swept from `origin` along `direction`
    /// for `distance` touches.
    fn sweep_for_candidates(
        &self,
        origin: Vec3,
        direction: Vec3,
        distance: f32,
        radius: f32,
    ) -> Vec<TargetRef>;

    /// What the pointer is over, if anything.
    fn query_pointer_target(&self, source: PointerSource) -> Option<TargetRef>;
}

/// A spatial backend whose answers are set by hand.
///
/// Useful for headless hosts, simulations and tests. An untouched instance
/// reports nothing.
#[derive(Clone, Debug, Default)]
pub struct ScriptedSpace {
    sweep: Vec<TargetRef>,
    cursor: Option<TargetRef>,
    touch: Option<TargetRef>,
}

impl ScriptedSpace {
    /// Creates an empty space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces what every sweep reports.
    pub fn set_sweep_hits(&mut self, hits: Vec<TargetRef>) {
        self.sweep = hits;
    }

    /// Replaces what the hover cursor is over.
    pub fn set_cursor(&mut self, target: Option<TargetRef>) {
        self.cursor = target;
    }

    /// Replaces what a touch lands on.
    pub fn set_touch(&mut self, target: Option<TargetRef>) {
        self.touch = target;
    }
}

impl SpatialQuery for ScriptedSpace {
    fn sweep_for_candidates(&self, _: Vec3, _: Vec3, _: f32, _: f32) -> Vec<TargetRef> {
        self.sweep.clone()
    }

    fn query_pointer_target(&self, source: PointerSource) -> Option<TargetRef> {
        match source {
            PointerSource::Cursor => self.cursor,
            PointerSource::Touch => self.touch,
        }
    }
}
