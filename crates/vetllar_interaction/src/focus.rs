//! Focus resolution: reduce scan hits to the single closest candidate.

use vetllar_core::{EntityId, Registry, TargetRef, Vec3};

/// Point focus distances are measured from: the interactor's viewpoint if it
/// has one, else its position.
#[must_use]
pub fn reference_point(registry: &Registry, interactor: EntityId) -> Option<Vec3> {
    registry
        .viewpoint(interactor)
        .or_else(|| registry.position(interactor))
}

/// Picks the candidate closest to `reference`.
///
/// Exact ties keep the first candidate encountered.
#[must_use]
pub fn resolve_focus<I>(reference: Vec3, candidates: I) -> Option<TargetRef>
where
    I: IntoIterator<Item = (TargetRef, Vec3)>,
{
    let mut best: Option<(TargetRef, f32)> = None;
    for (target, location) in candidates {
        let distance = reference.distance_squared(location);
        match best {
            Some((_, closest)) if closest <= distance => {}
            _ => best = Some((target, distance)),
        }
    }
    best.map(|(target, _)| target)
}

/// Resolves focus among `targets`, looking their locations up in `registry`.
///
/// Targets whose handle no longer resolves are skipped.
#[must_use]
pub fn resolve_focus_in(
    registry: &Registry,
    interactor: EntityId,
    targets: &[TargetRef],
) -> Option<TargetRef> {
    let reference = reference_point(registry, interactor)?;
    resolve_focus(
        reference,
        targets
            .iter()
            .filter_map(|target| registry.part_location(*target).map(|at| (*target, at))),
    )
}
