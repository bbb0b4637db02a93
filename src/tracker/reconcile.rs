//! Reconciliation of detector output with the identity store.
//!
//! A detector run associates each detection with at most one existing identity
//! (see [`MatchPolicy`]). When several detections continue the same identity
//! they are absorbed in detector order, so the last one's box wins. Unmatched
//! detections mint new identities and identities left without a detection age
//! out after `max_missed` runs.
//! Position refinement by the visual tracker is applied afterwards through
//! [`refine`], which is also the whole of the pure-tracking path.

use tracing::trace;

use crate::tracker::detection::Detection;
use crate::tracker::identity::{IdSequence, IdentityId, IdentityStore, TrackedIdentity};
use crate::tracker::matching::{self, AssignmentResult, MatchPolicy};
use crate::tracker::rect::Rect;

/// Outcome of associating one detector batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Detections in detector order, each paired with the identity it now belongs to
    pub predictions: Vec<(IdentityId, Detection)>,
    /// Identities minted for unmatched detections
    pub created: Vec<IdentityId>,
    /// Identities dropped for going unmatched too long
    pub removed: Vec<IdentityId>,
}

pub fn reconcile(
    store: &mut IdentityStore,
    sequence: &mut IdSequence,
    detections: Vec<Detection>,
    policy: MatchPolicy,
    max_missed: u32,
) -> Reconciliation {
    let existing: Vec<(IdentityId, Rect)> = store.all().map(|(id, i)| (id, i.bbox)).collect();
    let identity_boxes: Vec<Rect> = existing.iter().map(|(_, bbox)| *bbox).collect();
    let detection_boxes: Vec<Rect> = detections.iter().map(|d| d.bbox).collect();

    let AssignmentResult {
        matches,
        unmatched_identities,
        ..
    } = matching::associate(&identity_boxes, &detection_boxes, policy);

    let mut owner: Vec<Option<IdentityId>> = vec![None; detections.len()];
    for (identity_idx, det_idx) in matches {
        let id = existing[identity_idx].0;
        if let Some(identity) = store.get_mut(id) {
            identity.absorb(&detections[det_idx]);
        }
        owner[det_idx] = Some(id);
        trace!(identity = %id, detection = det_idx, "detection continues identity");
    }

    let mut result = Reconciliation::default();

    for (detection, owner) in detections.into_iter().zip(owner) {
        let id = match owner {
            Some(id) => id,
            None => {
                let id = sequence.next_id();
                store.insert(TrackedIdentity::from_detection(id, &detection));
                result.created.push(id);
                id
            }
        };
        result.predictions.push((id, detection));
    }

    for identity_idx in unmatched_identities {
        let id = existing[identity_idx].0;
        let expired = match store.get_mut(id) {
            Some(identity) => {
                identity.missed += 1;
                identity.missed > max_missed
            }
            None => false,
        };
        if expired {
            store.remove(id);
            result.removed.push(id);
        }
    }

    result
}

/// Refine the boxes of `ids` with `track`.
///
/// `track` yields `Ok(Some(bbox))` for a refined position and `Ok(None)` when the
/// object could not be resolved; unresolved identities are removed when
/// `drop_unresolved` is set and otherwise keep their box. An `Err` stops the
/// refinement and is returned unchanged. Returns the identities that were
/// not resolved.
pub fn refine<E>(
    store: &mut IdentityStore,
    ids: &[IdentityId],
    mut track: impl FnMut(&TrackedIdentity) -> Result<Option<Rect>, E>,
    drop_unresolved: bool,
) -> Result<Vec<IdentityId>, E> {
    let mut unresolved = Vec::new();

    for &id in ids {
        let Some(identity) = store.get(id) else {
            continue;
        };
        match track(identity)? {
            Some(bbox) => store.upsert(id, bbox),
            None => {
                unresolved.push(id);
                if drop_unresolved {
                    store.remove(id);
                }
            }
        }
    }

    Ok(unresolved)
}
