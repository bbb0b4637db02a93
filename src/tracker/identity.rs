//! Persistent object identities and the store that owns them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tracker::detection::Detection;
use crate::tracker::rect::Rect;

/// Stable identifier of a tracked object. Never reused within a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityId(u64);

impl IdentityId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic source of fresh identity ids.
///
/// Lives outside the store so ids minted by an aborted cycle are still burned.
#[derive(Debug, Default)]
pub struct IdSequence {
    last: u64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> IdentityId {
        self.last += 1;
        IdentityId(self.last)
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.last
    }
}

/// A physical object followed across frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedIdentity {
    pub id: IdentityId,
    /// Last known position (normalized TLWH)
    pub bbox: Rect,
    /// Label of the last associated detection
    pub label: String,
    /// Confidence of the last associated detection
    pub confidence: f32,
    /// Consecutive detector runs without an associated detection
    pub missed: u32,
}

impl TrackedIdentity {
    pub fn from_detection(id: IdentityId, detection: &Detection) -> Self {
        Self {
            id,
            bbox: detection.bbox,
            label: detection.label.clone(),
            confidence: detection.confidence,
            missed: 0,
        }
    }

    /// Take over the position and classification of a newly associated detection.
    pub fn absorb(&mut self, detection: &Detection) {
        self.bbox = detection.bbox;
        self.label.clone_from(&detection.label);
        self.confidence = detection.confidence;
        self.missed = 0;
    }

    /// View this identity as a prediction at its current position.
    pub fn to_detection(&self) -> Detection {
        Detection {
            label: self.label.clone(),
            confidence: self.confidence,
            bbox: self.bbox,
        }
    }
}

/// Current mapping of identity id to tracked state, iterated in ascending id order.
///
/// Not synchronized; the owning pipeline holds it exclusively during a cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityStore {
    identities: BTreeMap<IdentityId, TrackedIdentity>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the box of `id`, creating an unlabeled identity when it is unknown.
    pub fn upsert(&mut self, id: IdentityId, bbox: Rect) {
        self.identities
            .entry(id)
            .and_modify(|identity| identity.bbox = bbox)
            .or_insert_with(|| TrackedIdentity {
                id,
                bbox,
                label: "N/A".to_string(),
                confidence: 0.0,
                missed: 0,
            });
    }

    pub fn insert(&mut self, identity: TrackedIdentity) {
        self.identities.insert(identity.id, identity);
    }

    pub fn remove(&mut self, id: IdentityId) -> Option<TrackedIdentity> {
        self.identities.remove(&id)
    }

    pub fn get(&self, id: IdentityId) -> Option<&TrackedIdentity> {
        self.identities.get(&id)
    }

    pub fn get_mut(&mut self, id: IdentityId) -> Option<&mut TrackedIdentity> {
        self.identities.get_mut(&id)
    }

    pub fn contains(&self, id: IdentityId) -> bool {
        self.identities.contains_key(&id)
    }

    pub fn all(&self) -> impl Iterator<Item = (IdentityId, &TrackedIdentity)> {
        self.identities.iter().map(|(id, identity)| (*id, identity))
    }

    pub fn ids(&self) -> Vec<IdentityId> {
        self.identities.keys().copied().collect()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&TrackedIdentity) -> bool) {
        self.identities.retain(|_, identity| keep(identity));
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub(crate) fn into_map(self) -> BTreeMap<IdentityId, TrackedIdentity> {
        self.identities
    }
}
