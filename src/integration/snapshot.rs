//! Published cycle results.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;

use crate::tracker::{Detection, IdentityId, TrackedIdentity};

/// A detection published together with the identity it was reconciled to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub identity: IdentityId,
    pub detection: Detection,
}

/// Externally observable result of one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameSnapshot {
    /// Sequence number of the frame this snapshot was computed from
    pub sequence: u64,
    pub timestamp: Duration,
    /// Whether the detector ran for this frame (as opposed to tracking only)
    pub detected: bool,
    /// Predictions in detector order (or identity order on tracking-only cycles)
    pub predictions: Vec<Prediction>,
    pub identities: BTreeMap<IdentityId, TrackedIdentity>,
    pub annotations: BTreeMap<IdentityId, String>,
}

impl FrameSnapshot {
    pub fn detections(&self) -> impl Iterator<Item = &Detection> {
        self.predictions.iter().map(|p| &p.detection)
    }

    pub fn annotation(&self, id: IdentityId) -> Option<&str> {
        self.annotations.get(&id).map(String::as_str)
    }
}

/// Holder of the most recently published snapshot.
///
/// Publishing swaps a whole `Arc`, so readers see either the previous or the new
/// snapshot and never a mix.
#[derive(Debug, Default)]
pub struct SnapshotCell {
    latest: RwLock<Option<Arc<FrameSnapshot>>>,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: Arc<FrameSnapshot>) {
        *self.latest.write() = Some(snapshot);
    }

    pub fn latest(&self) -> Option<Arc<FrameSnapshot>> {
        self.latest.read().clone()
    }
}
