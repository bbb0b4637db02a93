//! Detector output consumed by reconciliation.

use serde::{Deserialize, Serialize};

use crate::tracker::rect::Rect;

/// One detector output: label, confidence and normalized bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label of the top classification
    pub label: String,
    /// Detection confidence score in `[0, 1]`
    pub confidence: f32,
    /// Bounding box in normalized TLWH format
    pub bbox: Rect,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: Rect) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
            bbox,
        }
    }
}
