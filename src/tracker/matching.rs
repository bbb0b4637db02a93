//! Association of fresh detections with existing identities.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::tracker::rect::{Rect, iou_batch};

/// How a detection picks the identity it continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Scan identities in ascending id order; the first one whose box overlaps
    /// the detection wins. Order dependent and not best-match. Several
    /// detections may continue the same identity.
    #[default]
    FirstIntersecting,
    /// Globally optimal one-to-one assignment on IoU cost. Pairs with zero
    /// overlap are never matched.
    BestIou,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    /// `(identity index, detection index)` pairs in detection order. An identity
    /// index repeats when several detections continue it.
    pub matches: Vec<(usize, usize)>,
    pub unmatched_identities: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

impl AssignmentResult {
    fn from_matches(matches: Vec<(usize, usize)>, rows: usize, cols: usize) -> Self {
        let mut row_used = vec![false; rows];
        let mut col_used = vec![false; cols];
        for &(r, c) in &matches {
            row_used[r] = true;
            col_used[c] = true;
        }
        Self {
            matches,
            unmatched_identities: unused(&row_used),
            unmatched_detections: unused(&col_used),
        }
    }
}

fn unused(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(i, &used)| if used { None } else { Some(i) })
        .collect()
}

/// Match detections against identity boxes under `policy`.
///
/// `identity_boxes` must already be in the scan order the policy relies on.
pub fn associate(
    identity_boxes: &[Rect],
    detection_boxes: &[Rect],
    policy: MatchPolicy,
) -> AssignmentResult {
    match policy {
        MatchPolicy::FirstIntersecting => first_intersecting(identity_boxes, detection_boxes),
        MatchPolicy::BestIou => best_iou(identity_boxes, detection_boxes),
    }
}

/// Detections are visited in order; each continues the first overlapping identity.
pub fn first_intersecting(identity_boxes: &[Rect], detection_boxes: &[Rect]) -> AssignmentResult {
    let matches = detection_boxes
        .iter()
        .enumerate()
        .filter_map(|(det_idx, det)| {
            identity_boxes
                .iter()
                .position(|bbox| bbox.intersects(det))
                .map(|i| (i, det_idx))
        })
        .collect();

    AssignmentResult::from_matches(matches, identity_boxes.len(), detection_boxes.len())
}

/// One-to-one assignment maximizing total IoU. Only overlapping pairs are kept.
pub fn best_iou(identity_boxes: &[Rect], detection_boxes: &[Rect]) -> AssignmentResult {
    let iou = iou_batch(identity_boxes, detection_boxes);
    let cost = iou.mapv(|v| 1.0 - v);
    let assigned = linear_assignment(&cost, 1.0);
    let matches = assigned
        .matches
        .into_iter()
        .filter(|&(r, c)| iou[[r, c]] > 0.0)
        .collect();

    AssignmentResult::from_matches(matches, identity_boxes.len(), detection_boxes.len())
}

pub fn linear_assignment(cost_matrix: &Array2<f32>, thresh: f32) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult::from_matches(vec![], num_rows, num_cols);
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), 1e6);

    for i in 0..num_rows {
        for j in 0..num_cols {
            padded[[i, j]] = cost_matrix[[i, j]] as f64;
        }
    }

    let mut matches = vec![];
    if let Ok((row_to_col, _)) = lapjv::lapjv(&padded) {
        for (row_idx, &col_idx) in row_to_col.iter().enumerate().take(num_rows) {
            if col_idx < num_cols && cost_matrix[[row_idx, col_idx]] <= thresh {
                matches.push((row_idx, col_idx));
            }
        }
    }

    AssignmentResult::from_matches(matches, num_rows, num_cols)
}
