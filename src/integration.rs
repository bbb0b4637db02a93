//! Integration of the external collaborators with the reconciliation core.
//!
//! This module provides the traits the pipeline depends on (detector, visual
//! tracker, recognizer, frame source, observer), the recognition fan-out, the
//! per-frame [`FramePipeline`] and the threaded [`PipelineController`] that
//! enforces single-flight processing.

mod builder;
mod controller;
mod detector;
mod enrichment;
mod pipeline;
mod recognizer;
mod snapshot;
mod source;

pub use builder::DetectionBuilder;
pub use controller::{FrameDisposition, PipelineController, PipelineStats};
pub use detector::{BoxTracker, DetectionSource, StationaryTracker};
pub use enrichment::{EnrichmentDispatcher, UNRECOGNIZED_TEXT};
pub use pipeline::{CyclePhase, FramePipeline, PipelineBuilder};
pub use recognizer::{Recognizer, Region};
pub use snapshot::{FrameSnapshot, Prediction, SnapshotCell};
pub use source::{FrameSource, IterSource, Observer, PacedSource};
