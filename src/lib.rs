//! Real-time detect, track and recognize pipeline for live camera frames.
//!
//! A [`FramePipeline`] runs the expensive detector when it has to and the cheap
//! visual tracker otherwise, reconciles detections with persistent
//! [`IdentityId`]s, optionally recognizes text inside every tracked box and
//! publishes the result as an atomic [`FrameSnapshot`]. A
//! [`PipelineController`] drives it from a frame source and sheds frames that
//! arrive while a cycle is in flight.

pub mod config;
pub mod error;
pub mod frame;
pub mod integration;
pub mod metrics;
pub mod tracker;

pub use config::{DetectionPolicy, EnrichmentConfig, EnrichmentScope, PipelineConfig};
pub use error::{PipelineError, RecognitionError, Result};
pub use frame::Frame;
pub use integration::{
    BoxTracker, CyclePhase, DetectionBuilder, DetectionSource, EnrichmentDispatcher,
    FrameDisposition, FramePipeline, FrameSnapshot, FrameSource, IterSource,
    Observer, PacedSource, PipelineBuilder, PipelineController, PipelineStats, Prediction,
    Recognizer, Region, SnapshotCell, StationaryTracker, UNRECOGNIZED_TEXT,
};
pub use metrics::{CycleMetrics, MetricSample, MovingAverageFilter, PerformanceMeter};
pub use tracker::{Detection, IdentityId, IdentityStore, MatchPolicy, Rect, TrackedIdentity};
