//! FramePipeline: one detect-or-track, reconcile, enrich, publish cycle per frame.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use super::detector::{BoxTracker, DetectionSource};
use super::enrichment::EnrichmentDispatcher;
use super::recognizer::{Recognizer, Region};
use super::snapshot::{FrameSnapshot, Prediction, SnapshotCell};
use super::source::Observer;
use crate::config::{DetectionPolicy, EnrichmentScope, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::frame::Frame;
use crate::metrics::{CycleMetrics, PerformanceMeter};
use crate::tracker::{self, IdSequence, IdentityId, IdentityStore};

/// Stage of the cycle currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePhase {
    #[default]
    Idle,
    DetectingOrTracking,
    Reconciling,
    Enriching,
    Publishing,
}

/// State carried from one cycle to the next.
#[derive(Debug, Default)]
struct PipelineState {
    identities: IdentityStore,
    sequence: IdSequence,
    annotations: BTreeMap<IdentityId, String>,
    previous_frame: Option<Frame>,
    frames_since_detection: u32,
}

/// Result of the detect-or-track stage, before it is committed.
struct StagedCycle {
    identities: IdentityStore,
    predictions: Vec<Prediction>,
    created: Vec<IdentityId>,
    detected: bool,
}

/// Combines a detector, a visual tracker and an optional recognizer into a
/// single-threaded cycle.
///
/// Each call to [`process_frame`](Self::process_frame) runs one complete cycle.
/// A failed cycle leaves the identities, annotations and published snapshot
/// untouched. Use [`PipelineController`](super::PipelineController) to drive a
/// pipeline from a live frame source with single-flight load shedding.
pub struct FramePipeline<D: DetectionSource, T: BoxTracker> {
    detector: D,
    tracker: T,
    enrichment: Option<EnrichmentDispatcher>,
    config: PipelineConfig,
    state: PipelineState,
    meter: PerformanceMeter,
    snapshots: Arc<SnapshotCell>,
    observers: Vec<Box<dyn Observer>>,
    phase: CyclePhase,
    completed: u64,
}

impl<D: DetectionSource, T: BoxTracker> FramePipeline<D, T> {
    pub fn builder() -> PipelineBuilder<D, T> {
        PipelineBuilder::new()
    }

    /// Run one cycle on `frame` and publish its snapshot.
    pub fn process_frame(&mut self, frame: Frame) -> Result<Arc<FrameSnapshot>> {
        if self.phase != CyclePhase::Idle {
            // The previous cycle unwound without returning.
            warn!(phase = ?self.phase, "recovering from interrupted cycle");
            self.meter.abandon();
            self.phase = CyclePhase::Idle;
        }
        self.meter.begin();
        let sequence = frame.sequence;
        let result = self.run_cycle(frame);
        if let Err(e) = &result {
            self.meter.abandon();
            debug!(frame = sequence, error = %e, "cycle aborted");
        }
        self.phase = CyclePhase::Idle;
        result
    }

    fn run_cycle(&mut self, frame: Frame) -> Result<Arc<FrameSnapshot>> {
        self.enter(CyclePhase::DetectingOrTracking);
        let staged = if self.should_detect() {
            self.detect(&frame)?
        } else {
            self.track(&frame)?
        };

        self.enter(CyclePhase::Enriching);
        let annotations = self.enrich(&frame, &staged);

        self.enter(CyclePhase::Publishing);
        Ok(self.publish(frame, staged, annotations))
    }

    fn enter(&mut self, phase: CyclePhase) {
        trace!(?phase, "cycle phase");
        self.phase = phase;
    }

    fn should_detect(&self) -> bool {
        if self.state.identities.is_empty() || self.state.previous_frame.is_none() {
            return true;
        }
        match self.config.detection_policy {
            DetectionPolicy::WhenEmpty => false,
            DetectionPolicy::EveryFrame => true,
            DetectionPolicy::Interval { frames } => {
                self.state.frames_since_detection + 1 >= frames.get()
            }
        }
    }

    /// Detector path: associate fresh detections, then refine every surviving
    /// identity against the current frame. Boxes the tracker cannot resolve keep
    /// their detected position.
    fn detect(&mut self, frame: &Frame) -> Result<StagedCycle> {
        let detections = self
            .detector
            .infer(frame)
            .map_err(|e| PipelineError::Detection(Box::new(e)))?;

        self.enter(CyclePhase::Reconciling);
        let mut identities = self.state.identities.clone();
        let reconciliation = tracker::reconcile(
            &mut identities,
            &mut self.state.sequence,
            detections,
            self.config.match_policy,
            self.config.max_missed_detections,
        );

        if let Some(previous_frame) = &self.state.previous_frame {
            let ids = identities.ids();
            let box_tracker = &mut self.tracker;
            tracker::refine(
                &mut identities,
                &ids,
                |identity| box_tracker.track(&identity.bbox, previous_frame, frame),
                false,
            )
            .map_err(|e| PipelineError::Tracking(Box::new(e)))?;
        }
        self.meter.end_inference();

        debug!(
            frame = frame.sequence,
            detections = reconciliation.predictions.len(),
            created = reconciliation.created.len(),
            removed = reconciliation.removed.len(),
            identities = identities.len(),
            "reconciled detections"
        );

        Ok(StagedCycle {
            identities,
            predictions: reconciliation
                .predictions
                .into_iter()
                .map(|(identity, detection)| Prediction {
                    identity,
                    detection,
                })
                .collect(),
            created: reconciliation.created,
            detected: true,
        })
    }

    /// Tracking path: move every identity with the tracker and drop the ones it lost.
    fn track(&mut self, frame: &Frame) -> Result<StagedCycle> {
        let Some(previous_frame) = &self.state.previous_frame else {
            return self.detect(frame);
        };

        let mut identities = self.state.identities.clone();
        let ids = identities.ids();
        let box_tracker = &mut self.tracker;
        let lost = tracker::refine(
            &mut identities,
            &ids,
            |identity| box_tracker.track(&identity.bbox, previous_frame, frame),
            true,
        )
        .map_err(|e| PipelineError::Tracking(Box::new(e)))?;
        self.meter.end_inference();
        self.enter(CyclePhase::Reconciling);

        debug!(
            frame = frame.sequence,
            lost = lost.len(),
            identities = identities.len(),
            "tracked identities"
        );

        let predictions = identities
            .all()
            .map(|(identity, tracked)| Prediction {
                identity,
                detection: tracked.to_detection(),
            })
            .collect();

        Ok(StagedCycle {
            identities,
            predictions,
            created: Vec::new(),
            detected: false,
        })
    }

    /// Annotations for the staged identities: carried-over text overwritten by
    /// this cycle's recognition results. Blocks until every request resolves.
    fn enrich(&self, frame: &Frame, staged: &StagedCycle) -> BTreeMap<IdentityId, String> {
        let Some(dispatcher) = &self.enrichment else {
            return BTreeMap::new();
        };

        // Several predictions can share an identity; recognize each one once.
        let targets: BTreeSet<IdentityId> = match self.config.enrichment.scope {
            EnrichmentScope::AllPredictions => {
                staged.predictions.iter().map(|p| p.identity).collect()
            }
            EnrichmentScope::NewIdentities => staged.created.iter().copied().collect(),
        };

        let regions = targets
            .into_iter()
            .filter_map(|id| staged.identities.get(id))
            .map(|identity| Region {
                identity: identity.id,
                bbox: identity.bbox,
                pixels: frame.crop(&identity.bbox),
            })
            .collect();

        let mut annotations: BTreeMap<IdentityId, String> = self
            .state
            .annotations
            .iter()
            .filter(|(id, _)| staged.identities.contains(**id))
            .map(|(id, text)| (*id, text.clone()))
            .collect();
        annotations.extend(dispatcher.dispatch(regions));
        annotations
    }

    fn publish(
        &mut self,
        frame: Frame,
        staged: StagedCycle,
        annotations: BTreeMap<IdentityId, String>,
    ) -> Arc<FrameSnapshot> {
        let StagedCycle {
            identities,
            predictions,
            detected,
            ..
        } = staged;

        let snapshot = Arc::new(FrameSnapshot {
            sequence: frame.sequence,
            timestamp: frame.timestamp,
            detected,
            predictions,
            identities: identities.clone().into_map(),
            annotations: annotations.clone(),
        });

        self.state.identities = identities;
        self.state.annotations = annotations;
        self.state.previous_frame = Some(frame);
        self.state.frames_since_detection = if detected {
            0
        } else {
            self.state.frames_since_detection.saturating_add(1)
        };

        self.snapshots.publish(Arc::clone(&snapshot));
        let metrics = self.meter.finish();
        for observer in &mut self.observers {
            observer.on_snapshot(&snapshot, &metrics);
        }

        self.completed += 1;
        self.log_summary(&metrics);
        snapshot
    }

    fn log_summary(&self, metrics: &CycleMetrics) {
        let every = self.config.summary_every;
        if every > 0 && self.completed % every == 0 {
            info!(
                cycles = self.completed,
                identities = self.state.identities.len(),
                inference_ms = metrics.average.inference_ms,
                execution_ms = metrics.average.execution_ms,
                fps = metrics.average.fps,
                "pipeline timings"
            );
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn identities(&self) -> &IdentityStore {
        &self.state.identities
    }

    pub fn annotations(&self) -> &BTreeMap<IdentityId, String> {
        &self.state.annotations
    }

    /// Shared handle to the latest published snapshot.
    pub fn snapshots(&self) -> Arc<SnapshotCell> {
        Arc::clone(&self.snapshots)
    }

    pub fn latest(&self) -> Option<Arc<FrameSnapshot>> {
        self.snapshots.latest()
    }

    pub fn metrics(&self) -> crate::metrics::MetricSample {
        self.meter.averages()
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Get a mutable reference to the underlying tracker.
    pub fn tracker_mut(&mut self) -> &mut T {
        &mut self.tracker
    }
}

impl<D: DetectionSource, T: BoxTracker> fmt::Debug for FramePipeline<D, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePipeline")
            .field("phase", &self.phase)
            .field("identities", &self.state.identities.len())
            .field("completed", &self.completed)
            .field("enrichment", &self.enrichment.is_some())
            .finish()
    }
}

/// Assembles a [`FramePipeline`]. Any failure here is a setup failure.
pub struct PipelineBuilder<D, T> {
    detector: Option<Result<D>>,
    tracker: Option<T>,
    recognizer: Option<Arc<dyn Recognizer>>,
    observers: Vec<Box<dyn Observer>>,
    config: PipelineConfig,
}

impl<D: DetectionSource, T: BoxTracker> PipelineBuilder<D, T> {
    pub fn new() -> Self {
        Self {
            detector: None,
            tracker: None,
            recognizer: None,
            observers: Vec::new(),
            config: PipelineConfig::default(),
        }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn detector(mut self, detector: D) -> Self {
        self.detector = Some(Ok(detector));
        self
    }

    /// Construct the detector, recording a failure for [`build`](Self::build) to report.
    pub fn load_detector<E, F>(mut self, load: F) -> Self
    where
        F: FnOnce() -> std::result::Result<D, E>,
        E: fmt::Display,
    {
        self.detector = Some(
            load().map_err(|e| PipelineError::Setup(format!("failed to load detector: {e}"))),
        );
        self
    }

    pub fn tracker(mut self, tracker: T) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Enable the enrichment stage with `recognizer`.
    pub fn recognizer(mut self, recognizer: impl Recognizer + 'static) -> Self {
        self.recognizer = Some(Arc::new(recognizer));
        self
    }

    pub fn shared_recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn build(self) -> Result<FramePipeline<D, T>> {
        self.config.validate()?;

        let detector = self
            .detector
            .ok_or_else(|| PipelineError::Setup("no detector configured".into()))??;
        let tracker = self
            .tracker
            .ok_or_else(|| PipelineError::Setup("no tracker configured".into()))?;

        let enrichment = match self.recognizer {
            Some(recognizer) if self.config.enrichment.enabled => Some(EnrichmentDispatcher::new(
                recognizer,
                self.config.enrichment.workers,
                self.config.enrichment.timeout(),
            )?),
            _ => None,
        };

        let meter = PerformanceMeter::new(self.config.metrics_window, self.config.fps_window());

        Ok(FramePipeline {
            detector,
            tracker,
            enrichment,
            config: self.config,
            state: PipelineState::default(),
            meter,
            snapshots: Arc::new(SnapshotCell::new()),
            observers: self.observers,
            phase: CyclePhase::Idle,
            completed: 0,
        })
    }
}

impl<D: DetectionSource, T: BoxTracker> Default for PipelineBuilder<D, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::num::NonZeroU32;
    use std::time::Duration;

    use crate::error::RecognitionError;
    use crate::integration::detector::StationaryTracker;
    use crate::integration::enrichment::UNRECOGNIZED_TEXT;
    use crate::tracker::{Detection, Rect};

    #[derive(Debug, thiserror::Error)]
    #[error("mock failure")]
    struct MockError;

    /// Replays scripted detector results, one per call.
    #[derive(Default)]
    struct ScriptedDetector {
        script: VecDeque<std::result::Result<Vec<Detection>, MockError>>,
        calls: usize,
    }

    impl ScriptedDetector {
        fn new(script: Vec<std::result::Result<Vec<Detection>, MockError>>) -> Self {
            Self {
                script: script.into(),
                calls: 0,
            }
        }
    }

    impl DetectionSource for ScriptedDetector {
        type Error = MockError;

        fn infer(&mut self, _frame: &Frame) -> std::result::Result<Vec<Detection>, MockError> {
            self.calls += 1;
            self.script.pop_front().unwrap_or_else(|| Ok(vec![]))
        }
    }

    /// Shifts every box right by `dx`; fails or loses objects on request.
    struct ShiftTracker {
        dx: f32,
        fail: bool,
        lose: bool,
        calls: usize,
    }

    impl ShiftTracker {
        fn new(dx: f32) -> Self {
            Self {
                dx,
                fail: false,
                lose: false,
                calls: 0,
            }
        }
    }

    impl BoxTracker for ShiftTracker {
        type Error = MockError;

        fn track(
            &mut self,
            previous: &Rect,
            _previous_frame: &Frame,
            _current_frame: &Frame,
        ) -> std::result::Result<Option<Rect>, MockError> {
            self.calls += 1;
            if self.fail {
                return Err(MockError);
            }
            if self.lose {
                return Ok(None);
            }
            Ok(Some(Rect::new(
                previous.x + self.dx,
                previous.y,
                previous.width,
                previous.height,
            )))
        }
    }

    fn frame(sequence: u64) -> Frame {
        Frame::blank(sequence, Duration::from_millis(sequence * 33), 32, 32)
    }

    fn cat(x: f32, y: f32) -> Detection {
        Detection::new("cat", 0.9, Rect::new(x, y, 0.2, 0.2))
    }

    fn no_enrichment() -> PipelineConfig {
        PipelineConfig {
            enrichment: crate::config::EnrichmentConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_first_frame_detects() {
        let mut pipeline = FramePipeline::builder()
            .detector(ScriptedDetector::new(vec![Ok(vec![cat(0.1, 0.1)])]))
            .tracker(ShiftTracker::new(0.01))
            .config(no_enrichment())
            .build()
            .unwrap();

        let snapshot = pipeline.process_frame(frame(0)).unwrap();
        assert!(snapshot.detected);
        assert_eq!(snapshot.predictions.len(), 1);
        assert_eq!(snapshot.identities.len(), 1);
        assert_eq!(pipeline.detector().calls, 1);
        // No previous frame yet, so nothing to refine against.
        assert_eq!(pipeline.tracker().calls, 0);
        assert_eq!(pipeline.phase(), CyclePhase::Idle);
    }

    #[test]
    fn test_when_empty_policy_tracks_existing() {
        let mut pipeline = FramePipeline::builder()
            .detector(ScriptedDetector::new(vec![Ok(vec![cat(0.1, 0.1)])]))
            .tracker(ShiftTracker::new(0.05))
            .config(no_enrichment())
            .build()
            .unwrap();

        let first = pipeline.process_frame(frame(0)).unwrap();
        let id = first.predictions[0].identity;

        let second = pipeline.process_frame(frame(1)).unwrap();
        assert!(!second.detected);
        assert_eq!(pipeline.detector().calls, 1);
        assert_eq!(second.predictions.len(), 1);
        assert_eq!(second.predictions[0].identity, id);
        assert_eq!(second.predictions[0].detection.label, "cat");
        assert!((second.identities[&id].bbox.x - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_lost_identity_dropped_then_redetected() {
        let mut pipeline = FramePipeline::builder()
            .detector(ScriptedDetector::new(vec![
                Ok(vec![cat(0.1, 0.1)]),
                Ok(vec![cat(0.6, 0.6)]),
            ]))
            .tracker(ShiftTracker::new(0.0))
            .config(no_enrichment())
            .build()
            .unwrap();

        let first = pipeline.process_frame(frame(0)).unwrap();
        let old = first.predictions[0].identity;

        pipeline.tracker_mut().lose = true;
        let lost = pipeline.process_frame(frame(1)).unwrap();
        assert!(lost.identities.is_empty());
        assert!(lost.predictions.is_empty());

        pipeline.tracker_mut().lose = false;
        let again = pipeline.process_frame(frame(2)).unwrap();
        assert!(again.detected);
        assert_eq!(again.identities.len(), 1);
        assert!(again.predictions[0].identity > old);
    }

    #[test]
    fn test_detector_failure_keeps_previous_state() {
        let mut pipeline = FramePipeline::builder()
            .detector(ScriptedDetector::new(vec![
                Ok(vec![cat(0.1, 0.1)]),
                Err(MockError),
            ]))
            .tracker(ShiftTracker::new(0.0))
            .config(PipelineConfig {
                detection_policy: DetectionPolicy::EveryFrame,
                ..no_enrichment()
            })
            .build()
            .unwrap();

        let first = pipeline.process_frame(frame(0)).unwrap();
        let err = pipeline.process_frame(frame(1)).unwrap_err();
        assert!(matches!(err, PipelineError::Detection(_)));
        assert!(err.is_per_cycle());
        assert_eq!(pipeline.phase(), CyclePhase::Idle);
        assert_eq!(pipeline.latest(), Some(first));
        assert_eq!(pipeline.completed_cycles(), 1);
    }

    #[test]
    fn test_tracker_failure_aborts_cycle() {
        let mut pipeline = FramePipeline::builder()
            .detector(ScriptedDetector::new(vec![Ok(vec![cat(0.1, 0.1)])]))
            .tracker(ShiftTracker::new(0.0))
            .config(no_enrichment())
            .build()
            .unwrap();

        pipeline.process_frame(frame(0)).unwrap();
        let before = pipeline.identities().clone();

        pipeline.tracker_mut().fail = true;
        let err = pipeline.process_frame(frame(1)).unwrap_err();
        assert!(matches!(err, PipelineError::Tracking(_)));
        assert_eq!(pipeline.identities(), &before);
    }

    #[test]
    fn test_interval_policy() {
        let mut pipeline = FramePipeline::builder()
            .detector(ScriptedDetector::new(vec![
                Ok(vec![cat(0.1, 0.1)]),
                Ok(vec![cat(0.1, 0.1)]),
            ]))
            .tracker(StationaryTracker)
            .config(PipelineConfig {
                detection_policy: DetectionPolicy::Interval {
                    frames: NonZeroU32::new(3).unwrap(),
                },
                ..no_enrichment()
            })
            .build()
            .unwrap();

        let detected: Vec<bool> = (0..6)
            .map(|i| pipeline.process_frame(frame(i)).unwrap().detected)
            .collect();
        assert_eq!(detected, vec![true, false, false, true, false, false]);
    }

    #[test]
    fn test_annotations_follow_identities() {
        let recognizer = |region: &Region| -> std::result::Result<String, RecognitionError> {
            if region.identity.get() == 1 {
                Ok("PLATE-1".to_string())
            } else {
                Err(RecognitionError::NoObservation)
            }
        };
        let mut pipeline = FramePipeline::builder()
            .detector(ScriptedDetector::new(vec![
                Ok(vec![cat(0.1, 0.1), cat(0.6, 0.6)]),
                Ok(vec![cat(0.12, 0.1)]),
            ]))
            .tracker(StationaryTracker)
            .recognizer(recognizer)
            .config(PipelineConfig {
                detection_policy: DetectionPolicy::EveryFrame,
                ..Default::default()
            })
            .build()
            .unwrap();

        let first = pipeline.process_frame(frame(0)).unwrap();
        assert_eq!(first.annotations.len(), 2);
        let texts: Vec<_> = first.annotations.values().map(String::as_str).collect();
        assert_eq!(texts, vec!["PLATE-1", UNRECOGNIZED_TEXT]);

        let second = pipeline.process_frame(frame(1)).unwrap();
        assert_eq!(second.identities.len(), 1);
        assert_eq!(second.annotations.len(), 1);
        assert!(
            second
                .annotations
                .keys()
                .all(|id| second.identities.contains_key(id))
        );
    }

    #[test]
    fn test_new_identities_scope_carries_annotations() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let recognizer = move |_: &Region| -> std::result::Result<String, RecognitionError> {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok("text".to_string())
        };
        let mut config = PipelineConfig::default();
        config.enrichment.scope = EnrichmentScope::NewIdentities;
        let mut pipeline = FramePipeline::builder()
            .detector(ScriptedDetector::new(vec![Ok(vec![cat(0.1, 0.1)])]))
            .tracker(StationaryTracker)
            .recognizer(recognizer)
            .config(config)
            .build()
            .unwrap();

        pipeline.process_frame(frame(0)).unwrap();
        let tracked = pipeline.process_frame(frame(1)).unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(tracked.annotations.values().next().map(String::as_str), Some("text"));
    }

    #[test]
    fn test_observer_receives_metrics() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut pipeline = FramePipeline::builder()
            .detector(ScriptedDetector::new(vec![Ok(vec![cat(0.1, 0.1)])]))
            .tracker(StationaryTracker)
            .observer(move |snapshot: &Arc<FrameSnapshot>, metrics: &CycleMetrics| {
                sink.lock().push((snapshot.sequence, metrics.latest.fps));
            })
            .config(no_enrichment())
            .build()
            .unwrap();

        for i in 0..3 {
            pipeline.process_frame(frame(i)).unwrap();
        }
        let seen = seen.lock();
        assert_eq!(seen.iter().map(|(s, _)| *s).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(seen[2].1, 3);
    }

    /// Aborts the first inference by panicking, then detects normally.
    #[derive(Default)]
    struct PanicOnce {
        panicked: bool,
    }

    impl DetectionSource for PanicOnce {
        type Error = MockError;

        fn infer(&mut self, _frame: &Frame) -> std::result::Result<Vec<Detection>, MockError> {
            if !self.panicked {
                self.panicked = true;
                panic!("model runtime aborted");
            }
            Ok(vec![cat(0.1, 0.1)])
        }
    }

    #[test]
    fn test_cycle_after_unwound_cycle_starts_clean() {
        let mut pipeline = FramePipeline::builder()
            .detector(PanicOnce::default())
            .tracker(StationaryTracker)
            .config(no_enrichment())
            .build()
            .unwrap();

        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pipeline.process_frame(frame(0))
        }));
        assert!(unwound.is_err());
        assert_eq!(pipeline.phase(), CyclePhase::DetectingOrTracking);
        assert!(pipeline.latest().is_none());

        let snapshot = pipeline.process_frame(frame(1)).unwrap();
        assert_eq!(snapshot.sequence, 1);
        assert_eq!(pipeline.phase(), CyclePhase::Idle);
        assert_eq!(pipeline.completed_cycles(), 1);
    }

    #[test]
    fn test_missing_detector_is_setup_error() {
        let result = PipelineBuilder::<ScriptedDetector, StationaryTracker>::new()
            .tracker(StationaryTracker)
            .build();
        assert!(matches!(result, Err(PipelineError::Setup(_))));
    }

    #[test]
    fn test_failed_detector_load_is_setup_error() {
        let result = PipelineBuilder::<ScriptedDetector, StationaryTracker>::new()
            .load_detector(|| Err::<ScriptedDetector, _>("model file missing"))
            .tracker(StationaryTracker)
            .build();
        match result {
            Err(PipelineError::Setup(msg)) => assert!(msg.contains("model file missing")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
