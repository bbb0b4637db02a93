//! Pipeline configuration.

use std::fs;
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::tracker::MatchPolicy;

/// When a cycle runs the detector instead of only tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum DetectionPolicy {
    /// Detect while nothing is tracked; otherwise only track.
    #[default]
    WhenEmpty,
    /// Detect and reconcile on every accepted frame.
    EveryFrame,
    /// Detect on every `frames`-th accepted frame (and whenever nothing is tracked).
    Interval { frames: NonZeroU32 },
}

/// Which predictions get a recognition request each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentScope {
    /// Every prediction published this cycle.
    #[default]
    AllPredictions,
    /// Only identities minted this cycle; older annotations carry over.
    NewIdentities,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub scope: EnrichmentScope,
    /// Deadline for a whole recognition batch. `None` waits indefinitely.
    pub timeout_ms: Option<u64>,
    /// Worker threads used for recognition fan-out.
    pub workers: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scope: EnrichmentScope::default(),
            timeout_ms: Some(2000),
            workers: 4,
        }
    }
}

impl EnrichmentConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Configuration for the frame pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub detection_policy: DetectionPolicy,
    pub match_policy: MatchPolicy,
    /// Detector runs an identity may go unmatched before it is dropped.
    pub max_missed_detections: u32,
    pub enrichment: EnrichmentConfig,
    /// Sample window of each metric moving average.
    pub metrics_window: usize,
    /// Trailing window used to count frames per second.
    pub fps_window_ms: u64,
    /// Completed cycles between timing summaries in the log. Zero disables them.
    pub summary_every: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detection_policy: DetectionPolicy::default(),
            match_policy: MatchPolicy::default(),
            max_missed_detections: 0,
            enrichment: EnrichmentConfig::default(),
            metrics_window: 10,
            fps_window_ms: 1000,
            summary_every: 300,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.metrics_window == 0 {
            return Err(PipelineError::Config("metrics_window must be at least 1".into()));
        }
        if self.fps_window_ms == 0 {
            return Err(PipelineError::Config("fps_window_ms must be at least 1".into()));
        }
        if self.enrichment.enabled && self.enrichment.workers == 0 {
            return Err(PipelineError::Config(
                "enrichment.workers must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn fps_window(&self) -> Duration {
        Duration::from_millis(self.fps_window_ms)
    }
}
