//! Cycle timing and smoothed performance figures.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Running average over the most recent integer samples.
#[derive(Debug, Clone)]
pub struct MovingAverageFilter {
    samples: VecDeque<i64>,
    capacity: usize,
}

impl Default for MovingAverageFilter {
    fn default() -> Self {
        Self::new(10)
    }
}

impl MovingAverageFilter {
    /// A filter over the last `capacity` samples. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn append(&mut self, value: i64) {
        self.samples.push_back(value);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Mean of the retained samples, truncated toward zero. Zero when empty.
    pub fn average(&self) -> i64 {
        if self.samples.is_empty() {
            return 0;
        }
        // Mean of i64 values always fits back in i64.
        let sum: i128 = self.samples.iter().map(|&v| i128::from(v)).sum();
        (sum / self.samples.len() as i128) as i64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Figures for one completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricSample {
    /// Time spent in the detector or tracker, in milliseconds
    pub inference_ms: i64,
    /// Time from frame acceptance to publish, in milliseconds
    pub execution_ms: i64,
    /// Cycles completed during the trailing fps window
    pub fps: i64,
}

/// Raw figures for the last cycle together with their moving averages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleMetrics {
    pub latest: MetricSample,
    pub average: MetricSample,
}

/// Measures cycles and smooths the results.
#[derive(Debug)]
pub struct PerformanceMeter {
    inference: MovingAverageFilter,
    execution: MovingAverageFilter,
    fps: MovingAverageFilter,
    completions: VecDeque<Instant>,
    fps_window: Duration,
    started: Option<Instant>,
    inference_elapsed: Option<Duration>,
}

impl PerformanceMeter {
    pub fn new(window: usize, fps_window: Duration) -> Self {
        Self {
            inference: MovingAverageFilter::new(window),
            execution: MovingAverageFilter::new(window),
            fps: MovingAverageFilter::new(window),
            completions: VecDeque::new(),
            fps_window,
            started: None,
            inference_elapsed: None,
        }
    }

    /// Mark the start of a cycle.
    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
        self.inference_elapsed = None;
    }

    /// Mark the end of the detect-or-track stage.
    pub fn end_inference(&mut self) {
        self.inference_elapsed = self.started.map(|start| start.elapsed());
    }

    /// Drop an unfinished cycle without recording it.
    pub fn abandon(&mut self) {
        self.started = None;
        self.inference_elapsed = None;
    }

    /// Close the current cycle and fold its figures into the averages.
    pub fn finish(&mut self) -> CycleMetrics {
        let now = Instant::now();
        let execution = self.started.take().map_or(Duration::ZERO, |s| now - s);
        let inference = self.inference_elapsed.take().unwrap_or(execution);

        self.completions.push_back(now);
        while let Some(&oldest) = self.completions.front() {
            if now.duration_since(oldest) > self.fps_window {
                self.completions.pop_front();
            } else {
                break;
            }
        }

        let latest = MetricSample {
            inference_ms: inference.as_millis() as i64,
            execution_ms: execution.as_millis() as i64,
            fps: self.completions.len() as i64,
        };
        self.inference.append(latest.inference_ms);
        self.execution.append(latest.execution_ms);
        self.fps.append(latest.fps);

        CycleMetrics {
            latest,
            average: self.averages(),
        }
    }

    pub fn averages(&self) -> MetricSample {
        MetricSample {
            inference_ms: self.inference.average(),
            execution_ms: self.execution.average(),
            fps: self.fps.average(),
        }
    }
}
