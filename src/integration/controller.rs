//! Single-flight driver for a [`FramePipeline`] fed by a live frame source.
//!
//! Frames are offered from the capture thread. When no cycle is in flight the
//! frame is handed to the worker thread, otherwise it is dropped on the spot;
//! nothing is ever queued behind a running cycle.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Sender, TrySendError};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use tracing::{error, info, warn};

use super::detector::{BoxTracker, DetectionSource};
use super::pipeline::FramePipeline;
use super::snapshot::{FrameSnapshot, SnapshotCell};
use super::source::FrameSource;
use crate::error::{PipelineError, Result};
use crate::frame::Frame;

/// What happened to an offered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    /// A cycle was started for the frame.
    Accepted,
    /// A cycle was already in flight; the frame was discarded.
    Dropped,
}

/// Counters describing the controller's history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub frames_offered: u64,
    pub frames_dropped: u64,
    pub cycles_started: u64,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    /// Highest number of cycles ever observed in flight at once
    pub peak_in_flight: usize,
}

#[derive(Debug, Default)]
struct Counters {
    frames_offered: AtomicU64,
    frames_dropped: AtomicU64,
    cycles_started: AtomicU64,
    cycles_completed: AtomicU64,
    cycles_failed: AtomicU64,
}

/// Binary gate with an in-flight counter.
#[derive(Debug, Default)]
struct Gate {
    busy: Mutex<bool>,
    idle: Condvar,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl Gate {
    /// Take the gate without blocking.
    fn try_acquire(self: &Arc<Self>) -> Option<GateGuard> {
        let mut busy = self.busy.lock();
        if *busy {
            return None;
        }
        *busy = true;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Some(GateGuard {
            gate: Arc::clone(self),
        })
    }

    fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut busy = self.busy.lock();
        while *busy {
            if self.idle.wait_until(&mut busy, deadline).timed_out() {
                return !*busy;
            }
        }
        true
    }
}

/// Holds the gate for one cycle. Dropping it, on success, failure or unwind,
/// reopens the gate.
#[derive(Debug)]
struct GateGuard {
    gate: Arc<Gate>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.gate.in_flight.fetch_sub(1, Ordering::SeqCst);
        let mut busy = self.gate.busy.lock();
        *busy = false;
        self.gate.idle.notify_all();
    }
}

/// Runs a [`FramePipeline`] on a worker thread with single-flight admission.
pub struct PipelineController {
    gate: Arc<Gate>,
    counters: Arc<Counters>,
    snapshots: Arc<SnapshotCell>,
    frames: Option<Sender<(Frame, GateGuard)>>,
    worker: Option<JoinHandle<()>>,
}

impl PipelineController {
    /// Move `pipeline` onto a new worker thread.
    pub fn spawn<D, T>(pipeline: FramePipeline<D, T>) -> Result<Self>
    where
        D: DetectionSource + Send + 'static,
        T: BoxTracker + Send + 'static,
    {
        let gate = Arc::new(Gate::default());
        let counters = Arc::new(Counters::default());
        let snapshots = pipeline.snapshots();
        let (tx, rx) = crossbeam_channel::bounded::<(Frame, GateGuard)>(1);

        let worker_counters = Arc::clone(&counters);
        let worker = thread::Builder::new()
            .name("framewatch-pipeline".into())
            .spawn(move || {
                let mut pipeline = pipeline;
                for (frame, guard) in rx.iter() {
                    run_guarded(&mut pipeline, frame, &worker_counters);
                    drop(guard);
                }
                info!(cycles = pipeline.completed_cycles(), "pipeline worker stopped");
            })
            .map_err(|e| PipelineError::Setup(format!("failed to spawn pipeline worker: {e}")))?;

        info!("pipeline worker started");
        Ok(Self {
            gate,
            counters,
            snapshots,
            frames: Some(tx),
            worker: Some(worker),
        })
    }

    /// Offer a frame. Starts a cycle when idle, otherwise drops the frame.
    pub fn offer(&self, frame: Frame) -> Result<FrameDisposition> {
        let frames = self.frames.as_ref().ok_or(PipelineError::Shutdown)?;
        self.counters.frames_offered.fetch_add(1, Ordering::Relaxed);

        let Some(guard) = self.gate.try_acquire() else {
            self.counters.frames_dropped.fetch_add(1, Ordering::Relaxed);
            return Ok(FrameDisposition::Dropped);
        };

        match frames.try_send((frame, guard)) {
            Ok(()) => Ok(FrameDisposition::Accepted),
            Err(TrySendError::Full(_)) => {
                self.counters.frames_dropped.fetch_add(1, Ordering::Relaxed);
                Ok(FrameDisposition::Dropped)
            }
            Err(TrySendError::Disconnected(_)) => Err(PipelineError::Shutdown),
        }
    }

    /// Offer every frame from `source` until it ends. Returns how many were accepted.
    pub fn drive(&self, source: &mut impl FrameSource) -> Result<u64> {
        let mut accepted = 0;
        while let Some(frame) = source.next_frame() {
            if self.offer(frame)? == FrameDisposition::Accepted {
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    pub fn is_idle(&self) -> bool {
        !*self.gate.busy.lock()
    }

    /// Block until no cycle is in flight. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.gate.wait_idle(timeout)
    }

    pub fn latest(&self) -> Option<Arc<FrameSnapshot>> {
        self.snapshots.latest()
    }

    pub fn snapshots(&self) -> Arc<SnapshotCell> {
        Arc::clone(&self.snapshots)
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            frames_offered: self.counters.frames_offered.load(Ordering::Relaxed),
            frames_dropped: self.counters.frames_dropped.load(Ordering::Relaxed),
            cycles_started: self.counters.cycles_started.load(Ordering::Relaxed),
            cycles_completed: self.counters.cycles_completed.load(Ordering::Relaxed),
            cycles_failed: self.counters.cycles_failed.load(Ordering::Relaxed),
            peak_in_flight: self.gate.peak.load(Ordering::SeqCst),
        }
    }

    /// Stop accepting frames, let the in-flight cycle finish and join the worker.
    pub fn shutdown(mut self) -> Result<PipelineStats> {
        self.stop()?;
        Ok(self.stats())
    }

    fn stop(&mut self) -> Result<()> {
        self.frames.take();
        if let Some(worker) = self.worker.take() {
            worker.join().map_err(|_| PipelineError::WorkerPanicked)?;
        }
        Ok(())
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!(error = %e, "pipeline shutdown failed");
        }
    }
}

fn run_guarded<D, T>(pipeline: &mut FramePipeline<D, T>, frame: Frame, counters: &Counters)
where
    D: DetectionSource,
    T: BoxTracker,
{
    counters.cycles_started.fetch_add(1, Ordering::Relaxed);
    let sequence = frame.sequence;

    match panic::catch_unwind(AssertUnwindSafe(|| pipeline.process_frame(frame))) {
        Ok(Ok(_)) => {
            counters.cycles_completed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Err(e)) => {
            counters.cycles_failed.fetch_add(1, Ordering::Relaxed);
            warn!(frame = sequence, error = %e, "cycle failed");
        }
        Err(_) => {
            counters.cycles_failed.fetch_add(1, Ordering::Relaxed);
            error!(frame = sequence, "cycle panicked");
        }
    }
}
