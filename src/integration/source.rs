//! Frame delivery and result observation.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::snapshot::FrameSnapshot;
use crate::frame::Frame;
use crate::metrics::CycleMetrics;

/// Push-style producer of camera frames.
pub trait FrameSource {
    /// Block until the next frame is available. `None` ends the stream.
    fn next_frame(&mut self) -> Option<Frame>;
}

/// Receives every published snapshot together with the cycle's metrics.
///
/// Called on the pipeline's own thread right after publish; implementations
/// should hand work off rather than block.
pub trait Observer: Send {
    fn on_snapshot(&mut self, snapshot: &Arc<FrameSnapshot>, metrics: &CycleMetrics);
}

impl<F> Observer for F
where
    F: FnMut(&Arc<FrameSnapshot>, &CycleMetrics) + Send,
{
    fn on_snapshot(&mut self, snapshot: &Arc<FrameSnapshot>, metrics: &CycleMetrics) {
        self(snapshot, metrics)
    }
}

/// Replays frames at a fixed rate, the way a camera delivers them.
pub struct PacedSource<I> {
    frames: I,
    interval: Duration,
    next_due: Option<Instant>,
}

impl<I: Iterator<Item = Frame>> PacedSource<I> {
    /// Deliver `frames` at `fps`. Rates without a representable interval
    /// (zero, negative, NaN or vanishingly small) disable pacing.
    pub fn new(frames: I, fps: f64) -> Self {
        let interval = if fps > 0.0 {
            Duration::try_from_secs_f64(1.0 / fps).unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        };
        Self {
            frames,
            interval,
            next_due: None,
        }
    }
}

impl<I: Iterator<Item = Frame>> FrameSource for PacedSource<I> {
    fn next_frame(&mut self) -> Option<Frame> {
        let now = Instant::now();
        if let Some(due) = self.next_due {
            if due > now {
                thread::sleep(due - now);
            }
        }
        self.next_due = Some(self.next_due.unwrap_or(now).max(now) + self.interval);
        self.frames.next()
    }
}

/// Frames from an in-memory sequence with no pacing.
pub struct IterSource<I>(pub I);

impl<I: Iterator<Item = Frame>> FrameSource for IterSource<I> {
    fn next_frame(&mut self) -> Option<Frame> {
        self.0.next()
    }
}
