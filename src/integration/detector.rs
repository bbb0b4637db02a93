//! Traits for the detection and visual tracking backends.

use crate::frame::Frame;
use crate::tracker::{Detection, Rect};

/// Trait for object detection inference backends.
///
/// Implement this trait to connect any detection model to the pipeline. The
/// detector is the expensive, authoritative stage; an error aborts the current
/// cycle only.
///
/// # Example
///
/// ```ignore
/// use framewatch::{DetectionSource, Detection, Frame};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
///         // Run inference and return normalized detections
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run inference on a frame and return detections in model order.
    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error>;
}

/// Short-horizon visual tracker refining one box from the previous frame to the current one.
pub trait BoxTracker {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Locate the object that occupied `previous` in `previous_frame` within `current_frame`.
    ///
    /// # Returns
    /// `Ok(Some(bbox))` with the refined normalized box, `Ok(None)` when the object
    /// was lost, or an error when the tracker itself failed.
    fn track(
        &mut self,
        previous: &Rect,
        previous_frame: &Frame,
        current_frame: &Frame,
    ) -> Result<Option<Rect>, Self::Error>;
}

/// Tracker that trusts the last known position.
///
/// Useful when the detector runs every frame and no visual tracker is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct StationaryTracker;

impl BoxTracker for StationaryTracker {
    type Error = std::convert::Infallible;

    fn track(
        &mut self,
        previous: &Rect,
        _previous_frame: &Frame,
        _current_frame: &Frame,
    ) -> Result<Option<Rect>, Self::Error> {
        Ok(Some(*previous))
    }
}
