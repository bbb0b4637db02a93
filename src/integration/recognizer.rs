//! Secondary recognition over tracked regions.

use ndarray::Array3;

use crate::error::RecognitionError;
use crate::tracker::{IdentityId, Rect};

/// Pixels of one tracked object cut from the current frame.
#[derive(Debug, Clone)]
pub struct Region {
    pub identity: IdentityId,
    /// Normalized box the pixels were cropped from
    pub bbox: Rect,
    /// `(height, width, channels)` pixel data
    pub pixels: Array3<u8>,
}

/// Text recognition backend. Called concurrently from the enrichment workers.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, region: &Region) -> Result<String, RecognitionError>;
}

impl<F> Recognizer for F
where
    F: Fn(&Region) -> Result<String, RecognitionError> + Send + Sync,
{
    fn recognize(&self, region: &Region) -> Result<String, RecognitionError> {
        self(region)
    }
}
