//! Concurrent recognition fan-out with a join barrier.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use tracing::{debug, warn};

use super::recognizer::{Recognizer, Region};
use crate::error::{PipelineError, RecognitionError, Result};
use crate::tracker::IdentityId;

/// Annotation recorded when recognition produced no text.
pub const UNRECOGNIZED_TEXT: &str = "N/A";

/// Issues one recognition request per region and waits for all of them.
///
/// Requests run on a dedicated worker pool. A failed request yields
/// [`UNRECOGNIZED_TEXT`] without affecting the rest of the batch. With a
/// timeout configured, requests still outstanding at the deadline are
/// cancelled and annotated the same way, so [`dispatch`](Self::dispatch)
/// always returns.
pub struct EnrichmentDispatcher {
    recognizer: Arc<dyn Recognizer>,
    pool: rayon::ThreadPool,
    timeout: Option<Duration>,
}

impl EnrichmentDispatcher {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        workers: usize,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("framewatch-recognize-{i}"))
            .panic_handler(|_| warn!("recognition worker panicked"))
            .build()
            .map_err(|e| PipelineError::Setup(format!("recognition pool: {e}")))?;

        Ok(Self {
            recognizer,
            pool,
            timeout,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Recognize every region and return one annotation per distinct identity.
    pub fn dispatch(&self, regions: Vec<Region>) -> BTreeMap<IdentityId, String> {
        let mut annotations = BTreeMap::new();
        if regions.is_empty() {
            return annotations;
        }

        let deadline = self.timeout.map(|t| Instant::now() + t);
        let cancelled = Arc::new(AtomicBool::new(false));
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut pending = BTreeSet::new();

        for region in regions {
            pending.insert(region.identity);
            let tx = tx.clone();
            let recognizer = Arc::clone(&self.recognizer);
            let cancelled = Arc::clone(&cancelled);
            self.pool.spawn(move || {
                let outcome = if cancelled.load(Ordering::Acquire) {
                    Err(RecognitionError::Cancelled)
                } else {
                    recognizer.recognize(&region)
                };
                // The receiver is gone once the batch deadline has passed.
                let _ = tx.send((region.identity, outcome));
            });
        }
        drop(tx);

        while !pending.is_empty() {
            let received = match deadline {
                Some(deadline) => rx.recv_deadline(deadline),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            let (id, outcome) = match received {
                Ok(message) => message,
                Err(RecvTimeoutError::Timeout) => {
                    cancelled.store(true, Ordering::Release);
                    warn!(outstanding = pending.len(), "recognition batch timed out");
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!(outstanding = pending.len(), "recognition workers exited early");
                    break;
                }
            };
            pending.remove(&id);
            annotations.insert(id, annotation_text(id, outcome));
        }

        for id in pending {
            annotations.insert(id, UNRECOGNIZED_TEXT.to_string());
        }

        annotations
    }
}

fn annotation_text(id: IdentityId, outcome: std::result::Result<String, RecognitionError>) -> String {
    match outcome {
        Ok(text) => text,
        Err(e) => {
            debug!(identity = %id, error = %e, "recognition failed");
            UNRECOGNIZED_TEXT.to_string()
        }
    }
}
