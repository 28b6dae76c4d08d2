use crate::controller::SourceError;
use crate::output::OutputError;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Why a stage stopped
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The shared scope was cancelled. Expected, not a failure.
    #[error("Stage cancelled")]
    Cancelled,

    #[error("Source failed: {0}")]
    Source(#[from] SourceError),

    #[error("Output failed: {0}")]
    Output(#[from] OutputError),

    #[error("Downstream stage closed its channel")]
    DownstreamClosed,
}

impl StageError {
    pub fn is_failure(&self) -> bool {
        !matches!(self, StageError::Cancelled)
    }
}

/// Sticky outcome of one stage, first write wins
///
/// The owning stage records into it; the stage downstream keeps a clone to
/// look at once its input channel has closed.
#[derive(Clone, Debug)]
pub struct ErrorSlot {
    stage: &'static str,
    error: Arc<OnceLock<StageError>>,
}

impl ErrorSlot {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            error: Arc::new(OnceLock::new()),
        }
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    /// Stores `error` unless the slot already holds one
    pub fn record(&self, error: StageError) {
        if let Err(ignored) = self.error.set(error) {
            debug!(
                "{} stage already finished, dropping later outcome: {}",
                self.stage, ignored
            );
        }
    }

    pub fn get(&self) -> Option<&StageError> {
        self.error.get()
    }

    /// Takes the recorded outcome once every other handle is gone
    pub fn take(self) -> Option<StageError> {
        match Arc::try_unwrap(self.error) {
            Ok(cell) => cell.into_inner(),
            Err(shared) => {
                warn!("{} stage outcome still shared, leaving it in place", self.stage);
                drop(shared);
                None
            }
        }
    }
}

/// Logs why an input channel closed, judged by the upstream stage's outcome
///
/// Returns true when the upstream stage really failed.
pub fn report_upstream_closure(stage: &'static str, upstream: &ErrorSlot) -> bool {
    match upstream.get() {
        Some(error) if error.is_failure() => {
            warn!(
                "{} stage input closed, {} stage failed: {}",
                stage,
                upstream.stage(),
                error
            );
            true
        }
        _ => {
            debug!("{} stage input closed", stage);
            false
        }
    }
}
