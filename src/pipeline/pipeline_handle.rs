//! Wiring of the three pipeline stages
//!
//! ```text
//! ButtonSource ──► read ──► transform ──► output ──► KeySink
//!                  (events)  (models)     (chords)
//! ```
//!
//! Stages are joined by capacity-1 channels so a slow keyboard stalls the
//! reader instead of queueing chords, and share one cancellation scope.

use crate::chord::{ChordInputMapping, ChordMachine, ChordOutputMapping};
use crate::controller::{ButtonSource, SourceError};
use crate::output::{KeySink, OutputError};
use crate::pipeline::{
    run_output_stage, run_read_stage, run_transform_stage, ErrorSlot, StageError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input device failed or went away. Worth a restart.
    #[error("Input source failed: {0}")]
    Source(#[source] SourceError),

    #[error("Output sink failed: {0}")]
    Output(#[source] OutputError),

    #[error("{stage} stage panicked: {source}")]
    StagePanicked {
        stage: &'static str,
        #[source]
        source: JoinError,
    },
}

impl PipelineError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::Source(_))
    }
}

/// A configured pipeline, runnable once per acquired device
#[derive(Clone, Debug)]
pub struct ChordPipeline {
    input: ChordInputMapping,
    output: Arc<ChordOutputMapping>,
    settle_delay: Duration,
}

impl ChordPipeline {
    pub fn new(
        input: ChordInputMapping,
        output: ChordOutputMapping,
        settle_delay: Duration,
    ) -> Self {
        Self {
            input,
            output: Arc::new(output),
            settle_delay,
        }
    }

    pub fn output_mapping(&self) -> &ChordOutputMapping {
        &self.output
    }

    /// Runs until `shutdown` fires or a stage fails
    ///
    /// Ending by cancellation is `Ok`. Every run starts from an idle chord
    /// model and closes `source` before returning.
    pub async fn run<S, K>(
        &self,
        source: S,
        sink: K,
        shutdown: &CancellationToken,
    ) -> Result<(), PipelineError>
    where
        S: ButtonSource,
        K: KeySink,
    {
        let scope = shutdown.child_token();
        let (event_sender, event_receiver) = mpsc::channel(1);
        let (model_sender, model_receiver) = mpsc::channel(1);

        let read_slot = ErrorSlot::new("read");
        let transform_slot = ErrorSlot::new("transform");
        let output_slot = ErrorSlot::new("output");

        info!("Starting chord pipeline");

        let read = tokio::spawn(run_read_stage(
            source,
            event_sender,
            scope.clone(),
            read_slot.clone(),
        ));
        let transform = tokio::spawn(run_transform_stage(
            ChordMachine::new(self.input.clone()),
            event_receiver,
            model_sender,
            scope.clone(),
            read_slot.clone(),
            transform_slot.clone(),
        ));
        let output = tokio::spawn(run_output_stage(
            sink,
            self.output.clone(),
            self.settle_delay,
            model_receiver,
            scope.clone(),
            transform_slot.clone(),
            output_slot.clone(),
        ));

        let (read, transform, output) = tokio::join!(read, transform, output);

        for (stage, joined) in [("read", read), ("transform", transform), ("output", output)] {
            if let Err(source) = joined {
                error!("{} stage did not finish cleanly: {}", stage, source);
                return Err(PipelineError::StagePanicked { stage, source });
            }
        }

        let read_outcome = read_slot.take();
        drop(transform_slot);
        let output_outcome = output_slot.take();
        debug!(
            "Pipeline stopped, read: {:?}, output: {:?}",
            read_outcome, output_outcome
        );

        if let Some(StageError::Output(e)) = output_outcome {
            return Err(PipelineError::Output(e));
        }
        if let Some(StageError::Source(e)) = read_outcome {
            return Err(PipelineError::Source(e));
        }

        info!("Chord pipeline stopped");
        Ok(())
    }
}
