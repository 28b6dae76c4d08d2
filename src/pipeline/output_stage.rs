use crate::chord::{ChordModel, ChordOutputMapping};
use crate::output::{render, KeySink};
use crate::pipeline::{report_upstream_closure, ErrorSlot, StageError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Plays every completed chord on the sink
///
/// Models without a pending chord are skipped. Unbound chords are logged; a
/// sink failure ends the stage and cancels the scope.
pub async fn run_output_stage<K: KeySink>(
    mut sink: K,
    mapping: Arc<ChordOutputMapping>,
    settle_delay: Duration,
    mut receiver: mpsc::Receiver<ChordModel>,
    scope: CancellationToken,
    upstream: ErrorSlot,
    slot: ErrorSlot,
) {
    info!("Output stage started");

    loop {
        let received = tokio::select! {
            biased;
            _ = scope.cancelled() => {
                slot.record(StageError::Cancelled);
                break;
            }
            received = receiver.recv() => received,
        };

        let Some(model) = received else {
            report_upstream_closure(slot.stage(), &upstream);
            break;
        };

        let Some(chord) = model.pending() else {
            continue;
        };

        let event = match mapping.resolve(chord) {
            Ok(event) => event,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        info!("Chord {} -> {}", chord, event);
        if let Err(e) = render(&mut sink, &event, settle_delay).await {
            error!("Output stage failed: {}", e);
            slot.record(StageError::Output(e));
            scope.cancel();
            break;
        }
    }

    info!("Output stage finished");
}
