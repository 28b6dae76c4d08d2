use crate::chord::{ChordMachine, ChordModel};
use crate::controller::ButtonEvent;
use crate::pipeline::{report_upstream_closure, ErrorSlot, StageError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Applies button events to the chord machine in arrival order and forwards
/// each model that differs from the previous one
pub async fn run_transform_stage(
    mut machine: ChordMachine,
    mut receiver: mpsc::Receiver<ButtonEvent>,
    sender: mpsc::Sender<ChordModel>,
    scope: CancellationToken,
    upstream: ErrorSlot,
    slot: ErrorSlot,
) {
    info!("Transform stage started");

    loop {
        let received = tokio::select! {
            biased;
            _ = scope.cancelled() => {
                slot.record(StageError::Cancelled);
                break;
            }
            received = receiver.recv() => received,
        };

        let Some(event) = received else {
            report_upstream_closure(slot.stage(), &upstream);
            break;
        };

        let Some(model) = machine.apply(&event) else {
            continue;
        };

        let sent = tokio::select! {
            biased;
            _ = scope.cancelled() => {
                slot.record(StageError::Cancelled);
                break;
            }
            sent = sender.send(model) => sent,
        };
        if sent.is_err() {
            slot.record(StageError::DownstreamClosed);
            scope.cancel();
            break;
        }
    }

    let model = machine.model();
    if !model.is_idle() {
        debug!(
            "Dropping unfinished chord keys={} build={}",
            model.keys, model.build
        );
    }
    info!("Transform stage finished");
}
