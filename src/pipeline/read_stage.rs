use crate::controller::{ButtonEvent, ButtonSource};
use crate::pipeline::{ErrorSlot, StageError};
use chrono::Local;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const STATS_INTERVAL_SECS: i64 = 30;

/// Reads the source until it fails or the scope is cancelled
///
/// The source is closed on every exit path.
pub async fn run_read_stage<S: ButtonSource>(
    mut source: S,
    sender: mpsc::Sender<ButtonEvent>,
    scope: CancellationToken,
    slot: ErrorSlot,
) {
    info!("Read stage started");

    let mut event_count = 0u64;
    let mut unbound_count = 0u64;
    let mut last_log_time = Local::now();
    let log_interval = chrono::Duration::seconds(STATS_INTERVAL_SECS);

    loop {
        let result = tokio::select! {
            biased;
            _ = scope.cancelled() => {
                slot.record(StageError::Cancelled);
                break;
            }
            result = source.read_event() => result,
        };

        match result {
            Ok(event) => {
                debug!("Read {}", event);
                let sent = tokio::select! {
                    biased;
                    _ = scope.cancelled() => {
                        slot.record(StageError::Cancelled);
                        break;
                    }
                    sent = sender.send(event) => sent,
                };
                if sent.is_err() {
                    slot.record(StageError::DownstreamClosed);
                    scope.cancel();
                    break;
                }
                event_count += 1;
            }
            Err(e) if e.is_unbound() => {
                warn!("{}", e);
                unbound_count += 1;
            }
            Err(e) => {
                error!("Read stage failed: {}", e);
                slot.record(StageError::Source(e));
                scope.cancel();
                break;
            }
        }

        let now = Local::now();
        if now - last_log_time > log_interval {
            info!(
                "Read stage stats: {} events, {} unbound in last {} seconds",
                event_count,
                unbound_count,
                log_interval.num_seconds()
            );
            event_count = 0;
            unbound_count = 0;
            last_log_time = now;
        }
    }

    source.close();
    info!("Read stage finished");
}
