//! One button stream fed by two devices, one per hand

use crate::controller::{ButtonEvent, ButtonSource, SourceError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type Message = Result<ButtonEvent, SourceError>;

/// Fans two [`ButtonSource`]s into one
///
/// Each inner source is read on its own task. Events of one device keep their
/// order; the interleaving between devices is whatever arrives first.
pub struct MergedSource {
    receiver: mpsc::Receiver<Message>,
    cancel: CancellationToken,
}

impl MergedSource {
    pub fn spawn<L, R>(left: L, right: R) -> Self
    where
        L: ButtonSource,
        R: ButtonSource,
    {
        let (sender, receiver) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        tokio::spawn(produce("left", left, sender.clone(), cancel.clone()));
        tokio::spawn(produce("right", right, sender, cancel.clone()));
        info!("Merged source started with two producers");

        Self { receiver, cancel }
    }
}

impl ButtonSource for MergedSource {
    async fn read_event(&mut self) -> Result<ButtonEvent, SourceError> {
        self.receiver.recv().await.unwrap_or(Err(SourceError::Closed))
    }

    fn close(&mut self) {
        self.cancel.cancel();
        self.receiver.close();
    }
}

impl Drop for MergedSource {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn produce<S: ButtonSource>(
    side: &'static str,
    mut source: S,
    sender: mpsc::Sender<Message>,
    cancel: CancellationToken,
) {
    debug!("Producer {} running", side);

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = source.read_event() => result,
        };

        let fatal = matches!(&result, Err(e) if !e.is_unbound());
        if fatal {
            warn!("Producer {} stopping after error", side);
        }

        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = sender.send(result) => sent,
        };
        if sent.is_err() || fatal {
            break;
        }
    }

    source.close();
    debug!("Producer {} finished", side);
}
