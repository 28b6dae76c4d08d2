use crate::controller::ButtonEvent;
use std::future::Future;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A raw code with no button in the device layout. Never ends the stream.
    #[error("Unbound input: {0}")]
    UnboundInput(String),

    #[error("Device I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Source closed")]
    Closed,
}

impl SourceError {
    pub fn is_unbound(&self) -> bool {
        matches!(self, SourceError::UnboundInput(_))
    }
}

/// Stream of abstract button transitions from one input family
///
/// Implementations turn whatever the hardware reports into [`ButtonEvent`]s.
/// An unbound raw code is reported as [`SourceError::UnboundInput`] and the
/// caller may keep reading; any other error ends the stream.
pub trait ButtonSource: Send + 'static {
    fn read_event(&mut self) -> impl Future<Output = Result<ButtonEvent, SourceError>> + Send;

    /// Releases the device. A pending or later read returns [`SourceError::Closed`].
    fn close(&mut self);
}
