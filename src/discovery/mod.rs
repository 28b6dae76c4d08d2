//! Finding input devices to chord with

pub mod backoff;
pub mod device_discovery;

pub use backoff::{retry_with_backoff, BackoffSettings, ExponentialBackoff};
pub use device_discovery::{
    acquire, candidate_paths, discover, AcquiredDevice, DeviceRequirements, DeviceSelector,
    DiscoveredDevice, PairSelector,
};

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Nothing usable right now. Retried with backoff.
    #[error("No valid evdev input device to use for chording")]
    NoValidDevice,

    #[error("Cannot list input devices in {}: {source}", .path.display())]
    Enumerate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied opening {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Device search cancelled")]
    Cancelled,
}

impl DiscoveryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DiscoveryError::NoValidDevice)
    }
}
