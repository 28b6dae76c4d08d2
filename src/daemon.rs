//! Discovery → pipeline restart loop
//!
//! ```text
//!        acquire()            run_pipeline()
//! Searching ────────► Linked ────────────────► Searching ...
//!     │                  │
//!     └─ cancelled       └─ output failure (fatal)
//! ```

use crate::config::{ChordpadConfig, ConfigError};
use crate::controller::{DeviceLayout, EvdevSource, MergedSource, SourceError};
use crate::discovery::{
    acquire, retry_with_backoff, AcquiredDevice, DeviceRequirements, DiscoveredDevice,
    DiscoveryError, ExponentialBackoff,
};
use crate::output::{OutputError, UinputKeyboard};
use crate::pipeline::{ChordPipeline, PipelineError};
use statum::{machine, state};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Device discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Virtual keyboard error: {0}")]
    Output(#[from] OutputError),

    #[error("Pipeline failed: {0}")]
    Pipeline(#[from] PipelineError),
}

#[state]
#[derive(Debug, Clone)]
pub enum DaemonState {
    Searching,
    Linked,
}

#[machine]
pub struct ChordDaemon<S: DaemonState> {
    config: ChordpadConfig,
    pipeline: ChordPipeline,
    backoff: ExponentialBackoff,
    requirements: DeviceRequirements,
    shutdown: CancellationToken,
    // Set while Linked
    device: Option<AcquiredDevice>,
    cycles: u64,
}

impl<S: DaemonState> ChordDaemon<S> {
    /// Completed discovery → pipeline cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

impl ChordDaemon<Searching> {
    pub fn create(config: ChordpadConfig, shutdown: CancellationToken) -> Result<Self, DaemonError> {
        let (input, output) = config.validate()?;
        let pipeline = ChordPipeline::new(input, output, config.settle_delay());
        let backoff = ExponentialBackoff::new(config.backoff.clone());
        let requirements = config.device_requirements();

        debug!(
            "Created daemon with device selector {:?}, requiring {:?}",
            config.device, requirements
        );
        Ok(Self::new(
            config,
            pipeline,
            backoff,
            requirements,
            shutdown,
            None,
            0,
        ))
    }

    /// Waits until a usable device shows up
    pub async fn acquire(mut self) -> Result<ChordDaemon<Linked>, DaemonError> {
        info!("Searching for input device");
        let selector = &self.config.device;
        let requirements = &self.requirements;
        let device = retry_with_backoff(&mut self.backoff, &self.shutdown, || {
            acquire(selector, requirements)
        })
        .await?;

        self.device = Some(device);
        Ok(self.transition())
    }
}

impl ChordDaemon<Linked> {
    /// Runs one pipeline on the acquired device
    ///
    /// Device-level failures go back to searching. Output failures are fatal.
    pub async fn run_pipeline(mut self) -> Result<ChordDaemon<Searching>, DaemonError> {
        self.cycles += 1;

        let keyboard = UinputKeyboard::create(
            &self.config.output.name,
            &self.pipeline.output_mapping().keys(),
        )?;

        let result = match self.device.take() {
            Some(AcquiredDevice::Single(found)) => {
                match open_source(found, &self.config.layout, self.config.device.grab) {
                    Ok(source) => self.pipeline.run(source, keyboard, &self.shutdown).await,
                    Err(e) => Err(PipelineError::Source(e)),
                }
            }
            Some(AcquiredDevice::Pair { left, right }) => {
                let grab = self.config.device.grab;
                let opened = open_source(left, &self.config.left_layout, grab).and_then(|left| {
                    open_source(right, &self.config.right_layout, grab).map(|right| (left, right))
                });
                match opened {
                    Ok((left, right)) => {
                        let merged = MergedSource::spawn(left, right);
                        self.pipeline.run(merged, keyboard, &self.shutdown).await
                    }
                    Err(e) => Err(PipelineError::Source(e)),
                }
            }
            None => {
                warn!("Linked without a device, searching again");
                Ok(())
            }
        };

        match result {
            Ok(()) => debug!("Pipeline cycle {} ended", self.cycles),
            Err(e) if !e.is_fatal() => {
                warn!("Device lost in cycle {}: {}, restarting", self.cycles, e);
                self.pause_before_restart().await;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(self.transition())
    }

    async fn pause_before_restart(&mut self) {
        self.backoff.reset();
        let pause = self.backoff.current_interval();
        tokio::select! {
            _ = self.shutdown.cancelled() => {}
            _ = tokio::time::sleep(pause) => {}
        }
    }
}

fn open_source(
    found: DiscoveredDevice,
    layout: &DeviceLayout,
    grab: bool,
) -> Result<EvdevSource, SourceError> {
    let DiscoveredDevice { path, device } = found;
    let source = EvdevSource::open(device, layout, grab)?;
    info!("Reading {} from {}", source.name(), path.display());
    Ok(source)
}

/// Runs the daemon until `shutdown` is cancelled or a fatal error occurs
pub async fn run(config: ChordpadConfig, shutdown: CancellationToken) -> Result<(), DaemonError> {
    let mut daemon = ChordDaemon::create(config, shutdown.clone())?;
    info!("Chordpad daemon started");
    let mut cycles = 0;

    loop {
        let linked = match daemon.acquire().await {
            Ok(linked) => linked,
            Err(DaemonError::Discovery(DiscoveryError::Cancelled)) => break,
            Err(e) => {
                error!("{}", e);
                return Err(e);
            }
        };

        daemon = linked.run_pipeline().await.inspect_err(|e| error!("{}", e))?;
        cycles = daemon.cycles();

        if shutdown.is_cancelled() {
            break;
        }
    }

    info!("Chordpad daemon stopped after {} cycles", cycles);
    Ok(())
}
