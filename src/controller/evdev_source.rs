use crate::controller::{
    ButtonEvent, ButtonSource, DeviceLayout, InputClassifier, RawInput, SourceError,
};
use evdev::{Device, EventStream};
use std::collections::VecDeque;
use tracing::{debug, info};

/// [`ButtonSource`] reading one kernel input device
pub struct EvdevSource {
    name: String,
    stream: Option<EventStream>,
    classifier: InputClassifier,
    // One raw event can release several pad directions at once
    pending: VecDeque<ButtonEvent>,
}

impl EvdevSource {
    /// Takes over `device`, optionally grabbing it so its events stop reaching
    /// the rest of the system
    pub fn open(mut device: Device, layout: &DeviceLayout, grab: bool) -> Result<Self, SourceError> {
        let name = device.name().unwrap_or("unnamed device").to_string();

        if grab {
            device.grab()?;
            info!("Grabbed input device {}", name);
        }

        let stream = device.into_event_stream()?;
        debug!("Opened event stream for {}", name);

        Ok(Self {
            name,
            stream: Some(stream),
            classifier: InputClassifier::new(layout),
            pending: VecDeque::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ButtonSource for EvdevSource {
    async fn read_event(&mut self) -> Result<ButtonEvent, SourceError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(event);
            }

            let stream = self.stream.as_mut().ok_or(SourceError::Closed)?;
            let raw = RawInput::from(stream.next_event().await?);
            self.pending.extend(self.classifier.classify(raw)?);
        }
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            info!("Closed input device {}", self.name);
        } else {
            debug!("Input device {} already closed", self.name);
        }
        self.pending.clear();
    }
}
