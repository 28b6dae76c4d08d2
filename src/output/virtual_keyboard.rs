use crate::chord::{KeyStroke, OutputEvent};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key};
use std::io;
use std::time::Duration;
use tracing::{debug, info};

const KEY_RELEASE: i32 = 0;
const KEY_PRESS: i32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to create virtual keyboard: {0}")]
    Create(#[source] io::Error),

    #[error("Failed to emit {key:?}: {source}")]
    Emit {
        key: Key,
        #[source]
        source: io::Error,
    },
}

/// Something keys can be pressed on
pub trait KeySink: Send + 'static {
    fn press(&mut self, key: Key) -> Result<(), OutputError>;
    fn release(&mut self, key: Key) -> Result<(), OutputError>;
}

/// uinput keyboard advertising a fixed set of keys
pub struct UinputKeyboard {
    device: VirtualDevice,
}

impl UinputKeyboard {
    pub fn create(name: &str, keys: &[Key]) -> Result<Self, OutputError> {
        let mut supported = AttributeSet::<Key>::new();
        for key in keys {
            supported.insert(*key);
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(OutputError::Create)?
            .name(name)
            .with_keys(&supported)
            .map_err(OutputError::Create)?
            .build()
            .map_err(OutputError::Create)?;

        info!("Created virtual keyboard '{}' with {} keys", name, keys.len());
        Ok(Self { device })
    }

    fn emit(&mut self, key: Key, value: i32) -> Result<(), OutputError> {
        self.device
            .emit(&[InputEvent::new(EventType::KEY, key.code(), value)])
            .map_err(|source| OutputError::Emit { key, source })
    }
}

impl KeySink for UinputKeyboard {
    fn press(&mut self, key: Key) -> Result<(), OutputError> {
        self.emit(key, KEY_PRESS)
    }

    fn release(&mut self, key: Key) -> Result<(), OutputError> {
        self.emit(key, KEY_RELEASE)
    }
}

/// Plays `event` on `sink`, pausing `settle` between each leaf press and release
pub async fn render<K: KeySink + ?Sized>(
    sink: &mut K,
    event: &OutputEvent,
    settle: Duration,
) -> Result<(), OutputError> {
    debug!("Rendering {}", event);
    for stroke in event.keystrokes() {
        match stroke {
            KeyStroke::Press(key) => sink.press(key)?,
            KeyStroke::Settle => tokio::time::sleep(settle).await,
            KeyStroke::Release(key) => sink.release(key)?,
        }
    }
    Ok(())
}
