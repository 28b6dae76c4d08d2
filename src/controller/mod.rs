//! Input side of the daemon
//!
//! Turns kernel input events into abstract [`ButtonEvent`]s:
//!
//! 1. [`input_classifier`] - raw key / axis events to button transitions
//! 2. [`evdev_source`] - one grabbed kernel device as a [`ButtonSource`]
//! 3. [`merged_source`] - two devices fanned into one stream
//!
//! ```text
//! /dev/input/eventN ──► InputClassifier ──► ButtonEvent ──► pipeline
//!                      (DeviceLayout)
//! ```

pub mod button;
pub mod button_source;
pub mod device_layout;
pub mod evdev_source;
pub mod input_classifier;
pub mod merged_source;

pub use button::{Button, ButtonEvent, ButtonState};
pub use button_source::{ButtonSource, SourceError};
pub use device_layout::{DeviceLayout, KeyBinding, PadBinding, TriggerBinding};
pub use evdev_source::EvdevSource;
pub use input_classifier::{pad_direction, InputClassifier, PadDirection, RawInput};
pub use merged_source::MergedSource;
