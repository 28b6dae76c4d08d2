//! Classification of raw evdev traffic into button transitions

use crate::controller::{
    Button, ButtonEvent, ButtonState, DeviceLayout, PadBinding, SourceError, TriggerBinding,
};
use evdev::{EventType, InputEvent, Key};
use std::collections::HashMap;
use tracing::debug;

/// The parts of a kernel input event the classifier looks at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawInput {
    Key { code: u16, value: i32 },
    Absolute { axis: u16, value: i32 },
    Relative { axis: u16, value: i32 },
    Sync,
    Other { kind: u16, code: u16 },
}

impl From<InputEvent> for RawInput {
    fn from(event: InputEvent) -> Self {
        let code = event.code();
        let value = event.value();
        match event.event_type() {
            EventType::KEY => RawInput::Key { code, value },
            EventType::ABSOLUTE => RawInput::Absolute { axis: code, value },
            EventType::RELATIVE => RawInput::Relative { axis: code, value },
            EventType::SYNCHRONIZATION => RawInput::Sync,
            other => RawInput::Other {
                kind: other.0,
                code,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PadDirection {
    North,
    East,
    South,
    West,
}

/// Direction of a pad displacement, `None` inside the deadzone
///
/// A displacement exactly on the deadzone radius counts as outside. When both
/// axes are equally displaced the vertical axis wins.
pub fn pad_direction(x: i32, y: i32, deadzone: i32) -> Option<PadDirection> {
    let square = |v: i32| {
        let v = u64::from(v.unsigned_abs());
        v * v
    };

    let (xx, yy) = (square(x), square(y));
    if xx + yy < square(deadzone) {
        return None;
    }

    if xx > yy {
        if x < 0 {
            Some(PadDirection::West)
        } else {
            Some(PadDirection::East)
        }
    } else if y < 0 {
        Some(PadDirection::South)
    } else {
        Some(PadDirection::North)
    }
}

/// Two-state view of an analog trigger
#[derive(Clone, Debug)]
pub struct AnalogTrigger {
    button: Button,
    max: i32,
    pulled: bool,
}

impl AnalogTrigger {
    pub fn new(binding: &TriggerBinding) -> Self {
        Self {
            button: binding.button,
            max: binding.max,
            pulled: false,
        }
    }

    /// Reports a transition only when the trigger reaches or leaves its maximum
    pub fn update(&mut self, value: i32) -> Option<ButtonEvent> {
        let pulled = value >= self.max;
        if pulled == self.pulled {
            return None;
        }

        self.pulled = pulled;
        if pulled {
            Some(ButtonEvent::down(self.button))
        } else {
            Some(ButtonEvent::up(self.button))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PadAxis {
    X,
    Y,
}

/// A two-axis pad reporting four directional buttons
///
/// Axis values are buffered and classified once per sync frame, so a touch
/// that moves both axes at once is judged as one position. Directions visited
/// while the pad stays displaced are all held, so a slide across the pad forms
/// a chord. Returning inside the deadzone releases them.
#[derive(Clone, Debug)]
pub struct DirectionalPad {
    binding: PadBinding,
    x: i32,
    y: i32,
    // An axis moved since the last frame
    dirty: bool,
    held: Vec<PadDirection>,
}

impl DirectionalPad {
    pub fn new(binding: PadBinding) -> Self {
        Self {
            binding,
            x: 0,
            y: 0,
            dirty: false,
            held: Vec::new(),
        }
    }

    pub fn set_x(&mut self, value: i32) {
        self.x = value;
        self.dirty = true;
    }

    pub fn set_y(&mut self, value: i32) {
        self.y = value;
        self.dirty = true;
    }

    /// Transitions for the position at the end of a frame
    pub fn sync(&mut self) -> Vec<ButtonEvent> {
        if !std::mem::take(&mut self.dirty) {
            return Vec::new();
        }

        let binding = &self.binding;
        match pad_direction(self.x, self.y, binding.deadzone) {
            Some(direction) if self.held.contains(&direction) => Vec::new(),
            Some(direction) => {
                self.held.push(direction);
                vec![ButtonEvent::down(button_for(binding, direction))]
            }
            None => self
                .held
                .drain(..)
                .map(|direction| ButtonEvent::up(button_for(binding, direction)))
                .collect(),
        }
    }
}

fn button_for(binding: &PadBinding, direction: PadDirection) -> Button {
    match direction {
        PadDirection::North => binding.north,
        PadDirection::East => binding.east,
        PadDirection::South => binding.south,
        PadDirection::West => binding.west,
    }
}

/// Turns raw events of one device into button events using its layout
#[derive(Clone, Debug)]
pub struct InputClassifier {
    keys: HashMap<u16, Button>,
    triggers: HashMap<u16, AnalogTrigger>,
    pads: Vec<DirectionalPad>,
    pad_axes: HashMap<u16, (usize, PadAxis)>,
}

impl InputClassifier {
    pub fn new(layout: &DeviceLayout) -> Self {
        let keys = layout
            .buttons
            .iter()
            .map(|binding| (binding.key.code(), binding.button))
            .collect();

        let triggers = layout
            .triggers
            .iter()
            .map(|binding| (binding.axis.0, AnalogTrigger::new(binding)))
            .collect();

        let mut pads = Vec::new();
        let mut pad_axes = HashMap::new();
        for (index, binding) in layout.pads.iter().enumerate() {
            pad_axes.insert(binding.x_axis.0, (index, PadAxis::X));
            pad_axes.insert(binding.y_axis.0, (index, PadAxis::Y));
            pads.push(DirectionalPad::new(binding.clone()));
        }

        Self {
            keys,
            triggers,
            pads,
            pad_axes,
        }
    }

    /// Zero or more button events for one raw event
    pub fn classify(&mut self, raw: RawInput) -> Result<Vec<ButtonEvent>, SourceError> {
        match raw {
            RawInput::Key { code, value } => {
                let Some(button) = self.keys.get(&code).copied() else {
                    return Err(SourceError::UnboundInput(format!("{:?}", Key::new(code))));
                };
                match ButtonState::from_key_value(value) {
                    Some(state) => Ok(vec![ButtonEvent::new(button, state)]),
                    None => {
                        debug!("Ignoring key value {} for {}", value, button);
                        Ok(Vec::new())
                    }
                }
            }
            RawInput::Absolute { axis, value } => {
                if let Some(trigger) = self.triggers.get_mut(&axis) {
                    return Ok(trigger.update(value).into_iter().collect());
                }

                match self.pad_axes.get(&axis).copied() {
                    Some((index, PadAxis::X)) => self.pads[index].set_x(value),
                    Some((index, PadAxis::Y)) => self.pads[index].set_y(value),
                    None => debug!("Ignoring unbound axis {} = {}", axis, value),
                }
                Ok(Vec::new())
            }
            RawInput::Sync => Ok(self.pads.iter_mut().flat_map(DirectionalPad::sync).collect()),
            RawInput::Relative { .. } => Ok(Vec::new()),
            RawInput::Other { kind, code } => {
                debug!("Ignoring event type {} code {}", kind, code);
                Ok(Vec::new())
            }
        }
    }
}
