//! Raw evdev codes to abstract buttons
//!
//! A layout describes one physical device: which key codes are plain buttons,
//! which absolute axes are analog triggers and which axis pairs form a
//! directional pad.

use crate::config::evdev_name;
use crate::controller::Button;
use evdev::{AbsoluteAxisType, Key};
use serde::{Deserialize, Serialize};

/// Value reported by a fully pulled trigger
pub const DEFAULT_TRIGGER_MAX: i32 = 255;

/// Half of the signed 16-bit axis range
pub const DEFAULT_PAD_DEADZONE: i32 = 5 * i16::MAX as i32 / 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    #[serde(with = "evdev_name")]
    pub key: Key,
    pub button: Button,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerBinding {
    #[serde(with = "evdev_name")]
    pub axis: AbsoluteAxisType,
    pub button: Button,
    #[serde(default = "default_trigger_max")]
    pub max: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadBinding {
    #[serde(with = "evdev_name")]
    pub x_axis: AbsoluteAxisType,
    #[serde(with = "evdev_name")]
    pub y_axis: AbsoluteAxisType,
    pub north: Button,
    pub east: Button,
    pub south: Button,
    pub west: Button,
    #[serde(default = "default_pad_deadzone")]
    pub deadzone: i32,
}

fn default_trigger_max() -> i32 {
    DEFAULT_TRIGGER_MAX
}

fn default_pad_deadzone() -> i32 {
    DEFAULT_PAD_DEADZONE
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceLayout {
    pub buttons: Vec<KeyBinding>,
    pub triggers: Vec<TriggerBinding>,
    pub pads: Vec<PadBinding>,
}

impl DeviceLayout {
    /// Two touch pads, two analog triggers and the face, shoulder and stick buttons
    pub fn steam_controller() -> Self {
        let key = |key, button| KeyBinding { key, button };
        let trigger = |axis, button| TriggerBinding {
            axis,
            button,
            max: DEFAULT_TRIGGER_MAX,
        };

        Self {
            buttons: vec![
                key(Key::BTN_SOUTH, Button::South),
                key(Key::BTN_EAST, Button::East),
                key(Key::BTN_TL, Button::LeftBumper),
                key(Key::BTN_TR, Button::RightBumper),
                key(Key::BTN_THUMBL, Button::LeftThumb),
                key(Key::BTN_THUMBR, Button::RightThumb),
            ],
            triggers: vec![
                trigger(AbsoluteAxisType::ABS_Z, Button::LeftTrigger),
                trigger(AbsoluteAxisType::ABS_RZ, Button::RightTrigger),
            ],
            pads: vec![
                PadBinding {
                    x_axis: AbsoluteAxisType::ABS_HAT0X,
                    y_axis: AbsoluteAxisType::ABS_HAT0Y,
                    north: Button::LeftPadNorth,
                    east: Button::LeftPadEast,
                    south: Button::LeftPadSouth,
                    west: Button::LeftPadWest,
                    deadzone: DEFAULT_PAD_DEADZONE,
                },
                PadBinding {
                    x_axis: AbsoluteAxisType::ABS_RX,
                    y_axis: AbsoluteAxisType::ABS_RY,
                    north: Button::RightPadNorth,
                    east: Button::RightPadEast,
                    south: Button::RightPadSouth,
                    west: Button::RightPadWest,
                    deadzone: DEFAULT_PAD_DEADZONE,
                },
            ],
        }
    }

    pub fn left_hand_mouse() -> Self {
        Self::mouse(Button::LeftHandPrimary, Button::LeftHandSecondary)
    }

    pub fn right_hand_mouse() -> Self {
        Self::mouse(Button::RightHandPrimary, Button::RightHandSecondary)
    }

    fn mouse(primary: Button, secondary: Button) -> Self {
        Self {
            buttons: vec![
                KeyBinding {
                    key: Key::BTN_LEFT,
                    button: primary,
                },
                KeyBinding {
                    key: Key::BTN_RIGHT,
                    button: secondary,
                },
            ],
            triggers: Vec::new(),
            pads: Vec::new(),
        }
    }

    /// Every button this layout can report
    pub fn buttons(&self) -> impl Iterator<Item = Button> + '_ {
        let keys = self.buttons.iter().map(|binding| binding.button);
        let triggers = self.triggers.iter().map(|binding| binding.button);
        let pads = self
            .pads
            .iter()
            .flat_map(|pad| [pad.north, pad.east, pad.south, pad.west]);
        keys.chain(triggers).chain(pads)
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.buttons.iter().map(|binding| binding.key)
    }

    /// Trigger axes and both axes of every pad
    pub fn axes(&self) -> impl Iterator<Item = AbsoluteAxisType> + '_ {
        let triggers = self.triggers.iter().map(|binding| binding.axis);
        let pads = self
            .pads
            .iter()
            .flat_map(|pad| [pad.x_axis, pad.y_axis]);
        triggers.chain(pads)
    }
}
