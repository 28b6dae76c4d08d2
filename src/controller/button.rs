//! Abstract button identities and transitions
//!
//! Every input family (digital keys, analog triggers, directional pads, paired
//! mice) reports into this shared namespace, so the chord machinery never sees a
//! hardware scan code.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One physical control, independent of the device that reports it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Button {
    South,
    East,
    North,
    West,
    LeftBumper,
    RightBumper,
    LeftTrigger,
    RightTrigger,
    LeftThumb,
    RightThumb,
    Select,
    Start,
    Mode,
    LeftPadNorth,
    LeftPadEast,
    LeftPadSouth,
    LeftPadWest,
    RightPadNorth,
    RightPadEast,
    RightPadSouth,
    RightPadWest,
    // Paired devices, one per hand
    LeftHandPrimary,
    LeftHandSecondary,
    RightHandPrimary,
    RightHandSecondary,
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ButtonState {
    Down,
    Up,
    Hold,
}

impl ButtonState {
    /// Interprets the value of a kernel key event (0 = release, 1 = press, 2 = autorepeat)
    pub fn from_key_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(ButtonState::Up),
            1 => Some(ButtonState::Down),
            2 => Some(ButtonState::Hold),
            _ => None,
        }
    }
}

/// A single observed transition of one button
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: Button,
    pub state: ButtonState,
}

impl ButtonEvent {
    pub fn new(button: Button, state: ButtonState) -> Self {
        Self { button, state }
    }

    pub fn down(button: Button) -> Self {
        Self::new(button, ButtonState::Down)
    }

    pub fn up(button: Button) -> Self {
        Self::new(button, ButtonState::Up)
    }

    pub fn hold(button: Button) -> Self {
        Self::new(button, ButtonState::Hold)
    }
}

impl fmt::Display for ButtonEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.button, self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_values_map_to_states() {
        assert_eq!(ButtonState::from_key_value(0), Some(ButtonState::Up));
        assert_eq!(ButtonState::from_key_value(1), Some(ButtonState::Down));
        assert_eq!(ButtonState::from_key_value(2), Some(ButtonState::Hold));
        assert_eq!(ButtonState::from_key_value(7), None);
    }

    #[test]
    fn test_button_names_round_trip_through_serde() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            button: Button,
        }

        let parsed: Wrapper = toml::from_str(r#"button = "LeftPadWest""#).unwrap();
        assert_eq!(parsed.button, Button::LeftPadWest);
        assert_eq!(parsed.button.to_string(), "LeftPadWest");
    }
}
