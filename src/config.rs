//! Daemon configuration
//!
//! Read once at startup from a TOML file. Every section is optional and falls
//! back to the built-in defaults, which describe a Steam Controller typing on
//! its two touch pads.

use crate::chord::{
    Chord, ChordInputMapping, ChordOutputMapping, MappingError, Modifier, OutputEvent,
};
use crate::controller::{Button, DeviceLayout};
use crate::discovery::{BackoffSettings, DeviceRequirements, DeviceSelector};
use evdev::Key;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV: &str = "CHORDPAD_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid mapping: {0}")]
    Mapping(#[from] MappingError),

    #[error("Bit {bit} for {button} is out of range, chords have {} bits", Chord::WIDTH)]
    InvalidBit { button: Button, bit: u8 },

    #[error("Invalid backoff settings: {0:?}")]
    InvalidBackoff(BackoffSettings),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputBinding {
    pub button: Button,
    pub bit: u8,
}

/// A set of buttons pressed together and the key it types
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordBinding {
    pub buttons: Vec<Button>,
    #[serde(with = "evdev_name")]
    pub key: Key,
    #[serde(default)]
    pub shift: bool,
}

/// A button that holds `key` around whatever chord it joins
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierBinding {
    pub button: Button,
    #[serde(with = "evdev_name")]
    pub key: Key,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub name: String,
    pub settle_delay_ms: u64,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            name: "Chordpad Virtual Keyboard".to_string(),
            settle_delay_ms: 50,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChordpadConfig {
    pub device: DeviceSelector,
    /// Layout of a single device
    pub layout: DeviceLayout,
    /// Layouts of the two devices in paired mode
    pub left_layout: DeviceLayout,
    pub right_layout: DeviceLayout,
    pub output: OutputSettings,
    pub backoff: BackoffSettings,
    pub input: Vec<InputBinding>,
    pub chord: Vec<ChordBinding>,
    pub modifier: Vec<ModifierBinding>,
}

impl Default for ChordpadConfig {
    fn default() -> Self {
        Self {
            device: DeviceSelector::default(),
            layout: DeviceLayout::steam_controller(),
            left_layout: DeviceLayout::left_hand_mouse(),
            right_layout: DeviceLayout::right_hand_mouse(),
            output: OutputSettings::default(),
            backoff: BackoffSettings::default(),
            input: default_input_bits(),
            chord: default_chords(),
            modifier: default_modifiers(),
        }
    }
}

impl ChordpadConfig {
    /// `$CHORDPAD_CONFIG`, else `chordpad/config.toml` in the user config dir
    pub fn default_path() -> Option<PathBuf> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Some(PathBuf::from(path)),
            None => dirs::config_dir().map(|dir| dir.join("chordpad").join("config.toml")),
        }
    }

    /// Loads `path`, or the built-in defaults when there is no file
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            info!("No config location available, using built-in defaults");
            return Ok(Self::default());
        };

        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        if !exists {
            info!(
                "No config file at {}, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        debug!(
            "Parsed config with {} inputs, {} chords, {} modifiers",
            config.input.len(),
            config.chord.len(),
            config.modifier.len()
        );
        Ok(config)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.output.settle_delay_ms)
    }

    pub fn input_mapping(&self) -> Result<ChordInputMapping, ConfigError> {
        let bindings = self
            .input
            .iter()
            .map(|binding| {
                Chord::bit(binding.bit)
                    .map(|chord| (binding.button, chord))
                    .ok_or(ConfigError::InvalidBit {
                        button: binding.button,
                        bit: binding.bit,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ChordInputMapping::new(bindings)?)
    }

    pub fn output_mapping(
        &self,
        input: &ChordInputMapping,
    ) -> Result<ChordOutputMapping, ConfigError> {
        let modifiers = self
            .modifier
            .iter()
            .map(|binding| {
                input
                    .chord_for(binding.button)
                    .map(|bit| Modifier {
                        bit,
                        key: binding.key,
                    })
                    .ok_or(MappingError::UnmappedButton(binding.button))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut mapping = ChordOutputMapping::new(modifiers)?;
        for binding in &self.chord {
            let chord = input.chord_of(&binding.buttons)?;
            let event = if binding.shift {
                OutputEvent::shifted(OutputEvent::Press(binding.key))
            } else {
                OutputEvent::Press(binding.key)
            };
            mapping.bind(chord, event)?;
        }

        Ok(mapping)
    }

    /// Checks the whole configuration and builds both chord tables
    pub fn validate(&self) -> Result<(ChordInputMapping, ChordOutputMapping), ConfigError> {
        if !self.backoff.is_valid() {
            return Err(ConfigError::InvalidBackoff(self.backoff.clone()));
        }

        let input = self.input_mapping()?;
        let output = self.output_mapping(&input)?;

        for button in self
            .active_layouts()
            .into_iter()
            .flat_map(|layout| layout.buttons())
        {
            if input.chord_for(button).is_none() {
                warn!("{} is in the device layout but has no chord bit", button);
            }
        }
        if self.device_requirements().is_empty() {
            warn!("Device layout binds nothing, any input device will be picked");
        }

        info!(
            "Configured {} chord inputs and {} chords",
            input.len(),
            output.len()
        );
        Ok((input, output))
    }

    /// Layouts of the devices the daemon reads from
    pub fn active_layouts(&self) -> Vec<&DeviceLayout> {
        if self.device.pair.is_some() {
            vec![&self.left_layout, &self.right_layout]
        } else {
            vec![&self.layout]
        }
    }

    /// Codes a device must advertise to be picked for the active layouts
    pub fn device_requirements(&self) -> DeviceRequirements {
        if self.device.pair.is_some() {
            DeviceRequirements::shared(&self.left_layout, &self.right_layout)
        } else {
            DeviceRequirements::for_layout(&self.layout)
        }
    }
}

fn default_input_bits() -> Vec<InputBinding> {
    use Button::*;

    [
        LeftPadSouth,
        LeftPadEast,
        LeftPadNorth,
        LeftPadWest,
        RightPadSouth,
        RightPadEast,
        RightPadNorth,
        RightPadWest,
        South,
        LeftTrigger,
        LeftBumper,
        LeftThumb,
        RightThumb,
        RightBumper,
        RightTrigger,
        East,
        LeftHandPrimary,
        LeftHandSecondary,
        RightHandPrimary,
        RightHandSecondary,
    ]
    .into_iter()
    .zip(0u8..)
    .map(|(button, bit)| InputBinding { button, bit })
    .collect()
}

fn default_chords() -> Vec<ChordBinding> {
    use Button::*;

    let chord = |buttons: &[Button], key| ChordBinding {
        buttons: buttons.to_vec(),
        key,
        shift: false,
    };

    vec![
        // Letters, typed on the two pads
        chord(&[LeftPadWest], Key::KEY_A),
        chord(&[LeftPadSouth, LeftPadNorth, RightPadEast], Key::KEY_B),
        chord(&[LeftPadNorth, LeftPadWest], Key::KEY_C),
        chord(&[LeftPadEast, LeftPadWest], Key::KEY_D),
        chord(&[LeftPadNorth], Key::KEY_E),
        chord(&[LeftPadSouth, LeftPadNorth], Key::KEY_F),
        chord(&[LeftPadNorth, RightPadEast], Key::KEY_G),
        chord(&[RightPadNorth, RightPadWest], Key::KEY_H),
        chord(&[RightPadNorth], Key::KEY_I),
        chord(&[LeftPadWest, RightPadNorth], Key::KEY_J),
        chord(&[RightPadSouth, RightPadWest], Key::KEY_K),
        chord(&[RightPadSouth, RightPadNorth], Key::KEY_L),
        chord(&[RightPadEast, RightPadWest], Key::KEY_M),
        chord(&[RightPadWest], Key::KEY_N),
        chord(&[RightPadEast], Key::KEY_O),
        chord(&[RightPadSouth], Key::KEY_P),
        chord(&[LeftPadWest, RightPadEast], Key::KEY_Q),
        chord(&[LeftPadEast, LeftPadNorth], Key::KEY_R),
        chord(&[LeftPadSouth], Key::KEY_S),
        chord(&[LeftPadEast], Key::KEY_T),
        chord(&[RightPadEast, RightPadNorth], Key::KEY_U),
        chord(&[LeftPadNorth, RightPadWest], Key::KEY_V),
        chord(&[LeftPadSouth, LeftPadWest], Key::KEY_W),
        chord(
            &[
                LeftPadEast,
                LeftPadNorth,
                LeftPadWest,
                RightPadEast,
                RightPadNorth,
                RightPadWest,
            ],
            Key::KEY_W,
        ),
        chord(&[LeftPadSouth, LeftPadEast], Key::KEY_X),
        chord(&[LeftPadEast, RightPadNorth], Key::KEY_Y),
        chord(&[LeftPadEast, RightPadWest], Key::KEY_Z),
        // Editing keys on the face and stick buttons
        chord(&[South], Key::KEY_SPACE),
        chord(&[East], Key::KEY_BACKSPACE),
        chord(&[RightThumb], Key::KEY_ENTER),
        chord(&[LeftThumb], Key::KEY_TAB),
        chord(&[South, East], Key::KEY_ESC),
        chord(&[East, LeftThumb], Key::KEY_DELETE),
    ]
}

fn default_modifiers() -> Vec<ModifierBinding> {
    [
        (Button::LeftTrigger, Key::KEY_RIGHTSHIFT),
        (Button::RightTrigger, Key::KEY_RIGHTCTRL),
        (Button::LeftBumper, Key::KEY_RIGHTALT),
        (Button::RightBumper, Key::KEY_RIGHTMETA),
    ]
    .into_iter()
    .map(|(button, key)| ModifierBinding { button, key })
    .collect()
}

/// Serde adapter storing evdev codes by their kernel name, e.g. `KEY_Q` or `ABS_HAT0X`
pub mod evdev_name {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::fmt::Debug;
    use std::str::FromStr;

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Debug,
        S: Serializer,
    {
        serializer.collect_str(&format_args!("{:?}", value))
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse()
            .map_err(|_| D::Error::custom(format!("unknown evdev name '{}'", name)))
    }
}
