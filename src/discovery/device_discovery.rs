use crate::controller::DeviceLayout;
use crate::discovery::DiscoveryError;
use evdev::{AbsoluteAxisType, Device, Key};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Product id of the ELECOM mouse used as the left hand
pub const DEFAULT_LEFT_PRODUCT: u16 = 0x00fd;

pub const DEFAULT_PAIR_NAME: &str = "ELECOM TrackBall Mouse";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSelector {
    /// Device nodes whose path starts with this are candidates
    pub path_prefix: PathBuf,
    pub name_contains: Option<String>,
    pub grab: bool,
    /// Two devices, one per hand, instead of one
    pub pair: Option<PairSelector>,
}

impl Default for DeviceSelector {
    fn default() -> Self {
        Self {
            path_prefix: PathBuf::from("/dev/input/event"),
            name_contains: None,
            grab: true,
            pair: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairSelector {
    pub left_product: u16,
    /// Applied on top of the device selector's own name filter
    pub name_contains: Option<String>,
}

impl Default for PairSelector {
    fn default() -> Self {
        Self {
            left_product: DEFAULT_LEFT_PRODUCT,
            name_contains: Some(DEFAULT_PAIR_NAME.to_string()),
        }
    }
}

/// Codes a device must advertise before it is picked
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceRequirements {
    pub keys: Vec<Key>,
    pub axes: Vec<AbsoluteAxisType>,
}

impl DeviceRequirements {
    pub fn for_layout(layout: &DeviceLayout) -> Self {
        Self {
            keys: layout.keys().collect(),
            axes: layout.axes().collect(),
        }
    }

    /// What two layouts have in common, for devices that may take either hand
    pub fn shared(left: &DeviceLayout, right: &DeviceLayout) -> Self {
        let right = Self::for_layout(right);
        Self {
            keys: left.keys().filter(|key| right.keys.contains(key)).collect(),
            axes: left.axes().filter(|axis| right.axes.contains(axis)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.axes.is_empty()
    }

    pub fn is_met<K, A>(&self, has_key: K, has_axis: A) -> bool
    where
        K: Fn(Key) -> bool,
        A: Fn(AbsoluteAxisType) -> bool,
    {
        self.keys.iter().all(|key| has_key(*key)) && self.axes.iter().all(|axis| has_axis(*axis))
    }

    pub fn is_met_by(&self, device: &Device) -> bool {
        let keys = device.supported_keys();
        let axes = device.supported_absolute_axes();
        self.is_met(
            |key| keys.is_some_and(|supported| supported.contains(key)),
            |axis| axes.is_some_and(|supported| supported.contains(axis)),
        )
    }
}

pub struct DiscoveredDevice {
    pub path: PathBuf,
    pub device: Device,
}

impl DiscoveredDevice {
    pub fn name(&self) -> &str {
        self.device.name().unwrap_or("unnamed device")
    }

    pub fn product(&self) -> u16 {
        self.device.input_id().product()
    }
}

impl fmt::Debug for DiscoveredDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveredDevice")
            .field("path", &self.path)
            .field("name", &self.name())
            .field("product", &format_args!("{:#06x}", self.product()))
            .finish()
    }
}

#[derive(Debug)]
pub enum AcquiredDevice {
    Single(DiscoveredDevice),
    Pair {
        left: DiscoveredDevice,
        right: DiscoveredDevice,
    },
}

/// Candidate device nodes in sorted order
pub fn candidate_paths(prefix: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let dir = prefix
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let stem = prefix
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let entries = std::fs::read_dir(dir).map_err(|source| DiscoveryError::Enumerate {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| {
            entry
                .inspect_err(|e| debug!("Skipping unreadable entry in {}: {}", dir.display(), e))
                .ok()
        })
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&stem))
        .map(|entry| entry.path())
        .collect();
    paths.sort();

    debug!("{} candidate nodes under {}", paths.len(), dir.display());
    Ok(paths)
}

fn name_matches(name: &str, filter: Option<&str>) -> bool {
    filter.map_or(true, |filter| name.contains(filter))
}

/// Opens every candidate that matches the selector's name filter and
/// advertises everything in `requirements`
///
/// Nodes that cannot be opened as input devices are skipped, except when
/// access is denied.
pub fn discover(
    selector: &DeviceSelector,
    requirements: &DeviceRequirements,
) -> Result<Vec<DiscoveredDevice>, DiscoveryError> {
    let pair_filter = selector
        .pair
        .as_ref()
        .and_then(|pair| pair.name_contains.as_deref());
    let mut found = Vec::new();

    for path in candidate_paths(&selector.path_prefix)? {
        let device = match Device::open(&path) {
            Ok(device) => device,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(DiscoveryError::PermissionDenied(path));
            }
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let discovered = DiscoveredDevice { path, device };
        let name = discovered.name();
        if !name_matches(name, selector.name_contains.as_deref())
            || !name_matches(name, pair_filter)
        {
            debug!("Skipping {:?}, name does not match", discovered);
            continue;
        }
        if !requirements.is_met_by(&discovered.device) {
            debug!("Skipping {:?}, missing codes the layout needs", discovered);
            continue;
        }

        debug!("Candidate {:?}", discovered);
        found.push(discovered);
    }

    Ok(found)
}

/// Picks the device, or the pair of devices, to chord with
pub fn acquire(
    selector: &DeviceSelector,
    requirements: &DeviceRequirements,
) -> Result<AcquiredDevice, DiscoveryError> {
    let mut found = discover(selector, requirements)?.into_iter();

    let Some(pair) = &selector.pair else {
        let device = found.next().ok_or(DiscoveryError::NoValidDevice)?;
        info!("Selected {:?}", device);
        return Ok(AcquiredDevice::Single(device));
    };

    let (Some(first), Some(second)) = (found.next(), found.next()) else {
        return Err(DiscoveryError::NoValidDevice);
    };

    let (left, right) = assign_hands(first, second, pair.left_product);
    info!("Selected left hand {:?}, right hand {:?}", left, right);
    Ok(AcquiredDevice::Pair { left, right })
}

fn assign_hands(
    first: DiscoveredDevice,
    second: DiscoveredDevice,
    left_product: u16,
) -> (DiscoveredDevice, DiscoveredDevice) {
    if first.product() != left_product && second.product() == left_product {
        return (second, first);
    }

    if first.product() != left_product {
        warn!(
            "Neither device has product id {:#06x}, using discovery order",
            left_product
        );
    }
    (first, second)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn advertises(
        keys: &[Key],
        axes: &[AbsoluteAxisType],
    ) -> (HashSet<Key>, Vec<AbsoluteAxisType>) {
        (
            keys.iter().copied().collect(),
            axes.iter().copied().collect(),
        )
    }

    fn met(requirements: &DeviceRequirements, keys: &[Key], axes: &[AbsoluteAxisType]) -> bool {
        let (keys, axes) = advertises(keys, axes);
        requirements.is_met(|key| keys.contains(&key), |axis| axes.contains(&axis))
    }

    #[test]
    fn test_keyboard_does_not_pass_for_steam_controller() {
        let requirements = DeviceRequirements::for_layout(&DeviceLayout::steam_controller());

        let keyboard = [Key::KEY_A, Key::KEY_Q, Key::KEY_ENTER, Key::KEY_POWER];
        assert!(!met(&requirements, &keyboard, &[]));

        let controller_keys: Vec<Key> = DeviceLayout::steam_controller().keys().collect();
        // buttons alone are not enough without the pads
        assert!(!met(
            &requirements,
            &controller_keys,
            &[AbsoluteAxisType::ABS_Z, AbsoluteAxisType::ABS_RZ]
        ));
        let all_axes: Vec<AbsoluteAxisType> = DeviceLayout::steam_controller().axes().collect();
        assert!(met(&requirements, &controller_keys, &all_axes));
    }

    #[test]
    fn test_pair_requires_shared_mouse_buttons() {
        let requirements = DeviceRequirements::shared(
            &DeviceLayout::left_hand_mouse(),
            &DeviceLayout::right_hand_mouse(),
        );
        assert_eq!(requirements.keys, vec![Key::BTN_LEFT, Key::BTN_RIGHT]);
        assert!(requirements.axes.is_empty());

        assert!(met(&requirements, &[Key::BTN_LEFT, Key::BTN_RIGHT, Key::BTN_MIDDLE], &[]));
        assert!(!met(&requirements, &[Key::KEY_A, Key::KEY_LEFTSHIFT], &[]));
    }

    #[test]
    fn test_empty_layout_has_no_requirements() {
        let requirements = DeviceRequirements::for_layout(&DeviceLayout::default());
        assert!(requirements.is_empty());
        assert!(met(&requirements, &[], &[]));
    }

    #[test]
    fn test_name_filters() {
        assert!(name_matches("Valve Software Steam Controller", None));
        assert!(name_matches(
            "ELECOM ELECOM TrackBall Mouse",
            Some(DEFAULT_PAIR_NAME)
        ));
        assert!(!name_matches("AT Translated Set 2 keyboard", Some(DEFAULT_PAIR_NAME)));
    }
}
