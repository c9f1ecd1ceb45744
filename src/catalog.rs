//! Device catalog: enumeration and name resolution for audio endpoints.
//!
//! The catalog is a snapshot of the host audio subsystem taken at enumeration
//! time. Descriptors go stale if hardware changes; the engine re-enumerates at
//! every session start rather than trusting a cached snapshot.

use cpal::traits::{DeviceTrait, HostTrait};

use crate::EngineError;

/// Whether a device is being considered for capture or playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Capture (microphone) side.
    Input,
    /// Playback (speaker) side.
    Output,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// Immutable snapshot of one audio device at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Position of the device in host enumeration order.
    pub index: usize,
    /// Display name reported by the host.
    pub name: String,
    /// Maximum capture channels (0 = not an input device).
    pub max_input_channels: u16,
    /// Maximum playback channels (0 = not an output device).
    pub max_output_channels: u16,
}

impl DeviceDescriptor {
    /// Returns the channel count relevant to `direction`.
    pub fn channels(&self, direction: Direction) -> u16 {
        match direction {
            Direction::Input => self.max_input_channels,
            Direction::Output => self.max_output_channels,
        }
    }

    /// Returns `true` if the device can serve the given direction.
    pub fn supports(&self, direction: Direction) -> bool {
        self.channels(direction) > 0
    }
}

/// The endpoints chosen for one session, after name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPair {
    /// Enumeration index of the capture endpoint.
    pub input: usize,
    /// Enumeration index of the playback endpoint.
    pub output: usize,
    /// `true` if either requested name failed to resolve and the first-valid
    /// fallback was applied to *both* endpoints.
    pub fell_back: bool,
}

/// A snapshot of the devices the host exposed at one point in time.
///
/// Construct with [`DeviceCatalog::enumerate()`] against real hardware, or
/// [`DeviceCatalog::from_descriptors()`] for tests and tooling. Resolution is
/// pure over the snapshot, so both paths behave identically.
#[derive(Debug, Clone)]
pub struct DeviceCatalog {
    devices: Vec<DeviceDescriptor>,
}

impl DeviceCatalog {
    /// Queries the host audio subsystem for all devices.
    ///
    /// Reflects the state of the subsystem at call time; nothing is cached
    /// across calls.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DeviceEnumeration`] if the host cannot be
    /// queried. Enumeration failure is fatal to the calling operation and is
    /// not retried internally.
    pub fn enumerate() -> Result<Self, EngineError> {
        let host = cpal::default_host();
        let devices = host
            .devices()
            .map_err(|e| EngineError::DeviceEnumeration {
                reason: e.to_string(),
            })?;

        let devices = devices
            .enumerate()
            .map(|(index, device)| {
                let name = device.name().unwrap_or_else(|_| "unknown".to_string());
                DeviceDescriptor {
                    index,
                    name,
                    max_input_channels: max_channels(
                        device
                            .supported_input_configs()
                            .map(|configs| configs.map(|c| c.channels())),
                    ),
                    max_output_channels: max_channels(
                        device
                            .supported_output_configs()
                            .map(|configs| configs.map(|c| c.channels())),
                    ),
                }
            })
            .collect();

        Ok(Self { devices })
    }

    /// Builds a catalog from pre-made descriptors.
    ///
    /// Used by tests and by tooling that persists device lists.
    pub fn from_descriptors(devices: Vec<DeviceDescriptor>) -> Self {
        Self { devices }
    }

    /// All devices in enumeration order.
    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    /// Devices with capture capability, in enumeration order.
    pub fn inputs(&self) -> impl Iterator<Item = &DeviceDescriptor> {
        self.devices.iter().filter(|d| d.supports(Direction::Input))
    }

    /// Devices with playback capability, in enumeration order.
    pub fn outputs(&self) -> impl Iterator<Item = &DeviceDescriptor> {
        self.devices
            .iter()
            .filter(|d| d.supports(Direction::Output))
    }

    /// Resolves a device by exact display name for the given direction.
    ///
    /// Returns the index of the first descriptor whose name matches exactly
    /// and whose channel count for `direction` is positive. No fuzzy matching,
    /// no normalization.
    pub fn resolve_by_name(&self, name: &str, direction: Direction) -> Option<usize> {
        self.devices
            .iter()
            .find(|d| d.name == name && d.supports(direction))
            .map(|d| d.index)
    }

    /// Returns the first device with a positive channel count for `direction`.
    pub fn first_valid(&self, direction: Direction) -> Option<usize> {
        self.devices
            .iter()
            .find(|d| d.supports(direction))
            .map(|d| d.index)
    }

    /// Resolves both session endpoints by name, with the joint fallback.
    ///
    /// If *either* name fails to resolve, *both* indices are replaced by
    /// [`first_valid`](Self::first_valid) results. This avoids pairing a
    /// validly-resolved endpoint with an unresolved one left over from a
    /// stale UI selection.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoUsableDevice`] when the fallback itself finds
    /// no device for one of the directions.
    pub fn resolve_pair(
        &self,
        input_name: &str,
        output_name: &str,
    ) -> Result<ResolvedPair, EngineError> {
        let input = self.resolve_by_name(input_name, Direction::Input);
        let output = self.resolve_by_name(output_name, Direction::Output);

        match (input, output) {
            (Some(input), Some(output)) => Ok(ResolvedPair {
                input,
                output,
                fell_back: false,
            }),
            _ => Ok(ResolvedPair {
                input: self.first_valid(Direction::Input).ok_or(
                    EngineError::NoUsableDevice {
                        direction: Direction::Input,
                    },
                )?,
                output: self.first_valid(Direction::Output).ok_or(
                    EngineError::NoUsableDevice {
                        direction: Direction::Output,
                    },
                )?,
                fell_back: true,
            }),
        }
    }

    /// Looks up the display name for an enumeration index.
    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.devices
            .iter()
            .find(|d| d.index == index)
            .map(|d| d.name.as_str())
    }
}

/// Collapses a supported-configs query into a single channel count.
/// A device that fails the query simply has no capability in that direction.
fn max_channels<I, E>(configs: Result<I, E>) -> u16
where
    I: Iterator<Item = u16>,
{
    configs.map(|it| it.max().unwrap_or(0)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(index: usize, name: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            index,
            name: name.to_string(),
            max_input_channels: 2,
            max_output_channels: 0,
        }
    }

    fn output(index: usize, name: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            index,
            name: name.to_string(),
            max_input_channels: 0,
            max_output_channels: 2,
        }
    }

    fn catalog() -> DeviceCatalog {
        // Inputs [A, B] and outputs [C, D], interleaved the way hosts
        // typically enumerate mixed-capability devices.
        DeviceCatalog::from_descriptors(vec![
            input(0, "A"),
            input(1, "B"),
            output(2, "C"),
            output(3, "D"),
        ])
    }

    #[test]
    fn test_resolve_both_names() {
        let pair = catalog().resolve_pair("B", "D").unwrap();
        assert_eq!(pair.input, 1);
        assert_eq!(pair.output, 3);
        assert!(!pair.fell_back);
    }

    #[test]
    fn test_joint_fallback_discards_valid_half() {
        // "Z" does not resolve, so "D" is not kept even though it would.
        let pair = catalog().resolve_pair("Z", "D").unwrap();
        assert_eq!(pair.input, 0);
        assert_eq!(pair.output, 2);
        assert!(pair.fell_back);
    }

    #[test]
    fn test_resolve_is_exact_match() {
        let cat = catalog();
        assert_eq!(cat.resolve_by_name("B", Direction::Input), Some(1));
        assert_eq!(cat.resolve_by_name("b", Direction::Input), None);
        assert_eq!(cat.resolve_by_name("B ", Direction::Input), None);
    }

    #[test]
    fn test_resolve_respects_direction() {
        let cat = catalog();
        // "A" exists but has no output channels.
        assert_eq!(cat.resolve_by_name("A", Direction::Output), None);
    }

    #[test]
    fn test_resolve_returns_first_of_duplicate_names() {
        let cat = DeviceCatalog::from_descriptors(vec![
            input(0, "Mic"),
            input(1, "Mic"),
            output(2, "Out"),
        ]);
        assert_eq!(cat.resolve_by_name("Mic", Direction::Input), Some(0));
    }

    #[test]
    fn test_first_valid_order() {
        let cat = catalog();
        assert_eq!(cat.first_valid(Direction::Input), Some(0));
        assert_eq!(cat.first_valid(Direction::Output), Some(2));
    }

    #[test]
    fn test_fallback_with_no_outputs_errors() {
        let cat = DeviceCatalog::from_descriptors(vec![input(0, "A")]);
        let err = cat.resolve_pair("A", "missing").unwrap_err();
        assert!(matches!(
            err,
            EngineError::NoUsableDevice {
                direction: Direction::Output
            }
        ));
    }

    #[test]
    fn test_input_output_views() {
        let cat = catalog();
        let inputs: Vec<_> = cat.inputs().map(|d| d.name.as_str()).collect();
        let outputs: Vec<_> = cat.outputs().map(|d| d.name.as_str()).collect();
        assert_eq!(inputs, vec!["A", "B"]);
        assert_eq!(outputs, vec!["C", "D"]);
    }

    // Hardware enumeration may legitimately return nothing in CI, but the
    // query itself must not panic.
    #[test]
    fn test_enumerate_doesnt_panic() {
        let _ = DeviceCatalog::enumerate();
    }
}
