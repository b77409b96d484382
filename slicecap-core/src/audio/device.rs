//! Audio input device enumeration.

use serde::{Deserialize, Serialize};

/// Metadata about an audio input device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Human-readable device name reported by the OS.
    pub name: String,
    /// Whether this is the system default input device.
    pub is_default: bool,
    /// Sample rate of the device's default input configuration (Hz).
    pub default_sample_rate: Option<u32>,
    /// Span of sample rates (min, max) offering stereo integer input.
    pub stereo_integer_rates: Option<(u32, u32)>,
}

impl DeviceInfo {
    /// Whether the device can open a stereo integer stream at `sample_rate`.
    pub fn supports_rate(&self, sample_rate: u32) -> bool {
        self.stereo_integer_rates
            .is_some_and(|(lo, hi)| lo <= sample_rate && sample_rate <= hi)
    }
}

/// Order devices for display: default first, then by name.
pub fn sort_for_display(devices: &mut [DeviceInfo]) {
    devices.sort_by_key(|d| (!d.is_default, d.name.to_ascii_lowercase()));
}

/// List all available audio input devices on the system.
///
/// Returns an empty `Vec` if cpal is not available or no devices exist.
#[cfg(feature = "audio-cpal")]
pub fn list_input_devices() -> Vec<DeviceInfo> {
    use cpal::{
        traits::{DeviceTrait, HostTrait},
        SampleFormat,
    };

    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices = match host.input_devices() {
        Ok(devices) => devices,
        Err(e) => {
            tracing::warn!("failed to enumerate input devices: {e}");
            return vec![];
        }
    };

    let mut list = devices
        .enumerate()
        .map(|(idx, device)| {
            let name = device
                .name()
                .unwrap_or_else(|_| format!("Input Device {}", idx + 1));
            let is_default = default_name.as_deref() == Some(name.as_str());
            let default_sample_rate = device
                .default_input_config()
                .ok()
                .map(|c| c.sample_rate().0);
            let stereo_integer_rates = device
                .supported_input_configs()
                .ok()
                .into_iter()
                .flatten()
                .filter(|r| {
                    r.channels() == 2
                        && matches!(r.sample_format(), SampleFormat::I32 | SampleFormat::I16)
                })
                .map(|r| (r.min_sample_rate().0, r.max_sample_rate().0))
                .reduce(|(lo_a, hi_a), (lo_b, hi_b)| (lo_a.min(lo_b), hi_a.max(hi_b)));
            DeviceInfo {
                name,
                is_default,
                default_sample_rate,
                stereo_integer_rates,
            }
        })
        .collect::<Vec<_>>();

    sort_for_display(&mut list);
    list
}

#[cfg(not(feature = "audio-cpal"))]
pub fn list_input_devices() -> Vec<DeviceInfo> {
    vec![]
}
