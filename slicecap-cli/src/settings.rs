//! Persistent capture settings (JSON file in the user config directory).
//!
//! Precedence, lowest first: built-in defaults, settings file, `SLICECAP_*`
//! environment variables, command line flags.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use slicecap_core::{CaptureConfig, OutputChannel, OverflowPolicy};

use crate::cmd::capture::CaptureArgs;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub preferred_input_device: Option<String>,
    pub sample_rate: u32,
    pub period_frames: u32,
    pub slices_per_second: u32,
    pub output_channel: String,
    pub overflow_policy: String,
    pub poll_interval_ms: u64,
    pub wav_path: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        let core = CaptureConfig::default();
        Self {
            preferred_input_device: None,
            sample_rate: core.sample_rate,
            period_frames: core.period_frames,
            slices_per_second: core.slices_per_second,
            output_channel: "right".into(),
            overflow_policy: "continue".into(),
            poll_interval_ms: core.poll_interval_ms,
            wav_path: None,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.sample_rate = self.sample_rate.clamp(8_000, 384_000);
        self.period_frames = self.period_frames.clamp(16, 16_384);
        self.slices_per_second = self.slices_per_second.clamp(1, 1_000);
        self.poll_interval_ms = self.poll_interval_ms.clamp(1, 100);
        self.output_channel = normalize_output_channel(&self.output_channel);
        self.overflow_policy = normalize_overflow_policy(&self.overflow_policy);
        self.preferred_input_device = self
            .preferred_input_device
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.wav_path = self
            .wav_path
            .take()
            .filter(|p| !p.as_os_str().is_empty());
    }

    /// Overlay `SLICECAP_*` variables resolved through `lookup`. Values that
    /// do not parse are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("SLICECAP_DEVICE") {
            self.preferred_input_device = Some(v);
        }
        if let Some(v) = lookup("SLICECAP_SAMPLE_RATE").and_then(|v| v.trim().parse().ok()) {
            self.sample_rate = v;
        }
        if let Some(v) = lookup("SLICECAP_PERIOD_FRAMES").and_then(|v| v.trim().parse().ok()) {
            self.period_frames = v;
        }
        if let Some(v) = lookup("SLICECAP_SLICES_PER_SECOND").and_then(|v| v.trim().parse().ok())
        {
            self.slices_per_second = v;
        }
        if let Some(v) = lookup("SLICECAP_OUTPUT_CHANNEL") {
            self.output_channel = v;
        }
        if let Some(v) = lookup("SLICECAP_OVERFLOW_POLICY") {
            self.overflow_policy = v;
        }
        if let Some(v) = lookup("SLICECAP_POLL_MS").and_then(|v| v.trim().parse().ok()) {
            self.poll_interval_ms = v;
        }
        if let Some(v) = lookup("SLICECAP_WAV") {
            self.wav_path = Some(PathBuf::from(v));
        }
        self.normalize();
    }

    /// Overlay flags given on the command line.
    pub fn apply_args(&mut self, args: &CaptureArgs) {
        if let Some(device) = &args.device {
            self.preferred_input_device = Some(device.clone());
        }
        if let Some(rate) = args.rate {
            self.sample_rate = rate;
        }
        if let Some(period) = args.period {
            self.period_frames = period;
        }
        if let Some(sps) = args.slices_per_second {
            self.slices_per_second = sps;
        }
        if let Some(channel) = &args.channel {
            self.output_channel = channel.clone();
        }
        if let Some(policy) = &args.on_overflow {
            self.overflow_policy = policy.clone();
        }
        if let Some(poll) = args.poll_ms {
            self.poll_interval_ms = poll;
        }
        if let Some(wav) = &args.wav {
            self.wav_path = Some(wav.clone());
        }
        self.normalize();
    }

    pub fn capture_config(&self, max_slices: Option<usize>) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.sample_rate,
            period_frames: self.period_frames,
            slices_per_second: self.slices_per_second,
            output_channel: OutputChannel::parse(&self.output_channel).unwrap_or_default(),
            overflow_policy: OverflowPolicy::parse(&self.overflow_policy).unwrap_or_default(),
            poll_interval_ms: self.poll_interval_ms,
            preferred_input_device: self.preferred_input_device.clone(),
            max_slices,
        }
    }
}

pub fn normalize_output_channel(raw: &str) -> String {
    match OutputChannel::parse(raw) {
        Some(OutputChannel::Left) => "left".into(),
        Some(OutputChannel::Both) => "both".into(),
        _ => "right".into(),
    }
}

pub fn normalize_overflow_policy(raw: &str) -> String {
    match OverflowPolicy::parse(raw) {
        Some(OverflowPolicy::Stop) => "stop".into(),
        _ => "continue".into(),
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slicecap")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".config")
            })
            .join("slicecap")
            .join("settings.json")
    }
}

/// Missing or unreadable files yield defaults.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_core_config() {
        let config = AppSettings::default().capture_config(None);
        assert_eq!(config, CaptureConfig::default());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(&dir.path().join("nope.json"));
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = AppSettings {
            sample_rate: 48_000,
            output_channel: "both".into(),
            preferred_input_device: Some("UR12".into()),
            ..AppSettings::default()
        };
        settings.normalize();
        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(&path), settings);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"sampleRate\": 48000"), "{raw}");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"slicesPerSecond": 20, "outputChannel": "L"}"#).unwrap();
        let settings = load_settings(&path);
        assert_eq!(settings.slices_per_second, 20);
        assert_eq!(settings.output_channel, "left");
        assert_eq!(settings.sample_rate, 192_000);
    }

    #[test]
    fn normalize_clamps_and_trims() {
        let mut settings = AppSettings {
            sample_rate: 1,
            period_frames: 1_000_000,
            poll_interval_ms: 0,
            output_channel: "sideways".into(),
            overflow_policy: "ABORT".into(),
            preferred_input_device: Some("   ".into()),
            ..AppSettings::default()
        };
        settings.normalize();
        assert_eq!(settings.sample_rate, 8_000);
        assert_eq!(settings.period_frames, 16_384);
        assert_eq!(settings.poll_interval_ms, 1);
        assert_eq!(settings.output_channel, "right");
        assert_eq!(settings.overflow_policy, "stop");
        assert_eq!(settings.preferred_input_device, None);
    }

    #[test]
    fn env_overrides_apply_and_ignore_garbage() {
        let env: HashMap<&str, &str> = [
            ("SLICECAP_SAMPLE_RATE", "96000"),
            ("SLICECAP_PERIOD_FRAMES", "lots"),
            ("SLICECAP_OUTPUT_CHANNEL", "both"),
            ("SLICECAP_OVERFLOW_POLICY", "stop"),
        ]
        .into_iter()
        .collect();
        let mut settings = AppSettings::default();
        settings.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(settings.sample_rate, 96_000);
        assert_eq!(settings.period_frames, 2_048);

        let config = settings.capture_config(Some(3));
        assert_eq!(config.output_channel, OutputChannel::Both);
        assert_eq!(config.overflow_policy, OverflowPolicy::Stop);
        assert_eq!(config.max_slices, Some(3));
        assert_eq!(config.slice_frames(), 9_600);
    }

    #[test]
    fn flags_override_everything() {
        let mut settings = AppSettings {
            sample_rate: 44_100,
            ..AppSettings::default()
        };
        let args = CaptureArgs {
            rate: Some(48_000),
            channel: Some("left".into()),
            wav: Some(PathBuf::from("out.wav")),
            ..CaptureArgs::default()
        };
        settings.apply_args(&args);
        assert_eq!(settings.sample_rate, 48_000);
        assert_eq!(settings.output_channel, "left");
        assert_eq!(settings.wav_path, Some(PathBuf::from("out.wav")));
    }
}
