use anyhow::Error;
use slicecap_core::audio::device::{list_input_devices, DeviceInfo};

use crate::settings::AppSettings;

/// Lists audio input devices
#[derive(clap::Args, Debug)]
pub struct DevicesArgs {
    /// Output format: plain or json
    #[arg(short = 'o', long = "output", default_value = "plain")]
    output: String,
}

pub async fn main(args: DevicesArgs, settings: AppSettings) -> Result<(), Error> {
    let devices = tokio::task::spawn_blocking(list_input_devices).await?;
    print!("{}", render(&devices, &args.output, settings.sample_rate)?);
    Ok(())
}

/// Plain output flags devices that cannot capture at `sample_rate`.
fn render(devices: &[DeviceInfo], format: &str, sample_rate: u32) -> Result<String, Error> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(devices)? + "\n"),
        "plain" => {
            if devices.is_empty() {
                return Ok("No input devices\n".into());
            }
            let mut out = String::new();
            for device in devices {
                let marker = if device.is_default { "*" } else { " " };
                let rates = match device.stereo_integer_rates {
                    Some((lo, hi)) => format!("stereo int {lo}-{hi} Hz"),
                    None => "no stereo integer input".into(),
                };
                let fit = if device.supports_rate(sample_rate) {
                    String::new()
                } else {
                    format!(" [no {sample_rate} Hz]")
                };
                out.push_str(&format!("{marker} {}  ({rates}){fit}\n", device.name));
            }
            Ok(out)
        }
        other => Err(Error::msg(format!("unrecognized output format '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<DeviceInfo> {
        vec![
            DeviceInfo {
                name: "UR12".into(),
                is_default: true,
                default_sample_rate: Some(192_000),
                stereo_integer_rates: Some((44_100, 192_000)),
            },
            DeviceInfo {
                name: "Webcam".into(),
                is_default: false,
                default_sample_rate: Some(16_000),
                stereo_integer_rates: None,
            },
        ]
    }

    #[test]
    fn plain_marks_default() {
        let out = render(&sample(), "plain", 192_000).unwrap();
        assert_eq!(
            out,
            "* UR12  (stereo int 44100-192000 Hz)\n  Webcam  (no stereo integer input) [no 192000 Hz]\n"
        );
        assert_eq!(render(&[], "plain", 192_000).unwrap(), "No input devices\n");
    }

    #[test]
    fn plain_flags_rate_out_of_range() {
        let out = render(&sample(), "plain", 384_000).unwrap();
        assert!(out.starts_with("* UR12  (stereo int 44100-192000 Hz) [no 384000 Hz]\n"), "{out}");
    }

    #[test]
    fn json_is_camel_case() {
        let out = render(&sample(), "json", 192_000).unwrap();
        assert!(out.contains("\"isDefault\": true"), "{out}");
        assert!(out.contains("\"stereoIntegerRates\""), "{out}");
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(render(&sample(), "yaml", 192_000).is_err());
    }
}
