use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod capture;
pub mod config;
pub mod devices;
pub mod inspect;

#[derive(Subcommand, Debug)]
pub enum SubCommand {
    /// Capture from the input device and stream slices to stdout (default)
    Capture(capture::CaptureArgs),

    /// Enumerate audio input devices
    Devices(devices::DevicesArgs),

    /// Summarise slice lines read from stdin
    Inspect(inspect::InspectArgs),

    /// Print or save the effective settings
    Config(config::ConfigArgs),
}

/// Stereo slice recorder: captures fixed-length slices from an input device
/// and writes them as comma-separated sample lines.
#[derive(Parser, Debug)]
#[command(name = "slicecap", version, args_conflicts_with_subcommands = true)]
pub struct Opts {
    /// Settings file; defaults to the per-user config location
    #[arg(long, global = true, env = "SLICECAP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub subcmd: Option<SubCommand>,

    /// Capture flags, used when no subcommand is given
    #[command(flatten)]
    pub capture: capture::CaptureArgs,
}

impl Opts {
    pub fn settings_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::settings::default_settings_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Opts::command().debug_assert();
    }

    #[test]
    fn bare_flags_mean_capture() {
        let opts = Opts::try_parse_from(["slicecap", "--channel", "left", "--slices", "5"]).unwrap();
        assert!(opts.subcmd.is_none());
        assert_eq!(opts.capture.channel.as_deref(), Some("left"));
        assert_eq!(opts.capture.slices, Some(5));
    }

    #[test]
    fn subcommands_parse() {
        let opts = Opts::try_parse_from(["slicecap", "inspect", "--sample-rate", "48000"]).unwrap();
        match opts.subcmd {
            Some(SubCommand::Inspect(args)) => assert_eq!(args.sample_rate, Some(48_000)),
            other => panic!("unexpected {other:?}"),
        }

        let opts =
            Opts::try_parse_from(["slicecap", "config", "--config", "/tmp/s.json", "--save"])
                .unwrap();
        assert_eq!(opts.settings_path(), PathBuf::from("/tmp/s.json"));
        assert!(matches!(opts.subcmd, Some(SubCommand::Config(ref a)) if a.save));
    }

    #[test]
    fn capture_flags_before_subcommand_are_rejected() {
        assert!(Opts::try_parse_from(["slicecap", "--channel", "left", "capture"]).is_err());

        let opts = Opts::try_parse_from(["slicecap", "capture", "--channel", "left"]).unwrap();
        match opts.subcmd {
            Some(SubCommand::Capture(args)) => assert_eq!(args.channel.as_deref(), Some("left")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
