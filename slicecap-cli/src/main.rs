//! `slicecap` command line entry point.
//!
//! Slice lines go to stdout; all logging goes to stderr so the line stream
//! stays clean for a downstream reader.

mod cmd;
mod settings;

use std::process::ExitCode;

use anyhow::Error;
use clap::Parser;
use slicecap_core::SlicecapError;
use tracing::{error, info};

use cmd::{Opts, SubCommand};
use settings::load_settings;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("slicecap=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(opts)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(opts: Opts) -> Result<(), Error> {
    let path = opts.settings_path();
    let mut settings = load_settings(&path);
    settings.apply_env_overrides(|key| std::env::var(key).ok());
    info!(path = %path.display(), "settings loaded");

    match opts.subcmd {
        None => cmd::capture::main(opts.capture, settings).await,
        Some(SubCommand::Capture(args)) => cmd::capture::main(args, settings).await,
        Some(SubCommand::Devices(args)) => cmd::devices::main(args, settings).await,
        Some(SubCommand::Inspect(args)) => cmd::inspect::main(args, settings).await,
        Some(SubCommand::Config(args)) => cmd::config::main(args, settings, &path).await,
    }
}

fn exit_code(err: &Error) -> u8 {
    err.downcast_ref::<SlicecapError>()
        .map(|e| e.exit_code())
        .unwrap_or(1)
        .clamp(1, 255) as u8
}
