use std::path::Path;

use anyhow::{Context, Error};
use tracing::info;

use crate::settings::{save_settings, AppSettings};

/// Prints the effective settings as JSON
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Write the effective settings back to the settings file
    #[arg(long)]
    pub save: bool,
}

pub async fn main(args: ConfigArgs, settings: AppSettings, path: &Path) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(&settings)?);
    if args.save {
        save_settings(path, &settings)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "settings saved");
    }
    Ok(())
}
