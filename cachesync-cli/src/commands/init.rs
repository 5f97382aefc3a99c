//! `cachesync init`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use cachesync_core::config;

/// Write the default config if none exists.
#[derive(Args, Debug)]
pub struct InitArgs {}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let path = config::config_path_at(&home);
        let existed = path.exists();

        let config = config::init_at(&home)
            .with_context(|| format!("failed to initialize config at '{}'", path.display()))?;

        if existed {
            println!("✓ Config already present at {}", path.display());
        } else {
            println!("✓ Wrote default config to {}", path.display());
        }
        println!(
            "  {} regions | store: {} | records: {}",
            config.regions.len(),
            config.store_path.display(),
            config.records_path.display()
        );
        Ok(())
    }
}
