//! `cachesync regions`: configured region ids and their tab names.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use cachesync_core::config;

/// Arguments for `cachesync regions`.
#[derive(Args, Debug)]
pub struct RegionsArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled, Serialize)]
struct RegionRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "name")]
    name: String,
}

impl RegionsArgs {
    pub fn run(self) -> Result<()> {
        let config = config::load().context("failed to load config")?;
        let rows: Vec<RegionRow> = config
            .catalog()
            .regions()
            .map(|(id, name)| RegionRow {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect();

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize regions")?
            );
            return Ok(());
        }

        if rows.is_empty() {
            println!("No regions configured.");
            return Ok(());
        }
        println!("{}", Table::new(rows).with(Style::rounded()));
        Ok(())
    }
}
