//! `cachesync sync`: reconcile regions against the sheet.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use cachesync_core::{config, RegionId};
use cachesync_sync::{
    pipeline::{self, RegionOutcome, SyncScope},
    RecordFile, Runtime, SheetFile, StoreError, SyncReport,
};

/// Arguments for `cachesync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Region id to sync (see `cachesync regions`).
    #[arg(long, value_name = "ID", required_unless_present = "all")]
    pub region: Option<String>,

    /// Sync every configured region.
    #[arg(long, conflicts_with = "region")]
    pub all: bool,

    /// Classify records and print the counts without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Sheet document to write to (overrides `store_path`).
    #[arg(long, value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// Record export to read from (overrides `records_path`).
    #[arg(long, value_name = "FILE")]
    pub records: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled, Serialize)]
struct OutcomeRow {
    #[tabled(rename = "region")]
    region: String,
    #[tabled(rename = "sheet")]
    sheet: String,
    #[tabled(rename = "fetched")]
    fetched: usize,
    #[tabled(rename = "added")]
    added: usize,
    #[tabled(rename = "updated")]
    updated: usize,
    #[tabled(rename = "unchanged")]
    unchanged: usize,
    #[tabled(rename = "skipped")]
    skipped: usize,
    #[tabled(rename = "failed batches")]
    failed_batches: usize,
    #[tabled(rename = "error")]
    error: String,
}

impl OutcomeRow {
    fn from_outcome(outcome: &RegionOutcome) -> Self {
        let (report, error) = match &outcome.result {
            Ok(report) => (report.clone(), String::new()),
            Err(err) => (SyncReport::default(), err.to_string()),
        };
        Self {
            region: outcome.region.to_string(),
            sheet: outcome.name.clone(),
            fetched: report.fetched,
            added: report.added,
            updated: report.updated,
            unchanged: report.unchanged,
            skipped: report.skipped,
            failed_batches: report.failed_batches.len(),
            error,
        }
    }
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let mut config = config::load().context("failed to load config")?;
        if let Some(store) = self.store {
            config.store_path = store;
        }
        if let Some(records) = self.records {
            config.records_path = records;
        }

        let scope = match (self.all, self.region) {
            (true, _) => SyncScope::All,
            (false, Some(id)) => SyncScope::Region(RegionId::from(id)),
            (false, None) => bail!("provide --region <ID> or use --all"),
        };

        let mut fetcher = RecordFile::open(&config.records_path);
        let store_path = config.store_path.clone();
        let outcomes = pipeline::run(
            &config,
            &scope,
            self.dry_run,
            &mut fetcher,
            |name| Ok::<_, StoreError>(SheetFile::open(&store_path, name)),
            Runtime::system(),
        )
        .context("sync failed")?;

        let rows: Vec<OutcomeRow> = outcomes.iter().map(OutcomeRow::from_outcome).collect();
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize sync report")?
            );
        } else {
            print_outcomes(&outcomes, rows, self.dry_run);
        }

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        if failed > 0 {
            bail!("{failed} of {} regions did not sync cleanly", outcomes.len());
        }
        Ok(())
    }
}

fn print_outcomes(outcomes: &[RegionOutcome], rows: Vec<OutcomeRow>, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    println!("{}", Table::new(rows).with(Style::rounded()));

    for outcome in outcomes {
        match &outcome.result {
            Ok(report) if report.is_clean() => {
                let line = format!(
                    "{prefix}✓ '{}' — {} added, {} updated, {} unchanged",
                    outcome.name, report.added, report.updated, report.unchanged
                );
                println!("{}", line.green());
            }
            Ok(report) => {
                let line = format!(
                    "{prefix}! '{}' — {} rows in {} failed batches",
                    outcome.name,
                    report.failed_rows(),
                    report.failed_batches.len()
                );
                println!("{}", line.yellow());
                for batch in &report.failed_batches {
                    println!("    {} batch: {}", batch.kind, batch.message);
                }
            }
            Err(err) => {
                println!("{}", format!("{prefix}✗ '{}' — {err}", outcome.name).red());
            }
        }
    }
}
