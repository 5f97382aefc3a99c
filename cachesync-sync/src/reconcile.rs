//! The reconciliation run.
//!
//! ## Stages
//!
//! ```text
//! Fetching → Normalizing → Diffing → Flushing → Done
//!     ╰──────────┴── Failed (no write has been issued yet)
//! ```
//!
//! 1. One search call for the criteria. Failure ends the run untouched.
//! 2. Prepare the target tab and read its rows once.
//! 3. Collapse duplicate keys (later record wins, first position kept) and
//!    normalize; records without corrected coordinates are skipped.
//! 4. Diff against the snapshot into an ordered [`Plan`].
//! 5. Replay the plan through two queues; a queue reaching the batch size
//!    is written through the retry executor, leftovers are written last.
//! 6. Extend the filter over the new rows. Failure here is only logged.
//!
//! A batch that exhausts its retries (or fails outright) is recorded in the
//! report and the run moves on to the next batch. Rows of a failed batch are
//! picked up again by the next run.

use std::collections::HashMap;
use std::fmt;

use cachesync_core::{Catalog, Config, Coordinates, RawRecord, RecordCode, SearchCriteria};

use crate::capability::{Fetcher, Store, StoredRow};
use crate::cells::{self, Cell};
use crate::clock::Clock;
use crate::error::{StoreError, SyncError};
use crate::normalize::Normalizer;
use crate::retry::{Executor, RetryError, RetryPolicy, Sleeper};
use crate::row::{self, CanonicalRow, ExistingRows, Position, COLUMN_COUNT};

// ---------------------------------------------------------------------------
// Options / report
// ---------------------------------------------------------------------------

/// Per-run knobs, usually taken from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    pub link_prefix: String,
    pub origin: Coordinates,
    pub batch_size: usize,
    pub retry: RetryPolicy,
    /// Classify everything, write nothing.
    pub dry_run: bool,
}

impl SyncOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            link_prefix: config.link_prefix.clone(),
            origin: config.origin,
            batch_size: config.batch_size.max(1),
            retry: RetryPolicy::from(config.retry),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Stage of a run, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Fetching,
    Normalizing,
    Diffing,
    Flushing,
    Done,
    Failed,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncPhase::Fetching => "fetching",
            SyncPhase::Normalizing => "normalizing",
            SyncPhase::Diffing => "diffing",
            SyncPhase::Flushing => "flushing",
            SyncPhase::Done => "done",
            SyncPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Append,
    Update,
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchKind::Append => f.write_str("append"),
            BatchKind::Update => f.write_str("update"),
        }
    }
}

/// A batch the store never accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub kind: BatchKind,
    /// Keys of the rows in the batch, in write order.
    pub codes: Vec<RecordCode>,
    /// Whether every attempt was throttled, as opposed to a hard failure.
    pub exhausted: bool,
    pub message: String,
}

/// What a run did (or, in a dry run, would have done).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Tab the run targeted.
    pub target: String,
    /// Records returned by the search, duplicates included.
    pub fetched: usize,
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Records without corrected coordinates.
    pub skipped: usize,
    pub failed_batches: Vec<BatchFailure>,
    pub dry_run: bool,
}

impl SyncReport {
    /// Rows that were meant to be written but were not.
    pub fn failed_rows(&self) -> usize {
        self.failed_batches.iter().map(|b| b.codes.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failed_batches.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// A single write the diff decided on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedWrite {
    Append(CanonicalRow),
    Update(Position, CanonicalRow),
}

/// Ordered writes plus the number of rows left alone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Plan {
    pub writes: Vec<PlannedWrite>,
    pub unchanged: usize,
}

impl Plan {
    pub fn appends(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| matches!(w, PlannedWrite::Append(_)))
            .count()
    }

    pub fn updates(&self) -> usize {
        self.writes.len() - self.appends()
    }
}

/// Classify each candidate against the snapshot, keeping candidate order.
///
/// `candidates` must already be unique by key.
pub fn plan(candidates: Vec<CanonicalRow>, existing: &ExistingRows) -> Plan {
    let mut plan = Plan::default();
    for candidate in candidates {
        match existing.get(&candidate.code) {
            Some(prior) if row::rows_equivalent(&prior.row, &candidate) => plan.unchanged += 1,
            Some(prior) => plan
                .writes
                .push(PlannedWrite::Update(prior.position, candidate)),
            None => plan.writes.push(PlannedWrite::Append(candidate)),
        }
    }
    plan
}

/// Collapse repeated keys: the later record wins, the first position is kept.
pub fn dedupe(records: Vec<RawRecord>) -> Vec<RawRecord> {
    let mut slots: HashMap<RecordCode, usize> = HashMap::new();
    let mut unique: Vec<RawRecord> = Vec::with_capacity(records.len());
    for record in records {
        match slots.get(&record.code) {
            Some(&slot) => unique[slot] = record,
            None => {
                slots.insert(record.code.clone(), unique.len());
                unique.push(record);
            }
        }
    }
    unique
}

/// Parse stored rows into the keyed snapshot. Rows without a key are ignored.
pub fn snapshot(rows: Vec<StoredRow>) -> ExistingRows {
    row::index_existing(rows.into_iter().filter_map(|stored| {
        CanonicalRow::from_cells(&stored.cells).map(|row| (stored.position, row))
    }))
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Runs one reconciliation of a search against one store tab.
pub struct Reconciler<'a> {
    catalog: &'a Catalog,
    options: &'a SyncOptions,
    clock: &'a dyn Clock,
    sleeper: &'a dyn Sleeper,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        catalog: &'a Catalog,
        options: &'a SyncOptions,
        clock: &'a dyn Clock,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            catalog,
            options,
            clock,
            sleeper,
        }
    }

    pub fn run<F, S>(
        &self,
        criteria: &SearchCriteria,
        fetcher: &mut F,
        store: &mut S,
    ) -> Result<SyncReport, SyncError>
    where
        F: Fetcher + ?Sized,
        S: Store + ?Sized,
    {
        let target = store.target().to_string();
        let result = self.run_inner(&target, criteria, fetcher, store);
        if let Err(err) = &result {
            tracing::error!("{target}: {}: {err}", SyncPhase::Failed);
        }
        result
    }

    fn run_inner<F, S>(
        &self,
        target: &str,
        criteria: &SearchCriteria,
        fetcher: &mut F,
        store: &mut S,
    ) -> Result<SyncReport, SyncError>
    where
        F: Fetcher + ?Sized,
        S: Store + ?Sized,
    {
        let executor = Executor::new(self.options.retry, self.sleeper);
        let mut report = SyncReport {
            target: target.to_string(),
            dry_run: self.options.dry_run,
            ..SyncReport::default()
        };

        enter(target, SyncPhase::Fetching);
        let records = fetcher.search(criteria).map_err(SyncError::Fetch)?;
        report.fetched = records.len();
        tracing::info!("{target}: fetched {} records", records.len());

        if !self.options.dry_run {
            let header = cells::header_cells();
            executor.run("prepare target", || store.ensure_target_ready(&header))?;
        }
        let existing = snapshot(executor.run("read rows", || store.existing_rows())?);
        tracing::debug!("{target}: {} rows in store", existing.len());

        enter(target, SyncPhase::Normalizing);
        let normalizer = Normalizer::new(self.catalog, self.options.origin, self.clock.now());
        let records = dedupe(records);
        let mut candidates = Vec::with_capacity(records.len());
        for record in &records {
            match normalizer.normalize(record, &existing, |r| fetcher.fetch_note(r)) {
                Some(row) => candidates.push(row),
                None => report.skipped += 1,
            }
        }

        enter(target, SyncPhase::Diffing);
        let plan = plan(candidates, &existing);
        report.unchanged = plan.unchanged;
        tracing::info!(
            "{target}: {} to add, {} to update, {} unchanged, {} skipped",
            plan.appends(),
            plan.updates(),
            plan.unchanged,
            report.skipped
        );

        enter(target, SyncPhase::Flushing);
        let mut flusher = Flusher {
            store: &mut *store,
            executor: &executor,
            options: self.options,
            report: &mut report,
            appends: Vec::new(),
            updates: Vec::new(),
        };
        for write in plan.writes {
            flusher.push(write);
        }
        flusher.finish();

        if !self.options.dry_run {
            if let Err(err) = executor.run("extend filter", || store.extend_coverage(COLUMN_COUNT)) {
                tracing::warn!("{target}: could not extend filter: {err}");
            }
        }

        enter(target, SyncPhase::Done);
        tracing::info!(
            "{target}: added {}, updated {}, unchanged {}, {} failed batches",
            report.added,
            report.updated,
            report.unchanged,
            report.failed_batches.len()
        );
        Ok(report)
    }
}

fn enter(target: &str, phase: SyncPhase) {
    tracing::debug!("{target}: {phase}");
}

// ---------------------------------------------------------------------------
// Batching
// ---------------------------------------------------------------------------

struct Flusher<'r, 'e, S: Store + ?Sized> {
    store: &'r mut S,
    executor: &'r Executor<'e>,
    options: &'r SyncOptions,
    report: &'r mut SyncReport,
    appends: Vec<CanonicalRow>,
    updates: Vec<(Position, CanonicalRow)>,
}

impl<S: Store + ?Sized> Flusher<'_, '_, S> {
    fn push(&mut self, write: PlannedWrite) {
        match write {
            PlannedWrite::Append(row) => {
                self.appends.push(row);
                if self.appends.len() >= self.options.batch_size {
                    self.flush_appends();
                }
            }
            PlannedWrite::Update(position, row) => {
                self.updates.push((position, row));
                if self.updates.len() >= self.options.batch_size {
                    self.flush_updates();
                }
            }
        }
    }

    fn finish(&mut self) {
        if !self.appends.is_empty() {
            self.flush_appends();
        }
        if !self.updates.is_empty() {
            self.flush_updates();
        }
    }

    fn flush_appends(&mut self) {
        let batch = std::mem::take(&mut self.appends);
        let codes: Vec<RecordCode> = batch.iter().map(|r| r.code.clone()).collect();
        if self.options.dry_run {
            tracing::info!("[dry-run] would append {} rows", batch.len());
            self.report.added += batch.len();
            return;
        }
        let rows: Vec<Vec<Cell>> = batch
            .iter()
            .map(|r| cells::append_cells(r, &self.options.link_prefix))
            .collect();
        let store = &mut *self.store;
        match self.executor.run("append batch", || store.append_rows(&rows)) {
            Ok(()) => {
                tracing::debug!("appended {} rows", rows.len());
                self.report.added += rows.len();
            }
            Err(err) => self.record_failure(BatchKind::Append, codes, err),
        }
    }

    fn flush_updates(&mut self) {
        let batch = std::mem::take(&mut self.updates);
        let codes: Vec<RecordCode> = batch.iter().map(|(_, r)| r.code.clone()).collect();
        if self.options.dry_run {
            tracing::info!("[dry-run] would update {} rows", batch.len());
            self.report.updated += batch.len();
            return;
        }
        let rows: Vec<(Position, Vec<Cell>)> = batch
            .iter()
            .map(|(position, r)| (*position, cells::update_cells(r, &self.options.link_prefix)))
            .collect();
        let store = &mut *self.store;
        match self.executor.run("update batch", || store.update_rows(&rows)) {
            Ok(()) => {
                tracing::debug!("updated {} rows", rows.len());
                self.report.updated += rows.len();
            }
            Err(err) => self.record_failure(BatchKind::Update, codes, err),
        }
    }

    fn record_failure(&mut self, kind: BatchKind, codes: Vec<RecordCode>, err: RetryError<StoreError>) {
        tracing::error!("{kind} batch of {} rows failed: {err}", codes.len());
        self.report.failed_batches.push(BatchFailure {
            kind,
            codes,
            exhausted: err.is_exhausted(),
            message: err.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::ExistingRow;

    fn row(code: &str, name: &str) -> CanonicalRow {
        CanonicalRow {
            code: RecordCode::from(code),
            name: name.to_string(),
            favorites: "1".to_string(),
            posted_coords: "S27 00.000 E153 00.000".to_string(),
            corrected_coords: "S27 01.000 E153 01.000".to_string(),
            distance: "5.00".to_string(),
            placed_date: "2024-07-01".to_string(),
            cache_type: "Unknown".to_string(),
            cache_size: "Small".to_string(),
            difficulty: "2".to_string(),
            terrain: "2".to_string(),
            owner: "o".to_string(),
            region: "Queensland".to_string(),
            country: "Australia".to_string(),
            found: String::new(),
            note: String::new(),
            last_updated: "2025-01-01 00:00:00".to_string(),
        }
    }

    fn raw(code: &str, name: &str) -> RawRecord {
        RawRecord {
            code: RecordCode::from(code),
            name: name.to_string(),
            favorite_points: 0,
            difficulty: 1.0,
            terrain: 1.0,
            posted_coordinates: Coordinates::default(),
            user_corrected_coordinates: Coordinates::default(),
            placed_date: String::new(),
            geocache_type: 0,
            container_type: 0,
            owner: String::new(),
            region: String::new(),
            country: String::new(),
            user_found: false,
            has_caller_note: false,
        }
    }

    #[test]
    fn plan_classifies_in_candidate_order() {
        let mut existing = ExistingRows::new();
        for (i, (code, name)) in [("B", "same"), ("C", "old")].into_iter().enumerate() {
            existing.insert(
                RecordCode::from(code),
                ExistingRow {
                    position: Position::data(i + 1).unwrap(),
                    row: row(code, name),
                },
            );
        }

        let plan = plan(
            vec![row("A", "new"), row("B", "same"), row("C", "renamed"), row("D", "new")],
            &existing,
        );

        assert_eq!(plan.unchanged, 1);
        assert_eq!(plan.appends(), 2);
        assert_eq!(plan.updates(), 1);
        assert!(matches!(&plan.writes[0], PlannedWrite::Append(r) if r.code.as_str() == "A"));
        assert!(matches!(&plan.writes[1], PlannedWrite::Update(p, r)
            if p.index() == 2 && r.name == "renamed"));
        assert!(matches!(&plan.writes[2], PlannedWrite::Append(r) if r.code.as_str() == "D"));
    }

    #[test]
    fn dedupe_keeps_first_position_and_last_value() {
        let out = dedupe(vec![raw("A", "first"), raw("B", "b"), raw("A", "second")]);
        let summary: Vec<(&str, &str)> = out
            .iter()
            .map(|r| (r.code.as_str(), r.name.as_str()))
            .collect();
        assert_eq!(summary, vec![("A", "second"), ("B", "b")]);
    }

    #[test]
    fn snapshot_ignores_keyless_rows() {
        let rows = vec![
            StoredRow {
                position: Position::data(1).unwrap(),
                cells: vec![Cell::text("GC1"), Cell::text("'Name")],
            },
            StoredRow {
                position: Position::data(2).unwrap(),
                cells: vec![Cell::text("")],
            },
        ];
        let existing = snapshot(rows);
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[&RecordCode::from("GC1")].row.name, "Name");
    }

    #[test]
    fn options_follow_config() {
        let mut config = Config::default();
        config.batch_size = 25;
        let options = SyncOptions::from_config(&config).dry_run(true);
        assert_eq!(options.batch_size, 25);
        assert_eq!(options.retry.max_attempts, 15);
        assert!(options.dry_run);
        assert_eq!(options.link_prefix, "https://coord.info/");
    }

    #[test]
    fn phase_names() {
        assert_eq!(SyncPhase::Flushing.to_string(), "flushing");
        assert_eq!(BatchKind::Update.to_string(), "update");
    }
}
