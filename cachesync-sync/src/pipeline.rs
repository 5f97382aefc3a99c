//! Multi-region entrypoint used by the CLI.
//!
//! Regions run one after another, each against its own tab named after the
//! region. A region that fails does not stop the others.

use cachesync_core::{Config, RegionId};

use crate::capability::{Fetcher, Store};
use crate::clock::{Clock, SystemClock};
use crate::error::{StoreError, SyncError};
use crate::reconcile::{Reconciler, SyncOptions, SyncReport};
use crate::retry::{RetryError, Sleeper, ThreadSleeper};

/// Scope for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    /// Every configured region, in id order.
    All,
    /// A single region by id.
    Region(RegionId),
}

/// Time and sleeping, injectable for tests.
#[derive(Clone, Copy)]
pub struct Runtime<'a> {
    pub clock: &'a dyn Clock,
    pub sleeper: &'a dyn Sleeper,
}

impl Runtime<'static> {
    pub fn system() -> Self {
        Self {
            clock: &SystemClock,
            sleeper: &ThreadSleeper,
        }
    }
}

/// Result of one region's run.
#[derive(Debug)]
pub struct RegionOutcome {
    pub region: RegionId,
    /// Region name, which is also the tab name.
    pub name: String,
    pub result: Result<SyncReport, SyncError>,
}

impl RegionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(&self.result, Ok(report) if report.is_clean())
    }
}

/// `(id, name)` pairs covered by `scope`.
pub fn regions_in_scope(
    config: &Config,
    scope: &SyncScope,
) -> Result<Vec<(RegionId, String)>, SyncError> {
    match scope {
        SyncScope::All => Ok(config
            .regions
            .iter()
            .map(|(id, name)| (id.clone(), name.clone()))
            .collect()),
        SyncScope::Region(id) => {
            let name = config.region_name(id)?;
            Ok(vec![(id.clone(), name.to_string())])
        }
    }
}

/// Reconcile every region in `scope`.
///
/// `open_store` is called once per region with the tab name. Only scope
/// resolution errors are returned directly; everything else lands in the
/// region's outcome.
pub fn run<F, S, O>(
    config: &Config,
    scope: &SyncScope,
    dry_run: bool,
    fetcher: &mut F,
    mut open_store: O,
    runtime: Runtime<'_>,
) -> Result<Vec<RegionOutcome>, SyncError>
where
    F: Fetcher + ?Sized,
    S: Store,
    O: FnMut(&str) -> Result<S, StoreError>,
{
    config.validate()?;
    let regions = regions_in_scope(config, scope)?;
    let catalog = config.catalog();
    let options = SyncOptions::from_config(config).dry_run(dry_run);
    let reconciler = Reconciler::new(&catalog, &options, runtime.clock, runtime.sleeper);

    let mut outcomes = Vec::with_capacity(regions.len());
    for (region, name) in regions {
        tracing::info!("syncing region {region} ({name})");
        let criteria = config.criteria_for(&region);
        let result = match open_store(&name) {
            Ok(mut store) => reconciler.run(&criteria, fetcher, &mut store),
            Err(err) => {
                tracing::error!("{name}: could not open store: {err}");
                Err(SyncError::Store(RetryError::Failed(err)))
            }
        };
        outcomes.push(RegionOutcome {
            region,
            name,
            result,
        });
    }
    Ok(outcomes)
}
