//! # cachesync-sync
//!
//! Reconciliation engine: keeps one spreadsheet tab per region in step with
//! the records a search returns.
//!
//! Call [`pipeline::run`] to reconcile one or every configured region, or
//! drive a [`Reconciler`] directly against any [`Fetcher`] / [`Store`] pair.
//! [`SheetFile`] and [`RecordFile`] are the local JSON adapters used by the
//! CLI.

pub mod capability;
pub mod cells;
pub mod clock;
pub mod dates;
pub mod error;
pub mod geo;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod record_file;
pub mod retry;
pub mod row;
pub mod sheet_file;

pub use capability::{Fetcher, Store, StoredRow};
pub use cells::Cell;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{FetchError, StoreError, SyncError};
pub use pipeline::{RegionOutcome, Runtime, SyncScope};
pub use reconcile::{BatchFailure, BatchKind, Reconciler, SyncOptions, SyncPhase, SyncReport};
pub use record_file::RecordFile;
pub use retry::{Executor, RetryError, RetryPolicy, Retryable, Sleeper, ThreadSleeper};
pub use row::{CanonicalRow, ExistingRow, Position};
pub use sheet_file::SheetFile;
