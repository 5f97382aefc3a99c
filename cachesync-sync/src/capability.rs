//! The two external collaborators of a run: where records come from and
//! where rows go.

use cachesync_core::{RawRecord, SearchCriteria};

use crate::cells::Cell;
use crate::error::{FetchError, StoreError};
use crate::row::Position;

/// Record search service.
pub trait Fetcher {
    /// All records matching `criteria`, in the service's order.
    fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<RawRecord>, FetchError>;

    /// The caller's personal note for `record`.
    fn fetch_note(&mut self, record: &RawRecord) -> Result<String, FetchError>;
}

/// A stored row as read back: where it lives and what it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub position: Position,
    pub cells: Vec<Cell>,
}

/// One tab of a tabular store.
pub trait Store {
    /// Name of the tab this store writes to.
    fn target(&self) -> &str;

    /// Create the tab with `header` as row 0 if it does not exist.
    fn ensure_target_ready(&mut self, header: &[Cell]) -> Result<(), StoreError>;

    /// Every data row currently in the tab. Empty when the tab is missing.
    fn existing_rows(&mut self) -> Result<Vec<StoredRow>, StoreError>;

    /// Append `rows` after the last row, in order. Cells are taken as user
    /// entered: text loses one leading `'` (see [`Cell::user_entered`]).
    fn append_rows(&mut self, rows: &[Vec<Cell>]) -> Result<(), StoreError>;

    /// Overwrite each row in place. Cells are stored as given.
    fn update_rows(&mut self, rows: &[(Position, Vec<Cell>)]) -> Result<(), StoreError>;

    /// Stretch the filter over every row and `column_count` columns.
    fn extend_coverage(&mut self, column_count: usize) -> Result<(), StoreError>;
}

impl<T: Store + ?Sized> Store for &mut T {
    fn target(&self) -> &str {
        (**self).target()
    }

    fn ensure_target_ready(&mut self, header: &[Cell]) -> Result<(), StoreError> {
        (**self).ensure_target_ready(header)
    }

    fn existing_rows(&mut self) -> Result<Vec<StoredRow>, StoreError> {
        (**self).existing_rows()
    }

    fn append_rows(&mut self, rows: &[Vec<Cell>]) -> Result<(), StoreError> {
        (**self).append_rows(rows)
    }

    fn update_rows(&mut self, rows: &[(Position, Vec<Cell>)]) -> Result<(), StoreError> {
        (**self).update_rows(rows)
    }

    fn extend_coverage(&mut self, column_count: usize) -> Result<(), StoreError> {
        (**self).extend_coverage(column_count)
    }
}

impl<T: Fetcher + ?Sized> Fetcher for &mut T {
    fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<RawRecord>, FetchError> {
        (**self).search(criteria)
    }

    fn fetch_note(&mut self, record: &RawRecord) -> Result<String, FetchError> {
        (**self).fetch_note(record)
    }
}
