//! Canonical rows and the equivalence used to diff them.
//!
//! ## Column layout
//!
//! The header row and every data row use the order of [`HEADER`]. Column 0
//! holds the natural key.
//!
//! ## Equivalence
//!
//! [`rows_equivalent`] is deliberately asymmetric about the note column:
//! notes get edited by hand in the sheet, so only an empty ↔ non-empty
//! transition counts as a change. `last_updated` never counts.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use cachesync_core::RecordCode;

use crate::cells::Cell;
use crate::dates;

/// Header row, in column order.
pub const HEADER: [&str; 17] = [
    "Code",
    "Name",
    "Favorites",
    "Posted Coords",
    "Corrected Coords",
    "Distance (km)",
    "Placed Date",
    "Type",
    "Size",
    "Difficulty",
    "Terrain",
    "Owner",
    "Region",
    "Country",
    "Found",
    "Note",
    "Last Updated",
];

pub const COLUMN_COUNT: usize = HEADER.len();
pub const PLACED_DATE_COLUMN: usize = 6;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// 0-based row offset in a sheet. Row 0 is the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(usize);

impl Position {
    pub const HEADER: Position = Position(0);

    /// A data-row position; `None` for the header row.
    pub fn data(index: usize) -> Option<Self> {
        (index > 0).then_some(Self(index))
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn is_header(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A record as the sheet shows it. Everything is display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRow {
    pub code: RecordCode,
    pub name: String,
    pub favorites: String,
    pub posted_coords: String,
    pub corrected_coords: String,
    pub distance: String,
    pub placed_date: String,
    pub cache_type: String,
    pub cache_size: String,
    pub difficulty: String,
    pub terrain: String,
    pub owner: String,
    pub region: String,
    pub country: String,
    pub found: String,
    pub note: String,
    pub last_updated: String,
}

impl CanonicalRow {
    /// Rebuild a row from the displayed values of a stored row.
    ///
    /// Missing trailing cells read as empty. Returns `None` for rows without
    /// a key.
    pub fn from_cells(cells: &[Cell]) -> Option<Self> {
        let get = |i: usize| cells.get(i).map(Cell::display).unwrap_or_default();
        let code = get(0);
        if code.trim().is_empty() {
            return None;
        }
        Some(Self {
            code: RecordCode::from(code),
            name: get(1),
            favorites: get(2),
            posted_coords: get(3),
            corrected_coords: get(4),
            distance: fixed2(&get(5)),
            placed_date: dates::normalize_date(&get(6)),
            cache_type: get(7),
            cache_size: get(8),
            difficulty: get(9),
            terrain: get(10),
            owner: get(11),
            region: get(12),
            country: get(13),
            found: get(14),
            note: get(15),
            last_updated: dates::normalize_timestamp(&get(16)),
        })
    }
}

/// A canonical row read back from the store, with where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingRow {
    pub position: Position,
    pub row: CanonicalRow,
}

/// Snapshot of the store keyed by natural key.
pub type ExistingRows = HashMap<RecordCode, ExistingRow>;

// ---------------------------------------------------------------------------
// Equivalence
// ---------------------------------------------------------------------------

/// Whether writing `candidate` over `existing` would change anything that
/// matters.
///
/// Ignores the key (rows are matched by it), `last_updated`, and note
/// content beyond emptiness. Numeric columns compare at two decimals and
/// dates as `YYYY-MM-DD`, so `"2"` and `"2.0"` are the same value.
pub fn rows_equivalent(existing: &CanonicalRow, candidate: &CanonicalRow) -> bool {
    existing.name == candidate.name
        && same_number(&existing.favorites, &candidate.favorites)
        && existing.posted_coords == candidate.posted_coords
        && existing.corrected_coords == candidate.corrected_coords
        && same_number(&existing.distance, &candidate.distance)
        && dates::normalize_date(&existing.placed_date)
            == dates::normalize_date(&candidate.placed_date)
        && existing.cache_type == candidate.cache_type
        && existing.cache_size == candidate.cache_size
        && same_number(&existing.difficulty, &candidate.difficulty)
        && same_number(&existing.terrain, &candidate.terrain)
        && existing.owner == candidate.owner
        && existing.region == candidate.region
        && existing.country == candidate.country
        && existing.found == candidate.found
        && existing.note.is_empty() == candidate.note.is_empty()
}

fn same_number(a: &str, b: &str) -> bool {
    fixed2(a) == fixed2(b)
}

/// Two-decimal rendering of a numeric string; anything else unchanged.
pub fn fixed2(s: &str) -> String {
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => format!("{v:.2}"),
        _ => s.to_string(),
    }
}

/// Index stored rows by key. A key appearing twice resolves to the later row.
pub fn index_existing<I>(rows: I) -> ExistingRows
where
    I: IntoIterator<Item = (Position, CanonicalRow)>,
{
    rows.into_iter()
        .filter(|(position, _)| !position.is_header())
        .map(|(position, row)| (row.code.clone(), ExistingRow { position, row }))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
