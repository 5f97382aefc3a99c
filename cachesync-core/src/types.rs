//! Domain types for cachesync.
//!
//! [`RawRecord`] is what the search service hands back; it is read-only for
//! the rest of the workspace. [`SearchCriteria`] is the stored query that
//! selects which records belong to a sync scope.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// The natural key of a record (e.g. `GC12345`). Stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordCode(pub String);

impl RecordCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RecordCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordCode {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of a search region (e.g. `"54"` for Queensland).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub String);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RegionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RegionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A latitude / longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// `(0, 0)` is the search service's "not set" sentinel.
    pub fn is_unset(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

/// One record returned by the search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub code: RecordCode,
    pub name: String,
    #[serde(default)]
    pub favorite_points: u32,
    #[serde(default)]
    pub difficulty: f64,
    #[serde(default)]
    pub terrain: f64,
    #[serde(default)]
    pub posted_coordinates: Coordinates,
    #[serde(default)]
    pub user_corrected_coordinates: Coordinates,
    /// ISO `YYYY-MM-DDThh:mm:ss`, as sent by the service.
    #[serde(default)]
    pub placed_date: String,
    #[serde(default)]
    pub geocache_type: u32,
    #[serde(default)]
    pub container_type: u32,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub user_found: bool,
    #[serde(default)]
    pub has_caller_note: bool,
}

// ---------------------------------------------------------------------------
// Search criteria
// ---------------------------------------------------------------------------

/// Sort direction requested from the search service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// A stored query selecting the records of one sync scope.
///
/// `None` on the tri-state flags means "do not filter".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Geocache type codes to include; empty means every type.
    #[serde(default)]
    pub cache_types: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_owned: Option<bool>,
    #[serde(default)]
    pub ignore_premium: bool,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default)]
    pub order: SortOrder,
    /// Region the search is anchored to. Filled in per run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionId>,
}

fn default_sort() -> String {
    "distance".to_string()
}

impl Default for SearchCriteria {
    /// Solved puzzle-style caches: the types that usually need corrected
    /// coordinates, corrected only, own hides excluded, nearest first.
    fn default() -> Self {
        use crate::catalog::cache_type;
        Self {
            cache_types: vec![
                cache_type::UNKNOWN,
                cache_type::MULTI,
                cache_type::LETTERBOX,
                cache_type::WHERIGO,
            ],
            corrected: Some(true),
            hide_owned: Some(true),
            ignore_premium: false,
            sort: default_sort(),
            order: SortOrder::Ascending,
            region: None,
        }
    }
}

impl SearchCriteria {
    /// The default criteria anchored to `region`.
    pub fn solved_for_region(region: RegionId) -> Self {
        Self::default().with_region(region)
    }

    /// Copy of `self` anchored to `region`.
    pub fn with_region(mut self, region: RegionId) -> Self {
        self.region = Some(region);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
