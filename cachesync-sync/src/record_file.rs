//! Local record search that answers searches from a JSON export.
//!
//! ```json
//! {
//!   "username": "me",
//!   "regions": { "54": [ { "code": "GC1", "name": "…", … } ] },
//!   "notes":   { "GC1": "solved at the bridge" }
//! }
//! ```
//!
//! The export is read on first use and kept for the life of the value.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cachesync_core::{RawRecord, RecordCode, RegionId, SearchCriteria};

use crate::capability::Fetcher;
use crate::error::{fetch_io_err, FetchError};

/// On-disk export payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordExport {
    /// Account the export was taken for; used to hide owned records.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub regions: BTreeMap<RegionId, Vec<RawRecord>>,
    #[serde(default)]
    pub notes: BTreeMap<RecordCode, String>,
}

impl RecordExport {
    pub fn load(path: &Path) -> Result<Self, FetchError> {
        let contents = std::fs::read_to_string(path).map_err(|e| fetch_io_err(path, e))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Records matching `criteria`, in export order.
    pub fn search(&self, criteria: &SearchCriteria) -> Vec<RawRecord> {
        let pools: Vec<&Vec<RawRecord>> = match &criteria.region {
            Some(region) => self.regions.get(region).into_iter().collect(),
            None => self.regions.values().collect(),
        };
        pools
            .into_iter()
            .flatten()
            .filter(|record| self.matches(record, criteria))
            .cloned()
            .collect()
    }

    fn matches(&self, record: &RawRecord, criteria: &SearchCriteria) -> bool {
        if !criteria.cache_types.is_empty() && !criteria.cache_types.contains(&record.geocache_type)
        {
            return false;
        }
        if let Some(corrected) = criteria.corrected {
            if record.user_corrected_coordinates.is_unset() == corrected {
                return false;
            }
        }
        if criteria.hide_owned == Some(true)
            && !self.username.is_empty()
            && record.owner == self.username
        {
            return false;
        }
        true
    }
}

/// [`Fetcher`] over a [`RecordExport`] file.
#[derive(Debug)]
pub struct RecordFile {
    path: PathBuf,
    export: Option<RecordExport>,
}

impl RecordFile {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            export: None,
        }
    }

    fn export(&mut self) -> Result<&RecordExport, FetchError> {
        let export = match self.export.take() {
            Some(export) => export,
            None => {
                tracing::debug!("loading records from {}", self.path.display());
                RecordExport::load(&self.path)?
            }
        };
        Ok(self.export.insert(export))
    }
}

impl Fetcher for RecordFile {
    fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<RawRecord>, FetchError> {
        Ok(self.export()?.search(criteria))
    }

    fn fetch_note(&mut self, record: &RawRecord) -> Result<String, FetchError> {
        self.export()?
            .notes
            .get(&record.code)
            .cloned()
            .ok_or_else(|| FetchError::NoteUnavailable {
                code: record.code.clone(),
            })
    }
}
