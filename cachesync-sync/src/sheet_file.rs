//! Local spreadsheet store: a JSON document holding one sheet per tab.
//!
//! ```json
//! { "sheets": { "Queensland": { "rows": [[…], …], "filter": {…},
//!                               "frozen_rows": 1, "date_columns": {"6": "dd/mm/yyyy"} } } }
//! ```
//!
//! Every call loads the document fresh and every mutation saves it with the
//! same atomic `.tmp` + rename pattern as the config file, so several
//! [`SheetFile`] handles on one path (one per tab) never clobber each other
//! within a sequential run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::capability::{Store, StoredRow};
use crate::cells::Cell;
use crate::error::{store_io_err, StoreError};
use crate::row::{Position, PLACED_DATE_COLUMN};

/// Display pattern applied to the placed-date column.
pub const DATE_PATTERN: &str = "dd/mm/yyyy";

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Half-open row and column bounds of a tab's filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRange {
    pub start_row: usize,
    pub end_row: usize,
    pub start_column: usize,
    pub end_column: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sheet {
    pub rows: Vec<Vec<Cell>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterRange>,
    #[serde(default)]
    pub frozen_rows: usize,
    /// Column index → display pattern.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub date_columns: BTreeMap<usize, String>,
}

impl Sheet {
    fn with_header(header: &[Cell]) -> Self {
        Self {
            rows: vec![header.to_vec()],
            filter: Some(FilterRange {
                start_row: 0,
                end_row: 2,
                start_column: 0,
                end_column: header.len(),
            }),
            frozen_rows: 1,
            date_columns: BTreeMap::new(),
        }
    }

    /// Rows as the sheet displays them, header included.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(Cell::display).collect())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SheetDocument {
    #[serde(default)]
    pub sheets: BTreeMap<String, Sheet>,
}

/// Load the document at `path`. A missing file is an empty document.
pub fn load_document(path: &Path) -> Result<SheetDocument, StoreError> {
    if !path.exists() {
        return Ok(SheetDocument::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| store_io_err(path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save the document atomically: `<path>.tmp`, then rename.
pub fn save_document(path: &Path, document: &SheetDocument) -> Result<(), StoreError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| store_io_err(dir, e))?;
    }
    let json = serde_json::to_string_pretty(document)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| store_io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(store_io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// One tab of a sheet document on disk.
#[derive(Debug, Clone)]
pub struct SheetFile {
    path: PathBuf,
    name: String,
}

impl SheetFile {
    pub fn open(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The tab's current contents, if it exists.
    pub fn sheet(&self) -> Result<Option<Sheet>, StoreError> {
        Ok(load_document(&self.path)?.sheets.remove(&self.name))
    }

    fn modify<T>(
        &self,
        f: impl FnOnce(&mut Sheet) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut document = load_document(&self.path)?;
        let sheet = document
            .sheets
            .get_mut(&self.name)
            .ok_or_else(|| StoreError::TargetNotFound {
                name: self.name.clone(),
            })?;
        let value = f(sheet)?;
        save_document(&self.path, &document)?;
        Ok(value)
    }
}

impl Store for SheetFile {
    fn target(&self) -> &str {
        &self.name
    }

    fn ensure_target_ready(&mut self, header: &[Cell]) -> Result<(), StoreError> {
        let mut document = load_document(&self.path)?;
        if document.sheets.contains_key(&self.name) {
            return Ok(());
        }
        tracing::info!("creating sheet {} in {}", self.name, self.path.display());
        document
            .sheets
            .insert(self.name.clone(), Sheet::with_header(header));
        save_document(&self.path, &document)
    }

    fn existing_rows(&mut self) -> Result<Vec<StoredRow>, StoreError> {
        let Some(sheet) = self.sheet()? else {
            return Ok(Vec::new());
        };
        Ok(sheet
            .rows
            .into_iter()
            .enumerate()
            .filter_map(|(index, cells)| {
                Position::data(index).map(|position| StoredRow { position, cells })
            })
            .collect())
    }

    fn append_rows(&mut self, rows: &[Vec<Cell>]) -> Result<(), StoreError> {
        self.modify(|sheet| {
            sheet
                .rows
                .extend(rows.iter().map(|row| row.iter().map(Cell::user_entered).collect()));
            Ok(())
        })
    }

    fn update_rows(&mut self, rows: &[(Position, Vec<Cell>)]) -> Result<(), StoreError> {
        self.modify(|sheet| {
            let len = sheet.rows.len();
            if let Some((position, _)) = rows
                .iter()
                .find(|(p, _)| p.is_header() || p.index() >= len)
            {
                return Err(StoreError::InvalidPosition {
                    position: *position,
                    rows: len,
                });
            }
            for (position, cells) in rows {
                sheet.rows[position.index()] = cells.clone();
            }
            Ok(())
        })
    }

    fn extend_coverage(&mut self, column_count: usize) -> Result<(), StoreError> {
        match self.modify(|sheet| {
            sheet.filter = Some(FilterRange {
                start_row: 0,
                end_row: sheet.rows.len().max(2),
                start_column: 0,
                end_column: column_count,
            });
            sheet
                .date_columns
                .insert(PLACED_DATE_COLUMN, DATE_PATTERN.to_string());
            Ok(())
        }) {
            Err(StoreError::TargetNotFound { .. }) => Ok(()),
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
