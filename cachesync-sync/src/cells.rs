//! Store cells and the two write renderings of a canonical row.
//!
//! Appends go through the store's "user entered" path, where a leading `'`
//! pins a value as text and formulas are evaluated. Updates go through the
//! raw path and carry typed values instead: numbers as numbers, dates as day
//! serials.

use serde::{Deserialize, Serialize};

use crate::dates;
use crate::row::{CanonicalRow, HEADER};

/// One value at the store boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Cell {
    Text(String),
    Number(f64),
    Formula(String),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// The cell as a "user entered" write stores it: one leading `'` is
    /// consumed as a text pin. Raw writes keep text verbatim.
    pub fn user_entered(&self) -> Cell {
        match self {
            Cell::Text(s) => Cell::text(s.strip_prefix('\'').unwrap_or(s)),
            other => other.clone(),
        }
    }

    /// The value as the sheet displays it.
    ///
    /// Stored text shows verbatim. Numbers print in shortest form and a
    /// `HYPERLINK` formula shows its label.
    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            Cell::Formula(f) => hyperlink_label(f).unwrap_or(f).to_string(),
        }
    }
}

/// Shortest decimal form: `10`, `1.5`, `77.6`.
pub fn format_number(n: f64) -> String {
    format!("{n}")
}

/// `=HYPERLINK("<url>", "<label>")`
pub fn hyperlink(url: &str, label: &str) -> String {
    format!(r#"=HYPERLINK("{url}", "{label}")"#)
}

fn hyperlink_label(formula: &str) -> Option<&str> {
    let args = formula
        .strip_prefix("=HYPERLINK(")
        .or_else(|| formula.strip_prefix("=hyperlink("))?
        .strip_suffix(')')?;
    let (_, label) = args.rsplit_once(',')?;
    label.trim().strip_prefix('"')?.strip_suffix('"')
}

pub fn header_cells() -> Vec<Cell> {
    HEADER.iter().map(|h| Cell::text(*h)).collect()
}

fn pinned(s: &str) -> Cell {
    Cell::Text(format!("'{s}"))
}

/// Row rendering for appends: linked code, pinned free-text columns,
/// everything else as display text.
pub fn append_cells(row: &CanonicalRow, link_prefix: &str) -> Vec<Cell> {
    let code = row.code.as_str();
    vec![
        Cell::Formula(hyperlink(&format!("{link_prefix}{code}"), code)),
        pinned(&row.name),
        Cell::text(&row.favorites),
        Cell::text(&row.posted_coords),
        Cell::text(&row.corrected_coords),
        Cell::text(&row.distance),
        Cell::text(&row.placed_date),
        Cell::text(&row.cache_type),
        Cell::text(&row.cache_size),
        Cell::text(&row.difficulty),
        Cell::text(&row.terrain),
        pinned(&row.owner),
        Cell::text(&row.region),
        Cell::text(&row.country),
        Cell::text(&row.found),
        pinned(&row.note),
        Cell::text(&row.last_updated),
    ]
}

/// Row rendering for in-place updates. Values that fail to parse stay text.
pub fn update_cells(row: &CanonicalRow, link_prefix: &str) -> Vec<Cell> {
    let code = row.code.as_str();
    vec![
        Cell::Formula(hyperlink(&format!("{link_prefix}{code}"), code)),
        Cell::text(&row.name),
        number(&row.favorites),
        Cell::text(&row.posted_coords),
        Cell::text(&row.corrected_coords),
        number(&row.distance),
        serial(&row.placed_date),
        Cell::text(&row.cache_type),
        Cell::text(&row.cache_size),
        number(&row.difficulty),
        number(&row.terrain),
        Cell::text(&row.owner),
        Cell::text(&row.region),
        Cell::text(&row.country),
        Cell::text(&row.found),
        Cell::text(&row.note),
        serial(&row.last_updated),
    ]
}

fn number(s: &str) -> Cell {
    match s.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Cell::Number(n),
        _ => Cell::text(s),
    }
}

fn serial(s: &str) -> Cell {
    match dates::to_serial(s) {
        Some(n) => Cell::Number(n),
        None => Cell::text(s),
    }
}
