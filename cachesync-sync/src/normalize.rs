//! Raw record → canonical row.

use chrono::NaiveDateTime;

use cachesync_core::{Catalog, Coordinates, RawRecord};

use crate::cells::format_number;
use crate::dates;
use crate::error::FetchError;
use crate::geo;
use crate::row::{CanonicalRow, ExistingRows};

/// Everything a run needs to project records into rows.
#[derive(Debug, Clone)]
pub struct Normalizer<'a> {
    catalog: &'a Catalog,
    origin: Coordinates,
    timestamp: String,
}

impl<'a> Normalizer<'a> {
    /// `now` becomes the last-updated value of every row built by this
    /// normalizer.
    pub fn new(catalog: &'a Catalog, origin: Coordinates, now: NaiveDateTime) -> Self {
        Self {
            catalog,
            origin,
            timestamp: dates::format_timestamp(now),
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Build the canonical row for `record`.
    ///
    /// Returns `None` when the corrected coordinates render the same as the
    /// posted ones: nothing has been solved. A non-empty note already in the
    /// store is kept verbatim; otherwise the note is fetched when the record
    /// says it has one. A failed note fetch leaves the note empty.
    pub fn normalize<F>(
        &self,
        record: &RawRecord,
        existing: &ExistingRows,
        mut fetch_note: F,
    ) -> Option<CanonicalRow>
    where
        F: FnMut(&RawRecord) -> Result<String, FetchError>,
    {
        let posted_coords = geo::format_coordinates(record.posted_coordinates);
        let corrected_coords = geo::format_coordinates(record.user_corrected_coordinates);
        if posted_coords == corrected_coords {
            tracing::debug!("{}: coordinates not corrected, skipping", record.code);
            return None;
        }

        let kept_note = existing
            .get(&record.code)
            .map(|e| e.row.note.as_str())
            .filter(|note| !note.is_empty());
        let note = match kept_note {
            Some(note) => note.to_string(),
            None if record.has_caller_note => match fetch_note(record) {
                Ok(note) => note,
                Err(err) => {
                    tracing::warn!("{}: note fetch failed: {err}", record.code);
                    String::new()
                }
            },
            None => String::new(),
        };

        let target = if record.user_corrected_coordinates.is_unset() {
            record.posted_coordinates
        } else {
            record.user_corrected_coordinates
        };
        let distance = geo::distance_km(self.origin, target);

        Some(CanonicalRow {
            code: record.code.clone(),
            name: record.name.clone(),
            favorites: record.favorite_points.to_string(),
            posted_coords,
            corrected_coords,
            distance: format!("{distance:.2}"),
            placed_date: dates::display_date(&record.placed_date),
            cache_type: self.catalog.cache_type_name(record.geocache_type).to_string(),
            cache_size: self.catalog.cache_size_name(record.container_type).to_string(),
            difficulty: format_number(record.difficulty),
            terrain: format_number(record.terrain),
            owner: record.owner.clone(),
            region: record.region.clone(),
            country: record.country.clone(),
            found: if record.user_found { "Yes" } else { "" }.to_string(),
            note,
            last_updated: self.timestamp.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell as Counter;

    use cachesync_core::RecordCode;

    use super::*;
    use crate::row::{index_existing, Position};

    const BRISBANE: Coordinates = Coordinates::new(-27.4705, 153.0260);

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-10-11 05:58:35", dates::TIMESTAMP_FORMAT).unwrap()
    }

    fn record() -> RawRecord {
        RawRecord {
            code: RecordCode::from("GC12345"),
            name: "Test Cache".to_string(),
            favorite_points: 10,
            difficulty: 2.0,
            terrain: 1.5,
            posted_coordinates: Coordinates::new(-27.123456, 153.654321),
            user_corrected_coordinates: Coordinates::new(-27.234567, 153.765432),
            placed_date: "2024-07-01T00:00:00".to_string(),
            geocache_type: 8,
            container_type: 3,
            owner: "owner".to_string(),
            region: "Queensland".to_string(),
            country: "Australia".to_string(),
            user_found: true,
            has_caller_note: false,
        }
    }

    fn no_note(_: &RawRecord) -> Result<String, FetchError> {
        panic!("note should not be fetched")
    }

    #[test]
    fn projects_every_column() {
        let catalog = Catalog::standard();
        let n = Normalizer::new(&catalog, BRISBANE, now());
        let row = n.normalize(&record(), &ExistingRows::new(), no_note).unwrap();

        assert_eq!(row.code, RecordCode::from("GC12345"));
        assert_eq!(row.name, "Test Cache");
        assert_eq!(row.favorites, "10");
        assert_eq!(row.posted_coords, "S27 07.407 E153 39.259");
        assert_eq!(row.corrected_coords, "S27 14.074 E153 45.926");
        assert_eq!(row.distance, "77.60");
        assert_eq!(row.placed_date, "2024-07-01");
        assert_eq!(row.cache_type, "Unknown");
        assert_eq!(row.cache_size, "Regular");
        assert_eq!(row.difficulty, "2");
        assert_eq!(row.terrain, "1.5");
        assert_eq!(row.found, "Yes");
        assert_eq!(row.note, "");
        assert_eq!(row.last_updated, "2025-10-11 05:58:35");
    }

    #[test]
    fn unchanged_coordinates_are_skipped() {
        let catalog = Catalog::standard();
        let n = Normalizer::new(&catalog, BRISBANE, now());
        let mut r = record();
        r.user_corrected_coordinates = r.posted_coordinates;
        assert!(n.normalize(&r, &ExistingRows::new(), no_note).is_none());
    }

    #[test]
    fn unknown_codes_render_empty() {
        let catalog = Catalog::standard();
        let n = Normalizer::new(&catalog, BRISBANE, now());
        let mut r = record();
        r.geocache_type = 999;
        r.container_type = 999;
        r.user_found = false;
        let row = n.normalize(&r, &ExistingRows::new(), no_note).unwrap();
        assert_eq!(row.cache_type, "");
        assert_eq!(row.cache_size, "");
        assert_eq!(row.found, "");
    }

    #[test]
    fn existing_note_is_reused_without_fetching() {
        let catalog = Catalog::standard();
        let n = Normalizer::new(&catalog, BRISBANE, now());
        let mut prior = n.normalize(&record(), &ExistingRows::new(), no_note).unwrap();
        prior.note = "hand edited".to_string();
        let existing = index_existing(Position::data(1).map(|p| (p, prior)));

        for has_note in [true, false] {
            let mut r = record();
            r.has_caller_note = has_note;
            let row = n.normalize(&r, &existing, no_note).unwrap();
            assert_eq!(row.note, "hand edited");
        }
    }

    #[test]
    fn note_fetched_when_missing() {
        let catalog = Catalog::standard();
        let n = Normalizer::new(&catalog, BRISBANE, now());
        let calls = Counter::new(0);
        let mut r = record();
        r.has_caller_note = true;
        let row = n
            .normalize(&r, &ExistingRows::new(), |_| {
                calls.set(calls.get() + 1);
                Ok("solved at the bridge".to_string())
            })
            .unwrap();
        assert_eq!(row.note, "solved at the bridge");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn failed_note_fetch_leaves_note_empty() {
        let catalog = Catalog::standard();
        let n = Normalizer::new(&catalog, BRISBANE, now());
        let mut r = record();
        r.has_caller_note = true;
        let row = n
            .normalize(&r, &ExistingRows::new(), |rec| {
                Err(FetchError::NoteUnavailable {
                    code: rec.code.clone(),
                })
            })
            .unwrap();
        assert_eq!(row.note, "");
    }
}
