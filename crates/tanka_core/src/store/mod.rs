//! Authoritative in-memory collections of entries and series.
//!
//! # Responsibility
//! - Own both collections and every operation that mutates them together.
//! - Keep entry `series_id` fields and series member lists consistent.
//!
//! # Invariants
//! - Entry ids are unique; series ids are unique.
//! - A non-empty `series_id` names an existing series listing the entry
//!   exactly once, and every listed id names an existing entry.
//! - Membership is exclusive: listing an entry in one series removes it from
//!   any other.
//! - Entries are never removed by this type.

mod query;

pub use query::{sort_newest_first, EntryQuery};

use crate::interchange::format::CsvFormat;
use crate::interchange::mapper::MappedBatch;
use crate::model::entry::{Entry, EntryValidationError};
use crate::model::series::Series;
use chrono::NaiveDate;
use log::warn;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Store operation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Referenced series id is unknown. Plain edits never create series.
    SeriesNotFound(String),
    /// Series name is blank after trim.
    InvalidSeriesName,
    Validation(EntryValidationError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SeriesNotFound(id) => write!(f, "series not found: {id}"),
            Self::InvalidSeriesName => write!(f, "series name must not be blank"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EntryValidationError> for StoreError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Whether `upsert_entry` created or replaced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Effect of one deck save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckChange {
    /// Entries newly linked to the series.
    pub added: Vec<String>,
    /// Entries unlinked from the series; their `series_id` is now empty.
    pub removed: Vec<String>,
    /// Requested ids that name no entry and were ignored.
    pub unknown: Vec<String>,
}

/// Outcome counts of one import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub format: CsvFormat,
    pub imported: usize,
    /// Entries skipped because their id already existed.
    pub duplicates: usize,
    pub blank_rows: usize,
    /// Entries skipped because they failed validation (e.g. empty id).
    pub rejected: usize,
    pub series_created: usize,
}

/// One broken link found by `integrity_issues`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    DuplicateEntryId(String),
    DuplicateSeriesId(String),
    /// Entry names a series that does not exist.
    MissingSeries { entry_id: String, series_id: String },
    /// Entry names a series that does not list it exactly once.
    MembershipMismatch { entry_id: String, series_id: String },
    /// Series lists an id that names no entry.
    DanglingMember { series_id: String, entry_id: String },
    /// Series lists an entry whose `series_id` points elsewhere.
    ForeignMember { series_id: String, entry_id: String },
    /// Entry fails shape validation (id, line count, tags).
    InvalidEntry(String),
}

/// Entries and series with cross-collection invariants enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Store {
    entries: Vec<Entry>,
    series: Vec<Series>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from persisted collections, repairing broken links.
    ///
    /// Duplicate ids keep their first record. Dangling or foreign member ids
    /// are dropped, unknown `series_id` values are cleared, and missing
    /// memberships are restored. An entry with an empty `series_id` listed by
    /// a series is claimed by the first series listing it.
    pub fn from_parts(entries: Vec<Entry>, series: Vec<Series>) -> Self {
        let mut store = Self::default();
        let mut repairs = 0usize;

        let mut seen_entries = HashSet::new();
        for mut entry in entries {
            if entry.id.is_empty() || !seen_entries.insert(entry.id.clone()) {
                repairs += 1;
                continue;
            }
            entry.normalize();
            store.entries.push(entry);
        }

        let mut pending_members = Vec::new();
        for mut series in series {
            if series.id.is_empty() || store.series_index(&series.id).is_some() {
                repairs += 1;
                continue;
            }
            pending_members.push(std::mem::take(&mut series.entries));
            store.series.push(series);
        }

        for (series_idx, members) in pending_members.into_iter().enumerate() {
            for member in members {
                let Some(entry_idx) = store.entry_index(&member) else {
                    repairs += 1;
                    continue;
                };
                let series_id = store.series[series_idx].id.clone();
                let entry = &mut store.entries[entry_idx];
                if entry.series_id.is_empty() {
                    entry.series_id = series_id;
                } else if entry.series_id != series_id {
                    repairs += 1;
                    continue;
                }
                if !store.series[series_idx].push_unique(&member) {
                    repairs += 1;
                }
            }
        }

        for entry_idx in 0..store.entries.len() {
            let series_id = store.entries[entry_idx].series_id.clone();
            if series_id.is_empty() {
                continue;
            }
            match store.series_index(&series_id) {
                Some(series_idx) => {
                    let entry_id = store.entries[entry_idx].id.clone();
                    if store.series[series_idx].push_unique(&entry_id) {
                        repairs += 1;
                    }
                }
                None => {
                    store.entries[entry_idx].series_id.clear();
                    repairs += 1;
                }
            }
        }

        if repairs > 0 {
            warn!(
                "event=store_repair module=store status=warn repairs={} entries={} series={}",
                repairs,
                store.entries.len(),
                store.series.len()
            );
        }
        store
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// All series in insertion order.
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn entry(&self, id: &str) -> Option<&Entry> {
        self.entry_index(id).map(|idx| &self.entries[idx])
    }

    pub fn series_by_id(&self, id: &str) -> Option<&Series> {
        self.series_index(id).map(|idx| &self.series[idx])
    }

    /// Inserts a new entry or replaces an existing one in place.
    ///
    /// The previous series is taken from the stored record. When it differs
    /// from the new `series_id`, the entry leaves the old list; the new
    /// series lists it exactly once.
    ///
    /// # Errors
    /// - `SeriesNotFound` when `series_id` names no series.
    /// - `Validation` when the entry has an empty id or blank tags.
    pub fn upsert_entry(&mut self, mut entry: Entry) -> Result<UpsertOutcome, StoreError> {
        entry.normalize();
        entry.validate()?;
        if entry.has_series() && self.series_index(&entry.series_id).is_none() {
            return Err(StoreError::SeriesNotFound(entry.series_id));
        }

        let entry_id = entry.id.clone();
        let next_series = entry.series_id.clone();
        let (outcome, previous_series) = match self.entry_index(&entry_id) {
            Some(idx) => {
                let previous = std::mem::replace(&mut self.entries[idx], entry);
                (UpsertOutcome::Updated, previous.series_id)
            }
            None => {
                self.entries.push(entry);
                (UpsertOutcome::Inserted, String::new())
            }
        };

        if !previous_series.is_empty() && previous_series != next_series {
            self.detach(&entry_id, &previous_series);
        }
        if !next_series.is_empty() {
            self.attach(&entry_id, &next_series);
        }
        Ok(outcome)
    }

    /// Returns the series `id`, creating an empty one named `fallback_name`
    /// when unknown.
    pub fn ensure_series(&mut self, id: &str, fallback_name: &str) -> &mut Series {
        let idx = match self.series_index(id) {
            Some(idx) => idx,
            None => {
                self.series.push(Series::new(id, fallback_name, 0));
                self.series.len() - 1
            }
        };
        &mut self.series[idx]
    }

    /// Creates an empty series with a fresh id.
    pub fn create_series(
        &mut self,
        name: &str,
        plan_count: u32,
    ) -> Result<Series, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidSeriesName);
        }
        let series = Series::new(format!("series-{}", Uuid::new_v4()), name, plan_count);
        self.series.push(series.clone());
        Ok(series)
    }

    /// Replaces a series' member list wholesale.
    ///
    /// Duplicates are collapsed (first occurrence wins) and unknown ids are
    /// dropped. Entries leaving the list get an empty `series_id`; entries
    /// joining it get this `series_id` and leave their former series.
    pub fn set_deck_membership(
        &mut self,
        series_id: &str,
        ids: &[String],
    ) -> Result<DeckChange, StoreError> {
        let series_idx = self
            .series_index(series_id)
            .ok_or_else(|| StoreError::SeriesNotFound(series_id.to_string()))?;

        let mut change = DeckChange::default();
        let mut next: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            if next.contains(id) {
                continue;
            }
            if self.entry_index(id).is_none() {
                change.unknown.push(id.clone());
                continue;
            }
            next.push(id.clone());
        }

        let previous = std::mem::replace(&mut self.series[series_idx].entries, next.clone());
        for id in previous.iter().filter(|id| !next.contains(*id)) {
            if let Some(idx) = self.entry_index(id) {
                if self.entries[idx].series_id == series_id {
                    self.entries[idx].series_id.clear();
                }
            }
            change.removed.push(id.clone());
        }

        for id in &next {
            let Some(idx) = self.entry_index(id) else {
                continue;
            };
            let former = std::mem::replace(&mut self.entries[idx].series_id, series_id.to_string());
            if former != series_id {
                if !former.is_empty() {
                    self.detach(id, &former);
                }
                change.added.push(id.clone());
            } else if !previous.contains(id) {
                change.added.push(id.clone());
            }
        }

        Ok(change)
    }

    /// Entries matching `query`, newest first.
    pub fn query(&self, query: &EntryQuery) -> Vec<&Entry> {
        let mut matched: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|entry| query.matches(entry))
            .collect();
        sort_newest_first(&mut matched);
        matched
    }

    /// Entries dated on `day`, in insertion order.
    pub fn entries_on(&self, day: NaiveDate) -> Vec<&Entry> {
        let prefix = day.format("%Y-%m-%d").to_string();
        self.entries
            .iter()
            .filter(|entry| entry.date.starts_with(&prefix))
            .collect()
    }

    /// Merges mapped import records.
    ///
    /// Entries whose id already exists are skipped. Batch series are added
    /// when unknown; an entry naming an unknown series auto-creates one named
    /// after the id.
    pub fn import_merge(&mut self, batch: MappedBatch) -> ImportReport {
        let mut report = ImportReport {
            format: batch.format,
            imported: 0,
            duplicates: 0,
            blank_rows: batch.blank_rows,
            rejected: 0,
            series_created: 0,
        };

        for mut series in batch.series {
            if self.series_index(&series.id).is_none() {
                series.entries.clear();
                self.series.push(series);
                report.series_created += 1;
            }
        }

        let mut known: HashSet<String> = self.entries.iter().map(|entry| entry.id.clone()).collect();
        for mut entry in batch.entries {
            entry.normalize();
            if entry.validate().is_err() {
                report.rejected += 1;
                continue;
            }
            if !known.insert(entry.id.clone()) {
                report.duplicates += 1;
                continue;
            }
            if entry.has_series() {
                let series_id = entry.series_id.clone();
                if self.series_index(&series_id).is_none() {
                    report.series_created += 1;
                }
                self.ensure_series(&series_id, &series_id)
                    .push_unique(&entry.id);
            }
            self.entries.push(entry);
            report.imported += 1;
        }

        report
    }

    /// Lists every invariant violation; empty when the store is consistent.
    pub fn integrity_issues(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.id.as_str()) {
                issues.push(IntegrityIssue::DuplicateEntryId(entry.id.clone()));
            }
            if entry.validate().is_err() {
                issues.push(IntegrityIssue::InvalidEntry(entry.id.clone()));
            }
            if entry.has_series() {
                match self.series_by_id(&entry.series_id) {
                    None => issues.push(IntegrityIssue::MissingSeries {
                        entry_id: entry.id.clone(),
                        series_id: entry.series_id.clone(),
                    }),
                    Some(series) => {
                        let listed = series.entries.iter().filter(|id| **id == entry.id).count();
                        if listed != 1 {
                            issues.push(IntegrityIssue::MembershipMismatch {
                                entry_id: entry.id.clone(),
                                series_id: series.id.clone(),
                            });
                        }
                    }
                }
            }
        }

        let mut seen_series = HashSet::new();
        for series in &self.series {
            if !seen_series.insert(series.id.as_str()) {
                issues.push(IntegrityIssue::DuplicateSeriesId(series.id.clone()));
            }
            for member in &series.entries {
                match self.entry(member) {
                    None => issues.push(IntegrityIssue::DanglingMember {
                        series_id: series.id.clone(),
                        entry_id: member.clone(),
                    }),
                    Some(entry) if entry.series_id != series.id => {
                        issues.push(IntegrityIssue::ForeignMember {
                            series_id: series.id.clone(),
                            entry_id: member.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        issues
    }

    fn entry_index(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    fn series_index(&self, id: &str) -> Option<usize> {
        self.series.iter().position(|series| series.id == id)
    }

    fn attach(&mut self, entry_id: &str, series_id: &str) {
        if let Some(idx) = self.series_index(series_id) {
            self.series[idx].push_unique(entry_id);
        }
    }

    fn detach(&mut self, entry_id: &str, series_id: &str) {
        if let Some(idx) = self.series_index(series_id) {
            self.series[idx].remove(entry_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Store, StoreError, UpsertOutcome};
    use crate::model::entry::Entry;
    use crate::model::series::Series;
    use chrono::NaiveDate;

    fn entry(id: &str) -> Entry {
        Entry::new(id, "2024-01-01", vec![format!("poem {id}")])
    }

    #[test]
    fn upsert_moves_entry_between_series() {
        let mut store = Store::new();
        let first = store.create_series("first", 0).unwrap();
        let second = store.create_series("second", 0).unwrap();

        let mut item = entry("a");
        item.series_id = first.id.clone();
        assert_eq!(store.upsert_entry(item.clone()).unwrap(), UpsertOutcome::Inserted);

        item.series_id = second.id.clone();
        assert_eq!(store.upsert_entry(item).unwrap(), UpsertOutcome::Updated);

        assert!(store.series_by_id(&first.id).unwrap().entries.is_empty());
        assert_eq!(store.series_by_id(&second.id).unwrap().entries, vec!["a"]);
        assert!(store.integrity_issues().is_empty());
    }

    #[test]
    fn upsert_rejects_unknown_series_without_creating_it() {
        let mut store = Store::new();
        let mut item = entry("a");
        item.series_id = "ghost".to_string();

        let err = store.upsert_entry(item).unwrap_err();
        assert_eq!(err, StoreError::SeriesNotFound("ghost".to_string()));
        assert!(store.series().is_empty());
        assert!(store.entries().is_empty());
    }

    #[test]
    fn from_parts_repairs_dangling_and_stale_links() {
        let mut stale = entry("stale");
        stale.series_id = "missing".to_string();
        let mut claimed = entry("claimed");
        claimed.series_id = "s1".to_string();
        let unlisted = entry("unlisted");

        let mut series = Series::new("s1", "spring", 0);
        series.entries = vec!["ghost".to_string(), "unlisted".to_string()];

        let store = Store::from_parts(vec![stale, claimed, unlisted], vec![series]);

        assert!(store.integrity_issues().is_empty());
        assert!(store.entry("stale").unwrap().series_id.is_empty());
        assert_eq!(store.entry("unlisted").unwrap().series_id, "s1");
        assert_eq!(
            store.series_by_id("s1").unwrap().entries,
            vec!["unlisted", "claimed"]
        );
    }

    #[test]
    fn create_series_rejects_blank_name() {
        let mut store = Store::new();
        assert_eq!(
            store.create_series("  ", 3).unwrap_err(),
            StoreError::InvalidSeriesName
        );
    }

    #[test]
    fn entries_on_matches_dates_and_timestamps_of_one_day() {
        let mut store = Store::new();
        store.upsert_entry(entry("a")).unwrap();
        store
            .upsert_entry(Entry::new("b", "2024-01-01T21:00:00.000Z", vec!["b".to_string()]))
            .unwrap();
        store
            .upsert_entry(Entry::new("c", "2024-01-02", vec!["c".to_string()]))
            .unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let ids: Vec<&str> = store
            .entries_on(day)
            .into_iter()
            .map(|entry| entry.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
