//! Collection use-case service.
//!
//! # Responsibility
//! - Provide submit/edit, series creation, deck save, import and export
//!   entry points over one `Store`.
//! - Persist both collections after every successful mutation.
//!
//! # Invariants
//! - Each mutation is applied to a copy of the store; the live store is
//!   replaced only after the copy has been saved.
//! - A failed save leaves the in-memory state unchanged and returns
//!   `ServiceError::Persistence`.
//! - Blank submissions are rejected before touching the store.

use crate::interchange::csv_codec::CsvEncodeError;
use crate::interchange::export::export_native;
use crate::interchange::mapper::{map_text, ImportContext};
use crate::model::entry::{clean_tags, is_blank_submission, pad_lines, Entry, EntryStatus};
use crate::model::series::Series;
use crate::repo::blob_repo::{BlobStore, PersistenceError};
use crate::repo::collection_repo::{load_collections, save_collections};
use crate::store::{DeckChange, EntryQuery, ImportReport, Store, StoreError};
use chrono::{SecondsFormat, Utc};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Service error for collection use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Every poem line is blank.
    EmptySubmission,
    /// Entry selected for editing does not exist.
    EntryNotFound(String),
    Store(StoreError),
    Persistence(PersistenceError),
    Export(CsvEncodeError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySubmission => write!(f, "at least one line must be filled in"),
            Self::EntryNotFound(id) => write!(f, "entry not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
            Self::Export(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::Export(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<PersistenceError> for ServiceError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

impl From<CsvEncodeError> for ServiceError {
    fn from(value: CsvEncodeError) -> Self {
        Self::Export(value)
    }
}

/// Raw form input for creating or editing one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDraft {
    /// Poem text, one line per row.
    pub text: String,
    /// Comma-separated tag input.
    pub tags: String,
    pub category: String,
    /// Target series id, or empty for none.
    pub series_id: String,
    pub memo: String,
}

impl EntryDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Trimmed lines, before padding.
    fn trimmed_lines(&self) -> Vec<String> {
        self.text
            .split('\n')
            .map(|line| line.trim().to_string())
            .collect()
    }
}

/// Collection service facade over a blob store.
pub struct CollectionService<B: BlobStore> {
    blobs: B,
    store: Store,
}

impl<B: BlobStore> CollectionService<B> {
    /// Loads both collections and repairs broken links.
    pub fn load(blobs: B) -> Result<Self, ServiceError> {
        let collections = load_collections(&blobs)?;
        let store = Store::from_parts(collections.entries, collections.series);
        Ok(Self { blobs, store })
    }

    /// Read access to the current collections.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Returns the underlying blob store.
    pub fn into_blobs(self) -> B {
        self.blobs
    }

    /// Creates a new entry, or edits `editing_id` when given.
    ///
    /// Edits keep the entry's original date and status.
    ///
    /// # Errors
    /// - `EmptySubmission` when every line is blank.
    /// - `EntryNotFound` when `editing_id` is unknown.
    /// - `Store(SeriesNotFound)` when the draft names an unknown series.
    pub fn submit_entry(
        &mut self,
        draft: EntryDraft,
        editing_id: Option<&str>,
    ) -> Result<Entry, ServiceError> {
        let raw_lines = draft.trimmed_lines();
        if is_blank_submission(&raw_lines) {
            return Err(ServiceError::EmptySubmission);
        }

        let mut entry = match editing_id {
            Some(id) => self
                .store
                .entry(id)
                .cloned()
                .ok_or_else(|| ServiceError::EntryNotFound(id.to_string()))?,
            None => Entry::new(
                format!("tanka-{}", Uuid::new_v4()),
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                Vec::new(),
            ),
        };
        entry.lines = pad_lines(raw_lines);
        entry.tags = clean_tags(draft.tags.split(',').map(str::to_string));
        entry.category = draft.category.trim().to_string();
        entry.series_id = draft.series_id.trim().to_string();
        entry.memo = draft.memo.trim().to_string();

        let mut next = self.store.clone();
        let outcome = next.upsert_entry(entry.clone())?;
        self.commit(next, "entry_upsert")?;
        info!(
            "event=entry_upsert module=service status=ok outcome={:?} has_series={}",
            outcome,
            entry.has_series()
        );
        Ok(entry)
    }

    /// Sets the publication status of one entry.
    pub fn set_status(&mut self, entry_id: &str, status: EntryStatus) -> Result<Entry, ServiceError> {
        let mut entry = self
            .store
            .entry(entry_id)
            .cloned()
            .ok_or_else(|| ServiceError::EntryNotFound(entry_id.to_string()))?;
        entry.status = status;

        let mut next = self.store.clone();
        next.upsert_entry(entry.clone())?;
        self.commit(next, "entry_status")?;
        Ok(entry)
    }

    /// Creates an empty series.
    pub fn create_series(&mut self, name: &str, plan_count: u32) -> Result<Series, ServiceError> {
        let mut next = self.store.clone();
        let series = next.create_series(name, plan_count)?;
        self.commit(next, "series_create")?;
        Ok(series)
    }

    /// Replaces a series' members (deck save).
    pub fn save_deck(
        &mut self,
        series_id: &str,
        entry_ids: &[String],
    ) -> Result<DeckChange, ServiceError> {
        let mut next = self.store.clone();
        let change = next.set_deck_membership(series_id, entry_ids)?;
        self.commit(next, "deck_save")?;
        info!(
            "event=deck_save module=service status=ok added={} removed={} unknown={}",
            change.added.len(),
            change.removed.len(),
            change.unknown.len()
        );
        Ok(change)
    }

    /// Imports CSV text in any supported schema, stamped with the current time.
    pub fn import_csv(&mut self, text: &str) -> Result<ImportReport, ServiceError> {
        self.import_csv_with(text, &ImportContext::now())
    }

    /// Imports CSV text using an explicit batch context.
    pub fn import_csv_with(
        &mut self,
        text: &str,
        ctx: &ImportContext,
    ) -> Result<ImportReport, ServiceError> {
        let started_at = Instant::now();
        let batch = map_text(text, ctx);

        let mut next = self.store.clone();
        let report = next.import_merge(batch);
        self.commit(next, "csv_import")?;
        info!(
            "event=csv_import module=service status=ok format={} imported={} duplicates={} blank_rows={} rejected={} series_created={} duration_ms={}",
            report.format,
            report.imported,
            report.duplicates,
            report.blank_rows,
            report.rejected,
            report.series_created,
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    /// Exports every entry as native CSV.
    pub fn export_csv(&self) -> Result<String, ServiceError> {
        let text = export_native(self.store.entries())?;
        info!(
            "event=csv_export module=service status=ok entries={}",
            self.store.entries().len()
        );
        Ok(text)
    }

    /// Entries matching `query`, newest first.
    pub fn query(&self, query: &EntryQuery) -> Vec<&Entry> {
        self.store.query(query)
    }

    fn commit(&mut self, next: Store, operation: &'static str) -> Result<(), ServiceError> {
        if let Err(err) = save_collections(&mut self.blobs, next.entries(), next.series()) {
            error!(
                "event={} module=service status=error error_code=persist_failed error={}",
                operation, err
            );
            return Err(err.into());
        }
        self.store = next;
        Ok(())
    }
}
