//! Entry/series collection persistence on top of a `BlobStore`.
//!
//! # Invariants
//! - Entries live in blob `ENTRIES_BLOB`, series in `SERIES_BLOB`, each as a
//!   JSON array.
//! - A missing blob loads as an empty collection.

use crate::model::entry::Entry;
use crate::model::series::Series;
use crate::repo::blob_repo::{BlobStore, PersistenceError, PersistenceResult};
use log::{error, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Instant;

/// Blob name holding the entry array.
pub const ENTRIES_BLOB: &str = "tankaEntries";
/// Blob name holding the series array.
pub const SERIES_BLOB: &str = "seriesList";

/// Both collections as loaded from storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collections {
    pub entries: Vec<Entry>,
    pub series: Vec<Series>,
}

/// Reads both collection blobs in full.
pub fn load_collections<B: BlobStore>(blobs: &B) -> PersistenceResult<Collections> {
    let started_at = Instant::now();
    let result = load_array::<Entry, _>(blobs, ENTRIES_BLOB).and_then(|entries| {
        load_array::<Series, _>(blobs, SERIES_BLOB).map(|series| Collections { entries, series })
    });

    match &result {
        Ok(collections) => info!(
            "event=blob_load module=repo status=ok entries={} series={} duration_ms={}",
            collections.entries.len(),
            collections.series.len(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=blob_load module=repo status=error duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

/// Writes both collection blobs in full.
///
/// Both bodies are serialized before anything is written.
pub fn save_collections<B: BlobStore>(
    blobs: &mut B,
    entries: &[Entry],
    series: &[Series],
) -> PersistenceResult<()> {
    let started_at = Instant::now();
    let entries_body = to_body(ENTRIES_BLOB, entries)?;
    let series_body = to_body(SERIES_BLOB, series)?;

    let result = blobs.set_blobs(&[
        (ENTRIES_BLOB, entries_body.as_str()),
        (SERIES_BLOB, series_body.as_str()),
    ]);
    match &result {
        Ok(()) => info!(
            "event=blob_save module=repo status=ok entries={} series={} duration_ms={}",
            entries.len(),
            series.len(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=blob_save module=repo status=error duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn load_array<T: DeserializeOwned, B: BlobStore>(
    blobs: &B,
    name: &str,
) -> PersistenceResult<Vec<T>> {
    match blobs.get_blob(name)? {
        Some(body) if !body.trim().is_empty() => {
            serde_json::from_str(&body).map_err(|source| PersistenceError::CorruptBlob {
                blob: name.to_string(),
                source,
            })
        }
        _ => Ok(Vec::new()),
    }
}

fn to_body<T: Serialize>(name: &str, values: &[T]) -> PersistenceResult<String> {
    serde_json::to_string(values).map_err(|source| PersistenceError::Serialize {
        blob: name.to_string(),
        source,
    })
}
