//! Core domain logic for the tanka collection.
//! This crate owns CSV interchange, the entry/series store and its
//! persistence; it is the single source of truth for collection invariants.

pub mod db;
pub mod interchange;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use interchange::csv_codec::{decode as decode_csv, encode as encode_csv, CsvEncodeError};
pub use interchange::dates::{normalize_dashed, normalize_era};
pub use interchange::format::{detect_format, CsvFormat, NATIVE_HEADER};
pub use interchange::mapper::{map_rows, map_text, ImportContext, MappedBatch};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entry::{is_blank_submission, Entry, EntryStatus, EntryValidationError, LINE_COUNT};
pub use model::series::{Series, SeriesProgress};
pub use repo::blob_repo::{
    BlobStore, MemoryBlobStore, PersistenceError, PersistenceResult, SqliteBlobStore,
};
pub use service::collection_service::{CollectionService, EntryDraft, ServiceError};
pub use store::{
    DeckChange, EntryQuery, ImportReport, IntegrityIssue, Store, StoreError, UpsertOutcome,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
