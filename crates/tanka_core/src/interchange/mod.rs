//! CSV interchange with the native schema and two legacy schemas.
//!
//! # Responsibility
//! - Tokenize and encode CSV text (`csv_codec`).
//! - Normalize legacy date spellings (`dates`).
//! - Classify a header row into one schema (`format`).
//! - Map decoded rows into domain records and back (`mapper`, `export`).
//!
//! # Invariants
//! - Decoding never fails; malformed quoting yields a best-effort row.
//! - Mapping never touches the store; merging is the store's job.

pub mod csv_codec;
pub mod dates;
pub mod export;
pub mod format;
pub mod mapper;
