//! Persistence contracts for the two collection blobs.
//!
//! # Responsibility
//! - Define the named-blob get/set contract the core persists through.
//! - Serialize entries and series to and from their JSON blobs.
//!
//! # Invariants
//! - Blobs are read and written whole; there are no partial updates.
//! - Persistence failures surface as `PersistenceError`, never silently.

pub mod blob_repo;
pub mod collection_repo;
