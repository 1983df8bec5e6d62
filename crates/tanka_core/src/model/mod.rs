//! Domain model for poem entries and the series that group them.
//!
//! # Responsibility
//! - Define the canonical `Entry` and `Series` records shared by import,
//!   export and store code.
//! - Provide small normalization helpers for lines and tags.
//!
//! # Invariants
//! - An entry always carries exactly `LINE_COUNT` lines.
//! - Tags are non-empty after trimming.
//! - A series lists each entry id at most once.

pub mod entry;
pub mod series;
