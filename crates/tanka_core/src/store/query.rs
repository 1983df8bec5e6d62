//! Entry filtering and ordering.
//!
//! # Invariants
//! - Blank filter values are ignored rather than matching nothing.
//! - Results are ordered by date descending; equal or unparseable dates keep
//!   insertion order, with undated entries last.

use crate::interchange::dates::date_sort_key;
use crate::model::entry::{Entry, EntryStatus};

/// Conjunctive entry filter. `None` or blank fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    /// Case-sensitive substring of any line or the memo.
    pub keyword: Option<String>,
    /// Case-insensitive substring of any tag.
    pub tag: Option<String>,
    /// Case-insensitive substring of the category.
    pub category: Option<String>,
    pub status: Option<EntryStatus>,
}

impl EntryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(mut self, value: impl Into<String>) -> Self {
        self.keyword = Some(value.into());
        self
    }

    pub fn tag(mut self, value: impl Into<String>) -> Self {
        self.tag = Some(value.into());
        self
    }

    pub fn category(mut self, value: impl Into<String>) -> Self {
        self.category = Some(value.into());
        self
    }

    pub fn status(mut self, value: EntryStatus) -> Self {
        self.status = Some(value);
        self
    }

    /// Returns whether `entry` satisfies every supplied predicate.
    pub fn matches(&self, entry: &Entry) -> bool {
        if let Some(keyword) = active(&self.keyword) {
            let in_lines = entry.lines.iter().any(|line| line.contains(keyword));
            if !in_lines && !entry.memo.contains(keyword) {
                return false;
            }
        }
        if let Some(tag) = active(&self.tag) {
            let needle = tag.to_lowercase();
            if !entry
                .tags
                .iter()
                .any(|value| value.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        if let Some(category) = active(&self.category) {
            if !entry
                .category
                .to_lowercase()
                .contains(&category.to_lowercase())
            {
                return false;
            }
        }
        if let Some(status) = self.status {
            if entry.status != status {
                return false;
            }
        }
        true
    }
}

/// Stable sort by date, newest first.
pub fn sort_newest_first(entries: &mut [&Entry]) {
    entries.sort_by_cached_key(|entry| std::cmp::Reverse(date_sort_key(&entry.date)));
}

fn active(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
}
