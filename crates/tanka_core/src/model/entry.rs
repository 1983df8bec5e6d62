//! Entry domain model.
//!
//! # Responsibility
//! - Define the five-line poem record and its publication status.
//! - Normalize raw line/tag input into the canonical shape.
//!
//! # Invariants
//! - `lines.len() == LINE_COUNT` for every validated entry.
//! - `tags` never contains blank values.
//! - An empty `series_id` means the entry is unassigned.

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Number of lines every entry carries.
pub const LINE_COUNT: usize = 5;

/// Publication state of one entry.
///
/// Stored blobs may carry any text here (older imports copied the CSV cell
/// verbatim); decoding goes through `from_stored` and never fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Draft or not yet shared anywhere.
    #[default]
    Unpublished,
    /// Marked as completed/published.
    Published,
}

impl EntryStatus {
    /// Returns the wire string used by CSV and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unpublished => "unpublished",
            Self::Published => "published",
        }
    }

    /// Parses a wire string case-insensitively.
    ///
    /// Returns `None` for anything other than `unpublished|published`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unpublished" => Some(Self::Unpublished),
            "published" => Some(Self::Published),
            _ => None,
        }
    }

    /// Reads a persisted status; unknown or missing text is `Unpublished`.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            None => Self::Unpublished,
            Some(text) => Self::parse(text).unwrap_or_else(|| {
                if !text.trim().is_empty() {
                    warn!("event=entry_decode module=model status=warn reason=unknown_status");
                }
                Self::Unpublished
            }),
        }
    }
}

impl<'de> Deserialize<'de> for EntryStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from_stored(raw.as_deref()))
    }
}

impl Display for EntryStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors for entry shape invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValidationError {
    /// Entry id is empty.
    EmptyId,
    /// Line vector does not have exactly `LINE_COUNT` items.
    WrongLineCount(usize),
    /// A tag is blank after trimming.
    BlankTag,
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "entry id must not be empty"),
            Self::WrongLineCount(count) => {
                write!(f, "entry must have exactly {LINE_COUNT} lines, got {count}")
            }
            Self::BlankTag => write!(f, "entry tags must not be blank"),
        }
    }
}

impl Error for EntryValidationError {}

/// One poem record.
///
/// Serialized with camelCase field names so blobs written by the
/// predecessor tool (`seriesId`) decode unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Opaque unique id.
    #[serde(default)]
    pub id: String,
    /// `YYYY-MM-DD` for imported entries, RFC 3339 for native ones; empty
    /// when the source row had no date.
    #[serde(default)]
    pub date: String,
    /// Always `LINE_COUNT` items; missing lines are empty strings.
    #[serde(default)]
    pub lines: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: String,
    /// Owning series id, or empty when unassigned.
    #[serde(default)]
    pub series_id: String,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub status: EntryStatus,
}

impl Entry {
    /// Creates an unassigned, unpublished entry with padded lines.
    pub fn new(
        id: impl Into<String>,
        date: impl Into<String>,
        lines: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            id: id.into(),
            date: date.into(),
            lines: pad_lines(lines),
            tags: Vec::new(),
            category: String::new(),
            series_id: String::new(),
            memo: String::new(),
            status: EntryStatus::Unpublished,
        }
    }

    /// Checks shape invariants without mutating.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if self.id.is_empty() {
            return Err(EntryValidationError::EmptyId);
        }
        if self.lines.len() != LINE_COUNT {
            return Err(EntryValidationError::WrongLineCount(self.lines.len()));
        }
        if self.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(EntryValidationError::BlankTag);
        }
        Ok(())
    }

    /// Pads/truncates lines and drops blank tags in place.
    pub fn normalize(&mut self) {
        let lines = std::mem::take(&mut self.lines);
        self.lines = pad_lines(lines);
        let tags = std::mem::take(&mut self.tags);
        self.tags = clean_tags(tags);
    }

    /// Returns whether this entry belongs to a series.
    pub fn has_series(&self) -> bool {
        !self.series_id.is_empty()
    }

    /// First line, used as a title by list views.
    pub fn title(&self) -> &str {
        self.lines.first().map(String::as_str).unwrap_or("")
    }
}

/// Pads with empty strings or truncates to exactly `LINE_COUNT` lines.
pub fn pad_lines(lines: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut padded: Vec<String> = lines.into_iter().take(LINE_COUNT).collect();
    padded.resize(LINE_COUNT, String::new());
    padded
}

/// Splits multi-line poem text on `\n` / `\r\n` and pads to `LINE_COUNT`.
///
/// Line content is kept as-is (no trimming).
pub fn lines_from_text(text: &str) -> Vec<String> {
    pad_lines(
        text.split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string()),
    )
}

/// Trims tags and drops empty values. Order and duplicates are kept.
pub fn clean_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    tags.into_iter()
        .filter_map(|tag| {
            let trimmed = tag.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect()
}

/// Returns `true` when every line is blank after trimming.
///
/// Manual submissions with no content must be rejected by callers.
pub fn is_blank_submission(lines: &[String]) -> bool {
    lines.iter().all(|line| line.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::{
        clean_tags, is_blank_submission, lines_from_text, Entry, EntryStatus,
        EntryValidationError, LINE_COUNT,
    };

    #[test]
    fn lines_from_text_pads_and_truncates() {
        let short = lines_from_text("one\r\ntwo");
        assert_eq!(short, vec!["one", "two", "", "", ""]);

        let long = lines_from_text("1\n2\n3\n4\n5\n6\n7");
        assert_eq!(long.len(), LINE_COUNT);
        assert_eq!(long[4], "5");
    }

    #[test]
    fn clean_tags_keeps_order_and_duplicates() {
        let tags = clean_tags(vec![
            " spring ".to_string(),
            "".to_string(),
            "sea".to_string(),
            "spring".to_string(),
        ]);
        assert_eq!(tags, vec!["spring", "sea", "spring"]);
    }

    #[test]
    fn blank_submission_detects_whitespace_only_lines() {
        assert!(is_blank_submission(&["  ".to_string(), String::new()]));
        assert!(!is_blank_submission(&["".to_string(), "x".to_string()]));
    }

    #[test]
    fn validate_rejects_wrong_line_count_and_blank_tags() {
        let mut entry = Entry::new("a", "2024-01-01", vec!["x".to_string()]);
        assert_eq!(entry.validate(), Ok(()));

        entry.lines.pop();
        assert_eq!(
            entry.validate(),
            Err(EntryValidationError::WrongLineCount(4))
        );

        entry.normalize();
        entry.tags.push(" ".to_string());
        assert_eq!(entry.validate(), Err(EntryValidationError::BlankTag));
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(EntryStatus::parse("Published"), Some(EntryStatus::Published));
        assert_eq!(EntryStatus::parse(" unpublished "), Some(EntryStatus::Unpublished));
        assert_eq!(EntryStatus::parse("draft"), None);
    }

    #[test]
    fn stored_status_decodes_leniently() {
        let decoded: Vec<EntryStatus> =
            serde_json::from_str(r#"["Published", "draft", null, "unpublished"]"#).unwrap();
        assert_eq!(
            decoded,
            vec![
                EntryStatus::Published,
                EntryStatus::Unpublished,
                EntryStatus::Unpublished,
                EntryStatus::Unpublished,
            ]
        );
        assert_eq!(
            serde_json::to_string(&EntryStatus::Published).unwrap(),
            r#""published""#
        );
    }

    #[test]
    fn entry_without_date_or_status_decodes_with_defaults() {
        let entry: Entry = serde_json::from_str(r#"{"id":"a","lines":["x"]}"#).unwrap();
        assert!(entry.date.is_empty());
        assert_eq!(entry.status, EntryStatus::Unpublished);
        assert!(entry.series_id.is_empty());
    }
}
