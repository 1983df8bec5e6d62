//! Header-based schema detection.
//!
//! # Responsibility
//! - Classify a decoded header row as one of the three known schemas.
//!
//! # Invariants
//! - Detection is a closed lookup: anything that is not a legacy header is
//!   treated as the native schema.

use std::fmt::{Display, Formatter};

/// Column labels of the native schema, in order.
pub const NATIVE_HEADER: [&str; 12] = [
    "id", "date", "line1", "line2", "line3", "line4", "line5", "tags", "category", "seriesId",
    "memo", "status",
];

/// First header cell of legacy entry exports.
pub const LEGACY_ENTRY_POEM_LABEL: &str = "短歌";
/// Header cell that must also be present in legacy entry exports.
pub const LEGACY_ENTRY_MEMO_LABEL: &str = "メモ";
/// First header cell of legacy series exports.
pub const LEGACY_SERIES_NAME_LABEL: &str = "連作名";
/// Header cell that must also be present in legacy series exports.
pub const LEGACY_SERIES_DESCRIPTION_LABEL: &str = "説明";

/// Known CSV schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsvFormat {
    /// Round-trip schema written by `export`.
    Native,
    /// Predecessor tool's per-poem export.
    LegacyEntry,
    /// Predecessor tool's per-series export.
    LegacySeries,
}

impl CsvFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::LegacyEntry => "legacy_entry",
            Self::LegacySeries => "legacy_series",
        }
    }
}

impl Display for CsvFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a header row.
///
/// Cells are compared after dropping a UTF-8 BOM and surrounding whitespace.
pub fn detect_format<S: AsRef<str>>(header: &[S]) -> CsvFormat {
    let cells: Vec<&str> = header.iter().map(|cell| header_cell(cell.as_ref())).collect();
    let first = cells.first().copied().unwrap_or("");
    let has = |label: &str| cells.iter().any(|cell| *cell == label);

    if first == LEGACY_ENTRY_POEM_LABEL && has(LEGACY_ENTRY_MEMO_LABEL) {
        CsvFormat::LegacyEntry
    } else if first == LEGACY_SERIES_NAME_LABEL && has(LEGACY_SERIES_DESCRIPTION_LABEL) {
        CsvFormat::LegacySeries
    } else {
        CsvFormat::Native
    }
}

fn header_cell(cell: &str) -> &str {
    cell.trim_start_matches('\u{feff}').trim()
}
