//! Row-to-record mapping for each CSV schema.
//!
//! # Responsibility
//! - Turn decoded rows into `Entry`/`Series` records per detected schema.
//! - Synthesize ids for legacy rows, which carry none.
//!
//! # Invariants
//! - Row 0 is the header and is never mapped.
//! - Rows whose cells are all blank are skipped and counted.
//! - Synthesized ids are unique within one batch.
//! - Every produced entry has exactly five lines.

use crate::interchange::csv_codec::decode;
use crate::interchange::dates::{normalize_dashed, normalize_era};
use crate::interchange::format::{detect_format, CsvFormat};
use crate::model::entry::{clean_tags, lines_from_text, pad_lines, Entry, EntryStatus};
use crate::model::series::Series;
use chrono::Utc;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

/// Completion-cell placeholder meaning "not finished" in legacy exports.
pub const LEGACY_INCOMPLETE_MARKER: &str = "(未完成)";

/// First legacy series column holding a poem.
const LEGACY_SERIES_FIRST_POEM_COLUMN: usize = 4;

static LEGACY_LABEL_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,;\s、]+").expect("valid label split regex"));

/// Per-import parameters shared by every row of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportContext {
    /// Epoch milliseconds used as the id prefix for synthesized records.
    pub batch_stamp: i64,
}

impl ImportContext {
    /// Context stamped with the current wall-clock time.
    pub fn now() -> Self {
        Self {
            batch_stamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn with_stamp(batch_stamp: i64) -> Self {
        Self { batch_stamp }
    }

    fn row_id(&self, row_index: usize) -> String {
        format!("import-{}-{row_index}", self.batch_stamp)
    }

    fn series_id(&self, row_index: usize) -> String {
        format!("series-{}-{row_index}", self.batch_stamp)
    }
}

/// Records produced from one CSV file, not yet merged into a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedBatch {
    pub format: CsvFormat,
    /// Entries in row (then column) order.
    pub entries: Vec<Entry>,
    /// Series created by the file, with member ids in column order.
    pub series: Vec<Series>,
    /// Data rows skipped because every cell was blank.
    pub blank_rows: usize,
}

impl MappedBatch {
    fn empty(format: CsvFormat) -> Self {
        Self {
            format,
            entries: Vec::new(),
            series: Vec::new(),
            blank_rows: 0,
        }
    }
}

/// Decodes, classifies and maps CSV text in one step.
pub fn map_text(text: &str, ctx: &ImportContext) -> MappedBatch {
    let rows = decode(text);
    let format = rows
        .first()
        .map(|header| detect_format(header.as_slice()))
        .unwrap_or(CsvFormat::Native);
    map_rows(format, &rows, ctx)
}

/// Maps decoded rows (header included) using the given schema.
pub fn map_rows(format: CsvFormat, rows: &[Vec<String>], ctx: &ImportContext) -> MappedBatch {
    let mut batch = MappedBatch::empty(format);
    for (row_index, row) in rows.iter().enumerate().skip(1) {
        if is_blank_row(row) {
            batch.blank_rows += 1;
            continue;
        }
        match format {
            CsvFormat::Native => batch.entries.push(map_native_row(row, row_index, ctx)),
            CsvFormat::LegacyEntry => batch
                .entries
                .push(map_legacy_entry_row(row, row_index, ctx)),
            CsvFormat::LegacySeries => {
                let (series, entries) = map_legacy_series_row(row, row_index, ctx);
                batch.entries.extend(entries);
                batch.series.push(series);
            }
        }
    }
    batch
}

/// Splits a native `;`-joined tags cell.
pub fn split_native_tags(cell: &str) -> Vec<String> {
    clean_tags(cell.split(';').map(str::to_string))
}

/// Splits a legacy labels cell on runs of `,` `;` whitespace or `、`.
pub fn split_legacy_labels(cell: &str) -> Vec<String> {
    clean_tags(LEGACY_LABEL_SPLIT_RE.split(cell).map(str::to_string))
}

fn map_native_row(row: &[String], row_index: usize, ctx: &ImportContext) -> Entry {
    let id = match cell(row, 0) {
        "" => ctx.row_id(row_index),
        id => id.to_string(),
    };
    let status_cell = cell(row, 11);
    let status = if status_cell.trim().is_empty() {
        EntryStatus::Unpublished
    } else {
        EntryStatus::parse(status_cell).unwrap_or_else(|| {
            warn!(
                "event=csv_map module=interchange status=warn format=native row={} reason=unknown_status",
                row_index
            );
            EntryStatus::Unpublished
        })
    };

    Entry {
        id,
        date: cell(row, 1).to_string(),
        lines: pad_lines((2..7).map(|idx| cell(row, idx).to_string())),
        tags: split_native_tags(cell(row, 7)),
        category: cell(row, 8).to_string(),
        series_id: cell(row, 9).to_string(),
        memo: cell(row, 10).to_string(),
        status,
    }
}

fn map_legacy_entry_row(row: &[String], row_index: usize, ctx: &ImportContext) -> Entry {
    let created = cell(row, 3);
    let updated = cell(row, 4);
    let completed = cell(row, 5).trim();
    let date = first_non_empty(created, updated);
    let status = if !completed.is_empty() && completed != LEGACY_INCOMPLETE_MARKER {
        EntryStatus::Published
    } else {
        EntryStatus::Unpublished
    };

    Entry {
        id: ctx.row_id(row_index),
        date: normalize_era(date),
        lines: lines_from_text(cell(row, 0)),
        tags: split_legacy_labels(cell(row, 2)),
        category: String::new(),
        series_id: String::new(),
        memo: cell(row, 1).to_string(),
        status,
    }
}

fn map_legacy_series_row(
    row: &[String],
    row_index: usize,
    ctx: &ImportContext,
) -> (Series, Vec<Entry>) {
    let series_id = ctx.series_id(row_index);
    let name = match cell(row, 0) {
        "" => series_id.clone(),
        name => name.to_string(),
    };
    let date = normalize_dashed(first_non_empty(cell(row, 2), cell(row, 3)));
    let mut series = Series::new(series_id.clone(), name, 0);
    let mut entries = Vec::new();

    for (column, poem) in row.iter().enumerate().skip(LEGACY_SERIES_FIRST_POEM_COLUMN) {
        if poem.trim().is_empty() {
            continue;
        }
        let offset = column + 1 - LEGACY_SERIES_FIRST_POEM_COLUMN;
        let mut entry = Entry::new(
            format!("import-{series_id}-{offset}"),
            date.clone(),
            lines_from_text(poem),
        );
        entry.series_id = series_id.clone();
        series.push_unique(&entry.id);
        entries.push(entry);
    }

    (series, entries)
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

fn first_non_empty<'a>(primary: &'a str, fallback: &'a str) -> &'a str {
    if primary.is_empty() {
        fallback
    } else {
        primary
    }
}

fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}
