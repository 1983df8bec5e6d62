//! Native-schema export.

use crate::interchange::csv_codec::{encode, CsvEncodeError};
use crate::interchange::format::NATIVE_HEADER;
use crate::model::entry::Entry;

/// Flattens one entry into native-schema cells.
pub fn entry_to_row(entry: &Entry) -> Vec<String> {
    let mut row = Vec::with_capacity(NATIVE_HEADER.len());
    row.push(entry.id.clone());
    row.push(entry.date.clone());
    row.extend(entry.lines.iter().cloned());
    row.push(entry.tags.join(";"));
    row.push(entry.category.clone());
    row.push(entry.series_id.clone());
    row.push(entry.memo.clone());
    row.push(entry.status.as_str().to_string());
    row
}

/// Encodes entries as native CSV text, header first.
pub fn export_native<'a>(
    entries: impl IntoIterator<Item = &'a Entry>,
) -> Result<String, CsvEncodeError> {
    let header: Vec<String> = NATIVE_HEADER.iter().map(|label| label.to_string()).collect();
    let rows = std::iter::once(header).chain(entries.into_iter().map(entry_to_row));
    encode(rows)
}

#[cfg(test)]
mod tests {
    use super::export_native;
    use crate::model::entry::Entry;

    #[test]
    fn export_writes_header_and_joined_tags() {
        let mut entry = Entry::new("a", "2024-01-01", vec!["x".to_string()]);
        entry.tags = vec!["spring".to_string(), "sea".to_string()];

        let text = export_native([&entry]).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,date,line1,line2,line3,line4,line5,tags,category,seriesId,memo,status")
        );
        assert_eq!(
            lines.next(),
            Some("a,2024-01-01,x,,,,,spring;sea,,,,unpublished")
        );
    }
}
