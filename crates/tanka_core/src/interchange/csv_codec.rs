//! CSV tokenizer and encoder.
//!
//! # Responsibility
//! - Split CSV text into rows of cells, honoring quoted fields that span
//!   several physical lines.
//! - Encode rows back to text with minimal quoting.
//!
//! # Invariants
//! - A logical row ends only when its running `"` count is even.
//! - An unterminated quote at end of input still produces a final row.
//! - One trailing line break does not produce an extra empty row.
//! - `decode(encode(rows)) == rows` for non-empty rows, except that a
//!   `\r\n` inside a quoted cell decodes as `\n`.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error raised while encoding rows.
#[derive(Debug)]
pub enum CsvEncodeError {
    Csv(csv::Error),
    /// Writer buffer could not be flushed.
    Flush(String),
    Utf8(std::string::FromUtf8Error),
}

impl Display for CsvEncodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv(err) => write!(f, "csv write failed: {err}"),
            Self::Flush(message) => write!(f, "csv flush failed: {message}"),
            Self::Utf8(err) => write!(f, "csv output is not utf-8: {err}"),
        }
    }
}

impl Error for CsvEncodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Csv(err) => Some(err),
            Self::Flush(_) => None,
            Self::Utf8(err) => Some(err),
        }
    }
}

impl From<csv::Error> for CsvEncodeError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

/// Decodes CSV text into rows of cells.
///
/// Physical lines are joined with `\n` until the buffered text holds an even
/// number of `"`, so a quoted cell may contain line breaks. Inside quotes,
/// `""` is a literal quote.
pub fn decode(text: &str) -> Vec<Vec<String>> {
    logical_rows(text)
        .iter()
        .map(|row| split_cells(row))
        .collect()
}

/// Encodes rows as CSV text.
///
/// Cells are joined with `,` and rows with `\n`, without a trailing
/// terminator. Cells containing `,`, `"`, `\n` or `\r` are quoted with inner
/// quotes doubled.
pub fn encode<R, C>(rows: R) -> Result<String, CsvEncodeError>
where
    R: IntoIterator<Item = C>,
    C: IntoIterator,
    C::Item: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in rows {
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| CsvEncodeError::Flush(err.error().to_string()))?;
    let mut text = String::from_utf8(bytes).map_err(CsvEncodeError::Utf8)?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

fn logical_rows(text: &str) -> Vec<String> {
    let mut rows = Vec::new();
    let mut pending: Option<(String, usize)> = None;

    // A final line break terminates the last row rather than opening an
    // empty one.
    let body = text.strip_suffix('\n').unwrap_or(text);
    for line in body.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let quotes_in_line = line.matches('"').count();
        let (buffer, quotes) = match pending.take() {
            Some((mut buffer, quotes)) => {
                buffer.push('\n');
                buffer.push_str(line);
                (buffer, quotes + quotes_in_line)
            }
            None => (line.to_string(), quotes_in_line),
        };

        if quotes % 2 == 0 {
            rows.push(buffer);
        } else {
            pending = Some((buffer, quotes));
        }
    }

    // Unterminated quote: keep what was read instead of dropping it.
    if let Some((buffer, _)) = pending {
        rows.push(buffer);
    }

    rows
}

fn split_cells(row: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut inside_quote = false;
    let mut chars = row.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if inside_quote && chars.peek() == Some(&'"') => {
                chars.next();
                cell.push('"');
            }
            '"' => inside_quote = !inside_quote,
            ',' if !inside_quote => cells.push(std::mem::take(&mut cell)),
            other => cell.push(other),
        }
    }
    cells.push(cell);

    cells
}
