//! Region file reader
//!
//! Turns a BED-like region file into pre-split [`RawRow`]s:
//! `chromosome, start, end[, strand][, label]`. Blank lines, `#` comments
//! and `track`/`browser` lines are dropped here so they never count as the
//! first row for header detection.

use crate::core::io::LineIterator;
use crate::core::RawRow;
use log::warn;
use memchr::memchr_iter;
use std::borrow::Cow;
use std::io::{self, BufRead};

/// How fields are separated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldDelimiter {
    /// Region files
    #[default]
    Tab,
    /// Piped input, where columns are often space-aligned
    Whitespace,
}

/// Lines that carry no region
#[inline]
pub fn is_ignorable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("track")
        || trimmed.starts_with("browser")
}

/// Split one line into fields
pub fn split_fields(line: &str, delimiter: FieldDelimiter) -> Vec<String> {
    match delimiter {
        FieldDelimiter::Whitespace => line.split_whitespace().map(str::to_string).collect(),
        FieldDelimiter::Tab => {
            let mut fields = Vec::with_capacity(6);
            let mut start = 0;
            // tabs are ASCII, so every cut lands on a char boundary
            for tab in memchr_iter(b'\t', line.as_bytes()) {
                fields.push(line[start..tab].to_string());
                start = tab + 1;
            }
            fields.push(line[start..].to_string());
            fields
        }
    }
}

/// Streaming reader of region rows
pub struct RegionRowReader<R: BufRead> {
    lines: LineIterator<R>,
    delimiter: FieldDelimiter,
}

impl<R: BufRead> RegionRowReader<R> {
    pub fn new(reader: R, delimiter: FieldDelimiter) -> Self {
        Self {
            lines: LineIterator::new(reader),
            delimiter,
        }
    }
}

impl<R: BufRead> Iterator for RegionRowReader<R> {
    type Item = io::Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let delimiter = self.delimiter;
            let (fields, lossy) = {
                let bytes = match self.lines.next_line()? {
                    Ok(bytes) => bytes,
                    Err(e) => return Some(Err(e)),
                };
                // a badly encoded line is passed on flagged, the parser rejects it
                let (line, lossy) = match std::str::from_utf8(bytes) {
                    Ok(line) => (Cow::Borrowed(line), false),
                    Err(_) => (String::from_utf8_lossy(bytes), true),
                };
                if is_ignorable(&line) {
                    continue;
                }
                (split_fields(&line, delimiter), lossy)
            };
            let line_number = self.lines.line_number();
            if lossy {
                warn!("Line {} is not valid UTF-8", line_number);
            }
            return Some(Ok(RawRow {
                line: line_number,
                fields,
                lossy,
            }));
        }
    }
}

/// Read every region row from `reader`
///
/// Fails only on I/O errors. Undecodable lines come back as rows with
/// `lossy` set.
pub fn read_region_rows<R: BufRead>(reader: R, delimiter: FieldDelimiter) -> io::Result<Vec<RawRow>> {
    RegionRowReader::new(reader, delimiter).collect()
}
