//! FASTA output
//!
//! One record per retrieved region: `>{header}` then the sequence, either on
//! a single line or wrapped at a fixed width.

use crate::core::SequenceRecord;
use std::io::{self, Write};

/// FASTA writer
pub struct FastaWriter<W: Write> {
    inner: W,
    line_width: usize,
}

impl<W: Write> FastaWriter<W> {
    /// `line_width == 0` keeps each sequence on one line
    pub fn new(inner: W, line_width: usize) -> Self {
        Self { inner, line_width }
    }

    pub fn write_record(&mut self, record: &SequenceRecord) -> io::Result<()> {
        writeln!(self.inner, ">{}", record.header)?;
        if self.line_width == 0 {
            writeln!(self.inner, "{}", record.sequence)?;
            return Ok(());
        }
        for chunk in record.sequence.as_bytes().chunks(self.line_width) {
            self.inner.write_all(chunk)?;
            self.inner.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Write all records, returning how many were written
    pub fn write_records(&mut self, records: &[SequenceRecord]) -> io::Result<usize> {
        for record in records {
            self.write_record(record)?;
        }
        self.inner.flush()?;
        Ok(records.len())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
