//! Input/output plumbing
//!
//! Opens region inputs (plain, gzip or bzip2 files, or stdin) and output
//! sinks, and provides a line iterator that reuses its buffer.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Default buffer size for readers and writers (128KB)
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Compression format of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Plain,
    Gzip,
    Bzip2,
}

/// Detect compression from extension, then magic bytes
pub fn detect_compression(path: &Path) -> io::Result<CompressionFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("gz") => return Ok(CompressionFormat::Gzip),
        Some("bz2") => return Ok(CompressionFormat::Bzip2),
        _ => {}
    }

    let mut file = File::open(path)?;
    let mut magic = [0u8; 3];
    let bytes_read = file.read(&mut magic)?;

    if bytes_read >= 2 && magic[..2] == [0x1f, 0x8b] {
        return Ok(CompressionFormat::Gzip);
    }
    // "BZh"
    if bytes_read >= 3 && magic == [0x42, 0x5a, 0x68] {
        return Ok(CompressionFormat::Bzip2);
    }
    Ok(CompressionFormat::Plain)
}

/// `None` or `-` means stdin
pub fn is_stdio(path: Option<&Path>) -> bool {
    path.map_or(true, |p| p.as_os_str() == "-")
}

/// Open a region input, decompressing transparently
pub fn open_input(path: Option<&Path>) -> io::Result<Box<dyn BufRead>> {
    let path = match path {
        Some(p) if !is_stdio(Some(p)) => p,
        _ => return Ok(Box::new(BufReader::new(io::stdin()))),
    };

    let file = File::open(path)?;
    let reader: Box<dyn BufRead> = match detect_compression(path)? {
        CompressionFormat::Gzip => Box::new(BufReader::with_capacity(
            DEFAULT_BUFFER_SIZE,
            flate2::read::MultiGzDecoder::new(file),
        )),
        CompressionFormat::Bzip2 => Box::new(BufReader::with_capacity(
            DEFAULT_BUFFER_SIZE,
            bzip2::read::BzDecoder::new(file),
        )),
        CompressionFormat::Plain => Box::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file)),
    };
    Ok(reader)
}

/// Open an output sink, stdout when no path is given
pub fn create_output(path: Option<&Path>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(p) if !is_stdio(Some(p)) => Ok(Box::new(BufWriter::with_capacity(
            DEFAULT_BUFFER_SIZE,
            File::create(p)?,
        ))),
        _ => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

/// Writer that copies everything to two sinks
///
/// Used to send the log stream to a file and to the console at once.
pub struct TeeWriter<A: Write, B: Write> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> TeeWriter<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_inner(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: Write, B: Write> Write for TeeWriter<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

/// Byte line iterator that reuses its buffer
///
/// Lines are handed out as bytes so one badly encoded line does not end
/// the stream; decoding is left to the caller.
pub struct LineIterator<R: BufRead> {
    reader: R,
    buffer: Vec<u8>,
    line_number: usize,
}

impl<R: BufRead> LineIterator<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(1024),
            line_number: 0,
        }
    }

    /// 1-based number of the line last returned
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read the next line without its terminator
    /// Returns None at EOF, Some(Ok(&[u8])) on success, Some(Err) on error
    pub fn next_line(&mut self) -> Option<io::Result<&[u8]>> {
        self.buffer.clear();
        match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(0) => None,
            Ok(_) => {
                self.line_number += 1;
                if self.buffer.last() == Some(&b'\n') {
                    self.buffer.pop();
                    if self.buffer.last() == Some(&b'\r') {
                        self.buffer.pop();
                    }
                }
                Some(Ok(&self.buffer))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
