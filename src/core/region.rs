//! Region model
//!
//! Canonical in-memory representation of one genomic region, plus the
//! chromosome-name normalizer and the row parser that produces it.
//!
//! Coordinates are 1-based and inclusive on both ends, which is what the
//! Ensembl sequence endpoint expects.

use crate::core::error::{RegionError, RegionResult};

/// Strand orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl Strand {
    /// Parse an optional strand token.
    ///
    /// Absent, empty and `.` tokens mean forward.
    ///
    /// # Examples
    /// ```
    /// use getseq::core::Strand;
    /// assert_eq!(Strand::parse(None), Ok(Strand::Forward));
    /// assert_eq!(Strand::parse(Some("-")), Ok(Strand::Reverse));
    /// assert_eq!(Strand::parse(Some("Reverse")), Ok(Strand::Reverse));
    /// assert!(Strand::parse(Some("up")).is_err());
    /// ```
    pub fn parse(token: Option<&str>) -> RegionResult<Self> {
        let token = match token.map(str::trim) {
            None | Some("") | Some(".") => return Ok(Strand::Forward),
            Some(t) => t,
        };
        match token {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            t if t.eq_ignore_ascii_case("forward") => Ok(Strand::Forward),
            t if t.eq_ignore_ascii_case("reverse") => Ok(Strand::Reverse),
            other => Err(RegionError::InvalidStrand(other.to_string())),
        }
    }

    /// Parse an Ensembl strand code (`1` / `-1`)
    pub fn from_ensembl(code: &str) -> Option<Self> {
        match code {
            "1" | "+1" => Some(Strand::Forward),
            "-1" => Some(Strand::Reverse),
            _ => None,
        }
    }

    /// Ensembl strand code
    pub fn ensembl_code(&self) -> i8 {
        match self {
            Strand::Forward => 1,
            Strand::Reverse => -1,
        }
    }

    pub fn to_char(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// Normalize a chromosome name to Ensembl style
///
/// Strips a leading `chr` (any case). `chrM` becomes `MT`, the Ensembl name
/// for the mitochondrial genome. Bare identifiers pass through unchanged, so
/// normalizing twice is the same as normalizing once.
///
/// # Examples
/// ```
/// use getseq::core::normalize_chrom;
///
/// assert_eq!(normalize_chrom("chr1").unwrap(), "1");
/// assert_eq!(normalize_chrom("CHR1").unwrap(), "1");
/// assert_eq!(normalize_chrom("1").unwrap(), "1");
/// assert_eq!(normalize_chrom("chrM").unwrap(), "MT");
/// assert!(normalize_chrom("chr").is_err());
/// ```
pub fn normalize_chrom(raw: &str) -> RegionResult<String> {
    let trimmed = raw.trim();
    let stripped = match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => Some(&trimmed[3..]),
        _ => None,
    };

    let name = match stripped {
        Some(rest) if rest.eq_ignore_ascii_case("m") => "MT",
        Some(rest) => rest,
        None => trimmed,
    };

    if name.is_empty() {
        return Err(RegionError::EmptyChromosome { raw: raw.to_string() });
    }
    Ok(name.to_string())
}

/// Identity of a region as sent to and echoed by the service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionKey {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
}

/// One genomic region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRecord {
    /// Ensembl-style chromosome name, never empty
    pub chromosome: String,
    /// 1-based inclusive start, >= 1
    pub start: u64,
    /// 1-based inclusive end, >= start
    pub end: u64,
    pub strand: Strand,
    /// User label carried through to the output header
    pub label: Option<String>,
    /// Chromosome exactly as it appeared in the input
    pub original_chromosome: String,
    /// 1-based input line the region came from
    pub row: usize,
}

impl RegionRecord {
    /// Build a validated region
    pub fn new(
        chromosome: &str,
        start: u64,
        end: u64,
        strand: Strand,
        label: Option<String>,
        row: usize,
    ) -> RegionResult<Self> {
        let normalized = normalize_chrom(chromosome)?;
        if start < 1 {
            return Err(RegionError::StartBelowOne { start });
        }
        if end < start {
            return Err(RegionError::InvalidRange { start, end });
        }
        Ok(Self {
            chromosome: normalized,
            start,
            end,
            strand,
            label: label.filter(|l| !l.trim().is_empty()),
            original_chromosome: chromosome.to_string(),
            row,
        })
    }

    /// Number of bases covered (inclusive coordinates)
    #[inline]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false, a region covers at least one base
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn key(&self) -> RegionKey {
        RegionKey {
            chromosome: self.chromosome.clone(),
            start: self.start,
            end: self.end,
            strand: self.strand,
        }
    }

    /// `chrom:start-end:strand`
    pub fn locus(&self) -> String {
        format!("{}:{}-{}:{}", self.chromosome, self.start, self.end, self.strand)
    }

    /// Output header: the user label if one was given, the locus otherwise
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self.locus(),
        }
    }
}

/// One pre-split input row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the source
    pub line: usize,
    pub fields: Vec<String>,
    /// The line was not valid UTF-8 and `fields` were decoded lossily
    pub lossy: bool,
}

impl RawRow {
    pub fn new<S: Into<String>>(line: usize, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            line,
            fields: fields.into_iter().map(Into::into).collect(),
            lossy: false,
        }
    }
}

/// Outcome of parsing a row that was not rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRow {
    Region(RegionRecord),
    Header,
}

fn parse_coordinate(field: &'static str, value: &str) -> RegionResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| RegionError::InvalidCoordinate {
            field,
            value: value.to_string(),
        })
}

/// Parse one row: `chromosome, start, end[, strand][, label]`
///
/// The first row is taken as a header when its coordinates are not
/// integers. Any other row with non-integer coordinates is rejected, as is
/// a row whose line was not valid UTF-8.
pub fn parse_row(row: &RawRow, is_first: bool) -> RegionResult<ParsedRow> {
    if row.lossy {
        return Err(RegionError::InvalidEncoding);
    }
    let fields = &row.fields;
    if fields.len() < 3 {
        return Err(RegionError::TooFewFields { found: fields.len() });
    }

    let coords = parse_coordinate("start", &fields[1])
        .and_then(|start| parse_coordinate("end", &fields[2]).map(|end| (start, end)));
    let (start, end) = match coords {
        Ok(coords) => coords,
        Err(_) if is_first => return Ok(ParsedRow::Header),
        Err(e) => return Err(e),
    };

    let strand = Strand::parse(fields.get(3).map(String::as_str))?;
    let label = fields.get(4).map(|l| l.trim().to_string());

    RegionRecord::new(&fields[0], start, end, strand, label, row.line).map(ParsedRow::Region)
}
