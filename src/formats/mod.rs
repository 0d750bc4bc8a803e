//! Input/output format adapters
//!
//! Region file reading, FASTA writing and listing output.

pub mod bed;
pub mod fasta;
pub mod listing;

pub use bed::{is_ignorable, read_region_rows, split_fields, FieldDelimiter, RegionRowReader};
pub use fasta::FastaWriter;
pub use listing::{format_assemblies, format_species_table};
