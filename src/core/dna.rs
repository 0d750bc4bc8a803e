//! Nucleotide helpers
//!
//! Alphabet checks for sequences returned by the service, and reverse
//! complement.

/// Complement one base, IUPAC aware. Case is kept; unknown bytes pass through.
#[inline]
pub fn complement_base(base: u8) -> u8 {
    let upper = match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'T' | b'U' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        // S, W, N are their own complement
        other => other,
    };
    if base.is_ascii_lowercase() {
        upper.to_ascii_lowercase()
    } else if base.is_ascii_uppercase() {
        upper
    } else {
        base
    }
}

/// Reverse complement
///
/// # Examples
/// ```
/// use getseq::core::dna::revcomp;
///
/// assert_eq!(revcomp("AACGT"), "ACGTT");
/// assert_eq!(revcomp("acgN"), "Ncgt");
/// ```
pub fn revcomp(seq: &str) -> String {
    seq.bytes().rev().map(|b| complement_base(b) as char).collect()
}

/// Standard base or IUPAC ambiguity code, either case
#[inline]
pub fn is_nucleotide(base: u8) -> bool {
    matches!(
        base.to_ascii_uppercase(),
        b'A' | b'C' | b'G' | b'T' | b'U' | b'R' | b'Y' | b'S' | b'W' | b'K' | b'M' | b'B'
            | b'D' | b'H' | b'V' | b'N'
    )
}

/// Check a whole sequence. The empty string is not a sequence.
///
/// # Examples
/// ```
/// use getseq::core::dna::is_nucleotide_sequence;
///
/// assert!(is_nucleotide_sequence("ACGTN"));
/// assert!(!is_nucleotide_sequence("ACGT-"));
/// assert!(!is_nucleotide_sequence(""));
/// ```
pub fn is_nucleotide_sequence(seq: &str) -> bool {
    !seq.is_empty() && seq.bytes().all(is_nucleotide)
}
