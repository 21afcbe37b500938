//! Predicates deciding whether two SV records may represent the same variant
//!

use crate::int_range::get_overlap_range;
use crate::sv_record::GenomicSvRecord;

/// Default distance allowed between matching breakend or insertion positions
pub const DEFAULT_BND_SLACK: i64 = 50;

/// Return true if the two records overlap
///
/// Breakends must have both ends within `bnd_slack` of each other, insertions must have their
/// positions within `bnd_slack`, and all linear types must intersect on the same chromosome.
///
/// The SV type of `a` determines which rule is used.
///
pub fn does_overlap(a: &GenomicSvRecord, b: &GenomicSvRecord, bnd_slack: i64) -> bool {
    if a.chrom != b.chrom {
        return false;
    }

    if a.sv_type.is_breakend() {
        a.chrom2 == b.chrom2
            && (a.pos - b.pos).abs() <= bnd_slack
            && (a.end - b.end).abs() <= bnd_slack
    } else if a.sv_type.is_insertion() {
        (a.pos - b.pos).abs() <= bnd_slack
    } else {
        a.pos <= b.end && a.end >= b.pos
    }
}

/// Reciprocal overlap of two linear SV records
///
/// This is the overlap length divided by the longer of the two record lengths, or 0 if the
/// records don't overlap.
///
/// Reciprocal overlap is not defined for breakends or insertions, and calling this method on
/// either is a logic error.
///
pub fn reciprocal_overlap(a: &GenomicSvRecord, b: &GenomicSvRecord) -> f64 {
    assert!(
        a.sv_type.is_linear() && b.sv_type.is_linear(),
        "Reciprocal overlap is not defined for SV types {} and {}",
        a.sv_type,
        b.sv_type
    );

    if !does_overlap(a, b, 0) {
        return 0.0;
    }

    match get_overlap_range(&a.range(), &b.range()) {
        Some(overlap) => {
            let overlap_len = overlap.size() as f64;
            f64::min(
                overlap_len / a.length() as f64,
                overlap_len / b.length() as f64,
            )
        }
        None => 0.0,
    }
}

/// Return true if the two records could be clustered together
///
/// Types must be identical, breakends must additionally share their orientation, and then the
/// records must overlap.
///
pub fn is_compatible(a: &GenomicSvRecord, b: &GenomicSvRecord, bnd_slack: i64) -> bool {
    if a.sv_type != b.sv_type {
        return false;
    }
    if a.sv_type.is_breakend() && a.orientation != b.orientation {
        return false;
    }
    does_overlap(a, b, bnd_slack)
}
