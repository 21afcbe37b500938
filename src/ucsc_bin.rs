//! UCSC-style spatial bin keys for background SV rows
//!
//! The downstream SV filter joins background records to case SVs on this bin value, so it has to
//! reproduce the standard UCSC scheme exactly (bins for 128kb, 1Mb, 8Mb, 64Mb and 512Mb windows).
//!

/// Generalized reg2bin in the htslib/noodles style
///
/// begin and end should follow bed zero-based half-closed format
///
fn hts_reg2bin(begin: usize, end: usize, min_shift: u8, depth: u8) -> usize {
    let end = std::cmp::max(end, begin + 1) - 1;
    let mut l = depth;
    let mut s = min_shift;
    let mut t = ((1 << (depth * 3)) - 1) / 7;

    while l > 0 {
        if begin >> s == end >> s {
            return t + (begin >> s);
        }

        l -= 1;
        s += 3;
        t -= 1 << (l * 3);
    }

    0
}

/// UCSC bin of a zero-based half-closed range
///
pub fn ucsc_reg2bin(begin: usize, end: usize) -> u32 {
    hts_reg2bin(begin, end, 17, 4) as u32
}

/// UCSC bin of a 1-based closed interval `[pos, end]`
///
pub fn get_one_based_bin(pos: i64, end: i64) -> u32 {
    let begin = std::cmp::max(pos - 1, 0) as usize;
    let end = std::cmp::max(end, pos) as usize;
    ucsc_reg2bin(begin, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ucsc_reg2bin() {
        // Finest level starts at offset 585
        assert_eq!(ucsc_reg2bin(0, 1), 585);
        assert_eq!(ucsc_reg2bin(0, 1 << 17), 585);
        assert_eq!(ucsc_reg2bin(1 << 17, (1 << 17) + 1), 586);

        // Spanning a 128kb boundary moves up one level
        assert_eq!(ucsc_reg2bin((1 << 17) - 1, (1 << 17) + 1), 73);

        // Spanning an 8Mb boundary lands in the first 64Mb bin
        assert_eq!(ucsc_reg2bin((1 << 23) - 1, (1 << 23) + 1), 1);

        // Spanning a 64Mb boundary falls back to the root bin
        assert_eq!(ucsc_reg2bin((1 << 26) - 1, (1 << 26) + 1), 0);
    }

    #[test]
    fn test_get_one_based_bin() {
        assert_eq!(get_one_based_bin(1, 1), 585);
        assert_eq!(get_one_based_bin(1000, 2000), 585);
        assert_eq!(get_one_based_bin(1_000_000, 1_000_001), 585 + (999_999 >> 17));
    }
}
