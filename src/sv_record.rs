//! Value types for one structural variant call and its carrier statistics
//!

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};

use crate::int_range::IntRange;

/// Structural variant type
///
/// Mobile-element subtypes are kept distinct from their parent type, so that a mobile element
/// insertion never clusters with a plain insertion.
///
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
pub enum SvType {
    #[serde(rename = "DEL")]
    #[strum(serialize = "DEL")]
    Del,
    #[serde(rename = "DEL:ME")]
    #[strum(serialize = "DEL:ME")]
    DelMe,
    #[serde(rename = "DUP")]
    #[strum(serialize = "DUP")]
    Dup,
    #[serde(rename = "INS")]
    #[strum(serialize = "INS")]
    Ins,
    #[serde(rename = "INS:ME")]
    #[strum(serialize = "INS:ME")]
    InsMe,
    #[serde(rename = "INV")]
    #[strum(serialize = "INV")]
    Inv,
    #[serde(rename = "BND")]
    #[strum(serialize = "BND")]
    Bnd,
    #[serde(rename = "CNV")]
    #[strum(serialize = "CNV")]
    Cnv,
}

impl SvType {
    /// Parse an SV type label as found in caller output
    ///
    /// Anything after the first underscore is dropped (`DUP_TANDEM` -> `DUP`), and mobile element
    /// family labels are folded onto the mobile element type (`INS:ME:ALU` -> `INS:ME`).
    ///
    pub fn from_label(label: &str) -> SimpleResult<Self> {
        let label = label.trim();
        let label = &label[..label.find('_').unwrap_or(label.len())];
        let folded = label
            .splitn(3, ':')
            .take(2)
            .collect::<Vec<_>>()
            .join(":")
            .to_ascii_uppercase();
        match SvType::from_str(&folded) {
            Ok(x) => Ok(x),
            Err(_) => bail!("Unknown SV type label: '{}'", label),
        }
    }

    pub fn is_breakend(&self) -> bool {
        *self == SvType::Bnd
    }

    pub fn is_insertion(&self) -> bool {
        matches!(self, SvType::Ins | SvType::InsMe)
    }

    /// Linear SV types are matched on interval overlap, the others on breakend proximity
    pub fn is_linear(&self) -> bool {
        !(self.is_breakend() || self.is_insertion())
    }
}

/// Paired-end orientation of a breakend
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
pub enum StrandOrientation {
    #[serde(rename = "3to3")]
    #[strum(serialize = "3to3")]
    ThreeToThree,
    #[serde(rename = "5to5")]
    #[strum(serialize = "5to5")]
    FiveToFive,
    #[serde(rename = "3to5")]
    #[strum(serialize = "3to5")]
    ThreeToFive,
    #[serde(rename = "5to3")]
    #[strum(serialize = "5to3")]
    FiveToThree,
}

impl StrandOrientation {
    /// Parse an orientation label, where "", "." and "NtoN" all mean not applicable
    pub fn from_label(label: &str) -> SimpleResult<Option<Self>> {
        let label = label.trim();
        if label.is_empty() || label == "." || label == "NtoN" {
            return Ok(None);
        }
        match StrandOrientation::from_str(label) {
            Ok(x) => Ok(Some(x)),
            Err(_) => bail!("Unknown paired-end orientation label: '{}'", label),
        }
    }
}

/// Genotype carrier counts, additive over any number of SV calls
///
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct GenotypeCounts {
    /// Number of source SV calls contributing to these counts
    pub src_count: u32,

    /// Total carriers, always `carriers_het + carriers_hom + carriers_hemi`
    pub carriers: u32,
    pub carriers_het: u32,
    pub carriers_hom: u32,
    pub carriers_hemi: u32,
}

impl GenotypeCounts {
    pub fn plus(&self, other: &Self) -> Self {
        Self {
            src_count: self.src_count + other.src_count,
            carriers: self.carriers + other.carriers,
            carriers_het: self.carriers_het + other.carriers_het,
            carriers_hom: self.carriers_hom + other.carriers_hom,
            carriers_hemi: self.carriers_hemi + other.carriers_hemi,
        }
    }

    /// Derive counts for one source call from its per-sample genotype strings
    ///
    pub fn from_genotypes<'a>(genotypes: impl IntoIterator<Item = &'a str>) -> Self {
        let mut counts = Self {
            src_count: 1,
            ..Default::default()
        };
        for gt in genotypes {
            match classify_genotype(gt) {
                Some(Zygosity::Het) => counts.carriers_het += 1,
                Some(Zygosity::Hom) => counts.carriers_hom += 1,
                Some(Zygosity::Hemi) => counts.carriers_hemi += 1,
                None => {}
            }
        }
        counts.carriers = counts.carriers_het + counts.carriers_hom + counts.carriers_hemi;
        counts
    }
}

#[derive(Debug, Eq, PartialEq)]
enum Zygosity {
    Het,
    Hom,
    Hemi,
}

/// Classify a VCF-style genotype string, returning None for non-carriers
///
fn classify_genotype(gt: &str) -> Option<Zygosity> {
    let gt = gt.trim().replace('|', "/");
    let alleles = gt.split('/').collect::<Vec<_>>();
    let alt_count = alleles
        .iter()
        .filter(|&&a| !a.is_empty() && a != "." && a != "0")
        .count();
    match (alleles.len(), alt_count) {
        (1, 1) => Some(Zygosity::Hemi),
        (2, 2) => Some(Zygosity::Hom),
        (2, 1) => Some(Zygosity::Het),
        _ => None,
    }
}

/// Per-sample genotype information from the source feed
///
/// Only the genotype call is needed here, everything else in the sample payload is ignored
///
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SampleGenotype {
    #[serde(default)]
    pub gt: String,
}

pub type GenotypeMap = BTreeMap<String, SampleGenotype>;

/// One structural variant call, reduced to what is needed for clustering
///
/// All positions are 1-based. For linear SV types `chrom2` equals `chrom`.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GenomicSvRecord {
    /// Genome build identifier, e.g. 'GRCh37'
    pub release: String,
    pub sv_type: SvType,
    pub chrom: String,
    pub pos: i64,
    pub chrom2: String,
    pub end: i64,
    pub orientation: Option<StrandOrientation>,
    pub counts: GenotypeCounts,
}

impl GenomicSvRecord {
    /// Length of the 1-based closed interval spanned by this record
    pub fn length(&self) -> i64 {
        self.end - self.pos + 1
    }

    /// Bed-style range of the record on its first chromosome
    ///
    /// Linear SVs span `pos..=end`, all other types are represented by the position alone.
    ///
    pub fn range(&self) -> IntRange {
        if self.sv_type.is_linear() {
            IntRange::from_one_based(self.pos, self.end)
        } else {
            IntRange::from_int(self.pos - 1)
        }
    }

    /// Range used to look up potentially matching clusters
    ///
    /// This is the record range, expanded by `bnd_slack` on both sides for breakends and
    /// insertions.
    ///
    pub fn matching_range(&self, bnd_slack: i64) -> IntRange {
        let mut range = self.range();
        if !self.sv_type.is_linear() {
            range.expand_by(bnd_slack);
        }
        range
    }
}
