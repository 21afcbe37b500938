use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cluster_svs::SvCluster;
use crate::sv_record::{StrandOrientation, SvType};
use crate::ucsc_bin::get_one_based_bin;

/// Lifecycle state of a background SV set
///
/// Builds move a set from `building` to `active`. The `inactive` and `deleting` states are only
/// used by retention, and `ready` is reserved.
///
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SetState {
    Initial,
    Building,
    Ready,
    Active,
    Inactive,
    Deleting,
}

/// One background database build for one genome release
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BackgroundSvSet {
    pub id: u64,
    pub release: String,
    pub created: DateTime<Utc>,
    pub state: SetState,
}

/// One clustered background SV record
///
/// Coordinates are 1-based. For linear SV types `chromosome2` is the same as `chromosome`.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BackgroundSv {
    pub set_id: u64,
    pub release: String,
    pub sv_type: SvType,
    pub chromosome: String,
    pub chromosome2: String,
    pub start: i64,
    pub end: i64,
    pub pe_orientation: Option<StrandOrientation>,

    /// UCSC bin of the record, computed over `[start,end]` for linear SVs, and over `start`
    /// alone otherwise
    pub bin: u32,

    pub src_count: u32,
    pub carriers: u32,
    pub carriers_het: u32,
    pub carriers_hom: u32,
    pub carriers_hemi: u32,
}

impl BackgroundSv {
    /// Snapshot a finished cluster as a background record of `set_id`
    pub fn from_cluster(set_id: u64, cluster: &SvCluster) -> Self {
        let rep = cluster.representative();
        let counts = cluster.counts();
        let (chromosome2, bin) = if rep.sv_type.is_linear() {
            (rep.chrom.clone(), get_one_based_bin(rep.pos, rep.end))
        } else {
            (rep.chrom2.clone(), get_one_based_bin(rep.pos, rep.pos))
        };
        Self {
            set_id,
            release: rep.release.clone(),
            sv_type: rep.sv_type,
            chromosome: rep.chrom.clone(),
            chromosome2,
            start: rep.pos,
            end: rep.end,
            pe_orientation: rep.orientation,
            bin,
            src_count: counts.src_count,
            carriers: counts.carriers,
            carriers_het: counts.carriers_het,
            carriers_hom: counts.carriers_hom,
            carriers_hemi: counts.carriers_hemi,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sv_overlap::tests::{get_bnd_record, get_linear_record};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_from_cluster() {
        let mut rng = StdRng::seed_from_u64(1);

        let mut cluster = SvCluster::new(500, 100);
        cluster.augment(get_linear_record(SvType::Del, "1", 200_000, 300_000), 50, &mut rng);
        cluster.augment(get_linear_record(SvType::Del, "1", 200_010, 300_010), 50, &mut rng);
        let sv = BackgroundSv::from_cluster(3, &cluster);
        assert_eq!(sv.set_id, 3);
        assert_eq!(sv.chromosome2, "1");
        assert_eq!((sv.start, sv.end), (200_000, 300_000));
        assert_eq!(sv.bin, get_one_based_bin(200_000, 300_000));
        assert_eq!(sv.src_count, 2);
        assert_eq!(sv.carriers_het, 2);

        let mut cluster = SvCluster::new(500, 100);
        cluster.augment(
            get_bnd_record("7", 200_000, "9", 50_000_000, StrandOrientation::ThreeToFive),
            50,
            &mut rng,
        );
        let sv = BackgroundSv::from_cluster(3, &cluster);
        assert_eq!(sv.chromosome2, "9");
        assert_eq!(sv.end, 50_000_000);
        assert_eq!(sv.bin, get_one_based_bin(200_000, 200_000));
        assert_eq!(sv.pe_orientation, Some(StrandOrientation::ThreeToFive));
    }
}
