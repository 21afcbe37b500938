use rand::Rng;

use crate::sv_overlap::is_compatible;
use crate::sv_record::{GenomicSvRecord, GenotypeCounts};

/// A set of mutually compatible SV records and their summed genotype counts
///
/// The representative record is used to index and compare the cluster. It is always one of the
/// input records, never a computed consensus: the first record added, or after a sub-sampling
/// event, the first record drawn in the sample.
///
pub struct SvCluster {
    cluster_max_size: usize,
    cluster_size_sample_to: usize,

    representative: Option<GenomicSvRecord>,

    /// Backing records, bounded by `cluster_max_size`
    records: Vec<GenomicSvRecord>,

    /// Counts summed over every record ever added, including those dropped by sub-sampling
    counts: GenotypeCounts,
}

impl SvCluster {
    pub fn new(cluster_max_size: usize, cluster_size_sample_to: usize) -> Self {
        assert!(cluster_size_sample_to > 0 && cluster_size_sample_to <= cluster_max_size);
        Self {
            cluster_max_size,
            cluster_size_sample_to,
            representative: None,
            records: Vec::new(),
            counts: GenotypeCounts::default(),
        }
    }

    /// Panics if called on an empty cluster
    pub fn representative(&self) -> &GenomicSvRecord {
        self.representative.as_ref().unwrap()
    }

    pub fn records(&self) -> &[GenomicSvRecord] {
        &self.records
    }

    pub fn counts(&self) -> &GenotypeCounts {
        &self.counts
    }

    /// Add `record` to the cluster
    ///
    /// The record must match the release, type and chromosomes of the representative record, and
    /// must be compatible with it. Violating this is a logic error in the caller.
    ///
    /// Returns true if the representative record changed, which can only happen when the cluster
    /// is sub-sampled after growing beyond its max size.
    ///
    pub fn augment(
        &mut self,
        record: GenomicSvRecord,
        bnd_slack: i64,
        rng: &mut impl Rng,
    ) -> bool {
        if let Some(rep) = &self.representative {
            assert!(
                rep.release == record.release
                    && rep.sv_type == record.sv_type
                    && rep.chrom == record.chrom
                    && rep.chrom2 == record.chrom2,
                "Attempting to add incompatible record to cluster. Representative: {rep:?} Record: {record:?}"
            );
            assert!(
                is_compatible(rep, &record, bnd_slack),
                "Attempting to add non-overlapping record to cluster. Representative: {rep:?} Record: {record:?}"
            );
        } else {
            self.representative = Some(record.clone());
        }

        self.counts = self.counts.plus(&record.counts);
        self.records.push(record);

        if self.records.len() > self.cluster_max_size {
            self.sub_sample(rng)
        } else {
            false
        }
    }

    /// Replace the backing records with a uniform sample drawn with replacement
    ///
    /// Returns true if the representative record changed
    ///
    fn sub_sample(&mut self, rng: &mut impl Rng) -> bool {
        let record_count = self.records.len();
        let sample = (0..self.cluster_size_sample_to)
            .map(|_| self.records[rng.random_range(0..record_count)].clone())
            .collect::<Vec<_>>();
        self.records = sample;

        let new_rep = self.records[0].clone();
        let is_changed = self.representative.as_ref() != Some(&new_rep);
        self.representative = Some(new_rep);
        is_changed
    }

    /// Return true if `record` is compatible with every record in the cluster
    ///
    pub fn is_compatible(&self, record: &GenomicSvRecord, bnd_slack: i64) -> bool {
        self.records
            .iter()
            .all(|x| is_compatible(x, record, bnd_slack))
    }
}
