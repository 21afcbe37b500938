//! Cluster SV records from many cases into background SV clusters
//!
//! Clustering runs one chromosome at a time. Within a chromosome, records are first staged to
//! per-SV-type scratch partitions, and each partition is then clustered independently in a
//! randomized (but seeded) order.
//!

mod cluster_index;
mod scratch;
mod sv_cluster;

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use simple_error::{SimpleResult, bail};

use self::cluster_index::ClusterIndex;
use self::scratch::SvTypeScratch;
pub use self::sv_cluster::SvCluster;
use crate::sv_overlap::{DEFAULT_BND_SLACK, reciprocal_overlap};
use crate::sv_record::GenomicSvRecord;

/// Parameters of the clustering procedure
#[derive(Clone, Debug)]
pub struct ClusterSettings {
    /// Seed for the record shuffling and cluster sub-sampling
    pub seed: u64,

    /// Clusters are sub-sampled once their backing record count exceeds this value
    pub cluster_max_size: usize,

    /// Backing record count of a cluster after sub-sampling
    pub cluster_size_sample_to: usize,

    /// Minimum reciprocal overlap to join a linear SV to a cluster
    pub min_reciprocal_overlap: f64,

    /// Max distance between matching breakend or insertion positions
    pub bnd_slack: i64,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            seed: 1,
            cluster_max_size: 500,
            cluster_size_sample_to: 100,
            min_reciprocal_overlap: 0.85,
            bnd_slack: DEFAULT_BND_SLACK,
        }
    }
}

impl ClusterSettings {
    pub fn validate(&self) -> SimpleResult<()> {
        if self.cluster_size_sample_to == 0 {
            bail!("Cluster sample size must be greater than 0");
        }
        if self.cluster_size_sample_to > self.cluster_max_size {
            bail!(
                "Cluster sample size ({}) must not exceed cluster max size ({})",
                self.cluster_size_sample_to,
                self.cluster_max_size
            );
        }
        if !(self.min_reciprocal_overlap > 0.0 && self.min_reciprocal_overlap <= 1.0) {
            bail!(
                "Minimum reciprocal overlap must be in (0,1], found {}",
                self.min_reciprocal_overlap
            );
        }
        if self.bnd_slack < 0 {
            bail!("Breakend slack must not be negative");
        }
        Ok(())
    }
}

/// Records staged for clustering on a single chromosome
pub struct ChromosomeStaging<'a> {
    chrom: &'a str,
    scratch: SvTypeScratch,
}

impl ChromosomeStaging<'_> {
    /// Stage a record for clustering
    ///
    /// The record must be on the chromosome of the staging session.
    ///
    pub fn push(&mut self, record: &GenomicSvRecord) -> SimpleResult<()> {
        assert_eq!(
            record.chrom, self.chrom,
            "Record staged on the wrong chromosome: {record:?}"
        );
        self.scratch.push(record)
    }

    pub fn record_count(&self) -> usize {
        self.scratch.record_count()
    }
}

/// Clusters SV records one chromosome at a time
///
pub struct SvClusterer {
    settings: ClusterSettings,
    rng: StdRng,
}

impl SvClusterer {
    /// All randomized steps draw from `rng`, so results are reproducible for a given seed
    pub fn new(settings: ClusterSettings, rng: StdRng) -> Self {
        Self { settings, rng }
    }

    /// Run one chromosome clustering session
    ///
    /// `stage` is called once to push every record for `chrom` into the staging area. After it
    /// returns, every SV type partition is clustered, and all clusters are returned sorted by
    /// representative position.
    ///
    pub fn on_chromosome<F>(&mut self, chrom: &str, stage: F) -> SimpleResult<Vec<SvCluster>>
    where
        F: FnOnce(&mut ChromosomeStaging) -> SimpleResult<()>,
    {
        let mut staging = ChromosomeStaging {
            chrom,
            scratch: SvTypeScratch::default(),
        };
        stage(&mut staging)?;

        let mut clusters = Vec::new();
        for (sv_type, records) in staging.scratch.into_partitions() {
            let records = records?;
            let record_count = records.len();
            let partition_clusters = self.cluster_partition(records);
            debug!(
                "Clustered {record_count} {sv_type} records on chromosome {chrom} into {} clusters",
                partition_clusters.len()
            );
            clusters.extend(partition_clusters);
        }

        clusters.sort_by(|a, b| {
            let rep_a = a.representative();
            let rep_b = b.representative();
            rep_a.chrom.cmp(&rep_b.chrom).then(rep_a.pos.cmp(&rep_b.pos))
        });
        Ok(clusters)
    }

    /// Cluster all records from a single SV type partition
    ///
    fn cluster_partition(&mut self, mut records: Vec<GenomicSvRecord>) -> Vec<SvCluster> {
        let bnd_slack = self.settings.bnd_slack;

        records.shuffle(&mut self.rng);

        let mut clusters: Vec<SvCluster> = Vec::new();
        let mut index = ClusterIndex::default();

        for record in records {
            let match_index = {
                let mut candidates = index
                    .find_overlaps(&record.matching_range(bnd_slack))
                    .into_iter()
                    .filter(|&i| clusters[i].is_compatible(&record, bnd_slack));

                if record.sv_type.is_linear() {
                    let mut best: Option<(usize, f64)> = None;
                    for cluster_index in candidates {
                        let overlap =
                            reciprocal_overlap(clusters[cluster_index].representative(), &record);
                        if best.is_none_or(|(_, x)| overlap > x) {
                            best = Some((cluster_index, overlap));
                        }
                    }
                    best.filter(|(_, x)| *x >= self.settings.min_reciprocal_overlap)
                        .map(|(i, _)| i)
                } else {
                    candidates.next()
                }
            };

            match match_index {
                Some(cluster_index) => {
                    let cluster = &mut clusters[cluster_index];
                    if cluster.augment(record, bnd_slack, &mut self.rng) {
                        index.remove(cluster_index);
                        index.insert(
                            cluster_index,
                            cluster.representative().matching_range(bnd_slack),
                        );
                    }
                }
                None => {
                    let mut cluster = SvCluster::new(
                        self.settings.cluster_max_size,
                        self.settings.cluster_size_sample_to,
                    );
                    cluster.augment(record, bnd_slack, &mut self.rng);
                    index.insert(
                        clusters.len(),
                        cluster.representative().matching_range(bnd_slack),
                    );
                    clusters.push(cluster);
                }
            }
        }

        clusters
    }
}
