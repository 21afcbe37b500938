//! Track stats for a whole background database build
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use unwrap::unwrap;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ChromosomeBuildStats {
    pub chromosome: String,

    /// Source records read from the feed for this chromosome
    pub source_record_count: usize,

    /// Source records skipped because their case is excluded
    pub excluded_record_count: usize,

    /// Source records skipped because their release differs from the build release
    pub release_mismatch_count: usize,

    /// Background SV records written, one per cluster
    pub cluster_count: usize,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct BuildRunStats {
    pub set_id: u64,
    pub release: String,
    pub excluded_case_count: usize,
    pub chromosomes: Vec<ChromosomeBuildStats>,
    pub total_runtime_secs: f64,
}

impl BuildRunStats {
    pub fn total_cluster_count(&self) -> usize {
        self.chromosomes.iter().map(|x| x.cluster_count).sum()
    }

    pub fn total_source_record_count(&self) -> usize {
        self.chromosomes.iter().map(|x| x.source_record_count).sum()
    }
}

/// Write run_stats structure out in json format
pub fn write_build_run_stats(filename: &Utf8Path, run_stats: &BuildRunStats) {
    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(filename),
        "Unable to create run statistics json file: '{}'",
        filename
    );

    unwrap!(
        serde_json::to_writer_pretty(&f, &run_stats),
        "Unable to write run statistics json file: '{}'",
        filename
    );
}
