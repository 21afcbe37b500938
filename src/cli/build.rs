use camino::Utf8PathBuf;
use clap::Args;
use simple_error::{SimpleResult, bail};

use super::defaults::{
    BND_SLACK, CLUSTER_MAX_SIZE, CLUSTER_SIZE_SAMPLE_TO, MIN_RECIPROCAL_OVERLAP,
    PROGRESS_INTERVAL, SEED,
};
use super::utils::{
    check_optional_filename, check_optional_output_filename, check_required_filename,
};
use crate::bg_db::get_target_chromosomes;
use crate::cluster_svs::ClusterSettings;

#[derive(Args)]
pub struct BuildSettings {
    /// Background SV store directory, created if it does not exist
    #[arg(long, value_name = "DIR")]
    pub store_dir: Utf8PathBuf,

    /// Source SV calls of all cases in tab-separated format, optionally gzip-compressed
    ///
    /// Required columns are: case_id, release, chromosome, start, chromosome2, end, sv_type,
    /// pe_orientation and genotype. The genotype column holds a JSON object mapping each sample
    /// to its genotype info, for instance '{"sample1": {"gt": "0/1"}}'.
    ///
    #[arg(long = "source", value_name = "FILE")]
    pub source_filename: Utf8PathBuf,

    /// Genome release of the background SV set, such as GRCh37 or GRCh38
    #[arg(long)]
    pub release: String,

    /// Restrict the build to one or more chromosomes. Can be specified multiple times.
    #[arg(long = "chrom", value_name = "CHROM")]
    pub chromosomes: Vec<String>,

    /// File of case ids excluded from the background SV set, one per line
    #[arg(long = "exclude-cases", value_name = "FILE")]
    pub exclude_cases_filename: Option<Utf8PathBuf>,

    /// Random seed for the clustering procedure
    #[arg(long, default_value_t = SEED)]
    pub seed: u64,

    /// Clusters are sub-sampled once their record count exceeds this value
    #[arg(long, default_value_t = CLUSTER_MAX_SIZE)]
    pub cluster_max_size: usize,

    /// Record count of a cluster after sub-sampling
    #[arg(long, default_value_t = CLUSTER_SIZE_SAMPLE_TO)]
    pub cluster_size_sample_to: usize,

    /// Minimum reciprocal overlap required to cluster linear SVs
    #[arg(long, default_value_t = MIN_RECIPROCAL_OVERLAP)]
    pub min_reciprocal_overlap: f64,

    /// Max position difference of clustered breakends and insertions
    #[arg(long, default_value_t = BND_SLACK)]
    pub bnd_slack: i64,

    /// Append job lifecycle events to this file in JSON lines format
    #[arg(long = "lifecycle-events", value_name = "FILE")]
    pub lifecycle_events_filename: Option<Utf8PathBuf>,

    /// Write build statistics to this file in JSON format
    #[arg(long = "run-stats", value_name = "FILE")]
    pub run_stats_filename: Option<Utf8PathBuf>,

    /// Source records between progress log entries on each chromosome
    #[arg(hide = true, long, default_value_t = PROGRESS_INTERVAL)]
    pub progress_interval: usize,
}

impl BuildSettings {
    pub fn get_cluster_settings(&self) -> ClusterSettings {
        ClusterSettings {
            seed: self.seed,
            cluster_max_size: self.cluster_max_size,
            cluster_size_sample_to: self.cluster_size_sample_to,
            min_reciprocal_overlap: self.min_reciprocal_overlap,
            bnd_slack: self.bnd_slack,
        }
    }

    /// Chromosome subset of the build, or None to build all chromosomes
    pub fn get_chromosome_subset(&self) -> Option<Vec<String>> {
        if self.chromosomes.is_empty() {
            None
        } else {
            Some(self.chromosomes.clone())
        }
    }
}

pub fn validate_and_fix_build_settings(settings: BuildSettings) -> SimpleResult<BuildSettings> {
    if settings.release.is_empty() {
        bail!("Must specify a genome release");
    }

    check_required_filename(&settings.source_filename, "source SV")?;
    check_optional_filename(
        settings.exclude_cases_filename.as_deref(),
        "excluded case",
    )?;
    check_optional_output_filename(
        settings.lifecycle_events_filename.as_deref(),
        "lifecycle event",
    )?;
    check_optional_output_filename(settings.run_stats_filename.as_deref(), "run statistics")?;

    settings.get_cluster_settings().validate()?;
    get_target_chromosomes(&settings.release, settings.get_chromosome_subset().as_deref())?;

    if settings.progress_interval == 0 {
        bail!("--progress-interval argument must be greater than 0");
    }

    Ok(settings)
}
