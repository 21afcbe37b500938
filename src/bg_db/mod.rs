//! Background SV database sets, their persistence, build and retention
//!

mod build;
mod cleanup;
mod dir_store;
mod model;
mod store;

use chrono::Utc;
use log::info;
use simple_error::SimpleResult;
use thousands::Separable;

use self::build::{BUILD_JOB_NAME, BuildSettings, build_bg_sv_set};
pub use self::build::get_target_chromosomes;
use self::cleanup::cleanup_bg_sv_sets;
use self::dir_store::DirStore;
use crate::cli;
use crate::job::{JobSink, JsonLinesMonitor, LifecycleMonitor, LogJobSink};
use crate::run_stats::write_build_run_stats;
use crate::source_feed::{CaseExclusion, ExcludedCaseList, NoCaseExclusion, TsvSourceFeed};

pub const CLEANUP_JOB_NAME: &str = "cleanup_bg_sv_sets";

/// Run the build command on a directory store
pub fn run_build(settings: &cli::BuildSettings) -> SimpleResult<()> {
    let mut store = DirStore::new(&settings.store_dir)?;
    let feed = TsvSourceFeed::new(&settings.source_filename);

    let exclusion: Box<dyn CaseExclusion> = match &settings.exclude_cases_filename {
        Some(filename) => {
            let x = ExcludedCaseList::from_file(filename)?;
            info!(
                "Read {} excluded case ids from '{filename}'",
                x.len().separate_with_commas()
            );
            Box::new(x)
        }
        None => Box::new(NoCaseExclusion),
    };

    let mut monitor = match &settings.lifecycle_events_filename {
        Some(filename) => Some(JsonLinesMonitor::new(filename)?),
        None => None,
    };

    let mut job = LogJobSink::new(BUILD_JOB_NAME);
    let build_settings = BuildSettings {
        release: settings.release.clone(),
        chromosomes: settings.get_chromosome_subset(),
        cluster_settings: settings.get_cluster_settings(),
        progress_interval: settings.progress_interval,
    };

    let (set, run_stats) = build_bg_sv_set(
        &mut store,
        &feed,
        exclusion.as_ref(),
        &mut job,
        monitor.as_mut().map(|x| x as &mut dyn LifecycleMonitor),
        &build_settings,
    )?;
    info!(
        "Background SV set {} for release {} is {} with {} records",
        set.id,
        set.release,
        set.state,
        run_stats.total_cluster_count().separate_with_commas()
    );

    if let Some(filename) = &settings.run_stats_filename {
        write_build_run_stats(filename, &run_stats);
    }
    Ok(())
}

/// Run the cleanup command on a directory store
pub fn run_cleanup(settings: &cli::CleanupSettings) -> SimpleResult<()> {
    let mut store = DirStore::new(&settings.store_dir)?;
    let mut job = LogJobSink::new(CLEANUP_JOB_NAME);
    job.add_log_entry(&format!(
        "Cleaning up background SV sets with timeout of {} hours",
        settings.timeout_hours
    ));

    let stats = cleanup_bg_sv_sets(&mut store, &mut job, settings.timeout_hours, Utc::now())?;
    info!(
        "Deleted {} background SV sets and {} background SV records",
        stats.deleted_set_count,
        stats.deleted_row_count.separate_with_commas()
    );
    Ok(())
}
