//! Build a new background SV set from all source SV calls of one release
//!

use std::collections::HashSet;
use std::time::Instant;

use chrono::Utc;
use hhmmss::Hhmmss;
use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use simple_error::{SimpleResult, bail};
use thousands::Separable;

use super::model::{BackgroundSv, BackgroundSvSet, SetState};
use super::store::BackgroundSvStore;
use crate::cluster_svs::{ClusterSettings, SvClusterer};
use crate::job::{JobSink, LifecycleEventKind, LifecycleMonitor, emit_event};
use crate::os_utils::get_max_rss_mb;
use crate::run_stats::{BuildRunStats, ChromosomeBuildStats};
use crate::source_feed::{CaseExclusion, SourceSvCall, SourceSvFeed};
use crate::sv_record::{GenomicSvRecord, GenotypeCounts, StrandOrientation, SvType};

pub const BUILD_JOB_NAME: &str = "build_bg_sv_set";

pub struct BuildSettings {
    pub release: String,

    /// Restrict the build to these chromosomes, all canonical chromosomes are used if None
    pub chromosomes: Option<Vec<String>>,

    pub cluster_settings: ClusterSettings,

    /// Log progress after this many source records on each chromosome, 0 disables progress logs
    pub progress_interval: usize,
}

/// Canonical chromosome names of `release` in build order
///
/// GRCh38 uses 'chr'-prefixed names, all other releases use the GRCh37 style.
///
pub fn get_canonical_chromosomes(release: &str) -> Vec<String> {
    let is_grch38 = release.eq_ignore_ascii_case("GRCh38");
    let mut chroms = (1..=22).map(|x| x.to_string()).collect::<Vec<_>>();
    chroms.push("X".to_string());
    chroms.push("Y".to_string());
    if is_grch38 {
        chroms.push("M".to_string());
        chroms.iter().map(|x| format!("chr{x}")).collect()
    } else {
        chroms.push("MT".to_string());
        chroms
    }
}

/// Resolve the chromosomes to build, keeping canonical order for any subset
///
pub fn get_target_chromosomes(
    release: &str,
    subset: Option<&[String]>,
) -> SimpleResult<Vec<String>> {
    let canonical = get_canonical_chromosomes(release);
    let Some(subset) = subset else {
        return Ok(canonical);
    };
    for chrom in subset {
        if !canonical.contains(chrom) {
            bail!(
                "Chromosome '{}' is not a canonical chromosome name for release {}",
                chrom,
                release
            );
        }
    }
    Ok(canonical
        .into_iter()
        .filter(|x| subset.contains(x))
        .collect())
}

/// Convert a source call into a clustering record
///
/// Insertions and breakends with `end <= start` are given `end = start + 1`. For an
/// inter-chromosomal breakend this replaces the position on the partner chromosome.
///
pub fn convert_source_call(call: &SourceSvCall) -> SimpleResult<GenomicSvRecord> {
    let sv_type = SvType::from_label(&call.sv_type)?;
    let orientation = if sv_type.is_breakend() {
        StrandOrientation::from_label(&call.pe_orientation)?
    } else {
        None
    };

    let chrom2 = if sv_type.is_linear() {
        call.chromosome.clone()
    } else {
        call.chromosome2.clone()
    };
    let mut end = call.end;

    let is_zero_length_candidate = !sv_type.is_linear();
    if is_zero_length_candidate && call.start >= end {
        end = call.start + 1;
    }

    if sv_type.is_linear() && end < call.start {
        bail!(
            "SV end precedes start for case '{}' at {}:{}-{}",
            call.case_id,
            call.chromosome,
            call.start,
            end
        );
    }

    let counts = GenotypeCounts::from_genotypes(call.genotype.values().map(|x| x.gt.as_str()));

    Ok(GenomicSvRecord {
        release: call.release.clone(),
        sv_type,
        chrom: call.chromosome.clone(),
        pos: call.start,
        chrom2,
        end,
        orientation,
        counts,
    })
}

/// Find all cases of `release` which are excluded from the background database
///
fn get_excluded_cases(
    feed: &dyn SourceSvFeed,
    exclusion: &dyn CaseExclusion,
    release: &str,
) -> SimpleResult<HashSet<String>> {
    let mut excluded_cases = HashSet::new();
    for case_id in feed.case_ids(release)? {
        if exclusion.is_excluded(&case_id)? {
            excluded_cases.insert(case_id);
        }
    }
    Ok(excluded_cases)
}

/// Cluster and persist all source records of one chromosome
///
#[allow(clippy::too_many_arguments)]
fn build_chromosome(
    store: &mut dyn BackgroundSvStore,
    feed: &dyn SourceSvFeed,
    excluded_cases: &HashSet<String>,
    clusterer: &mut SvClusterer,
    job: &mut dyn JobSink,
    set_id: u64,
    chrom: &str,
    settings: &BuildSettings,
) -> SimpleResult<ChromosomeBuildStats> {
    let release = settings.release.as_str();
    let mut stats = ChromosomeBuildStats {
        chromosome: chrom.to_string(),
        ..Default::default()
    };

    let clusters = clusterer.on_chromosome(chrom, |staging| {
        for call in feed.calls(release, chrom)? {
            let call = call?;
            stats.source_record_count += 1;
            if settings.progress_interval > 0
                && stats.source_record_count % settings.progress_interval == 0
            {
                let memory = match get_max_rss_mb() {
                    Some(x) => format!("{x:.1} MB"),
                    None => "unknown".to_string(),
                };
                job.add_log_entry(&format!(
                    "Processed {} source records on chromosome {chrom}, max RSS: {memory}",
                    stats.source_record_count.separate_with_commas()
                ));
            }

            if excluded_cases.contains(&call.case_id) {
                stats.excluded_record_count += 1;
                continue;
            }
            if call.release != release {
                stats.release_mismatch_count += 1;
                continue;
            }
            staging.push(&convert_source_call(&call)?)?;
        }
        debug!(
            "Staged {} records for clustering on chromosome {chrom}",
            staging.record_count()
        );
        Ok(())
    })?;

    let svs = clusters
        .iter()
        .map(|x| BackgroundSv::from_cluster(set_id, x))
        .collect::<Vec<_>>();
    store.add_background_svs(set_id, &svs)?;
    stats.cluster_count = svs.len();

    job.add_log_entry(&format!(
        "Chromosome {chrom}: clustered {} source records into {} background SVs ({} excluded)",
        stats.source_record_count.separate_with_commas(),
        stats.cluster_count.separate_with_commas(),
        stats.excluded_record_count.separate_with_commas()
    ));
    Ok(stats)
}

fn build_bg_sv_set_impl(
    store: &mut dyn BackgroundSvStore,
    feed: &dyn SourceSvFeed,
    exclusion: &dyn CaseExclusion,
    job: &mut dyn JobSink,
    settings: &BuildSettings,
) -> SimpleResult<(BackgroundSvSet, BuildRunStats)> {
    let start = Instant::now();
    let release = settings.release.as_str();

    settings.cluster_settings.validate()?;
    let target_chromosomes = get_target_chromosomes(release, settings.chromosomes.as_deref())?;

    let set = store.create_set(release, SetState::Building, Utc::now())?;
    job.add_log_entry(&format!(
        "Building background SV set {} for release {release}",
        set.id
    ));

    let excluded_cases = get_excluded_cases(feed, exclusion, release)?;
    job.add_log_entry(&format!(
        "Excluding {} cases from the background SV set",
        excluded_cases.len().separate_with_commas()
    ));

    let mut run_stats = BuildRunStats {
        set_id: set.id,
        release: release.to_string(),
        excluded_case_count: excluded_cases.len(),
        ..Default::default()
    };

    let mut clusterer = SvClusterer::new(
        settings.cluster_settings.clone(),
        StdRng::seed_from_u64(settings.cluster_settings.seed),
    );
    for chrom in target_chromosomes.iter() {
        let chrom_stats = build_chromosome(
            store,
            feed,
            &excluded_cases,
            &mut clusterer,
            job,
            set.id,
            chrom,
            settings,
        )?;
        run_stats.chromosomes.push(chrom_stats);
    }

    let set = store.update_set_state(set.id, SetState::Active)?;
    run_stats.total_runtime_secs = start.elapsed().as_secs_f64();

    job.add_log_entry(&format!(
        "Background SV set {} is active with {} records. Build runtime: {}",
        set.id,
        run_stats.total_cluster_count().separate_with_commas(),
        start.elapsed().hhmmssxxx()
    ));
    Ok((set, run_stats))
}

/// Build a new background SV set and mark it active
///
/// On failure the error is recorded in `job`, a FAILED event is sent to `monitor`, and the
/// partially built set is left in the building state for cleanup to reclaim.
///
pub fn build_bg_sv_set(
    store: &mut dyn BackgroundSvStore,
    feed: &dyn SourceSvFeed,
    exclusion: &dyn CaseExclusion,
    job: &mut dyn JobSink,
    mut monitor: Option<&mut dyn LifecycleMonitor>,
    settings: &BuildSettings,
) -> SimpleResult<(BackgroundSvSet, BuildRunStats)> {
    job.mark_start();
    emit_event(&mut monitor, LifecycleEventKind::Init, BUILD_JOB_NAME, None);

    match build_bg_sv_set_impl(store, feed, exclusion, job, settings) {
        Ok(x) => {
            job.mark_success();
            emit_event(&mut monitor, LifecycleEventKind::Ok, BUILD_JOB_NAME, None);
            Ok(x)
        }
        Err(e) => {
            let msg = format!("Background SV set build failed: {e}");
            job.mark_error(&msg);
            emit_event(
                &mut monitor,
                LifecycleEventKind::Failed,
                BUILD_JOB_NAME,
                Some(&msg),
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bg_db::store::MemoryStore;
    use crate::job::tests::RecordingJob;
    use crate::source_feed::tests::get_source_call;
    use crate::source_feed::{
        ExcludedCaseList, MemorySourceFeed, NoCaseExclusion, SourceSvCallIter,
    };
    use simple_error::SimpleError;

    fn get_build_settings(chromosomes: Option<&[&str]>) -> BuildSettings {
        BuildSettings {
            release: "GRCh37".to_string(),
            chromosomes: chromosomes.map(|x| x.iter().map(|c| c.to_string()).collect()),
            cluster_settings: ClusterSettings::default(),
            progress_interval: 1,
        }
    }

    #[test]
    fn test_get_target_chromosomes() {
        let chroms = get_target_chromosomes("GRCh37", None).unwrap();
        assert_eq!(chroms.len(), 25);
        assert_eq!(chroms[0], "1");
        assert_eq!(chroms[24], "MT");

        let chroms = get_target_chromosomes("GRCh38", None).unwrap();
        assert_eq!(chroms[22], "chrX");
        assert_eq!(chroms[24], "chrM");

        let subset = ["X".to_string(), "2".to_string()];
        let chroms = get_target_chromosomes("GRCh37", Some(&subset)).unwrap();
        assert_eq!(chroms, vec!["2", "X"]);

        let subset = ["chr2".to_string()];
        assert!(get_target_chromosomes("GRCh37", Some(&subset)).is_err());
    }

    #[test]
    fn test_convert_source_call() {
        let call = get_source_call("case1", "1", 1000, 2000, "DUP_TANDEM");
        let record = convert_source_call(&call).unwrap();
        assert_eq!(record.sv_type, SvType::Dup);
        assert_eq!((record.pos, record.end), (1000, 2000));
        assert_eq!(record.orientation, None);
        assert_eq!(record.counts.src_count, 1);
        assert_eq!(record.counts.carriers, 1);
        assert_eq!(record.counts.carriers_het, 1);

        // Zero-length insertion
        let call = get_source_call("case1", "1", 1000, 1000, "INS:ME:ALU");
        let record = convert_source_call(&call).unwrap();
        assert_eq!(record.sv_type, SvType::InsMe);
        assert_eq!(record.end, 1001);

        // Breakends are normalized on the same or another chromosome
        let mut call = get_source_call("case1", "1", 5000, 4000, "BND");
        call.pe_orientation = "5to5".to_string();
        let record = convert_source_call(&call).unwrap();
        assert_eq!(record.end, 5001);
        assert_eq!(record.orientation, Some(StrandOrientation::FiveToFive));

        call.chromosome2 = "3".to_string();
        let record = convert_source_call(&call).unwrap();
        assert_eq!(record.chrom2, "3");
        assert_eq!(record.end, 5001);

        let call = get_source_call("case1", "1", 1000, 2000, "SNV");
        assert!(convert_source_call(&call).is_err());

        let call = get_source_call("case1", "1", 2000, 1000, "DEL");
        assert!(convert_source_call(&call).is_err());
    }

    #[test]
    fn test_build_zero_records() {
        let mut store = MemoryStore::default();
        let feed = MemorySourceFeed::default();
        let mut job = RecordingJob::default();

        let (set, run_stats) = build_bg_sv_set(
            &mut store,
            &feed,
            &NoCaseExclusion,
            &mut job,
            None,
            &get_build_settings(None),
        )
        .unwrap();

        assert_eq!(set.state, SetState::Active);
        assert_eq!(store.get_sets().unwrap(), vec![set.clone()]);
        assert!(store.get_background_svs(set.id).unwrap().is_empty());
        assert_eq!(run_stats.chromosomes.len(), 25);
        assert_eq!(run_stats.total_cluster_count(), 0);
        assert!(job.started && job.succeeded);
        assert!(job.errors.is_empty());
    }

    #[test]
    fn test_build_two_chromosomes() {
        let mut store = MemoryStore::default();
        let feed = MemorySourceFeed {
            calls: vec![
                get_source_call("case1", "1", 1000, 2000, "DEL"),
                get_source_call("case2", "2", 1000, 2000, "DEL"),
            ],
        };
        let mut job = RecordingJob::default();
        let mut monitor = RecordingJob::default();

        let (set, run_stats) = build_bg_sv_set(
            &mut store,
            &feed,
            &NoCaseExclusion,
            &mut job,
            Some(&mut monitor),
            &get_build_settings(None),
        )
        .unwrap();

        assert_eq!(set.state, SetState::Active);
        assert_eq!(
            monitor.events,
            vec![LifecycleEventKind::Init, LifecycleEventKind::Ok]
        );
        let svs = store.get_background_svs(set.id).unwrap();
        assert_eq!(svs.len(), 2);
        assert_eq!(svs[0].chromosome, "1");
        assert_eq!(svs[1].chromosome, "2");
        assert!(svs.iter().all(|x| x.src_count == 1 && x.set_id == set.id));
        assert_eq!(run_stats.total_source_record_count(), 2);

        // Progress is logged for every record with an interval of 1
        assert!(
            job.log_entries
                .iter()
                .any(|x| x.starts_with("Processed 1 source records on chromosome 2"))
        );
    }

    #[test]
    fn test_build_chromosome_subset_and_exclusion() {
        let mut store = MemoryStore::default();
        let feed = MemorySourceFeed {
            calls: vec![
                get_source_call("case1", "1", 1000, 2000, "DEL"),
                get_source_call("case2", "1", 1010, 2010, "DEL"),
                get_source_call("case3", "1", 1000, 2000, "DEL"),
                get_source_call("case1", "3", 1000, 2000, "DEL"),
            ],
        };
        let mut job = RecordingJob::default();
        let exclusion = ExcludedCaseList::from_ids(&["case3"]);

        let (set, run_stats) = build_bg_sv_set(
            &mut store,
            &feed,
            &exclusion,
            &mut job,
            None,
            &get_build_settings(Some(&["1", "2"])),
        )
        .unwrap();

        let svs = store.get_background_svs(set.id).unwrap();
        assert_eq!(svs.len(), 1);
        assert_eq!(svs[0].src_count, 2);
        assert_eq!(svs[0].carriers_het, 2);

        assert_eq!(run_stats.excluded_case_count, 1);
        assert_eq!(run_stats.chromosomes.len(), 2);
        assert_eq!(run_stats.chromosomes[0].source_record_count, 3);
        assert_eq!(run_stats.chromosomes[0].excluded_record_count, 1);
        assert_eq!(run_stats.chromosomes[1].source_record_count, 0);
    }

    #[test]
    fn test_build_clusters_inter_chromosomal_breakends() {
        let mut store = MemoryStore::default();
        let mut bnd1 = get_source_call("case1", "1", 5000, 4000, "BND");
        bnd1.chromosome2 = "3".to_string();
        let mut bnd2 = get_source_call("case2", "1", 5010, 100, "BND");
        bnd2.chromosome2 = "3".to_string();
        let feed = MemorySourceFeed {
            calls: vec![bnd1, bnd2],
        };
        let mut job = RecordingJob::default();

        let (set, _) = build_bg_sv_set(
            &mut store,
            &feed,
            &NoCaseExclusion,
            &mut job,
            None,
            &get_build_settings(Some(&["1"])),
        )
        .unwrap();

        let svs = store.get_background_svs(set.id).unwrap();
        assert_eq!(svs.len(), 1);
        assert_eq!(svs[0].chromosome2, "3");
        assert_eq!(svs[0].src_count, 2);
    }

    /// Feed which fails when reading any chromosome after the first
    struct FailingFeed {
        inner: MemorySourceFeed,
    }

    impl SourceSvFeed for FailingFeed {
        fn case_ids(&self, release: &str) -> SimpleResult<Vec<String>> {
            self.inner.case_ids(release)
        }

        fn calls<'a>(&'a self, release: &str, chrom: &str) -> SimpleResult<SourceSvCallIter<'a>> {
            if chrom == "1" {
                self.inner.calls(release, chrom)
            } else {
                Err(SimpleError::new("source unavailable"))
            }
        }
    }

    #[test]
    fn test_build_failure_leaves_set_building() {
        let mut store = MemoryStore::default();
        let feed = FailingFeed {
            inner: MemorySourceFeed {
                calls: vec![get_source_call("case1", "1", 1000, 2000, "DEL")],
            },
        };
        let mut job = RecordingJob::default();
        let mut monitor = RecordingJob::default();

        let result = build_bg_sv_set(
            &mut store,
            &feed,
            &NoCaseExclusion,
            &mut job,
            Some(&mut monitor),
            &get_build_settings(None),
        );
        assert!(result.is_err());

        let sets = store.get_sets().unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].state, SetState::Building);

        assert!(job.started && !job.succeeded);
        assert_eq!(job.errors.len(), 1);
        assert!(job.errors[0].contains("source unavailable"));
        assert_eq!(
            monitor.events,
            vec![LifecycleEventKind::Init, LifecycleEventKind::Failed]
        );
    }
}
