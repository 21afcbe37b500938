//! Retention policy for background SV sets
//!

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use serde::Serialize;
use simple_error::SimpleResult;

use super::model::{BackgroundSvSet, SetState};
use super::store::BackgroundSvStore;
use crate::job::JobSink;

/// Number of most recent active sets retained by cleanup
pub const KEEP_ACTIVE_SET_COUNT: usize = 2;

#[derive(Debug, Default, Eq, PartialEq, Serialize)]
pub struct CleanupStats {
    pub deleted_set_count: usize,
    pub deleted_row_count: usize,
}

/// Ids of all sets retained by the cleanup policy
///
/// A negative `timeout_hours`, or one too large to represent as a duration, retains all
/// non-active sets.
///
fn get_keep_set_ids(
    sets: &[BackgroundSvSet],
    timeout_hours: i64,
    now: DateTime<Utc>,
) -> BTreeSet<u64> {
    let mut keep_set_ids = sets
        .iter()
        .filter(|x| x.state == SetState::Active)
        .sorted_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)))
        .take(KEEP_ACTIVE_SET_COUNT)
        .map(|x| x.id)
        .collect::<BTreeSet<_>>();

    let timeout = if timeout_hours < 0 {
        None
    } else {
        Duration::try_hours(timeout_hours)
    };
    let is_young = |set: &BackgroundSvSet| match timeout {
        Some(timeout) => now - set.created < timeout,
        None => true,
    };
    keep_set_ids.extend(
        sets.iter()
            .filter(|x| x.state != SetState::Active && is_young(*x))
            .map(|x| x.id),
    );
    keep_set_ids
}

fn cleanup_bg_sv_sets_impl(
    store: &mut dyn BackgroundSvStore,
    job: &mut dyn JobSink,
    timeout_hours: i64,
    now: DateTime<Utc>,
) -> SimpleResult<CleanupStats> {
    let sets = store.get_sets()?;
    let keep_set_ids = get_keep_set_ids(&sets, timeout_hours, now);
    job.add_log_entry(&format!(
        "Keeping {} of {} background SV sets: {}",
        keep_set_ids.len(),
        sets.len(),
        keep_set_ids.iter().join(",")
    ));

    let deleted_row_count = store.delete_background_svs_except(&keep_set_ids)?;
    let deleted_set_count = store.delete_sets_except(&keep_set_ids)?;
    job.add_log_entry(&format!(
        "Deleted {deleted_set_count} background SV sets and {deleted_row_count} background SV records"
    ));
    Ok(CleanupStats {
        deleted_set_count,
        deleted_row_count,
    })
}

/// Delete background SV sets which are superseded or stalled
///
/// The two most recently created active sets are kept, along with any set in another state
/// created less than `timeout_hours` before `now`. Records of every other set are deleted first,
/// followed by the sets themselves.
///
pub fn cleanup_bg_sv_sets(
    store: &mut dyn BackgroundSvStore,
    job: &mut dyn JobSink,
    timeout_hours: i64,
    now: DateTime<Utc>,
) -> SimpleResult<CleanupStats> {
    job.mark_start();
    match cleanup_bg_sv_sets_impl(store, job, timeout_hours, now) {
        Ok(x) => {
            job.mark_success();
            Ok(x)
        }
        Err(e) => {
            job.mark_error(&format!("Background SV set cleanup failed: {e}"));
            Err(e)
        }
    }
}
