//! Persistence interface for background SV sets and their records
//!

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use simple_error::{SimpleResult, bail};

use super::model::{BackgroundSv, BackgroundSvSet, SetState};

pub trait BackgroundSvStore {
    /// Create a new set with a store-assigned id
    fn create_set(
        &mut self,
        release: &str,
        state: SetState,
        created: DateTime<Utc>,
    ) -> SimpleResult<BackgroundSvSet>;

    fn update_set_state(&mut self, set_id: u64, state: SetState)
    -> SimpleResult<BackgroundSvSet>;

    /// Append records to an existing set
    fn add_background_svs(&mut self, set_id: u64, svs: &[BackgroundSv]) -> SimpleResult<()>;

    /// All sets, in ascending id order
    fn get_sets(&self) -> SimpleResult<Vec<BackgroundSvSet>>;

    /// All records of a set, in insertion order
    fn get_background_svs(&self, set_id: u64) -> SimpleResult<Vec<BackgroundSv>>;

    /// Delete the records of every set not in `keep_set_ids`, returning the deleted record count
    fn delete_background_svs_except(&mut self, keep_set_ids: &BTreeSet<u64>)
    -> SimpleResult<usize>;

    /// Delete every set not in `keep_set_ids`, returning the deleted set count
    fn delete_sets_except(&mut self, keep_set_ids: &BTreeSet<u64>) -> SimpleResult<usize>;
}

/// Store holding all sets and records in memory
#[derive(Default)]
pub struct MemoryStore {
    sets: BTreeMap<u64, BackgroundSvSet>,
    svs: BTreeMap<u64, Vec<BackgroundSv>>,
    next_id: u64,
}

impl BackgroundSvStore for MemoryStore {
    fn create_set(
        &mut self,
        release: &str,
        state: SetState,
        created: DateTime<Utc>,
    ) -> SimpleResult<BackgroundSvSet> {
        self.next_id += 1;
        let set = BackgroundSvSet {
            id: self.next_id,
            release: release.to_string(),
            created,
            state,
        };
        self.sets.insert(set.id, set.clone());
        Ok(set)
    }

    fn update_set_state(
        &mut self,
        set_id: u64,
        state: SetState,
    ) -> SimpleResult<BackgroundSvSet> {
        match self.sets.get_mut(&set_id) {
            Some(set) => {
                set.state = state;
                Ok(set.clone())
            }
            None => bail!("Can't update state of unknown background SV set {}", set_id),
        }
    }

    fn add_background_svs(&mut self, set_id: u64, svs: &[BackgroundSv]) -> SimpleResult<()> {
        if !self.sets.contains_key(&set_id) {
            bail!("Can't add records to unknown background SV set {}", set_id);
        }
        self.svs.entry(set_id).or_default().extend_from_slice(svs);
        Ok(())
    }

    fn get_sets(&self) -> SimpleResult<Vec<BackgroundSvSet>> {
        Ok(self.sets.values().cloned().collect())
    }

    fn get_background_svs(&self, set_id: u64) -> SimpleResult<Vec<BackgroundSv>> {
        Ok(self.svs.get(&set_id).cloned().unwrap_or_default())
    }

    fn delete_background_svs_except(
        &mut self,
        keep_set_ids: &BTreeSet<u64>,
    ) -> SimpleResult<usize> {
        let mut deleted = 0;
        self.svs.retain(|set_id, svs| {
            let keep = keep_set_ids.contains(set_id);
            if !keep {
                deleted += svs.len();
            }
            keep
        });
        Ok(deleted)
    }

    fn delete_sets_except(&mut self, keep_set_ids: &BTreeSet<u64>) -> SimpleResult<usize> {
        let before = self.sets.len();
        self.sets.retain(|set_id, _| keep_set_ids.contains(set_id));
        Ok(before - self.sets.len())
    }
}
