//! Directory-backed background SV store
//!
//! Layout under the store root:
//! - `sets/<id>.json` set metadata
//! - `rows/<id>.tsv` background SV records of the set, with a header row
//! - `ids/<id>.claim` the highest set id handed out so far, never removed by cleanup
//!

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use log::debug;
use simple_error::{SimpleResult, bail, try_with};

use super::model::{BackgroundSv, BackgroundSvSet, SetState};
use super::store::BackgroundSvStore;
use crate::os_utils::create_dir_all;

pub struct DirStore {
    sets_dir: Utf8PathBuf,
    rows_dir: Utf8PathBuf,
    ids_dir: Utf8PathBuf,
}

impl DirStore {
    /// Open the store at `root`, creating its directories as needed
    pub fn new(root: &Utf8Path) -> SimpleResult<Self> {
        let sets_dir = root.join("sets");
        let rows_dir = root.join("rows");
        let ids_dir = root.join("ids");
        create_dir_all(&sets_dir, "background SV set")?;
        create_dir_all(&rows_dir, "background SV row")?;
        create_dir_all(&ids_dir, "background SV set id")?;
        Ok(Self {
            sets_dir,
            rows_dir,
            ids_dir,
        })
    }

    fn set_filename(&self, set_id: u64) -> Utf8PathBuf {
        self.sets_dir.join(format!("{set_id}.json"))
    }

    fn rows_filename(&self, set_id: u64) -> Utf8PathBuf {
        self.rows_dir.join(format!("{set_id}.tsv"))
    }

    fn claim_filename(&self, set_id: u64) -> Utf8PathBuf {
        self.ids_dir.join(format!("{set_id}.claim"))
    }

    /// Claim a new set id which is higher than any id handed out before
    ///
    /// Each id is claimed with an exclusive create of its claim file, so concurrent builds on
    /// one store get distinct ids. Lower claim files are removed afterwards, the highest one is
    /// kept as the store's high-water mark.
    ///
    fn claim_set_id(&self) -> SimpleResult<u64> {
        let max_claim_id = Self::list_ids(&self.ids_dir, "claim")?.last().copied();
        let max_set_id = Self::list_ids(&self.sets_dir, "json")?.last().copied();
        let mut id = max_claim_id.max(max_set_id).map_or(1, |x| x + 1);
        loop {
            let filename = self.claim_filename(id);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&filename)
            {
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => id += 1,
                Err(e) => bail!("Unable to create file: '{}': {}", filename, e),
            }
        }

        for old_id in Self::list_ids(&self.ids_dir, "claim")? {
            if old_id >= id {
                break;
            }
            let filename = self.claim_filename(old_id);
            match fs::remove_file(&filename) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => bail!("Unable to delete file: '{}': {}", filename, e),
            }
        }
        Ok(id)
    }

    /// Ids of every file in `dir` named `<id>.<extension>`
    fn list_ids(dir: &Utf8Path, extension: &str) -> SimpleResult<Vec<u64>> {
        let entries = try_with!(
            dir.read_dir_utf8(),
            "Unable to read store directory: '{}'",
            dir
        );
        let mut ids = Vec::new();
        for entry in entries {
            let entry = try_with!(entry, "Unable to read store directory: '{}'", dir);
            let path = entry.path();
            if path.extension() != Some(extension) {
                continue;
            }
            if let Some(id) = path.file_stem().and_then(|x| x.parse::<u64>().ok()) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn read_set(&self, set_id: u64) -> SimpleResult<BackgroundSvSet> {
        let filename = self.set_filename(set_id);
        let file = try_with!(
            File::open(&filename),
            "Unable to open background SV set file: '{}'",
            filename
        );
        let set = try_with!(
            serde_json::from_reader(BufReader::new(file)),
            "Unable to parse background SV set file: '{}'",
            filename
        );
        Ok(set)
    }

    /// Replace the metadata file of `set` by writing a temp file and renaming it into place
    fn write_set(&self, set: &BackgroundSvSet) -> SimpleResult<()> {
        let filename = self.set_filename(set.id);
        let tmp_filename = self.sets_dir.join(format!(".{}.json.tmp", set.id));
        {
            let file = try_with!(
                File::create(&tmp_filename),
                "Unable to create file: '{}'",
                tmp_filename
            );
            let mut writer = BufWriter::new(file);
            try_with!(
                serde_json::to_writer_pretty(&mut writer, set),
                "Unable to write background SV set file: '{}'",
                tmp_filename
            );
            try_with!(
                writer.flush(),
                "Unable to write background SV set file: '{}'",
                tmp_filename
            );
        }
        try_with!(
            fs::rename(&tmp_filename, &filename),
            "Unable to move '{}' to '{}'",
            tmp_filename,
            filename
        );
        Ok(())
    }

    /// Count the records in a rows file without parsing them
    fn count_rows(filename: &Utf8Path) -> SimpleResult<usize> {
        let file = try_with!(
            File::open(filename),
            "Unable to open background SV row file: '{}'",
            filename
        );
        let line_count = BufReader::new(file).lines().count();
        Ok(line_count.saturating_sub(1))
    }
}

impl BackgroundSvStore for DirStore {
    fn create_set(
        &mut self,
        release: &str,
        state: SetState,
        created: DateTime<Utc>,
    ) -> SimpleResult<BackgroundSvSet> {
        // The set file only appears once complete, through the rename in write_set
        let id = self.claim_set_id()?;
        let set = BackgroundSvSet {
            id,
            release: release.to_string(),
            created,
            state,
        };
        self.write_set(&set)?;
        debug!("Created background SV set {id} in '{}'", self.sets_dir);
        Ok(set)
    }

    fn update_set_state(
        &mut self,
        set_id: u64,
        state: SetState,
    ) -> SimpleResult<BackgroundSvSet> {
        if !self.set_filename(set_id).exists() {
            bail!("Can't update state of unknown background SV set {}", set_id);
        }
        let mut set = self.read_set(set_id)?;
        set.state = state;
        self.write_set(&set)?;
        Ok(set)
    }

    fn add_background_svs(&mut self, set_id: u64, svs: &[BackgroundSv]) -> SimpleResult<()> {
        if !self.set_filename(set_id).exists() {
            bail!("Can't add records to unknown background SV set {}", set_id);
        }
        let filename = self.rows_filename(set_id);
        let file = try_with!(
            OpenOptions::new().create(true).append(true).open(&filename),
            "Unable to open background SV row file: '{}'",
            filename
        );
        let is_new_file = try_with!(
            file.metadata(),
            "Unable to read background SV row file: '{}'",
            filename
        )
        .len()
            == 0;

        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(is_new_file)
            .from_writer(BufWriter::new(file));
        for sv in svs {
            try_with!(
                writer.serialize(sv),
                "Unable to write background SV row file: '{}'",
                filename
            );
        }
        try_with!(
            writer.flush(),
            "Unable to write background SV row file: '{}'",
            filename
        );
        Ok(())
    }

    fn get_sets(&self) -> SimpleResult<Vec<BackgroundSvSet>> {
        Self::list_ids(&self.sets_dir, "json")?
            .into_iter()
            .map(|id| self.read_set(id))
            .collect()
    }

    fn get_background_svs(&self, set_id: u64) -> SimpleResult<Vec<BackgroundSv>> {
        let filename = self.rows_filename(set_id);
        if !filename.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = try_with!(
            csv::ReaderBuilder::new()
                .delimiter(b'\t')
                .has_headers(true)
                .from_path(&filename),
            "Unable to open background SV row file: '{}'",
            filename
        );
        let mut svs = Vec::new();
        for sv in rdr.deserialize() {
            let sv = try_with!(
                sv,
                "Unable to parse record from background SV row file: '{}'",
                filename
            );
            svs.push(sv);
        }
        Ok(svs)
    }

    fn delete_background_svs_except(
        &mut self,
        keep_set_ids: &BTreeSet<u64>,
    ) -> SimpleResult<usize> {
        let mut deleted = 0;
        for set_id in Self::list_ids(&self.rows_dir, "tsv")? {
            if keep_set_ids.contains(&set_id) {
                continue;
            }
            let filename = self.rows_filename(set_id);
            deleted += Self::count_rows(&filename)?;
            try_with!(
                fs::remove_file(&filename),
                "Unable to delete background SV row file: '{}'",
                filename
            );
        }
        Ok(deleted)
    }

    fn delete_sets_except(&mut self, keep_set_ids: &BTreeSet<u64>) -> SimpleResult<usize> {
        let mut deleted = 0;
        for set_id in Self::list_ids(&self.sets_dir, "json")? {
            if keep_set_ids.contains(&set_id) {
                continue;
            }
            let filename = self.set_filename(set_id);
            try_with!(
                fs::remove_file(&filename),
                "Unable to delete background SV set file: '{}'",
                filename
            );
            deleted += 1;
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sv_record::{StrandOrientation, SvType};

    fn get_background_sv(set_id: u64, sv_type: SvType, start: i64) -> BackgroundSv {
        BackgroundSv {
            set_id,
            release: "GRCh37".to_string(),
            sv_type,
            chromosome: "1".to_string(),
            chromosome2: "1".to_string(),
            start,
            end: start + 1000,
            pe_orientation: None,
            bin: 585,
            src_count: 3,
            carriers: 2,
            carriers_het: 1,
            carriers_hom: 1,
            carriers_hemi: 0,
        }
    }

    #[test]
    fn test_set_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();

        let mut store = DirStore::new(root).unwrap();
        let set1 = store
            .create_set("GRCh37", SetState::Building, Utc::now())
            .unwrap();
        let set2 = store
            .create_set("GRCh38", SetState::Building, Utc::now())
            .unwrap();
        assert_eq!(set1.id, 1);
        assert_eq!(set2.id, 2);

        let updated = store.update_set_state(set1.id, SetState::Active).unwrap();
        assert_eq!(updated.state, SetState::Active);
        assert!(store.update_set_state(7, SetState::Active).is_err());

        // Reopening the store sees the same sets
        let store = DirStore::new(root).unwrap();
        let sets = store.get_sets().unwrap();
        assert_eq!(sets, vec![updated, set2]);

        // No temp files are left behind
        let names = root
            .join("sets")
            .read_dir_utf8()
            .unwrap()
            .map(|x| x.unwrap().file_name().to_string())
            .collect::<BTreeSet<_>>();
        assert_eq!(
            names,
            ["1.json", "2.json"].iter().map(|x| x.to_string()).collect()
        );
    }

    #[test]
    fn test_set_ids_not_reused_after_delete() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();

        let mut store = DirStore::new(root).unwrap();
        let set1 = store
            .create_set("GRCh37", SetState::Active, Utc::now())
            .unwrap();
        let set2 = store
            .create_set("GRCh37", SetState::Building, Utc::now())
            .unwrap();
        assert_eq!((set1.id, set2.id), (1, 2));

        assert_eq!(store.delete_sets_except(&BTreeSet::from([1])).unwrap(), 1);
        let set3 = store
            .create_set("GRCh37", SetState::Building, Utc::now())
            .unwrap();
        assert_eq!(set3.id, 3);

        // The high-water mark survives reopening and deletion of every set
        let mut store = DirStore::new(root).unwrap();
        assert_eq!(store.delete_sets_except(&BTreeSet::new()).unwrap(), 2);
        let set4 = store
            .create_set("GRCh37", SetState::Building, Utc::now())
            .unwrap();
        assert_eq!(set4.id, 4);

        // Only the highest claim is kept
        let claims = DirStore::list_ids(&root.join("ids"), "claim").unwrap();
        assert_eq!(claims, vec![4]);
    }

    #[test]
    fn test_claimed_id_has_no_set_file_until_written() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();

        let mut store = DirStore::new(root).unwrap();
        store
            .create_set("GRCh37", SetState::Active, Utc::now())
            .unwrap();

        // A claim taken by a concurrent build is skipped, and its set is not listed yet
        let claimed_id = store.claim_set_id().unwrap();
        assert_eq!(claimed_id, 2);
        assert!(!store.set_filename(claimed_id).exists());
        assert_eq!(store.get_sets().unwrap().len(), 1);

        let set = store
            .create_set("GRCh37", SetState::Building, Utc::now())
            .unwrap();
        assert_eq!(set.id, 3);
        assert_eq!(store.get_sets().unwrap().len(), 2);
    }

    #[test]
    fn test_rows_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();

        let mut store = DirStore::new(root).unwrap();
        let set = store
            .create_set("GRCh37", SetState::Building, Utc::now())
            .unwrap();
        assert!(store.get_background_svs(set.id).unwrap().is_empty());

        let mut bnd = get_background_sv(set.id, SvType::Bnd, 5000);
        bnd.chromosome2 = "9".to_string();
        bnd.pe_orientation = Some(StrandOrientation::FiveToThree);
        let svs = vec![get_background_sv(set.id, SvType::DelMe, 1000), bnd];

        // Two appends write a single header
        store.add_background_svs(set.id, &svs[..1]).unwrap();
        store.add_background_svs(set.id, &svs[1..]).unwrap();
        assert_eq!(store.get_background_svs(set.id).unwrap(), svs);

        assert!(store.add_background_svs(set.id + 1, &svs).is_err());
    }

    #[test]
    fn test_delete_except() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();

        let mut store = DirStore::new(root).unwrap();
        for _ in 0..3 {
            let set = store
                .create_set("GRCh37", SetState::Active, Utc::now())
                .unwrap();
            let svs = (0..set.id)
                .map(|i| get_background_sv(set.id, SvType::Del, 1000 * i as i64))
                .collect::<Vec<_>>();
            store.add_background_svs(set.id, &svs).unwrap();
        }

        let keep = BTreeSet::from([2]);
        assert_eq!(store.delete_background_svs_except(&keep).unwrap(), 1 + 3);
        assert_eq!(store.delete_sets_except(&keep).unwrap(), 2);

        let sets = store.get_sets().unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].id, 2);
        assert_eq!(store.get_background_svs(2).unwrap().len(), 2);
        assert!(store.get_background_svs(1).unwrap().is_empty());
    }
}
