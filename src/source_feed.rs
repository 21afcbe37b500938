//! Source SV calls consumed by the background database build
//!
//! The build only depends on the [SourceSvFeed] and [CaseExclusion] traits. File-backed
//! implementations are provided for the command-line tool, and in-memory versions for tests
//! and embedding.
//!

use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use simple_error::{SimpleResult, try_with};

use crate::sv_record::GenotypeMap;

/// One SV call from a single case, as provided by the source feed
///
/// Positions are 1-based. The SV type and orientation are kept as the raw labels from the caller
/// output, they are validated on conversion to a clustering record.
///
#[derive(Clone, Debug)]
pub struct SourceSvCall {
    pub case_id: String,
    pub release: String,
    pub chromosome: String,
    pub start: i64,
    pub chromosome2: String,
    pub end: i64,
    pub sv_type: String,
    pub pe_orientation: String,
    pub genotype: GenotypeMap,
}

pub type SourceSvCallIter<'a> = Box<dyn Iterator<Item = SimpleResult<SourceSvCall>> + 'a>;

pub trait SourceSvFeed {
    /// All case ids with at least one call for `release`, in sorted order
    fn case_ids(&self, release: &str) -> SimpleResult<Vec<String>>;

    /// All calls for `release` whose first position is on `chrom`
    ///
    /// Iteration order must be stable between calls.
    ///
    fn calls<'a>(&'a self, release: &str, chrom: &str) -> SimpleResult<SourceSvCallIter<'a>>;
}

pub trait CaseExclusion {
    /// Return true if the case's project has excluded it from the background database
    fn is_excluded(&self, case_id: &str) -> SimpleResult<bool>;
}

/// In-memory source feed
#[derive(Default)]
pub struct MemorySourceFeed {
    pub calls: Vec<SourceSvCall>,
}

impl SourceSvFeed for MemorySourceFeed {
    fn case_ids(&self, release: &str) -> SimpleResult<Vec<String>> {
        Ok(self
            .calls
            .iter()
            .filter(|x| x.release == release)
            .map(|x| x.case_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect())
    }

    fn calls<'a>(&'a self, release: &str, chrom: &str) -> SimpleResult<SourceSvCallIter<'a>> {
        let release = release.to_string();
        let chrom = chrom.to_string();
        Ok(Box::new(
            self.calls
                .iter()
                .filter(move |x| x.release == release && x.chromosome == chrom)
                .map(|x| Ok(x.clone())),
        ))
    }
}

/// Raw row layout of the tab-separated source file
#[derive(Deserialize)]
struct TsvRow {
    case_id: String,
    release: String,
    chromosome: String,
    start: i64,
    chromosome2: String,
    end: i64,
    sv_type: String,
    pe_orientation: String,
    genotype: String,
}

impl TsvRow {
    fn into_source_call(self) -> SimpleResult<SourceSvCall> {
        let genotype = try_with!(
            serde_json::from_str(&self.genotype),
            "Unable to parse genotype column for case '{}' at {}:{}",
            self.case_id,
            self.chromosome,
            self.start
        );
        Ok(SourceSvCall {
            case_id: self.case_id,
            release: self.release,
            chromosome: self.chromosome,
            start: self.start,
            chromosome2: self.chromosome2,
            end: self.end,
            sv_type: self.sv_type,
            pe_orientation: self.pe_orientation,
            genotype,
        })
    }
}

/// Open a file for reading, transparently decompressing it if the name ends in '.gz'
///
fn open_source_file(filename: &Utf8Path) -> SimpleResult<Box<dyn Read>> {
    let file = try_with!(
        File::open(filename),
        "Unable to open source SV file: '{}'",
        filename
    );
    if filename.extension() == Some("gz") {
        Ok(Box::new(flate2::read::MultiGzDecoder::new(BufReader::new(
            file,
        ))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Source feed backed by a tab-separated file with a header row
///
/// Expected columns are: case_id, release, chromosome, start, chromosome2, end, sv_type,
/// pe_orientation and genotype, where genotype is a JSON object mapping each sample name to its
/// genotype info (`{"sample": {"gt": "0/1"}}`). The file is streamed once per chromosome.
///
pub struct TsvSourceFeed {
    filename: Utf8PathBuf,
}

impl TsvSourceFeed {
    pub fn new(filename: &Utf8Path) -> Self {
        Self {
            filename: filename.to_owned(),
        }
    }

    fn rows(&self) -> SimpleResult<impl Iterator<Item = SimpleResult<SourceSvCall>> + use<>> {
        let reader = open_source_file(&self.filename)?;
        let filename = self.filename.clone();
        let rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .quoting(false)
            .comment(Some(b'#'))
            .from_reader(reader);
        Ok(rdr.into_deserialize::<TsvRow>().map(move |x| {
            let row = try_with!(x, "Unable to parse record from source SV file: '{}'", filename);
            row.into_source_call()
        }))
    }
}

impl SourceSvFeed for TsvSourceFeed {
    fn case_ids(&self, release: &str) -> SimpleResult<Vec<String>> {
        let mut case_ids = BTreeSet::new();
        for call in self.rows()? {
            let call = call?;
            if call.release == release {
                case_ids.insert(call.case_id);
            }
        }
        Ok(case_ids.into_iter().collect())
    }

    fn calls<'a>(&'a self, release: &str, chrom: &str) -> SimpleResult<SourceSvCallIter<'a>> {
        let release = release.to_string();
        let chrom = chrom.to_string();
        Ok(Box::new(self.rows()?.filter(move |x| match x {
            Ok(call) => call.release == release && call.chromosome == chrom,
            Err(_) => true,
        })))
    }
}

/// No case is excluded
pub struct NoCaseExclusion;

impl CaseExclusion for NoCaseExclusion {
    fn is_excluded(&self, _case_id: &str) -> SimpleResult<bool> {
        Ok(false)
    }
}

/// A fixed list of excluded case ids
#[derive(Default)]
pub struct ExcludedCaseList {
    case_ids: HashSet<String>,
}

impl ExcludedCaseList {
    pub fn from_ids<S: AsRef<str>>(case_ids: &[S]) -> Self {
        Self {
            case_ids: case_ids.iter().map(|x| x.as_ref().to_string()).collect(),
        }
    }

    /// Read case ids from a file with one id per line
    ///
    /// Blank lines and lines starting with '#' are skipped
    ///
    pub fn from_file(filename: &Utf8Path) -> SimpleResult<Self> {
        let file = try_with!(
            File::open(filename),
            "Unable to open excluded case file: '{}'",
            filename
        );
        let mut case_ids = HashSet::new();
        for line in BufReader::new(file).lines() {
            let line = try_with!(line, "Unable to read excluded case file: '{}'", filename);
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            case_ids.insert(line.to_string());
        }
        Ok(Self { case_ids })
    }

    pub fn len(&self) -> usize {
        self.case_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.case_ids.is_empty()
    }
}

impl CaseExclusion for ExcludedCaseList {
    fn is_excluded(&self, case_id: &str) -> SimpleResult<bool> {
        Ok(self.case_ids.contains(case_id))
    }
}
