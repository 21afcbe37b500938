//! Per-SV-type scratch partitions used to stage records before clustering
//!
//! Records are spilled to anonymous temporary files in MessagePack format, so that only one SV
//! type partition needs to be held in memory at a time.
//!

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};

use simple_error::{SimpleResult, map_err_with, try_with};

use crate::sv_record::{GenomicSvRecord, SvType};

struct ScratchPartition {
    writer: BufWriter<File>,
    record_count: usize,
}

impl ScratchPartition {
    fn new() -> SimpleResult<Self> {
        let file = try_with!(tempfile::tempfile(), "Unable to create scratch file");
        Ok(Self {
            writer: BufWriter::new(file),
            record_count: 0,
        })
    }

    fn push(&mut self, record: &GenomicSvRecord) -> SimpleResult<()> {
        try_with!(
            rmp_serde::encode::write(&mut self.writer, record),
            "Unable to write record to scratch file"
        );
        self.record_count += 1;
        Ok(())
    }

    /// Read all records back from the partition, consuming it
    fn into_records(self) -> SimpleResult<Vec<GenomicSvRecord>> {
        let mut writer = self.writer;
        try_with!(writer.flush(), "Unable to flush scratch file");
        let mut file = map_err_with!(writer.into_inner(), "Unable to flush scratch file")?;
        try_with!(file.seek(SeekFrom::Start(0)), "Unable to rewind scratch file");

        let mut reader = BufReader::new(file);
        let mut records = Vec::with_capacity(self.record_count);
        for _ in 0..self.record_count {
            let record = try_with!(
                rmp_serde::from_read(&mut reader),
                "Unable to read record from scratch file"
            );
            records.push(record);
        }
        Ok(records)
    }
}

/// Staging area for one chromosome, with one scratch partition per SV type
#[derive(Default)]
pub struct SvTypeScratch {
    partitions: BTreeMap<SvType, ScratchPartition>,
}

impl SvTypeScratch {
    pub fn push(&mut self, record: &GenomicSvRecord) -> SimpleResult<()> {
        let partition = match self.partitions.entry(record.sv_type) {
            std::collections::btree_map::Entry::Occupied(x) => x.into_mut(),
            std::collections::btree_map::Entry::Vacant(x) => x.insert(ScratchPartition::new()?),
        };
        partition.push(record)
    }

    pub fn record_count(&self) -> usize {
        self.partitions.values().map(|x| x.record_count).sum()
    }

    /// Consume the staging area, returning an iterator over all partitions in SV type order
    ///
    /// Each partition is only read back from disk when the iterator reaches it.
    ///
    pub fn into_partitions(
        self,
    ) -> impl Iterator<Item = (SvType, SimpleResult<Vec<GenomicSvRecord>>)> {
        self.partitions
            .into_iter()
            .map(|(sv_type, partition)| (sv_type, partition.into_records()))
    }
}
