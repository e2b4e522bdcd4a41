// src/output.rs

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use ahash::AHashSet;
use lru::LruCache;

use crate::error::{Error, Result};
use crate::readdb::ReadStore;
use crate::types::{ClassificationResult, Mate};

/// `>read_id|component` header followed by the sequence.
pub fn write_fasta_record<W: Write>(
    out: &mut W,
    read_id: &str,
    component: u64,
    sequence: &str,
) -> io::Result<()> {
    writeln!(out, ">{}|{}", read_id, component)?;
    writeln!(out, "{}", sequence)
}

/// Receives the classification of each mate pair, in input order.
pub trait PairSink {
    fn write_pair(
        &mut self,
        read1: &str,
        result1: &ClassificationResult,
        read2: &str,
        result2: &ClassificationResult,
    ) -> Result<()>;

    /// Called once after the last pair.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Fans every pair out to several sinks, in order.
impl<S: PairSink + ?Sized> PairSink for Vec<Box<S>> {
    fn write_pair(
        &mut self,
        read1: &str,
        result1: &ClassificationResult,
        read2: &str,
        result2: &ClassificationResult,
    ) -> Result<()> {
        for sink in self.iter_mut() {
            sink.write_pair(read1, result1, read2, result2)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        for sink in self.iter_mut() {
            sink.finish()?;
        }
        Ok(())
    }
}

/// One line per read: `read_id  mate  mapped  scenario  component  start:end`
pub struct TsvReportSink<W: Write> {
    out: W,
}

impl<W: Write> TsvReportSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, read_id: &str, mate: Mate, res: &ClassificationResult) -> io::Result<()> {
        writeln!(
            self.out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            read_id,
            mate.number(),
            u8::from(res.mapped),
            res.scenario,
            res.assigned_component,
            res.span_label()
        )
    }
}

impl<W: Write> PairSink for TsvReportSink<W> {
    fn write_pair(
        &mut self,
        read1: &str,
        result1: &ClassificationResult,
        read2: &str,
        result2: &ClassificationResult,
    ) -> Result<()> {
        self.write_line(read1, Mate::First, result1)?;
        self.write_line(read2, Mate::Second, result2)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Writes every constructed sequence to one FASTA stream per mate.
pub struct FastaPairSink<W: Write> {
    mate1: W,
    mate2: W,
}

impl FastaPairSink<BufWriter<File>> {
    /// `<dir>/R1.fa` and `<dir>/R2.fa`
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self::new(
            BufWriter::new(File::create(dir.join("R1.fa"))?),
            BufWriter::new(File::create(dir.join("R2.fa"))?),
        ))
    }
}

impl<W: Write> FastaPairSink<W> {
    pub fn new(mate1: W, mate2: W) -> Self {
        Self { mate1, mate2 }
    }

    pub fn into_inner(self) -> (W, W) {
        (self.mate1, self.mate2)
    }
}

impl<W: Write> PairSink for FastaPairSink<W> {
    fn write_pair(
        &mut self,
        read1: &str,
        result1: &ClassificationResult,
        read2: &str,
        result2: &ClassificationResult,
    ) -> Result<()> {
        write_fasta_record(&mut self.mate1, read1, result1.assigned_component, &result1.constructed_sequence)?;
        write_fasta_record(&mut self.mate2, read2, result2.assigned_component, &result2.constructed_sequence)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.mate1.flush()?;
        self.mate2.flush()?;
        Ok(())
    }
}

/// Stores both mates' assigned components on the read's row.
/// Rows are keyed by the integer `ID` of the `reads` table; pairs whose
/// name is not such an id are logged and left out of the update.
pub struct ReadStoreSink<'a> {
    store: &'a ReadStore,
    updated: usize,
    skipped: usize,
}

impl<'a> ReadStoreSink<'a> {
    pub fn new(store: &'a ReadStore) -> Result<Self> {
        store.begin()?;
        Ok(Self { store, updated: 0, skipped: 0 })
    }

    pub fn updated(&self) -> usize {
        self.updated
    }

    /// Pairs whose read name did not parse as a row id.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl PairSink for ReadStoreSink<'_> {
    fn write_pair(
        &mut self,
        read1: &str,
        result1: &ClassificationResult,
        _read2: &str,
        result2: &ClassificationResult,
    ) -> Result<()> {
        let id: i64 = match read1.trim_end_matches("/1").parse() {
            Ok(id) => id,
            Err(_) => {
                log::warn!("read `{}` has no numeric row ID, not stored", read1);
                self.skipped += 1;
                return Ok(());
            }
        };
        self.store
            .update_original_components(id, result1.assigned_component, result2.assigned_component)?;
        self.updated += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.skipped > 0 {
            log::warn!(
                "{} pairs were not stored: their names are not row IDs",
                self.skipped
            );
        }
        log::info!("stored components of {} read pairs", self.updated);
        self.store.commit()
    }
}

/// Per-(mate, component) FASTA files under `<root>/R{1,2}/<component>.fa`.
///
/// Files are opened on their first record and kept in an LRU pool of at most
/// `max_open` handles. A file is truncated the first time it is opened and
/// appended to when reopened after an eviction.
pub struct FastaWriterPool {
    root: PathBuf,
    open: LruCache<(Mate, u64), BufWriter<File>>,
    created: AHashSet<(Mate, u64)>,
}

impl FastaWriterPool {
    pub fn new<P: Into<PathBuf>>(root: P, max_open: usize) -> Self {
        let cap = NonZeroUsize::new(max_open).unwrap_or(NonZeroUsize::MIN);
        Self {
            root: root.into(),
            open: LruCache::new(cap),
            created: AHashSet::new(),
        }
    }

    pub fn path_for(&self, mate: Mate, component: u64) -> PathBuf {
        self.root
            .join(mate.to_string())
            .join(format!("{}.fa", component))
    }

    /// Files written so far, open or not.
    pub fn files_created(&self) -> usize {
        self.created.len()
    }

    pub fn open_handles(&self) -> usize {
        self.open.len()
    }

    /// Append one record to the file of `(mate, file_component)`.
    pub fn write_record(
        &mut self,
        mate: Mate,
        file_component: u64,
        read_id: &str,
        assigned_component: u64,
        sequence: &str,
    ) -> Result<()> {
        let writer = self.writer(mate, file_component)?;
        write_fasta_record(writer, read_id, assigned_component, sequence)?;
        Ok(())
    }

    fn writer(&mut self, mate: Mate, component: u64) -> Result<&mut BufWriter<File>> {
        let key = (mate, component);
        if !self.open.contains(&key) {
            let path = self.path_for(mate, component);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = if self.created.insert(key) {
                File::create(&path)?
            } else {
                OpenOptions::new().append(true).open(&path)?
            };
            if let Some((evicted_key, mut evicted)) = self.open.push(key, BufWriter::new(file)) {
                log::debug!("closing {}/{}.fa", evicted_key.0, evicted_key.1);
                evicted.flush()?;
            }
        }
        self.open.get_mut(&key).ok_or_else(|| {
            Error::Io(io::Error::new(io::ErrorKind::Other, "writer pool lost an open handle"))
        })
    }

    /// Flush and close every open handle.
    pub fn close_all(&mut self) -> Result<()> {
        while let Some((_, mut writer)) = self.open.pop_lru() {
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Scenario;
    use tempfile::tempdir;

    fn result(seq: &str, scenario: Scenario, component: u64, span: Option<(usize, usize)>) -> ClassificationResult {
        ClassificationResult {
            constructed_sequence: seq.to_string(),
            mapped: scenario.is_mapped(),
            scenario,
            assigned_component: component,
            span,
        }
    }

    #[test]
    fn tsv_lines_per_mate() {
        let mut sink = TsvReportSink::new(Vec::new());
        let r1 = result("ACGT", Scenario::TerminalMatch, 4, None);
        let r2 = result("GT", Scenario::Trimmed, 4, Some((2, 3)));
        sink.write_pair("a/1", &r1, "a/2", &r2).unwrap();
        let r3 = result("TTTT", Scenario::Ambiguous, 0, None);
        sink.write_pair("b/1", &r3, "b/2", &r3).unwrap();
        sink.finish().unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "a/1\t1\t1\t1\t4\t0:-1",
                "a/2\t2\t1\t5\t4\t2:3",
                "b/1\t1\t0\t4\t0\t0:0",
                "b/2\t2\t0\t4\t0\t0:0",
            ]
        );
    }

    #[test]
    fn fasta_pair_sink_splits_mates() {
        let mut sink = FastaPairSink::new(Vec::new(), Vec::new());
        let r1 = result("ACGT", Scenario::TerminalMatch, 4, None);
        let r2 = result("CCGG", Scenario::NoMatch, 0, None);
        sink.write_pair("x", &r1, "y", &r2).unwrap();
        let (m1, m2) = sink.into_inner();
        assert_eq!(String::from_utf8(m1).unwrap(), ">x|4\nACGT\n");
        assert_eq!(String::from_utf8(m2).unwrap(), ">y|0\nCCGG\n");
    }

    #[test]
    fn read_store_sink_updates_rows_and_skips_named_reads() {
        let store = ReadStore::open_in_memory().unwrap();
        store.create_schema().unwrap();
        store.insert_read(7, "ACGT", "ACGT", 1, 1).unwrap();
        let mut sink = ReadStoreSink::new(&store).unwrap();
        let r1 = result("ACGT", Scenario::TerminalMatch, 4, None);
        let r2 = result("ACGT", Scenario::NoMatch, 0, None);
        sink.write_pair("7/1", &r1, "7/2", &r2).unwrap();
        sink.write_pair("SRR11015356.1/1", &r1, "SRR11015356.1/2", &r2).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.updated(), 1);
        assert_eq!(sink.skipped(), 1);
        assert_eq!(store.original_component(Mate::First, 7).unwrap(), Some(4));
        assert_eq!(store.original_component(Mate::Second, 7).unwrap(), Some(0));
    }

    #[test]
    fn pool_reopens_evicted_files_in_append_mode() {
        let dir = tempdir().unwrap();
        let mut pool = FastaWriterPool::new(dir.path(), 1);

        pool.write_record(Mate::First, 1, "10", 1, "AAAA").unwrap();
        pool.write_record(Mate::First, 2, "11", 0, "CCCC").unwrap();
        assert_eq!(pool.open_handles(), 1);
        pool.write_record(Mate::First, 1, "12", 1, "GGGG").unwrap();
        pool.write_record(Mate::Second, 1, "10", 5, "TTTT").unwrap();
        pool.close_all().unwrap();
        assert_eq!(pool.open_handles(), 0);
        assert_eq!(pool.files_created(), 3);

        let comp1 = fs::read_to_string(dir.path().join("R1/1.fa")).unwrap();
        assert_eq!(comp1, ">10|1\nAAAA\n>12|1\nGGGG\n");
        let comp2 = fs::read_to_string(dir.path().join("R1/2.fa")).unwrap();
        assert_eq!(comp2, ">11|0\nCCCC\n");
        let mate2 = fs::read_to_string(dir.path().join("R2/1.fa")).unwrap();
        assert_eq!(mate2, ">10|5\nTTTT\n");
    }
}
