// src/lib.rs
pub mod types;
pub mod error;
pub mod config;
pub mod kmers;
pub mod colordb;
pub mod reads;
pub mod classify;
pub mod output;
pub mod readdb;
pub mod shards;
pub mod router;

use std::fs::File;
use std::io::{self, BufWriter, Write};

use crate::classify::{run_paired_classification, Classifier, PairedOptions, RunSummary};
use crate::colordb::ColorTable;
use crate::config::{require, AppConfig};
use crate::error::Result;
use crate::kmers::KmerDecoder;
use crate::output::{FastaPairSink, PairSink, ReadStoreSink, TsvReportSink};
use crate::readdb::ReadStore;
use crate::reads::FastxKmerSource;
use crate::router::{route_components, RouterOptions, RouterSummary};

pub use crate::error::Error;

/// First stage: classify both mate files against the global color index.
///
/// Writes a per-read TSV (to `[output] report_file` or stdout), optionally
/// `R1.fa`/`R2.fa` under `[output] fasta_dir`, and, with
/// `[SQLite] update_original`, the assigned components into the `reads` table.
pub fn run_first_stage(cfg: &AppConfig) -> Result<RunSummary> {
    // 1. Load the index
    let idx_prefix = require(&cfg.kprocessor.idx_prefix, "kProcessor", "idx_prefix")?;
    let index = ColorTable::load(idx_prefix)?;
    let classifier = Classifier::new(&index, cfg.kprocessor.unfound_ratio);

    // 2. Open both mates
    let decoder = KmerDecoder::new(cfg.kprocessor.ksize, cfg.kprocessor.canonical)?;
    let chunk_size = cfg.kprocessor.chunk_size;
    let mut mate1 = FastxKmerSource::open(require(&cfg.reads.read1, "Reads", "read1")?, chunk_size, decoder)?;
    let mut mate2 = FastxKmerSource::open(require(&cfg.reads.read2, "Reads", "read2")?, chunk_size, decoder)?;

    // 3. Outputs
    let report: Box<dyn Write> = match &cfg.output.report_file {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };
    let store = if cfg.sqlite.update_original {
        Some(ReadStore::open(&cfg.sqlite.db_file)?)
    } else {
        None
    };

    let mut sinks: Vec<Box<dyn PairSink + '_>> = vec![Box::new(TsvReportSink::new(report))];
    if let Some(dir) = &cfg.output.fasta_dir {
        sinks.push(Box::new(FastaPairSink::create(dir)?));
    }
    if let Some(store) = &store {
        sinks.push(Box::new(ReadStoreSink::new(store)?));
    }

    // 4. Classify
    let options = PairedOptions {
        validate_mate_ids: cfg.reads.validate_mate_ids,
        expected_chunks: (cfg.reads.seqs_no > 0)
            .then(|| cfg.reads.seqs_no.div_ceil(chunk_size.max(1))),
    };
    run_paired_classification(&classifier, &mut mate1, &mut mate2, &options, &mut sinks)
}

/// Second stage: route stored reads into per-collective-component FASTA files.
pub fn run_second_stage(cfg: &AppConfig) -> Result<RouterSummary> {
    let shards_dir = require(
        &cfg.kprocessor.collective_comps_indexes_dir,
        "kProcessor",
        "collective_comps_indexes_dir",
    )?;
    let options = RouterOptions {
        shards_dir: shards_dir.clone(),
        out_dir: cfg.output_fasta.fasta_dir.clone(),
        decoder: KmerDecoder::new(cfg.kprocessor.ksize, cfg.kprocessor.canonical)?,
        rule: cfg.kprocessor.unfound_ratio,
        max_open_files: cfg.output_fasta.max_open_files,
        update_original: cfg.sqlite.update_original,
    };
    let store = ReadStore::open(&cfg.sqlite.db_file)?;
    route_components(&options, &store)
}
