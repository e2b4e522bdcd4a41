//src/router.rs

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::classify::{Classifier, ScenarioCounters, UnfoundRatioRule};
use crate::colordb::ColorTable;
use crate::error::Result;
use crate::kmers::KmerDecoder;
use crate::output::FastaWriterPool;
use crate::readdb::ReadStore;
use crate::shards::{create_fresh_dir, discover_shards, ShardInfo};
use crate::types::Mate;

/// Inputs of the second stage.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Directory holding one sub-directory per collective component index.
    pub shards_dir: PathBuf,
    /// Base output directory; a `_v.N` suffix is added if it exists.
    pub out_dir: PathBuf,
    pub decoder: KmerDecoder,
    pub rule: UnfoundRatioRule,
    /// Upper bound on simultaneously open FASTA files.
    pub max_open_files: usize,
    /// Also store each read's assigned component in `seqN_original_component`.
    pub update_original: bool,
}

#[derive(Debug, Clone)]
pub struct ShardReport {
    pub id: u64,
    /// Reads routed for mate 1 and mate 2.
    pub reads: [usize; 2],
    pub skipped: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct RouterSummary {
    /// The output directory actually used.
    pub out_dir: PathBuf,
    pub shards: Vec<ShardReport>,
    pub counters: ScenarioCounters,
    pub files_created: usize,
}

/// `m:s:ms`, hours folded away.
pub fn format_elapsed(elapsed: Duration) -> String {
    let mut milli = elapsed.as_millis();
    let hr = milli / 3_600_000;
    milli -= 3_600_000 * hr;
    let min = milli / 60_000;
    milli -= 60_000 * min;
    let sec = milli / 1000;
    milli -= 1000 * sec;
    format!("{}:{}:{}", min, sec, milli)
}

/// Re-classify the stored reads of every collective component against that
/// component's own index and write them to `<out>/R{1,2}/<component>.fa`.
pub fn route_components(options: &RouterOptions, store: &ReadStore) -> Result<RouterSummary> {
    // 1. Enumerate shards before touching the output tree
    let shards = discover_shards(&options.shards_dir)?;

    // 2. Output directories
    let out_dir = create_fresh_dir(&options.out_dir)?;
    for mate in Mate::BOTH {
        std::fs::create_dir_all(out_dir.join(mate.to_string()))?;
    }
    log::info!("writing component FASTA files under {}", out_dir.display());

    let mut pool = FastaWriterPool::new(&out_dir, options.max_open_files);
    let mut counters = ScenarioCounters::default();
    let mut reports = Vec::with_capacity(shards.len());

    // 3. One shard at a time; its index is dropped before the next is loaded
    for shard in &shards {
        let report = route_shard(shard, options, store, &mut pool, &mut counters)?;
        log::info!(
            "collective component ({}): {} + {} reads, done in {}",
            shard.id,
            report.reads[0],
            report.reads[1],
            format_elapsed(report.elapsed)
        );
        reports.push(report);
    }

    pool.close_all()?;

    Ok(RouterSummary {
        out_dir,
        shards: reports,
        counters,
        files_created: pool.files_created(),
    })
}

fn route_shard(
    shard: &ShardInfo,
    options: &RouterOptions,
    store: &ReadStore,
    pool: &mut FastaWriterPool,
    counters: &mut ScenarioCounters,
) -> Result<ShardReport> {
    let t1 = Instant::now();
    log::info!("processing collective component ({}) ...", shard.id);

    let index = ColorTable::load(&shard.prefix)?;
    if index.k != 0 && index.k as usize != options.decoder.k() {
        log::warn!(
            "index {} was built with k={} but reads are decoded with k={}",
            shard.name,
            index.k,
            options.decoder.k()
        );
    }
    let classifier = Classifier::new(&index, options.rule);

    let mut reads = [0usize; 2];
    let mut skipped = 0usize;

    if options.update_original {
        store.begin()?;
    }
    for mate in Mate::BOTH {
        for read in store.reads_for_component(mate, shard.id)? {
            let kmers = options.decoder.seq_to_kmers(&read.sequence);
            if kmers.is_empty() {
                log::warn!("read {} ({}) is shorter than k, skipped", read.id, mate);
                skipped += 1;
                continue;
            }

            let result = classifier.classify(&kmers, mate, counters)?;
            pool.write_record(
                mate,
                shard.id,
                &read.id.to_string(),
                result.assigned_component,
                &result.constructed_sequence,
            )?;
            if options.update_original {
                store.set_original_component(mate, read.id, result.assigned_component)?;
            }
            reads[mate.slot()] += 1;
        }
    }
    if options.update_original {
        store.commit()?;
    }

    Ok(ShardReport {
        id: shard.id,
        reads,
        skipped,
        elapsed: t1.elapsed(),
    })
}
