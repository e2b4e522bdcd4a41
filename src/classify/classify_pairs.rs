use crate::colordb::ColorIndex;
use crate::error::{Error, Result};
use crate::output::PairSink;
use crate::reads::ReadKmerSource;
use crate::types::Mate;
use super::classify_read::Classifier;
use super::classify_stats::ScenarioCounters;

/// Knobs of the paired driver.
#[derive(Debug, Clone, Default)]
pub struct PairedOptions {
    /// Check that the i-th reads of both mates carry the same name.
    /// Off by default: pairing is purely positional.
    pub validate_mate_ids: bool,
    /// Expected number of chunks, only used for progress messages.
    pub expected_chunks: Option<usize>,
}

/// What a paired run did.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub chunks: usize,
    pub pairs: usize,
    /// Pairs dropped because one of the mates had no k-mers.
    pub skipped_pairs: usize,
    pub counters: ScenarioCounters,
}

/// Read name with the mate suffix (`/1`, `/2`) removed.
fn mate_stem(id: &str) -> &str {
    id.strip_suffix("/1")
        .or_else(|| id.strip_suffix("/2"))
        .unwrap_or(id)
}

/// Classify two mate streams in lockstep.
///
/// Chunks are pulled from both sources while both have more; the first source
/// to run dry ends the run. Within a chunk the i-th read of mate 1 is paired with
/// the i-th read of mate 2, so both inputs must be ordered identically.
pub fn run_paired_classification<I, S1, S2, K>(
    classifier: &Classifier<I>,
    mate1: &mut S1,
    mate2: &mut S2,
    options: &PairedOptions,
    sink: &mut K,
) -> Result<RunSummary>
where
    I: ColorIndex,
    S1: ReadKmerSource + ?Sized,
    S2: ReadKmerSource + ?Sized,
    K: PairSink + ?Sized,
{
    let mut summary = RunSummary::default();

    while mate1.has_more_chunks() && mate2.has_more_chunks() {
        mate1.advance_chunk()?;
        mate2.advance_chunk()?;
        summary.chunks += 1;

        match options.expected_chunks {
            Some(n) => log::info!("processing chunk: ({}) / ({}) ...", summary.chunks, n),
            None => log::debug!("processing chunk: ({}) ...", summary.chunks),
        }

        let chunk1 = mate1.current_chunk();
        let chunk2 = mate2.current_chunk();
        if chunk1.len() != chunk2.len() {
            log::warn!(
                "chunk {} holds {} mate 1 reads but {} mate 2 reads; pairing stops at the shorter",
                summary.chunks,
                chunk1.len(),
                chunk2.len()
            );
        }

        for ((id1, kmers1), (id2, kmers2)) in chunk1.iter().zip(chunk2.iter()) {
            if options.validate_mate_ids && mate_stem(id1) != mate_stem(id2) {
                return Err(Error::MateMismatch {
                    chunk: summary.chunks,
                    mate1: id1.clone(),
                    mate2: id2.clone(),
                });
            }

            if kmers1.is_empty() || kmers2.is_empty() {
                log::warn!("skipping pair {}/{}: read shorter than k", id1, id2);
                summary.skipped_pairs += 1;
                continue;
            }

            let result1 = classifier.classify(kmers1, Mate::First, &mut summary.counters)?;
            let result2 = classifier.classify(kmers2, Mate::Second, &mut summary.counters)?;
            sink.write_pair(id1, &result1, id2, &result2)?;
            summary.pairs += 1;
        }
    }

    sink.finish()?;
    log::info!(
        "classified {} read pairs in {} chunks ({} skipped)",
        summary.pairs,
        summary.chunks,
        summary.skipped_pairs
    );
    Ok(summary)
}
