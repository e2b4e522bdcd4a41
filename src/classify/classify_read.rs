use serde::Deserialize;

use crate::colordb::ColorIndex;
use crate::error::{Error, Result};
use crate::types::{ClassificationResult, KmerRecord, Mate, Scenario};
use super::classify_stats::ScenarioCounters;

/// How the share of unfound k-mers is computed before it is compared to one half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnfoundRatioRule {
    /// `unfound / total` in integer arithmetic, as the legacy pipeline did.
    /// The quotient is 0 whenever at least one k-mer was found, so the gate never fires.
    #[default]
    Truncating,
    /// `unfound / total` as a real number; half or more unfound fires the gate.
    Fractional,
}

impl UnfoundRatioRule {
    fn mostly_unfound(self, unfound: usize, total: usize) -> bool {
        let ratio = match self {
            UnfoundRatioRule::Truncating => (unfound / total) as f64,
            UnfoundRatioRule::Fractional => unfound as f64 / total as f64,
        };
        ratio >= 0.5
    }
}

/// Distinct colors of a read, zero included. Only the first three are kept:
/// the decision only distinguishes one, two, and more than two.
#[derive(Debug, Default, Clone, Copy)]
struct SmallColorSet {
    colors: [u64; 3],
    len: usize,
}

impl SmallColorSet {
    #[inline]
    fn insert(&mut self, color: u64) {
        if self.len == self.colors.len() || self.colors[..self.len].contains(&color) {
            return;
        }
        self.colors[self.len] = color;
        self.len += 1;
    }

    fn len(&self) -> usize {
        self.len
    }

    /// The first non-zero color seen, 0 if none.
    fn non_zero(&self) -> u64 {
        self.colors[..self.len].iter().copied().find(|&c| c != 0).unwrap_or(0)
    }
}

/// Rebuild the read text from its k-mers: every k-th k-mer is taken whole,
/// the result is cut to `count - 1` bases and the last k-mer is appended.
/// Assumes a contiguous, gap-free decomposition with a uniform k.
pub fn tile_sequence(kmers: &[KmerRecord]) -> String {
    let last = match kmers.last() {
        Some(last) => last,
        None => return String::new(),
    };
    let k = kmers[0].text.len().max(1);

    let mut seq: Vec<u8> = Vec::with_capacity(kmers.len() + k);
    for kmer in kmers.iter().step_by(k) {
        seq.extend_from_slice(kmer.text.as_bytes());
    }
    seq.truncate(kmers.len() - 1);
    seq.extend_from_slice(last.text.as_bytes());

    String::from_utf8(seq).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Leftmost non-zero index, and the rightmost non-zero index found scanning
/// inward from the end down to it. `(0, 0)` if there is no non-zero color.
fn trim_bounds(colors: &[u64]) -> (usize, usize) {
    let mut bounds = (0, 0);
    if let Some(start) = colors.iter().position(|&c| c != 0) {
        if let Some(offset) = colors[start..].iter().rposition(|&c| c != 0) {
            bounds = (start, start + offset);
        }
    }
    bounds
}

/// Decides, per read, whether it belongs to a single graph component.
#[derive(Debug, Clone)]
pub struct Classifier<I> {
    index: I,
    rule: UnfoundRatioRule,
}

impl<I: ColorIndex> Classifier<I> {
    pub fn new(index: I, rule: UnfoundRatioRule) -> Self {
        Self { index, rule }
    }

    /// Classify one read.
    ///
    /// Scenarios, in priority order:
    ///  1: mapped, first and last k-mers share a color.
    ///  2: unmapped, first and last k-mers have different colors.
    ///  3: unmapped, too many k-mers unfound (see [`UnfoundRatioRule`]).
    ///  4: unmapped, more than one component among the found k-mers.
    ///  5: mapped, exactly one component; the read is trimmed to the found span.
    ///  6: unmapped, not a single k-mer found.
    ///
    /// Increments `counters[mate][scenario]` once. An empty k-mer list is rejected.
    pub fn classify(
        &self,
        kmers: &[KmerRecord],
        mate: Mate,
        counters: &mut ScenarioCounters,
    ) -> Result<ClassificationResult> {
        let (first, last) = match (kmers.first(), kmers.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(Error::InvalidInput(
                    "cannot classify a read without k-mers".to_string(),
                ))
            }
        };

        let color1 = self.index.color_of(first.hash);
        let color2 = self.index.color_of(last.hash);

        let result = if color1 != 0 && color2 != 0 {
            if color1 == color2 {
                full_length(kmers, Scenario::TerminalMatch, color1)
            } else {
                full_length(kmers, Scenario::TerminalConflict, 0)
            }
        } else {
            self.classify_by_scan(kmers)
        };

        counters.increment(mate, result.scenario);
        Ok(result)
    }

    /// At least one terminal k-mer is unfound: look at every k-mer.
    fn classify_by_scan(&self, kmers: &[KmerRecord]) -> ClassificationResult {
        let total = kmers.len();
        let mut found_count = [0usize; 2]; // [unfound, found]
        let mut distinct = SmallColorSet::default();

        let colors: Vec<u64> = kmers
            .iter()
            .map(|kmer| {
                let color = self.index.color_of(kmer.hash);
                found_count[(color != 0) as usize] += 1;
                distinct.insert(color);
                color
            })
            .collect();

        if found_count[1] > 0 && self.rule.mostly_unfound(found_count[0], total) {
            return full_length(kmers, Scenario::MostlyUnfound, 0);
        }

        match distinct.len() {
            n if n > 2 => full_length(kmers, Scenario::Ambiguous, 0),
            2 => {
                let (start, end) = trim_bounds(&colors);
                log::trace!("trimmed read to k-mers {}..={}", start, end);
                ClassificationResult {
                    constructed_sequence: tile_sequence(&kmers[start..=end]),
                    mapped: true,
                    scenario: Scenario::Trimmed,
                    assigned_component: distinct.non_zero(),
                    span: Some((start, end)),
                }
            }
            _ => full_length(kmers, Scenario::NoMatch, 0),
        }
    }
}

fn full_length(kmers: &[KmerRecord], scenario: Scenario, component: u64) -> ClassificationResult {
    ClassificationResult {
        constructed_sequence: tile_sequence(kmers),
        mapped: scenario.is_mapped(),
        scenario,
        assigned_component: component,
        span: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colordb::ColorTable;
    use crate::kmers::KmerDecoder;

    const K: usize = 4;

    /// Read whose k-mers all hash to their index, so colors can be placed by position.
    fn indexed_kmers(seq: &str) -> Vec<KmerRecord> {
        let decoder = KmerDecoder::new(K, false).unwrap();
        decoder
            .seq_to_kmers(seq)
            .into_iter()
            .enumerate()
            .map(|(i, k)| KmerRecord { text: k.text, hash: i as u64 })
            .collect()
    }

    fn table(colors: &[u64]) -> ColorTable {
        colors.iter().enumerate().map(|(i, &c)| (i as u64, c)).collect()
    }

    // 13 bases, k=4 => 10 k-mers
    const READ: &str = "ACGTTGCAAGGCT";

    fn run(colors: &[u64], rule: UnfoundRatioRule) -> (ClassificationResult, ScenarioCounters) {
        let kmers = indexed_kmers(READ);
        assert_eq!(kmers.len(), colors.len());
        let index = table(colors);
        let classifier = Classifier::new(&index, rule);
        let mut counters = ScenarioCounters::default();
        let res = classifier.classify(&kmers, Mate::First, &mut counters).unwrap();
        (res, counters)
    }

    #[test]
    fn tile_sequence_reproduces_read() {
        for seq in ["ACGT", "ACGTA", "ACGTTGCA", "ACGTTGCAAGGCT", "ACGTTGCAAGGCTTAGCAT"] {
            let kmers = indexed_kmers(seq);
            assert_eq!(tile_sequence(&kmers), seq);
        }
        assert_eq!(tile_sequence(&[]), "");
    }

    #[test]
    fn scenario_1_terminal_match() {
        let (res, counters) = run(&[5, 0, 0, 0, 0, 0, 0, 0, 0, 5], UnfoundRatioRule::Truncating);
        assert_eq!(res.scenario, Scenario::TerminalMatch);
        assert!(res.mapped);
        assert_eq!(res.assigned_component, 5);
        assert_eq!(res.constructed_sequence.len(), K + 10 - 1);
        assert_eq!(res.constructed_sequence, READ);
        assert_eq!(res.span_label(), "0:-1");
        assert_eq!(counters.get(Mate::First, Scenario::TerminalMatch), 1);
    }

    #[test]
    fn scenario_2_terminal_conflict() {
        let (res, _) = run(&[5, 5, 5, 5, 5, 7, 7, 7, 7, 7], UnfoundRatioRule::Truncating);
        assert_eq!(res.scenario, Scenario::TerminalConflict);
        assert!(!res.mapped);
        assert_eq!(res.assigned_component, 0);
        assert_eq!(res.span_label(), "0:0");
    }

    #[test]
    fn scenario_3_only_under_fractional_rule() {
        let colors = [0, 0, 0, 0, 0, 0, 9, 9, 9, 9];
        let (res, _) = run(&colors, UnfoundRatioRule::Fractional);
        assert_eq!(res.scenario, Scenario::MostlyUnfound);
        assert!(!res.mapped);
        assert_eq!(res.constructed_sequence, READ);

        // integer division truncates 6/10 to 0
        let (res, _) = run(&colors, UnfoundRatioRule::Truncating);
        assert_eq!(res.scenario, Scenario::Trimmed);
    }

    #[test]
    fn fractional_tie_counts_as_mostly_unfound() {
        let (res, _) = run(&[0, 0, 0, 0, 0, 3, 3, 3, 3, 3], UnfoundRatioRule::Fractional);
        assert_eq!(res.scenario, Scenario::MostlyUnfound);
        let (res, _) = run(&[0, 0, 0, 0, 3, 3, 3, 3, 3, 3], UnfoundRatioRule::Fractional);
        assert_eq!(res.scenario, Scenario::Trimmed);
    }

    #[test]
    fn unfound_threshold_is_half() {
        assert!(UnfoundRatioRule::Fractional.mostly_unfound(1, 2));
        assert!(UnfoundRatioRule::Fractional.mostly_unfound(7, 10));
        assert!(!UnfoundRatioRule::Fractional.mostly_unfound(4, 10));
        assert!(!UnfoundRatioRule::Truncating.mostly_unfound(9, 10));
        assert!(UnfoundRatioRule::Truncating.mostly_unfound(10, 10));
    }

    #[test]
    fn scenario_4_many_components() {
        let (res, _) = run(&[0, 1, 1, 2, 2, 2, 3, 3, 3, 3], UnfoundRatioRule::Truncating);
        assert_eq!(res.scenario, Scenario::Ambiguous);
        assert!(!res.mapped);
        assert_eq!(res.assigned_component, 0);

        let (res, _) = run(&[1, 4, 4, 4, 2, 2, 2, 3, 3, 0], UnfoundRatioRule::Truncating);
        assert_eq!(res.scenario, Scenario::Ambiguous);
    }

    #[test]
    fn scenario_5_trims_to_colored_span() {
        let (res, counters) = run(&[0, 0, 0, 8, 8, 8, 8, 0, 0, 0], UnfoundRatioRule::Truncating);
        assert_eq!(res.scenario, Scenario::Trimmed);
        assert!(res.mapped);
        assert_eq!(res.assigned_component, 8);
        assert_eq!(res.span, Some((3, 6)));
        assert_eq!(res.span_label(), "3:6");
        // k-mers 3..=6 cover bases 3..10
        assert_eq!(res.constructed_sequence, &READ[3..10]);
        assert_eq!(counters.get(Mate::First, Scenario::Trimmed), 1);
    }

    #[test]
    fn scenario_5_single_colored_kmer() {
        let (res, _) = run(&[0, 0, 0, 0, 2, 0, 0, 0, 0, 0], UnfoundRatioRule::Truncating);
        assert_eq!(res.scenario, Scenario::Trimmed);
        assert_eq!(res.span, Some((4, 4)));
        assert_eq!(res.constructed_sequence, &READ[4..8]);
    }

    #[test]
    fn scenario_6_nothing_found() {
        for rule in [UnfoundRatioRule::Truncating, UnfoundRatioRule::Fractional] {
            let (res, counters) = run(&[0; 10], rule);
            assert_eq!(res.scenario, Scenario::NoMatch);
            assert!(!res.mapped);
            assert_eq!(res.assigned_component, 0);
            assert_eq!(counters.get(Mate::First, Scenario::NoMatch), 1);
        }
    }

    #[test]
    fn single_kmer_read() {
        let kmers = indexed_kmers("ACGT");
        let mut counters = ScenarioCounters::default();

        let found = table(&[4]);
        let res = Classifier::new(&found, UnfoundRatioRule::Truncating)
            .classify(&kmers, Mate::Second, &mut counters)
            .unwrap();
        assert_eq!(res.scenario, Scenario::TerminalMatch);
        assert_eq!(res.constructed_sequence, "ACGT");

        let missing = table(&[0]);
        let res = Classifier::new(&missing, UnfoundRatioRule::Truncating)
            .classify(&kmers, Mate::Second, &mut counters)
            .unwrap();
        assert_eq!(res.scenario, Scenario::NoMatch);
        assert_eq!(counters.total(Mate::Second), 2);
    }

    #[test]
    fn classify_is_idempotent_but_counts_twice() {
        let kmers = indexed_kmers(READ);
        let index = table(&[0, 0, 0, 8, 8, 8, 8, 0, 0, 0]);
        let classifier = Classifier::new(&index, UnfoundRatioRule::Truncating);
        let mut counters = ScenarioCounters::default();
        let a = classifier.classify(&kmers, Mate::First, &mut counters).unwrap();
        let b = classifier.classify(&kmers, Mate::First, &mut counters).unwrap();
        assert_eq!(a, b);
        assert_eq!(counters.get(Mate::First, Scenario::Trimmed), 2);
        assert_eq!(counters.total(Mate::Second), 0);
    }

    #[test]
    fn empty_read_is_invalid_input() {
        let index = ColorTable::new(4);
        let mut counters = ScenarioCounters::default();
        let err = Classifier::new(&index, UnfoundRatioRule::Truncating)
            .classify(&[], Mate::First, &mut counters)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(counters.total(Mate::First), 0);
    }
}
