// src/classify/classify_stats.rs

use std::fmt::Write;

use crate::types::{Mate, Scenario};

/// Per-mate, per-scenario read counts for one run.
///
/// Owned by whoever drives classification and passed down by `&mut`.
/// Accumulators built separately (e.g. per shard) are combined with [`merge`](Self::merge).
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ScenarioCounters {
    counts: [[u64; 6]; 2],
}

impl ScenarioCounters {
    #[inline]
    pub fn increment(&mut self, mate: Mate, scenario: Scenario) {
        self.counts[mate.slot()][scenario.number() - 1] += 1;
    }

    pub fn get(&self, mate: Mate, scenario: Scenario) -> u64 {
        self.counts[mate.slot()][scenario.number() - 1]
    }

    /// Reads classified for `mate`, all scenarios.
    pub fn total(&self, mate: Mate) -> u64 {
        self.counts[mate.slot()].iter().sum()
    }

    /// Mapped reads (scenarios 1 and 5) for `mate`.
    pub fn mapped(&self, mate: Mate) -> u64 {
        Scenario::ALL
            .iter()
            .filter(|s| s.is_mapped())
            .map(|&s| self.get(mate, s))
            .sum()
    }

    pub fn merge(&mut self, other: &ScenarioCounters) {
        for (mine, theirs) in self.counts.iter_mut().zip(other.counts.iter()) {
            for (a, b) in mine.iter_mut().zip(theirs.iter()) {
                *a += *b;
            }
        }
    }

    /// Tab-separated table: one row per scenario, one column per mate.
    pub fn report(&self) -> String {
        let mut output = String::new();
        output.push_str("scenario\tmapped\tR1\tR2\tR1%\tR2%\n");
        let totals = [self.total(Mate::First), self.total(Mate::Second)];

        for scenario in Scenario::ALL {
            let r1 = self.get(Mate::First, scenario);
            let r2 = self.get(Mate::Second, scenario);
            writeln!(
                output,
                "{}\t{}\t{}\t{}\t{:.2}\t{:.2}",
                scenario,
                u8::from(scenario.is_mapped()),
                r1,
                r2,
                pct(r1, totals[0]),
                pct(r2, totals[1])
            )
            .unwrap();
        }
        output
    }
}

fn pct(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}
