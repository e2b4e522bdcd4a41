pub mod classify_pairs;
pub mod classify_read;
pub mod classify_stats;

pub use classify_pairs::{run_paired_classification, PairedOptions, RunSummary};
pub use classify_read::{tile_sequence, Classifier, UnfoundRatioRule};
pub use classify_stats::ScenarioCounters;
