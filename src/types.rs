//src/types.rs

use std::fmt;

/// One k-mer of a read: its literal text and its hash.
/// The position is implied by the index in the owning list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmerRecord {
    pub text: String,
    pub hash: u64,
}

/// Which end of a paired-end fragment a read came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mate {
    First,
    Second,
}

impl Mate {
    pub const BOTH: [Mate; 2] = [Mate::First, Mate::Second];

    /// 1 or 2, as used in file names and SQL column names.
    pub fn number(self) -> usize {
        match self {
            Mate::First => 1,
            Mate::Second => 2,
        }
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self.number() - 1
    }
}

impl fmt::Display for Mate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.number())
    }
}

/// The six mutually exclusive classification outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// First and last k-mers share a non-zero color.
    TerminalMatch = 1,
    /// First and last k-mers carry different non-zero colors.
    TerminalConflict = 2,
    /// Too many k-mers were absent from the index.
    MostlyUnfound = 3,
    /// Found k-mers span more than one component.
    Ambiguous = 4,
    /// Exactly one component found; the read is trimmed to it.
    Trimmed = 5,
    /// Not a single k-mer was found.
    NoMatch = 6,
}

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::TerminalMatch,
        Scenario::TerminalConflict,
        Scenario::MostlyUnfound,
        Scenario::Ambiguous,
        Scenario::Trimmed,
        Scenario::NoMatch,
    ];

    pub fn number(self) -> usize {
        self as usize
    }

    pub fn is_mapped(self) -> bool {
        matches!(self, Scenario::TerminalMatch | Scenario::Trimmed)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Outcome of classifying a single read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub constructed_sequence: String,
    pub mapped: bool,
    pub scenario: Scenario,
    /// Component the read was assigned to, 0 if none.
    pub assigned_component: u64,
    /// Inclusive k-mer range the sequence was rebuilt from, set for trimmed reads.
    pub span: Option<(usize, usize)>,
}

impl ClassificationResult {
    /// The `start:end` column of the report: `0:-1` for a full-length mapped
    /// read, `0:0` for an unmapped read, the k-mer range for a trimmed one.
    pub fn span_label(&self) -> String {
        match (self.mapped, self.span) {
            (true, Some((start, end))) => format!("{}:{}", start, end),
            (true, None) => "0:-1".to_string(),
            (false, _) => "0:0".to_string(),
        }
    }
}
