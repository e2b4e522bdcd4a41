// src/config.rs

use std::path::{Path, PathBuf};

use ::config::{Config, File, FileFormat};
use serde::Deserialize;

use crate::classify::UnfoundRatioRule;
use crate::error::{Error, Result};

/// `[kProcessor]`: index locations and k-mer decoding.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Prefix of the global color index (`<prefix>.colors`).
    pub idx_prefix: Option<PathBuf>,
    /// Directory of per-collective-component index shards, optionally
    /// followed by a shard name pattern such as `indexes/idx_*`.
    pub collective_comps_indexes_dir: Option<PathBuf>,
    /// Reads per chunk.
    pub chunk_size: usize,
    pub ksize: usize,
    pub canonical: bool,
    pub unfound_ratio: UnfoundRatioRule,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            idx_prefix: None,
            collective_comps_indexes_dir: None,
            chunk_size: 1,
            ksize: 31,
            canonical: false,
            unfound_ratio: UnfoundRatioRule::Truncating,
        }
    }
}

/// `[Reads]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReadsConfig {
    pub read1: Option<PathBuf>,
    pub read2: Option<PathBuf>,
    /// Number of read pairs, only for progress messages. 0 = unknown.
    pub seqs_no: usize,
    pub validate_mate_ids: bool,
}

/// `[SQLite]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    pub db_file: PathBuf,
    pub update_original: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            db_file: PathBuf::from("query1_result.db"),
            update_original: false,
        }
    }
}

/// `[output_fasta]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FastaOutputConfig {
    pub fasta_dir: PathBuf,
    pub max_open_files: usize,
}

impl Default for FastaOutputConfig {
    fn default() -> Self {
        Self {
            fasta_dir: PathBuf::from("fasta_out"),
            max_open_files: 256,
        }
    }
}

/// `[output]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Per-read TSV of the first stage; stdout when unset.
    pub report_file: Option<PathBuf>,
    /// Where the first stage writes `R1.fa`/`R2.fa`, if anywhere.
    pub fasta_dir: Option<PathBuf>,
}

/// All settings, loaded once from an INI file at startup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(alias = "kProcessor")]
    pub kprocessor: IndexConfig,
    #[serde(alias = "Reads")]
    pub reads: ReadsConfig,
    #[serde(alias = "SQLite")]
    pub sqlite: SqliteConfig,
    pub output_fasta: FastaOutputConfig,
    pub output: ReportConfig,
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()).format(FileFormat::Ini))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn from_ini_str(text: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(text, FileFormat::Ini))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

/// Unwrap a setting that the chosen stage cannot run without.
pub fn require<'a, T>(value: &'a Option<T>, section: &str, key: &str) -> Result<&'a T> {
    value
        .as_ref()
        .ok_or_else(|| Error::InvalidInput(format!("missing `{}` in [{}]", key, section)))
}
