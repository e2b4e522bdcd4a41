// src/error.rs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
/// Errors raised while loading indexes, streaming reads or writing outputs
pub enum Error {
    #[error("I/O failure: {0}")]
    /// Reading an input or writing an output file failed
    Io(#[from] std::io::Error),
    #[error("SQLite query failed: {0}")]
    /// Persisted read storage could not be queried or updated
    Sqlite(#[from] rusqlite::Error),
    #[error("Could not load configuration: {0}")]
    /// Configuration file missing or malformed
    Config(#[from] ::config::ConfigError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Mate reads out of order: `{mate1}` paired with `{mate2}` in chunk {chunk}")]
    /// Mate files are not identically ordered (only checked when validation is enabled)
    MateMismatch {
        chunk: usize,
        mate1: String,
        mate2: String,
    },
    #[error("Color index in improper format: {0}")]
    IndexFormat(String),
    #[error("No numeric component id in shard name `{0}`")]
    ShardName(String),
    #[error("K-mer size must be between 1 and 32 but got {0}")]
    KmerSize(usize),
}
