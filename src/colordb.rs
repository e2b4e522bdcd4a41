//src/colordb.rs

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use ahash::AHashMap;

use crate::error::{Error, Result};

/// File type code at the start of a color index.
pub const COLOR_INDEX_FILE_TYPE: &[u8; 8] = b"OMNICLR1";

/// Extension appended to an index prefix to get the on-disk file.
pub const COLOR_INDEX_EXTENSION: &str = "colors";

/// Signature + k + pair count.
const HEADER_SIZE: usize = 24;
const PAIR_SIZE: usize = 16;

/// Read-only k-mer -> color lookup. 0 means the k-mer is absent.
pub trait ColorIndex {
    fn color_of(&self, hash: u64) -> u64;
}

impl<T: ColorIndex + ?Sized> ColorIndex for &T {
    fn color_of(&self, hash: u64) -> u64 {
        (**self).color_of(hash)
    }
}

/// A fully in-memory color index, loaded once per run (or once per shard).
#[derive(Debug, Clone, Default)]
pub struct ColorTable {
    /// The k-mer length the table was built with.
    pub k: u64,
    colors: AHashMap<u64, u64>,
}

impl ColorIndex for ColorTable {
    #[inline]
    fn color_of(&self, hash: u64) -> u64 {
        self.colors.get(&hash).copied().unwrap_or(0)
    }
}

impl FromIterator<(u64, u64)> for ColorTable {
    fn from_iter<I: IntoIterator<Item = (u64, u64)>>(iter: I) -> Self {
        let mut table = ColorTable::new(0);
        for (hash, color) in iter {
            table.insert(hash, color);
        }
        table
    }
}

/// `<prefix>.colors`
pub fn index_path<P: AsRef<Path>>(prefix: P) -> PathBuf {
    let mut path = prefix.as_ref().as_os_str().to_owned();
    path.push(".");
    path.push(COLOR_INDEX_EXTENSION);
    PathBuf::from(path)
}

impl ColorTable {
    pub fn new(k: u64) -> Self {
        Self {
            k,
            colors: AHashMap::new(),
        }
    }

    /// Record a color; a zero color is the same as absence and is not stored.
    pub fn insert(&mut self, hash: u64, color: u64) {
        if color == 0 {
            self.colors.remove(&hash);
        } else {
            self.colors.insert(hash, color);
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Loads the index stored at `<prefix>.colors`, validating its header.
    pub fn load<P: AsRef<Path>>(prefix: P) -> Result<Self> {
        let path = index_path(prefix);
        let mut file = File::open(&path)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;

        if buf.len() < HEADER_SIZE {
            return Err(Error::IndexFormat(format!(
                "{} too small to be a color index",
                path.display()
            )));
        }
        if &buf[..8] != COLOR_INDEX_FILE_TYPE {
            return Err(Error::IndexFormat(format!(
                "{} does not start with {}",
                path.display(),
                String::from_utf8_lossy(COLOR_INDEX_FILE_TYPE)
            )));
        }

        let k = read_u64_le(&buf[8..16]);
        let declared = read_u64_le(&buf[16..24]);
        let pairs = &buf[HEADER_SIZE..];
        let count = usize::try_from(declared).unwrap_or(usize::MAX);
        if count.checked_mul(PAIR_SIZE) != Some(pairs.len()) {
            return Err(Error::IndexFormat(format!(
                "{} declares {} colored k-mers but holds {} bytes of pairs",
                path.display(),
                declared,
                pairs.len()
            )));
        }

        let mut colors = AHashMap::with_capacity(count);
        for pair in pairs.chunks_exact(PAIR_SIZE) {
            colors.insert(read_u64_le(&pair[..8]), read_u64_le(&pair[8..]));
        }

        log::info!(
            "Loaded color index {} with {} k-mers, k={}",
            path.display(),
            colors.len(),
            k
        );
        Ok(Self { k, colors })
    }

    /// Writes the table to `<prefix>.colors`.
    pub fn save<P: AsRef<Path>>(&self, prefix: P) -> Result<()> {
        let mut out = BufWriter::new(File::create(index_path(prefix))?);
        out.write_all(COLOR_INDEX_FILE_TYPE)?;
        out.write_all(&self.k.to_le_bytes())?;
        out.write_all(&(self.colors.len() as u64).to_le_bytes())?;
        for (hash, color) in &self.colors {
            out.write_all(&hash.to_le_bytes())?;
            out.write_all(&color.to_le_bytes())?;
        }
        out.flush()?;
        Ok(())
    }
}

fn read_u64_le(bytes: &[u8]) -> u64 {
    let mut arr = [0u8; 8];
    arr.copy_from_slice(bytes);
    u64::from_le_bytes(arr)
}
