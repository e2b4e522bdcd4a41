// src/kmers.rs

use crate::error::{Error, Result};
use crate::types::KmerRecord;

/// Hash given to any k-mer containing a base other than A/C/G/T.
/// It is never stored in a color index, so such k-mers always look up as color 0.
pub const INVALID_KMER_HASH: u64 = u64::MAX;

/// Largest k that fits a 2-bit encoding in a `u64`.
pub const MAX_KMER_SIZE: usize = 32;

#[inline]
fn encode_base_2bit(b: u8) -> u64 {
    match b {
        b'A' | b'a' => 0,
        b'C' | b'c' => 1,
        b'G' | b'g' => 2,
        b'T' | b't' => 3,
        _ => 4, // invalid marker
    }
}

/// Encode one k-mer window. Returns `None` if the window holds an invalid base.
#[inline]
fn encode_kmer(window: &[u8]) -> Option<u64> {
    let mut val = 0u64;
    for &b in window {
        let code = encode_base_2bit(b);
        if code > 3 {
            return None;
        }
        val = (val << 2) | code;
    }
    Some(val)
}

/// Reverse complement of a 2-bit encoded k-mer of length `k`.
pub fn reverse_complement(mut kmer: u64, k: usize) -> u64 {
    kmer = ((kmer >> 2) & 0x3333333333333333) | ((kmer & 0x3333333333333333) << 2);
    kmer = ((kmer >> 4) & 0x0F0F0F0F0F0F0F0F) | ((kmer & 0x0F0F0F0F0F0F0F0F) << 4);
    kmer = ((kmer >> 8) & 0x00FF00FF00FF00FF) | ((kmer & 0x00FF00FF00FF00FF) << 8);
    kmer = ((kmer >> 16) & 0x0000FFFF0000FFFF) | ((kmer & 0x0000FFFF0000FFFF) << 16);
    kmer = (kmer >> 32) | (kmer << 32);
    (u64::MAX - kmer) >> (64 - 2 * k)
}

/// Splits sequences into ordered, overlapping k-mer records.
#[derive(Debug, Clone, Copy)]
pub struct KmerDecoder {
    k: usize,
    canonical: bool,
}

impl KmerDecoder {
    pub fn new(k: usize, canonical: bool) -> Result<Self> {
        if k == 0 || k > MAX_KMER_SIZE {
            return Err(Error::KmerSize(k));
        }
        Ok(Self { k, canonical })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Hash of a single k-mer text of length `k`.
    pub fn hash_kmer(&self, text: &[u8]) -> u64 {
        match encode_kmer(text) {
            Some(fwd) if self.canonical => fwd.min(reverse_complement(fwd, self.k)),
            Some(fwd) => fwd,
            None => INVALID_KMER_HASH,
        }
    }

    /// Decode `seq` into `seq.len() - k + 1` k-mers, in read order.
    /// A sequence shorter than `k` yields an empty list.
    pub fn seq_to_kmers(&self, seq: &str) -> Vec<KmerRecord> {
        let bytes = seq.as_bytes();
        if bytes.len() < self.k {
            return Vec::new();
        }
        bytes
            .windows(self.k)
            .map(|window| KmerRecord {
                text: String::from_utf8_lossy(window).into_owned(),
                hash: self.hash_kmer(window),
            })
            .collect()
    }
}
