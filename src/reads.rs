use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::{Error, Result};
use crate::kmers::KmerDecoder;
use crate::types::KmerRecord;

/// Reads of one chunk, in file order: `(read_id, kmers)`.
pub type KmerChunk = Vec<(String, Vec<KmerRecord>)>;

/// A restartable, chunked producer of decoded reads.
pub trait ReadKmerSource {
    /// `false` once the underlying input is exhausted.
    fn has_more_chunks(&self) -> bool;
    /// Load the next chunk, replacing the current one.
    fn advance_chunk(&mut self) -> Result<()>;
    /// Reads of the current chunk in insertion order.
    fn current_chunk(&self) -> &[(String, Vec<KmerRecord>)];
}

/// Streams a FASTA or FASTQ file (plain or `.gz`) `chunk_size` reads at a time.
pub struct FastxKmerSource {
    reader: Box<dyn BufRead>,
    decoder: KmerDecoder,
    chunk_size: usize,
    chunk: KmerChunk,
    /// Header line read ahead while collecting a multi-line FASTA record.
    pending_header: Option<String>,
    line_no: usize,
    finished: bool,
}

impl FastxKmerSource {
    pub fn open<P: AsRef<Path>>(path: P, chunk_size: usize, decoder: KmerDecoder) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path)?;

        // If the file ends with ".gz", wrap it in a MultiGzDecoder
        let is_gz = path
            .extension()
            .map(|ext| ext == "gz")
            .unwrap_or(false);

        let reader: Box<dyn BufRead> = if is_gz {
            Box::new(BufReader::new(MultiGzDecoder::new(f)))
        } else {
            Box::new(BufReader::new(f))
        };
        Ok(Self::from_reader(reader, chunk_size, decoder))
    }

    pub fn from_reader(reader: Box<dyn BufRead>, chunk_size: usize, decoder: KmerDecoder) -> Self {
        Self {
            reader,
            decoder,
            chunk_size: chunk_size.max(1),
            chunk: Vec::new(),
            pending_header: None,
            line_no: 0,
            finished: false,
        }
    }

    fn read_line(&mut self, line: &mut String) -> Result<bool> {
        line.clear();
        if self.reader.read_line(line)? == 0 {
            return Ok(false);
        }
        self.line_no += 1;
        let trimmed = line.trim_end().len();
        line.truncate(trimmed);
        Ok(true)
    }

    /// Next `(id, sequence)` record, or `None` at end of input.
    fn next_record(&mut self) -> Result<Option<(String, String)>> {
        let mut line = String::new();

        let header = match self.pending_header.take() {
            Some(h) => h,
            None => loop {
                if !self.read_line(&mut line)? {
                    return Ok(None);
                }
                if !line.is_empty() {
                    break line.clone();
                }
            },
        };

        let marker = header.as_bytes()[0];
        if marker != b'>' && marker != b'@' {
            return Err(Error::InvalidInput(format!(
                "line {}: expected a FASTA/FASTQ header but got `{}`",
                self.line_no, header
            )));
        }
        let id = header[1..].split_whitespace().next().unwrap_or("").to_string();

        if marker == b'>' {
            let mut seq = String::new();
            while self.read_line(&mut line)? {
                if line.starts_with('>') {
                    self.pending_header = Some(line.clone());
                    break;
                }
                seq.push_str(&line);
            }
            Ok(Some((id, seq)))
        } else {
            let mut seq = String::new();
            if !self.read_line(&mut seq)? {
                return Err(self.truncated(&id));
            }
            // plus line, then quality
            if !self.read_line(&mut line)? || !self.read_line(&mut line)? {
                return Err(self.truncated(&id));
            }
            Ok(Some((id, seq)))
        }
    }

    fn truncated(&self, id: &str) -> Error {
        Error::InvalidInput(format!("FASTQ record `{}` truncated at line {}", id, self.line_no))
    }
}

impl ReadKmerSource for FastxKmerSource {
    fn has_more_chunks(&self) -> bool {
        !self.finished
    }

    fn advance_chunk(&mut self) -> Result<()> {
        self.chunk.clear();
        while self.chunk.len() < self.chunk_size {
            match self.next_record()? {
                Some((id, seq)) => {
                    let kmers = self.decoder.seq_to_kmers(&seq);
                    self.chunk.push((id, kmers));
                }
                None => {
                    self.finished = true;
                    break;
                }
            }
        }
        Ok(())
    }

    fn current_chunk(&self) -> &[(String, Vec<KmerRecord>)] {
        &self.chunk
    }
}
