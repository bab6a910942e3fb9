use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Error, Result};

/// Offset between a quality character's code point and its Phred score.
pub const PHRED_OFFSET: u8 = 33;

/// Conventional first character of an identifier line.
pub const IDENTIFIER_SENTINEL: char = '@';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastqRecord {
    pub name: String,
    pub seq: String,
    pub plus: String,
    /// Phred+33 text, one character per base.
    pub qual: String,
}

impl FastqRecord {
    pub fn new(name: String, seq: String, plus: String, qual: String) -> Self {
        Self { name, seq, plus, qual }
    }

    /// Per-base Phred scores decoded from the quality line.
    pub fn scores(&self) -> impl Iterator<Item = i32> + '_ {
        self.qual.chars().map(|c| c as i32 - PHRED_OFFSET as i32)
    }

    /// Number of bases, counted in characters.
    pub fn base_count(&self) -> usize {
        self.seq.chars().count()
    }

    /// Keeps the first `len` bases of both sequence and quality.
    pub fn truncate(&mut self, len: usize) {
        truncate_chars(&mut self.seq, len);
        truncate_chars(&mut self.qual, len);
    }

    pub fn has_sentinel(&self) -> bool {
        self.name.starts_with(IDENTIFIER_SENTINEL)
    }
}

fn truncate_chars(s: &mut String, len: usize) {
    if let Some((idx, _)) = s.char_indices().nth(len) {
        s.truncate(idx);
    }
}

fn open_input(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    let f = File::open(path)?;
    let reader: Box<dyn BufRead + Send> = if is_gzip(path) {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(reader)
}

pub fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

pub struct Reader {
    reader: Box<dyn BufRead + Send>,
    records: u64,
}

impl Reader {
    pub fn new(path: &Path) -> io::Result<Self> {
        Ok(Self::from_bufread(open_input(path)?))
    }

    pub fn from_bufread(reader: Box<dyn BufRead + Send>) -> Self {
        Self { reader, records: 0 }
    }

    /// Number of records returned so far.
    pub fn records_read(&self) -> u64 {
        self.records
    }

    fn read_line(&mut self, buf: &mut String) -> io::Result<bool> {
        if self.reader.read_line(buf)? == 0 {
            return Ok(false);
        }
        let kept = buf.trim_end().len();
        buf.truncate(kept);
        Ok(true)
    }

    /// Reads the next four lines as one record. `Ok(None)` marks a clean end of input.
    pub fn next_record(&mut self) -> Result<Option<FastqRecord>> {
        let mut name = String::new();
        let mut seq = String::new();
        let mut plus = String::new();
        let mut qual = String::new();

        if !self.read_line(&mut name)? {
            return Ok(None);
        }
        let index = self.records + 1;
        for (line, what) in [(&mut seq, "sequence"), (&mut plus, "separator"), (&mut qual, "quality")] {
            if !self.read_line(line)? {
                return Err(Error::malformed(
                    index,
                    format!("truncated record, input ended before the {what} line"),
                ));
            }
        }

        let (seq_len, qual_len) = (seq.chars().count(), qual.chars().count());
        if seq_len != qual_len {
            return Err(Error::malformed(
                index,
                format!("sequence length {seq_len} does not match quality length {qual_len}"),
            ));
        }

        self.records = index;
        Ok(Some(FastqRecord { name, seq, plus, qual }))
    }
}

impl Iterator for Reader {
    type Item = Result<FastqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Counts records with a line pre-pass; a trailing partial group counts as one record.
pub fn count_records(path: &Path) -> io::Result<u64> {
    let mut reader = open_input(path)?;
    let mut lines = 0u64;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        lines += 1;
    }
    Ok(lines.div_ceil(4))
}

enum Sink {
    Plain(BufWriter<File>),
    Gzip(BufWriter<GzEncoder<File>>),
    Other(Box<dyn Write + Send>),
}

pub struct Writer {
    writer: Sink,
}

impl Writer {
    /// Creates (or truncates) `path`; `.gz` paths are gzip-compressed at `compression_level`.
    pub fn new(path: &Path, compression_level: u32) -> io::Result<Self> {
        let f = File::create(path)?;
        let writer = if is_gzip(path) {
            let enc = GzEncoder::new(f, Compression::new(compression_level.min(9)));
            Sink::Gzip(BufWriter::new(enc))
        } else {
            Sink::Plain(BufWriter::new(f))
        };
        Ok(Self { writer })
    }

    pub fn from_write(writer: Box<dyn Write + Send>) -> Self {
        Self { writer: Sink::Other(writer) }
    }

    fn inner(&mut self) -> &mut dyn Write {
        match &mut self.writer {
            Sink::Plain(w) => w,
            Sink::Gzip(w) => w,
            Sink::Other(w) => w,
        }
    }

    /// Flushes everything and, for gzip output, writes the trailer. Errors
    /// that dropping the writer would swallow are returned here.
    pub fn finish(self) -> io::Result<()> {
        match self.writer {
            Sink::Plain(mut w) => w.flush(),
            Sink::Gzip(w) => {
                let enc = w.into_inner().map_err(|e| e.into_error())?;
                enc.finish()?.flush()
            }
            Sink::Other(mut w) => w.flush(),
        }
    }

    pub fn write_record(&mut self, rec: &FastqRecord) -> io::Result<()> {
        let w = self.inner();
        w.write_all(rec.name.as_bytes())?; w.write_all(b"\n")?;
        w.write_all(rec.seq.as_bytes())?;  w.write_all(b"\n")?;
        w.write_all(rec.plus.as_bytes())?; w.write_all(b"\n")?;
        w.write_all(rec.qual.as_bytes())?; w.write_all(b"\n")?;
        Ok(())
    }
}
