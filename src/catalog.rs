//! Adapter catalog loading.
//!
//! Adapter files are either FASTA-like (a header line followed by a
//! sequence line) or FASTQ-like (full four-line records). The format is
//! picked from the file extension and decides which lines hold adapters.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::{Result, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterFormat {
    Fasta,
    Fastq,
}

impl AdapterFormat {
    pub fn from_path(path: &Path) -> std::result::Result<Self, ValidationError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "fasta" | "fa" => Ok(AdapterFormat::Fasta),
            "fastq" | "fq" => Ok(AdapterFormat::Fastq),
            _ => Err(ValidationError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: ext,
            }),
        }
    }

    /// Lines per logical unit in the file.
    pub fn quantization(self) -> usize {
        match self {
            AdapterFormat::Fasta => 2,
            AdapterFormat::Fastq => 4,
        }
    }
}

/// Loads adapter strings in file order. Duplicates are kept.
pub fn load(path: &Path) -> Result<Vec<String>> {
    let format = AdapterFormat::from_path(path)?;
    if !path.exists() {
        return Err(ValidationError::MissingFile {
            what: "adapter",
            path: path.to_path_buf(),
        }
        .into());
    }
    let unreadable = |source| ValidationError::UnreadableFile {
        what: "adapter",
        path: path.to_path_buf(),
        source,
    };

    let reader = BufReader::new(File::open(path).map_err(unreadable)?);
    let step = format.quantization();
    let mut adapters = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(unreadable)?;
        if idx % step == 1 {
            adapters.push(line.trim().to_string());
        }
    }

    debug!(
        path = %path.display(),
        ?format,
        count = adapters.len(),
        "loaded adapter catalog"
    );
    Ok(adapters)
}
