use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Exit status for a run that finished with a result.
pub const EXIT_OK: i32 = 0;
/// Exit status for failures raised while a run was in flight.
pub const EXIT_RUN_FAILED: i32 = 1;
/// Exit status for input validation failures, reported before any work starts.
pub const EXIT_INVALID_INPUT: i32 = 2;

/// Problems detected while checking a job, before the worker is started.
/// Nothing has been written when one of these is returned.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{what} file {} does not exist", path.display())]
    MissingFile { what: &'static str, path: PathBuf },

    #[error("{what} file {} is not readable: {source}", path.display())]
    UnreadableFile {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output directory {} does not exist", .0.display())]
    MissingOutputDir(PathBuf),

    #[error("quality threshold must be an integer, got {0:?}")]
    InvalidThreshold(String),

    #[error("unsupported adapter file extension {extension:?} for {} (expected fasta, fa, fastq or fq)", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("adapter pattern {pattern:?} is not a valid regular expression: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("malformed record #{record}: {reason}")]
    MalformedRecord { record: u64, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("run cancelled after {processed} records")]
    Cancelled { processed: u64 },
}

impl Error {
    pub fn malformed(record: u64, reason: impl Into<String>) -> Self {
        Error::MalformedRecord {
            record,
            reason: reason.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_validation() {
            EXIT_INVALID_INPUT
        } else {
            EXIT_RUN_FAILED
        }
    }
}
