mod adapter_trimmer;
mod quality_filter;
mod quality_trim;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fastq::FastqRecord;

pub use self::adapter_trimmer::{AdapterStrip, PatternMode};
pub use self::quality_filter::{QualityFilter, SentinelPolicy};
pub use self::quality_trim::QualityTrim;

/// What a transform did with one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// `None` drops the record from the output.
    pub record: Option<FastqRecord>,
    pub modified: bool,
}

impl Outcome {
    pub fn keep(record: FastqRecord, modified: bool) -> Self {
        Self { record: Some(record), modified }
    }

    pub fn discard(modified: bool) -> Self {
        Self { record: None, modified }
    }
}

/// A record-local transformation driven by the streaming engine.
pub trait Transform: Send {
    fn kind(&self) -> TransformKind;

    fn apply(&self, rec: FastqRecord) -> Outcome;

    /// Whether `rec` contributes to the run's total. An `Err` aborts the run
    /// with a malformed-record failure carrying the message.
    fn counts(&self, _rec: &FastqRecord) -> Result<bool, String> {
        Ok(true)
    }
}

impl<T: Transform + ?Sized> Transform for Box<T> {
    fn kind(&self) -> TransformKind {
        (**self).kind()
    }
    fn apply(&self, rec: FastqRecord) -> Outcome {
        (**self).apply(rec)
    }
    fn counts(&self, rec: &FastqRecord) -> Result<bool, String> {
        (**self).counts(rec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformKind {
    AdapterStrip,
    QualityTrim,
    QualityFilter,
}

impl TransformKind {
    pub fn label(self) -> &'static str {
        match self {
            TransformKind::AdapterStrip => "adapter-strip",
            TransformKind::QualityTrim => "quality-trim",
            TransformKind::QualityFilter => "quality-filter",
        }
    }

    /// Prefix for output files named after the input.
    pub fn output_prefix(self) -> &'static str {
        match self {
            TransformKind::AdapterStrip => "adapter_trimmed",
            TransformKind::QualityTrim => "quality_trimmed",
            TransformKind::QualityFilter => "quality_filtered",
        }
    }
}

/// Counters for a single run. Only the worker executing the run touches them.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RunStats {
    /// Records read from the input.
    pub processed: u64,
    /// Records counted towards the total.
    pub total: u64,
    /// Records written to the output.
    pub kept: u64,
    /// Records the transform changed (trimmed, stripped or filtered out).
    pub modified: u64,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunStats {
    pub fn record(&mut self, counted: bool, outcome: &Outcome) {
        self.processed += 1;
        if counted {
            self.total += 1;
        }
        if outcome.record.is_some() {
            self.kept += 1;
        }
        if outcome.modified {
            self.modified += 1;
        }
    }

    pub fn discarded(&self) -> u64 {
        self.total.saturating_sub(self.kept)
    }
}
