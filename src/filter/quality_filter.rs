use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::fastq::{FastqRecord, IDENTIFIER_SENTINEL};
use crate::filter::{Outcome, Transform, TransformKind};

/// How identifier lines that do not start with `@` are treated when counting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SentinelPolicy {
    /// Every record counts, whatever its identifier looks like.
    #[default]
    Ignore,
    /// Identifiers must start with `@`; anything else fails the run.
    Require,
    /// Records are always processed but only `@` identifiers are counted.
    /// Kept plus discarded may then no longer add up to the total.
    CountOnly,
}

/// Keeps whole records whose mean Phred score reaches the threshold.
pub struct QualityFilter {
    threshold: i32,
    sentinel: SentinelPolicy,
}

impl QualityFilter {
    pub fn new(threshold: i32) -> Self {
        Self::with_sentinel(threshold, SentinelPolicy::default())
    }

    pub fn with_sentinel(threshold: i32, sentinel: SentinelPolicy) -> Self {
        Self { threshold, sentinel }
    }

    /// Mean >= threshold, compared as `sum >= threshold * len` so no
    /// rounding creeps in. A record without bases has no mean and fails.
    pub fn passes(&self, rec: &FastqRecord) -> bool {
        let (sum, n) = rec
            .scores()
            .fold((0i64, 0i64), |(sum, n), q| (sum + i64::from(q), n + 1));
        n > 0 && sum >= self.threshold as i64 * n
    }
}

impl Transform for QualityFilter {
    fn kind(&self) -> TransformKind {
        TransformKind::QualityFilter
    }

    fn apply(&self, rec: FastqRecord) -> Outcome {
        if self.passes(&rec) {
            Outcome::keep(rec, false)
        } else {
            Outcome::discard(true)
        }
    }

    fn counts(&self, rec: &FastqRecord) -> Result<bool, String> {
        match self.sentinel {
            SentinelPolicy::Ignore => Ok(true),
            SentinelPolicy::CountOnly => Ok(rec.has_sentinel()),
            SentinelPolicy::Require if rec.has_sentinel() => Ok(true),
            SentinelPolicy::Require => Err(format!(
                "identifier {:?} does not start with '{}'",
                rec.name, IDENTIFIER_SENTINEL
            )),
        }
    }
}
