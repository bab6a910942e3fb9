//! Streaming driver shared by every transform.
//!
//! Reads the input one record at a time, hands each record to the
//! transform, writes what comes back and keeps the run's counters. The
//! driver never yields mid-record; the only interruption point is the
//! cancellation flag, checked between records.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info};

use crate::config::Job;
use crate::error::{Error, Result};
use crate::fastq::{count_records, Reader, Writer};
use crate::filter::{RunStats, Transform};

/// Turns record counts into whole-percent progress updates, emitting only
/// when the percentage moves forward.
pub struct ProgressTracker {
    expected: u64,
    last: Option<u32>,
}

impl ProgressTracker {
    pub fn new(expected: u64) -> Self {
        Self { expected, last: None }
    }

    /// Percentage to report after `done` records, if it advanced.
    pub fn advance(&mut self, done: u64) -> Option<f64> {
        if self.expected == 0 {
            return None;
        }
        let pct = ((done.min(self.expected) * 100) / self.expected) as u32;
        if self.last.map_or(true, |last| pct > last) {
            self.last = Some(pct);
            return Some(pct as f64);
        }
        None
    }

    /// Final 100% update, unless one was already sent.
    pub fn finish(&mut self) -> Option<f64> {
        if self.last == Some(100) {
            return None;
        }
        self.last = Some(100);
        Some(100.0)
    }
}

/// Runs `transform` over the job's input and writes the result to the job's
/// output, which is created or truncated. On failure whatever was already
/// written stays on disk.
pub fn run(
    job: &Job,
    transform: &dyn Transform,
    progress: &mut dyn FnMut(f64),
    cancel: &AtomicBool,
) -> Result<RunStats> {
    let start = Instant::now();
    let expected = count_records(&job.input)?;
    info!(
        transform = transform.kind().label(),
        input = %job.input.display(),
        output = %job.output.display(),
        records = expected,
        "starting run"
    );

    let mut reader = Reader::new(&job.input)?;
    let mut writer = Writer::new(&job.output, job.compression)?;
    let mut stats = RunStats::default();
    let mut tracker = ProgressTracker::new(expected);

    loop {
        if cancel.load(Ordering::Relaxed) {
            writer.finish()?;
            return Err(Error::Cancelled { processed: stats.processed });
        }
        let rec = match reader.next_record()? {
            Some(rec) => rec,
            None => break,
        };
        let counted = transform
            .counts(&rec)
            .map_err(|reason| Error::malformed(reader.records_read(), reason))?;
        let outcome = transform.apply(rec);
        if let Some(out) = &outcome.record {
            writer.write_record(out)?;
        }
        stats.record(counted, &outcome);

        if let Some(pct) = tracker.advance(stats.processed) {
            progress(pct);
        }
    }

    writer.finish()?;
    if let Some(pct) = tracker.finish() {
        progress(pct);
    }

    stats.elapsed = start.elapsed();
    debug!(?stats, "run statistics");
    info!(
        transform = transform.kind().label(),
        total = stats.total,
        kept = stats.kept,
        modified = stats.modified,
        elapsed_secs = stats.elapsed.as_secs_f64(),
        "run finished"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_reports_each_percent_once() {
        let mut t = ProgressTracker::new(200);
        let reported: Vec<f64> = (1..=200).filter_map(|done| t.advance(done)).collect();
        assert_eq!(reported.len(), 101);
        assert_eq!(reported.first(), Some(&0.0));
        assert_eq!(reported.last(), Some(&100.0));
        assert!(reported.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(t.finish(), None);
    }

    #[test]
    fn tracker_with_few_records_jumps() {
        let mut t = ProgressTracker::new(3);
        assert_eq!(t.advance(1), Some(33.0));
        assert_eq!(t.advance(2), Some(66.0));
        assert_eq!(t.advance(3), Some(100.0));
        assert_eq!(t.advance(4), None);
    }

    #[test]
    fn empty_input_only_reports_completion() {
        let mut t = ProgressTracker::new(0);
        assert_eq!(t.advance(1), None);
        assert_eq!(t.finish(), Some(100.0));
    }
}
