use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::Job;
use crate::filter::{RunStats, TransformKind};

/// Terminal result of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub transform: TransformKind,
    /// `None` for transforms without a threshold, shown as `NA`.
    pub threshold: Option<i32>,
    pub total_records: u64,
    pub kept_records: u64,
    pub modified_records: u64,
    pub discarded_records: u64,
    pub discarded_percent: f64,
    pub elapsed_secs: f64,
    pub output_path: PathBuf,
}

impl RunSummary {
    pub fn new(job: &Job, stats: &RunStats) -> Self {
        let discarded = stats.discarded();
        let discarded_percent = if stats.total == 0 {
            0.0
        } else {
            discarded as f64 * 100.0 / stats.total as f64
        };
        Self {
            transform: job.kind,
            threshold: job.threshold,
            total_records: stats.total,
            kept_records: stats.kept,
            modified_records: stats.modified,
            discarded_records: discarded,
            discarded_percent,
            elapsed_secs: stats.elapsed.as_secs_f64(),
            output_path: job.output.clone(),
        }
    }

    pub fn threshold_label(&self) -> String {
        self.threshold.map_or_else(|| "NA".to_string(), |t| t.to_string())
    }

    /// Human-readable block printed when a run completes.
    pub fn render_text(&self) -> String {
        let modified_label = match self.transform {
            TransformKind::AdapterStrip | TransformKind::QualityTrim => "Trimmed",
            TransformKind::QualityFilter => "Filtered out",
        };
        format!(
            "{} completed in {:.2} seconds.\n\
             Quality cut-off: {}\n\
             Input: {} reads\n\
             Output: {} reads\n\
             {}: {} reads\n\
             Discarded: {} reads ({:.2}%)\n\
             Output file: {}",
            self.transform.label(),
            self.elapsed_secs,
            self.threshold_label(),
            self.total_records,
            self.kept_records,
            modified_label,
            self.modified_records,
            self.discarded_records,
            self.discarded_percent,
            self.output_path.display(),
        )
    }
}

/// Everything written to the JSON report.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub job: &'a Job,
    pub summary: &'a RunSummary,
}

pub fn write_json(path: &Path, report: &RunReport<'_>) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut w, report)?;
    writeln!(w)?;
    w.flush()
}

pub fn write_html(path: &Path, report: &RunReport<'_>, title: &str) -> io::Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    let s = report.summary;

    writeln!(f, "<!DOCTYPE html>")?;
    writeln!(f, "<html>")?;
    writeln!(f, "<head>")?;
    writeln!(f, "<title>{}</title>", escape(title))?;
    writeln!(f, "<style>")?;
    writeln!(f, "body {{ font-family: Arial, sans-serif; margin: 20px; }}")?;
    writeln!(f, "table {{ border-collapse: collapse; width: 100%; max-width: 800px; }}")?;
    writeln!(f, "th, td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}")?;
    writeln!(f, "th {{ background-color: #f2f2f2; }}")?;
    writeln!(f, "</style>")?;
    writeln!(f, "</head>")?;
    writeln!(f, "<body>")?;
    writeln!(f, "<h1>{}</h1>", escape(title))?;

    writeln!(f, "<h2>Run</h2>")?;
    writeln!(f, "<table>")?;
    writeln!(f, "<tr><th>Setting</th><th>Value</th></tr>")?;
    writeln!(f, "<tr><td>Transform</td><td>{}</td></tr>", s.transform.label())?;
    writeln!(f, "<tr><td>Input</td><td>{}</td></tr>", escape(&report.job.input.display().to_string()))?;
    writeln!(f, "<tr><td>Output</td><td>{}</td></tr>", escape(&s.output_path.display().to_string()))?;
    if let Some(adapters) = &report.job.adapters {
        writeln!(f, "<tr><td>Adapters</td><td>{}</td></tr>", escape(&adapters.display().to_string()))?;
    }
    writeln!(f, "<tr><td>Quality Cut-off</td><td>{}</td></tr>", s.threshold_label())?;
    writeln!(f, "</table>")?;

    writeln!(f, "<h2>Records</h2>")?;
    writeln!(f, "<table>")?;
    writeln!(f, "<tr><th>Metric</th><th>Value</th></tr>")?;
    writeln!(f, "<tr><td>Total Reads</td><td>{}</td></tr>", s.total_records)?;
    writeln!(f, "<tr><td>Written Reads</td><td>{}</td></tr>", s.kept_records)?;
    writeln!(f, "<tr><td>Modified Reads</td><td>{}</td></tr>", s.modified_records)?;
    writeln!(f, "<tr><td>Discarded Reads</td><td>{} ({:.2}%)</td></tr>", s.discarded_records, s.discarded_percent)?;
    writeln!(f, "<tr><td>Elapsed</td><td>{:.3} s</td></tr>", s.elapsed_secs)?;
    writeln!(f, "</table>")?;

    writeln!(f, "</body>")?;
    writeln!(f, "</html>")?;
    f.flush()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn job(kind: TransformKind, threshold: Option<i32>) -> Job {
        Job {
            kind,
            input: PathBuf::from("in.fastq"),
            output: PathBuf::from("out.fastq"),
            threshold,
            adapters: None,
            compression: 4,
        }
    }

    fn stats(total: u64, kept: u64, modified: u64) -> RunStats {
        RunStats { processed: total, total, kept, modified, elapsed: Duration::from_millis(1500) }
    }

    #[test]
    fn summary_counts_and_percent() {
        let s = RunSummary::new(&job(TransformKind::QualityFilter, Some(25)), &stats(8, 6, 2));
        assert_eq!(s.discarded_records, 2);
        assert_eq!(s.discarded_percent, 25.0);
        assert_eq!(s.kept_records + s.discarded_records, s.total_records);
        assert!(s.render_text().contains("Quality cut-off: 25"));
        assert!(s.render_text().contains("Discarded: 2 reads (25.00%)"));
    }

    #[test]
    fn adapter_strip_has_no_threshold() {
        let s = RunSummary::new(&job(TransformKind::AdapterStrip, None), &stats(3, 3, 1));
        assert_eq!(s.threshold_label(), "NA");
        assert_eq!(s.discarded_records, 0);
        assert!(s.render_text().contains("Trimmed: 1 reads"));
    }

    #[test]
    fn empty_run_reports_zero_percent() {
        let s = RunSummary::new(&job(TransformKind::QualityTrim, Some(20)), &stats(0, 0, 0));
        assert_eq!(s.discarded_percent, 0.0);
    }

    #[test]
    fn json_and_html_reports_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let j = job(TransformKind::QualityTrim, Some(20));
        let s = RunSummary::new(&j, &stats(4, 3, 2));
        let report = RunReport { job: &j, summary: &s };

        let json_path = dir.path().join("report.json");
        write_json(&json_path, &report).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value["summary"]["transform"], "quality-trim");
        assert_eq!(value["summary"]["kept_records"], 3);
        assert_eq!(value["job"]["threshold"], 20);

        let html_path = dir.path().join("report.html");
        write_html(&html_path, &report, "a <b> run").unwrap();
        let html = std::fs::read_to_string(&html_path).unwrap();
        assert!(html.contains("<title>a &lt;b&gt; run</title>"));
        assert!(html.contains("<tr><td>Discarded Reads</td><td>1 (25.00%)</td></tr>"));
    }
}
