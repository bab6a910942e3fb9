use std::fs::File;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog;
use crate::error::{Result, ValidationError};
use crate::filter::{
    AdapterStrip, PatternMode, QualityFilter, QualityTrim, SentinelPolicy, Transform, TransformKind,
};

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "seqtrim", version, about = "Streaming FASTQ adapter stripping, quality trimming and filtering")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Cmd,

    // Reporting
    #[arg(short='j', long="json", global=true)]
    pub json: Option<PathBuf>,
    #[arg(long="html", global=true)]
    pub html: Option<PathBuf>,
    #[arg(short='R', long="report_title", default_value="seqtrim report", global=true)]
    pub report_title: String,

    // Output
    #[arg(short='z', long="compression", default_value_t=4, global=true)]
    pub compression: u32,

    // Consumer loop
    #[arg(long="poll_interval_ms", default_value_t=100, global=true)]
    pub poll_interval_ms: u64,
    #[arg(long="quiet", action=ArgAction::SetTrue, global=true)]
    pub quiet: bool,
    #[arg(short='v', long="verbose", action=ArgAction::SetTrue, global=true)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
pub struct IoArgs {
    /// Input FASTQ file (.gz accepted)
    #[arg(short='i', long="in")]
    pub input: PathBuf,
    /// Output FASTQ file or existing directory
    #[arg(short='o', long="out")]
    pub output: PathBuf,
}

#[derive(Subcommand, Debug, Clone, Serialize, Deserialize)]
pub enum Cmd {
    /// Remove adapter sequences listed in a FASTA/FASTQ file
    AdapterStrip {
        #[command(flatten)]
        io: IoArgs,
        #[arg(short='a', long="adapters")]
        adapters: PathBuf,
        #[arg(long="pattern_mode", value_enum, default_value_t=PatternMode::Regex)]
        pattern_mode: PatternMode,
    },
    /// Trim low-quality bases from the 3' end
    QualityTrim {
        #[command(flatten)]
        io: IoArgs,
        #[arg(short='q', long="threshold", allow_hyphen_values=true)]
        threshold: String,
    },
    /// Drop records whose mean quality is below the threshold
    QualityFilter {
        #[command(flatten)]
        io: IoArgs,
        #[arg(short='q', long="threshold", allow_hyphen_values=true)]
        threshold: String,
        #[arg(long="sentinel", value_enum, default_value_t=SentinelPolicy::Ignore)]
        sentinel: SentinelPolicy,
    },
}

impl Cli {
    pub fn request(&self) -> RunRequest {
        let req = match &self.command {
            Cmd::AdapterStrip { io, adapters, pattern_mode } => {
                RunRequest::adapter_strip(&io.input, &io.output, adapters).pattern_mode(*pattern_mode)
            }
            Cmd::QualityTrim { io, threshold } => {
                RunRequest::quality_trim(&io.input, &io.output, threshold.as_str())
            }
            Cmd::QualityFilter { io, threshold, sentinel } => {
                RunRequest::quality_filter(&io.input, &io.output, threshold.as_str()).sentinel(*sentinel)
            }
        };
        req.compression(self.compression)
    }
}

/// A transform invocation as submitted by a caller, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub kind: TransformKind,
    pub input: PathBuf,
    pub output: PathBuf,
    pub threshold: Option<String>,
    pub adapters: Option<PathBuf>,
    pub pattern_mode: PatternMode,
    pub sentinel: SentinelPolicy,
    pub compression: u32,
}

impl RunRequest {
    fn new(kind: TransformKind, input: &Path, output: &Path) -> Self {
        Self {
            kind,
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            threshold: None,
            adapters: None,
            pattern_mode: PatternMode::default(),
            sentinel: SentinelPolicy::default(),
            compression: 4,
        }
    }

    pub fn adapter_strip(input: impl AsRef<Path>, output: impl AsRef<Path>, adapters: impl AsRef<Path>) -> Self {
        let mut req = Self::new(TransformKind::AdapterStrip, input.as_ref(), output.as_ref());
        req.adapters = Some(adapters.as_ref().to_path_buf());
        req
    }

    pub fn quality_trim(input: impl AsRef<Path>, output: impl AsRef<Path>, threshold: impl Into<String>) -> Self {
        let mut req = Self::new(TransformKind::QualityTrim, input.as_ref(), output.as_ref());
        req.threshold = Some(threshold.into());
        req
    }

    pub fn quality_filter(input: impl AsRef<Path>, output: impl AsRef<Path>, threshold: impl Into<String>) -> Self {
        let mut req = Self::new(TransformKind::QualityFilter, input.as_ref(), output.as_ref());
        req.threshold = Some(threshold.into());
        req
    }

    pub fn pattern_mode(mut self, mode: PatternMode) -> Self {
        self.pattern_mode = mode;
        self
    }

    pub fn sentinel(mut self, policy: SentinelPolicy) -> Self {
        self.sentinel = policy;
        self
    }

    pub fn compression(mut self, level: u32) -> Self {
        self.compression = level;
        self
    }

    /// Validates the request and builds its transform. Nothing is written to
    /// disk here, so a rejected request leaves no trace.
    pub fn prepare(self) -> Result<PreparedRun> {
        check_readable("sequence", &self.input)?;

        let threshold = match (self.kind, &self.threshold) {
            (TransformKind::AdapterStrip, _) => None,
            (_, Some(raw)) => Some(parse_threshold(raw)?),
            (_, None) => return Err(ValidationError::InvalidThreshold(String::new()).into()),
        };

        let transform: Box<dyn Transform> = match self.kind {
            TransformKind::AdapterStrip => {
                let path = self.adapters.as_deref().unwrap_or_else(|| Path::new(""));
                let adapters = catalog::load(path)?;
                Box::new(AdapterStrip::new(&adapters, self.pattern_mode)?)
            }
            TransformKind::QualityTrim => Box::new(QualityTrim::new(threshold.unwrap_or_default())),
            TransformKind::QualityFilter => Box::new(QualityFilter::with_sentinel(
                threshold.unwrap_or_default(),
                self.sentinel,
            )),
        };

        let output = resolve_output(&self.output, &self.input, self.kind.output_prefix())?;
        debug!(output = %output.display(), "resolved output path");

        let job = Job {
            kind: self.kind,
            input: self.input,
            output,
            threshold,
            adapters: self.adapters,
            compression: self.compression,
        };
        Ok(PreparedRun { job, transform })
    }
}

/// A validated run: resolved paths plus the parsed threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub kind: TransformKind,
    pub input: PathBuf,
    pub output: PathBuf,
    pub threshold: Option<i32>,
    pub adapters: Option<PathBuf>,
    pub compression: u32,
}

/// Everything a worker needs to execute one run.
pub struct PreparedRun {
    pub job: Job,
    pub transform: Box<dyn Transform>,
}

pub fn parse_threshold(raw: &str) -> std::result::Result<i32, ValidationError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| ValidationError::InvalidThreshold(raw.to_string()))
}

fn check_readable(what: &'static str, path: &Path) -> std::result::Result<(), ValidationError> {
    if !path.exists() {
        return Err(ValidationError::MissingFile { what, path: path.to_path_buf() });
    }
    let unreadable = |source| ValidationError::UnreadableFile {
        what,
        path: path.to_path_buf(),
        source,
    };
    if path.is_dir() {
        return Err(unreadable(std::io::Error::new(
            std::io::ErrorKind::Other,
            "is a directory",
        )));
    }
    File::open(path).map_err(unreadable)?;
    Ok(())
}

fn has_fastq_extension(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    name.ends_with(".fastq") || name.ends_with(".fq")
}

/// Works out where a run writes to.
///
/// An existing directory gets `<prefix>_<input stem>.fastq` inside it; a
/// file name without a FASTQ extension gets `.fastq` appended. The parent
/// directory has to exist already.
pub fn resolve_output(output: &Path, input: &Path, prefix: &str) -> std::result::Result<PathBuf, ValidationError> {
    if output.is_dir() {
        let stem = input
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.trim_end_matches(".gz"))
            .map(|n| n.rsplit_once('.').map_or(n, |(stem, _)| stem))
            .unwrap_or("reads");
        return Ok(output.join(format!("{prefix}_{stem}.fastq")));
    }

    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(ValidationError::MissingOutputDir(parent.to_path_buf()));
    }

    if has_fastq_extension(output) {
        Ok(output.to_path_buf())
    } else {
        let mut name = output.as_os_str().to_os_string();
        name.push(".fastq");
        Ok(PathBuf::from(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;

    #[test]
    fn threshold_must_be_an_integer() {
        assert_eq!(parse_threshold("20").unwrap(), 20);
        assert_eq!(parse_threshold(" 7 ").unwrap(), 7);
        assert_eq!(parse_threshold("-3").unwrap(), -3);
        assert!(matches!(parse_threshold("20.5"), Err(ValidationError::InvalidThreshold(_))));
        assert!(matches!(parse_threshold(""), Err(ValidationError::InvalidThreshold(_))));
    }

    #[test]
    fn output_in_directory_is_named_after_input() {
        let dir = tempfile::tempdir().unwrap();
        let out = resolve_output(dir.path(), Path::new("/data/sample1.fq.gz"), "quality_trimmed").unwrap();
        assert_eq!(out, dir.path().join("quality_trimmed_sample1.fastq"));
    }

    #[test]
    fn output_without_fastq_extension_gets_one() {
        let dir = tempfile::tempdir().unwrap();
        let out = resolve_output(&dir.path().join("result"), Path::new("in.fq"), "x").unwrap();
        assert_eq!(out, dir.path().join("result.fastq"));

        let out = resolve_output(&dir.path().join("result.FQ"), Path::new("in.fq"), "x").unwrap();
        assert_eq!(out, dir.path().join("result.FQ"));

        let out = resolve_output(&dir.path().join("result.fastq.gz"), Path::new("in.fq"), "x").unwrap();
        assert_eq!(out, dir.path().join("result.fastq.gz"));
    }

    #[test]
    fn missing_output_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("missing").join("out.fastq");
        assert!(matches!(
            resolve_output(&out, Path::new("in.fq"), "x"),
            Err(ValidationError::MissingOutputDir(_))
        ));
    }

    #[test]
    fn prepare_rejects_bad_threshold_without_touching_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.fastq");
        File::create(&input).unwrap().write_all(b"@r\nA\n+\nI\n").unwrap();
        let output = dir.path().join("out.fastq");

        let err = RunRequest::quality_trim(&input, &output, "high").prepare().err().unwrap();
        assert!(matches!(err, Error::Validation(ValidationError::InvalidThreshold(_))));
        assert!(!output.exists());
    }

    #[test]
    fn prepare_reports_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunRequest::quality_filter(dir.path().join("nope.fq"), dir.path().join("o.fq"), "20")
            .prepare()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Validation(ValidationError::MissingFile { what: "sequence", .. })));
    }

    #[test]
    fn cli_builds_requests() {
        let cli = Cli::parse_from([
            "seqtrim", "quality-filter", "-i", "in.fq", "-o", "out.fq", "-q", "25", "--sentinel", "count-only",
        ]);
        let req = cli.request();
        assert_eq!(req.kind, TransformKind::QualityFilter);
        assert_eq!(req.threshold.as_deref(), Some("25"));
        assert_eq!(req.sentinel, SentinelPolicy::CountOnly);

        let cli = Cli::parse_from([
            "seqtrim", "adapter-strip", "-i", "in.fq", "-o", "out.fq", "-a", "ad.fa", "--pattern_mode", "literal", "-z", "6",
        ]);
        let req = cli.request();
        assert_eq!(req.pattern_mode, PatternMode::Literal);
        assert_eq!(req.adapters.as_deref(), Some(Path::new("ad.fa")));
        assert_eq!(req.compression, 6);
    }
}
