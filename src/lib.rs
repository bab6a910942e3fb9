//! Streaming FASTQ transforms: adapter stripping, 3' quality trimming and
//! mean-quality filtering, run on a background worker that reports progress
//! over a per-run channel.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod fastq;
pub mod filter;
pub mod report;
pub mod threading;

pub use config::{Job, PreparedRun, RunRequest};
pub use error::{Error, Result, ValidationError};
pub use filter::{PatternMode, SentinelPolicy, Transform, TransformKind};
pub use threading::{spawn_run, Message, RunHandle};
