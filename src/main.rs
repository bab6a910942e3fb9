use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use seqtrim_rs::config::{Cli, Job};
use seqtrim_rs::error::{EXIT_OK, EXIT_RUN_FAILED};
use seqtrim_rs::fastq::count_records;
use seqtrim_rs::report::{self, RunReport, RunSummary};
use seqtrim_rs::threading::{spawn_run, Message};

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn progress_bar(quiet: bool, records: u64) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(records);
    let style = ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} sequences processed",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Records behind a progress percentage, for the bar's counter.
fn records_done(pct: f64, records: u64) -> u64 {
    ((pct.clamp(0.0, 100.0) / 100.0) * records as f64).round() as u64
}

fn write_reports(cli: &Cli, job: &Job, summary: &RunSummary) -> std::io::Result<()> {
    let report = RunReport { job, summary };
    if let Some(path) = &cli.json {
        report::write_json(path, &report)?;
        info!(path = %path.display(), "wrote JSON report");
    }
    if let Some(path) = &cli.html {
        report::write_html(path, &report, &cli.report_title)?;
        info!(path = %path.display(), "wrote HTML report");
    }
    Ok(())
}

fn exit(code: i32) -> ExitCode {
    ExitCode::from(code as u8)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    // everything is checked before the worker starts
    let prepared = match cli.request().prepare() {
        Ok(p) => p,
        Err(e) => {
            error!("{e}");
            return exit(e.exit_code());
        }
    };
    let job = prepared.job.clone();

    let records = if cli.quiet {
        0
    } else {
        count_records(&job.input).unwrap_or(0)
    };
    let pb = progress_bar(cli.quiet, records);
    let interval = Duration::from_millis(cli.poll_interval_ms.max(1));
    let handle = spawn_run(prepared);
    let terminal = handle.poll_until_done(interval, |msg| {
        if let Message::Progress(pct) = msg {
            pb.set_position(records_done(*pct, records));
        }
    });

    match terminal {
        Message::Result(summary) => {
            pb.finish_and_clear();
            println!("{}", summary.render_text());
            if let Err(e) = write_reports(&cli, &job, &summary) {
                error!("failed to write report: {e}");
                return exit(EXIT_RUN_FAILED);
            }
            exit(EXIT_OK)
        }
        Message::Error(msg) => {
            pb.abandon();
            error!(
                "{} failed: {msg}; output {} may be incomplete",
                job.kind.label(),
                job.output.display()
            );
            exit(EXIT_RUN_FAILED)
        }
        Message::Progress(_) => exit(EXIT_RUN_FAILED),
    }
}
