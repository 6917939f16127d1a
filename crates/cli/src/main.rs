//! Replay progress CLI - feeds typed lifecycle notifications into a tracker.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use replay_core::{Domain, Notification};
use replay_progress::{CountBound, ProgressTracker, TrackerConfig};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "replay-progress")]
#[command(about = "Accumulate event, task, stage, and job progress from lifecycle notifications", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a JSON-lines stream of notifications and report progress
    Apply {
        /// Notification file, or `-` for stdin
        input: PathBuf,
        /// Log and skip rejected notifications instead of aborting
        #[arg(long)]
        skip_errors: bool,
        /// Print the final snapshot as JSON
        #[arg(long)]
        json: bool,
        /// Print progress after every notification
        #[arg(long)]
        steps: bool,
        /// Reject starts that run ahead of the observed count
        #[arg(long)]
        strict: bool,
        /// Cap the number of tracked job names
        #[arg(long)]
        job_capacity: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Apply {
            input,
            skip_errors,
            json,
            steps,
            strict,
            job_capacity,
        } => {
            let mut config = TrackerConfig::default();
            if strict {
                config = config.with_count_bound(CountBound::Strict);
            }
            if let Some(capacity) = job_capacity {
                config = config.with_job_name_capacity(capacity);
            }
            let mut tracker = ProgressTracker::new().with_config(config);

            let reader: Box<dyn BufRead> = if input.as_os_str() == "-" {
                Box::new(BufReader::new(std::io::stdin()))
            } else {
                let file = std::fs::File::open(&input)
                    .with_context(|| format!("Failed to open {}", input.display()))?;
                Box::new(BufReader::new(file))
            };

            let outcome = apply_stream(&mut tracker, reader, skip_errors, |tracker| {
                if steps {
                    print!("{}", render_progress(tracker));
                }
            })?;
            info!(
                "Applied {} notifications ({} skipped)",
                outcome.applied, outcome.skipped
            );

            if json {
                println!("{}", render_snapshot(&tracker)?);
            } else {
                print!("{}", render_progress(&tracker));
            }
        }
    }

    Ok(())
}

/// Counts of a finished replay.
#[derive(Debug, Default, PartialEq, Eq)]
struct Outcome {
    applied: usize,
    skipped: usize,
}

/// Apply notifications line by line, in order. Blank lines are ignored.
fn apply_stream<R, F>(
    tracker: &mut ProgressTracker,
    reader: R,
    skip_errors: bool,
    mut after_each: F,
) -> Result<Outcome>
where
    R: BufRead,
    F: FnMut(&ProgressTracker),
{
    let mut outcome = Outcome::default();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("Failed to read line {}", line_no))?;
        if line.trim().is_empty() {
            continue;
        }

        let notification: Notification = serde_json::from_str(&line)
            .with_context(|| format!("Invalid notification on line {}", line_no))?;

        match tracker.apply(&notification) {
            Ok(()) => outcome.applied += 1,
            Err(e) if skip_errors => {
                warn!("Skipping line {} ({}): {}", line_no, notification.kind(), e);
                outcome.skipped += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Rejected {} on line {}", notification.kind(), line_no)
                });
            }
        }
        after_each(tracker);
    }

    Ok(outcome)
}

/// One description line per domain.
fn render_progress(tracker: &ProgressTracker) -> String {
    Domain::ALL
        .iter()
        .map(|domain| format!("{:>6}: {}\n", domain, tracker.counter(*domain)))
        .collect()
}

/// The full snapshot as pretty-printed JSON.
fn render_snapshot(tracker: &ProgressTracker) -> Result<String> {
    Ok(serde_json::to_string_pretty(&tracker.snapshot())?)
}
