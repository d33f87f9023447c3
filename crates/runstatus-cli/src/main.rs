//! runstatus - inspect and update TaskRun status documents.
//!
//! Plays the reconciler's part against a single JSON document: read the
//! run, apply one lifecycle operation, write it back.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use mockable::{Clock, DefaultClock};
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use runstatus_core::status::REASON_SUCCEEDED;
use runstatus_core::{
    ContainerState, DeliveryOutcome, RunConfig, StatusFields, TaskRun, TimeoutPolicy,
};

mod error;

use error::CliError;

/// runstatus - TaskRun status tool
#[derive(Parser)]
#[command(name = "runstatus")]
#[command(about = "Inspect and update TaskRun status documents", long_about = None)]
struct Cli {
    /// TaskRun JSON document
    #[arg(short, long)]
    file: PathBuf,

    /// Platform configuration JSON (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of a table
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show lifecycle state and conditions
    Show,

    /// Initialize conditions and the start time
    Init,

    /// Mark the run as failed
    Fail {
        /// One-word reason
        #[arg(short, long)]
        reason: String,

        /// Human-readable message
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Mark the run as successful
    Succeed {
        /// One-word reason
        #[arg(short, long, default_value = REASON_SUCCEEDED)]
        reason: String,

        /// Human-readable message
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Request cancellation and fail the run if it is still going
    Cancel,

    /// Fail the run if it has exceeded its timeout
    #[command(name = "check-timeout")]
    CheckTimeout,

    /// Move the finished attempt into the retry history
    Retry,

    /// Record a cloud event delivery attempt
    #[command(group(ArgGroup::new("outcome").required(true).args(["sent", "failed"])))]
    Event {
        /// Event target
        #[arg(short, long)]
        target: String,

        /// The attempt succeeded
        #[arg(long)]
        sent: bool,

        /// The attempt failed with this error
        #[arg(long)]
        failed: Option<String>,
    },
}

fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => read_json::<RunConfig>(path)?,
        None => RunConfig::default(),
    };
    let policy = TimeoutPolicy::from_config(&config);
    let clock = DefaultClock;

    let mut run: TaskRun = read_json(&cli.file)?;
    debug!(run = %run.run_key(), "Loaded run");

    let changed = match cli.command {
        Commands::Show => {
            print_run(&run, &policy, &clock, cli.json)?;
            false
        }
        Commands::Init => {
            run.status.initialize_conditions(&clock);
            true
        }
        Commands::Fail { reason, message } => {
            run.status.mark_failed(reason, message, &clock);
            run.status.record_completion(&clock);
            true
        }
        Commands::Succeed { reason, message } => {
            run.status.mark_succeeded(reason, message, &clock);
            run.status.record_completion(&clock);
            true
        }
        Commands::Cancel => {
            let requested = run.request_cancellation();
            let stopped = run.check_cancellation(&clock);
            requested || stopped
        }
        Commands::CheckTimeout => {
            let timed_out = run.check_timeout(&policy, &clock);
            println!("{}", if timed_out { "timed out" } else { "within timeout" });
            timed_out
        }
        Commands::Retry => {
            retry(&mut run, config.retry_history_limit, &clock)?;
            info!(
                run = %run.run_key(),
                retries = run.status.retry_count(),
                "Recorded retry"
            );
            true
        }
        Commands::Event {
            target,
            sent,
            failed,
        } => {
            let outcome = delivery_outcome(sent, failed);
            let delivery = run.status.record_cloud_event(&target, outcome, &clock)?;
            println!(
                "{}: {} (attempts: {})",
                delivery.target, delivery.status.condition, delivery.status.retry_count
            );
            true
        }
    };

    if changed {
        write_json(&cli.file, &run)?;
        info!(run = %run.run_key(), file = %cli.file.display(), "Saved run");
    }

    Ok(())
}

/// `--sent` wins; clap already rejects passing both.
fn delivery_outcome(sent: bool, failed: Option<String>) -> DeliveryOutcome {
    match failed {
        Some(error) if !sent => DeliveryOutcome::Failed(error),
        _ => DeliveryOutcome::Sent,
    }
}

fn retry(run: &mut TaskRun, limit: usize, clock: &impl Clock) -> Result<(), CliError> {
    if run.status.record_retry(limit, clock) {
        Ok(())
    } else {
        Err(CliError::NotFinished(run.run_key().into_inner()))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json(path: &Path, run: &TaskRun) -> Result<(), CliError> {
    let mut body = serde_json::to_string_pretty(run)?;
    body.push('\n');
    fs::write(path, body).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn print_run(
    run: &TaskRun,
    policy: &TimeoutPolicy,
    clock: &impl Clock,
    as_json: bool,
) -> Result<(), CliError> {
    let now = clock.utc();
    let status = &run.status;

    if as_json {
        let summary = json!({
            "run": run.run_key().as_str(),
            "started": run.has_started(),
            "done": run.is_done(),
            "successful": run.is_successful(),
            "cancelled": run.is_cancelled(),
            "timedOut": run.has_timed_out(policy, clock),
            "deadline": run.deadline(policy),
            "durationSecs": status.duration(now).map(|d| d.num_seconds()),
            "retries": status.retry_count(),
            "conditions": status.conditions,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("  Run:        {}", run.run_key());
    println!("  Pod:        {}", or_dash(&status.pod_name));
    println!("  Started:    {}", format_time(status.start_time));
    println!("  Completed:  {}", format_time(status.completion_time));
    println!("  Deadline:   {}", format_time(run.deadline(policy)));
    if let Some(duration) = status.duration(now) {
        println!("  Duration:   {}s", duration.num_seconds());
    }
    println!(
        "  Done: {}  Successful: {}  Cancelled: {}  Timed out: {}",
        yes_no(run.is_done()),
        yes_no(run.is_successful()),
        yes_no(run.is_cancelled()),
        yes_no(run.has_timed_out(policy, clock)),
    );

    println!("  Conditions:");
    println!("    {:<12}  {:<8}  {:<20}  {}", "TYPE", "STATUS", "REASON", "MESSAGE");
    for cond in &status.conditions {
        println!(
            "    {:<12}  {:<8}  {:<20}  {}",
            cond.r#type, cond.status, or_dash(&cond.reason), cond.message
        );
    }

    if !status.steps.is_empty() {
        println!("  Steps:");
        for step in &status.steps {
            let state = match &step.state {
                ContainerState::Waiting => "waiting".to_string(),
                ContainerState::Running { .. } => "running".to_string(),
                ContainerState::Terminated { exit_code, .. } => {
                    format!("terminated ({})", exit_code)
                }
            };
            println!("    {:<20}  {}", step.name, state);
        }
    }

    if !status.cloud_events.is_empty() {
        println!("  Cloud events:");
        for event in &status.cloud_events {
            println!(
                "    {:<30}  {:<8}  attempts={}  {}",
                event.target, event.status.condition, event.status.retry_count, event.status.error
            );
        }
    }

    if status.retry_count() > 0 {
        println!("  Retries:    {}", status.retry_count());
    }

    Ok(())
}

fn format_time(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}
