//! `readcoach` command-line host.
//!
//! ## Runtime note
//!
//! The engine is synchronous; `read` drives it on a blocking task while
//! Tokio tasks forward its broadcast events to the terminal, the way a UI
//! shell would forward them to a window.

mod profile;
mod replay;
mod settings;
mod storage;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use readcoach_core::{channel_source, ReadingSessionEngine};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use profile::LearnerProfile;
use replay::{load_script, run_script};
use settings::{default_settings_path, load_settings, save_settings, AppSettings};
use storage::{LocalStore, SqliteSessionLog};

#[derive(Parser, Debug)]
#[command(name = "readcoach", version, about = "Read-aloud coaching sessions")]
struct Args {
    /// Path to settings.json
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a reading session, replaying a JSONL transcript script
    Read {
        /// Reference text to read
        #[arg(long, conflicts_with = "text_file")]
        text: Option<String>,

        /// File holding the reference text
        #[arg(long)]
        text_file: Option<PathBuf>,

        /// JSONL script of recognizer steps
        #[arg(long)]
        script: PathBuf,
    },
    /// Recent sessions, newest first
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Per-day totals over the last N days
    Stats {
        #[arg(long, default_value_t = 30)]
        days: usize,
    },
    /// Learner profile built from stored sessions
    Profile {
        #[arg(long, default_value_t = 200)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "readcoach=debug"
    } else {
        "readcoach=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings_path = args.settings.clone().unwrap_or_else(default_settings_path);
    let mut app_settings = load_settings(&settings_path);
    if !settings_path.exists() {
        if let Err(e) = save_settings(&settings_path, &app_settings) {
            warn!("failed to write default settings: {e}");
        }
    }
    app_settings.apply_env_overrides();
    info!(
        settings_path = ?settings_path,
        lookahead_window = app_settings.lookahead_window,
        max_practice_words = app_settings.max_practice_words,
        history_enabled = app_settings.history_enabled,
        "settings loaded"
    );

    let store = LocalStore::new(app_settings.db_path())
        .map_err(anyhow::Error::msg)
        .context("failed to open session history")?;
    if let Err(e) = store.prune_history(app_settings.retention_days) {
        warn!("history prune failed at startup: {e}");
    }

    match args.command {
        Command::Read {
            text,
            text_file,
            script,
        } => {
            let text = match (text, text_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, None) => bail!("one of --text or --text-file is required"),
            };
            run_read(&app_settings, store, text, script).await
        }
        Command::History { limit } => {
            let records = store.recent_sessions(limit).map_err(anyhow::Error::msg)?;
            print_json(&records)
        }
        Command::Stats { days } => {
            let stats = store.get_stats(days).map_err(anyhow::Error::msg)?;
            print_json(&stats)
        }
        Command::Profile { limit } => {
            let records = store.recent_sessions(limit).map_err(anyhow::Error::msg)?;
            print_json(&LearnerProfile::from_records(&records))
        }
    }
}

async fn run_read(
    app_settings: &AppSettings,
    store: LocalStore,
    text: String,
    script: PathBuf,
) -> Result<()> {
    let steps = load_script(&script)?;
    let (source, feed, events) = channel_source();
    let sink = SqliteSessionLog::new(store, app_settings.history_enabled);
    let mut engine =
        ReadingSessionEngine::new(app_settings.engine_config(), Box::new(source), Box::new(sink));

    let mut progress_rx = engine.subscribe_progress();
    let progress_task = tokio::spawn(async move {
        loop {
            match progress_rx.recv().await {
                Ok(event) => {
                    if let Some(feedback) = event.feedback {
                        println!("[{}] {}", event.cursor, feedback.message);
                    }
                }
                Err(RecvError::Lagged(n)) => warn!("progress receiver lagged by {n} events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut status_rx = engine.subscribe_status();
    let status_task = tokio::spawn(async move {
        loop {
            match status_rx.recv().await {
                Ok(event) => match event.detail {
                    Some(detail) => info!(status = %event.status, %detail, "session status"),
                    None => info!(status = %event.status, "session status"),
                },
                Err(RecvError::Lagged(n)) => warn!("status receiver lagged by {n} events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut advisory_rx = engine.subscribe_advisories();
    let advisory_task = tokio::spawn(async move {
        loop {
            match advisory_rx.recv().await {
                Ok(event) => warn!(kind = ?event.kind, "{}", event.message),
                Err(RecvError::Lagged(n)) => warn!("advisory receiver lagged by {n} events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Dropping the engine at the end closes the broadcast channels.
    let report = tokio::task::spawn_blocking(move || -> Result<_> {
        engine.start(&text)?;
        run_script(&mut engine, &feed, &events, &steps)
    })
    .await??;

    for task in [progress_task, status_task, advisory_task] {
        if let Err(e) = task.await {
            warn!("event forwarder ended abnormally: {e}");
        }
    }

    if report.dropped_steps > 0 {
        info!(dropped = report.dropped_steps, "script steps ignored while not listening");
    }
    match report.summary {
        Some(summary) => print_json(&summary),
        None => bail!("session ended {} without a score", report.final_status),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
