pub mod calendar;
pub mod config;
pub mod db;
pub mod errors;
pub mod estimator;
pub mod models;
pub mod persistence;
pub mod store;
pub mod tracker;

use crate::calendar::CalendarDay;
use crate::config::AppConfig;
use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{
    AppSettings, AppendSamplePayload, CreateMetricPayload, ExportFormat, Metric, MetricRateView,
};
use crate::persistence::{KeyValueStore, MemoryKvStore};
use crate::tracker::TrackerCore;
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

#[derive(Parser)]
#[command(name = "doubling-tracker")]
#[command(about = "Track metrics over time and project how fast they double")]
struct Cli {
    /// Directory holding state.sqlite and logs.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    /// Run against in-memory state only.
    #[arg(long, global = true, default_value_t = false)]
    ephemeral: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List metrics with their samples.
    List,
    /// Show the doubling rate of every metric.
    Rates,
    /// Create a metric.
    Add {
        name: String,
        #[arg(allow_negative_numbers = true)]
        base_value: f64,
    },
    /// Record a sample for a metric.
    Record {
        metric_id: i64,
        #[arg(allow_negative_numbers = true)]
        value: f64,
        /// Calendar day of the sample (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<CalendarDay>,
    },
    /// Delete a metric and all of its samples.
    Delete { metric_id: i64 },
    /// Write metrics and rates to <data-dir>/exports.
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
    },
    /// Show settings, or merge a JSON patch into them.
    Settings {
        #[arg(long)]
        set: Option<String>,
    },
}

struct Session {
    tracker: TrackerCore,
    db: Option<Arc<Database>>,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let config = AppConfig::resolve(cli.data_dir.clone(), cli.ephemeral);
    if let Err(error) = init_tracing(&config) {
        eprintln!("logging unavailable: {}", error);
    }

    match execute(&cli, &config) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!(error = %error, "command failed");
            eprintln!("{}", to_client_error(error));
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli, config: &AppConfig) -> AppResult<String> {
    let mut session = open_session(config)?;
    let json = cli.json;

    match &cli.command {
        Command::List => render(json, session.tracker.list_metrics(), render_metrics),
        Command::Rates => render(json, session.tracker.rate_board(), render_rates),
        Command::Add { name, base_value } => {
            let metric = session.tracker.create_metric(CreateMetricPayload {
                name: name.clone(),
                base_value: *base_value,
            })?;
            render(json, &metric, |metric| format!("created #{} {}", metric.id, metric.name))
        }
        Command::Record { metric_id, value, date } => {
            let metric = session.tracker.append_sample(AppendSamplePayload {
                metric_id: *metric_id,
                value: *value,
                date: *date,
            })?;
            let view = session.tracker.rate_for(metric.id)?;
            render(json, view, |view| format!("{}: {}", view.name, view.label()))
        }
        Command::Delete { metric_id } => {
            let response = session.tracker.delete_metric(*metric_id);
            render(json, &response, |response| {
                if response.deleted {
                    format!("deleted #{}", response.metric_id)
                } else {
                    format!("no metric #{}", response.metric_id)
                }
            })
        }
        Command::Export { format } => {
            if config.ephemeral {
                return Err(AppError::InvalidInput("Export needs a data directory; drop --ephemeral".to_string()));
            }
            let response = session.tracker.export(config.data_dir(), *format)?;
            render(json, &response, |response| response.path.clone())
        }
        Command::Settings { set } => {
            let settings = match (set, session.db.as_ref()) {
                (Some(raw), Some(db)) => {
                    let patch: serde_json::Value = serde_json::from_str(raw)
                        .map_err(|error| AppError::InvalidInput(format!("--set expects JSON: {}", error)))?;
                    db.update_settings(patch)?
                }
                (Some(_), None) => {
                    return Err(AppError::InvalidInput("Settings cannot be saved with --ephemeral".to_string()));
                }
                (None, _) => session.tracker.settings().clone(),
            };
            render_settings(&settings)
        }
    }
}

fn open_session(config: &AppConfig) -> anyhow::Result<Session> {
    if config.ephemeral {
        let kv: Box<dyn KeyValueStore> = Box::new(MemoryKvStore::new());
        return Ok(Session {
            tracker: TrackerCore::load(kv, AppSettings::default()),
            db: None,
        });
    }

    let db_path = config.db_path();
    let db = Arc::new(
        Database::new(&db_path).with_context(|| format!("failed to open {}", db_path.display()))?,
    );
    let settings = db.get_settings().context("failed to read settings")?;
    let tracker = TrackerCore::load(Box::new(db.clone()), settings);
    Ok(Session { tracker, db: Some(db) })
}

fn render<T, F>(json: bool, value: &T, text: F) -> AppResult<String>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T) -> String,
{
    if json {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(text(value))
    }
}

fn render_settings(settings: &AppSettings) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(settings)?)
}

fn render_metrics(metrics: &[Metric]) -> String {
    if metrics.is_empty() {
        return "no metrics yet".to_string();
    }
    let mut lines = Vec::new();
    for metric in metrics {
        let last_updated = metric
            .last_updated
            .map(|day| day.to_string())
            .unwrap_or_else(|| "never".to_string());
        lines.push(format!(
            "#{} {} (base {}, {} samples, updated {})",
            metric.id,
            metric.name,
            metric.base_value,
            metric.samples.len(),
            last_updated
        ));
        for sample in &metric.samples {
            lines.push(format!("    {}  {}", sample.date, sample.value));
        }
    }
    lines.join("\n")
}

fn render_rates(rates: &[MetricRateView]) -> String {
    if rates.is_empty() {
        return "no metrics yet".to_string();
    }
    rates
        .iter()
        .map(|view| format!("#{} {}: {}", view.metric_id, view.name, view.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn init_tracing(config: &AppConfig) -> Result<(), String> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if config.ephemeral {
        return tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|error| error.to_string());
    }

    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "tracker.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}

fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
