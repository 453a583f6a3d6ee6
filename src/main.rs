//! relay-ingest
//!
//! Ingests upstream task-result bodies from files through the resilient
//! reader and prints one JSON line per decoded task.
//!
//! # Architecture Overview
//!
//! ```text
//!   BODY_FILE...                 ┌──────────────────────────────────────────┐
//!   ─────────────────────────────┼─▶ FileSource (size hint from metadata)   │
//!                                │        │                                 │
//!                                │        ▼                                 │
//!                                │  ResponseIngestor::concurrent_parse      │
//!                                │   ├─ semaphore gate (concurrency)        │
//!                                │   ├─ timeout estimate → copy → retry     │
//!                                │   └─ JsonAdaptor<TaskInfo>               │
//!                                │        │                                 │
//!   stdout (JSON lines)          │        ▼                                 │
//!   ◀────────────────────────────┼── results in input order                 │
//!                                │                                          │
//!                                │  PerformanceMonitor · TimeoutDiagnostics │
//!                                │  (logged on exit)                        │
//!                                └──────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::{Deserialize, Serialize};

use relay_ingest::config::load_or_default;
use relay_ingest::diagnostics::{PerformanceMonitor, TimeoutDiagnostics};
use relay_ingest::ingest::{FileSource, JsonAdaptor, ResponseIngestor};
use relay_ingest::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "relay-ingest")]
#[command(about = "Ingest upstream task-result bodies with bounded size and adaptive timeouts", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit.
    #[arg(long)]
    dump_config: bool,

    /// Upstream response bodies to ingest.
    #[arg(required_unless_present = "dump_config")]
    files: Vec<PathBuf>,
}

/// Provider-neutral view of an asynchronous task result.
#[derive(Debug, Deserialize, Serialize)]
struct TaskInfo {
    #[serde(default, alias = "id")]
    task_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    progress: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_or_default(cli.config.as_deref())?;

    if cli.dump_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        max_response_size = config.ingestion.max_response_size,
        buffer_size = config.ingestion.buffer_size,
        concurrency = config.ingestion.concurrency,
        read_secs = config.timeouts.read_secs,
        max_attempts = config.retries.max_attempts,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let monitor = Arc::new(PerformanceMonitor::new());
    let diagnostics = Arc::new(TimeoutDiagnostics::new());
    let ingestor = ResponseIngestor::from_config(&config, monitor.clone(), diagnostics.clone());

    let mut sources = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        sources.push(FileSource::with_metadata(path).await.map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Cannot stat body file");
            e
        })?);
    }

    let result = ingestor
        .concurrent_parse(sources, Arc::new(JsonAdaptor::<TaskInfo>::new()))
        .await;

    monitor.log_metrics();
    tracing::info!(
        report = %serde_json::to_string(&monitor.effectiveness_report())?,
        "Ingestion effectiveness"
    );
    diagnostics.log_diagnostics();

    for task in result? {
        println!("{}", serde_json::to_string(&task)?);
    }

    Ok(())
}
