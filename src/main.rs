/// Version injected at compile time via GCP_TEARDOWN_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("GCP_TEARDOWN_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gcp_teardown::destroy::TeardownSummary;
use gcp_teardown::gcp::client::GcpClient;
use gcp_teardown::{Config, DriverSet, Reconciler, TeardownSettings};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Delete every GCP resource belonging to a cluster
#[derive(Parser, Debug)]
#[command(name = "gcp-teardown", version = VERSION, about, long_about = None)]
struct Args {
    /// Infra ID of the cluster (resource name prefix)
    #[arg(short, long)]
    infra_id: String,

    /// GCP project to clean up
    #[arg(short, long)]
    project: Option<String>,

    /// GCP region of the cluster
    #[arg(short, long)]
    region: Option<String>,

    /// Log level (RUST_LOG overrides)
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Seconds between convergence passes
    #[arg(long)]
    pass_interval: Option<u64>,

    /// Seconds before a single provider call is abandoned
    #[arg(long)]
    request_timeout: Option<u64>,

    /// Format of the summary printed on stdout
    #[arg(short, long, value_enum, default_value = "json")]
    output: OutputFormat,

    /// Remember project and region for the next run
    #[arg(long)]
    save_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    let Some(log_path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
        return Ok(None);
    };

    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gcp-teardown {} started with log level: {:?}", VERSION, level);

    Ok(Some(guard))
}

fn print_summary(summary: &TeardownSummary, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(summary)?,
        OutputFormat::Yaml => serde_yaml::to_string(summary)?,
    };
    println!("{}", rendered);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_guard = setup_logging(args.log_level, args.log_file.as_deref())?;

    // CLI > config > gcloud default
    let mut config = Config::load();
    let project = args
        .project
        .clone()
        .or_else(|| config.effective_project())
        .context("no project configured: pass --project or set a gcloud default project")?;
    let region = args
        .region
        .clone()
        .or_else(|| config.effective_region())
        .context("no region configured: pass --region or set a gcloud default compute region")?;

    let settings = TeardownSettings::new(&args.infra_id, &project, &region)
        .with_pass_interval(
            args.pass_interval
                .map_or_else(|| config.pass_interval(), Duration::from_secs),
        )
        .with_request_timeout(
            args.request_timeout
                .map_or_else(|| config.request_timeout(), Duration::from_secs),
        );
    settings.validate()?;

    if args.save_config {
        if let Err(err) = config.remember(&project, &region) {
            tracing::warn!("Failed to save config: {}", err);
        }
    }

    let client = GcpClient::new(&project, &region, settings.request_timeout).await?;
    let mut reconciler = Reconciler::new(settings, DriverSet::gcp(&client))?;

    let cancel = reconciler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping teardown");
            cancel.cancel();
        }
    });

    let summary = reconciler.run().await?;
    print_summary(&summary, args.output)?;

    if !summary.is_complete() {
        // flush buffered log lines before exiting
        drop(log_guard);
        std::process::exit(1);
    }

    Ok(())
}
