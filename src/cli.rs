//! Command-line interface
//!
//! Three entry points: run a monitoring session, generate a baseline
//! snapshot, or serve the dashboard over existing evidence logs.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::alert::AlertLog;
use crate::client::ModelClient;
use crate::config::MonitorConfig;
use crate::dashboard::{run_dashboard, DashboardState};
use crate::drift::DriftDetector;
use crate::monitor::{MonitorLoop, MonitorSummary};
use crate::profile::ReferenceProfile;
use crate::stream::BatchStream;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}

fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", muted(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "driftwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drift monitoring for deployed prediction services")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream a dataset against the deployed model and monitor for drift
    Monitor(MonitorArgs),
    /// Generate a baseline profile snapshot from a reference dataset
    Baseline(BaselineArgs),
    /// Serve the status dashboard over existing evidence logs
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct MonitorArgs {
    /// Dataset to stream (CSV; also the reference unless a snapshot is given)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Prediction endpoint URL (defaults to $MODEL_ENDPOINT)
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Previously generated baseline snapshot (JSON)
    #[arg(long)]
    pub baseline: Option<PathBuf>,

    /// Rows per batch
    #[arg(long, default_value = "16")]
    pub batch_size: usize,

    /// Ground-truth column name
    #[arg(long, default_value = "target")]
    pub target: String,

    /// Directory for the evidence logs
    #[arg(long, default_value = "./monitoring_evidence")]
    pub evidence_dir: PathBuf,

    /// Significance threshold for the per-feature tests
    #[arg(long, default_value = "0.01")]
    pub p_threshold: f64,

    /// Seconds to pause between batches
    #[arg(long, default_value = "0")]
    pub interval: u64,

    /// Dashboard port
    #[arg(long, default_value = "8099")]
    pub dashboard_port: u16,

    /// Do not serve the status dashboard
    #[arg(long)]
    pub no_dashboard: bool,

    /// Skip the startup replay that fixes the performance baseline
    #[arg(long)]
    pub no_replay: bool,
}

#[derive(Args)]
pub struct BaselineArgs {
    /// Reference dataset (CSV)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Prediction endpoint for the baseline replay
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Where to write the snapshot
    #[arg(short, long, default_value = "./monitoring_evidence/baseline_profile.json")]
    pub output: PathBuf,

    /// Ground-truth column name
    #[arg(long, default_value = "target")]
    pub target: String,

    /// Rows per replay batch
    #[arg(long, default_value = "16")]
    pub batch_size: usize,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Directory holding the evidence logs
    #[arg(long, default_value = "./monitoring_evidence")]
    pub evidence_dir: PathBuf,

    /// Port to listen on
    #[arg(long, default_value = "8099")]
    pub port: u16,
}

// ─── Commands ──────────────────────────────────────────────────────────────────

/// Run a full monitoring session.
pub async fn cmd_monitor(args: MonitorArgs) -> anyhow::Result<()> {
    let mut config = MonitorConfig {
        batch_size: args.batch_size,
        p_threshold: args.p_threshold,
        reference_dataset_path: args.data.clone(),
        target_column: args.target.clone(),
        event_log_path: args.evidence_dir.join("drift_events_log.jsonl"),
        remediation_log_path: args.evidence_dir.join("remediation_log.jsonl"),
        dashboard_port: args.dashboard_port,
        batch_interval_secs: args.interval,
        ..MonitorConfig::default()
    };
    if let Some(endpoint) = args.endpoint {
        config.model_endpoint_url = endpoint;
    }
    config.validate()?;

    let client = ModelClient::new(&config.model_endpoint_url, config.request_timeout_secs)?;

    let profile = match &args.baseline {
        Some(snapshot) => {
            info!(path = %snapshot.display(), "Loading baseline snapshot");
            ReferenceProfile::load(snapshot)?
        }
        None => {
            let profile =
                ReferenceProfile::from_csv(&config.reference_dataset_path, &config.target_column)?;
            if args.no_replay {
                profile
            } else {
                match profile
                    .clone()
                    .with_production_metrics(
                        &client,
                        &config.reference_dataset_path,
                        &config.target_column,
                        config.batch_size,
                    )
                    .await
                {
                    Ok(with_metrics) => with_metrics,
                    Err(e) => {
                        warn!(error = %e, "Baseline replay failed; monitoring feature drift only");
                        profile
                    }
                }
            }
        }
    };

    let detector = DriftDetector::new(Arc::new(profile), &config);
    let stream = BatchStream::from_csv(
        &config.reference_dataset_path,
        &config.target_column,
        config.batch_size,
    )?;
    let log = Arc::new(AlertLog::new(
        &config.event_log_path,
        &config.remediation_log_path,
    )?);

    if !args.no_dashboard {
        let state = Arc::new(DashboardState {
            events_path: config.event_log_path.clone(),
            remediation_path: config.remediation_log_path.clone(),
        });
        let port = config.dashboard_port;
        tokio::spawn(async move {
            if let Err(e) = run_dashboard(port, state).await {
                warn!(error = %e, "Dashboard stopped");
            }
        });
    }

    let stop = Arc::new(AtomicBool::new(false));
    let stop_signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received; finishing current batch");
            stop_signal.store(true, Ordering::Relaxed);
        }
    });

    let summary = MonitorLoop::new(stream, client, detector, log, stop)
        .with_batch_interval(config.batch_interval_secs)
        .run()
        .await?;

    print_summary(&summary);
    Ok(())
}

/// Generate and persist a baseline profile snapshot.
pub async fn cmd_baseline(args: BaselineArgs) -> anyhow::Result<()> {
    let mut profile = ReferenceProfile::from_csv(&args.data, &args.target)?;

    if let Some(endpoint) = &args.endpoint {
        let client = ModelClient::new(endpoint, 20)?;
        match profile
            .clone()
            .with_production_metrics(&client, &args.data, &args.target, args.batch_size)
            .await
        {
            Ok(with_metrics) => profile = with_metrics,
            Err(e) => {
                warn!(error = %e, "Baseline replay failed; snapshot will carry no performance metrics");
            }
        }
    }

    profile.save(&args.output)?;
    step_ok(&kv("baseline snapshot", &args.output.display().to_string()));
    Ok(())
}

/// Serve the dashboard on its own.
pub async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let state = Arc::new(DashboardState {
        events_path: args.evidence_dir.join("drift_events_log.jsonl"),
        remediation_path: args.evidence_dir.join("remediation_log.jsonl"),
    });
    run_dashboard(args.port, state).await?;
    Ok(())
}

fn print_summary(summary: &MonitorSummary) {
    section("monitoring summary");
    step_ok(&kv("session", &summary.session_id));
    step_ok(&kv("batches processed", &summary.batches_processed.to_string()));
    step_ok(&kv("drift reports", &summary.drift_reports.to_string()));
    step_ok(&kv("drift detections", &summary.drift_detections.to_string()));
    step_ok(&kv("inference errors", &summary.inference_errors.to_string()));
    step_ok(&kv("remediations", &summary.remediations.to_string()));
    println!();
    println!(
        "  {}",
        kv("events log", &summary.events_path.display().to_string())
    );
    println!(
        "  {}",
        kv(
            "remediation log",
            &summary.remediation_path.display().to_string()
        )
    );
}
