//! netpulse - Network Health Monitoring CLI
//!
//! Probes infrastructure endpoints (HTTP/S, TCP, ICMP ping, LDAP/SMTP port
//! checks), classifies each against latency thresholds, and exits with a
//! status code automation can act on: 0 healthy, 1 degraded, 2 critical.

mod checker;
mod config;
mod model;
mod probe;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{default_endpoints, load_endpoints};
use model::HealthState;

#[derive(Parser)]
#[command(name = "netpulse")]
#[command(version)]
#[command(about = "Network health monitoring for infrastructure endpoints")]
struct Cli {
    /// JSON config file with endpoints to monitor
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output JSON file path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Quick check: write JSON output only, skip the console report
    #[arg(long)]
    quick: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    // Initialize logging
    let default_directive = if cli.verbose {
        "netpulse=debug"
    } else {
        "netpulse=info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_directive.parse()?),
        )
        .init();

    // Load endpoints
    let endpoints = match &cli.config {
        Some(path) => match load_endpoints(path) {
            Ok(endpoints) => {
                tracing::info!(
                    "Loaded {} endpoints from {}",
                    endpoints.len(),
                    path.display()
                );
                endpoints
            }
            Err(e) => {
                tracing::error!("Failed to load config: {}", e);
                return Ok(ExitCode::from(1));
            }
        },
        None => {
            let endpoints = default_endpoints();
            tracing::info!("Using {} default endpoints", endpoints.len());
            endpoints
        }
    };

    tracing::info!("Starting health checks on {} endpoints", endpoints.len());
    let results = checker::run_checks(&endpoints).await;

    for result in &results {
        match result.status {
            HealthState::Healthy => tracing::info!(
                "{}: HEALTHY ({:.2}ms)",
                result.name,
                result.response_time_ms.unwrap_or(0.0)
            ),
            HealthState::Warning | HealthState::Unknown => {
                tracing::warn!("{}: WARNING - {}", result.name, result.detail)
            }
            HealthState::Critical if result.critical => {
                tracing::error!("{}: CRITICAL - {}", result.name, result.detail)
            }
            HealthState::Critical => {
                tracing::error!("{}: DOWN - {}", result.name, result.detail)
            }
        }
    }

    let summary = checker::summarize(&results);
    tracing::info!(
        "Health check summary: {} healthy, {} warnings, {} critical failures, {} down",
        summary.healthy,
        summary.warnings,
        summary.critical,
        summary.down
    );

    // Render outputs
    let output = cli.output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "health-data-{}.json",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ))
    });
    match report::write_json(&output, &results, &summary) {
        Ok(()) => tracing::info!("JSON output saved: {}", output.display()),
        Err(e) => tracing::error!("Failed to write JSON output: {}", e),
    }

    if !cli.quick {
        print!("{}", report::render_console(&results, &summary));
    }

    match summary.overall {
        model::OverallStatus::Critical => {
            tracing::error!("CRITICAL: {} critical services down", summary.critical)
        }
        model::OverallStatus::Warning => {
            tracing::warn!("WARNING: services degraded")
        }
        model::OverallStatus::Healthy => tracing::info!("SUCCESS: All services healthy"),
    }

    Ok(ExitCode::from(summary.overall.exit_code()))
}
