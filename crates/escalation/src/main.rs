//! Escalation monitor CLI.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use escalation_monitor::{
    classify, Dispatcher, LiveSource, Monitor, MonitorConfig, SimulatedSource, SourceKind, Ticket,
    TicketSource,
};

/// Escalation monitor - route new escalation tickets to the owning team's chat.
#[derive(Parser)]
#[command(name = "escalation-monitor")]
#[command(about = "Alert product teams about new escalation tickets")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML config file (environment variables take precedence)
    #[arg(long, global = true, env = "ESCALATION_CONFIG")]
    config: Option<PathBuf>,

    /// Override the ticket source (live or simulated)
    #[arg(long, global = true)]
    source: Option<SourceKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one monitoring cycle, or keep polling with --continuous
    Run {
        /// Poll forever, sleeping this many seconds between cycles
        /// (defaults to the configured interval)
        #[arg(long, value_name = "INTERVAL_SECS")]
        continuous: Option<Option<u64>>,
    },

    /// Post a test message to every configured webhook
    TestWebhooks,

    /// Show which service a ticket would be routed to
    Classify {
        /// Ticket title
        #[arg(long)]
        title: String,

        /// Platform field
        #[arg(long, default_value = "")]
        platform: String,

        /// Ticket description
        #[arg(long, default_value = "")]
        description: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("escalation_monitor=debug,notify=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("escalation_monitor=info,notify=info,warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Classify {
            title,
            platform,
            description,
        } => {
            let ticket = Ticket::new("", title)
                .with_platform(platform)
                .with_description(description);
            let service = classify(&ticket);
            println!("{} ({})", service.as_str().bold(), service.display_name());
            Ok(())
        }
        Commands::TestWebhooks => {
            let config = load_config(cli.config.as_deref(), cli.source)?;
            test_webhooks(&config).await
        }
        Commands::Run { continuous } => {
            let config = load_config(cli.config.as_deref(), cli.source)?;
            run(config, continuous).await
        }
    }
}

fn load_config(path: Option<&Path>, source: Option<SourceKind>) -> Result<MonitorConfig> {
    MonitorConfig::load(path, source).context("Failed to load configuration")
}

fn build_source(config: &MonitorConfig) -> Result<Box<dyn TicketSource>> {
    match config.source {
        SourceKind::Live => {
            let source =
                LiveSource::from_config(config).context("Failed to create tracker client")?;
            Ok(Box::new(source))
        }
        SourceKind::Simulated => {
            warn!("Using simulated tickets; no tracker will be queried");
            Ok(Box::new(SimulatedSource::new()))
        }
    }
}

async fn run(config: MonitorConfig, continuous: Option<Option<u64>>) -> Result<()> {
    let source = build_source(&config)?;
    let dispatcher = Dispatcher::from_config(&config.webhooks, config.request_timeout)
        .context("Failed to create webhook channels")?;

    let services: Vec<_> = dispatcher.services().collect();
    info!(
        source = %config.source,
        query_id = %config.query_id,
        project = %config.project,
        services = ?services,
        "Escalation monitor starting"
    );

    let mut monitor = Monitor::new(source, dispatcher).with_policy(config.seen_policy);

    let Some(interval) = continuous else {
        let summary = monitor.run_once().await.context("Monitoring cycle failed")?;
        println!("{summary}");
        return Ok(());
    };

    let interval = match interval {
        Some(0) => bail!("--continuous interval must be greater than zero"),
        Some(secs) => std::time::Duration::from_secs(secs),
        None => config.interval,
    };

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());
    let cycles = monitor.run_continuous(interval, shutdown).await;
    info!(cycles, "Escalation monitor stopped");
    Ok(())
}

async fn test_webhooks(config: &MonitorConfig) -> Result<()> {
    let dispatcher = Dispatcher::from_config(&config.webhooks, config.request_timeout)
        .context("Failed to create webhook channels")?;

    println!("{}", "Testing webhooks...".bold());
    let results = dispatcher.test_webhooks().await;
    let mut failed = 0;
    for (service, result) in &results {
        match result {
            Ok(()) => println!("  {} {}", "✓".green(), service.display_name()),
            Err(e) => {
                failed += 1;
                println!("  {} {}: {}", "✗".red(), service.display_name(), e);
            }
        }
    }
    for service in config.webhooks.missing() {
        println!(
            "  {} {}: not configured",
            "-".yellow(),
            service.display_name()
        );
    }

    if failed > 0 {
        bail!("{failed} of {} webhooks failed", results.len());
    }
    println!("{}", "All configured webhooks are working".green());
    Ok(())
}

/// Cancel `token` on SIGINT or SIGTERM.
fn spawn_signal_listener(token: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown requested, finishing current cycle");
        token.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            tokio::signal::ctrl_c().await.ok();
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    tokio::signal::ctrl_c().await.ok();
}
