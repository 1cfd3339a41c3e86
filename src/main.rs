//! Native-Balance Sweep Agent
//!
//! Main entry point. Loads endpoint configuration, starts the control
//! server, registers any startup keys and runs until SIGINT/SIGTERM.
//!
//! Architecture:
//! - One AccountRegistry, one endpoint pair per account slot
//! - Per account: one NetworkSession per network (Ethereum, BSC)
//! - Per session: WS subscribe_blocks() → balance → SweepEngine
//! - Outcomes → NotificationLog (control surface) + optional Discord webhook
//!
//! Created: 2026-10-16

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use std::sync::Arc;
use sweep_agent::chain::AlloyConnector;
use sweep_agent::config::{load_config, load_config_from_file};
use sweep_agent::control::{create_control_server, ControlState};
use sweep_agent::notify::{FanoutSink, NotificationLog, OutcomeSink, WebhookSink};
use sweep_agent::session::{ReconnectPolicy, SessionRuntime};
use sweep_agent::{AccountRegistry, SweepEngine};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Native-balance sweep agent - Multi-Chain (Ethereum, BSC)
#[derive(Parser)]
#[command(name = "sweep-agent")]
struct Args {
    /// Env file to load instead of ./.env
    #[arg(long)]
    env_file: Option<String>,

    /// Control server bind address (overrides CONTROL_BIND)
    #[arg(long)]
    bind: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }

    std::panic::set_hook(Box::new(|panic_info| {
        error!("Panic: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    info!("===========================================");
    info!("   Native-Balance Sweep Agent");
    info!("   Ethereum + BSC, WS block subscriptions");
    info!("===========================================");

    let config = match &args.env_file {
        Some(path) => load_config_from_file(path)?,
        None => load_config()?,
    };
    let bind = args.bind.clone().unwrap_or_else(|| config.control_bind.clone());

    info!("Destination: {}", config.destination);
    info!("Account capacity: {}", config.capacity());

    // Outcome sinks: in-memory log always, Discord when configured
    let log = Arc::new(NotificationLog::new());
    let mut sinks: Vec<Arc<dyn OutcomeSink>> = vec![log.clone()];
    if let Some(url) = &config.discord_webhook {
        info!("Discord webhook alerts enabled");
        sinks.push(Arc::new(WebhookSink::new(url.clone())));
    }
    let sink: Arc<dyn OutcomeSink> = Arc::new(FanoutSink::new(sinks));

    let engine = Arc::new(SweepEngine::new(config.destination, sink.clone()));
    let runtime = SessionRuntime {
        connector: Arc::new(AlloyConnector),
        handler: engine,
        sink,
        reconnect: ReconnectPolicy::default(),
    };
    let registry = Arc::new(AccountRegistry::new(
        config.destination,
        config.endpoint_pairs.clone(),
        runtime,
    ));
    registry.announce_capacity();

    for key in &config.startup_keys {
        match registry.register(key).await {
            Ok(account) => info!(
                "Startup account {} registered: {} ({} networks)",
                account.index,
                account.address,
                account.networks.len()
            ),
            Err(e) => warn!("Startup key rejected: {}", e),
        }
    }

    let server = create_control_server(
        &bind,
        ControlState {
            registry: registry.clone(),
            log,
            runtime: tokio::runtime::Handle::current(),
        },
    )
    .with_context(|| format!("Failed to bind control server on {}", bind))?;
    let server_handle = server.handle();
    info!("🌐 Control interface: http://{}", bind);

    // SIGINT / SIGTERM: stop every session, then the control server
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let signals_handle = signals.handle();
    let shutdown_registry = registry.clone();
    tokio::spawn(async move {
        if let Some(sig) = signals.next().await {
            info!("Received signal {} - stopping all monitoring", sig);
            let stopped = shutdown_registry.stop_all();
            info!("Stopped {} accounts", stopped);
            server_handle.stop(true).await;
        }
    });

    server.await.context("Control server failed")?;
    signals_handle.close();

    info!("Sweep agent stopped");
    Ok(())
}
