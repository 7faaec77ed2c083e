use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use pulsewatch::{
    actors::{
        HubHandle, JobContext, JobRegistry, ResultSink,
        retention::{CLEANUP_INTERVAL, spawn_retention},
    },
    api::{ApiState, spawn_api_server},
    config::{Config, read_config_file},
    monitors::{ConcurrencyLimiter, ProbeExecutor},
    service::MonitorService,
    storage,
    util::get_log_level,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

/// Grace period for in-flight probes on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Endpoint health scheduler")]
struct Args {
    /// Config file (JSON); defaults are used when omitted
    #[arg(short, long)]
    file: Option<String>,
}

fn init() {
    let level = LevelFilter::from_level(get_log_level());
    let filter = filter::Targets::new().with_targets(vec![
        ("pulsewatch", level),
        ("tower_http", LevelFilter::INFO),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();

    let args = Args::parse();
    trace!("started with args: {args:?}");

    let mut config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };
    config.apply_env_overrides();
    config.validate()?;

    let shutdown = CancellationToken::new();

    let storage = storage::open(&config.storage).await?;
    let hub = HubHandle::spawn(config.websocket.hub_buffer, shutdown.child_token());

    let ctx = JobContext {
        executor: ProbeExecutor::new()?,
        limiter: ConcurrencyLimiter::new(config.monitoring.max_concurrent_checks),
        sink: ResultSink::new(
            Arc::clone(&storage),
            hub.clone(),
            config.monitoring.uptime_window(),
        ),
    };
    let registry = JobRegistry::new(ctx);
    let service = MonitorService::new(
        Arc::clone(&storage),
        registry.clone(),
        config.monitoring.clone(),
    );

    let started = service.start_monitoring().await?;
    info!("started {} monitor jobs", started);

    let retention = spawn_retention(
        Arc::clone(&storage),
        config.storage.retention_days(),
        CLEANUP_INTERVAL,
        shutdown.child_token(),
    );

    let state = ApiState::new(service, hub, config.websocket.clone());
    let (addr, server) = spawn_api_server(&config.server, state, shutdown.child_token()).await?;
    info!("pulsewatch running on {}", addr);

    wait_for_signal().await;
    info!("shutting down");

    shutdown.cancel();

    if tokio::time::timeout(SHUTDOWN_GRACE, registry.shutdown())
        .await
        .is_err()
    {
        warn!("monitor jobs did not stop within {:?}", SHUTDOWN_GRACE);
    }

    if let Err(e) = server.await {
        error!("API server task failed: {e}");
    }
    if let Err(e) = retention.await {
        error!("retention task failed: {e}");
    }

    storage.close().await?;
    info!("shutdown complete");

    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
