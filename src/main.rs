mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use tracing::{error, info};

use chainprobe::metrics::MetricsRegistry;
use chainprobe::runner::{RequestSequence, Scheduler};
use chainprobe::server::{self, AppState};
use chainprobe::status::StatusAggregator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志系统
    chainprobe::logger::init_logger(&cli.log_level, cli.log_format);

    let metrics = Arc::new(MetricsRegistry::new());
    let status = StatusAggregator::new();
    let sequence = RequestSequence::load_or_empty(&cli.targets, metrics.as_ref());

    let addr = cli.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "Status and metrics listening");

    let app = server::router(AppState {
        status: status.clone(),
        metrics: metrics.clone(),
    });
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    let scheduler = Scheduler::new(cli.scheduler_config(), sequence, status, metrics);

    tokio::select! {
        finished = scheduler.run() => {
            if let Some(worker) = finished {
                info!(worker, "Repeat limit reached, exiting");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C, exiting");
        }
    }

    Ok(())
}
