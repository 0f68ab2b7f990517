//! upornot - ICMP liveness and latency monitor.
//!
//! Pings each configured host on a fixed interval, keeps the last few dozen
//! results per host in memory, and serves health summaries over HTTP.

mod config;
mod probe;
mod scheduler;
mod store;
mod web;

use config::ServerConfig;
use probe::{IcmpDialer, Prober};
use scheduler::Scheduler;
use store::{Monitor, Target};
use web::Server;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("upornot=info".parse()?))
        .init();

    let cfg = ServerConfig::load();
    tracing::info!(
        "Starting upornot: {} targets, interval {:?}, timeout {:?}",
        cfg.targets.len(),
        cfg.interval,
        cfg.timeout
    );

    let monitors: Vec<Arc<Monitor>> = cfg
        .targets
        .iter()
        .map(|address| Arc::new(Monitor::new(Target::new(address.as_str(), cfg.interval))))
        .collect();

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let prober = Arc::new(Prober::new(IcmpDialer, cfg.timeout));
    let scheduler = Scheduler::new(prober, monitors.clone());
    let mut loops = scheduler.start(&cancel);

    let server = Server::new(&cfg, monitors);
    if let Err(e) = server.start(cancel.clone()).await {
        tracing::error!("HTTP server failed: {}", e);
        std::process::exit(1);
    }

    // The server only returns cleanly after cancellation.
    while let Some(res) = loops.join_next().await {
        if let Err(e) = res {
            tracing::error!("Probe loop panicked: {}", e);
        }
    }

    Ok(())
}

/// Cancel `cancel` on SIGINT, SIGTERM or SIGQUIT.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::quit())) {
            (Ok(mut term), Ok(mut quit)) => {
                tokio::select! {
                    _ = term.recv() => {}
                    _ = quit.recv() => {}
                }
            }
            _ => {
                tracing::error!("Failed to install signal handlers");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, exiting"),
        _ = terminate => tracing::info!("Received terminate signal, exiting"),
    }

    cancel.cancel();
}
