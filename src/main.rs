use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use hallsched::config::Config;
use hallsched::http::{AppState, router};
use hallsched::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    hallsched::observability::init(config.metrics_port);

    let scheduler = match &config.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            Scheduler::open(&dir.join("hallsched.wal"))?
        }
        None => {
            warn!("HALLS_DATA_DIR is empty, bookings will not survive a restart");
            Scheduler::in_memory()
        }
    };
    let scheduler = Arc::new(scheduler);

    if config.seed {
        let created = scheduler.seed_default_halls().await?;
        info!("seeded {created} default halls");
    }

    if config.data_dir.is_some() && config.compact_threshold > 0 {
        tokio::spawn(hallsched::compactor::run_compactor(
            scheduler.clone(),
            config.compact_threshold,
        ));
    }

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("hallsched listening on {addr}");
    info!(
        "  data_dir: {}",
        config
            .data_dir
            .as_ref()
            .map_or("in-memory".to_string(), |d| d.display().to_string())
    );
    info!("  halls: {}, bookings: {}", scheduler.hall_count(), scheduler.booking_count());
    info!("  max_connections: {}", config.max_connections);
    info!("  tokens: {}", config.tokens.len());
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let state = AppState::new(scheduler, config.tokens, config.max_connections);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown complete");
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM; axum then drains in-flight requests.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to register SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received, draining requests");
}
