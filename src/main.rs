use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chairtime::api::{self, AppState, JwtVerifier};
use chairtime::clock::SystemClock;
use chairtime::config::Config;
use chairtime::engine::Engine;
use chairtime::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chairtime=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();
    chairtime::observability::init(config.metrics_port)?;

    std::fs::create_dir_all(&config.data_dir)?;
    let engine = Arc::new(Engine::new(config.wal_path())?);

    let scheduler = Arc::new(Scheduler::new(
        engine.clone(),
        Arc::new(SystemClock),
        config.storage_timeout,
    ));
    if config.seed && scheduler.seed_defaults().await? {
        info!("empty store seeded with defaults");
    }

    tokio::spawn(chairtime::compactor::run_compactor(
        engine.clone(),
        config.compact_threshold,
    ));

    let state = AppState {
        scheduler,
        verifier: Arc::new(JwtVerifier::new(&config.jwt_secret)),
        booking_requires_login: config.booking_requires_login,
    };
    let app = api::router(state);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("chairtime listening on {addr}");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  storage_timeout: {:?}", config.storage_timeout);
    info!("  booking_requires_login: {}", config.booking_requires_login);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("chairtime stopped");
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM. In-flight requests drain before exit.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("failed to register SIGTERM handler: {e}");
                ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }
    info!("shutdown signal received, draining requests");
}
