//! Process setup and lifecycle
//!
//! Opens the main and audit pools, applies migrations, builds the
//! [`ServiceContext`] and keeps the retention sweep running until a shutdown
//! signal arrives.

use teambot_common::{AppConfig, AppError, AppResult};
use teambot_db::{create_pool, run_audit_migrations, run_migrations, PgPool};
use teambot_service::ServiceContext;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::sweep::spawn_retention_sweep;

/// Everything the bot needs while it is running
pub struct Runtime {
    pub context: ServiceContext,
    pool: PgPool,
    log_pool: PgPool,
}

impl Runtime {
    /// Close both pools, waiting for checked-out connections to return
    pub async fn close(self) {
        self.pool.close().await;
        self.log_pool.close().await;
        info!("Database pools closed");
    }
}

/// Translate the loaded settings into pool settings
pub fn pool_config(config: &teambot_common::DatabaseConfig) -> teambot_db::DatabaseConfig {
    teambot_db::DatabaseConfig {
        url: config.url.clone(),
        max_connections: config.max_connections,
        min_connections: config.min_connections,
        ..Default::default()
    }
}

/// Connect both stores, migrate them and build the service context
pub async fn connect(config: &AppConfig) -> AppResult<Runtime> {
    info!("Connecting to PostgreSQL...");
    let pool = create_pool(&pool_config(&config.database))
        .await
        .map_err(AppError::database)?;
    run_migrations(&pool)
        .await
        .map_err(|e| AppError::Migration(e.to_string()))?;

    info!("Connecting to the audit store...");
    let log_pool = create_pool(&pool_config(&config.log_database))
        .await
        .map_err(AppError::database)?;
    run_audit_migrations(&log_pool)
        .await
        .map_err(|e| AppError::Migration(e.to_string()))?;
    info!("PostgreSQL connections established");

    let context = ServiceContext::from_pools(pool.clone(), log_pool.clone(), config);
    Ok(Runtime {
        context,
        pool,
        log_pool,
    })
}

/// Run the bot until SIGINT or SIGTERM
pub async fn run(config: AppConfig) -> AppResult<()> {
    let runtime = connect(&config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweep = spawn_retention_sweep(runtime.context.clone(), config.audit.clone(), shutdown_rx);
    info!(
        retention_days = config.audit.retention_days,
        interval_secs = config.audit.sweep_interval().as_secs(),
        "Bot ready"
    );

    shutdown_signal().await;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweep.await {
        warn!(error = %e, "Retention sweep ended abnormally");
    }

    runtime.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
