use std::sync::Arc;

use jsonvault_store::{SqliteStorage, Storage};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// jsonvault HTTP server.
pub struct VaultServer {
    config: ServerConfig,
    storage: Arc<dyn Storage>,
}

impl VaultServer {
    pub fn new(config: ServerConfig, storage: Arc<dyn Storage>) -> Self {
        Self { config, storage }
    }

    /// Open the SQLite store named by the config, check that a pooled
    /// connection works, and create the schema when `init_db` is set.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let sqlite = SqliteStorage::open(&config.store)
            .map_err(|e| ServerError::Startup(e.to_string()))?;
        sqlite
            .ping()
            .map_err(|e| ServerError::Startup(e.to_string()))?;
        tracing::info!(path = %config.store.path.display(), "database connected");

        if config.init_db {
            tracing::info!("initializing database schema");
            sqlite.init_schema()?;
        } else if !sqlite.schema_present()? {
            tracing::warn!("schema not found; start with init_db enabled or run `jsonvault init-db`");
        }

        Ok(Self::new(config, Arc::new(sqlite)))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        let state = AppState::new(self.storage.clone(), self.config.environment);
        build_router(state, self.config.max_body_bytes)
    }

    /// Serve until Ctrl-C or SIGTERM.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        let addr = listener.local_addr()?;
        tracing::info!("jsonvault server listening on {addr}");
        tracing::info!("health check: http://{addr}/api/health");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("shutting down gracefully"),
        _ = terminate => tracing::info!("terminated"),
    }
}
