//! HTTP server wiring

use super::api::build_app;
use super::state::AppState;
use anyhow::{Context, Result};
use channeld_core::config::{ServerConfig, StoreBackend, StoreConfig};
use channeld_core::{ChannelService, MemoryChannelStore, SqliteChannelStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Open the channel store selected by configuration
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn ChannelService>> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory channel store");
            Ok(Arc::new(MemoryChannelStore::new()))
        }
        StoreBackend::Sqlite => {
            std::fs::create_dir_all(&config.data_dir).with_context(|| {
                format!("Failed to create data dir {}", config.data_dir.display())
            })?;
            let path = config.data_dir.join("channels.db");
            info!(path = %path.display(), "Using SQLite channel store");

            let store =
                SqliteChannelStore::open(&path, config.pool_size, config.connection_timeout)?;
            Ok(Arc::new(store))
        }
    }
}

pub struct ChannelServer {
    state: AppState,
    config: ServerConfig,
}

impl ChannelServer {
    pub fn new(channels: Arc<dyn ChannelService>, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(channels),
            config,
        }
    }

    /// Bind and serve until Ctrl-C or SIGTERM
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_address)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.bind_address))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let app = build_app(self.state, self.config.max_body_bytes);

        info!("Channel API listening on {}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Channel API stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    info!("Shutdown signal received");
}
