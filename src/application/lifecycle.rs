use crate::application::DependencyContainer;
use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// Manages application lifecycle events and graceful shutdown
pub struct ApplicationLifecycle {
    container: Arc<DependencyContainer>,
}

impl ApplicationLifecycle {
    pub fn new(container: Arc<DependencyContainer>) -> Self {
        Self { container }
    }

    /// Validate config, bring the schema up to date and probe dependencies
    pub async fn initialize(&self) -> Result<()> {
        info!("Initializing application...");

        self.container.config.validate()?;

        info!("Running database migrations...");
        self.container.entry_store.migrate().await?;

        if !self.container.health_check().await? {
            return Err(anyhow::anyhow!("Initial health check failed"));
        }

        info!("Application initialized");
        Ok(())
    }

    /// Stop the insight worker; waits at most the configured stop timeout
    pub async fn shutdown(&self) -> Result<()> {
        info!("Initiating graceful shutdown...");
        self.container.processor.stop().await;
        self.container.db_pool.close().await;
        info!("Graceful shutdown completed");
        Ok(())
    }

    /// Wait for Ctrl+C or SIGTERM
    pub async fn wait_for_shutdown(&self) {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    error!("Failed to install terminate signal handler: {}", e);
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C"),
            _ = terminate => info!("Received SIGTERM"),
        }
    }
}
