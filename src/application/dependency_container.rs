use crate::{
    insights::{InsightGenerator, InsightProcessor, InsightService, OpenAiGenerator},
    journal::{connection::create_pool, EntryStore, PgEntryStore},
    Config,
};
use anyhow::{Context, Result};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

/// Dependency injection container for the application
pub struct DependencyContainer {
    pub config: Config,

    // Database layer
    pub db_pool: PgPool,
    pub entry_store: Arc<PgEntryStore>,

    // Insight layer
    pub generator: Arc<OpenAiGenerator>,
    pub processor: InsightProcessor,
    pub service: InsightService,
}

impl DependencyContainer {
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing dependency container...");

        let db_pool = create_pool(&config.database_url, config.operational.max_db_connections)
            .await
            .with_context(|| format!("Could not connect to {}", config.safe_database_url()))?;
        let entry_store = Arc::new(PgEntryStore::new(db_pool.clone()));

        let generator = Arc::new(Self::create_generator(&config)?);
        if !generator.is_available() {
            warn!("OPENAI_API_KEY not set; entries will be marked failed until it is configured");
        }

        let store: Arc<dyn EntryStore> = entry_store.clone();
        let insight_generator: Arc<dyn InsightGenerator> = generator.clone();
        let processor = InsightProcessor::new(store, insight_generator, config.processor_config());
        let service = InsightService::new(processor.clone());

        info!("Dependency container ready");
        Ok(Self {
            config,
            db_pool,
            entry_store,
            generator,
            processor,
            service,
        })
    }

    pub fn create_generator(config: &Config) -> Result<OpenAiGenerator> {
        OpenAiGenerator::new(config.generator_config())
            .context("Failed to initialize AI insight generator")
    }

    pub async fn health_check(&self) -> Result<bool> {
        match self.entry_store.health_check().await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                Ok(false)
            }
        }
    }
}
