//! Store selection and the engine services shared by every handler.

use std::ops::Deref;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use incidents_infra::services::Services;
use incidents_infra::store::{InMemoryStore, SqliteStore, Store};

use crate::config::ApiConfig;

/// Which store backs the running API.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Backend {
    InMemory,
    Sqlite,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::InMemory => "in_memory",
            Backend::Sqlite => "sqlite",
        }
    }
}

/// Engine services over a type-erased store.
pub struct AppServices {
    backend: Backend,
    services: Services<dyn Store>,
}

impl AppServices {
    pub fn new(backend: Backend, store: Arc<dyn Store>) -> Self {
        Self {
            backend,
            services: Services::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Backend::InMemory, Arc::new(InMemoryStore::new()))
    }

    /// Connect to `url` and bring the schema up to date.
    pub async fn sqlite(url: &str) -> anyhow::Result<Self> {
        let store = SqliteStore::connect(url)
            .await
            .with_context(|| format!("failed to open database {url}"))?;
        store.migrate().await.context("schema migration failed")?;
        Ok(Self::new(Backend::Sqlite, Arc::new(store)))
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }
}

impl Deref for AppServices {
    type Target = Services<dyn Store>;

    fn deref(&self) -> &Self::Target {
        &self.services
    }
}

/// SQLite when `DATABASE_URL` is set, otherwise the in-memory store.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    match &config.database_url {
        Some(url) => {
            let services = AppServices::sqlite(url).await?;
            info!(backend = "sqlite", "store ready");
            Ok(services)
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory store (data is lost on exit)");
            Ok(AppServices::in_memory())
        }
    }
}
