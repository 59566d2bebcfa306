//! Application state wiring storage, localization, and the dispatcher.
//!
//! AppState holds the concrete instances used by the CLI, the line runner,
//! and the webhook server. The engine sees storage and transport only
//! through their boxed ports.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio_util::sync::CancellationToken;

use formbot_core::dispatch::{CallbackHandler, CancelHandler, Dispatcher, MessageHandler};
use formbot_core::locale::LanguageOptionsFetcher;
use formbot_core::transport::{BoxTransport, Replier};
use formbot_core::wizard::{BoxStateStorage, FormEngine, WizardRegistry};
use formbot_infra::config::{catalog_dir, database_url};
use formbot_infra::locale::CatalogLocalizer;
use formbot_infra::memory::InMemoryStateStorage;
use formbot_infra::sqlite::pool::DatabasePool;
use formbot_infra::sqlite::state::SqliteStateStorage;
use formbot_types::config::{AppConfig, StorageBackend};
use formbot_types::error::RepositoryError;

use crate::wizards::profile::ProfileHandler;

/// The configured state backend, kept concrete for maintenance tasks.
#[derive(Clone)]
pub enum StorageHandle {
    Sqlite(Arc<SqliteStateStorage>),
    Memory(Arc<InMemoryStateStorage>),
}

impl StorageHandle {
    pub async fn open(config: &AppConfig, data_dir: &Path) -> anyhow::Result<Self> {
        let ttl = Duration::from_secs(config.storage.state_ttl_secs);
        match config.storage.backend {
            StorageBackend::Sqlite => {
                let url = database_url(config, data_dir);
                let pool = DatabasePool::new(&url)
                    .await
                    .with_context(|| format!("failed to open state database {url}"))?;
                tracing::info!(%url, ttl_secs = ttl.as_secs(), "sqlite state storage ready");
                Ok(Self::Sqlite(Arc::new(SqliteStateStorage::new(pool, ttl))))
            }
            StorageBackend::Memory => {
                tracing::info!(ttl_secs = ttl.as_secs(), "in-memory state storage ready");
                Ok(Self::Memory(Arc::new(InMemoryStateStorage::new(ttl))))
            }
        }
    }

    pub fn boxed(&self) -> BoxStateStorage {
        match self {
            Self::Sqlite(s) => BoxStateStorage::new(Arc::clone(s)),
            Self::Memory(s) => BoxStateStorage::new(Arc::clone(s)),
        }
    }

    /// Removes expired states, returning how many were dropped.
    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        match self {
            Self::Sqlite(s) => s.purge_expired().await,
            Self::Memory(s) => Ok(s.purge_expired() as u64),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: StorageHandle,
    pub dispatcher: Arc<Dispatcher>,
    /// Cancelled when the process starts shutting down.
    pub stopping: CancellationToken,
}

impl AppState {
    /// Opens storage, loads catalogs, and registers the handlers.
    pub async fn init(
        config: AppConfig,
        data_dir: PathBuf,
        transport: BoxTransport,
    ) -> anyhow::Result<Self> {
        let storage = StorageHandle::open(&config, &data_dir).await?;

        let localizer = CatalogLocalizer::load(
            &catalog_dir(&config, &data_dir),
            config.localization.default_locale.clone(),
        )
        .await;
        let mut supported = localizer.locales();
        if !supported.contains(&config.localization.default_locale) {
            supported.push(config.localization.default_locale.clone());
        }
        let options = LanguageOptionsFetcher::new(
            config.localization.default_locale.clone(),
            supported,
        );

        let replier = Replier::new(Arc::new(transport), config.keyboard.buttons_per_row);
        let engine = Arc::new(FormEngine::new(
            Arc::new(WizardRegistry::new()),
            Arc::new(storage.boxed()),
            replier,
        ));

        let message_handlers: Vec<Arc<dyn MessageHandler>> = vec![
            Arc::new(CancelHandler::new(Arc::clone(&engine))),
            Arc::new(ProfileHandler::new(Arc::clone(&engine))),
        ];
        let callback_handlers: Vec<Arc<dyn CallbackHandler>> = Vec::new();

        let dispatcher = Dispatcher::new(
            engine,
            message_handlers,
            callback_handlers,
            Arc::new(options),
            Arc::new(localizer),
        );

        Ok(Self {
            config: Arc::new(config),
            storage,
            dispatcher: Arc::new(dispatcher),
            stopping: CancellationToken::new(),
        })
    }

    /// Drains in-flight updates and releases storage.
    pub async fn shutdown(&self) {
        self.stopping.cancel();
        self.dispatcher.shutdown().await;
        self.dispatcher.engine().storage().close().await;
    }
}
