//! Process wiring.
//!
//! Builds the shared [`ClientState`] from [`GatewaySettings`], choosing the
//! PostgreSQL adapters when a database URL is configured and the in-memory
//! document store otherwise. The identity provider, catalog source and payment
//! confirmation are always the in-process adapters.

use std::sync::Arc;

use mockable::Clock;
use tracing::info;

use crate::GatewaySettings;
use crate::domain::ports::{FoundingCounterStore, ProfileRepository};
use crate::domain::{
    ActivationService, CatalogSyncChannel, FoundingCounterAllocator, QualificationRecorder, View,
};
use crate::inbound::client::{ClientState, MemberClient};
use crate::outbound::memory::{MemoryCatalog, MemoryDocumentStore, MemoryIdentityDirectory};
use crate::outbound::payment::SimulatedPaymentGateway;
use crate::outbound::persistence::{
    DbPool, DieselFoundingCounterStore, DieselProfileRepository, MigrationError, PoolConfig,
    PoolError, run_migrations,
};

/// Failure while wiring storage.
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    /// The connection pool could not be built.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// Migrations failed.
    #[error(transparent)]
    Migrations(#[from] MigrationError),
    /// The blocking migration task did not complete.
    #[error("migration task failed: {0}")]
    MigrationTask(String),
}

/// Storage behind the profile and counter ports.
#[derive(Clone)]
pub struct Storage {
    /// Member profiles.
    pub profiles: Arc<dyn ProfileRepository>,
    /// Founding counter document.
    pub counter: Arc<dyn FoundingCounterStore>,
}

impl Storage {
    /// One shared in-memory document store for both ports.
    pub fn in_memory(documents: &Arc<MemoryDocumentStore>) -> Self {
        Self {
            profiles: Arc::clone(documents) as Arc<dyn ProfileRepository>,
            counter: Arc::clone(documents) as Arc<dyn FoundingCounterStore>,
        }
    }

    /// PostgreSQL storage; pending migrations are applied first.
    pub async fn postgres(database_url: &str) -> Result<Self, WiringError> {
        let url = database_url.to_owned();
        tokio::task::spawn_blocking(move || run_migrations(&url))
            .await
            .map_err(|err| WiringError::MigrationTask(err.to_string()))??;

        let pool = DbPool::new(PoolConfig::new(database_url)).await?;
        Ok(Self {
            profiles: Arc::new(DieselProfileRepository::new(pool.clone())),
            counter: Arc::new(DieselFoundingCounterStore::new(pool)),
        })
    }
}

/// A wired gateway process.
pub struct Gateway {
    state: ClientState,
    identities: Arc<MemoryIdentityDirectory>,
    catalog: Arc<MemoryCatalog>,
    documents: Option<Arc<MemoryDocumentStore>>,
}

impl Gateway {
    /// Gateway over a fresh in-memory document store.
    pub fn in_memory(settings: &GatewaySettings, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let documents = Arc::new(MemoryDocumentStore::new());
        let mut gateway = Self::with_storage(settings, clock, Storage::in_memory(&documents));
        gateway.documents = Some(documents);
        gateway
    }

    /// Gateway using PostgreSQL when `database_url` is set, memory otherwise.
    pub async fn from_settings(
        settings: &GatewaySettings,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self, WiringError> {
        match settings.database_url.as_deref() {
            Some(url) => {
                let storage = Storage::postgres(url).await?;
                info!("gateway wired to PostgreSQL");
                Ok(Self::with_storage(settings, clock, storage))
            }
            None => {
                info!("gateway wired to in-memory storage");
                Ok(Self::in_memory(settings, clock))
            }
        }
    }

    /// Gateway over explicit storage.
    pub fn with_storage(
        settings: &GatewaySettings,
        clock: Arc<dyn Clock + Send + Sync>,
        storage: Storage,
    ) -> Self {
        let catalog = Arc::new(MemoryCatalog::new(Arc::clone(&clock)));
        let allocator = Arc::new(FoundingCounterAllocator::new(
            storage.counter,
            Arc::clone(&clock),
            settings.allocator_config(),
        ));
        let activation = Arc::new(ActivationService::new(
            Arc::clone(&storage.profiles),
            Arc::new(SimulatedPaymentGateway::new(settings.payment_delay())),
            Arc::clone(&allocator),
            Arc::clone(&clock),
        ));
        let channel = Arc::new(CatalogSyncChannel::new(
            Arc::clone(&catalog) as _,
            Arc::clone(&catalog) as _,
            Arc::clone(&clock),
            settings.sync_backoff(),
        ));
        let qualification = QualificationRecorder::new(Arc::clone(&storage.profiles), Arc::clone(&clock));

        Self {
            state: ClientState {
                profiles: storage.profiles,
                activation,
                allocator,
                catalog: channel,
                qualification,
                display: settings.display_policy(),
                clock,
            },
            identities: MemoryIdentityDirectory::new(),
            catalog,
            documents: None,
        }
    }

    /// Connect a new signed-out client starting at `initial`.
    pub async fn client(&self, initial: View) -> MemberClient {
        MemberClient::connect(
            self.state.clone(),
            Arc::new(self.identities.client()),
            initial,
        )
        .await
    }

    /// Shared client state.
    pub fn state(&self) -> &ClientState {
        &self.state
    }

    /// Account registry shared by every client.
    pub fn identities(&self) -> &Arc<MemoryIdentityDirectory> {
        &self.identities
    }

    /// Curated catalog feed.
    pub fn catalog(&self) -> &Arc<MemoryCatalog> {
        &self.catalog
    }

    /// In-memory document store, when that storage is in use.
    pub fn documents(&self) -> Option<&Arc<MemoryDocumentStore>> {
        self.documents.as_ref()
    }
}
