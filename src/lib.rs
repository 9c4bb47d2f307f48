pub mod config;
pub mod controllers;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod validation;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use config::{AuthConfig, StoreBackend};
use middleware::AuthPolicy;
use models::TypeRegistry;
use services::events::EventService;
use store::{DocumentStore, MemoryDocumentStore, PgDocumentStore};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub events: EventService,
    pub policy: AuthPolicy,
    pub auth: AuthConfig,
}

impl AppState {
    pub async fn new(config: &config::Config) -> anyhow::Result<Arc<Self>> {
        let registry = Arc::new(TypeRegistry::with_event_types());
        log_registered_types(&registry);

        let store: Arc<dyn DocumentStore> = match config.store.backend {
            StoreBackend::Postgres => {
                let database = config
                    .store
                    .database
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("postgres backend needs database settings"))?;
                let store = PgDocumentStore::connect(database, registry).await?;
                info!("Database connected");
                store.run_migrations().await?;
                Arc::new(store)
            }
            StoreBackend::Memory => {
                info!("Using in-memory document store");
                Arc::new(MemoryDocumentStore::new(registry))
            }
        };

        if config.auth.accounts.is_empty() {
            tracing::warn!("AUTH_USERS is empty, every request will be rejected");
        }

        Ok(Self::with_store(store, config.auth.clone()))
    }

    pub fn with_store(store: Arc<dyn DocumentStore>, auth: AuthConfig) -> Arc<Self> {
        Arc::new(Self {
            events: EventService::new(store),
            policy: AuthPolicy::default(),
            auth,
        })
    }
}

fn log_registered_types(registry: &TypeRegistry) {
    if let Some(event) = registry.document_type(models::event::EVENT_DOC_TYPE) {
        info!(
            doc_type = event.name,
            label = event.labels.singular_name,
            supports = ?event.supports,
            "document type registered"
        );
    }
    if let Some(category) = registry.taxonomy(models::event::EVENT_CATEGORY_TAXONOMY) {
        info!(
            taxonomy = category.name,
            label = category.labels.singular_name,
            object_types = ?category.object_types,
            "taxonomy registered"
        );
    }
}

/// Route table, built once at startup.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Event API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .merge(controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
