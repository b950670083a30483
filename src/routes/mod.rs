//! HTTP gateway (EMBP): each sibling module exports a subrouter over
//! [`AppState`] and this file merges them.

use std::sync::Arc;

use axum::Router;
use tokio::sync::Mutex;

use crate::job::IngestionJob;
use crate::models::Source;
use crate::provider::Provider;
use crate::store::ReadingStore;
use crate::Config;

mod backfill;
mod coverage;
mod error;
mod health;
mod ingestion;
mod readings;

pub use error::ApiError;

// ---

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReadingStore>,
    pub providers: Vec<Arc<dyn Provider>>,
    pub config: Arc<Config>,
    /// The ingestion job, when one has been started over HTTP.
    pub job: Arc<Mutex<Option<IngestionJob>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn ReadingStore>, providers: Vec<Arc<dyn Provider>>, config: Config) -> Self {
        // ---
        Self {
            store,
            providers,
            config: Arc::new(config),
            job: Arc::new(Mutex::new(None)),
        }
    }

    /// Registered provider feeding `source`, if any.
    pub fn provider_for(&self, source: Source) -> Option<Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.source() == source).cloned()
    }
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(readings::router())
        .merge(coverage::router())
        .merge(backfill::router())
        .merge(ingestion::router())
        .merge(health::router())
        .with_state(state)
}
