//! HTTP JSON interface.
//!
//! Handlers share one [`Storage`] behind a mutex. Every database call runs on
//! the blocking pool with the lock held for the duration of that call only,
//! so requests are serialized at the storage layer.

mod error;
mod extract;
mod handlers;

use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

use crate::error::Error;
use crate::storage::Storage;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    storage: Arc<Mutex<Storage>>,
    default_actor: Arc<str>,
}

impl AppState {
    /// Wrap an open storage.
    ///
    /// `default_actor` is recorded on status changes that do not name one.
    #[must_use]
    pub fn new(storage: Storage, default_actor: &str) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            default_actor: Arc::from(default_actor),
        }
    }

    /// Run `f` against the storage on the blocking pool.
    async fn with_storage<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Storage) -> crate::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        let result = tokio::task::spawn_blocking(move || {
            let mut guard = storage
                .lock()
                .map_err(|_| Error::internal("storage lock poisoned"))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| Error::internal(format!("storage task failed: {e}")))?;
        Ok(result?)
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    use handlers::{beds, locations, patients, reports};

    Router::new()
        .route("/api/health", get(reports::health))
        .route(
            "/api/locations",
            get(locations::list).post(locations::create),
        )
        .route("/api/locations/tree", get(locations::tree))
        .route(
            "/api/locations/{id}",
            get(locations::show)
                .put(locations::update)
                .delete(locations::deactivate),
        )
        .route("/api/locations/{id}/beds", get(locations::beds))
        .route("/api/statuses", get(reports::statuses))
        .route("/api/beds", post(beds::create))
        .route(
            "/api/beds/{id}",
            get(beds::show).put(beds::update).delete(beds::deactivate),
        )
        .route("/api/beds/{id}/status", post(beds::change_status))
        .route("/api/beds/{id}/history", get(beds::history))
        .route(
            "/api/patients",
            get(patients::search).post(patients::create),
        )
        .route(
            "/api/patients/{id}",
            get(patients::show)
                .put(patients::update)
                .delete(patients::deactivate),
        )
        .route("/api/statistics", get(reports::statistics))
        .route("/api/dashboard", get(reports::dashboard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
