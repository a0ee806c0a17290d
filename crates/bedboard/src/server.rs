//! Running the HTTP server.

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api::{router, AppState};
use crate::config::Config;
use crate::error::Result;
use crate::seed::seed_statuses;
use crate::storage::Storage;

/// Serve the API until Ctrl-C.
///
/// Seeds the default status catalogue first when the configuration asks for
/// it.
///
/// # Errors
///
/// Returns an error if seeding fails, the address cannot be bound or the
/// server stops abnormally.
pub async fn serve(config: &Config, storage: Storage) -> Result<()> {
    if config.database.seed_statuses {
        seed_statuses(&storage)?;
    }

    let addr = config.bind_address()?;
    let state = AppState::new(storage, &config.workflow.default_actor);
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
