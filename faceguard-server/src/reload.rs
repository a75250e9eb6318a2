//! Periodic index reload.
//!
//! The offline builder replaces the persisted index wholesale. The server
//! polls the store and publishes a new generation when its id changes; a
//! request in flight keeps the generation it started with. Store reads and
//! decoding run on the blocking pool.

use std::sync::Arc;
use std::time::Duration;

use faceguard_core::{IdentityIndex, IndexStore};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Reload `collection` from `store` every `interval`.
pub fn spawn_index_reloader(
    index: Arc<IdentityIndex>,
    store: Arc<dyn IndexStore>,
    collection: String,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; startup already loaded the index.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            reload_once(&index, &store, &collection).await;
        }
    })
}

/// One reload attempt. Failures keep the current generation.
pub async fn reload_once(
    index: &Arc<IdentityIndex>,
    store: &Arc<dyn IndexStore>,
    collection: &str,
) -> bool {
    let result = {
        let index = Arc::clone(index);
        let store = Arc::clone(store);
        let collection = collection.to_string();
        tokio::task::spawn_blocking(move || index.reload_from(store.as_ref(), &collection)).await
    };

    match result {
        Ok(Ok(true)) => {
            info!(collection, "Identity index reloaded");
            true
        }
        Ok(Ok(false)) => false,
        Ok(Err(e)) => {
            warn!(collection, error = %e, "Identity index reload failed, keeping current generation");
            false
        }
        Err(e) => {
            warn!(collection, error = %e, "Identity index reload task failed");
            false
        }
    }
}
