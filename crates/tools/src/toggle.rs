use std::sync::Arc;

use favorites::{
    FavoriteError, FavoriteState, HttpSyncClient, InMemorySyncClient, MarkerEvent,
    MarkerStateStore, RemoteSyncClient, User,
};
use ingest::Point;
use tracing::{info, warn};

use crate::config::EngineConfig;

/// The configured favorites store: HTTP when `sync_url` is set, otherwise an
/// empty in-memory table.
pub fn remote_from_config(config: &EngineConfig) -> Arc<dyn RemoteSyncClient> {
    match &config.sync_url {
        Some(url) => {
            let mut client = HttpSyncClient::new(url);
            if let Some(key) = &config.sync_api_key {
                client = client.with_api_key(key.clone());
            }
            info!(table = client.table_url(), "syncing favorites over HTTP");
            Arc::new(client)
        }
        None => Arc::new(InMemorySyncClient::new()),
    }
}

/// Outcome of one toggle in [`toggle_repeatedly`].
pub type ToggleResult = Result<FavoriteState, FavoriteError>;

/// Toggles `point` `times` times in a row, each awaiting the previous one, and
/// returns every outcome. Sync failures are also logged from the store's event
/// stream.
pub async fn toggle_repeatedly(
    remote: Arc<dyn RemoteSyncClient>,
    user: Option<User>,
    point: &Point,
    times: u32,
) -> Vec<ToggleResult> {
    let store = MarkerStateStore::new(remote);
    let mut events = store.subscribe();

    if let Some(user) = &user {
        if let Err(e) = store.hydrate(user).await {
            warn!(error = %e, "could not hydrate favorites");
        }
        store.set_active_user(Some(user.clone()));
    }
    info!(point_id = %point.id, style = ?store.marker_style(point), "before toggling");

    let mut results = Vec::with_capacity(times as usize);
    for _ in 0..times {
        results.push(store.toggle_favorite(point, user.as_ref()).await);
    }

    while let Ok(event) = events.try_recv() {
        if let MarkerEvent::SyncFailed { point_id, message, .. } = event {
            warn!(%point_id, %message, "favorite not saved");
        }
    }
    info!(point_id = %point.id, style = ?store.marker_style(point), "after toggling");
    results
}
