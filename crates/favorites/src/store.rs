use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use foundation::PointId;
use ingest::{Point, PointKind};
use parking_lot::RwLock;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::error::FavoriteError;
use crate::remote::{FavoriteRecord, RemoteSyncClient};
use crate::state::{FavoriteState, MarkerEvent, MarkerStyle, SyncStatus};
use crate::user::{User, UserId};

const EVENT_CAPACITY: usize = 256;

type PairKey = (UserId, PointId);

/// Owner of every [`FavoriteState`].
///
/// Toggles on the same (user, point) pair run one at a time: a second toggle
/// waits for the first to settle and then re-reads remote state, so two quick
/// toggles produce one insert followed by one delete. Toggles on different
/// pairs do not wait on each other.
pub struct MarkerStateStore {
    remote: Arc<dyn RemoteSyncClient>,
    entries: RwLock<HashMap<PairKey, FavoriteState>>,
    toggles: DashMap<PairKey, Arc<Mutex<()>>>,
    active_user: RwLock<Option<User>>,
    events: broadcast::Sender<MarkerEvent>,
}

impl MarkerStateStore {
    pub fn new(remote: Arc<dyn RemoteSyncClient>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            remote,
            entries: RwLock::new(HashMap::new()),
            toggles: DashMap::new(),
            active_user: RwLock::new(None),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MarkerEvent> {
        self.events.subscribe()
    }

    pub fn set_active_user(&self, user: Option<User>) {
        *self.active_user.write() = user;
    }

    pub fn active_user(&self) -> Option<User> {
        self.active_user.read().clone()
    }

    pub fn get_favorite_state(&self, point_id: &PointId, user_id: &UserId) -> Option<FavoriteState> {
        self.entries
            .read()
            .get(&(user_id.clone(), point_id.clone()))
            .cloned()
    }

    pub fn is_favorited(&self, point_id: &PointId, user_id: &UserId) -> bool {
        self.get_favorite_state(point_id, user_id)
            .is_some_and(|s| s.is_favorited)
    }

    /// Icon for `point` as seen by the active user.
    pub fn marker_style(&self, point: &Point) -> MarkerStyle {
        let favorited = self
            .active_user
            .read()
            .as_ref()
            .is_some_and(|u| self.is_favorited(&point.id, &u.id));
        match (favorited, point.kind) {
            (true, _) => MarkerStyle::Favorite,
            (false, PointKind::Rack) => MarkerStyle::Rack,
            (false, PointKind::Sign) => MarkerStyle::Sign,
        }
    }

    /// Seeds `Synced` entries from the user's remote favorites list.
    ///
    /// The result is only a starting picture for rendering: toggles always
    /// re-read remote state. Entries with a toggle in flight are left alone;
    /// every other entry of `user` that is missing from the list is cleared.
    pub async fn hydrate(&self, user: &User) -> Result<usize, FavoriteError> {
        let rows = self
            .remote
            .select_favorites(&user.id)
            .await
            .map_err(|e| FavoriteError::SyncRead {
                message: e.to_string(),
            })?;
        let listed: HashSet<&PointId> = rows.iter().map(|r| &r.location_id).collect();

        let mut seeded = 0usize;
        let mut cleared = 0usize;
        {
            let mut entries = self.entries.write();
            for ((owner, point_id), state) in entries.iter_mut() {
                let stale = owner == &user.id
                    && state.is_favorited
                    && !state.sync_status.is_pending()
                    && !listed.contains(point_id);
                if stale {
                    state.is_favorited = false;
                    state.sync_status = SyncStatus::Synced;
                    cleared += 1;
                }
            }
            for row in &rows {
                let key = (user.id.clone(), row.location_id.clone());
                let in_flight = entries.get(&key).is_some_and(|s| s.sync_status.is_pending());
                if in_flight {
                    continue;
                }
                entries.insert(
                    key,
                    FavoriteState {
                        point_id: row.location_id.clone(),
                        is_favorited: true,
                        sync_status: SyncStatus::Synced,
                    },
                );
                seeded += 1;
            }
        }
        info!(user_id = %user.id, favorites = seeded, cleared, "hydrated favorites");
        Ok(seeded)
    }

    /// Flips the favorite flag of `point` for `user` and syncs it remotely.
    ///
    /// The new value is published before the remote write starts. If the write
    /// fails the previous value is restored, the entry is marked `Failed` and a
    /// [`MarkerEvent::SyncFailed`] is broadcast in addition to the returned error.
    /// Dropping the future mid-flight is treated the same as a failed write.
    pub async fn toggle_favorite(
        &self,
        point: &Point,
        user: Option<&User>,
    ) -> Result<FavoriteState, FavoriteError> {
        let Some(user) = user else {
            debug!(point_id = %point.id, "favorite toggle without a signed-in user");
            return Err(FavoriteError::AuthRequired);
        };

        let key: PairKey = (user.id.clone(), point.id.clone());
        let _release = ReleaseTurn {
            toggles: &self.toggles,
            key: &key,
        };
        let lock = self.toggles.entry(key.clone()).or_default().clone();
        let turn = lock.lock_owned().await;
        let result = self.toggle_locked(point, user, &key).await;
        drop(turn);
        result
    }

    async fn toggle_locked(
        &self,
        point: &Point,
        user: &User,
        key: &PairKey,
    ) -> Result<FavoriteState, FavoriteError> {
        let was_favorited = match self.remote.select_favorites(&user.id).await {
            Ok(rows) => rows.iter().any(|r| r.location_id == point.id),
            Err(e) => {
                let message = e.to_string();
                warn!(point_id = %point.id, user_id = %user.id, error = %message, "favorite lookup failed");
                self.notify(MarkerEvent::SyncFailed {
                    user_id: user.id.clone(),
                    point_id: point.id.clone(),
                    message: message.clone(),
                });
                return Err(FavoriteError::SyncRead { message });
            }
        };

        let now_favorited = !was_favorited;
        let pending = if now_favorited {
            SyncStatus::PendingWrite
        } else {
            SyncStatus::PendingDelete
        };
        self.set_state(key, user, now_favorited, pending);
        let unsettled = Unsettled {
            store: self,
            key,
            user,
            was_favorited,
            armed: true,
        };

        let written = if now_favorited {
            let record = FavoriteRecord::for_point(user, point);
            self.remote.insert_favorite(&record).await
        } else {
            self.remote.delete_favorite(&user.id, &point.id).await
        };

        unsettled.disarm();

        match written {
            Ok(()) => {
                debug!(point_id = %point.id, user_id = %user.id, favorited = now_favorited, "favorite synced");
                Ok(self.set_state(key, user, now_favorited, SyncStatus::Synced))
            }
            Err(e) => {
                let message = e.to_string();
                warn!(point_id = %point.id, user_id = %user.id, error = %message, "favorite sync failed; rolled back");
                self.set_state(key, user, was_favorited, SyncStatus::Failed);
                self.notify(MarkerEvent::SyncFailed {
                    user_id: user.id.clone(),
                    point_id: point.id.clone(),
                    message: message.clone(),
                });
                Err(FavoriteError::SyncWrite {
                    point_id: point.id.clone(),
                    message,
                })
            }
        }
    }

    fn set_state(
        &self,
        key: &PairKey,
        user: &User,
        is_favorited: bool,
        sync_status: SyncStatus,
    ) -> FavoriteState {
        let state = FavoriteState {
            point_id: key.1.clone(),
            is_favorited,
            sync_status,
        };
        self.entries.write().insert(key.clone(), state.clone());
        self.notify(MarkerEvent::StateChanged {
            user_id: user.id.clone(),
            state: state.clone(),
        });
        state
    }

    fn notify(&self, event: MarkerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Drops the pair's lock entry once nobody else holds or waits on it.
struct ReleaseTurn<'a> {
    toggles: &'a DashMap<PairKey, Arc<Mutex<()>>>,
    key: &'a PairKey,
}

impl Drop for ReleaseTurn<'_> {
    fn drop(&mut self) {
        self.toggles.remove_if(self.key, |_, l| Arc::strong_count(l) == 1);
    }
}

/// Rolls an optimistic value back if the toggle is abandoned before the
/// remote write settles.
struct Unsettled<'a> {
    store: &'a MarkerStateStore,
    key: &'a PairKey,
    user: &'a User,
    was_favorited: bool,
    armed: bool,
}

impl Unsettled<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for Unsettled<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let point_id = self.key.1.clone();
        warn!(%point_id, user_id = %self.user.id, "favorite toggle abandoned before sync; rolled back");
        self.store
            .set_state(self.key, self.user, self.was_favorited, SyncStatus::Failed);
        self.store.notify(MarkerEvent::SyncFailed {
            user_id: self.user.id.clone(),
            point_id,
            message: "sync abandoned before completion".to_string(),
        });
    }
}

impl std::fmt::Debug for MarkerStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerStateStore")
            .field("entries", &self.entries.read().len())
            .field("toggles_in_flight", &self.toggles.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::MarkerStateStore;
    use crate::clients::{InMemorySyncClient, RemoteOp};
    use crate::error::FavoriteError;
    use crate::remote::{FavoriteRecord, RemoteSyncClient};
    use crate::state::{MarkerEvent, MarkerStyle, SyncStatus};
    use crate::user::User;
    use foundation::{LatLng, PointId};
    use ingest::{Point, PointKind};
    use pretty_assertions::assert_eq;

    fn rack(id: &str) -> Point {
        Point::new(id, LatLng::new(45.5, -122.6), PointKind::Rack)
    }

    #[tokio::test]
    async fn anonymous_toggle_touches_nothing() {
        let remote = Arc::new(InMemorySyncClient::new());
        let store = MarkerStateStore::new(remote.clone());
        let err = store.toggle_favorite(&rack("a"), None).await.unwrap_err();
        assert_eq!(err, FavoriteError::AuthRequired);
        assert!(!err.is_retryable());
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn optimistic_value_is_published_before_write() {
        let store = MarkerStateStore::new(Arc::new(InMemorySyncClient::new()));
        let mut events = store.subscribe();
        let user = User::new("u", "ana");
        store.toggle_favorite(&rack("a"), Some(&user)).await.unwrap();

        let MarkerEvent::StateChanged { state: first, .. } = events.recv().await.unwrap() else {
            panic!("expected a state change");
        };
        assert_eq!((first.is_favorited, first.sync_status), (true, SyncStatus::PendingWrite));
        let MarkerEvent::StateChanged { state: second, .. } = events.recv().await.unwrap() else {
            panic!("expected a state change");
        };
        assert_eq!((second.is_favorited, second.sync_status), (true, SyncStatus::Synced));
    }

    #[tokio::test]
    async fn read_failure_leaves_state_untouched() {
        let remote = Arc::new(InMemorySyncClient::new());
        remote.fail_next(RemoteOp::Select, "timeout");
        let store = MarkerStateStore::new(remote.clone());
        let user = User::new("u", "ana");
        let err = store.toggle_favorite(&rack("a"), Some(&user)).await.unwrap_err();
        assert!(matches!(err, FavoriteError::SyncRead { .. }));
        assert!(store.get_favorite_state(&PointId::new("a"), &user.id).is_none());
        assert_eq!(remote.count(RemoteOp::Insert), 0);
    }

    #[tokio::test]
    async fn hydrate_drives_marker_style() {
        let user = User::new("u", "ana");
        let sign = Point::new("s", LatLng::new(45.5, -122.6), PointKind::Sign);
        let remote = InMemorySyncClient::new().with_rows([FavoriteRecord::for_point(&user, &rack("a"))]);
        let store = MarkerStateStore::new(Arc::new(remote));

        assert_eq!(store.hydrate(&user).await.unwrap(), 1);
        assert_eq!(store.marker_style(&rack("a")), MarkerStyle::Rack);

        store.set_active_user(Some(user));
        assert_eq!(store.marker_style(&rack("a")), MarkerStyle::Favorite);
        assert_eq!(store.marker_style(&rack("b")), MarkerStyle::Rack);
        assert_eq!(store.marker_style(&sign), MarkerStyle::Sign);
    }

    #[tokio::test]
    async fn lock_table_is_emptied_after_toggles() {
        let store = MarkerStateStore::new(Arc::new(InMemorySyncClient::new()));
        let user = User::new("u", "ana");
        store.toggle_favorite(&rack("a"), Some(&user)).await.unwrap();
        store.toggle_favorite(&rack("b"), Some(&user)).await.unwrap();
        assert!(store.toggles.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_toggle_rolls_back_and_releases_its_turn() {
        let remote = Arc::new(InMemorySyncClient::new().with_latency(Duration::from_millis(50)));
        let store = MarkerStateStore::new(remote.clone());
        let mut events = store.subscribe();
        let user = User::new("u", "ana");
        let p = rack("a");

        let abandoned =
            tokio::time::timeout(Duration::from_millis(75), store.toggle_favorite(&p, Some(&user))).await;
        assert!(abandoned.is_err());
        tokio::time::sleep(Duration::from_secs(10)).await;

        let state = store.get_favorite_state(&p.id, &user.id).unwrap();
        assert_eq!((state.is_favorited, state.sync_status), (false, SyncStatus::Failed));
        assert!(store.toggles.is_empty());
        assert!(remote.favorites_of(&user.id).is_empty());

        let mut failed = false;
        while let Ok(event) = events.try_recv() {
            failed |= matches!(event, MarkerEvent::SyncFailed { .. });
        }
        assert!(failed);

        store.hydrate(&user).await.unwrap();
        assert!(!store.is_favorited(&p.id, &user.id));
        let state = store.toggle_favorite(&p, Some(&user)).await.unwrap();
        assert_eq!((state.is_favorited, state.sync_status), (true, SyncStatus::Synced));
    }

    #[tokio::test]
    async fn rehydrate_clears_favorites_removed_elsewhere() {
        let user = User::new("u", "ana");
        let rows = ["a", "b"].map(|id| FavoriteRecord::for_point(&user, &rack(id)));
        let remote = Arc::new(InMemorySyncClient::new().with_rows(rows));
        let store = MarkerStateStore::new(remote.clone());
        assert_eq!(store.hydrate(&user).await.unwrap(), 2);

        remote.delete_favorite(&user.id, &PointId::new("a")).await.unwrap();
        assert_eq!(store.hydrate(&user).await.unwrap(), 1);

        let a = store.get_favorite_state(&PointId::new("a"), &user.id).unwrap();
        assert_eq!((a.is_favorited, a.sync_status), (false, SyncStatus::Synced));
        assert!(store.is_favorited(&PointId::new("b"), &user.id));
    }
}
