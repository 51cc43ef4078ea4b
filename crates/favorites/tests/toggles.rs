use std::sync::Arc;
use std::time::Duration;

use favorites::{
    FavoriteError, FavoriteRecord, InMemorySyncClient, MarkerEvent, MarkerStateStore, RemoteCall,
    RemoteOp, RemoteSyncClient, SyncStatus, User,
};
use foundation::{LatLng, PointId};
use ingest::{Point, PointKind, attr};
use pretty_assertions::assert_eq;
use tokio::time::Instant;

const LATENCY: Duration = Duration::from_millis(50);

fn rack(id: &str) -> Point {
    Point::new(id, LatLng::new(45.5231, -122.6765), PointKind::Rack)
        .with_attribute(attr::ADDRESS, "SW 5th Ave & Oak St")
}

fn failures(events: &mut tokio::sync::broadcast::Receiver<MarkerEvent>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let MarkerEvent::SyncFailed { message, .. } = event {
            out.push(message);
        }
    }
    out
}

#[tokio::test(start_paused = true)]
async fn second_toggle_waits_for_the_first() {
    let remote = Arc::new(InMemorySyncClient::new().with_latency(LATENCY));
    let store = MarkerStateStore::new(remote.clone());
    let user = User::new("u1", "ana");
    let p = rack("P123");

    let observe = async {
        tokio::time::sleep(Duration::from_millis(75)).await;
        store.get_favorite_state(&p.id, &user.id)
    };
    let (first, second, mid_flight) = tokio::join!(
        store.toggle_favorite(&p, Some(&user)),
        store.toggle_favorite(&p, Some(&user)),
        observe,
    );

    let mid_flight = mid_flight.unwrap();
    assert_eq!(
        (mid_flight.is_favorited, mid_flight.sync_status),
        (true, SyncStatus::PendingWrite)
    );
    assert!(first.unwrap().is_favorited);
    let second = second.unwrap();
    assert!(!second.is_favorited);
    assert_eq!(second.sync_status, SyncStatus::Synced);

    assert_eq!(
        remote.calls(),
        vec![
            RemoteCall::Select(user.id.clone()),
            RemoteCall::Insert(FavoriteRecord::for_point(&user, &p)),
            RemoteCall::Select(user.id.clone()),
            RemoteCall::Delete(user.id.clone(), PointId::new("P123")),
        ]
    );
    assert!(remote.favorites_of(&user.id).is_empty());
}

#[tokio::test]
async fn failed_insert_rolls_back_and_retry_starts_from_false() {
    let remote = Arc::new(InMemorySyncClient::new());
    remote.fail_next(RemoteOp::Insert, "connection reset");
    let store = MarkerStateStore::new(remote.clone());
    let mut events = store.subscribe();
    let user = User::new("u1", "ana");
    let p = rack("P123");

    let err = store.toggle_favorite(&p, Some(&user)).await.unwrap_err();
    assert!(matches!(err, FavoriteError::SyncWrite { ref point_id, .. } if point_id.as_str() == "P123"));
    assert!(err.is_retryable());

    let state = store.get_favorite_state(&p.id, &user.id).unwrap();
    assert!(!state.is_favorited);
    assert_eq!(state.sync_status, SyncStatus::Failed);
    assert_eq!(failures(&mut events).len(), 1);

    let state = store.toggle_favorite(&p, Some(&user)).await.unwrap();
    assert!(state.is_favorited);
    assert_eq!(state.sync_status, SyncStatus::Synced);
    assert_eq!(remote.count(RemoteOp::Insert), 2);
    assert_eq!(remote.count(RemoteOp::Delete), 0);
    assert!(failures(&mut events).is_empty());
}

#[tokio::test]
async fn failed_delete_keeps_the_favorite() {
    let user = User::new("u1", "ana");
    let p = rack("P9");
    let remote = Arc::new(
        InMemorySyncClient::new().with_rows([FavoriteRecord::for_point(&user, &p)]),
    );
    remote.fail_next(RemoteOp::Delete, "503");
    let store = MarkerStateStore::new(remote.clone());

    assert!(store.toggle_favorite(&p, Some(&user)).await.is_err());
    assert!(store.is_favorited(&p.id, &user.id));
    assert_eq!(remote.favorites_of(&user.id), vec![PointId::new("P9")]);
}

#[tokio::test]
async fn toggling_twice_restores_the_original_value() {
    let remote = Arc::new(InMemorySyncClient::new());
    let store = MarkerStateStore::new(remote.clone());
    let user = User::new("u1", "ana");
    let p = rack("P1");

    let once = store.toggle_favorite(&p, Some(&user)).await.unwrap();
    let twice = store.toggle_favorite(&p, Some(&user)).await.unwrap();
    assert!(once.is_favorited);
    assert!(!twice.is_favorited);
    assert!(remote.favorites_of(&user.id).is_empty());
    assert_eq!((remote.count(RemoteOp::Insert), remote.count(RemoteOp::Delete)), (1, 1));
}

#[tokio::test]
async fn stale_hydration_does_not_decide_the_toggle() {
    let user = User::new("u1", "ana");
    let p = rack("P5");
    let remote = Arc::new(InMemorySyncClient::new());
    let store = MarkerStateStore::new(remote.clone());
    store.hydrate(&user).await.unwrap();
    assert!(!store.is_favorited(&p.id, &user.id));

    // Favorited elsewhere after hydration.
    remote
        .insert_favorite(&FavoriteRecord::for_point(&user, &p))
        .await
        .unwrap();

    let state = store.toggle_favorite(&p, Some(&user)).await.unwrap();
    assert!(!state.is_favorited);
    assert!(remote.favorites_of(&user.id).is_empty());
}

#[tokio::test(start_paused = true)]
async fn different_points_do_not_wait_on_each_other() {
    let remote = Arc::new(InMemorySyncClient::new().with_latency(LATENCY));
    let store = MarkerStateStore::new(remote.clone());
    let user = User::new("u1", "ana");
    let (a, b) = (rack("A"), rack("B"));

    let started = Instant::now();
    let (ra, rb) = tokio::join!(
        store.toggle_favorite(&a, Some(&user)),
        store.toggle_favorite(&b, Some(&user)),
    );
    assert!(ra.unwrap().is_favorited && rb.unwrap().is_favorited);
    assert!(started.elapsed() < LATENCY * 3);
    assert_eq!(remote.favorites_of(&user.id).len(), 2);
}
