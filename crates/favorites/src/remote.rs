use std::sync::Arc;

use foundation::PointId;
use ingest::{BoxFuture, Point};
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::user::{User, UserId};

/// One row of the remote `Favorites` table. Column names are fixed by the
/// backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub user_id: UserId,
    pub username: String,
    pub location_id: PointId,
    pub location_address: String,
    pub x_coord: f64,
    pub y_coord: f64,
}

impl FavoriteRecord {
    /// Row saving `point` for `user`. `x_coord` is longitude, `y_coord` latitude.
    pub fn for_point(user: &User, point: &Point) -> Self {
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            location_id: point.id.clone(),
            location_address: point.address().unwrap_or_default().to_string(),
            x_coord: point.position.lng,
            y_coord: point.position.lat,
        }
    }
}

/// Projection returned by [`RemoteSyncClient::select_favorites`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FavoriteRow {
    pub location_id: PointId,
}

/// Read/insert/delete access to the remote favorites table.
pub trait RemoteSyncClient: Send + Sync {
    /// Every location the user has favorited.
    fn select_favorites<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> BoxFuture<'a, Result<Vec<FavoriteRow>, RemoteError>>;

    fn insert_favorite<'a>(
        &'a self,
        record: &'a FavoriteRecord,
    ) -> BoxFuture<'a, Result<(), RemoteError>>;

    fn delete_favorite<'a>(
        &'a self,
        user_id: &'a UserId,
        location_id: &'a PointId,
    ) -> BoxFuture<'a, Result<(), RemoteError>>;
}

impl<C: RemoteSyncClient + ?Sized> RemoteSyncClient for Arc<C> {
    fn select_favorites<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> BoxFuture<'a, Result<Vec<FavoriteRow>, RemoteError>> {
        (**self).select_favorites(user_id)
    }

    fn insert_favorite<'a>(
        &'a self,
        record: &'a FavoriteRecord,
    ) -> BoxFuture<'a, Result<(), RemoteError>> {
        (**self).insert_favorite(record)
    }

    fn delete_favorite<'a>(
        &'a self,
        user_id: &'a UserId,
        location_id: &'a PointId,
    ) -> BoxFuture<'a, Result<(), RemoteError>> {
        (**self).delete_favorite(user_id, location_id)
    }
}

#[cfg(test)]
mod tests {
    use super::FavoriteRecord;
    use crate::user::User;
    use foundation::LatLng;
    use ingest::{Point, PointKind, attr};
    use serde_json::json;

    #[test]
    fn record_matches_table_columns() {
        let point = Point::new("P123", LatLng::new(45.52, -122.67), PointKind::Rack)
            .with_attribute(attr::ADDRESS, "1 SW Main St");
        let record = FavoriteRecord::for_point(&User::new("u1", "ana"), &point);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "user_id": "u1",
                "username": "ana",
                "location_id": "P123",
                "location_address": "1 SW Main St",
                "x_coord": -122.67,
                "y_coord": 45.52,
            })
        );
    }
}
