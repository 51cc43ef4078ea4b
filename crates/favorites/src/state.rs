use foundation::PointId;
use serde::Serialize;

use crate::user::UserId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncStatus {
    Synced,
    PendingWrite,
    PendingDelete,
    /// Last write failed and `is_favorited` holds the restored value.
    Failed,
}

impl SyncStatus {
    pub fn is_pending(self) -> bool {
        matches!(self, SyncStatus::PendingWrite | SyncStatus::PendingDelete)
    }
}

/// Favorite flag of one point for one user, as the map currently shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteState {
    pub point_id: PointId,
    pub is_favorited: bool,
    pub sync_status: SyncStatus,
}

/// Which icon a marker gets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerStyle {
    Favorite,
    Rack,
    Sign,
}

/// Change notifications for the render layer.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerEvent {
    StateChanged { user_id: UserId, state: FavoriteState },
    /// A user-visible, retryable sync failure.
    SyncFailed {
        user_id: UserId,
        point_id: PointId,
        message: String,
    },
}
