use foundation::PointId;
use thiserror::Error;

/// Failure reported by a [`crate::RemoteSyncClient`].
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("remote rejected the request: {0}")]
    Rejected(String),
}

/// Why a favorite toggle did not take effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FavoriteError {
    #[error("sign in to save favorites")]
    AuthRequired,

    /// Insert or delete failed; the local value was rolled back.
    #[error("could not save favorite {point_id}: {message}")]
    SyncWrite { point_id: PointId, message: String },

    /// The read-before-write failed; nothing was changed.
    #[error("could not load favorites: {message}")]
    SyncRead { message: String },
}

impl FavoriteError {
    /// Whether repeating the same toggle may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FavoriteError::AuthRequired)
    }
}
