//! Per-user favorite markers with optimistic local updates reconciled against a
//! remote favorites table.
//!
//! [`MarkerStateStore`] owns every [`FavoriteState`]; the remote table is reached
//! only through a [`RemoteSyncClient`].

pub mod clients;
pub mod error;
pub mod remote;
pub mod state;
pub mod store;
pub mod user;

pub use clients::*;
pub use error::*;
pub use remote::*;
pub use state::*;
pub use store::*;
pub use user::*;
