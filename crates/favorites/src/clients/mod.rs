//! [`crate::RemoteSyncClient`] implementations.

mod http;
mod memory;

pub use http::HttpSyncClient;
pub use memory::{InMemorySyncClient, RemoteCall, RemoteOp};
