use std::time::Duration;

use foundation::PointId;
use ingest::BoxFuture;
use parking_lot::Mutex;
use tracing::trace;

use crate::error::RemoteError;
use crate::remote::{FavoriteRecord, FavoriteRow, RemoteSyncClient};
use crate::user::UserId;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    Select,
    Insert,
    Delete,
}

/// A request as the in-memory table received it.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Select(UserId),
    Insert(FavoriteRecord),
    Delete(UserId, PointId),
}

impl RemoteCall {
    pub fn op(&self) -> RemoteOp {
        match self {
            RemoteCall::Select(_) => RemoteOp::Select,
            RemoteCall::Insert(_) => RemoteOp::Insert,
            RemoteCall::Delete(..) => RemoteOp::Delete,
        }
    }
}

#[derive(Debug, Default)]
struct Table {
    rows: Vec<FavoriteRecord>,
    calls: Vec<RemoteCall>,
    failures: Vec<(RemoteOp, String)>,
}

/// Favorites table held in memory, with a per-request delay and scripted
/// failures. Inserting a (user, location) pair that already exists is rejected
/// like a unique-key violation.
#[derive(Debug, Default)]
pub struct InMemorySyncClient {
    table: Mutex<Table>,
    latency: Duration,
}

impl InMemorySyncClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request sleeps this long before it takes effect.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_rows(self, rows: impl IntoIterator<Item = FavoriteRecord>) -> Self {
        self.table.lock().rows.extend(rows);
        self
    }

    /// The next `op` request fails with `message` after being recorded.
    pub fn fail_next(&self, op: RemoteOp, message: impl Into<String>) {
        self.table.lock().failures.push((op, message.into()));
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.table.lock().calls.clone()
    }

    pub fn count(&self, op: RemoteOp) -> usize {
        self.table.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    pub fn favorites_of(&self, user_id: &UserId) -> Vec<PointId> {
        self.table
            .lock()
            .rows
            .iter()
            .filter(|r| &r.user_id == user_id)
            .map(|r| r.location_id.clone())
            .collect()
    }

    async fn settle(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn record(&self, call: RemoteCall) -> Result<(), RemoteError> {
        let mut table = self.table.lock();
        let op = call.op();
        trace!(?call, "in-memory favorites request");
        table.calls.push(call);
        let scripted = table.failures.iter().position(|(o, _)| *o == op);
        match scripted {
            Some(i) => Err(RemoteError::Rejected(table.failures.remove(i).1)),
            None => Ok(()),
        }
    }
}

impl RemoteSyncClient for InMemorySyncClient {
    fn select_favorites<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> BoxFuture<'a, Result<Vec<FavoriteRow>, RemoteError>> {
        Box::pin(async move {
            self.record(RemoteCall::Select(user_id.clone()))?;
            self.settle().await;
            Ok(self
                .favorites_of(user_id)
                .into_iter()
                .map(|location_id| FavoriteRow { location_id })
                .collect())
        })
    }

    fn insert_favorite<'a>(
        &'a self,
        record: &'a FavoriteRecord,
    ) -> BoxFuture<'a, Result<(), RemoteError>> {
        Box::pin(async move {
            self.record(RemoteCall::Insert(record.clone()))?;
            self.settle().await;
            let mut table = self.table.lock();
            let exists = table
                .rows
                .iter()
                .any(|r| r.user_id == record.user_id && r.location_id == record.location_id);
            if exists {
                return Err(RemoteError::Rejected(format!(
                    "duplicate favorite {} for {}",
                    record.location_id, record.user_id
                )));
            }
            table.rows.push(record.clone());
            Ok(())
        })
    }

    fn delete_favorite<'a>(
        &'a self,
        user_id: &'a UserId,
        location_id: &'a PointId,
    ) -> BoxFuture<'a, Result<(), RemoteError>> {
        Box::pin(async move {
            self.record(RemoteCall::Delete(user_id.clone(), location_id.clone()))?;
            self.settle().await;
            self.table
                .lock()
                .rows
                .retain(|r| !(&r.user_id == user_id && &r.location_id == location_id));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemorySyncClient, RemoteOp};
    use crate::remote::{FavoriteRecord, RemoteSyncClient};
    use crate::user::UserId;
    use foundation::PointId;

    fn record(user: &str, location: &str) -> FavoriteRecord {
        FavoriteRecord {
            user_id: UserId::new(user),
            username: user.to_string(),
            location_id: PointId::new(location),
            location_address: String::new(),
            x_coord: 0.0,
            y_coord: 0.0,
        }
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let client = InMemorySyncClient::new();
        client.insert_favorite(&record("u", "a")).await.unwrap();
        assert!(client.insert_favorite(&record("u", "a")).await.is_err());
        assert_eq!(client.favorites_of(&UserId::new("u")), vec![PointId::new("a")]);
    }

    #[tokio::test]
    async fn scripted_failure_fires_once() {
        let client = InMemorySyncClient::new().with_rows([record("u", "a")]);
        client.fail_next(RemoteOp::Delete, "offline");
        let (u, a) = (UserId::new("u"), PointId::new("a"));
        assert!(client.delete_favorite(&u, &a).await.is_err());
        assert_eq!(client.favorites_of(&u).len(), 1);
        client.delete_favorite(&u, &a).await.unwrap();
        assert!(client.favorites_of(&u).is_empty());
        assert_eq!(client.count(RemoteOp::Delete), 2);
    }
}
