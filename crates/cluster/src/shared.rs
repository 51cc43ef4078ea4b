use std::sync::Arc;

use foundation::PointId;
use ingest::{ChunkSink, Point};
use parking_lot::{RwLock, RwLockReadGuard};
use tokio::sync::watch;

use crate::cluster::ClusterConfig;
use crate::index::SpatialClusterIndex;

/// Cloneable handle to the one live index, with change notification.
///
/// All mutation goes through `insert` / `remove`; every effective change
/// publishes the new index generation to subscribers. The lock is never held
/// across an await.
#[derive(Debug, Clone)]
pub struct SharedIndex {
    inner: Arc<RwLock<SpatialClusterIndex>>,
    changes: Arc<watch::Sender<u64>>,
}

impl SharedIndex {
    pub fn new(config: ClusterConfig) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(SpatialClusterIndex::new(config))),
            changes: Arc::new(changes),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, SpatialClusterIndex> {
        self.inner.read()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn generation(&self) -> u64 {
        *self.changes.borrow()
    }

    /// Receives the index generation after every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    pub fn insert(&self, points: impl IntoIterator<Item = Point>) -> usize {
        let (added, generation) = {
            let mut index = self.inner.write();
            let added = index.insert(points);
            (added, index.generation())
        };
        if added > 0 {
            self.changes.send_replace(generation);
        }
        added
    }

    pub fn remove<'a>(&self, ids: impl IntoIterator<Item = &'a PointId>) -> usize {
        let (removed, generation) = {
            let mut index = self.inner.write();
            let removed = index.remove(ids);
            (removed, index.generation())
        };
        if removed > 0 {
            self.changes.send_replace(generation);
        }
        removed
    }
}

impl ChunkSink for SharedIndex {
    fn accept(&mut self, points: Vec<Point>) -> usize {
        self.insert(points)
    }
}
