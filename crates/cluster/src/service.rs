use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use runtime::{CancelToken, yield_to_scheduler};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::cluster::Cluster;
use crate::shared::SharedIndex;
use crate::viewport::{Viewport, ViewportController};

/// Result of one clustering pass.
#[derive(Debug, Clone)]
pub struct ClusterFrame {
    /// Start order of the pass; later passes have larger values.
    pub seq: u64,
    /// Index generation the pass read.
    pub generation: u64,
    pub viewport: Viewport,
    pub visible_points: usize,
    pub clusters: Vec<Cluster>,
}

/// Recomputes clusters whenever the viewport or the live set changes and
/// publishes the latest frame.
///
/// Only the newest pass is ever published: a pass that finishes after a pass
/// that started later is discarded, and the watch channels coalesce bursts of
/// pan/zoom so intermediate views are never computed at all.
#[derive(Debug, Clone)]
pub struct ClusterService {
    index: SharedIndex,
    next_seq: Arc<AtomicU64>,
    frames: Arc<watch::Sender<Option<Arc<ClusterFrame>>>>,
}

impl ClusterService {
    pub fn new(index: SharedIndex) -> Self {
        let (frames, _) = watch::channel(None);
        Self {
            index,
            next_seq: Arc::new(AtomicU64::new(0)),
            frames: Arc::new(frames),
        }
    }

    pub fn index(&self) -> &SharedIndex {
        &self.index
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<ClusterFrame>>> {
        self.frames.subscribe()
    }

    pub fn latest(&self) -> Option<Arc<ClusterFrame>> {
        self.frames.borrow().clone()
    }

    /// Starts a pass. The sequence number is taken before the index is read.
    pub fn compute(&self, viewport: Viewport) -> ClusterFrame {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let index = self.index.read();
        let clusters = index.clusters_for(&viewport.bounds, viewport.zoom);
        ClusterFrame {
            seq,
            generation: index.generation(),
            viewport,
            visible_points: clusters.iter().map(Cluster::len).sum(),
            clusters,
        }
    }

    /// Publishes `frame` unless a newer pass already has been. Returns whether
    /// it was published.
    pub fn publish(&self, frame: ClusterFrame) -> bool {
        let frame = Arc::new(frame);
        self.frames.send_if_modified(|current| {
            let stale = current.as_ref().is_some_and(|cur| cur.seq > frame.seq);
            if stale {
                trace!(seq = frame.seq, "discarding stale cluster frame");
                return false;
            }
            *current = Some(frame.clone());
            true
        })
    }

    pub fn recompute(&self, viewport: Viewport) -> Option<Arc<ClusterFrame>> {
        let frame = self.compute(viewport);
        if self.publish(frame) {
            self.latest()
        } else {
            None
        }
    }

    /// Follows `controller` until `cancel` fires, reporting cluster counts back
    /// to it after every pass. The service keeps both change channels open, so
    /// cancellation is the only way out.
    pub async fn run(self, controller: Arc<ViewportController>, cancel: CancelToken) {
        let mut views = controller.subscribe();
        let mut changes = self.index.subscribe();

        loop {
            let viewport = *views.borrow_and_update();
            let _ = changes.borrow_and_update();

            if let Some(frame) = self.recompute(viewport) {
                controller.report_clusters(frame.clusters.len(), frame.visible_points);
                debug!(
                    seq = frame.seq,
                    generation = frame.generation,
                    clusters = frame.clusters.len(),
                    "published cluster frame"
                );
            }
            yield_to_scheduler().await;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = views.changed() => {}
                _ = changes.changed() => {}
            }
        }
        debug!("cluster service stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::ClusterService;
    use crate::cluster::ClusterConfig;
    use crate::shared::SharedIndex;
    use crate::viewport::ViewportController;
    use std::sync::Arc;
    use std::time::Duration;

    use foundation::LatLng;
    use ingest::{Point, PointKind};
    use runtime::CancelToken;

    #[test]
    fn older_pass_cannot_overwrite_newer() {
        let index = SharedIndex::new(ClusterConfig::default());
        index.insert([Point::new("a", LatLng::new(1.0, 1.0), PointKind::Rack)]);
        let service = ClusterService::new(index);
        let vc = ViewportController::new((800.0, 600.0), LatLng::new(1.0, 1.0), 10.0);

        let early = service.compute(vc.current());
        let late = service.compute(vc.zoom_to(12.0));
        assert!(service.publish(late));
        assert!(!service.publish(early));
        assert_eq!(service.latest().unwrap().viewport.zoom, 12.0);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_running_after_callers_drop_their_handles() {
        let index = SharedIndex::new(ClusterConfig::default());
        let vc = Arc::new(ViewportController::new((800.0, 600.0), LatLng::new(1.0, 1.0), 10.0));
        let cancel = CancelToken::new();
        let task = tokio::spawn(ClusterService::new(index.clone()).run(vc.clone(), cancel.clone()));
        drop((index, vc));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!task.is_finished());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
