use std::collections::HashMap;

use foundation::math::{PixelProjection, Vec2};
use foundation::{GeoBounds, PointId};
use ingest::{ChunkSink, Point};
use tracing::{debug, trace};

use crate::cluster::{Cluster, ClusterConfig};
use crate::grid::CentroidGrid;

/// Compact the slot table once tombstones outnumber live points and pass this floor.
const COMPACT_MIN_TOMBSTONES: usize = 1024;

/// The live point set plus on-demand clustering over it.
///
/// Points keep their insertion order, which is the tie-break for clustering.
/// Re-inserting an id that is already live is ignored: points are immutable
/// once ingested.
#[derive(Debug)]
pub struct SpatialClusterIndex {
    config: ClusterConfig,
    slots: Vec<Option<Point>>,
    by_id: HashMap<PointId, usize>,
    live: usize,
    generation: u64,
}

struct OpenCluster {
    sum: Vec2,
    centroid: Vec2,
    cell: (i64, i64),
    members: Vec<usize>,
}

impl SpatialClusterIndex {
    pub fn new(config: ClusterConfig) -> Self {
        Self {
            config,
            slots: Vec::new(),
            by_id: HashMap::new(),
            live: 0,
            generation: 0,
        }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Bumped on every insert/remove that changes the live set.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, id: &PointId) -> Option<&Point> {
        let slot = *self.by_id.get(id)?;
        self.slots[slot].as_ref()
    }

    pub fn contains(&self, id: &PointId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Live points in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.slots.iter().flatten()
    }

    /// Adds points to the live set; returns how many were new.
    pub fn insert(&mut self, points: impl IntoIterator<Item = Point>) -> usize {
        let mut added = 0usize;
        for point in points {
            if self.by_id.contains_key(&point.id) {
                trace!(point_id = %point.id, "ignoring duplicate point");
                continue;
            }
            self.by_id.insert(point.id.clone(), self.slots.len());
            self.slots.push(Some(point));
            added += 1;
        }
        if added > 0 {
            self.live += added;
            self.generation += 1;
        }
        added
    }

    /// Drops points from the live set; returns how many were present.
    pub fn remove<'a>(&mut self, ids: impl IntoIterator<Item = &'a PointId>) -> usize {
        let mut removed = 0usize;
        for id in ids {
            if let Some(slot) = self.by_id.remove(id) {
                self.slots[slot] = None;
                removed += 1;
            }
        }
        if removed > 0 {
            self.live -= removed;
            self.generation += 1;
            self.maybe_compact();
        }
        removed
    }

    fn maybe_compact(&mut self) {
        let tombstones = self.slots.len() - self.live;
        if tombstones < COMPACT_MIN_TOMBSTONES || tombstones <= self.live {
            return;
        }
        self.slots.retain(Option::is_some);
        for (slot, point) in self.slots.iter().enumerate() {
            if let Some(point) = point {
                self.by_id.insert(point.id.clone(), slot);
            }
        }
        debug!(live = self.live, dropped = tombstones, "compacted live point set");
    }

    /// Clusters for a viewport using the configured radius.
    pub fn clusters_for(&self, bounds: &GeoBounds, zoom: f64) -> Vec<Cluster> {
        self.compute_clusters(bounds, zoom, self.config.cluster_radius_px)
    }

    /// Greedy proximity clustering in screen-pixel space at `zoom`.
    ///
    /// Points are visited in insertion order. Each joins the open cluster with the
    /// nearest centroid within `cluster_radius_px` (ties to the older cluster),
    /// or opens a new one. Centroids are running means of member pixels. When
    /// `remove_outside_visible_bounds` is set, points outside `bounds` are left
    /// out of the pass but stay in the live set.
    ///
    /// Every considered point ends up in exactly one returned cluster. Clusters
    /// are returned in the order they were opened.
    pub fn compute_clusters(
        &self,
        bounds: &GeoBounds,
        zoom: f64,
        cluster_radius_px: f64,
    ) -> Vec<Cluster> {
        let proj = PixelProjection::with_tile_size(zoom, self.config.tile_size);
        let mut grid = CentroidGrid::new(cluster_radius_px);
        let mut open: Vec<OpenCluster> = Vec::new();
        let mut pixels: Vec<Vec2> = Vec::with_capacity(self.live);
        let mut points: Vec<&Point> = Vec::with_capacity(self.live);

        for point in self.iter() {
            if self.config.remove_outside_visible_bounds && !bounds.contains(point.position) {
                continue;
            }
            let px = proj.project(point.position);
            let member = points.len();
            points.push(point);
            pixels.push(px);

            match grid.nearest(px, |c| open[c].centroid) {
                Some(c) => {
                    let cluster = &mut open[c];
                    cluster.members.push(member);
                    cluster.sum = cluster.sum + px;
                    cluster.centroid = cluster.sum * (1.0 / cluster.members.len() as f64);
                    let from = cluster.cell;
                    let to = grid.cell_of(cluster.centroid);
                    cluster.cell = to;
                    grid.relocate(from, to, c);
                }
                None => {
                    let cell = grid.cell_of(px);
                    grid.insert(cell, open.len());
                    open.push(OpenCluster {
                        sum: px,
                        centroid: px,
                        cell,
                        members: vec![member],
                    });
                }
            }
        }

        debug!(
            zoom,
            visible = points.len(),
            clusters = open.len(),
            "computed clusters"
        );

        open.into_iter()
            .map(|c| {
                let radius = c
                    .members
                    .iter()
                    .map(|&m| pixels[m].distance(c.centroid))
                    .fold(0.0, f64::max);
                let member_points = c.members.iter().map(|&m| points[m]);
                let bounds = GeoBounds::from_positions(member_points.clone().map(|p| &p.position))
                    .unwrap_or_else(GeoBounds::world);
                Cluster {
                    centroid: proj.unproject(c.centroid),
                    radius,
                    is_singleton: c.members.len() == 1,
                    members: member_points.map(|p| p.id.clone()).collect(),
                    bounds,
                }
            })
            .collect()
    }
}

impl ChunkSink for SpatialClusterIndex {
    fn accept(&mut self, points: Vec<Point>) -> usize {
        self.insert(points)
    }
}
