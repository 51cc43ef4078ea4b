use foundation::{GeoBounds, LatLng, PointId};
use serde::{Deserialize, Serialize};

/// Pixel radius used by the map's marker layer.
pub const DEFAULT_CLUSTER_RADIUS_PX: f64 = 160.0;

#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterConfig {
    /// Max pixel distance between a point and the centroid of the cluster it joins.
    pub cluster_radius_px: f64,
    /// Leave points outside the viewport out of the clustering pass.
    pub remove_outside_visible_bounds: bool,
    /// Edge of a map tile in pixels; sets the pixel scale per zoom level.
    pub tile_size: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cluster_radius_px: DEFAULT_CLUSTER_RADIUS_PX,
            remove_outside_visible_bounds: true,
            tile_size: foundation::math::DEFAULT_TILE_SIZE,
        }
    }
}

/// A group of points rendered as one aggregate marker at a given zoom.
///
/// Clusters are recomputed from scratch on every pass; two passes never share
/// cluster identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub centroid: LatLng,
    /// Largest member distance from the centroid, in pixels at the pass's zoom.
    pub radius: f64,
    /// Member ids in insertion order.
    pub members: Vec<PointId>,
    /// Geographic extent of the members (zoom-to-cluster target).
    pub bounds: GeoBounds,
    pub is_singleton: bool,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &PointId) -> bool {
        self.members.contains(id)
    }
}
