use std::collections::HashMap;

use foundation::math::{Vec2, stable_total_cmp_f64};

type Cell = (i64, i64);

/// Uniform pixel-bucket grid over cluster centroids.
///
/// The cell edge is at least the search radius, so every centroid within
/// `radius` of a query point lives in the query cell or one of its 8
/// neighbours. That bounds each nearest-cluster lookup to a 3x3 block instead of
/// a scan over every open cluster.
#[derive(Debug)]
pub(crate) struct CentroidGrid {
    cell_size: f64,
    radius_sq: f64,
    cells: HashMap<Cell, Vec<usize>>,
}

impl CentroidGrid {
    pub(crate) fn new(radius: f64) -> Self {
        let radius = radius.max(0.0);
        Self {
            cell_size: radius.max(1.0),
            radius_sq: radius * radius,
            cells: HashMap::new(),
        }
    }

    pub(crate) fn cell_of(&self, p: Vec2) -> Cell {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
        )
    }

    pub(crate) fn insert(&mut self, cell: Cell, cluster: usize) {
        self.cells.entry(cell).or_default().push(cluster);
    }

    pub(crate) fn relocate(&mut self, from: Cell, to: Cell, cluster: usize) {
        if from == to {
            return;
        }
        if let Some(bucket) = self.cells.get_mut(&from) {
            if let Some(pos) = bucket.iter().position(|&c| c == cluster) {
                bucket.swap_remove(pos);
            }
            if bucket.is_empty() {
                self.cells.remove(&from);
            }
        }
        self.insert(to, cluster);
    }

    /// Nearest cluster whose centroid lies within the radius of `p`.
    ///
    /// Equal distances resolve to the lower cluster index, i.e. the cluster
    /// opened first.
    pub(crate) fn nearest(&self, p: Vec2, centroid_of: impl Fn(usize) -> Vec2) -> Option<usize> {
        let (cx, cy) = self.cell_of(p);
        let mut best: Option<(usize, f64)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(bucket) = self.cells.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &cluster in bucket {
                    let d2 = centroid_of(cluster).distance_squared(p);
                    if d2 > self.radius_sq {
                        continue;
                    }
                    let closer = match best {
                        None => true,
                        Some((best_cluster, best_d2)) => {
                            stable_total_cmp_f64(d2, best_d2)
                                .then(cluster.cmp(&best_cluster))
                                .is_lt()
                        }
                    };
                    if closer {
                        best = Some((cluster, d2));
                    }
                }
            }
        }
        best.map(|(cluster, _)| cluster)
    }
}
