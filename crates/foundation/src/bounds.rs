use serde::{Deserialize, Serialize};

use crate::geo::LatLng;
use crate::math::Vec2;

/// Geographic bounding box in degrees (south-west / north-east corners).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        GeoBounds {
            south,
            west,
            north,
            east,
        }
    }

    /// Bounds covering the whole projected world.
    pub fn world() -> Self {
        GeoBounds::new(-90.0, f64::NEG_INFINITY, 90.0, f64::INFINITY)
    }

    /// Smallest bounds containing every position, `None` for an empty input.
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a LatLng>) -> Option<Self> {
        let mut iter = positions.into_iter();
        let first = iter.next()?;
        let mut b = GeoBounds::new(first.lat, first.lng, first.lat, first.lng);
        for p in iter {
            b.extend(*p);
        }
        Some(b)
    }

    pub fn extend(&mut self, p: LatLng) {
        self.south = self.south.min(p.lat);
        self.north = self.north.max(p.lat);
        self.west = self.west.min(p.lng);
        self.east = self.east.max(p.lng);
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.south && p.lat <= self.north && p.lng >= self.west && p.lng <= self.east
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) * 0.5,
            (self.west + self.east) * 0.5,
        )
    }
}

/// Axis-aligned rectangle in pixel space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min[0] && p.x <= self.max[0] && p.y >= self.min[1] && p.y <= self.max[1]
    }
}

#[cfg(test)]
mod tests {
    use super::GeoBounds;
    use crate::geo::LatLng;

    #[test]
    fn contains_is_inclusive() {
        let b = GeoBounds::new(40.0, -75.0, 41.0, -73.0);
        assert!(b.contains(LatLng::new(40.0, -75.0)));
        assert!(b.contains(LatLng::new(40.5, -74.0)));
        assert!(!b.contains(LatLng::new(41.01, -74.0)));
        assert!(!b.contains(LatLng::new(40.5, -72.9)));
    }

    #[test]
    fn from_positions_covers_all() {
        let pts = [
            LatLng::new(1.0, 2.0),
            LatLng::new(-3.0, 5.0),
            LatLng::new(0.5, -1.0),
        ];
        let b = GeoBounds::from_positions(&pts).unwrap();
        assert_eq!(b, GeoBounds::new(-3.0, -1.0, 1.0, 5.0));
        assert!(GeoBounds::from_positions(&[]).is_none());
    }

    #[test]
    fn world_contains_wrapped_longitudes() {
        assert!(GeoBounds::world().contains(LatLng::new(10.0, 250.0)));
    }
}
