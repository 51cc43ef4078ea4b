use crate::bounds::{Aabb2, GeoBounds};
use crate::geo::LatLng;

use super::Vec2;

/// Latitude limit of the square Web-Mercator world.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_6;

/// Default raster tile edge in pixels.
pub const DEFAULT_TILE_SIZE: f64 = 256.0;

/// Spherical Web-Mercator projection into screen pixels at a zoom level.
///
/// Pixel origin is the north-west corner of the world; `y` grows southwards.
/// Fractional zoom levels are allowed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PixelProjection {
    world_size: f64,
}

impl PixelProjection {
    pub fn new(zoom: f64) -> Self {
        Self::with_tile_size(zoom, DEFAULT_TILE_SIZE)
    }

    pub fn with_tile_size(zoom: f64, tile_size: f64) -> Self {
        Self {
            world_size: tile_size * zoom.exp2(),
        }
    }

    /// Width (and height) of the projected world in pixels.
    pub fn world_size(&self) -> f64 {
        self.world_size
    }

    pub fn project(&self, p: LatLng) -> Vec2 {
        let lat = p.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
        let x = (p.lng + 180.0) / 360.0 * self.world_size;
        let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) * 0.5
            * self.world_size;
        Vec2::new(x, y)
    }

    pub fn unproject(&self, px: Vec2) -> LatLng {
        let lng = px.x / self.world_size * 360.0 - 180.0;
        let n = std::f64::consts::PI * (1.0 - 2.0 * px.y / self.world_size);
        let lat = n.sinh().atan().to_degrees();
        LatLng::new(lat, lng)
    }

    /// Pixel rectangle covered by geographic bounds.
    pub fn project_bounds(&self, b: &GeoBounds) -> Aabb2 {
        let nw = self.project(LatLng::new(b.north, b.west));
        let se = self.project(LatLng::new(b.south, b.east));
        Aabb2::new([nw.x, nw.y], [se.x, se.y])
    }
}
