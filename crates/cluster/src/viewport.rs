use foundation::math::{DEFAULT_TILE_SIZE, MAX_MERCATOR_LAT, PixelProjection, Vec2};
use foundation::{GeoBounds, LatLng};
use runtime::ProgressSnapshot;
use serde::Serialize;
use tokio::sync::watch;

pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 22.0;
/// Zoom a marker click settles on unless the map is already closer.
pub const FOCUS_ZOOM: f64 = 20.0;

/// What the map currently shows.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: f64,
    pub bounds: GeoBounds,
}

/// Counters the map overlays for the user.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayStatus {
    pub cluster_count: usize,
    pub visible_points: usize,
    pub progress: Option<ProgressSnapshot>,
}

/// Owns the current view and publishes every pan/zoom on a watch channel.
///
/// Subscribers only ever see the latest view: a burst of changes between two
/// reads collapses into one notification.
#[derive(Debug)]
pub struct ViewportController {
    size_px: Vec2,
    tile_size: f64,
    view: watch::Sender<Viewport>,
    status: watch::Sender<DisplayStatus>,
}

impl ViewportController {
    pub fn new(size_px: (f64, f64), center: LatLng, zoom: f64) -> Self {
        Self::with_tile_size(size_px, center, zoom, DEFAULT_TILE_SIZE)
    }

    pub fn with_tile_size(size_px: (f64, f64), center: LatLng, zoom: f64, tile_size: f64) -> Self {
        let size_px = Vec2::new(size_px.0.max(1.0), size_px.1.max(1.0));
        let initial = viewport_at(size_px, tile_size, center, zoom);
        let (view, _) = watch::channel(initial);
        let (status, _) = watch::channel(DisplayStatus::default());
        Self {
            size_px,
            tile_size,
            view,
            status,
        }
    }

    pub fn current(&self) -> Viewport {
        *self.view.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Viewport> {
        self.view.subscribe()
    }

    pub fn set_view(&self, center: LatLng, zoom: f64) -> Viewport {
        let next = viewport_at(self.size_px, self.tile_size, center, zoom);
        self.view.send_replace(next);
        next
    }

    pub fn zoom_to(&self, zoom: f64) -> Viewport {
        self.set_view(self.current().center, zoom)
    }

    /// Pans by a screen offset; positive `dx` moves east, positive `dy` south.
    pub fn pan_by(&self, dx: f64, dy: f64) -> Viewport {
        let cur = self.current();
        let proj = PixelProjection::with_tile_size(cur.zoom, self.tile_size);
        let center = proj.unproject(proj.project(cur.center) + Vec2::new(dx, dy));
        self.set_view(center, cur.zoom)
    }

    /// Deepest whole zoom at which `bounds` fits the screen, centred on it.
    pub fn fit_bounds(&self, bounds: &GeoBounds) -> Viewport {
        let mut zoom = MAX_ZOOM;
        while zoom > MIN_ZOOM {
            let px = PixelProjection::with_tile_size(zoom, self.tile_size).project_bounds(bounds);
            if px.width() <= self.size_px.x && px.height() <= self.size_px.y {
                break;
            }
            zoom -= 1.0;
        }
        let proj = PixelProjection::with_tile_size(zoom, self.tile_size);
        let px = proj.project_bounds(bounds);
        let mid = Vec2::new(
            (px.min[0] + px.max[0]) * 0.5,
            (px.min[1] + px.max[1]) * 0.5,
        );
        self.set_view(proj.unproject(mid), zoom)
    }

    /// Centres on a marker, zooming in to street level unless already closer.
    pub fn focus_point(&self, position: LatLng) -> Viewport {
        let zoom = self.current().zoom;
        let zoom = if zoom > FOCUS_ZOOM - 1.0 { zoom } else { FOCUS_ZOOM };
        self.set_view(position, zoom)
    }

    /// Places a search result, returning the marker it replaced (if any) so the
    /// caller can take it off the map. The view fits the result's extent, or
    /// focuses on its position when it has none.
    pub fn show_search_result(
        &self,
        slot: &mut SearchMarkerSlot,
        marker: SearchMarker,
    ) -> Option<SearchMarker> {
        match marker.extent {
            Some(extent) => self.fit_bounds(&extent),
            None => self.focus_point(marker.position),
        };
        slot.place(marker)
    }

    pub fn status(&self) -> DisplayStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<DisplayStatus> {
        self.status.subscribe()
    }

    pub fn report_clusters(&self, cluster_count: usize, visible_points: usize) {
        self.status.send_modify(|s| {
            s.cluster_count = cluster_count;
            s.visible_points = visible_points;
        });
    }

    pub fn report_progress(&self, progress: ProgressSnapshot) {
        self.status.send_modify(|s| s.progress = Some(progress));
    }
}

fn viewport_at(size_px: Vec2, tile_size: f64, center: LatLng, zoom: f64) -> Viewport {
    let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    let center = LatLng::new(
        center.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT),
        center.lng,
    );
    let proj = PixelProjection::with_tile_size(zoom, tile_size);
    let c = proj.project(center);
    let half = size_px * 0.5;
    let nw = proj.unproject(c - half);
    let se = proj.unproject(c + half);
    Viewport {
        center,
        zoom,
        bounds: GeoBounds::new(se.lat, nw.lng, nw.lat, se.lng),
    }
}

/// A geocoder hit shown as a pin on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchMarker {
    pub label: String,
    pub position: LatLng,
    pub extent: Option<GeoBounds>,
}

/// Holds at most one search pin. Each new result replaces the previous one.
#[derive(Debug, Default)]
pub struct SearchMarkerSlot {
    current: Option<SearchMarker>,
}

impl SearchMarkerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&SearchMarker> {
        self.current.as_ref()
    }

    /// Installs `marker`, handing back the one it displaced.
    pub fn place(&mut self, marker: SearchMarker) -> Option<SearchMarker> {
        self.current.replace(marker)
    }

    pub fn clear(&mut self) -> Option<SearchMarker> {
        self.current.take()
    }
}

#[cfg(test)]
mod tests {
    use super::{FOCUS_ZOOM, SearchMarker, SearchMarkerSlot, ViewportController};
    use foundation::{GeoBounds, LatLng};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn bounds_surround_center() {
        let vc = ViewportController::new((800.0, 600.0), LatLng::new(40.7, -74.0), 12.0);
        let v = vc.current();
        assert!(v.bounds.contains(v.center));
        assert!(v.bounds.north > v.bounds.south);
        assert!(v.bounds.east > v.bounds.west);
        assert_close(v.bounds.center().lng, -74.0, 1e-9);
    }

    #[test]
    fn focus_zooms_in_unless_already_close() {
        let vc = ViewportController::new((800.0, 600.0), LatLng::new(0.0, 0.0), 10.0);
        let v = vc.focus_point(LatLng::new(1.0, 1.0));
        assert_eq!(v.zoom, FOCUS_ZOOM);
        assert_eq!(v.center, LatLng::new(1.0, 1.0));

        vc.zoom_to(21.0);
        assert_eq!(vc.focus_point(LatLng::new(2.0, 2.0)).zoom, 21.0);
    }

    #[test]
    fn fit_bounds_contains_target() {
        let vc = ViewportController::new((800.0, 600.0), LatLng::new(0.0, 0.0), 2.0);
        let target = GeoBounds::new(40.5, -74.3, 40.9, -73.7);
        let v = vc.fit_bounds(&target);
        assert_eq!(v.zoom.fract(), 0.0);
        assert!(v.bounds.contains(LatLng::new(target.south, target.west)));
        assert!(v.bounds.contains(LatLng::new(target.north, target.east)));
        // One level deeper would no longer fit.
        let deeper = vc.zoom_to(v.zoom + 1.0);
        assert!(
            !deeper.bounds.contains(LatLng::new(target.south, target.west))
                || !deeper.bounds.contains(LatLng::new(target.north, target.east))
        );
    }

    #[test]
    fn pan_moves_center_east() {
        let vc = ViewportController::new((800.0, 600.0), LatLng::new(10.0, 10.0), 5.0);
        let v = vc.pan_by(100.0, 0.0);
        assert!(v.center.lng > 10.0);
        assert_close(v.center.lat, 10.0, 1e-9);
    }

    #[test]
    fn search_slot_replaces_previous_pin() {
        let vc = ViewportController::new((800.0, 600.0), LatLng::new(0.0, 0.0), 3.0);
        let mut slot = SearchMarkerSlot::new();
        let first = SearchMarker {
            label: "Union Square".into(),
            position: LatLng::new(40.7359, -73.9911),
            extent: None,
        };
        let second = SearchMarker {
            label: "Brooklyn".into(),
            position: LatLng::new(40.6782, -73.9442),
            extent: Some(GeoBounds::new(40.57, -74.05, 40.74, -73.83)),
        };

        assert!(vc.show_search_result(&mut slot, first.clone()).is_none());
        assert_eq!(vc.current().zoom, FOCUS_ZOOM);
        let replaced = vc.show_search_result(&mut slot, second.clone());
        assert_eq!(replaced, Some(first));
        assert_eq!(slot.current(), Some(&second));
        assert!(vc.current().zoom < FOCUS_ZOOM);
        assert_eq!(slot.clear(), Some(second));
    }

    #[test]
    fn status_tracks_reports() {
        let vc = ViewportController::new((800.0, 600.0), LatLng::new(0.0, 0.0), 3.0);
        vc.report_clusters(12, 340);
        let s = vc.status();
        assert_eq!((s.cluster_count, s.visible_points), (12, 340));
        assert!(s.progress.is_none());
    }
}
