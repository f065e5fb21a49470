//! Coordinates, bounds and the spherical Web Mercator math behind fit-bounds.

use std::f64::consts::PI;

/// Pixel size of one tile at zoom 0.
pub const TILE_SIZE: f64 = 256.0;
/// Latitude limit of the square Web Mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_779_8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Smallest lat/lng rectangle containing every point it was extended with.
///
/// Starts out empty; an empty accumulator has no corners and fitting a view to
/// it leaves the view untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatLngBounds {
    corners: Option<(LatLng, LatLng)>,
}

impl LatLngBounds {
    pub const fn empty() -> Self {
        Self { corners: None }
    }

    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = LatLng>,
    {
        let mut bounds = Self::empty();
        for point in points {
            bounds.extend(point);
        }
        bounds
    }

    pub fn extend(&mut self, point: LatLng) {
        self.corners = Some(match self.corners {
            None => (point, point),
            Some((sw, ne)) => (
                LatLng::new(sw.lat.min(point.lat), sw.lng.min(point.lng)),
                LatLng::new(ne.lat.max(point.lat), ne.lng.max(point.lng)),
            ),
        });
    }

    pub fn is_valid(&self) -> bool {
        self.corners.is_some()
    }

    pub fn south_west(&self) -> Option<LatLng> {
        self.corners.map(|(sw, _)| sw)
    }

    pub fn north_east(&self) -> Option<LatLng> {
        self.corners.map(|(_, ne)| ne)
    }

    pub fn contains(&self, point: LatLng) -> bool {
        match self.corners {
            Some((sw, ne)) => {
                point.lat >= sw.lat && point.lat <= ne.lat && point.lng >= sw.lng && point.lng <= ne.lng
            }
            None => false,
        }
    }
}

fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * zoom.exp2()
}

/// Projects to world pixel coordinates at `zoom` (origin at the north-west corner).
pub fn project(point: LatLng, zoom: f64) -> (f64, f64) {
    let size = world_size(zoom);
    let lat = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let sin = lat.sin();
    let x = size * (point.lng + 180.0) / 360.0;
    let y = size * (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI));
    (x, y)
}

pub fn unproject(pixel: (f64, f64), zoom: f64) -> LatLng {
    let size = world_size(zoom);
    let lng = pixel.0 / size * 360.0 - 180.0;
    let n = PI - 2.0 * PI * pixel.1 / size;
    let lat = n.sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Highest whole zoom at which `bounds` fits inside `viewport`, clamped to
/// `[min_zoom, max_zoom]`. A degenerate (single point) bounds lands on `max_zoom`.
pub fn bounds_zoom(
    bounds: &LatLngBounds,
    viewport: ViewportSize,
    current_zoom: u8,
    min_zoom: u8,
    max_zoom: u8,
) -> Option<u8> {
    let (sw, ne) = bounds.corners?;
    let zoom = f64::from(current_zoom);

    let nw = project(LatLng::new(ne.lat, sw.lng), zoom);
    let se = project(LatLng::new(sw.lat, ne.lng), zoom);
    let span_x = (se.0 - nw.0).abs();
    let span_y = (se.1 - nw.1).abs();

    let scale = (f64::from(viewport.width) / span_x).min(f64::from(viewport.height) / span_y);
    let target = zoom + scale.log2();
    // Shave float noise before flooring so an exact fit is not knocked down a level.
    let target = (target * 100.0).round() / 100.0;
    let target = if target.is_nan() {
        zoom
    } else {
        target.floor()
    };

    Some(target.clamp(f64::from(min_zoom), f64::from(max_zoom)) as u8)
}

/// Center and zoom that frame `bounds` in `viewport`, or `None` for empty bounds.
pub fn fit_view(
    bounds: &LatLngBounds,
    viewport: ViewportSize,
    current_zoom: u8,
    min_zoom: u8,
    max_zoom: u8,
) -> Option<(LatLng, u8)> {
    let (sw, ne) = bounds.corners?;
    let zoom = bounds_zoom(bounds, viewport, current_zoom, min_zoom, max_zoom)?;

    let a = project(sw, f64::from(zoom));
    let b = project(ne, f64::from(zoom));
    let center = unproject(((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0), f64::from(zoom));
    Some((center, zoom))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: ViewportSize = ViewportSize::new(800, 600);

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_bounds_has_no_corners() {
        let bounds = LatLngBounds::empty();
        assert!(!bounds.is_valid());
        assert_eq!(bounds.south_west(), None);
        assert!(!bounds.contains(LatLng::new(0.0, 0.0)));
        assert_eq!(fit_view(&bounds, VIEWPORT, 18, 0, 18), None);
    }

    #[test]
    fn extend_grows_to_cover_points() {
        let mut bounds = LatLngBounds::empty();
        bounds.extend(LatLng::new(17.1, 78.1));
        assert_eq!(bounds.south_west(), Some(LatLng::new(17.1, 78.1)));
        assert_eq!(bounds.north_east(), Some(LatLng::new(17.1, 78.1)));

        bounds.extend(LatLng::new(17.0, 78.3));
        bounds.extend(LatLng::new(17.4, 77.9));
        assert_eq!(bounds.south_west(), Some(LatLng::new(17.0, 77.9)));
        assert_eq!(bounds.north_east(), Some(LatLng::new(17.4, 78.3)));
        assert!(bounds.contains(LatLng::new(17.2, 78.0)));
        assert!(!bounds.contains(LatLng::new(17.5, 78.0)));
    }

    #[test]
    fn from_points_matches_incremental_extension() {
        let points = [
            LatLng::new(-3.5, 10.0),
            LatLng::new(12.0, -4.25),
            LatLng::new(0.0, 0.0),
        ];
        let mut incremental = LatLngBounds::empty();
        for p in points {
            incremental.extend(p);
        }
        assert_eq!(LatLngBounds::from_points(points), incremental);
    }

    #[test]
    fn unproject_inverts_project() {
        let point = LatLng::new(17.48342, 78.5173);
        let back = unproject(project(point, 18.0), 18.0);
        assert!(approx(back.lat, point.lat));
        assert!(approx(back.lng, point.lng));
    }

    #[test]
    fn project_places_origin_at_world_center() {
        let (x, y) = project(LatLng::new(0.0, 0.0), 0.0);
        assert!(approx(x, 128.0));
        assert!(approx(y, 128.0));
    }

    #[test]
    fn single_point_frames_at_max_zoom() {
        let bounds = LatLngBounds::from_points([LatLng::new(17.0, 78.0)]);
        let (center, zoom) = fit_view(&bounds, VIEWPORT, 5, 0, 18).unwrap();
        assert_eq!(zoom, 18);
        assert!(approx(center.lat, 17.0));
        assert!(approx(center.lng, 78.0));
    }

    #[test]
    fn world_wide_span_picks_low_zoom_independent_of_current_zoom() {
        let bounds =
            LatLngBounds::from_points([LatLng::new(0.0, -180.0), LatLng::new(0.0, 180.0)]);
        // 800px / 256px per world width at zoom 0 -> log2(3.125) ~= 1.64.
        assert_eq!(bounds_zoom(&bounds, VIEWPORT, 18, 0, 18), Some(1));
        assert_eq!(bounds_zoom(&bounds, VIEWPORT, 3, 0, 18), Some(1));
    }

    #[test]
    fn zoom_is_clamped_to_min_zoom() {
        let bounds =
            LatLngBounds::from_points([LatLng::new(-80.0, -180.0), LatLng::new(80.0, 180.0)]);
        assert_eq!(bounds_zoom(&bounds, ViewportSize::new(64, 64), 10, 2, 18), Some(2));
    }

    #[test]
    fn nearby_points_fit_and_stay_in_view() {
        let bounds =
            LatLngBounds::from_points([LatLng::new(17.0, 78.0), LatLng::new(17.1, 78.1)]);
        let (center, zoom) = fit_view(&bounds, VIEWPORT, 18, 0, 18).unwrap();
        assert!(zoom < 18);
        assert!(zoom > 5);
        assert!(bounds.contains(center));

        // The framed span must fit inside the viewport at the chosen zoom.
        let sw = project(LatLng::new(17.0, 78.0), f64::from(zoom));
        let ne = project(LatLng::new(17.1, 78.1), f64::from(zoom));
        assert!((ne.0 - sw.0).abs() <= 800.0);
        assert!((ne.1 - sw.1).abs() <= 600.0);

        // One level deeper it no longer fits.
        let sw = project(LatLng::new(17.0, 78.0), f64::from(zoom + 1));
        let ne = project(LatLng::new(17.1, 78.1), f64::from(zoom + 1));
        assert!((ne.0 - sw.0).abs() > 800.0 || (ne.1 - sw.1).abs() > 600.0);
    }
}
