use std::f64::consts::PI;

/// Southern and northern edges of the fitted world view (Antarctica excluded)
const FIT_SOUTH: f64 = -58.0;
const FIT_NORTH: f64 = 84.0;

/// Web Mercator y in [0, 1] for a latitude in degrees
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-85.0, 85.0) * PI / 180.0;
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

/// Inverse of [`mercator_y`]
fn mercator_lat(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan() * 180.0 / PI
}

/// Viewport representing the visible map area in braille pixels
#[derive(Clone, Debug)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-90 to 90)
    pub center_lat: f64,
    /// Zoom level (1.0 = the whole 360° fills the width)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
        }
    }

    /// Fit the inhabited latitudes into the canvas. Zoom never exceeds 1.0,
    /// so the full longitude range always stays visible.
    pub fn fit_world(width: usize, height: usize) -> Self {
        let top = mercator_y(FIT_NORTH);
        let bottom = mercator_y(FIT_SOUTH);
        let span = bottom - top;
        let zoom = if width == 0 {
            1.0
        } else {
            (height as f64 / (span * width as f64)).min(1.0)
        };
        let center_lat = mercator_lat((top + bottom) / 2.0);
        Self::new(0.0, center_lat, zoom, width, height)
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon + 180.0) / 360.0;
        let y = mercator_y(lat);

        let center_x = (self.center_lon + 180.0) / 360.0;
        let center_y = mercator_y(self.center_lat);
        let scale = self.zoom * self.width as f64;

        let px = ((x - center_x) * scale + self.width as f64 / 2.0) as i32;
        let py = ((y - center_y) * scale + self.height as f64 / 2.0) as i32;

        (px, py)
    }

    /// Unproject (fractional) pixel coordinates back to (lon, lat)
    pub fn unproject(&self, px: f64, py: f64) -> (f64, f64) {
        let scale = self.zoom * self.width as f64;

        let center_x = (self.center_lon + 180.0) / 360.0;
        let center_y = mercator_y(self.center_lat);

        let x = (px - self.width as f64 / 2.0) / scale + center_x;
        let y = (py - self.height as f64 / 2.0) / scale + center_y;

        (x * 360.0 - 180.0, mercator_lat(y))
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        let (x, y) = vp.project(0.0, 0.0);
        assert_eq!(x, 50);
        assert_eq!(y, 50);
    }

    #[test]
    fn test_unproject_round_trips_center() {
        let vp = Viewport::new(10.0, 30.0, 1.0, 200, 100);
        let (lon, lat) = vp.unproject(100.0, 50.0);
        assert!((lon - 10.0).abs() < 1e-9);
        assert!((lat - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_world_keeps_fitted_latitudes_on_canvas() {
        for (w, h) in [(200, 100), (400, 80), (100, 300)] {
            let vp = Viewport::fit_world(w, h);
            assert!(vp.zoom <= 1.0);
            let (_, north) = vp.project(0.0, FIT_NORTH - 0.5);
            let (_, south) = vp.project(0.0, FIT_SOUTH + 0.5);
            assert!(north >= 0, "north edge off canvas for {w}x{h}");
            assert!(south < h as i32, "south edge off canvas for {w}x{h}");
            let (west, _) = vp.project(-179.5, 0.0);
            let (east, _) = vp.project(179.5, 0.0);
            assert!(west >= 0 && east < w as i32);
        }
    }
}
