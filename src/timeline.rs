use crate::braille::BrailleCanvas;
use crate::map::draw_polyline;

/// Linear scale between timeline columns and years.
///
/// Works in braille pixels (two per column) so that the curve, the
/// scrubber and pointer hit-testing agree on where each year sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearScale {
    /// First plot column on screen
    x: u16,
    /// Plot width in columns
    width: u16,
    first: i32,
    last: i32,
}

impl YearScale {
    pub fn new(x: u16, width: u16, first: i32, last: i32) -> Self {
        Self { x, width, first, last }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    fn pixel_span(&self) -> f64 {
        (self.width as f64 * 2.0 - 1.0).max(1.0)
    }

    fn ratio(&self, year: i32) -> f64 {
        if self.last == self.first {
            return 0.0;
        }
        ((year - self.first) as f64 / (self.last - self.first) as f64).clamp(0.0, 1.0)
    }

    /// Horizontal braille pixel of a year, relative to the plot
    pub fn pixel_for(&self, year: i32) -> i32 {
        (self.ratio(year) * self.pixel_span()).round() as i32
    }

    /// Screen column of a year
    pub fn column_for(&self, year: i32) -> u16 {
        self.x + (self.pixel_for(year) / 2) as u16
    }

    /// Year under a screen column, rounded to the nearest integer.
    /// Columns outside the plot give `None` and must be ignored, not clamped.
    pub fn year_at(&self, column: u16) -> Option<i32> {
        if self.width == 0 || column < self.x || column >= self.x + self.width {
            return None;
        }
        let t = ((column - self.x) as f64 * 2.0 + 0.5) / self.pixel_span();
        let year = (self.first as f64 + t * (self.last - self.first) as f64).round() as i32;
        (self.first..=self.last).contains(&year).then_some(year)
    }
}

/// The base curve and optional overlay, drawn with shared scales
pub struct TimelineChart {
    pub base: BrailleCanvas,
    pub overlay: Option<BrailleCanvas>,
    /// Top of the vertical scale
    pub max: u64,
}

impl TimelineChart {
    /// Draw `base` (global catches) and `overlay` (hovered country) into a
    /// `cols` x `rows` plot. The overlay reuses the base's scales.
    pub fn draw(
        scale: &YearScale,
        rows: u16,
        base: &[(i32, u64)],
        overlay: Option<&[(i32, u64)]>,
    ) -> Self {
        let cols = scale.width() as usize;
        let rows = rows as usize;
        let max = base
            .iter()
            .chain(overlay.unwrap_or_default())
            .map(|&(_, v)| v)
            .max()
            .unwrap_or(0);

        let plot = |series: &[(i32, u64)]| {
            let mut canvas = BrailleCanvas::new(cols, rows);
            let points: Vec<(i32, i32)> = series
                .iter()
                .map(|&(year, value)| (scale.pixel_for(year), value_to_pixel(value, max, rows * 4)))
                .collect();
            draw_polyline(&mut canvas, &points);
            if points.len() == 1 {
                canvas.set_pixel_signed(points[0].0, points[0].1);
            }
            canvas
        };

        Self {
            base: plot(base),
            overlay: overlay.map(plot),
            max,
        }
    }
}

/// Vertical braille pixel for a value; 0 sits on the bottom row
fn value_to_pixel(value: u64, max: u64, height_px: usize) -> i32 {
    let bottom = height_px.saturating_sub(1) as f64;
    if max == 0 {
        return bottom as i32;
    }
    let t = (value as f64 / max as f64).clamp(0.0, 1.0);
    (bottom - t * bottom).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_at_maps_plot_columns() {
        let scale = YearScale::new(10, 41, 2018, 2020);
        assert_eq!(scale.year_at(10), Some(2018));
        assert_eq!(scale.year_at(30), Some(2019));
        assert_eq!(scale.year_at(50), Some(2020));
    }

    #[test]
    fn test_year_at_outside_plot_is_ignored() {
        let scale = YearScale::new(10, 41, 2018, 2020);
        assert_eq!(scale.year_at(9), None);
        assert_eq!(scale.year_at(51), None);
        assert_eq!(YearScale::new(0, 0, 2018, 2020).year_at(0), None);
    }

    #[test]
    fn test_column_for_inverts_year_at() {
        let scale = YearScale::new(3, 120, 1900, 2020);
        for year in [1900, 1937, 1986, 2020] {
            assert_eq!(scale.year_at(scale.column_for(year)), Some(year));
        }
    }

    #[test]
    fn test_single_year_dataset() {
        let scale = YearScale::new(0, 20, 2020, 2020);
        assert_eq!(scale.year_at(19), Some(2020));
        assert_eq!(scale.column_for(2020), 0);
    }

    #[test]
    fn test_value_to_pixel() {
        assert_eq!(value_to_pixel(0, 100, 8), 7);
        assert_eq!(value_to_pixel(100, 100, 8), 0);
        assert_eq!(value_to_pixel(5, 0, 8), 7);
    }

    #[test]
    fn test_overlay_shares_base_scales() {
        let scale = YearScale::new(0, 10, 2018, 2020);
        let series = [(2018, 10), (2019, 40), (2020, 20)];
        let chart = TimelineChart::draw(&scale, 4, &series, Some(&series));
        assert_eq!(chart.max, 40);
        let overlay = chart.overlay.as_ref().unwrap();
        assert_eq!(overlay.to_string(), chart.base.to_string());
    }

    #[test]
    fn test_no_overlay_when_hover_ends() {
        let scale = YearScale::new(0, 10, 2018, 2020);
        let chart = TimelineChart::draw(&scale, 4, &[(2018, 1), (2019, 2), (2020, 3)], None);
        assert!(chart.overlay.is_none());
    }
}
