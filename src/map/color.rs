use ratatui::style::Color;

/// Low end of the catch ramp (pale blue)
pub const RAMP_LOW: (u8, u8, u8) = (198, 219, 239);
/// High end of the catch ramp (deep navy)
pub const RAMP_HIGH: (u8, u8, u8) = (8, 48, 107);
/// Countries without catches. Deliberately off the ramp.
pub const NO_DATA: Color = Color::Rgb(52, 56, 62);
/// Fill for the hovered country and its territories
pub const HIGHLIGHT: Color = Color::Rgb(230, 120, 40);

/// Linear mapping from `[0, max]` onto the RAMP_LOW..RAMP_HIGH ramp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    max: f64,
}

impl ColorScale {
    pub fn new(max: u64) -> Self {
        Self { max: max as f64 }
    }

    /// Position of a value on the ramp, clamped to [0, 1]
    pub fn ratio(&self, value: u64) -> f64 {
        if self.max <= 0.0 {
            return 0.0;
        }
        (value as f64 / self.max).clamp(0.0, 1.0)
    }

    pub fn color(&self, value: u64) -> Color {
        ramp(self.ratio(value))
    }
}

/// Interpolated ramp color at `t` in [0, 1]
pub fn ramp(t: f64) -> Color {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    Color::Rgb(
        lerp(RAMP_LOW.0, RAMP_HIGH.0),
        lerp(RAMP_LOW.1, RAMP_HIGH.1),
        lerp(RAMP_LOW.2, RAMP_HIGH.2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ends_of_the_ramp() {
        let scale = ColorScale::new(200);
        assert_eq!(scale.color(0), Color::Rgb(RAMP_LOW.0, RAMP_LOW.1, RAMP_LOW.2));
        assert_eq!(scale.color(200), Color::Rgb(RAMP_HIGH.0, RAMP_HIGH.1, RAMP_HIGH.2));
        assert_eq!(scale.color(500), scale.color(200));
    }

    #[test]
    fn test_midpoint() {
        let scale = ColorScale::new(100);
        assert!((scale.ratio(50) - 0.5).abs() < 1e-12);
        assert_eq!(scale.color(50), Color::Rgb(103, 134, 173));
    }

    #[test]
    fn test_empty_domain() {
        let scale = ColorScale::new(0);
        assert_eq!(scale.ratio(10), 0.0);
    }

    #[test]
    fn test_no_data_is_off_ramp() {
        for t in 0..=10 {
            assert_ne!(ramp(t as f64 / 10.0), NO_DATA);
        }
    }
}
