use std::fmt;

/// A completion percentage between 0 and 100 inclusive.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Default)]
pub struct Progress(f64);

impl Progress {
    /// Lowest representable value.
    pub const MIN: Progress = Progress(0.0);
    /// Highest representable value.
    pub const MAX: Progress = Progress(100.0);

    /// Create a progress value, clamping into `0..=100`.  NaN maps to zero.
    pub fn new(percent: f64) -> Self {
        if percent.is_nan() {
            return Self::MIN;
        }
        Self(percent.clamp(0.0, 100.0))
    }

    /// The percentage as a float.
    pub fn percent(&self) -> f64 {
        self.0
    }

    /// The share of `cells` that should be filled when drawing a bar.
    pub fn filled_cells(&self, cells: usize) -> usize {
        ((self.0 / 100.0) * cells as f64).round() as usize
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{}%", self.0 as u32)
        } else {
            write!(f, "{:.1}%", self.0)
        }
    }
}

impl From<f64> for Progress {
    fn from(percent: f64) -> Self {
        Self::new(percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range() {
        assert_eq!(Progress::new(-5.0), Progress::MIN);
        assert_eq!(Progress::new(250.0), Progress::MAX);
        assert_eq!(Progress::new(f64::NAN), Progress::MIN);
        assert_eq!(Progress::new(40.0).percent(), 40.0);
    }

    #[test]
    fn display() {
        assert_eq!(Progress::new(40.0).to_string(), "40%");
        assert_eq!(Progress::new(12.5).to_string(), "12.5%");
    }

    #[test]
    fn filled_cells() {
        assert_eq!(Progress::new(0.0).filled_cells(20), 0);
        assert_eq!(Progress::new(45.0).filled_cells(20), 9);
        assert_eq!(Progress::new(100.0).filled_cells(20), 20);
    }
}
