use ndarray::{Array1, ArrayView1};

pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(samples: &[f64]) -> f64 {
        ArrayView1::from(samples).mean().unwrap_or(0.0)
    }

    /// Slope of the first-degree least-squares fit of `samples` against
    /// their indices `0..len`. Fewer than two samples have no slope.
    pub fn linear_slope(samples: &[f64]) -> Option<f64> {
        if samples.len() < 2 {
            return None;
        }
        let y = ArrayView1::from(samples);
        let x = Array1::range(0.0, samples.len() as f64, 1.0);

        let dx = &x - x.mean()?;
        let dy = &y - y.mean()?;
        let spread = dx.dot(&dx);
        if spread == 0.0 {
            return Some(0.0);
        }
        Some(dx.dot(&dy) / spread)
    }
}
