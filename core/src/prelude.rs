use serde::{Deserialize, Serialize};

/// Largest rolling window the estimator accepts.
pub const MAX_WINDOW_SIZE: usize = 1_000_000;

/// Ascending count thresholds separating the density classes.
///
/// Intervals are right-open: `count < low` is low, `count < medium` is medium,
/// `count < high` is high and everything else is critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityThresholds {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

impl Default for DensityThresholds {
    fn default() -> Self {
        Self {
            low: 5,
            medium: 15,
            high: 25,
        }
    }
}

/// Tunables of the traffic-state estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub window_size: usize,
    pub density: DensityThresholds,
    pub road_capacity: u64,
    pub trend_lookback: usize,
    pub trend_slope_threshold: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            window_size: 30,
            density: DensityThresholds::default(),
            road_capacity: 50,
            trend_lookback: 10,
            trend_slope_threshold: 0.5,
        }
    }
}

impl EstimatorConfig {
    /// Rejects configurations the estimator cannot run with.
    pub fn validate(&self) -> TrafficResult<()> {
        if self.window_size == 0 {
            return Err(TrafficError::Config("window_size must be positive".into()));
        }
        if self.window_size > MAX_WINDOW_SIZE {
            return Err(TrafficError::Config(format!(
                "window_size must not exceed {}, got {}",
                MAX_WINDOW_SIZE, self.window_size
            )));
        }
        if self.road_capacity == 0 {
            return Err(TrafficError::Config(
                "road_capacity must be positive".into(),
            ));
        }
        let DensityThresholds { low, medium, high } = self.density;
        if !(low < medium && medium < high) {
            return Err(TrafficError::Config(format!(
                "density thresholds must be strictly ascending, got {}/{}/{}",
                low, medium, high
            )));
        }
        if self.trend_lookback < 2 {
            return Err(TrafficError::Config(
                "trend_lookback must cover at least 2 samples".into(),
            ));
        }
        if !self.trend_slope_threshold.is_finite() || self.trend_slope_threshold < 0.0 {
            return Err(TrafficError::Config(
                "trend_slope_threshold must be a finite, non-negative number".into(),
            ));
        }
        Ok(())
    }
}

/// Frame-dropping policy applied in front of the detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub stride: usize,
    pub backoff_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            stride: 5,
            backoff_ms: 1000,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> TrafficResult<()> {
        if self.stride == 0 {
            return Err(TrafficError::Config("sample stride must be positive".into()));
        }
        Ok(())
    }
}

/// Common error type for the estimation core.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TrafficError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("incomplete record: missing {0}")]
    IncompleteRecord(&'static str),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("detector failure: {0}")]
    Detector(String),
}

pub type TrafficResult<T> = Result<T, TrafficError>;
