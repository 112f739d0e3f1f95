use crate::math::stats::StatsHelper;
use crate::prelude::{EstimatorConfig, TrafficError, TrafficResult};
use crate::processing::window::RollingWindow;
use crate::record::{DensityClass, TrafficSnapshot, Trend};
use crate::telemetry::log::LogManager;
use chrono::{DateTime, Utc};

/// Rolling traffic-state estimator.
///
/// Single writer: `update` takes `&mut self` and the pipeline feeds it one
/// count per processed frame in arrival order, so the window needs no locking.
pub struct TrafficStateEstimator {
    window: RollingWindow,
    config: EstimatorConfig,
    logger: LogManager,
}

impl TrafficStateEstimator {
    pub fn new(config: EstimatorConfig) -> TrafficResult<Self> {
        config.validate()?;
        Ok(Self {
            window: RollingWindow::with_capacity(config.window_size),
            config,
            logger: LogManager::new("estimator"),
        })
    }

    pub fn update(&mut self, count: i64) -> TrafficResult<TrafficSnapshot> {
        self.update_at(count, Utc::now())
    }

    /// Folds `count` into the window and classifies the new state.
    ///
    /// A negative count is rejected before the window is touched.
    pub fn update_at(
        &mut self,
        count: i64,
        timestamp: DateTime<Utc>,
    ) -> TrafficResult<TrafficSnapshot> {
        let count = u64::try_from(count).map_err(|_| {
            TrafficError::InvalidInput(format!("vehicle count must be non-negative, got {}", count))
        })?;

        self.window.push(count);

        let snapshot = TrafficSnapshot::new(
            timestamp,
            count,
            StatsHelper::mean(&self.window.values()),
            self.classify(count),
            self.congestion(count),
            self.trend(),
        );

        self.logger.detail(&format!(
            "count {} avg {:.2} density {} congestion {:.1}% trend {}",
            snapshot.vehicle_count(),
            snapshot.average_count(),
            snapshot.density(),
            snapshot.congestion_level(),
            snapshot.trend()
        ));

        Ok(snapshot)
    }

    /// Density class of an instantaneous count; first ascending threshold wins.
    pub fn classify(&self, count: u64) -> DensityClass {
        let thresholds = &self.config.density;
        if count < thresholds.low {
            DensityClass::Low
        } else if count < thresholds.medium {
            DensityClass::Medium
        } else if count < thresholds.high {
            DensityClass::High
        } else {
            DensityClass::Critical
        }
    }

    /// Count as a percentage of road capacity, clamped to `0..=100`.
    pub fn congestion(&self, count: u64) -> f64 {
        let percent = count as f64 / self.config.road_capacity as f64 * 100.0;
        percent.clamp(0.0, 100.0)
    }

    /// Trend of the newest `trend_lookback` counts. Fewer than two samples
    /// are always stable.
    pub fn trend(&self) -> Trend {
        let recent = self.window.tail(self.config.trend_lookback);
        let threshold = self.config.trend_slope_threshold;
        match StatsHelper::linear_slope(&recent) {
            Some(slope) if slope > threshold => Trend::Increasing,
            Some(slope) if slope < -threshold => Trend::Decreasing,
            _ => Trend::Stable,
        }
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn window_capacity(&self) -> usize {
        self.window.capacity()
    }
}
