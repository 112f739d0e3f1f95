use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse occupancy class derived from the instantaneous vehicle count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityClass {
    Low,
    Medium,
    High,
    Critical,
}

impl DensityClass {
    pub fn as_str(self) -> &'static str {
        match self {
            DensityClass::Low => "low",
            DensityClass::Medium => "medium",
            DensityClass::High => "high",
            DensityClass::Critical => "critical",
        }
    }
}

impl fmt::Display for DensityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of the short look-back count slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estimator output for a single update. Read-only once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSnapshot {
    timestamp: DateTime<Utc>,
    vehicle_count: u64,
    average_count: f64,
    #[serde(rename = "traffic_density")]
    density: DensityClass,
    congestion_level: f64,
    trend: Trend,
}

impl TrafficSnapshot {
    pub fn new(
        timestamp: DateTime<Utc>,
        vehicle_count: u64,
        average_count: f64,
        density: DensityClass,
        congestion_level: f64,
        trend: Trend,
    ) -> Self {
        Self {
            timestamp,
            vehicle_count,
            average_count,
            density,
            congestion_level,
            trend,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn vehicle_count(&self) -> u64 {
        self.vehicle_count
    }

    pub fn average_count(&self) -> f64 {
        self.average_count
    }

    pub fn density(&self) -> DensityClass {
        self.density
    }

    /// Percentage of road capacity in `0..=100`.
    pub fn congestion_level(&self) -> f64 {
        self.congestion_level
    }

    pub fn trend(&self) -> Trend {
        self.trend
    }
}
