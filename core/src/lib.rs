//! Traffic-state estimation core.
//!
//! Frames are sampled from a capture source, narrowed to vehicle detections,
//! folded into a rolling window of counts and turned into analysis records
//! for persistence and pub/sub sinks.

pub mod detection;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod record;
pub mod sink;
pub mod telemetry;

pub use prelude::{EstimatorConfig, SamplerConfig, TrafficError, TrafficResult};
