pub mod adapter;
pub mod estimator;
pub mod sampler;
pub mod window;

pub use adapter::{DetectionAdapter, Detector, DetectorError};
pub use estimator::TrafficStateEstimator;
pub use sampler::{CaptureError, CaptureSource, FrameSampler};
pub use window::RollingWindow;
