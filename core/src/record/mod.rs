pub mod analysis;
pub mod snapshot;

pub use analysis::{AnalysisRecord, AnalysisRecordBuilder};
pub use snapshot::{DensityClass, TrafficSnapshot, Trend};
