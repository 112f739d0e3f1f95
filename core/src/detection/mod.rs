pub mod frame;
pub mod tally;
pub mod vehicle;

pub use frame::{AnnotatedFrame, Frame};
pub use tally::VehicleTally;
pub use vehicle::{BoundingBox, RawDetection, VehicleClass, VehicleDetection};
