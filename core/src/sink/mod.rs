pub mod dispatcher;
pub mod sinks;

pub use dispatcher::SinkDispatcher;
pub use sinks::{DeliveryReport, RecordPublisher, RecordStore, SinkError, SinkSet};
