use crate::record::AnalysisRecord;
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;
use std::sync::Arc;

/// Failure reported by a persistence or pub/sub sink.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("sink i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Document store accepting analysis records.
pub trait RecordStore: Send {
    /// Persists `record` and returns the id assigned by the store.
    fn store(&mut self, record: &AnalysisRecord) -> Result<String, SinkError>;
}

/// Pub/sub transport.
pub trait RecordPublisher: Send {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), SinkError>;
}

/// Outcome of one delivery attempt. Failures are already logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub stored_id: Option<String>,
    pub published: bool,
}

/// Persistence and pub/sub sinks invoked together, once per record.
pub struct SinkSet {
    store: Box<dyn RecordStore>,
    publisher: Box<dyn RecordPublisher>,
    topic: String,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl SinkSet {
    pub fn new(
        store: Box<dyn RecordStore>,
        publisher: Box<dyn RecordPublisher>,
        topic: impl Into<String>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            store,
            publisher,
            topic: topic.into(),
            metrics,
            logger: LogManager::new("sinks"),
        }
    }

    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        self.metrics.clone()
    }

    /// Stores and publishes `record` exactly once each. Nothing is retried and
    /// no failure escapes.
    pub fn deliver(&mut self, record: &AnalysisRecord) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        match self.store.store(record) {
            Ok(id) => report.stored_id = Some(id),
            Err(err) => {
                self.metrics.record_sink_failure();
                self.logger.warn(&format!("store failed for {}: {}", record.camera_id(), err));
            }
        }

        let published = record
            .to_payload()
            .map_err(SinkError::from)
            .and_then(|payload| self.publisher.publish(&self.topic, &payload));
        match published {
            Ok(()) => report.published = true,
            Err(err) => {
                self.metrics.record_sink_failure();
                self.logger.warn(&format!("publish to {} failed: {}", self.topic, err));
            }
        }

        report
    }
}
