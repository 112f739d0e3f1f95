use crate::record::AnalysisRecord;
use crate::sink::SinkSet;
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Fire-and-forget hand-off of records to a background sink worker.
///
/// Each record is queued at most once and delivered at most once. The capture
/// loop never waits on the queue: a full or closed queue drops the record.
pub struct SinkDispatcher {
    sender: mpsc::Sender<AnalysisRecord>,
    worker: Option<JoinHandle<usize>>,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl SinkDispatcher {
    pub fn spawn(mut sinks: SinkSet, queue_depth: usize) -> std::io::Result<Self> {
        let (sender, mut receiver) = mpsc::channel::<AnalysisRecord>(queue_depth.max(1));
        let metrics = sinks.metrics();

        let worker = thread::Builder::new()
            .name("sink-dispatch".into())
            .spawn(move || {
                let mut delivered = 0;
                while let Some(record) = receiver.blocking_recv() {
                    sinks.deliver(&record);
                    delivered += 1;
                }
                delivered
            })?;

        Ok(Self {
            sender,
            worker: Some(worker),
            metrics,
            logger: LogManager::new("dispatcher"),
        })
    }

    /// Queues `record` without blocking. Returns whether it was accepted.
    pub fn dispatch(&self, record: AnalysisRecord) -> bool {
        match self.sender.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(record)) => {
                self.metrics.record_dropped_dispatch();
                self.logger.warn(&format!(
                    "sink queue full, dropping record from {}",
                    record.camera_id()
                ));
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.metrics.record_dropped_dispatch();
                self.logger.warn("sink worker gone, dropping record");
                false
            }
        }
    }

    /// Closes the queue, lets the worker drain it and returns how many
    /// records it handled.
    pub fn shutdown(mut self) -> usize {
        let worker = self.worker.take();
        drop(self.sender);
        match worker.map(JoinHandle::join) {
            Some(Ok(delivered)) => {
                self.logger
                    .record(&format!("sink worker drained after {} records", delivered));
                delivered
            }
            Some(Err(_)) => {
                self.logger.warn("sink worker panicked");
                0
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::sinks::tests::{record, Recorder};

    #[test]
    fn queued_records_are_delivered_before_shutdown_returns() {
        let recorder = Recorder::default();
        let metrics = Arc::new(MetricsRecorder::new());
        let sinks = SinkSet::new(
            Box::new(recorder.clone()),
            Box::new(recorder.clone()),
            "traffic/data",
            metrics.clone(),
        );
        let dispatcher = SinkDispatcher::spawn(sinks, 16).unwrap();

        for count in 0..5 {
            assert!(dispatcher.dispatch(record(count)));
        }
        assert_eq!(dispatcher.shutdown(), 5);
        assert_eq!(recorder.stored.lock().unwrap().len(), 5);
        assert_eq!(recorder.published.lock().unwrap().len(), 5);
    }

    #[test]
    fn failing_sinks_do_not_stop_the_worker() {
        let recorder = Recorder {
            fail: true,
            ..Default::default()
        };
        let metrics = Arc::new(MetricsRecorder::new());
        let sinks = SinkSet::new(
            Box::new(recorder.clone()),
            Box::new(recorder),
            "traffic/data",
            metrics.clone(),
        );
        let dispatcher = SinkDispatcher::spawn(sinks, 4).unwrap();
        dispatcher.dispatch(record(1));
        dispatcher.dispatch(record(2));
        assert_eq!(dispatcher.shutdown(), 2);
        assert_eq!(metrics.snapshot().sink_failures, 4);
    }
}
