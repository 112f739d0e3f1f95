use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::warn;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use trafficcore::detection::Frame;
use trafficcore::prelude::{TrafficError, TrafficResult};
use trafficcore::processing::{
    CaptureSource, DetectionAdapter, Detector, FrameSampler, TrafficStateEstimator,
};
use trafficcore::record::AnalysisRecord;
use trafficcore::sink::{SinkDispatcher, SinkSet};
use trafficcore::telemetry::{MetricsRecorder, MetricsSnapshot};

/// Where finished records go: straight into the sinks on the capture thread,
/// or onto the background dispatcher.
pub enum Delivery {
    Inline(SinkSet),
    Background(SinkDispatcher),
}

impl Delivery {
    fn submit(&mut self, record: AnalysisRecord) {
        match self {
            Delivery::Inline(sinks) => {
                sinks.deliver(&record);
            }
            Delivery::Background(dispatcher) => {
                dispatcher.dispatch(record);
            }
        }
    }

    fn finish(self) {
        if let Delivery::Background(dispatcher) = self {
            dispatcher.shutdown();
        }
    }
}

pub struct RunSummary {
    pub records: usize,
    pub last_record: Option<AnalysisRecord>,
    pub metrics: MetricsSnapshot,
}

pub struct Runner {
    config: WorkflowConfig,
    metrics: Arc<MetricsRecorder>,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(MetricsRecorder::new()),
        }
    }

    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        self.metrics.clone()
    }

    /// Drives capture, sampling, detection, estimation and delivery on the
    /// calling thread until `stop` is raised or `limit` records were produced.
    ///
    /// A frame that fails detection or estimation is skipped; the frame in
    /// flight when `stop` is raised is still completed.
    pub fn run<S, D>(
        &self,
        source: &mut S,
        detector: D,
        mut delivery: Delivery,
        stop: &AtomicBool,
        limit: Option<usize>,
    ) -> anyhow::Result<RunSummary>
    where
        S: CaptureSource + ?Sized,
        D: Detector,
    {
        let mut sampler = FrameSampler::new(self.config.sampler.clone(), self.metrics.clone())
            .context("configuring frame sampler")?;
        let mut estimator = TrafficStateEstimator::new(self.config.estimator.clone())
            .context("configuring traffic-state estimator")?;
        let mut adapter = DetectionAdapter::new(detector);

        let mut records = 0;
        let mut last_record = None;

        while limit.map_or(true, |limit| records < limit) {
            let Some(frame) = sampler.next_frame(source, stop) else {
                break;
            };
            let sequence = frame.sequence;

            match self.process(frame, &mut adapter, &mut estimator) {
                Ok(record) => {
                    records += 1;
                    self.metrics.record_record();
                    last_record = Some(record.clone());
                    delivery.submit(record);
                }
                Err(err) => {
                    self.metrics.record_skipped();
                    warn!("[runner] skipping frame {}: {}", sequence, err);
                }
            }
        }

        delivery.finish();

        Ok(RunSummary {
            records,
            last_record,
            metrics: self.metrics.snapshot(),
        })
    }

    fn process<D: Detector>(
        &self,
        frame: Frame,
        adapter: &mut DetectionAdapter<D>,
        estimator: &mut TrafficStateEstimator,
    ) -> TrafficResult<AnalysisRecord> {
        let (detections, _annotated) = adapter.detect(frame)?;
        let tally = DetectionAdapter::<D>::tally(&detections);
        let count = i64::try_from(detections.len())
            .map_err(|_| TrafficError::InvalidInput("vehicle count overflow".into()))?;
        let snapshot = estimator.update(count)?;
        AnalysisRecord::assemble(
            snapshot,
            tally,
            self.config.source.camera_id.as_str(),
            self.config.source.location.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::scenario::{ScenarioConfig, SyntheticCamera, SyntheticDetector};
    use crate::pubsub::bridge::HttpBridge;
    use std::collections::BTreeSet;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;
    use trafficcore::detection::{BoundingBox, RawDetection, VehicleClass};
    use trafficcore::processing::{CaptureError, DetectorError};
    use trafficcore::record::{DensityClass, Trend};
    use trafficcore::sink::{RecordPublisher, RecordStore, SinkError};

    /// Camera that always succeeds.
    struct CountingCamera(u64);

    impl CaptureSource for CountingCamera {
        fn read(&mut self) -> Result<Frame, CaptureError> {
            self.0 += 1;
            Ok(Frame::blank(self.0, 4, 4, 3))
        }
    }

    /// Detector replaying a fixed script of vehicle counts, one per call.
    struct ScriptedDetector {
        counts: Vec<usize>,
        calls: usize,
    }

    impl Detector for ScriptedDetector {
        fn infer(
            &mut self,
            _frame: &Frame,
            _allowed: &BTreeSet<VehicleClass>,
        ) -> Result<Vec<RawDetection>, DetectorError> {
            let count = self.counts.get(self.calls).copied().unwrap_or(0);
            self.calls += 1;
            let bbox = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
            let mut detections: Vec<_> = (0..count)
                .map(|_| RawDetection::new(bbox, 0.9, "car"))
                .collect();
            detections.push(RawDetection::new(bbox, 0.9, "person"));
            Ok(detections)
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStore(Arc<Mutex<Vec<AnalysisRecord>>>);

    impl RecordStore for MemoryStore {
        fn store(&mut self, record: &AnalysisRecord) -> Result<String, SinkError> {
            let mut records = self.0.lock().unwrap();
            records.push(record.clone());
            Ok(records.len().to_string())
        }
    }

    struct DownBroker;

    impl RecordPublisher for DownBroker {
        fn publish(&mut self, _topic: &str, _payload: &str) -> Result<(), SinkError> {
            Err(SinkError::Unavailable("connection refused".into()))
        }
    }

    fn config(stride: usize) -> WorkflowConfig {
        let mut config = WorkflowConfig::default();
        config.sampler.stride = stride;
        config.sampler.backoff_ms = 0;
        config
    }

    #[test]
    fn rush_hour_script_produces_expected_final_record() {
        let runner = Runner::new(config(5));
        let store = MemoryStore::default();
        let bridge = HttpBridge::new(20);
        let sinks = SinkSet::new(
            Box::new(store.clone()),
            Box::new(bridge.clone()),
            "traffic/data",
            runner.metrics(),
        );
        let detector = ScriptedDetector {
            counts: vec![2, 3, 4, 20, 21, 22, 23, 24, 25, 26],
            calls: 0,
        };
        let stop = AtomicBool::new(false);

        let summary = runner
            .run(
                &mut CountingCamera(0),
                detector,
                Delivery::Inline(sinks),
                &stop,
                Some(10),
            )
            .unwrap();

        assert_eq!(summary.records, 10);
        assert_eq!(summary.metrics.frames_read, 50);
        assert_eq!(summary.metrics.frames_sampled, 10);

        let last = summary.last_record.unwrap();
        assert_eq!(last.snapshot().vehicle_count(), 26);
        assert_eq!(last.snapshot().density(), DensityClass::Critical);
        assert_eq!(last.snapshot().congestion_level(), 52.0);
        assert_eq!(last.snapshot().trend(), Trend::Increasing);
        assert_eq!(last.vehicle_types().get(VehicleClass::Car), Some(26));
        assert_eq!(last.camera_id(), "mobile_cam_001");

        assert_eq!(store.0.lock().unwrap().len(), 10);
        assert_eq!(bridge.latest("traffic/data").unwrap()["vehicle_count"], 26);
    }

    #[test]
    fn sink_failures_do_not_interrupt_the_loop() {
        let runner = Runner::new(config(1));
        let store = MemoryStore::default();
        let sinks = SinkSet::new(
            Box::new(store.clone()),
            Box::new(DownBroker),
            "traffic/data",
            runner.metrics(),
        );
        let detector = ScriptedDetector {
            counts: vec![1; 6],
            calls: 0,
        };
        let stop = AtomicBool::new(false);

        let summary = runner
            .run(
                &mut CountingCamera(0),
                detector,
                Delivery::Inline(sinks),
                &stop,
                Some(6),
            )
            .unwrap();

        assert_eq!(summary.records, 6);
        assert_eq!(summary.metrics.sink_failures, 6);
        assert_eq!(store.0.lock().unwrap().len(), 6);
    }

    #[test]
    fn background_delivery_drains_before_returning() {
        let mut cfg = config(2);
        cfg.scenario = ScenarioConfig {
            failure_rate: 0.2,
            seed: 11,
            ..Default::default()
        };
        let runner = Runner::new(cfg.clone());
        let store = MemoryStore::default();
        let sinks = SinkSet::new(
            Box::new(store.clone()),
            Box::new(HttpBridge::new(5)),
            "traffic/data",
            runner.metrics(),
        );
        let dispatcher = SinkDispatcher::spawn(sinks, 64).unwrap();
        let stop = AtomicBool::new(false);

        let summary = runner
            .run(
                &mut SyntheticCamera::new(&cfg.scenario),
                SyntheticDetector::new(&cfg.scenario),
                Delivery::Background(dispatcher),
                &stop,
                Some(25),
            )
            .unwrap();

        assert_eq!(summary.records, 25);
        assert_eq!(store.0.lock().unwrap().len(), 25);
        assert_eq!(summary.metrics.frames_sampled, 25);
    }

    #[test]
    fn raised_stop_flag_ends_the_run() {
        let runner = Runner::new(config(1));
        let sinks = SinkSet::new(
            Box::new(MemoryStore::default()),
            Box::new(HttpBridge::new(1)),
            "traffic/data",
            runner.metrics(),
        );
        let stop = AtomicBool::new(false);
        stop.store(true, Ordering::SeqCst);

        let summary = runner
            .run(
                &mut CountingCamera(0),
                ScriptedDetector {
                    counts: vec![3],
                    calls: 0,
                },
                Delivery::Inline(sinks),
                &stop,
                None,
            )
            .unwrap();

        assert_eq!(summary.records, 0);
        assert!(summary.last_record.is_none());
    }
}
