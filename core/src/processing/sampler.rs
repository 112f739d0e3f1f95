use crate::detection::Frame;
use crate::prelude::{SamplerConfig, TrafficResult};
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep while backing off; `stop` is re-checked after each.
const BACKOFF_SLICE: Duration = Duration::from_millis(50);

/// Transient failure reading from a capture source.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("capture read failed: {0}")]
pub struct CaptureError(pub String);

/// Provider of frames, read one at a time on demand.
pub trait CaptureSource {
    fn read(&mut self) -> Result<Frame, CaptureError>;
}

/// Fixed-stride frame dropper with retry-on-failure reads.
pub struct FrameSampler {
    config: SamplerConfig,
    frames_read: u64,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl FrameSampler {
    pub fn new(config: SamplerConfig, metrics: Arc<MetricsRecorder>) -> TrafficResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            frames_read: 0,
            metrics,
            logger: LogManager::new("sampler"),
        })
    }

    /// Whether the `sequence`-th successful read (1-based) goes to detection.
    pub fn should_forward(&self, sequence: u64) -> bool {
        sequence > 0 && sequence % self.config.stride as u64 == 0
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Reads until the next stride frame, or until `stop` is raised.
    ///
    /// Read failures are retried after the configured backoff for as long as
    /// the stream runs; raising `stop` cuts a backoff short. Frames between
    /// strides are dropped on the spot.
    pub fn next_frame<S>(&mut self, source: &mut S, stop: &AtomicBool) -> Option<Frame>
    where
        S: CaptureSource + ?Sized,
    {
        let backoff = Duration::from_millis(self.config.backoff_ms);

        while !stop.load(Ordering::SeqCst) {
            match source.read() {
                Ok(frame) => {
                    self.frames_read += 1;
                    self.metrics.record_frame_read();
                    if self.should_forward(self.frames_read) {
                        self.metrics.record_frame_sampled();
                        return Some(frame);
                    }
                }
                Err(err) => {
                    self.metrics.record_capture_failure();
                    self.logger
                        .warn(&format!("{}, retrying in {} ms", err, self.config.backoff_ms));
                    Self::back_off(backoff, stop);
                }
            }
        }

        None
    }

    fn back_off(backoff: Duration, stop: &AtomicBool) {
        let deadline = Instant::now() + backoff;
        while !stop.load(Ordering::SeqCst) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            thread::sleep(remaining.min(BACKOFF_SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ScriptedSource {
        script: VecDeque<bool>,
        sequence: u64,
        stop_when_empty: Arc<AtomicBool>,
    }

    impl ScriptedSource {
        fn new(script: &[bool], stop: Arc<AtomicBool>) -> Self {
            Self {
                script: script.iter().copied().collect(),
                sequence: 0,
                stop_when_empty: stop,
            }
        }
    }

    impl CaptureSource for ScriptedSource {
        fn read(&mut self) -> Result<Frame, CaptureError> {
            let ok = self.script.pop_front().unwrap_or(false);
            if self.script.is_empty() {
                self.stop_when_empty.store(true, Ordering::SeqCst);
            }
            if ok {
                self.sequence += 1;
                Ok(Frame::blank(self.sequence, 4, 4, 3))
            } else {
                Err(CaptureError("no signal".into()))
            }
        }
    }

    fn sampler(stride: usize) -> (FrameSampler, Arc<MetricsRecorder>) {
        let metrics = Arc::new(MetricsRecorder::new());
        let config = SamplerConfig {
            stride,
            backoff_ms: 0,
        };
        (FrameSampler::new(config, metrics.clone()).unwrap(), metrics)
    }

    #[test]
    fn forwards_every_nth_frame() {
        let (mut sampler, metrics) = sampler(5);
        let stop = Arc::new(AtomicBool::new(false));
        let mut source = ScriptedSource::new(&[true; 12], stop.clone());

        let mut forwarded = Vec::new();
        while let Some(frame) = sampler.next_frame(&mut source, &stop) {
            forwarded.push(frame.sequence);
        }

        assert_eq!(forwarded, vec![5, 10]);
        assert_eq!(metrics.snapshot().frames_read, 12);
        assert_eq!(metrics.snapshot().frames_sampled, 2);
    }

    #[test]
    fn read_failures_are_retried_not_counted() {
        let (mut sampler, metrics) = sampler(2);
        let stop = Arc::new(AtomicBool::new(false));
        let mut source = ScriptedSource::new(&[true, false, false, true, true], stop.clone());

        let frame = sampler.next_frame(&mut source, &stop).unwrap();
        assert_eq!(frame.sequence, 2);
        assert_eq!(metrics.snapshot().capture_failures, 2);
        assert_eq!(sampler.frames_read(), 2);
    }

    #[test]
    fn raised_stop_ends_sampling_without_reading() {
        let (mut sampler, metrics) = sampler(1);
        let stop = AtomicBool::new(true);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let mut source = ScriptedSource::new(&[true, true], stop_flag);

        assert!(sampler.next_frame(&mut source, &stop).is_none());
        assert_eq!(metrics.snapshot().frames_read, 0);
    }

    struct DeadSource;

    impl CaptureSource for DeadSource {
        fn read(&mut self) -> Result<Frame, CaptureError> {
            Err(CaptureError("device unplugged".into()))
        }
    }

    #[test]
    fn stop_interrupts_a_long_backoff() {
        let metrics = Arc::new(MetricsRecorder::new());
        let config = SamplerConfig {
            stride: 1,
            backoff_ms: 60_000,
        };
        let mut sampler = FrameSampler::new(config, metrics.clone()).unwrap();
        let stop = Arc::new(AtomicBool::new(false));

        let raiser = {
            let stop = stop.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                stop.store(true, Ordering::SeqCst);
            })
        };

        let started = Instant::now();
        assert!(sampler.next_frame(&mut DeadSource, &stop).is_none());
        raiser.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(metrics.snapshot().capture_failures, 1);
    }

    #[test]
    fn stride_one_forwards_everything() {
        let (sampler, _) = sampler(1);
        assert!((1..20).all(|seq| sampler.should_forward(seq)));
        assert!(!sampler.should_forward(0));
    }
}
