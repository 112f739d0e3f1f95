use std::sync::Mutex;

/// Pipeline counters shared between the capture loop and the sink worker.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

/// Point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_read: usize,
    pub frames_sampled: usize,
    pub capture_failures: usize,
    pub records: usize,
    pub skipped_frames: usize,
    pub sink_failures: usize,
    pub dropped_dispatches: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn bump(&self, field: impl FnOnce(&mut MetricsSnapshot) -> &mut usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            *field(&mut *metrics) += 1;
        }
    }

    pub fn record_frame_read(&self) {
        self.bump(|m| &mut m.frames_read);
    }

    pub fn record_frame_sampled(&self) {
        self.bump(|m| &mut m.frames_sampled);
    }

    pub fn record_capture_failure(&self) {
        self.bump(|m| &mut m.capture_failures);
    }

    pub fn record_record(&self) {
        self.bump(|m| &mut m.records);
    }

    pub fn record_skipped(&self) {
        self.bump(|m| &mut m.skipped_frames);
    }

    pub fn record_sink_failure(&self) {
        self.bump(|m| &mut m.sink_failures);
    }

    pub fn record_dropped_dispatch(&self) {
        self.bump(|m| &mut m.dropped_dispatches);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().map(|m| *m).unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
