use anyhow::ensure;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::PI;
use trafficcore::detection::{BoundingBox, Frame, RawDetection, VehicleClass};
use trafficcore::processing::{CaptureError, CaptureSource, Detector, DetectorError};

/// Shape of the synthetic traffic volume over the frame sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficProfile {
    Steady,
    Ramp,
    RushHour,
}

/// Configuration for the synthetic camera and detector pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub profile: TrafficProfile,
    pub seed: u64,
    pub base_count: u32,
    pub peak_count: u32,
    /// Frames per ramp or per rush-hour cycle.
    pub period_frames: u64,
    pub jitter: u32,
    pub failure_rate: f64,
    /// Chance of an extra non-vehicle detection (pedestrian, bicycle) per frame.
    pub clutter_rate: f64,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            profile: TrafficProfile::RushHour,
            seed: 0,
            base_count: 3,
            peak_count: 30,
            period_frames: 600,
            jitter: 2,
            failure_rate: 0.02,
            clutter_rate: 0.3,
            frame_width: 640,
            frame_height: 480,
        }
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            (0.0..1.0).contains(&self.failure_rate),
            "failure_rate must be in [0, 1)"
        );
        ensure!(
            (0.0..=1.0).contains(&self.clutter_rate),
            "clutter_rate must be in [0, 1]"
        );
        ensure!(self.period_frames > 0, "period_frames must be positive");
        ensure!(
            self.frame_width > 0 && self.frame_height > 0,
            "frame dimensions must be positive"
        );
        Ok(())
    }

    /// Noise-free vehicle count expected on frame `sequence`.
    pub fn expected_count(&self, sequence: u64) -> u32 {
        let base = self.base_count as f64;
        let span = self.peak_count.saturating_sub(self.base_count) as f64;
        let period = self.period_frames.max(1);
        let level = match self.profile {
            TrafficProfile::Steady => 0.0,
            TrafficProfile::Ramp => (sequence as f64 / period as f64).min(1.0),
            TrafficProfile::RushHour => {
                let phase = (sequence % period) as f64 / period as f64;
                (PI * phase).sin().powi(2)
            }
        };
        (base + span * level).round() as u32
    }
}

/// Capture source emitting blank frames with occasional simulated dropouts.
pub struct SyntheticCamera {
    config: ScenarioConfig,
    rng: StdRng,
    sequence: u64,
}

impl SyntheticCamera {
    pub fn new(config: &ScenarioConfig) -> Self {
        Self {
            config: config.clone(),
            rng: StdRng::seed_from_u64(config.seed),
            sequence: 0,
        }
    }
}

impl CaptureSource for SyntheticCamera {
    fn read(&mut self) -> Result<Frame, CaptureError> {
        if self.config.failure_rate > 0.0 && self.rng.gen_bool(self.config.failure_rate) {
            return Err(CaptureError("simulated stream dropout".into()));
        }
        self.sequence += 1;
        Ok(Frame::blank(
            self.sequence,
            self.config.frame_width,
            self.config.frame_height,
            3,
        ))
    }
}

/// Detector following the configured traffic profile.
pub struct SyntheticDetector {
    config: ScenarioConfig,
    rng: StdRng,
}

impl SyntheticDetector {
    pub fn new(config: &ScenarioConfig) -> Self {
        Self {
            config: config.clone(),
            rng: StdRng::seed_from_u64(config.seed.wrapping_add(1)),
        }
    }

    fn random_box(&mut self, frame: &Frame) -> BoundingBox {
        let width = frame.width.max(2) as f32;
        let height = frame.height.max(2) as f32;
        let x1 = self.rng.gen_range(0.0..width / 2.0);
        let y1 = self.rng.gen_range(0.0..height / 2.0);
        let w = self.rng.gen_range(8.0..width / 4.0 + 9.0);
        let h = self.rng.gen_range(8.0..height / 4.0 + 9.0);
        BoundingBox::new(x1, y1, (x1 + w).min(width), (y1 + h).min(height))
    }

    fn random_class(&mut self) -> VehicleClass {
        match self.rng.gen_range(0..20) {
            0..=13 => VehicleClass::Car,
            14..=16 => VehicleClass::Motorcycle,
            17 => VehicleClass::Bus,
            _ => VehicleClass::Truck,
        }
    }
}

impl Detector for SyntheticDetector {
    fn infer(
        &mut self,
        frame: &Frame,
        allowed: &BTreeSet<VehicleClass>,
    ) -> Result<Vec<RawDetection>, DetectorError> {
        let expected = self.config.expected_count(frame.sequence) as i64;
        let jitter = self.config.jitter as i64;
        let count = (expected + self.rng.gen_range(-jitter..=jitter)).max(0);

        let mut detections = Vec::with_capacity(count as usize + 1);
        for _ in 0..count {
            let class = self.random_class();
            if !allowed.contains(&class) {
                continue;
            }
            let bbox = self.random_box(frame);
            let confidence = self.rng.gen_range(0.35..0.98);
            detections.push(RawDetection::new(bbox, confidence, class.as_str()));
        }

        if self.config.clutter_rate > 0.0 && self.rng.gen_bool(self.config.clutter_rate) {
            let label = if self.rng.gen_bool(0.5) { "person" } else { "bicycle" };
            let bbox = self.random_box(frame);
            detections.push(RawDetection::new(bbox, 0.5, label));
        }

        Ok(detections)
    }
}
