use crate::detection::{VehicleClass, VehicleDetection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-class vehicle counts for one frame.
///
/// Classes that were not seen are absent rather than zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleTally {
    counts: BTreeMap<VehicleClass, usize>,
}

impl VehicleTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_detections(detections: &[VehicleDetection]) -> Self {
        let mut tally = Self::new();
        for detection in detections {
            tally.record(detection.class);
        }
        tally
    }

    pub fn record(&mut self, class: VehicleClass) {
        *self.counts.entry(class).or_insert(0) += 1;
    }

    pub fn get(&self, class: VehicleClass) -> Option<usize> {
        self.counts.get(&class).copied()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
