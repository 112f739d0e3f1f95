use crate::detection::{
    AnnotatedFrame, Frame, RawDetection, VehicleClass, VehicleDetection, VehicleTally,
};
use crate::prelude::{TrafficError, TrafficResult};
use std::collections::BTreeSet;

/// Failure reported by an inference backend.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("inference failed: {0}")]
pub struct DetectorError(pub String);

/// Black-box object detector.
///
/// `allowed` is a hint the backend may use to skip other classes; the adapter
/// filters the output either way.
pub trait Detector {
    fn infer(
        &mut self,
        frame: &Frame,
        allowed: &BTreeSet<VehicleClass>,
    ) -> Result<Vec<RawDetection>, DetectorError>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn infer(
        &mut self,
        frame: &Frame,
        allowed: &BTreeSet<VehicleClass>,
    ) -> Result<Vec<RawDetection>, DetectorError> {
        (**self).infer(frame, allowed)
    }
}

/// Normalizes detector output into vehicle detections and per-class tallies.
pub struct DetectionAdapter<D> {
    detector: D,
    allowed: BTreeSet<VehicleClass>,
}

impl<D: Detector> DetectionAdapter<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            allowed: VehicleClass::ALL.into_iter().collect(),
        }
    }

    pub fn detect(&mut self, frame: Frame) -> TrafficResult<(Vec<VehicleDetection>, AnnotatedFrame)> {
        let raw = self
            .detector
            .infer(&frame, &self.allowed)
            .map_err(|err| TrafficError::Detector(err.to_string()))?;

        let detections = Self::normalize(&raw)?;
        let annotated = AnnotatedFrame {
            frame,
            boxes: detections.clone(),
        };
        Ok((detections, annotated))
    }

    /// Keeps vehicle-class detections; a malformed vehicle rejects the batch.
    pub fn normalize(raw: &[RawDetection]) -> TrafficResult<Vec<VehicleDetection>> {
        let mut detections = Vec::with_capacity(raw.len());
        for candidate in raw {
            if let Some(detection) = VehicleDetection::from_raw(candidate)? {
                detections.push(detection);
            }
        }
        Ok(detections)
    }

    pub fn tally(detections: &[VehicleDetection]) -> VehicleTally {
        VehicleTally::from_detections(detections)
    }
}
