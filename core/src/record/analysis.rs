use crate::detection::VehicleTally;
use crate::prelude::{TrafficError, TrafficResult};
use crate::record::TrafficSnapshot;
use serde::{Deserialize, Serialize};

/// Unit of work handed to persistence and pub/sub.
///
/// Serializes to a flat object: the snapshot fields, `vehicle_types` as a
/// nested class mapping, then the source identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(flatten)]
    snapshot: TrafficSnapshot,
    vehicle_types: VehicleTally,
    camera_id: String,
    location: String,
}

impl AnalysisRecord {
    pub fn assemble(
        snapshot: TrafficSnapshot,
        tally: VehicleTally,
        camera_id: impl Into<String>,
        location: impl Into<String>,
    ) -> TrafficResult<Self> {
        AnalysisRecordBuilder::new()
            .snapshot(snapshot)
            .tally(tally)
            .camera_id(camera_id)
            .location(location)
            .build()
    }

    pub fn snapshot(&self) -> &TrafficSnapshot {
        &self.snapshot
    }

    pub fn vehicle_types(&self) -> &VehicleTally {
        &self.vehicle_types
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// JSON payload published on the pub/sub topic.
    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Default)]
pub struct AnalysisRecordBuilder {
    snapshot: Option<TrafficSnapshot>,
    tally: Option<VehicleTally>,
    camera_id: Option<String>,
    location: Option<String>,
}

impl AnalysisRecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(mut self, snapshot: TrafficSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn tally(mut self, tally: VehicleTally) -> Self {
        self.tally = Some(tally);
        self
    }

    pub fn camera_id(mut self, camera_id: impl Into<String>) -> Self {
        self.camera_id = Some(camera_id.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn build(self) -> TrafficResult<AnalysisRecord> {
        let snapshot = self
            .snapshot
            .ok_or(TrafficError::IncompleteRecord("snapshot"))?;
        let tally = self.tally.ok_or(TrafficError::IncompleteRecord("tally"))?;
        let camera_id = non_blank(self.camera_id).ok_or(TrafficError::IncompleteRecord("camera_id"))?;
        let location = non_blank(self.location).ok_or(TrafficError::IncompleteRecord("location"))?;

        if tally.total() as u64 != snapshot.vehicle_count() {
            return Err(TrafficError::InvalidInput(format!(
                "tally holds {} vehicles but snapshot counted {}",
                tally.total(),
                snapshot.vehicle_count()
            )));
        }

        Ok(AnalysisRecord {
            snapshot,
            vehicle_types: tally,
            camera_id,
            location,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::VehicleClass;
    use crate::record::{DensityClass, Trend};
    use chrono::{TimeZone, Utc};

    fn snapshot(count: u64) -> TrafficSnapshot {
        TrafficSnapshot::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap(),
            count,
            1.5,
            DensityClass::Low,
            count as f64 * 2.0,
            Trend::Stable,
        )
    }

    fn tally_of(classes: &[VehicleClass]) -> VehicleTally {
        let mut tally = VehicleTally::new();
        for class in classes {
            tally.record(*class);
        }
        tally
    }

    #[test]
    fn builder_requires_every_field() {
        let err = AnalysisRecordBuilder::new()
            .snapshot(snapshot(0))
            .tally(VehicleTally::new())
            .location("Main Street")
            .build()
            .unwrap_err();
        assert_eq!(err, TrafficError::IncompleteRecord("camera_id"));

        let err = AnalysisRecord::assemble(snapshot(0), VehicleTally::new(), "cam", "  ")
            .unwrap_err();
        assert_eq!(err, TrafficError::IncompleteRecord("location"));
    }

    #[test]
    fn mismatched_tally_is_rejected() {
        let tally = tally_of(&[VehicleClass::Car]);
        let err = AnalysisRecord::assemble(snapshot(3), tally, "cam", "Main Street").unwrap_err();
        assert!(matches!(err, TrafficError::InvalidInput(_)));
    }

    #[test]
    fn payload_is_flat_json_with_iso_timestamp() {
        let tally = tally_of(&[VehicleClass::Car, VehicleClass::Bus]);
        let record = AnalysisRecord::assemble(snapshot(2), tally, "cam_7", "Bridge Rd").unwrap();
        let value: serde_json::Value = serde_json::from_str(&record.to_payload().unwrap()).unwrap();

        assert_eq!(value["timestamp"], "2024-05-01T08:30:00Z");
        assert_eq!(value["vehicle_count"], 2);
        assert_eq!(value["traffic_density"], "low");
        assert_eq!(value["congestion_level"], 4.0);
        assert_eq!(value["trend"], "stable");
        assert_eq!(value["vehicle_types"], serde_json::json!({"car": 1, "bus": 1}));
        assert_eq!(value["camera_id"], "cam_7");
        assert_eq!(value["location"], "Bridge Rd");
        assert!(value.get("snapshot").is_none());
    }
}
