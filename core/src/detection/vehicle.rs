use crate::prelude::{TrafficError, TrafficResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed vehicle taxonomy accepted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    Car,
    Motorcycle,
    Bus,
    Truck,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 4] = [
        VehicleClass::Car,
        VehicleClass::Motorcycle,
        VehicleClass::Bus,
        VehicleClass::Truck,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VehicleClass::Car => "car",
            VehicleClass::Motorcycle => "motorcycle",
            VehicleClass::Bus => "bus",
            VehicleClass::Truck => "truck",
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleClass {
    type Err = TrafficError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        VehicleClass::ALL
            .into_iter()
            .find(|class| class.as_str().eq_ignore_ascii_case(label.trim()))
            .ok_or_else(|| TrafficError::InvalidInput(format!("not a vehicle class: {}", label)))
    }
}

/// Axis-aligned box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn is_well_formed(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
            && self.x1 <= self.x2
            && self.y1 <= self.y2
    }
}

/// Detector output before it is narrowed to the vehicle taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub label: String,
}

impl RawDetection {
    pub fn new(bbox: BoundingBox, confidence: f32, label: impl Into<String>) -> Self {
        Self {
            bbox,
            confidence,
            label: label.into(),
        }
    }
}

/// One detected vehicle on a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleDetection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class: VehicleClass,
}

impl VehicleDetection {
    /// Narrows a raw detection to a vehicle.
    ///
    /// Returns `Ok(None)` for labels outside the vehicle taxonomy and an
    /// `InvalidInput` error when a vehicle detection carries an out-of-range
    /// confidence or a degenerate box.
    pub fn from_raw(raw: &RawDetection) -> TrafficResult<Option<Self>> {
        let class = match raw.label.parse::<VehicleClass>() {
            Ok(class) => class,
            Err(_) => return Ok(None),
        };

        if !(0.0..=1.0).contains(&raw.confidence) {
            return Err(TrafficError::InvalidInput(format!(
                "{} detection confidence {} outside [0, 1]",
                class, raw.confidence
            )));
        }
        if !raw.bbox.is_well_formed() {
            return Err(TrafficError::InvalidInput(format!(
                "{} detection has malformed box {:?}",
                class, raw.bbox
            )));
        }

        Ok(Some(Self {
            bbox: raw.bbox,
            confidence: raw.confidence,
            class,
        }))
    }
}
