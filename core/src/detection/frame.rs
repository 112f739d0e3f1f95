use crate::detection::VehicleDetection;

/// Opaque pixel buffer handed from the capture source to the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// 1-based position of the frame in the stream of successful reads.
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn new(sequence: u64, width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> Self {
        Self {
            sequence,
            width,
            height,
            channels,
            pixels,
        }
    }

    /// Zero-filled frame of the given geometry.
    pub fn blank(sequence: u64, width: u32, height: u32, channels: u8) -> Self {
        let len = width as usize * height as usize * channels as usize;
        Self::new(sequence, width, height, channels, vec![0; len])
    }
}

/// A frame together with the vehicle boxes found on it.
#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    pub frame: Frame,
    pub boxes: Vec<VehicleDetection>,
}

impl AnnotatedFrame {
    /// Overlay captions in `"<label> <confidence>"` form, one per box.
    pub fn labels(&self) -> Vec<String> {
        self.boxes
            .iter()
            .map(|det| format!("{} {:.2}", det.class.as_str(), det.confidence))
            .collect()
    }
}
