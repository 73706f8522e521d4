use serde::{Deserialize, Serialize};

/// Distance below which a prediction counts as a known face.
pub const KNOWN_DISTANCE_THRESHOLD: f64 = 100.0;

/// Axis-aligned face box in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Shrink the box so it lies entirely inside a `width` × `height` image.
    ///
    /// Returns `None` when nothing of the box remains.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<FaceRect> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        if w == 0 || h == 0 {
            return None;
        }
        Some(FaceRect::new(self.x, self.y, w, h))
    }
}

/// Result of recognizing a single face crop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Person id of the closest enrolled face.
    pub label: i64,
    /// Chi-square histogram distance; 0.0 is a perfect match.
    pub distance: f64,
}

impl Prediction {
    pub fn is_known(&self, threshold: f64) -> bool {
        self.distance < threshold
    }
}

/// One face found by a detect call.
///
/// Recognition fields are only present when a trained model was available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    /// Position of this region within the detect result.
    pub id: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recognized_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_known: Option<bool>,
}

impl FaceRegion {
    /// A region carrying geometry only.
    pub fn unrecognized(id: usize, rect: FaceRect) -> Self {
        Self {
            id,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            confidence: 0.0,
            recognized_id: None,
            is_known: None,
        }
    }

    /// Attach a recognizer prediction, thresholding it into `is_known`.
    pub fn with_prediction(mut self, prediction: Prediction, threshold: f64) -> Self {
        self.recognized_id = Some(prediction.label);
        self.confidence = prediction.distance;
        self.is_known = Some(prediction.is_known(threshold));
        self
    }

    pub fn rect(&self) -> FaceRect {
        FaceRect::new(self.x, self.y, self.width, self.height)
    }
}
