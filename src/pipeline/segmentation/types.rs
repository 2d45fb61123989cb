use image::DynamicImage;
use serde::{Deserialize, Serialize};

use super::SegmentationError;

/// Axis-aligned rectangle in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Width-to-height aspect ratio. Zero-height rects report 0.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height <= 0.0 {
            0.0
        } else {
            self.width / self.height
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// A vertical boundary candidate derived from a detected rectangle edge.
///
/// Ephemeral: produced and consumed within one segmentation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeLine {
    pub x: f32,
}

/// Which detector produced a spine region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
    /// Primary instance-mask detector.
    InstanceMask,
    /// Geometric edge-line fallback.
    GeometricFallback,
}

/// One detected book spine: its location and a transient crop of the
/// source photo. Not retained beyond a single pipeline pass.
#[derive(Debug, Clone)]
pub struct SegmentedBook {
    pub bounding_box: Rect,
    pub cropped_image: DynamicImage,
    pub source: ConfidenceSource,
}

/// Primary instance-segmentation primitive (platform vision service,
/// ML model, ...). Returns the bounding boxes of detected instances.
pub trait InstanceSegmenter: Send + Sync {
    fn instance_segment(&self, image: &DynamicImage) -> Result<Vec<Rect>, SegmentationError>;
}

/// Rectangle-detection primitive feeding the geometric fallback
/// (e.g. contour or line-segment detection over the same photo).
pub trait RectangleDetector: Send + Sync {
    fn detect_rectangles(&self, image: &DynamicImage) -> Result<Vec<Rect>, SegmentationError>;
}
