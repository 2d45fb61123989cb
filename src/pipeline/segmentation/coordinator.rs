//! Segmentation orchestration: primary detector with geometric fallback.
//!
//! The primary instance-mask detector under-counts adjacent spines with
//! similar colors, so its output is only trusted when it finds at least
//! two regions. The geometric fallback is trusted at one — a single-book
//! photo legitimately yields one region there.

use image::{DynamicImage, GenericImageView};

use crate::config::SegmentationConfig;

use super::line_detect;
use super::types::{ConfidenceSource, InstanceSegmenter, Rect, RectangleDetector, SegmentedBook};
use super::SegmentationError;

/// Primary detector output below this count triggers the fallback.
const PRIMARY_TRUST_MIN: usize = 2;

/// Orchestrates a segmentation pass over one photo.
///
/// Trait-based DI for both vision primitives so the coordinator is fully
/// testable without a platform vision service.
pub struct SegmentationCoordinator {
    segmenter: Box<dyn InstanceSegmenter>,
    rectangles: Box<dyn RectangleDetector>,
    config: SegmentationConfig,
}

impl SegmentationCoordinator {
    pub fn new(
        segmenter: Box<dyn InstanceSegmenter>,
        rectangles: Box<dyn RectangleDetector>,
        config: SegmentationConfig,
    ) -> Self {
        Self {
            segmenter,
            rectangles,
            config,
        }
    }

    /// Segment a photo into spine regions with cropped sub-images.
    ///
    /// Policy:
    /// 1. Primary result of ≥ 2 regions → returned as `InstanceMask`.
    /// 2. Otherwise geometric fallback; ≥ 1 region → `GeometricFallback`.
    /// 3. Otherwise whatever the primary found (even one region) rather
    ///    than failing outright.
    /// 4. Fails with [`SegmentationError::NoRegions`] only when both
    ///    paths are empty.
    pub fn segment(&self, image: &DynamicImage) -> Result<Vec<SegmentedBook>, SegmentationError> {
        let primary = match self.segmenter.instance_segment(image) {
            Ok(regions) => regions,
            Err(e) => {
                tracing::warn!(error = %e, "primary instance segmentation failed, using fallback");
                Vec::new()
            }
        };

        if primary.len() >= PRIMARY_TRUST_MIN {
            tracing::info!(regions = primary.len(), "primary detector trusted");
            return Ok(crop_regions(image, &primary, ConfidenceSource::InstanceMask));
        }

        let rects = match self.rectangles.detect_rectangles(image) {
            Ok(rects) => rects,
            Err(e) => {
                tracing::warn!(error = %e, "rectangle primitive failed, fallback gets no input");
                Vec::new()
            }
        };

        let (width, height) = image.dimensions();
        let fallback =
            line_detect::detect_regions(&rects, width as f32, height as f32, &self.config);

        if !fallback.is_empty() {
            tracing::info!(
                regions = fallback.len(),
                primary_regions = primary.len(),
                "geometric fallback produced regions"
            );
            return Ok(crop_regions(image, &fallback, ConfidenceSource::GeometricFallback));
        }

        if !primary.is_empty() {
            tracing::info!(
                regions = primary.len(),
                "fallback empty, surfacing under-threshold primary result"
            );
            return Ok(crop_regions(image, &primary, ConfidenceSource::InstanceMask));
        }

        Err(SegmentationError::NoRegions)
    }
}

/// Crop each region out of the source photo, clamped to image bounds.
/// Regions that collapse to zero pixels after clamping are dropped.
fn crop_regions(
    image: &DynamicImage,
    regions: &[Rect],
    source: ConfidenceSource,
) -> Vec<SegmentedBook> {
    let (img_w, img_h) = image.dimensions();

    regions
        .iter()
        .filter_map(|region| {
            let x = (region.x.max(0.0) as u32).min(img_w.saturating_sub(1));
            let y = (region.y.max(0.0) as u32).min(img_h.saturating_sub(1));
            let width = (region.width.round() as u32).min(img_w - x);
            let height = (region.height.round() as u32).min(img_h - y);
            if width == 0 || height == 0 {
                return None;
            }
            Some(SegmentedBook {
                bounding_box: *region,
                cropped_image: image.crop_imm(x, y, width, height),
                source,
            })
        })
        .collect()
}
