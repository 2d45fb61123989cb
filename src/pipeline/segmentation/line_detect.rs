//! Geometric edge-line fallback for spine segmentation.
//!
//! The primary instance-mask detector under-counts adjacent spines with
//! similar colors. This fallback works from plain detected rectangles:
//! tall, narrow rects contribute their vertical edges as boundary
//! candidates, near-duplicate candidates are merged, and neighboring
//! lines are paired into candidate spine regions.
//!
//! Deterministic: identical rectangle sets and thresholds always produce
//! the same lines and regions. Never errors — an unusable input simply
//! yields an empty result.

use crate::config::SegmentationConfig;

use super::types::{EdgeLine, Rect};

/// Rectangles with width/height aspect below this are too thin to be a
/// spine silhouette (likely noise or a shelf edge).
pub const SPINE_ASPECT_MIN: f32 = 0.1;

/// Rectangles above this aspect are too wide to be a single spine
/// standing upright (likely a stack of books or the shelf itself).
pub const SPINE_ASPECT_MAX: f32 = 0.3;

/// A paired region narrower than this fraction of the image height is
/// discarded as a sliver between two merged boundaries.
pub const REGION_ASPECT_MIN: f32 = 0.05;

/// A paired region wider than this fraction of the image height spans
/// several books and is discarded.
pub const REGION_ASPECT_MAX: f32 = 0.5;

/// Derive deduplicated vertical boundary lines from detected rectangles.
///
/// Only rectangles with spine-like aspect ratio contribute edges; every
/// contributing rect emits both its left and right x-edge. Candidates
/// closer than the configured dedup threshold (a fraction of
/// `image_width`, see [`SegmentationConfig`]) are merged at their mean
/// position. The result is sorted by x ascending.
pub fn detect_lines(
    rects: &[Rect],
    image_width: f32,
    config: &SegmentationConfig,
) -> Vec<EdgeLine> {
    let mut candidates: Vec<f32> = Vec::new();
    for rect in rects {
        let aspect = rect.aspect_ratio();
        if (SPINE_ASPECT_MIN..=SPINE_ASPECT_MAX).contains(&aspect) {
            candidates.push(rect.x);
            candidates.push(rect.right());
        }
    }

    if candidates.is_empty() {
        return Vec::new();
    }

    candidates.sort_by(|a, b| a.total_cmp(b));

    let threshold = config.dedup_threshold_fraction * image_width;
    merge_candidates(&candidates, threshold)
        .into_iter()
        .map(|x| EdgeLine { x })
        .collect()
}

/// Pair each line with its next neighbor to form candidate spine regions.
///
/// Regions span the full image height. A region whose width/height aspect
/// falls outside [`REGION_ASPECT_MIN`, `REGION_ASPECT_MAX`] is discarded.
/// Fewer than 2 lines yields an empty result.
pub fn regions_from_lines(lines: &[EdgeLine], image_height: f32) -> Vec<Rect> {
    if lines.len() < 2 || image_height <= 0.0 {
        return Vec::new();
    }

    lines
        .windows(2)
        .filter_map(|pair| {
            let width = pair[1].x - pair[0].x;
            let aspect = width / image_height;
            if (REGION_ASPECT_MIN..=REGION_ASPECT_MAX).contains(&aspect) {
                Some(Rect::new(pair[0].x, 0.0, width, image_height))
            } else {
                None
            }
        })
        .collect()
}

/// Full fallback pass: rectangles → lines → candidate regions.
pub fn detect_regions(
    rects: &[Rect],
    image_width: f32,
    image_height: f32,
    config: &SegmentationConfig,
) -> Vec<Rect> {
    let lines = detect_lines(rects, image_width, config);
    let regions = regions_from_lines(&lines, image_height);
    tracing::debug!(
        rects = rects.len(),
        lines = lines.len(),
        regions = regions.len(),
        "geometric fallback pass"
    );
    regions
}

/// Merge sorted candidate positions closer than `threshold` into cluster
/// means.
fn merge_candidates(sorted: &[f32], threshold: f32) -> Vec<f32> {
    let mut merged = Vec::new();
    let mut cluster_start = 0;

    for i in 1..=sorted.len() {
        let cluster_open =
            i < sorted.len() && sorted[i] - sorted[i - 1] < threshold;
        if !cluster_open {
            let cluster = &sorted[cluster_start..i];
            let mean = cluster.iter().sum::<f32>() / cluster.len() as f32;
            merged.push(mean);
            cluster_start = i;
        }
    }

    merged
}
