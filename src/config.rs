//! Crate-level constants and pipeline configuration.
//!
//! Geometry thresholds that are fixed by calibration live next to the code
//! that uses them (see `pipeline::segmentation::line_detect`). The values
//! here are the ones an embedding application is expected to tune or
//! override via environment.

use serde::Serialize;

pub const APP_NAME: &str = "shelfscan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming the remote extraction service base URL.
pub const SERVICE_URL_ENV: &str = "SHELFSCAN_SERVICE_URL";

/// Environment variable carrying a stable device identifier for uploads.
pub const DEVICE_ID_ENV: &str = "SHELFSCAN_DEVICE_ID";

/// Default log filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    format!("{APP_NAME}=info")
}

/// Tunables for the geometric segmentation fallback.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentationConfig {
    /// Edge-line deduplication threshold as a fraction of image width.
    ///
    /// Two boundary candidates closer than `fraction * image_width` pixels
    /// are merged into one line. A width fraction was chosen over an
    /// absolute pixel threshold so the merge behaves the same across
    /// capture resolutions.
    pub dedup_threshold_fraction: f32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            dedup_threshold_fraction: 0.05,
        }
    }
}

/// Remote extraction service endpoint configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the extraction service, no trailing slash.
    pub base_url: String,
    /// Device identifier sent with every upload.
    pub device_id: String,
}

impl RemoteConfig {
    pub fn new(base_url: &str, device_id: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            device_id: device_id.to_string(),
        }
    }

    /// Read configuration from the environment.
    ///
    /// Falls back to a local development endpoint and a random device id.
    pub fn from_env() -> Self {
        let base_url = std::env::var(SERVICE_URL_ENV)
            .unwrap_or_else(|_| "http://localhost:8787".to_string());
        let device_id = std::env::var(DEVICE_ID_ENV)
            .unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());
        Self::new(&base_url, &device_id)
    }
}
