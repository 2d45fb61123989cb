//! shelfscan — book-spine detection and bibliographic extraction.
//!
//! Takes a shelf (or single-book) photo and produces structured
//! bibliographic records for each detected spine. Two delivery paths:
//!
//! - **On-device**: detected regions are cropped, their spine text is
//!   recognized, and extraction prompts are serialized one-at-a-time
//!   through a single-flight inference session
//!   ([`pipeline::extraction::ExtractionSerializer`]).
//! - **Remote**: captures are uploaded to an extraction service and
//!   results arrive over a server-sent-event stream
//!   ([`remote::StreamingUploadClient`]), gated by a process-wide
//!   rate-limit governor ([`remote::RateLimitGovernor`]).
//!
//! Camera capture, UI rendering, and persistent library storage are the
//! embedding application's responsibility — this crate only defines the
//! collaborator traits it consumes.

pub mod config;
pub mod pipeline;
pub mod remote;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries and examples embedding the pipeline.
///
/// Respects `RUST_LOG`; falls back to [`config::default_log_filter`].
/// Safe to call more than once (subsequent calls are no-ops).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
