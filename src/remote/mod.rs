pub mod client;
pub mod governor;
pub mod sse;
pub mod types;

pub use client::StreamingUploadClient;
pub use governor::{CaptureUploader, GovernorStatus, RateLimitGovernor};
pub use types::*;

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    /// The service returned a 429. Raised immediately to the caller —
    /// never retried with an internal sleep — so the rate-limit governor
    /// decides policy.
    #[error("rate limited by extraction service, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// Stream closed or connection lost without a terminal event.
    #[error("stream closed before a terminal event")]
    TransportFailure,

    /// The service delivered an `error` stream event for this job.
    #[error("extraction service reported: {0}")]
    Remote(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("malformed service response: {0}")]
    ResponseParsing(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(e: reqwest::Error) -> Self {
        NetworkError::Request(e.to_string())
    }
}
