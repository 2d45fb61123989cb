//! Streaming upload client for the remote extraction service.
//!
//! Drives one job through its full lifecycle:
//! upload → server-sent-event stream → cleanup. Rate limiting is policy
//! for the caller: a 429 is surfaced immediately as
//! [`NetworkError::RateLimited`], never absorbed by an internal sleep —
//! the [`super::RateLimitGovernor`] owns the cooldown.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;

use crate::pipeline::extraction::BookSpineInfo;

use super::sse::SseParser;
use super::types::{Job, JobState, StreamEvent, UploadTicket};
use super::NetworkError;

/// Connection establishment timeout. No overall request timeout — the
/// event stream is long-lived by design.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Cooldown assumed when a 429 arrives without a Retry-After header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

pub struct StreamingUploadClient {
    base_url: String,
    client: reqwest::Client,
}

impl StreamingUploadClient {
    pub fn new(base_url: &str) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload one captured image; returns the job ticket on 2xx.
    ///
    /// A 429 response is mapped to [`NetworkError::RateLimited`] with the
    /// server's Retry-After (seconds) and raised to the caller
    /// immediately.
    pub async fn upload(
        &self,
        image_bytes: Vec<u8>,
        device_id: &str,
    ) -> Result<UploadTicket, NetworkError> {
        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .header("X-Device-Id", device_id)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image_bytes)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(&response);
            tracing::warn!(retry_after_secs = retry_after.as_secs(), "upload rate limited");
            return Err(NetworkError::RateLimited { retry_after });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NetworkError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let ticket: UploadTicket = response
            .json()
            .await
            .map_err(|e| NetworkError::ResponseParsing(e.to_string()))?;
        tracing::info!(job_id = %ticket.job_id, "upload accepted");
        Ok(ticket)
    }

    /// Release server-side resources for a job. Idempotent: a job that
    /// is already gone (404) counts as cleaned.
    pub async fn cleanup(&self, job_id: &str) -> Result<(), NetworkError> {
        let response = self
            .client
            .delete(format!("{}/jobs/{}", self.base_url, job_id))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            tracing::debug!(job_id, "job cleaned up");
            Ok(())
        } else {
            Err(NetworkError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }

    /// Full job lifecycle for one capture.
    ///
    /// Stream events are handed to `sink` strictly in receipt order;
    /// nothing is delivered after a terminal event. Cleanup is attempted
    /// exactly once after any terminal streaming state — including
    /// transport failure — and its own failure is logged, not
    /// propagated.
    pub async fn process(
        &self,
        image_bytes: Vec<u8>,
        device_id: &str,
        mut sink: impl FnMut(&StreamEvent),
    ) -> Result<(BookSpineInfo, String), NetworkError> {
        let ticket = self.upload(image_bytes, device_id).await?;
        let mut job = Job::new(&ticket);

        let outcome = self.consume_stream(&mut job, &mut sink).await;

        if let Err(e) = self.cleanup(&job.job_id).await {
            tracing::warn!(job_id = %job.job_id, error = %e, "cleanup failed (non-fatal)");
        }
        job.transition(JobState::Cleaned);

        outcome
    }

    /// Consume the job's event stream until a terminal event or
    /// transport failure.
    async fn consume_stream(
        &self,
        job: &mut Job,
        sink: &mut impl FnMut(&StreamEvent),
    ) -> Result<(BookSpineInfo, String), NetworkError> {
        let url = absolutize(&self.base_url, &job.stream_url);
        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::warn!(job_id = %job.job_id, error = %e, "could not open event stream");
            NetworkError::TransportFailure
        })?;
        if !response.status().is_success() {
            job.transition(JobState::Failed);
            return Err(NetworkError::Http {
                status: response.status().as_u16(),
                body: String::new(),
            });
        }

        job.transition(JobState::Streaming);
        let mut stream = response.bytes_stream();
        let mut parser = SseParser::new();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!(job_id = %job.job_id, error = %e, "stream transport failure");
                    job.transition(JobState::Failed);
                    return Err(NetworkError::TransportFailure);
                }
            };

            for message in parser.feed(&chunk) {
                let event: StreamEvent = match serde_json::from_str(&message.data) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(job_id = %job.job_id, error = %e, "unparseable stream event, skipping");
                        continue;
                    }
                };

                sink(&event);

                match &event {
                    StreamEvent::Progress { percent } => {
                        tracing::debug!(job_id = %job.job_id, percent, "job progress");
                    }
                    StreamEvent::Result { title, author, .. } => {
                        job.transition(JobState::Completed);
                        let info = BookSpineInfo {
                            title: title.clone(),
                            author: author.clone(),
                            raw_payload: message.data.clone(),
                        };
                        return Ok((info, message.data));
                    }
                    StreamEvent::Error { message: reason } => {
                        job.transition(JobState::Failed);
                        return Err(NetworkError::Remote(reason.clone()));
                    }
                }
            }
        }

        // Stream ended without a terminal event.
        job.transition(JobState::Failed);
        Err(NetworkError::TransportFailure)
    }
}

fn parse_retry_after(response: &reqwest::Response) -> Duration {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_RETRY_AFTER_SECS))
}

/// The server may hand back an absolute stream URL or a path.
fn absolutize(base_url: &str, stream_url: &str) -> String {
    if stream_url.starts_with("http://") || stream_url.starts_with("https://") {
        stream_url.to_string()
    } else if stream_url.starts_with('/') {
        format!("{base_url}{stream_url}")
    } else {
        format!("{base_url}/{stream_url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = StreamingUploadClient::new("http://books.example/").unwrap();
        assert_eq!(client.base_url(), "http://books.example");
    }

    #[test]
    fn absolutize_passes_through_absolute_urls() {
        assert_eq!(
            absolutize("http://a", "https://b/events/1"),
            "https://b/events/1"
        );
    }

    #[test]
    fn absolutize_joins_paths() {
        assert_eq!(absolutize("http://a", "/events/1"), "http://a/events/1");
        assert_eq!(absolutize("http://a", "events/1"), "http://a/events/1");
    }
}
