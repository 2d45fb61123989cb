//! Client-side rate-limit governor.
//!
//! Sits between capture and the upload path. Once the service answers
//! 429 the governor enters a cooldown: every capture submitted during
//! it is rejected locally, without a network attempt, and its payload
//! preserved in arrival order. A background drain task resubmits the
//! preserved payloads once the cooldown lapses, oldest first, before
//! any new capture goes out.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::NetworkError;

/// Drain task wake-up period.
const DRAIN_TICK_SECS: u64 = 1;

/// Upload seam the governor drives. [`super::StreamingUploadClient`]
/// sits behind this in production; tests script it.
///
/// Takes the payload by reference so the governor keeps ownership and
/// can re-preserve it when the attempt comes back rate limited.
#[async_trait]
pub trait CaptureUploader: Send + Sync {
    async fn process_capture(&self, image: &[u8]) -> Result<(), NetworkError>;
}

/// Snapshot of the governor for status surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct GovernorStatus {
    pub cooling_down: bool,
    pub resume_in_secs: u64,
    pub preserved_count: usize,
}

struct GovernorState {
    /// `Some` while cooling down or while preserved payloads are still
    /// draining. Cleared only once the queue is empty so new captures
    /// cannot jump ahead of preserved ones.
    cooling_until: Option<Instant>,
    preserved: VecDeque<Vec<u8>>,
}

pub struct RateLimitGovernor {
    uploader: Arc<dyn CaptureUploader>,
    state: Mutex<GovernorState>,
}

impl RateLimitGovernor {
    /// Create the governor and start its drain task. The task holds a
    /// `Weak` handle and exits once the last `Arc` is dropped.
    pub fn spawn(uploader: Arc<dyn CaptureUploader>) -> Arc<Self> {
        let governor = Arc::new(Self {
            uploader,
            state: Mutex::new(GovernorState {
                cooling_until: None,
                preserved: VecDeque::new(),
            }),
        });
        tokio::spawn(drain_loop(Arc::downgrade(&governor)));
        governor
    }

    /// Submit one capture for upload.
    ///
    /// During a cooldown this preserves the payload and fails fast with
    /// [`NetworkError::RateLimited`]; no network traffic happens. A 429
    /// on a live attempt starts the cooldown and preserves the payload
    /// the same way.
    pub async fn submit(&self, image: Vec<u8>) -> Result<(), NetworkError> {
        {
            let mut state = self.state.lock().await;
            if let Some(until) = state.cooling_until {
                let remaining = until.saturating_duration_since(Instant::now());
                state.preserved.push_back(image);
                tracing::info!(
                    preserved = state.preserved.len(),
                    resume_in_secs = remaining.as_secs(),
                    "cooling down, capture preserved for resubmission"
                );
                return Err(NetworkError::RateLimited {
                    retry_after: remaining,
                });
            }
        }

        match self.uploader.process_capture(&image).await {
            Ok(()) => Ok(()),
            Err(NetworkError::RateLimited { retry_after }) => {
                let mut state = self.state.lock().await;
                state.cooling_until = Some(Instant::now() + retry_after);
                state.preserved.push_back(image);
                tracing::warn!(
                    retry_after_secs = retry_after.as_secs(),
                    "service rate limited, entering cooldown"
                );
                Err(NetworkError::RateLimited { retry_after })
            }
            Err(e) => Err(e),
        }
    }

    pub async fn status(&self) -> GovernorStatus {
        let state = self.state.lock().await;
        let resume_in = state
            .cooling_until
            .map(|until| until.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO);
        GovernorStatus {
            cooling_down: state.cooling_until.is_some(),
            resume_in_secs: resume_in.as_secs(),
            preserved_count: state.preserved.len(),
        }
    }

    /// Resubmit preserved payloads once the cooldown has lapsed.
    ///
    /// Oldest first, one at a time, without holding the state lock over
    /// the network call. A fresh 429 puts the payload back at the front
    /// and restarts the cooldown; any other failure drops the payload
    /// after one resubmission attempt.
    async fn drain_due(&self) {
        loop {
            let payload = {
                let mut state = self.state.lock().await;
                let Some(until) = state.cooling_until else {
                    return;
                };
                if Instant::now() < until {
                    return;
                }
                match state.preserved.pop_front() {
                    Some(payload) => payload,
                    None => {
                        state.cooling_until = None;
                        tracing::info!("cooldown over, resuming live uploads");
                        return;
                    }
                }
            };

            match self.uploader.process_capture(&payload).await {
                Ok(()) => {
                    tracing::info!("preserved capture resubmitted");
                }
                Err(NetworkError::RateLimited { retry_after }) => {
                    let mut state = self.state.lock().await;
                    state.preserved.push_front(payload);
                    state.cooling_until = Some(Instant::now() + retry_after);
                    tracing::warn!(
                        retry_after_secs = retry_after.as_secs(),
                        preserved = state.preserved.len(),
                        "rate limited again during drain, cooldown restarted"
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "preserved capture resubmission failed, dropping");
                }
            }
        }
    }
}

async fn drain_loop(governor: Weak<RateLimitGovernor>) {
    let mut tick = tokio::time::interval(Duration::from_secs(DRAIN_TICK_SECS));
    loop {
        tick.tick().await;
        let Some(governor) = governor.upgrade() else {
            return;
        };
        governor.drain_due().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;

    enum Scripted {
        Accept,
        RateLimit(u64),
        ServerError,
    }

    /// Uploader that records every payload it sees and answers from a
    /// script (accepting once the script runs out).
    struct ScriptedUploader {
        calls: StdMutex<Vec<Vec<u8>>>,
        script: StdMutex<VecDeque<Scripted>>,
    }

    impl ScriptedUploader {
        fn new(script: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                calls: StdMutex::new(Vec::new()),
                script: StdMutex::new(script.into()),
            })
        }

        fn calls(&self) -> Vec<Vec<u8>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CaptureUploader for ScriptedUploader {
        async fn process_capture(&self, image: &[u8]) -> Result<(), NetworkError> {
            self.calls.lock().unwrap().push(image.to_vec());
            match self.script.lock().unwrap().pop_front() {
                Some(Scripted::Accept) | None => Ok(()),
                Some(Scripted::RateLimit(secs)) => Err(NetworkError::RateLimited {
                    retry_after: Duration::from_secs(secs),
                }),
                Some(Scripted::ServerError) => Err(NetworkError::Http {
                    status: 500,
                    body: String::new(),
                }),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_rate_limit_enters_cooldown_and_preserves() {
        let uploader = ScriptedUploader::new(vec![Scripted::RateLimit(5)]);
        let governor = RateLimitGovernor::spawn(uploader.clone());

        let result = governor.submit(b"a".to_vec()).await;
        assert!(matches!(result, Err(NetworkError::RateLimited { .. })));

        let status = governor.status().await;
        assert!(status.cooling_down);
        assert_eq!(status.preserved_count, 1);
        assert!(status.resume_in_secs <= 5);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_rejects_locally_without_network() {
        let uploader = ScriptedUploader::new(vec![Scripted::RateLimit(30)]);
        let governor = RateLimitGovernor::spawn(uploader.clone());

        let _ = governor.submit(b"a".to_vec()).await;
        for payload in [b"b".to_vec(), b"c".to_vec()] {
            let result = governor.submit(payload).await;
            assert!(matches!(result, Err(NetworkError::RateLimited { .. })));
        }

        // Only the first submission ever reached the uploader.
        assert_eq!(uploader.calls().len(), 1);
        assert_eq!(governor.status().await.preserved_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn preserved_resubmitted_oldest_first_after_cooldown() {
        let uploader = ScriptedUploader::new(vec![Scripted::RateLimit(5)]);
        let governor = RateLimitGovernor::spawn(uploader.clone());

        let _ = governor.submit(b"a".to_vec()).await;
        let _ = governor.submit(b"b".to_vec()).await;
        let _ = governor.submit(b"c".to_vec()).await;

        tokio::time::sleep(Duration::from_secs(7)).await;

        let calls = uploader.calls();
        assert_eq!(calls.len(), 4);
        // Live attempt first, then the preserved queue oldest first,
        // each exactly once.
        assert_eq!(calls[1], b"a");
        assert_eq!(calls[2], b"b");
        assert_eq!(calls[3], b"c");

        let status = governor.status().await;
        assert!(!status.cooling_down);
        assert_eq!(status.preserved_count, 0);

        // Live path is back.
        governor.submit(b"d".to_vec()).await.unwrap();
        assert_eq!(uploader.calls().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_rate_limit_during_drain_restarts_cooldown() {
        let uploader =
            ScriptedUploader::new(vec![Scripted::RateLimit(2), Scripted::RateLimit(3)]);
        let governor = RateLimitGovernor::spawn(uploader.clone());

        let _ = governor.submit(b"a".to_vec()).await;
        let _ = governor.submit(b"b".to_vec()).await;

        // Drain wakes, resubmits "a", gets 429 again.
        tokio::time::sleep(Duration::from_secs(3)).await;
        let status = governor.status().await;
        assert!(status.cooling_down);
        assert_eq!(status.preserved_count, 2, "payload must return to the queue");
        assert_eq!(uploader.calls().len(), 2);

        // Second cooldown lapses; "a" still goes before "b".
        tokio::time::sleep(Duration::from_secs(4)).await;
        let calls = uploader.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[2], b"a");
        assert_eq!(calls[3], b"b");
        assert!(!governor.status().await.cooling_down);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_resubmission_is_dropped_after_one_attempt() {
        let uploader =
            ScriptedUploader::new(vec![Scripted::RateLimit(1), Scripted::ServerError]);
        let governor = RateLimitGovernor::spawn(uploader.clone());

        let _ = governor.submit(b"a".to_vec()).await;
        tokio::time::sleep(Duration::from_secs(3)).await;

        // Resubmitted once, failed, not retried again.
        assert_eq!(uploader.calls().len(), 2);
        let status = governor.status().await;
        assert!(!status.cooling_down);
        assert_eq!(status.preserved_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn non_rate_limit_errors_pass_through_without_cooldown() {
        let uploader = ScriptedUploader::new(vec![Scripted::ServerError]);
        let governor = RateLimitGovernor::spawn(uploader.clone());

        let result = governor.submit(b"a".to_vec()).await;
        assert!(matches!(result, Err(NetworkError::Http { status: 500, .. })));

        let status = governor.status().await;
        assert!(!status.cooling_down);
        assert_eq!(status.preserved_count, 0);
    }
}
