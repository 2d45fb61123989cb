//! Single-flight serialization of extraction requests.
//!
//! The inference session is stateful and errors out if a second call
//! begins before the first returns. All access is therefore confined to
//! one worker task that exclusively owns the engine and drains a FIFO
//! queue; callers never hold a reference to the resource. Many tasks may
//! `submit` concurrently — at most one inference call is in flight at any
//! instant, system-wide.

use tokio::sync::{mpsc, oneshot};

use super::parser::parse_spine_response;
use super::types::{BookSpineInfo, ExtractionRequest, InferenceEngine};
use super::ExtractionError;

/// One queued turn: the request plus its caller's completion handle.
struct QueuedTurn {
    request: ExtractionRequest,
    respond_to: oneshot::Sender<Result<BookSpineInfo, ExtractionError>>,
}

/// Concurrency-safe handle to the serialized inference queue.
///
/// Cheap to clone; all clones feed the same worker. Dropping every handle
/// closes the queue and ends the worker after the current drain.
#[derive(Clone)]
pub struct ExtractionSerializer {
    tx: mpsc::UnboundedSender<QueuedTurn>,
}

impl ExtractionSerializer {
    /// Spawn the worker that takes exclusive ownership of `engine`.
    pub fn spawn(engine: Box<dyn InferenceEngine>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(drain_queue(engine, rx));
        Self { tx }
    }

    /// Submit one extraction request and suspend until its turn completes.
    ///
    /// Resolves exactly once, with the parsed record or with the failure
    /// of this turn alone — a failed turn never aborts the queue. If the
    /// caller drops this future while the request is still queued, the
    /// turn is skipped without invoking the engine.
    pub async fn submit(&self, prompt: String) -> Result<BookSpineInfo, ExtractionError> {
        let request = ExtractionRequest::new(prompt);
        let request_id = request.request_id;
        let (done_tx, done_rx) = oneshot::channel();

        self.tx
            .send(QueuedTurn {
                request,
                respond_to: done_tx,
            })
            .map_err(|_| ExtractionError::QueueClosed)?;

        tracing::debug!(%request_id, "extraction request queued");
        done_rx.await.map_err(|_| ExtractionError::QueueClosed)?
    }
}

/// Worker loop: strict FIFO, one inference call at a time.
async fn drain_queue(
    mut engine: Box<dyn InferenceEngine>,
    mut rx: mpsc::UnboundedReceiver<QueuedTurn>,
) {
    while let Some(turn) = rx.recv().await {
        let request_id = turn.request.request_id;

        // Caller cancelled while queued: skip without touching the engine.
        if turn.respond_to.is_closed() {
            tracing::debug!(%request_id, "caller gone before turn started, skipping");
            continue;
        }

        let result = match engine.respond(&turn.request.prompt).await {
            Ok(raw) => parse_spine_response(&raw),
            Err(e) => {
                tracing::warn!(%request_id, error = %e, "inference turn failed");
                Err(e)
            }
        };

        // Cancellation mid-turn is best-effort: the call already ran, the
        // completion is simply discarded without blocking the queue.
        if turn.respond_to.send(result).is_err() {
            tracing::debug!(%request_id, "caller gone, discarding completed turn");
        }
    }
    tracing::debug!("extraction queue closed, worker exiting");
}
