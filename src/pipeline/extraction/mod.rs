pub mod parser;
pub mod prompt;
pub mod sanitize;
pub mod serializer;
pub mod types;
pub mod validate;

pub use serializer::ExtractionSerializer;
pub use types::*;
pub use validate::ValidationError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    /// One queued inference turn failed. Sibling requests are unaffected.
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("malformed inference response: {0}")]
    MalformedResponse(String),

    #[error("spine text recognition failed: {0}")]
    Recognition(String),

    /// The serializer worker is gone; no further turns can run.
    #[error("extraction queue closed")]
    QueueClosed,
}
