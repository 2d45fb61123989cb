pub mod coordinator;
pub mod line_detect;
pub mod types;

pub use coordinator::SegmentationCoordinator;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegmentationError {
    /// Both the primary detector and the geometric fallback found nothing.
    /// The caller may re-capture; there is nothing to retry here.
    #[error("no book spine regions found by primary or fallback detection")]
    NoRegions,

    #[error("vision primitive failed: {0}")]
    Primitive(String),
}
