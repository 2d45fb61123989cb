//! Pre-delivery gate against hallucinated spine records.
//!
//! A vision/LLM stack asked to read an unreadable spine will happily
//! produce a plausible-looking title anyway. The validator rejects
//! records whose recognized source text could not possibly support them.
//! It is a gate, not a correction step — it never invents or repairs
//! data.

use thiserror::Error;

use super::types::BookSpineInfo;

/// Recognized spine text shorter than this cannot support a real
/// title/author pair; any populated result from it is a fabrication.
pub const MIN_SOURCE_CHARS: usize = 10;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Near-empty recognized text — a user-visible "could not read this
    /// spine" outcome, not a crash.
    #[error("recognized text too short ({length} chars, need {MIN_SOURCE_CHARS})")]
    InsufficientSource { length: usize },

    #[error("extraction produced neither title nor author")]
    EmptyFields,
}

/// Validate one record against the length of the text it was read from.
///
/// The source-length check comes first: a populated title over an empty
/// source is exactly the hallucination signature this gate exists for.
pub fn validate(
    info: BookSpineInfo,
    source_text_len: usize,
) -> Result<BookSpineInfo, ValidationError> {
    if source_text_len < MIN_SOURCE_CHARS {
        return Err(ValidationError::InsufficientSource {
            length: source_text_len,
        });
    }

    if info.title.trim().is_empty() && info.author.trim().is_empty() {
        return Err(ValidationError::EmptyFields);
    }

    Ok(info)
}
