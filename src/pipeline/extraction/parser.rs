//! Parse the inference model's raw response into a [`BookSpineInfo`].
//!
//! Models frequently wrap their JSON in a ```json fence or surround it
//! with commentary; both are tolerated. Missing fields default to empty
//! strings — plausibility is the validator's job, not the parser's.

use serde::Deserialize;

use super::types::BookSpineInfo;
use super::ExtractionError;

/// Parse a raw model response into a spine record.
///
/// The original response is preserved verbatim in `raw_payload`.
pub fn parse_spine_response(response: &str) -> Result<BookSpineInfo, ExtractionError> {
    let json_str = extract_json_block(response)?;

    #[derive(Deserialize)]
    struct RawRecord {
        #[serde(default)]
        title: String,
        #[serde(default)]
        author: String,
    }

    let raw: RawRecord = serde_json::from_str(&json_str)
        .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;

    Ok(BookSpineInfo {
        title: raw.title.trim().to_string(),
        author: raw.author.trim().to_string(),
        raw_payload: response.to_string(),
    })
}

/// Locate the JSON object in a response: prefer a ```json fence, fall
/// back to the outermost brace pair.
fn extract_json_block(response: &str) -> Result<String, ExtractionError> {
    if let Some(fence_start) = response.find("```json") {
        let content_start = fence_start + 7;
        let fence_end = response[content_start..].find("```").ok_or_else(|| {
            ExtractionError::MalformedResponse("unclosed JSON fence".into())
        })?;
        return Ok(response[content_start..content_start + fence_end]
            .trim()
            .to_string());
    }

    let start = response
        .find('{')
        .ok_or_else(|| ExtractionError::MalformedResponse("no JSON object found".into()))?;
    let end = response
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| ExtractionError::MalformedResponse("unterminated JSON object".into()))?;

    Ok(response[start..=end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json() {
        let info =
            parse_spine_response(r#"{"title": "Dune", "author": "Frank Herbert"}"#).unwrap();
        assert_eq!(info.title, "Dune");
        assert_eq!(info.author, "Frank Herbert");
    }

    #[test]
    fn parses_fenced_json_with_commentary() {
        let response = "Here is the record:\n```json\n{\"title\": \"Dune\", \"author\": \"Frank Herbert\"}\n```\nDone.";
        let info = parse_spine_response(response).unwrap();
        assert_eq!(info.title, "Dune");
        assert_eq!(info.raw_payload, response);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let info = parse_spine_response(r#"{"title": "Dune"}"#).unwrap();
        assert_eq!(info.author, "");
    }

    #[test]
    fn fields_are_trimmed() {
        let info = parse_spine_response(r#"{"title": "  Dune ", "author": " F. Herbert "}"#)
            .unwrap();
        assert_eq!(info.title, "Dune");
        assert_eq!(info.author, "F. Herbert");
    }

    #[test]
    fn no_json_is_malformed() {
        let result = parse_spine_response("I could not read this spine.");
        assert!(matches!(result, Err(ExtractionError::MalformedResponse(_))));
    }

    #[test]
    fn unclosed_fence_is_malformed() {
        let result = parse_spine_response("```json\n{\"title\": \"Dune\"}");
        assert!(matches!(result, Err(ExtractionError::MalformedResponse(_))));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let result = parse_spine_response("{title: Dune}");
        assert!(matches!(result, Err(ExtractionError::MalformedResponse(_))));
    }

    #[test]
    fn json_embedded_in_prose() {
        let info =
            parse_spine_response("Sure! {\"title\": \"Emma\", \"author\": \"Jane Austen\"} hope that helps")
                .unwrap();
        assert_eq!(info.title, "Emma");
        assert_eq!(info.author, "Jane Austen");
    }
}
