//! Prompt template for spine-text → bibliographic-record inference.

/// System prompt fixing the output contract.
pub const SPINE_SYSTEM_PROMPT: &str = "\
You are a bibliographic extraction assistant. You are given text read from \
a single book spine, possibly fragmentary or reordered. Identify the book's \
title and author. Respond with a single JSON object: \
{\"title\": string, \"author\": string}. Use an empty string for a field \
you cannot determine. Never invent a title or author that is not supported \
by the given text.";

/// Build the user prompt for one spine.
pub fn build_spine_prompt(spine_text: &str) -> String {
    format!(
        "Text recognized on the book spine:\n---\n{spine_text}\n---\n\
         Extract the title and author as JSON."
    )
}
