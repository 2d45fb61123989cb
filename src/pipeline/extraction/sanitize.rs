//! Recognized-text cleanup before prompting.
//!
//! Spine OCR output is noisy: stray control characters from rotated
//! glyphs, runs of whitespace where the layout broke. Normalization keeps
//! the prompt compact and makes the validator's length check meaningful.

/// Collapse whitespace runs to single spaces and strip control characters.
pub fn normalize_spine_text(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(
            normalize_spine_text("DUNE\n\n  Frank\tHerbert  "),
            "DUNE Frank Herbert"
        );
    }

    #[test]
    fn strips_control_characters() {
        assert_eq!(normalize_spine_text("Du\u{0000}ne\u{0007}"), "Dune");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize_spine_text("   \n\t "), "");
    }

    #[test]
    fn accented_titles_survive() {
        assert_eq!(
            normalize_spine_text("L'Étranger   Albert Camus"),
            "L'Étranger Albert Camus"
        );
    }
}
