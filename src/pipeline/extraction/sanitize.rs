use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+([.,;:!?])").unwrap());
static MISSING_SPACE_AFTER_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.,;:!?])(\p{L})").unwrap());

/// Normalize recognized text (OCR or speech) before scoring.
///
/// Maps typographic quotes to ASCII, drops everything outside alphanumerics
/// and a conservative punctuation set, collapses whitespace (newlines
/// included) and normalizes spacing around punctuation.
pub fn normalize_recognized_text(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .filter(|c| {
            c.is_alphanumeric()
                || c.is_whitespace()
                || matches!(
                    c,
                    '.' | ',' | ';' | ':' | '\'' | '"' | '!' | '?' | '-' | '(' | ')' | '/'
                )
        })
        .collect();

    let collapsed = WHITESPACE_RUN.replace_all(&filtered, " ");
    let tightened = SPACE_BEFORE_PUNCT.replace_all(collapsed.trim(), "$1");
    MISSING_SPACE_AFTER_PUNCT
        .replace_all(&tightened, "$1 $2")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_control_characters() {
        let clean = normalize_recognized_text("Stolen\x00 bike\x01\x02 near market");
        assert_eq!(clean, "Stolen bike near market");
    }

    #[test]
    fn collapses_whitespace_and_newlines() {
        let clean = normalize_recognized_text("  theft   of\n\n motorcycle \t near  main market ");
        assert_eq!(clean, "theft of motorcycle near main market");
    }

    #[test]
    fn strips_symbols_outside_allowed_set() {
        let clean = normalize_recognized_text("Loss: Rs 5000 #urgent @police * ~");
        assert_eq!(clean, "Loss: Rs 5000 urgent police");
    }

    #[test]
    fn removes_space_before_punctuation() {
        let clean = normalize_recognized_text("He ran away , then stopped .");
        assert_eq!(clean, "He ran away, then stopped.");
    }

    #[test]
    fn adds_space_after_sentence_punctuation() {
        let clean = normalize_recognized_text("It was night.The shop was closed,nobody saw");
        assert_eq!(clean, "It was night. The shop was closed, nobody saw");
    }

    #[test]
    fn keeps_decimal_numbers_intact() {
        assert_eq!(normalize_recognized_text("at 4.30 pm"), "at 4.30 pm");
    }

    #[test]
    fn maps_typographic_quotes() {
        assert_eq!(normalize_recognized_text("neighbour\u{2019}s gate"), "neighbour's gate");
    }

    #[test]
    fn preserves_non_latin_letters() {
        let clean = normalize_recognized_text("चोरी हुई  है");
        assert_eq!(clean, "चोरी हुई है");
    }

    #[test]
    fn empty_input_returns_empty() {
        assert_eq!(normalize_recognized_text(""), "");
        assert_eq!(normalize_recognized_text("\x00\x01 \n"), "");
    }
}
