//! Keyword lookup from complaint text to statutory sections.
//!
//! Auxiliary metadata for the evidence bundle; it has no effect on scoring.

use super::ensemble::normalize_for_comparison;
use super::types::ClassificationCode;

/// (keywords, section, offence). Keywords match a word prefix, or a whole
/// phrase for multi-word entries. Order here is output order.
const OFFENCE_TABLE: &[(&[&str], &str, &str)] = &[
    (&["theft", "stolen", "stole"], "379", "theft"),
    (&["robbery", "robbed"], "392", "robbery"),
    (&["assault"], "351", "assault"),
    (&["hurt", "injured"], "323", "voluntarily causing hurt"),
    (&["murder"], "302", "murder"),
    (&["kidnapping", "kidnapped", "abducted"], "363", "kidnapping"),
    (&["fraud", "cheating", "cheated"], "420", "cheating"),
    (&["harassment", "harassed"], "354", "harassment"),
    (&["intimidation", "threat"], "506", "criminal intimidation"),
    (&["burglary", "house breaking", "housebreaking"], "454", "house-breaking"),
    (&["extortion", "extorted"], "384", "extortion"),
    (&["defamation", "defamed"], "500", "defamation"),
    (&["dowry"], "498A", "cruelty for dowry"),
    (&["rape"], "376", "rape"),
    (&["cybercrime", "cyber crime", "hacking", "hacked"], "IT Act 66", "computer-related offence"),
];

/// Sections whose keywords appear in `text`, in table order, each once.
pub fn classify_offence(text: &str) -> Vec<ClassificationCode> {
    let normalized = normalize_for_comparison(text);
    let words: Vec<&str> = normalized.split(' ').collect();
    let padded = format!(" {normalized} ");

    OFFENCE_TABLE
        .iter()
        .filter(|(keywords, _, _)| {
            keywords.iter().any(|kw| {
                if kw.contains(' ') {
                    padded.contains(&format!(" {kw} "))
                } else {
                    words.iter().any(|w| w.starts_with(kw))
                }
            })
        })
        .map(|(_, code, offence)| ClassificationCode {
            code: code.to_string(),
            offence: offence.to_string(),
        })
        .collect()
}
