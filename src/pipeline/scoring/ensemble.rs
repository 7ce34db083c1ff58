//! Deterministic local agreement score. No I/O.
//!
//! score = round(40·jaccard + 40·cosine + 20·(100 − editDistance)/100)
//!
//! The 40/40/20 split is a fixed choice: token overlap and term frequency
//! carry the meaning, character distance only breaks ties between
//! paraphrases. It is not tuned at runtime.

use std::collections::{BTreeMap, BTreeSet};

use super::types::ScoreMetrics;

pub const JACCARD_WEIGHT: f64 = 40.0;
pub const COSINE_WEIGHT: f64 = 40.0;
pub const EDIT_WEIGHT: f64 = 20.0;

/// Tokens this short never count.
const MIN_TOKEN_LEN: usize = 3;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "has", "had", "have", "having", "with", "that",
    "this", "these", "those", "from", "his", "her", "hers", "him", "she", "they", "them",
    "their", "there", "then", "than", "into", "onto", "been", "being", "will", "would",
    "could", "should", "shall", "not", "but", "you", "your", "yours", "our", "ours", "its",
    "who", "whom", "what", "when", "where", "which", "while", "why", "how", "all", "any",
    "can", "did", "does", "doing", "also", "about", "after", "before", "over", "under",
    "again", "some", "such", "only", "own", "same", "very", "just", "too", "each", "few",
    "more", "most", "other", "both", "through", "during", "until", "because", "myself",
    "yourself", "himself", "herself", "itself", "themselves", "off", "out", "once", "here",
];

/// Lowercase, replace everything that is not part of a word with spaces,
/// collapse whitespace. Letters and digits of any script count as word
/// characters, as do the combining signs of the Indic blocks.
pub fn normalize_for_comparison(text: &str) -> String {
    let mapped: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if is_word_char(c) { c } else { ' ' })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_word_char(c: char) -> bool {
    if c.is_alphanumeric() {
        return true;
    }
    // Viramas and vowel signs sit inside words; the dandas end sentences.
    matches!(c, '\u{0300}'..='\u{036F}' | '\u{0900}'..='\u{0DFF}')
        && !matches!(c, '\u{0964}' | '\u{0965}')
}

/// Content tokens: normalized words minus stop words and short tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize_for_comparison(text)
        .split(' ')
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// |A∩B| / |A∪B|. Two empty sets are identical and score 1.
pub fn jaccard(a: &[String], b: &[String]) -> f64 {
    let sa: BTreeSet<&str> = a.iter().map(String::as_str).collect();
    let sb: BTreeSet<&str> = b.iter().map(String::as_str).collect();
    let union = sa.union(&sb).count();
    if union == 0 {
        return 1.0;
    }
    sa.intersection(&sb).count() as f64 / union as f64
}

/// Cosine similarity of term-frequency vectors over the union vocabulary.
pub fn cosine(a: &[String], b: &[String]) -> f64 {
    fn term_counts(tokens: &[String]) -> BTreeMap<&str, f64> {
        let mut m = BTreeMap::new();
        for t in tokens {
            *m.entry(t.as_str()).or_insert(0.0) += 1.0;
        }
        m
    }
    let ta = term_counts(a);
    let tb = term_counts(b);

    let dot: f64 = ta
        .iter()
        .filter_map(|(k, va)| tb.get(k).map(|vb| va * vb))
        .sum();
    let norm_a = ta.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b = tb.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Levenshtein distance in characters (two-row dynamic programming).
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Scale a raw edit distance to 0-100 of the longer normalized text.
pub fn normalized_edit_distance(distance: usize, a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    (100.0 * distance as f64 / longest as f64).min(100.0)
}

/// Score two texts with the local ensemble.
pub fn ensemble_score(a: &str, b: &str) -> (u8, ScoreMetrics) {
    let na = normalize_for_comparison(a);
    let nb = normalize_for_comparison(b);
    if na == nb {
        return (
            100,
            ScoreMetrics {
                jaccard: 1.0,
                cosine: 1.0,
                edit_distance: 0.0,
            },
        );
    }

    let tokens_a = tokenize(&na);
    let tokens_b = tokenize(&nb);
    let j = jaccard(&tokens_a, &tokens_b);
    let c = cosine(&tokens_a, &tokens_b);

    let edit_distance = normalized_edit_distance(levenshtein(&na, &nb), &na, &nb);

    let raw = JACCARD_WEIGHT * j
        + COSINE_WEIGHT * c
        + EDIT_WEIGHT * (100.0 - edit_distance).max(0.0) / 100.0;
    let score = raw.round().clamp(0.0, 100.0) as u8;

    (
        score,
        ScoreMetrics {
            jaccard: j,
            cosine: c,
            edit_distance,
        },
    )
}
