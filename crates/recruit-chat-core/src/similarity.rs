//! Text normalization and typo-tolerant matching.
//!
//! The similarity score is the Jaccard index of the two strings' character
//! sets. It is not an edit distance: anagrams score 1.0 and short strings
//! produce false positives (`"aws"` vs `"was"`). Call sites that match
//! single short tokens guard against that themselves.

use std::collections::HashSet;

/// Default threshold for field-level typo tolerance.
pub const FIELD_MATCH_THRESHOLD: f64 = 0.7;

/// Threshold for word-level substitution in broad search.
pub const WORD_MATCH_THRESHOLD: f64 = 0.75;

/// Lowercase, replace punctuation with spaces, and collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let replaced: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn char_set(normalized: &str) -> HashSet<char> {
    normalized.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Character-set Jaccard similarity of two strings after normalization.
///
/// Two empty inputs are identical and score `1.0`; one empty input scores `0.0`.
pub fn calculate_similarity(a: &str, b: &str) -> f64 {
    let set_a = char_set(&normalize_text(a));
    let set_b = char_set(&normalize_text(b));

    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count() as f64;
    let union = set_a.union(&set_b).count() as f64;
    intersection / union
}

/// Two strings match if either contains the other after normalization, or if
/// their similarity exceeds `threshold`. Empty strings never match.
pub fn fuzzy_match(a: &str, b: &str, threshold: f64) -> bool {
    let na = normalize_text(a);
    let nb = normalize_text(b);
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    na.contains(&nb) || nb.contains(&na) || calculate_similarity(&na, &nb) > threshold
}

/// Whether `needle` occurs in `haystack`, tolerating typos.
///
/// Exact containment of the normalized needle wins. Otherwise every window of
/// haystack words with the same word count as the needle is compared with
/// [`calculate_similarity`].
pub fn fuzzy_contains(haystack: &str, needle: &str, threshold: f64) -> bool {
    let hay = normalize_text(haystack);
    let nee = normalize_text(needle);
    if hay.is_empty() || nee.is_empty() {
        return false;
    }
    if hay.contains(&nee) {
        return true;
    }

    let hay_words: Vec<&str> = hay.split(' ').collect();
    let width = nee.split(' ').count();
    if width > hay_words.len() {
        return false;
    }
    hay_words
        .windows(width)
        .any(|w| calculate_similarity(&w.join(" "), &nee) > threshold)
}

/// Fraction of `terms` present in `text`, counting a term as present when it
/// is an exact word of the text or some word scores above `threshold`.
pub fn word_match_ratio(text: &str, terms: &[String], threshold: f64) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let normalized = normalize_text(text);
    let words: HashSet<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();

    let hits = terms
        .iter()
        .filter(|term| {
            let term = normalize_text(term);
            words.contains(term.as_str())
                || words
                    .iter()
                    .any(|w| calculate_similarity(w, &term) > threshold)
        })
        .count();
    hits as f64 / terms.len() as f64
}
