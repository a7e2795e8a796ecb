//! String similarity for fuzzy reference matching.
//!
//! Bigram Sørensen–Dice over alphanumeric-normalized text, plus a parser
//! that reduces raw calendar attendee strings ("Name <email>", "email",
//! "Name (Guest)") to a bare display name.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// N-gram size used for similarity. Bigrams are the sweet spot for short
/// strings like meeting titles and person names.
const NGRAM_SIZE: usize = 2;

/// Overlapping n-grams of a string, after lowercasing and stripping
/// every non-alphanumeric character. Strings shorter than `n` after
/// cleaning yield no n-grams.
fn ngrams(s: &str, n: usize) -> Vec<String> {
    let cleaned: Vec<char> = s
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if cleaned.len() < n {
        return Vec::new();
    }
    cleaned.windows(n).map(|w| w.iter().collect()).collect()
}

/// Sørensen–Dice similarity between two strings, in [0, 1].
///
/// Strings that are identical after lowercasing and whitespace removal
/// score exactly 1.0 without touching the n-gram path. Otherwise the
/// score is `2 * common / (|a| + |b|)` over bigram multisets, where each
/// bigram occurrence on one side is consumed at most once — true
/// multiset Dice, not the set approximation.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let s1: String = a
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let s2: String = b
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if s1 == s2 {
        return 1.0;
    }

    let grams1 = ngrams(&s1, NGRAM_SIZE);
    let grams2 = ngrams(&s2, NGRAM_SIZE);
    if grams1.is_empty() || grams2.is_empty() {
        return 0.0;
    }

    let mut remaining: HashMap<&str, usize> = HashMap::new();
    for gram in &grams2 {
        *remaining.entry(gram.as_str()).or_insert(0) += 1;
    }

    let mut common = 0usize;
    for gram in &grams1 {
        if let Some(count) = remaining.get_mut(gram.as_str()) {
            if *count > 0 {
                *count -= 1;
                common += 1;
            }
        }
    }

    (2.0 * common as f64) / ((grams1.len() + grams2.len()) as f64)
}

/// Keep only characters plausible in a person's name: letters,
/// whitespace, hyphens, apostrophes. Input is already lowercased.
fn clean_name_fragment(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_whitespace() || *c == '-' || *c == '\'')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Extract a lowercase display name from a raw attendee string.
///
/// Handles, in order: "Name <email>", "Name (Guest)" / "Name (External)",
/// a bare email address (local part), and a bare name. May return an
/// empty string when nothing name-like survives.
pub fn extract_attendee_name(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let lowered = raw.to_lowercase();

    static ANGLE_RE: OnceLock<Regex> = OnceLock::new();
    let angle_re = ANGLE_RE.get_or_init(|| Regex::new(r"^(.*?)<.*>$").expect("static regex"));
    if let Some(captures) = angle_re.captures(&lowered) {
        let name = &captures[1];
        if !name.is_empty() {
            return name.trim().to_string();
        }
    }

    static GUEST_RE: OnceLock<Regex> = OnceLock::new();
    let guest_re =
        GUEST_RE.get_or_init(|| Regex::new(r"^(.*?)\s*\((guest|external)\)").expect("static regex"));
    if let Some(captures) = guest_re.captures(&lowered) {
        let name = &captures[1];
        if !name.is_empty() {
            return name.trim().to_string();
        }
    }

    if lowered.contains('@') {
        let local = lowered.split('@').next().unwrap_or(&lowered);
        return clean_name_fragment(local);
    }

    clean_name_fragment(&lowered)
}
