//! Candidate scoring for fuzzy event references.
//!
//! Combines n-gram title similarity with keyword-presence bonuses
//! (title, description) and attendee-name similarity bonuses into one
//! scalar score per candidate, then picks the best candidate above a
//! fixed threshold.

use std::collections::HashSet;

use crate::similarity::{extract_attendee_name, similarity};
use crate::types::CalendarEventSummary;

/// Minimum combined score for a candidate to be accepted.
pub const MIN_SCORE_THRESHOLD: f64 = 0.3;

/// Per-keyword bonus for appearing verbatim in the title, and its cap.
const TITLE_KEYWORD_BONUS: f64 = 0.05;
const MAX_TITLE_BONUS: f64 = 0.25;

/// Per-keyword bonus for appearing in the description, and its cap.
const DESCRIPTION_KEYWORD_BONUS: f64 = 0.025;
const MAX_DESCRIPTION_BONUS: f64 = 0.10;

/// Bonus per keyword that closely matches an attendee name, and its cap.
/// Each keyword counts once even if it matches several attendees.
const ATTENDEE_MATCH_BONUS: f64 = 0.15;
const MAX_ATTENDEE_BONUS: f64 = 0.30;

/// Similarity a keyword must exceed against an extracted attendee name
/// for the attendee bonus.
const ATTENDEE_NAME_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Ties at or below this score carry no signal and are not tie-broken.
const TIE_BREAK_FLOOR: f64 = 0.01;

/// Per-signal score components for one candidate.
#[derive(Debug, Clone, Copy)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub title_bonus: f64,
    pub description_bonus: f64,
    pub attendee_bonus: f64,
}

impl ScoreBreakdown {
    /// Bonuses can push the total past 1.0; there is no final clamp.
    pub fn total(&self) -> f64 {
        self.base + self.title_bonus + self.description_bonus + self.attendee_bonus
    }
}

/// Score one candidate event against the extracted keywords.
///
/// `joined_keywords` is the keywords joined with single spaces; it is the
/// reference text for the base similarity signal.
pub fn score_event(
    keywords: &[String],
    joined_keywords: &str,
    event: &CalendarEventSummary,
) -> ScoreBreakdown {
    let title_lower = event.title.to_lowercase();
    let description_lower = event
        .description
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default();

    let base = similarity(joined_keywords, &title_lower);

    let title_hits = keywords
        .iter()
        .filter(|k| title_lower.contains(k.as_str()))
        .count();
    let title_bonus = (title_hits as f64 * TITLE_KEYWORD_BONUS).min(MAX_TITLE_BONUS);

    let description_hits = keywords
        .iter()
        .filter(|k| description_lower.contains(k.as_str()))
        .count();
    let description_bonus =
        (description_hits as f64 * DESCRIPTION_KEYWORD_BONUS).min(MAX_DESCRIPTION_BONUS);

    let mut attendee_bonus = 0.0;
    if !event.attendees.is_empty() {
        let mut matched_keywords: HashSet<&str> = HashSet::new();
        for attendee in &event.attendees {
            let name = extract_attendee_name(attendee);
            if name.is_empty() {
                continue;
            }
            for keyword in keywords {
                if matched_keywords.contains(keyword.as_str()) {
                    continue;
                }
                if similarity(keyword, &name) > ATTENDEE_NAME_SIMILARITY_THRESHOLD {
                    attendee_bonus += ATTENDEE_MATCH_BONUS;
                    matched_keywords.insert(keyword);
                }
            }
        }
    }
    let attendee_bonus = attendee_bonus.min(MAX_ATTENDEE_BONUS);

    ScoreBreakdown {
        base,
        title_bonus,
        description_bonus,
        attendee_bonus,
    }
}

/// Pick the best-scoring candidate, or `None` if nothing reaches the
/// acceptance threshold.
///
/// Exact score ties (above the noise floor) prefer the candidate with
/// the earlier start time.
pub fn best_fuzzy_match<'a>(
    keywords: &[String],
    events: &'a [CalendarEventSummary],
) -> Option<(&'a CalendarEventSummary, f64)> {
    let joined_keywords = keywords.join(" ");

    let mut best_match: Option<&CalendarEventSummary> = None;
    let mut highest_score = 0.0_f64;

    for event in events {
        let breakdown = score_event(keywords, &joined_keywords, event);
        let score = breakdown.total();
        log::debug!(
            "candidate \"{}\": similarity={:.3} title_bonus={:.3} desc_bonus={:.3} attendee_bonus={:.3} total={:.3}",
            event.title,
            breakdown.base,
            breakdown.title_bonus,
            breakdown.description_bonus,
            breakdown.attendee_bonus,
            score
        );

        if score > highest_score {
            highest_score = score;
            best_match = Some(event);
        } else if score == highest_score && score > TIE_BREAK_FLOOR {
            if let Some(current) = best_match {
                if event.start_time < current.start_time {
                    log::debug!(
                        "tied score, preferring earlier event \"{}\" over \"{}\"",
                        event.title,
                        current.title
                    );
                    best_match = Some(event);
                }
            }
        }
    }

    match best_match {
        Some(event) if highest_score >= MIN_SCORE_THRESHOLD => Some((event, highest_score)),
        Some(event) => {
            log::info!(
                "best candidate \"{}\" scored {:.3}, below threshold {}",
                event.title,
                highest_score,
                MIN_SCORE_THRESHOLD
            );
            None
        }
        None => None,
    }
}
