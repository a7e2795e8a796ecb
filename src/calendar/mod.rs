//! Fuzzy calendar-event lookup.
//!
//! Resolves a natural-language meeting reference ("my sync up tomorrow",
//! "budget review next week") to a concrete event: pick a date window
//! from optional hints, fetch candidates from the calendar source, score
//! each candidate, and accept the best one above a fixed threshold.

pub mod matcher;

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};

use crate::error::SkillError;
use crate::providers::CalendarSource;
use crate::types::CalendarEventSummary;

/// How many candidate events to pull from the calendar for one lookup.
const FUZZY_CANDIDATE_LIMIT: u32 = 50;

/// Default search window length when only one edge (or none) is hinted.
const DEFAULT_WINDOW_DAYS: i64 = 14;

/// Tokens carrying no matching signal. Includes "am"/"pm" since time
/// qualifiers belong to the date hints, not the event reference.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "its", "my", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with", "i", "me", "you", "he", "she", "we",
    "us", "am", "pm",
];

/// Keywords shorter than this are dropped unless nothing longer survives.
const MIN_KEYWORD_LEN: usize = 3;

/// Optional date hints narrowing the search for a calendar event.
///
/// `specific_date` wins over a start/end pair; a lone edge gets a
/// two-week window attached in the implied direction.
#[derive(Debug, Clone, Default)]
pub struct DateHints {
    pub specific_date: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// 00:00:00.000 UTC of the same day.
pub(crate) fn start_of_day_utc(dt: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&dt.date_naive().and_time(NaiveTime::MIN))
}

/// 23:59:59.999 UTC of the same day.
pub(crate) fn end_of_day_utc(dt: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day_utc(dt) + Duration::days(1) - Duration::milliseconds(1)
}

/// Resolve the concrete search window from the hints (or defaults).
///
/// Windows derived from a single hint land on day boundaries; an explicit
/// start/end pair is used verbatim.
pub fn resolve_search_window(
    hints: Option<&DateHints>,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    match hints {
        Some(DateHints {
            specific_date: Some(day),
            ..
        }) => (start_of_day_utc(*day), end_of_day_utc(*day)),
        Some(DateHints {
            start_date: Some(start),
            end_date: Some(end),
            ..
        }) => (*start, *end),
        Some(DateHints {
            start_date: Some(start),
            ..
        }) => (*start, end_of_day_utc(*start + Duration::days(DEFAULT_WINDOW_DAYS))),
        Some(DateHints {
            end_date: Some(end), ..
        }) => (
            start_of_day_utc(*end - Duration::days(DEFAULT_WINDOW_DAYS)),
            *end,
        ),
        _ => (
            start_of_day_utc(now),
            end_of_day_utc(now + Duration::days(DEFAULT_WINDOW_DAYS)),
        ),
    }
}

/// Extract matching keywords from a free-text meeting reference.
///
/// Splits on runs of non-alphanumerics, drops stop words and very short
/// tokens. If filtering empties the set, the short tokens come back
/// (catches references like "1:1"); if even that leaves nothing, all raw
/// tokens are used. The result is empty only for an empty reference.
pub fn extract_keywords(reference: &str) -> Vec<String> {
    let lowered = reference.to_lowercase();
    let raw_words: Vec<String> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect();

    let mut keywords: Vec<String> = raw_words
        .iter()
        .filter(|w| !STOP_WORDS.contains(&w.as_str()) && w.len() >= MIN_KEYWORD_LEN)
        .cloned()
        .collect();

    if keywords.is_empty() && !raw_words.is_empty() {
        log::debug!("no significant keywords in \"{}\"; falling back to short tokens", reference);
        keywords.extend(
            raw_words
                .iter()
                .filter(|w| w.len() < MIN_KEYWORD_LEN)
                .cloned(),
        );
        if keywords.is_empty() {
            keywords.extend(raw_words.iter().cloned());
        }
    }

    keywords
}

/// Find a calendar event from a natural-language reference and optional
/// date hints.
///
/// Returns `Ok(None)` when nothing in the window scores above the
/// acceptance threshold; upstream fetch failures surface as errors.
pub async fn find_event_by_fuzzy_reference<C: CalendarSource + ?Sized>(
    calendar: &C,
    user_id: &str,
    meeting_reference: &str,
    date_hints: Option<&DateHints>,
) -> Result<Option<CalendarEventSummary>, SkillError> {
    let (window_start, window_end) = resolve_search_window(date_hints, Utc::now());
    log::info!(
        "fuzzy lookup \"{}\" for {} in window {} .. {}",
        meeting_reference,
        user_id,
        window_start.to_rfc3339(),
        window_end.to_rfc3339()
    );

    let events = calendar
        .list_upcoming_events(
            user_id,
            FUZZY_CANDIDATE_LIMIT,
            Some(&window_start.to_rfc3339()),
            Some(&window_end.to_rfc3339()),
        )
        .await?;

    if events.is_empty() {
        log::info!("no events in the search window");
        return Ok(None);
    }

    let keywords = extract_keywords(meeting_reference);
    log::debug!("keywords: {}", keywords.join(", "));

    match matcher::best_fuzzy_match(&keywords, &events) {
        Some((event, score)) => {
            log::info!("best match \"{}\" with score {:.3}", event.title, score);
            Ok(Some(event.clone()))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;

    #[test]
    fn test_keywords_drop_stop_words_and_short_tokens() {
        let kws = extract_keywords("my budget review at 3 pm");
        assert_eq!(kws, vec!["budget".to_string(), "review".to_string()]);
    }

    #[test]
    fn test_keywords_fall_back_to_short_tokens() {
        // Everything is either a stop word or too short; short tokens
        // come back so "1:1" stays matchable.
        let kws = extract_keywords("my 1:1");
        assert_eq!(kws, vec!["1".to_string(), "1".to_string()]);
    }

    #[test]
    fn test_keywords_fall_back_to_raw_tokens() {
        // Only stop words of length >= 3: the short-token fallback is
        // empty, so the raw tokens are restored.
        let kws = extract_keywords("with the");
        assert_eq!(kws, vec!["with".to_string(), "the".to_string()]);
    }

    #[test]
    fn test_keywords_empty_reference() {
        assert!(extract_keywords("").is_empty());
    }

    #[test]
    fn test_window_specific_date() {
        let day = Utc.with_ymd_and_hms(2026, 8, 15, 14, 30, 0).unwrap();
        let hints = DateHints {
            specific_date: Some(day),
            ..Default::default()
        };
        let (start, end) = resolve_search_window(Some(&hints), Utc::now());
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 8, 15, 0, 0, 0).unwrap());
        assert_eq!(
            end,
            Utc.with_ymd_and_hms(2026, 8, 15, 23, 59, 59).unwrap()
                + Duration::milliseconds(999)
        );
        assert!(start <= end);
    }

    #[test]
    fn test_window_explicit_range_used_verbatim() {
        let start = Utc.with_ymd_and_hms(2026, 8, 10, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 8, 20, 17, 0, 0).unwrap();
        let hints = DateHints {
            specific_date: None,
            start_date: Some(start),
            end_date: Some(end),
        };
        assert_eq!(resolve_search_window(Some(&hints), Utc::now()), (start, end));
    }

    #[test]
    fn test_window_start_only_extends_forward_two_weeks() {
        let start = Utc.with_ymd_and_hms(2026, 8, 10, 9, 0, 0).unwrap();
        let hints = DateHints {
            start_date: Some(start),
            ..Default::default()
        };
        let (ws, we) = resolve_search_window(Some(&hints), Utc::now());
        assert_eq!(ws, start);
        assert_eq!(we, end_of_day_utc(start + Duration::days(14)));
    }

    #[test]
    fn test_window_end_only_extends_backward_two_weeks() {
        let end = Utc.with_ymd_and_hms(2026, 8, 20, 17, 0, 0).unwrap();
        let hints = DateHints {
            end_date: Some(end),
            ..Default::default()
        };
        let (ws, we) = resolve_search_window(Some(&hints), Utc::now());
        assert_eq!(ws, start_of_day_utc(end - Duration::days(14)));
        assert_eq!(we, end);
        assert!(ws <= we);
    }

    #[test]
    fn test_window_default_is_today_plus_two_weeks() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 13, 45, 0).unwrap();
        let (ws, we) = resolve_search_window(None, now);
        assert_eq!(ws, Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap());
        assert_eq!(we, end_of_day_utc(now + Duration::days(14)));
    }

    struct FixedCalendar {
        events: Vec<CalendarEventSummary>,
    }

    #[async_trait]
    impl CalendarSource for FixedCalendar {
        async fn list_upcoming_events(
            &self,
            _user_id: &str,
            _limit: u32,
            _time_min_iso: Option<&str>,
            _time_max_iso: Option<&str>,
        ) -> Result<Vec<CalendarEventSummary>, SkillError> {
            Ok(self.events.clone())
        }
    }

    fn sample_event(id: &str, title: &str, day: u32) -> CalendarEventSummary {
        CalendarEventSummary {
            id: id.to_string(),
            title: title.to_string(),
            start_time: Utc.with_ymd_and_hms(2026, 8, day, 9, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 8, day, 10, 0, 0).unwrap(),
            description: None,
            attendees: Vec::new(),
            location: None,
            organizer: None,
            html_link: None,
        }
    }

    #[tokio::test]
    async fn test_finder_empty_calendar_is_not_found() {
        let calendar = FixedCalendar { events: Vec::new() };
        let found = find_event_by_fuzzy_reference(&calendar, "user-1", "anything at all", None)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_finder_selects_exact_title() {
        let calendar = FixedCalendar {
            events: vec![
                sample_event("e1", "Team Lunch", 8),
                sample_event("e2", "Project Alpha Review", 10),
                sample_event("e3", "Marketing Strategy Meeting", 11),
                sample_event("e4", "1:1 with Sarah Miller", 12),
            ],
        };
        let found =
            find_event_by_fuzzy_reference(&calendar, "user-1", "Project Alpha Review", None)
                .await
                .unwrap()
                .expect("should find the exact-title event");
        assert_eq!(found.id, "e2");
    }

    #[tokio::test]
    async fn test_finder_rejects_weak_matches() {
        let calendar = FixedCalendar {
            events: vec![sample_event("e1", "Team Lunch", 8)],
        };
        let found =
            find_event_by_fuzzy_reference(&calendar, "user-1", "quarterly earnings call", None)
                .await
                .unwrap();
        assert!(found.is_none());
    }
}
