//! Free-text date-context resolution for briefings.
//!
//! Maps hints like "today", "tomorrow", "2026-08-15", "next monday",
//! "August 15" onto a concrete UTC day. Parsing never fails hard:
//! unrecognized input falls back to today and carries a warning the
//! briefing surfaces to the user.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, SecondsFormat, TimeZone, Utc};
use regex::Regex;

use crate::calendar::{end_of_day_utc, start_of_day_utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// Input was recognized.
    Parsed,
    /// No input given; today was assumed.
    Defaulted,
    /// Input was not recognized; today was assumed and a warning set.
    Unparseable,
}

/// A resolved briefing day.
#[derive(Debug, Clone)]
pub struct ParsedDateContext {
    /// Always 00:00:00.000 UTC of the resolved day.
    pub target_date: DateTime<Utc>,
    /// Start of the day, ISO 8601 with milliseconds.
    pub time_min_iso: String,
    /// End of the day (23:59:59.999), ISO 8601 with milliseconds.
    pub time_max_iso: String,
    /// `YYYY-MM-DD` of the resolved day.
    pub target_date_iso: String,
    pub status: ParseStatus,
    pub original_input: Option<String>,
    /// Set exactly when `status` is `Unparseable`.
    pub warning_message: Option<String>,
}

fn weekday_number(name: &str) -> Option<u32> {
    // Sunday-based, matching calendar convention.
    match name {
        "sunday" => Some(0),
        "monday" => Some(1),
        "tuesday" => Some(2),
        "wednesday" => Some(3),
        "thursday" => Some(4),
        "friday" => Some(5),
        "saturday" => Some(6),
        _ => None,
    }
}

fn month_number(prefix: &str) -> Option<u32> {
    match prefix {
        "jan" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}

/// Resolve a date-context hint against a base date.
///
/// `None` (or empty) input defaults to today. "next"/"last" weekdays are
/// strictly directional: asking for "next monday" on a Monday lands a
/// full week out, never on the base day. A month-day without a year that
/// has already passed rolls forward to next year; if the roll produces an
/// invalid date (Feb 29) the input counts as unparseable.
pub fn parse_date_context(input: Option<&str>, base_date: DateTime<Utc>) -> ParsedDateContext {
    let original_input = input.map(String::from);
    let mut status = ParseStatus::Parsed;
    let mut warning_message = None;

    let effective = match input {
        Some(s) if !s.is_empty() => s,
        _ => "today",
    };
    let normalized = effective.to_lowercase();
    let normalized = normalized.trim();

    let mut target_date = start_of_day_utc(base_date);
    let mut parsed = false;

    match normalized {
        "today" => {
            if input.map(str::is_empty).unwrap_or(true) {
                status = ParseStatus::Defaulted;
            }
            parsed = true;
        }
        "tomorrow" => {
            target_date = start_of_day_utc(base_date) + Duration::days(1);
            parsed = true;
        }
        "yesterday" => {
            target_date = start_of_day_utc(base_date) - Duration::days(1);
            parsed = true;
        }
        _ => {}
    }

    if !parsed {
        static YMD_RE: OnceLock<Regex> = OnceLock::new();
        let ymd_re =
            YMD_RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("static regex"));
        if let Some(captures) = ymd_re.captures(normalized) {
            let year: i32 = captures[1].parse().unwrap_or(0);
            let month: u32 = captures[2].parse().unwrap_or(0);
            let day: u32 = captures[3].parse().unwrap_or(0);
            match NaiveDate::from_ymd_opt(year, month, day) {
                Some(date) => {
                    target_date = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default());
                    parsed = true;
                }
                None => log::warn!("invalid calendar date: {}", normalized),
            }
        }
    }

    if !parsed {
        static RELATIVE_RE: OnceLock<Regex> = OnceLock::new();
        let relative_re = RELATIVE_RE.get_or_init(|| {
            Regex::new(r"^(next|last)\s+(sunday|monday|tuesday|wednesday|thursday|friday|saturday)")
                .expect("static regex")
        });
        if let Some(captures) = relative_re.captures(normalized) {
            let direction = &captures[1];
            if let Some(target_dow) = weekday_number(&captures[2]) {
                let base_day = start_of_day_utc(base_date);
                let current_dow = base_day.weekday().num_days_from_sunday();
                let offset = if direction == "next" {
                    let mut days_ahead = (target_dow as i64 - current_dow as i64).rem_euclid(7);
                    if days_ahead == 0 {
                        days_ahead = 7;
                    }
                    days_ahead
                } else {
                    let mut days_back = (current_dow as i64 - target_dow as i64).rem_euclid(7);
                    if days_back == 0 {
                        days_back = 7;
                    }
                    -days_back
                };
                target_date = base_day + Duration::days(offset);
                parsed = true;
                if normalized.contains(" at ") {
                    log::info!("time part in \"{}\" ignored; using start of day", effective);
                }
            }
        }
    }

    if !parsed {
        static MONTH_DAY_RE: OnceLock<Regex> = OnceLock::new();
        let month_day_re = MONTH_DAY_RE.get_or_init(|| {
            Regex::new(
                r"^(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:tember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\s+(\d{1,2})(?:st|nd|rd|th)?(?:,?\s*(\d{4}))?",
            )
            .expect("static regex")
        });
        if let Some(captures) = month_day_re.captures(normalized) {
            let month = month_number(&captures[1][..3]);
            let day: u32 = captures[2].parse().unwrap_or(0);
            let explicit_year: Option<i32> = captures.get(3).and_then(|y| y.as_str().parse().ok());

            if let Some(month) = month {
                if (1..=31).contains(&day) {
                    let year = explicit_year.unwrap_or_else(|| base_date.year());
                    match NaiveDate::from_ymd_opt(year, month, day) {
                        Some(mut date) => {
                            // A no-year date already behind us means next year.
                            if explicit_year.is_none()
                                && date < start_of_day_utc(base_date).date_naive()
                            {
                                match NaiveDate::from_ymd_opt(year + 1, month, day) {
                                    Some(rolled) => {
                                        date = rolled;
                                        parsed = true;
                                    }
                                    None => {
                                        log::warn!(
                                            "month-day \"{}\" is invalid for next year",
                                            normalized
                                        );
                                    }
                                }
                            } else {
                                parsed = true;
                            }
                            if parsed {
                                target_date = Utc.from_utc_datetime(
                                    &date.and_hms_opt(0, 0, 0).unwrap_or_default(),
                                );
                                if normalized.contains(" at ") {
                                    log::info!(
                                        "time part in \"{}\" ignored; using start of day",
                                        effective
                                    );
                                }
                            }
                        }
                        None => log::warn!("invalid month-day combination: {}", normalized),
                    }
                } else {
                    log::warn!("could not parse month/day from: {}", normalized);
                }
            }
        }
    }

    if !parsed {
        target_date = start_of_day_utc(base_date);
        status = ParseStatus::Unparseable;
        let shown = original_input.as_deref().unwrap_or("");
        let warning = format!(
            "Date context \"{}\" is not recognized or is invalid. Defaulting to today.",
            shown
        );
        log::warn!("{}", warning);
        warning_message = Some(warning);
    }

    let target_date = start_of_day_utc(target_date);
    ParsedDateContext {
        target_date,
        time_min_iso: target_date.to_rfc3339_opts(SecondsFormat::Millis, true),
        time_max_iso: end_of_day_utc(target_date).to_rfc3339_opts(SecondsFormat::Millis, true),
        target_date_iso: target_date.format("%Y-%m-%d").to_string(),
        status,
        original_input,
        warning_message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> DateTime<Utc> {
        // Friday, 2026-08-07, mid-afternoon UTC.
        Utc.with_ymd_and_hms(2026, 8, 7, 15, 30, 0).unwrap()
    }

    #[test]
    fn test_missing_input_defaults_to_today() {
        let ctx = parse_date_context(None, base());
        assert_eq!(ctx.status, ParseStatus::Defaulted);
        assert_eq!(ctx.target_date_iso, "2026-08-07");
        assert_eq!(ctx.time_min_iso, "2026-08-07T00:00:00.000Z");
        assert_eq!(ctx.time_max_iso, "2026-08-07T23:59:59.999Z");
        assert!(ctx.warning_message.is_none());
    }

    #[test]
    fn test_explicit_today_is_parsed_not_defaulted() {
        let ctx = parse_date_context(Some("Today"), base());
        assert_eq!(ctx.status, ParseStatus::Parsed);
        assert_eq!(ctx.target_date_iso, "2026-08-07");
    }

    #[test]
    fn test_tomorrow_and_yesterday() {
        assert_eq!(
            parse_date_context(Some("tomorrow"), base()).target_date_iso,
            "2026-08-08"
        );
        assert_eq!(
            parse_date_context(Some("yesterday"), base()).target_date_iso,
            "2026-08-06"
        );
    }

    #[test]
    fn test_iso_date() {
        let ctx = parse_date_context(Some("2026-12-24"), base());
        assert_eq!(ctx.status, ParseStatus::Parsed);
        assert_eq!(ctx.target_date_iso, "2026-12-24");
        assert_eq!(
            ctx.target_date,
            Utc.with_ymd_and_hms(2026, 12, 24, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_invalid_iso_date_is_unparseable() {
        let ctx = parse_date_context(Some("2026-02-30"), base());
        assert_eq!(ctx.status, ParseStatus::Unparseable);
        assert_eq!(ctx.target_date_iso, "2026-08-07");
        assert!(ctx.warning_message.is_some());
    }

    #[test]
    fn test_next_weekday_is_strictly_forward() {
        // Base is a Friday; "next friday" must land 7 days out, not today.
        let ctx = parse_date_context(Some("next friday"), base());
        assert_eq!(ctx.target_date_iso, "2026-08-14");

        // And from a Monday, "next monday" is exactly one week later.
        let monday = Utc.with_ymd_and_hms(2026, 8, 10, 9, 0, 0).unwrap();
        let ctx = parse_date_context(Some("next monday"), monday);
        assert_eq!(ctx.target_date_iso, "2026-08-17");
    }

    #[test]
    fn test_next_weekday_crosses_into_next_week() {
        // Base Friday 2026-08-07; next wednesday is 2026-08-12.
        let ctx = parse_date_context(Some("next wednesday"), base());
        assert_eq!(ctx.target_date_iso, "2026-08-12");
    }

    #[test]
    fn test_last_weekday_is_strictly_backward() {
        // Base Friday; "last friday" is a full week back.
        let ctx = parse_date_context(Some("last friday"), base());
        assert_eq!(ctx.target_date_iso, "2026-07-31");

        // "last monday" from Friday is the Monday of the same week.
        let ctx = parse_date_context(Some("last monday"), base());
        assert_eq!(ctx.target_date_iso, "2026-08-03");
    }

    #[test]
    fn test_weekday_with_time_part_ignores_time() {
        let ctx = parse_date_context(Some("next monday at 3pm"), base());
        assert_eq!(ctx.status, ParseStatus::Parsed);
        assert_eq!(ctx.target_date_iso, "2026-08-10");
        assert_eq!(ctx.target_date.format("%H:%M:%S").to_string(), "00:00:00");
    }

    #[test]
    fn test_month_day_future_this_year() {
        let ctx = parse_date_context(Some("December 1st"), base());
        assert_eq!(ctx.status, ParseStatus::Parsed);
        assert_eq!(ctx.target_date_iso, "2026-12-01");
    }

    #[test]
    fn test_month_day_abbreviated_with_year() {
        let ctx = parse_date_context(Some("dec 1, 2027"), base());
        assert_eq!(ctx.target_date_iso, "2027-12-01");
    }

    #[test]
    fn test_month_day_already_passed_rolls_to_next_year() {
        // March 5 has passed by August 7, 2026.
        let ctx = parse_date_context(Some("March 5"), base());
        assert_eq!(ctx.status, ParseStatus::Parsed);
        assert_eq!(ctx.target_date_iso, "2027-03-05");
    }

    #[test]
    fn test_feb_29_rolling_into_non_leap_year_is_unparseable() {
        // 2028 is a leap year; base inside 2028 after Feb 29 rolls the
        // date into 2029, which has no Feb 29.
        let base = Utc.with_ymd_and_hms(2028, 6, 1, 12, 0, 0).unwrap();
        let ctx = parse_date_context(Some("February 29"), base);
        assert_eq!(ctx.status, ParseStatus::Unparseable);
        assert_eq!(ctx.target_date_iso, "2028-06-01");
        assert!(ctx.warning_message.is_some());
    }

    #[test]
    fn test_garbage_is_unparseable_with_warning() {
        let ctx = parse_date_context(Some("garbage-text"), base());
        assert_eq!(ctx.status, ParseStatus::Unparseable);
        assert_eq!(ctx.target_date_iso, "2026-08-07");
        let warning = ctx.warning_message.expect("warning expected");
        assert!(warning.contains("garbage-text"));
    }

    #[test]
    fn test_target_date_always_midnight_utc() {
        for input in [None, Some("tomorrow"), Some("2026-09-03"), Some("nonsense")] {
            let ctx = parse_date_context(input, base());
            assert_eq!(
                ctx.target_date,
                start_of_day_utc(ctx.target_date),
                "input {input:?} should resolve to midnight UTC"
            );
        }
    }
}
