//! Urgency scoring for briefing items.
//!
//! A 0–100 integer per item, used only to order the briefing list.
//! Point values are calibrated against each other, not externally
//! meaningful: a meeting on the target day outranks a distant task,
//! an overdue task outranks almost everything.

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::types::{
    BriefingItem, BriefingItemType, BriefingPayload, NotionTask, TaskPriority,
};

const HIGH_URGENCY_KEYWORDS: &[&str] = &[
    "urgent",
    "asap",
    "critical",
    "action required",
    "outage",
    "important",
    "immediately",
];

const MEDIUM_URGENCY_KEYWORDS: &[&str] = &[
    "please review",
    "feedback needed",
    "deadline",
    "reminder",
    "follow-up",
    "question",
];

const HIGH_KEYWORD_BONUS: f64 = 25.0;
const MEDIUM_KEYWORD_BONUS: f64 = 15.0;

/// `YYYY-MM-DD` of a UTC timestamp.
fn utc_date_iso(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

fn parse_iso_utc(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn priority_bonus(priority: Option<TaskPriority>) -> f64 {
    match priority {
        Some(TaskPriority::High) => 10.0,
        Some(TaskPriority::Medium) => 5.0,
        Some(TaskPriority::Low) | None => 0.0,
    }
}

fn keyword_bonus(text: &str) -> f64 {
    if HIGH_URGENCY_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        HIGH_KEYWORD_BONUS
    } else if MEDIUM_URGENCY_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        MEDIUM_KEYWORD_BONUS
    } else {
        0.0
    }
}

fn task_score(task: &NotionTask, target_date_iso: &str, now: DateTime<Utc>) -> f64 {
    if task.status.is_closed() {
        return 0.0;
    }

    let bonus = priority_bonus(task.priority);

    match task.due_date.as_deref() {
        Some(due) => {
            let due_date_only = due.split('T').next().unwrap_or(due);
            if due_date_only < target_date_iso {
                // Overdue relative to the target date.
                80.0 + bonus
            } else if due_date_only == target_date_iso {
                70.0 + bonus
            } else {
                let diff_days = chrono::NaiveDate::parse_from_str(due_date_only, "%Y-%m-%d")
                    .ok()
                    .zip(chrono::NaiveDate::parse_from_str(target_date_iso, "%Y-%m-%d").ok())
                    .map(|(due, target)| (due - target).num_days());
                match diff_days {
                    Some(d) if d <= 3 => 50.0 + bonus,
                    // Distant tasks get only a trimmed priority bonus.
                    _ => 30.0 + if bonus > 0.0 { bonus.min(5.0) } else { 0.0 },
                }
            }
        }
        None => {
            let mut score = 25.0 + bonus;
            // Recently-touched undated tasks are likely still live.
            let activity = task
                .last_edited_time
                .as_deref()
                .or(task.created_date.as_deref());
            if let Some(activity_str) = activity {
                match parse_iso_utc(activity_str) {
                    Some(activity_date) => {
                        let days_since =
                            (now - activity_date).num_seconds() as f64 / 86_400.0;
                        if days_since <= 7.0 {
                            score += 5.0;
                        }
                    }
                    None => {
                        log::warn!("could not parse task activity date: {}", activity_str)
                    }
                }
            }
            score
        }
    }
}

/// Compute the urgency score for one briefing item.
///
/// `target_date_iso` is the briefing's resolved day (`YYYY-MM-DD`);
/// `now` feeds the "how recent / how soon" branches and equals the wall
/// clock in production.
pub fn calculate_urgency_score(
    title: &str,
    details: Option<&str>,
    payload: &BriefingPayload,
    target_date_iso: &str,
    now: DateTime<Utc>,
) -> i64 {
    let text_to_scan = format!("{} {}", title, details.unwrap_or("")).to_lowercase();
    let kw_bonus = keyword_bonus(&text_to_scan);
    let today_iso = utc_date_iso(now);

    let mut score: f64 = 0.0;

    match payload {
        BriefingPayload::Meeting(meeting) => {
            if utc_date_iso(meeting.start_time) == target_date_iso {
                // On the target day at all.
                score += 40.0;

                // Earlier meetings matter more: linear decay across the day.
                let hours_from_midnight = meeting.start_time.hour() as f64
                    + meeting.start_time.minute() as f64 / 60.0;
                let time_proximity = ((24.0 - hours_from_midnight) * 2.5).max(0.0);
                score += time_proximity.min(40.0);

                // Imminence only applies when the target day is today.
                if target_date_iso == today_iso && meeting.start_time > now {
                    let hours_until =
                        (meeting.start_time - now).num_seconds() as f64 / 3600.0;
                    if hours_until < 1.0 {
                        score += 5.0;
                    } else if hours_until < 3.0 {
                        score += 3.0;
                    }
                }

                // Small meetings are harder to skip.
                let attendee_count = meeting.attendees.len();
                if attendee_count <= 2 {
                    score += 20.0;
                } else if attendee_count <= 5 {
                    score += 10.0;
                }
            }
        }
        BriefingPayload::Task(task) => {
            score = task_score(task, target_date_iso, now);
        }
        BriefingPayload::Email(email) => {
            score += 50.0;
            score += kw_bonus;
            if let Some(date) = email.date.as_deref().and_then(parse_iso_utc) {
                if target_date_iso == today_iso {
                    let hours_ago = (now - date).num_seconds() as f64 / 3600.0;
                    if (0.0..4.0).contains(&hours_ago) {
                        score += 5.0;
                    }
                }
            }
        }
        BriefingPayload::SlackMessage(msg) => {
            score += 45.0;
            score += kw_bonus;
            if let Some(ts) = msg.timestamp.as_deref().and_then(parse_iso_utc) {
                if target_date_iso == today_iso {
                    let hours_ago = (now - ts).num_seconds() as f64 / 3600.0;
                    if (0.0..2.0).contains(&hours_ago) {
                        score += 5.0;
                    }
                }
            }
        }
        BriefingPayload::TeamsMessage(msg) => {
            score += 45.0;
            score += kw_bonus;
            if let Some(created) = msg.created_date_time.as_deref().and_then(parse_iso_utc) {
                if target_date_iso == today_iso {
                    let hours_ago = (now - created).num_seconds() as f64 / 3600.0;
                    if (0.0..2.0).contains(&hours_ago) {
                        score += 5.0;
                    }
                }
            }
        }
    }

    (score.round() as i64).clamp(0, 100)
}

fn type_order(item_type: BriefingItemType) -> u8 {
    match item_type {
        BriefingItemType::Meeting => 1,
        BriefingItemType::Task => 2,
        BriefingItemType::Email => 3,
        BriefingItemType::SlackMessage => 4,
        BriefingItemType::TeamsMessage => 5,
    }
}

fn due_date_key(task: &NotionTask) -> i64 {
    task.due_date
        .as_deref()
        .and_then(|d| {
            chrono::NaiveDate::parse_from_str(d.split('T').next().unwrap_or(d), "%Y-%m-%d").ok()
        })
        .map(|d| d.num_days_from_ce() as i64)
        .unwrap_or(i64::MAX)
}

fn email_date_key(date: Option<&str>) -> i64 {
    date.and_then(parse_iso_utc)
        .map(|d| d.timestamp_millis())
        .unwrap_or(0)
}

/// Sort briefing items: urgency first, then type-specific secondary keys
/// for same-type ties, then a fixed cross-type priority order.
pub fn sort_priority_items(items: &mut [BriefingItem]) {
    items.sort_by(|a, b| {
        b.urgency_score.cmp(&a.urgency_score).then_with(|| {
            match (&a.payload, &b.payload) {
                (BriefingPayload::Meeting(ma), BriefingPayload::Meeting(mb)) => {
                    // Earlier meeting first.
                    ma.start_time.cmp(&mb.start_time)
                }
                (BriefingPayload::Task(ta), BriefingPayload::Task(tb)) => {
                    // Earlier due date first; undated last.
                    due_date_key(ta).cmp(&due_date_key(tb))
                }
                (BriefingPayload::Email(ea), BriefingPayload::Email(eb)) => {
                    // Newer email first.
                    email_date_key(eb.date.as_deref()).cmp(&email_date_key(ea.date.as_deref()))
                }
                _ => type_order(a.item_type).cmp(&type_order(b.item_type)),
            }
        })
    });
}
