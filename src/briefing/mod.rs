//! Daily priority briefing.
//!
//! Consolidates the user's day — meetings, tasks, unread email, chat
//! pings — into one urgency-sorted list. Each source is fetched
//! independently; a failing source contributes an error entry instead of
//! aborting, so a briefing is always produced, possibly partial.

pub mod date_context;
pub mod urgency;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::calendar::start_of_day_utc;
use crate::providers::{CalendarSource, EmailSource, SlackSource, TaskSource, TeamsSource};
use crate::types::{
    BriefingError, BriefingItem, BriefingItemType, BriefingPayload, BriefingRequest,
    BriefingSourceArea, DailyBriefingData, FocusArea, NotionTask, QueryTaskParams, TaskPriority,
    TaskStatus, UrgencyLevel,
};

use self::date_context::{parse_date_context, ParseStatus, ParsedDateContext};
use self::urgency::{calculate_urgency_score, sort_priority_items};

/// Cap per task query (overdue and due-today are queried separately).
const TASK_FETCH_LIMIT: u32 = 10;
/// Cap on meetings pulled for the target day.
const MEETING_FETCH_LIMIT: u32 = 10;
/// Cap per message source (email, Slack, Teams).
const MESSAGE_FETCH_LIMIT: u32 = 3;

const DEFAULT_FOCUS_AREAS: &[FocusArea] = &[
    FocusArea::Tasks,
    FocusArea::Meetings,
    FocusArea::UrgentEmails,
    FocusArea::UrgentSlackMessages,
];

/// The sources a briefing draws from. Unconfigured sources stay `None`
/// and surface as recorded errors when their focus area is requested.
#[derive(Default)]
pub struct BriefingSources<'a> {
    pub calendar: Option<&'a dyn CalendarSource>,
    pub tasks: Option<&'a dyn TaskSource>,
    pub email: Option<&'a dyn EmailSource>,
    pub slack: Option<&'a dyn SlackSource>,
    pub teams: Option<&'a dyn TeamsSource>,
}

/// Generate a daily priority briefing.
///
/// Always returns briefing data; per-source failures are aggregated into
/// `errors_encountered` and partial results are kept.
pub async fn generate_daily_briefing(
    sources: &BriefingSources<'_>,
    user_id: &str,
    request: &BriefingRequest,
) -> DailyBriefingData {
    let now = Utc::now();
    let parsed = parse_date_context(request.date_context.as_deref(), now);
    log::info!(
        "generating briefing for {} with date context {:?}, resolved to {}",
        user_id,
        request.date_context,
        parsed.target_date_iso
    );

    let mut data = DailyBriefingData {
        briefing_date: parsed.target_date_iso.clone(),
        user_id: user_id.to_string(),
        priority_items: Vec::new(),
        overall_summary_message: None,
        errors_encountered: Vec::new(),
    };

    if let Some(warning) = &parsed.warning_message {
        data.errors_encountered.push(BriefingError {
            source_area: BriefingSourceArea::DateParsing,
            message: warning.clone(),
            details: parsed
                .original_input
                .as_deref()
                .map(|orig| format!("Original input: {orig}")),
        });
    }

    let focus_areas: Vec<FocusArea> = request
        .focus_areas
        .clone()
        .unwrap_or_else(|| DEFAULT_FOCUS_AREAS.to_vec());

    if focus_areas.contains(&FocusArea::Tasks) {
        fetch_tasks(sources, user_id, request, &parsed, now, &mut data).await;
    }
    if focus_areas.contains(&FocusArea::Meetings) {
        fetch_meetings(sources, user_id, &parsed, now, &mut data).await;
    }
    if focus_areas.contains(&FocusArea::UrgentEmails) {
        fetch_emails(sources, user_id, &parsed, now, &mut data).await;
    }
    if focus_areas.contains(&FocusArea::UrgentSlackMessages) {
        fetch_slack_messages(sources, user_id, &parsed, now, &mut data).await;
    }
    if focus_areas.contains(&FocusArea::UrgentTeamsMessages) {
        fetch_teams_messages(sources, user_id, &parsed, now, &mut data).await;
    }

    sort_priority_items(&mut data.priority_items);
    log::info!("sorted {} priority items", data.priority_items.len());

    data.overall_summary_message = Some(build_summary(&data, &focus_areas, &parsed, now));
    data
}

// ============================================================================
// Tasks
// ============================================================================

fn priority_filter(request: &BriefingRequest) -> Option<TaskPriority> {
    match request.urgency_level {
        Some(UrgencyLevel::High) | Some(UrgencyLevel::Critical) => Some(TaskPriority::High),
        _ => None,
    }
}

fn priority_rank(priority: Option<TaskPriority>) -> u8 {
    match priority {
        Some(TaskPriority::High) => 1,
        Some(TaskPriority::Medium) => 2,
        Some(TaskPriority::Low) | None => 3,
    }
}

fn due_day_number(task: &NotionTask) -> i64 {
    task.due_date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d.split('T').next().unwrap_or(d), "%Y-%m-%d").ok())
        .map(|d| d.num_days_from_ce() as i64)
        .unwrap_or(i64::MAX)
}

fn task_details(task: &NotionTask, target_date_iso: &str, now: DateTime<Utc>) -> String {
    let mut details = format!("Status: {}", task.status.as_str());
    match task.due_date.as_deref() {
        Some(due) => {
            let date_only = due.split('T').next().unwrap_or(due);
            let display = NaiveDate::parse_from_str(date_only, "%Y-%m-%d")
                .map(|d| {
                    if d.year() != now.year() {
                        d.format("%b %-d, %Y").to_string()
                    } else {
                        d.format("%b %-d").to_string()
                    }
                })
                .unwrap_or_else(|_| due.to_string());
            details.push_str(&format!(", Due: {display}"));
            let is_overdue = date_only < target_date_iso && !task.status.is_closed();
            if is_overdue {
                details.push_str(" (OVERDUE)");
            }
        }
        None => details.push_str(", Due: N/A"),
    }
    if let Some(priority) = task.priority {
        details.push_str(&format!(", Prio: {}", priority.as_str()));
    }
    if let Some(list) = &task.list_name {
        details.push_str(&format!(", List: {list}"));
    }
    details
}

async fn fetch_tasks(
    sources: &BriefingSources<'_>,
    user_id: &str,
    request: &BriefingRequest,
    parsed: &ParsedDateContext,
    now: DateTime<Utc>,
    data: &mut DailyBriefingData,
) {
    let Some(task_source) = sources.tasks else {
        log::error!("task source is not configured; cannot fetch tasks");
        data.errors_encountered.push(BriefingError {
            source_area: BriefingSourceArea::Tasks,
            message: "Task source is not configured.".to_string(),
            details: None,
        });
        return;
    };

    let target_iso = &parsed.target_date_iso;
    log::info!("fetching tasks for briefing target date {target_iso}");

    let overdue_params = QueryTaskParams {
        due_date_before: Some(target_iso.clone()),
        status_not_equals: vec![TaskStatus::Done, TaskStatus::Cancelled],
        priority: priority_filter(request),
        list_name: request.project_filter.clone(),
        limit: Some(TASK_FETCH_LIMIT),
        ..Default::default()
    };
    let due_on_target_params = QueryTaskParams {
        due_date_equals: Some(target_iso.clone()),
        status_not_equals: vec![TaskStatus::Done, TaskStatus::Cancelled],
        priority: priority_filter(request),
        list_name: request.project_filter.clone(),
        limit: Some(TASK_FETCH_LIMIT),
        ..Default::default()
    };

    let (overdue_result, due_result) = tokio::join!(
        task_source.query_tasks(user_id, &overdue_params),
        task_source.query_tasks(user_id, &due_on_target_params),
    );

    let mut fetched: Vec<NotionTask> = Vec::new();
    match overdue_result {
        Ok(tasks) => fetched.extend(tasks),
        Err(e) => {
            log::error!("error fetching overdue tasks: {e}");
            data.errors_encountered.push(BriefingError {
                source_area: BriefingSourceArea::Tasks,
                message: format!("Error fetching overdue tasks (before {target_iso}): {e}"),
                details: Some(e.code().to_string()),
            });
        }
    }
    match due_result {
        Ok(tasks) => {
            for task in tasks {
                if !fetched.iter().any(|t| t.id == task.id) {
                    fetched.push(task);
                }
            }
        }
        Err(e) => {
            log::error!("error fetching tasks due on {target_iso}: {e}");
            data.errors_encountered.push(BriefingError {
                source_area: BriefingSourceArea::Tasks,
                message: format!("Error fetching tasks due on {target_iso}: {e}"),
                details: Some(e.code().to_string()),
            });
        }
    }

    if fetched.is_empty() {
        log::info!("no relevant tasks found for briefing");
        return;
    }

    // Overdue first, then priority, then earlier due date.
    fetched.sort_by(|a, b| {
        let a_overdue = a
            .due_date
            .as_deref()
            .map(|d| d < target_iso.as_str())
            .unwrap_or(false);
        let b_overdue = b
            .due_date
            .as_deref()
            .map(|d| d < target_iso.as_str())
            .unwrap_or(false);
        b_overdue
            .cmp(&a_overdue)
            .then_with(|| priority_rank(a.priority).cmp(&priority_rank(b.priority)))
            .then_with(|| due_day_number(a).cmp(&due_day_number(b)))
    });

    let count = fetched.len();
    for task in fetched {
        let title = task.description.clone();
        let details = task_details(&task, target_iso, now);
        let link = task.url.clone();
        let source_id = Some(task.id.clone());
        let payload = BriefingPayload::Task(task);
        let urgency_score =
            calculate_urgency_score(&title, None, &payload, target_iso, now);
        data.priority_items.push(BriefingItem {
            item_type: BriefingItemType::Task,
            title,
            details: Some(details),
            link,
            source_id,
            urgency_score,
            payload,
        });
    }
    log::info!("fetched and processed {count} tasks");
}

// ============================================================================
// Meetings
// ============================================================================

async fn fetch_meetings(
    sources: &BriefingSources<'_>,
    user_id: &str,
    parsed: &ParsedDateContext,
    now: DateTime<Utc>,
    data: &mut DailyBriefingData,
) {
    let Some(calendar) = sources.calendar else {
        log::error!("calendar source is not configured; cannot fetch meetings");
        data.errors_encountered.push(BriefingError {
            source_area: BriefingSourceArea::Meetings,
            message: "Calendar source is not configured.".to_string(),
            details: None,
        });
        return;
    };

    log::info!(
        "fetching meetings for briefing target date {}",
        parsed.target_date_iso
    );
    match calendar
        .list_upcoming_events(
            user_id,
            MEETING_FETCH_LIMIT,
            Some(&parsed.time_min_iso),
            Some(&parsed.time_max_iso),
        )
        .await
    {
        Ok(meetings) => {
            if meetings.is_empty() {
                log::info!("no meetings found for {}", parsed.target_date_iso);
                return;
            }
            let count = meetings.len();
            for meeting in meetings {
                let title = if meeting.title.is_empty() {
                    "Untitled Meeting".to_string()
                } else {
                    meeting.title.clone()
                };
                let details = format!(
                    "Time: {} - {}",
                    meeting.start_time.format("%-I:%M %p"),
                    meeting.end_time.format("%-I:%M %p")
                );
                let link = meeting.html_link.clone();
                let source_id = Some(meeting.id.clone());
                let payload = BriefingPayload::Meeting(meeting);
                let urgency_score = calculate_urgency_score(
                    &title,
                    None,
                    &payload,
                    &parsed.target_date_iso,
                    now,
                );
                data.priority_items.push(BriefingItem {
                    item_type: BriefingItemType::Meeting,
                    title,
                    details: Some(details),
                    link,
                    source_id,
                    urgency_score,
                    payload,
                });
            }
            log::info!("fetched {count} meetings");
        }
        Err(e) => {
            log::error!("error fetching meetings: {e}");
            data.errors_encountered.push(BriefingError {
                source_area: BriefingSourceArea::Meetings,
                message: format!("Error fetching calendar events: {e}"),
                details: Some(e.code().to_string()),
            });
        }
    }
}

// ============================================================================
// Messages
// ============================================================================

/// First `max` characters of `s`, on char boundaries.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

async fn fetch_emails(
    sources: &BriefingSources<'_>,
    user_id: &str,
    parsed: &ParsedDateContext,
    now: DateTime<Utc>,
    data: &mut DailyBriefingData,
) {
    let Some(email_source) = sources.email else {
        log::error!("email source is not configured; cannot fetch urgent emails");
        data.errors_encountered.push(BriefingError {
            source_area: BriefingSourceArea::Emails,
            message: "Email source is not configured.".to_string(),
            details: None,
        });
        return;
    };

    log::info!(
        "fetching urgent emails for briefing target date {}",
        parsed.target_date_iso
    );
    match email_source
        .recent_unread_for_briefing(user_id, parsed.target_date, MESSAGE_FETCH_LIMIT)
        .await
    {
        Ok(emails) => {
            if emails.is_empty() {
                log::info!(
                    "no urgent/recent unread emails found for {}",
                    parsed.target_date_iso
                );
                return;
            }
            let count = emails.len();
            for email in emails {
                let title = email
                    .subject
                    .clone()
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "No Subject".to_string());
                let mut details =
                    format!("From: {}", email.from.as_deref().unwrap_or("N/A"));
                if let Some(snippet) = &email.snippet {
                    details.push_str(&format!(
                        ", Snippet: {}...",
                        truncate_chars(snippet, 70)
                    ));
                }
                let link = email.link.clone();
                let source_id = Some(email.id.clone());
                let payload = BriefingPayload::Email(email);
                let urgency_score = calculate_urgency_score(
                    &title,
                    None,
                    &payload,
                    &parsed.target_date_iso,
                    now,
                );
                data.priority_items.push(BriefingItem {
                    item_type: BriefingItemType::Email,
                    title,
                    details: Some(details),
                    link,
                    source_id,
                    urgency_score,
                    payload,
                });
            }
            log::info!("fetched {count} urgent/recent unread emails");
        }
        Err(e) => {
            log::error!("error fetching urgent emails: {e}");
            data.errors_encountered.push(BriefingError {
                source_area: BriefingSourceArea::Emails,
                message: format!("Error fetching urgent emails: {e}"),
                details: Some(e.code().to_string()),
            });
        }
    }
}

async fn fetch_slack_messages(
    sources: &BriefingSources<'_>,
    user_id: &str,
    parsed: &ParsedDateContext,
    now: DateTime<Utc>,
    data: &mut DailyBriefingData,
) {
    let Some(slack) = sources.slack else {
        log::error!("slack source is not configured; cannot fetch urgent Slack messages");
        data.errors_encountered.push(BriefingError {
            source_area: BriefingSourceArea::Slack,
            message: "Slack source is not configured.".to_string(),
            details: None,
        });
        return;
    };

    log::info!(
        "fetching urgent Slack messages for briefing target date {}",
        parsed.target_date_iso
    );
    match slack
        .recent_dms_and_mentions_for_briefing(user_id, parsed.target_date, MESSAGE_FETCH_LIMIT)
        .await
    {
        Ok(messages) => {
            if messages.is_empty() {
                log::info!(
                    "no urgent/recent Slack messages found for {}",
                    parsed.target_date_iso
                );
                return;
            }
            let count = messages.len();
            for msg in messages {
                let mut title = "Slack message".to_string();
                if let Some(user) = &msg.user_name {
                    title.push_str(&format!(" from {user}"));
                }
                if let Some(channel) = &msg.channel_name {
                    title.push_str(&format!(" in #{channel}"));
                } else if msg.user_name.is_some() {
                    // No channel but a sender: most likely a DM.
                    title.push_str(" (DM)");
                }
                let details = match &msg.text {
                    Some(text) => {
                        let truncated = truncate_chars(text, 100);
                        if text.chars().count() > 100 {
                            format!("{truncated}...")
                        } else {
                            truncated.to_string()
                        }
                    }
                    None => "(No text content)".to_string(),
                };
                let link = msg.permalink.clone();
                let source_id = Some(msg.ts.clone());
                let payload = BriefingPayload::SlackMessage(msg);
                let urgency_score = calculate_urgency_score(
                    &title,
                    None,
                    &payload,
                    &parsed.target_date_iso,
                    now,
                );
                data.priority_items.push(BriefingItem {
                    item_type: BriefingItemType::SlackMessage,
                    title,
                    details: Some(details),
                    link,
                    source_id,
                    urgency_score,
                    payload,
                });
            }
            log::info!("fetched {count} urgent/recent Slack messages");
        }
        Err(e) => {
            log::error!("error fetching urgent Slack messages: {e}");
            data.errors_encountered.push(BriefingError {
                source_area: BriefingSourceArea::Slack,
                message: format!("Error fetching urgent Slack messages: {e}"),
                details: Some(e.code().to_string()),
            });
        }
    }
}

async fn fetch_teams_messages(
    sources: &BriefingSources<'_>,
    user_id: &str,
    parsed: &ParsedDateContext,
    now: DateTime<Utc>,
    data: &mut DailyBriefingData,
) {
    let Some(teams) = sources.teams else {
        log::error!("teams source is not configured; cannot fetch urgent MS Teams messages");
        data.errors_encountered.push(BriefingError {
            source_area: BriefingSourceArea::Teams,
            message: "MS Teams source is not configured.".to_string(),
            details: None,
        });
        return;
    };

    log::info!(
        "fetching urgent MS Teams messages for briefing target date {}",
        parsed.target_date_iso
    );
    match teams
        .recent_chats_and_mentions_for_briefing(user_id, parsed.target_date, MESSAGE_FETCH_LIMIT)
        .await
    {
        Ok(messages) => {
            if messages.is_empty() {
                log::info!(
                    "no urgent/recent MS Teams messages found for {}",
                    parsed.target_date_iso
                );
                return;
            }
            let count = messages.len();
            for msg in messages {
                let mut title = "Teams message".to_string();
                if let Some(user) = &msg.user_name {
                    title.push_str(&format!(" from {user}"));
                }
                let details = match &msg.content {
                    Some(content) => {
                        let truncated = truncate_chars(content, 100);
                        if content.chars().count() > 100 {
                            format!("{truncated}...")
                        } else {
                            truncated.to_string()
                        }
                    }
                    None => "(No text content)".to_string(),
                };
                let link = msg.web_url.clone();
                let source_id = Some(msg.id.clone());
                let payload = BriefingPayload::TeamsMessage(msg);
                let urgency_score = calculate_urgency_score(
                    &title,
                    None,
                    &payload,
                    &parsed.target_date_iso,
                    now,
                );
                data.priority_items.push(BriefingItem {
                    item_type: BriefingItemType::TeamsMessage,
                    title,
                    details: Some(details),
                    link,
                    source_id,
                    urgency_score,
                    payload,
                });
            }
            log::info!("fetched {count} urgent/recent MS Teams messages");
        }
        Err(e) => {
            log::error!("error fetching urgent MS Teams messages: {e}");
            data.errors_encountered.push(BriefingError {
                source_area: BriefingSourceArea::Teams,
                message: format!("Error fetching urgent MS Teams messages: {e}"),
                details: Some(e.code().to_string()),
            });
        }
    }
}

// ============================================================================
// Summary
// ============================================================================

/// "Today" / "Tomorrow" / "Yesterday" relative to the base date,
/// otherwise "Friday, August 7, 2026".
fn friendly_date_string(date: DateTime<Utc>, base: DateTime<Utc>) -> String {
    let target = start_of_day_utc(date);
    let today = start_of_day_utc(base);
    if target == today {
        return "Today".to_string();
    }
    if target == today + Duration::days(1) {
        return "Tomorrow".to_string();
    }
    if target == today - Duration::days(1) {
        return "Yesterday".to_string();
    }
    target.format("%A, %B %-d, %Y").to_string()
}

fn build_summary(
    data: &DailyBriefingData,
    focus_areas: &[FocusArea],
    parsed: &ParsedDateContext,
    now: DateTime<Utc>,
) -> String {
    let count_of = |t: BriefingItemType| {
        data.priority_items
            .iter()
            .filter(|item| item.item_type == t)
            .count()
    };
    let num_meetings = count_of(BriefingItemType::Meeting);
    let num_tasks = count_of(BriefingItemType::Task);
    let num_emails = count_of(BriefingItemType::Email);
    let num_slack = count_of(BriefingItemType::SlackMessage);
    let num_teams = count_of(BriefingItemType::TeamsMessage);

    let mut parts: Vec<String> = Vec::new();
    if focus_areas.contains(&FocusArea::Meetings) {
        if num_meetings > 0 {
            parts.push(format!("{num_meetings} meeting(s) scheduled."));
        } else {
            parts.push("no meetings scheduled.".to_string());
        }
    }
    if focus_areas.contains(&FocusArea::Tasks) {
        if num_tasks > 0 {
            let overdue = data
                .priority_items
                .iter()
                .filter(|item| match &item.payload {
                    BriefingPayload::Task(task) => task
                        .due_date
                        .as_deref()
                        .map(|d| d < data.briefing_date.as_str())
                        .unwrap_or(false)
                        && !task.status.is_closed(),
                    _ => false,
                })
                .count();
            let mut part = format!("{num_tasks} task(s) require attention");
            if overdue > 0 {
                part.push_str(&format!(" ({overdue} overdue)"));
            }
            parts.push(part);
        } else {
            parts.push("no pressing tasks.".to_string());
        }
    }
    if focus_areas.contains(&FocusArea::UrgentEmails) {
        if num_emails > 0 {
            parts.push(format!("{num_emails} recent unread email(s)."));
        } else {
            parts.push("no recent unread emails.".to_string());
        }
    }
    if focus_areas.contains(&FocusArea::UrgentSlackMessages) {
        if num_slack > 0 {
            parts.push(format!("{num_slack} recent Slack message(s) (DMs/mentions)."));
        } else {
            parts.push("no recent Slack DMs or mentions.".to_string());
        }
    }
    if focus_areas.contains(&FocusArea::UrgentTeamsMessages) {
        if num_teams > 0 {
            parts.push(format!(
                "{num_teams} recent MS Teams message(s) (chats/mentions)."
            ));
        } else {
            parts.push("no recent MS Teams chats or mentions.".to_string());
        }
    }

    let content = match parts.len() {
        0 => "There are no specific items to highlight based on your requested focus areas."
            .to_string(),
        1 => format!("You have {}", parts[0]),
        _ => {
            let last = parts.pop().unwrap_or_default();
            format!("You have {}, and {}", parts.join(", "), last)
        }
    };

    let friendly = friendly_date_string(parsed.target_date, now);
    let mut message = format!("Here is your briefing for {friendly}: {content}");

    match parsed.status {
        ParseStatus::Unparseable => {
            if let Some(warning) = &parsed.warning_message {
                message = format!("{warning} {message}");
            }
        }
        ParseStatus::Defaulted => {
            if let Some(orig) = parsed
                .original_input
                .as_deref()
                .filter(|s| !s.is_empty() && s.to_lowercase().trim() != "today")
            {
                message = format!(
                    "Showing briefing for today as date context '{orig}' was processed as default. {message}"
                );
            }
        }
        ParseStatus::Parsed => {}
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SkillError;
    use crate::types::{CalendarEventSummary, GmailMessageSnippet};
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct FakeCalendar {
        events: Vec<CalendarEventSummary>,
    }

    #[async_trait]
    impl CalendarSource for FakeCalendar {
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

    struct FailingCalendar;

    #[async_trait]
    impl CalendarSource for FailingCalendar {
        async fn list_upcoming_events(
            &self,
            _user_id: &str,
            _limit: u32,
            _time_min_iso: Option<&str>,
            _time_max_iso: Option<&str>,
        ) -> Result<Vec<CalendarEventSummary>, SkillError> {
            Err(SkillError::AuthMissing("calendar token expired".to_string()))
        }
    }

    struct FakeTasks {
        overdue: Vec<NotionTask>,
        due_today: Vec<NotionTask>,
    }

    #[async_trait]
    impl TaskSource for FakeTasks {
        async fn query_tasks(
            &self,
            _user_id: &str,
            params: &QueryTaskParams,
        ) -> Result<Vec<NotionTask>, SkillError> {
            if params.due_date_before.is_some() {
                Ok(self.overdue.clone())
            } else {
                Ok(self.due_today.clone())
            }
        }
    }

    struct FakeEmail {
        emails: Vec<GmailMessageSnippet>,
    }

    #[async_trait]
    impl EmailSource for FakeEmail {
        async fn recent_unread_for_briefing(
            &self,
            _user_id: &str,
            _target_date: DateTime<Utc>,
            _count: u32,
        ) -> Result<Vec<GmailMessageSnippet>, SkillError> {
            Ok(self.emails.clone())
        }
    }

    fn meeting_today(id: &str) -> CalendarEventSummary {
        let today = Utc::now().date_naive();
        let start = Utc
            .from_utc_datetime(&today.and_hms_opt(9, 0, 0).unwrap());
        CalendarEventSummary {
            id: id.to_string(),
            title: "Morning Sync".to_string(),
            start_time: start,
            end_time: start + Duration::hours(1),
            description: None,
            attendees: vec!["a@corp.com".to_string()],
            location: None,
            organizer: None,
            html_link: Some("https://cal.example/evt".to_string()),
        }
    }

    fn overdue_task(id: &str) -> NotionTask {
        NotionTask {
            id: id.to_string(),
            description: "Finish budget sheet".to_string(),
            due_date: Some("2020-01-01".to_string()),
            status: TaskStatus::ToDo,
            priority: Some(TaskPriority::High),
            list_name: Some("Finance".to_string()),
            created_date: None,
            url: Some("https://notion.example/t1".to_string()),
            last_edited_time: None,
        }
    }

    fn init_test_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[tokio::test]
    async fn test_briefing_aggregates_sources_and_sorts() {
        init_test_logs();
        let calendar = FakeCalendar {
            events: vec![meeting_today("evt1")],
        };
        let tasks = FakeTasks {
            overdue: vec![overdue_task("t1")],
            due_today: vec![],
        };
        let email = FakeEmail {
            emails: vec![GmailMessageSnippet {
                id: "m1".to_string(),
                thread_id: None,
                subject: Some("Invoice".to_string()),
                from: Some("billing@vendor.com".to_string()),
                date: None,
                snippet: Some("Your invoice is attached".to_string()),
                link: None,
            }],
        };
        let sources = BriefingSources {
            calendar: Some(&calendar),
            tasks: Some(&tasks),
            email: Some(&email),
            slack: None,
            teams: None,
        };
        let request = BriefingRequest {
            focus_areas: Some(vec![
                FocusArea::Tasks,
                FocusArea::Meetings,
                FocusArea::UrgentEmails,
            ]),
            ..Default::default()
        };

        let data = generate_daily_briefing(&sources, "user-1", &request).await;

        assert_eq!(data.priority_items.len(), 3);
        assert!(data.errors_encountered.is_empty());
        // Scores are descending.
        let scores: Vec<i64> = data.priority_items.iter().map(|i| i.urgency_score).collect();
        let mut sorted = scores.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(scores, sorted);
        // All scores in range.
        assert!(scores.iter().all(|s| (0..=100).contains(s)));

        let summary = data.overall_summary_message.expect("summary expected");
        assert!(summary.contains("Here is your briefing for Today:"));
        assert!(summary.contains("1 meeting(s) scheduled."));
        assert!(summary.contains("1 task(s) require attention (1 overdue)"));
        assert!(summary.contains("1 recent unread email(s)."));
    }

    #[tokio::test]
    async fn test_briefing_partial_results_on_source_failure() {
        let tasks = FakeTasks {
            overdue: vec![overdue_task("t1")],
            due_today: vec![],
        };
        let sources = BriefingSources {
            calendar: Some(&FailingCalendar),
            tasks: Some(&tasks),
            email: None,
            slack: None,
            teams: None,
        };
        let request = BriefingRequest {
            focus_areas: Some(vec![FocusArea::Tasks, FocusArea::Meetings]),
            ..Default::default()
        };

        let data = generate_daily_briefing(&sources, "user-1", &request).await;

        // The task still made it in despite the calendar failure.
        assert_eq!(data.priority_items.len(), 1);
        assert_eq!(data.priority_items[0].item_type, BriefingItemType::Task);
        assert_eq!(data.errors_encountered.len(), 1);
        assert_eq!(
            data.errors_encountered[0].source_area,
            BriefingSourceArea::Meetings
        );
        assert!(data.errors_encountered[0]
            .message
            .contains("calendar token expired"));
    }

    #[tokio::test]
    async fn test_briefing_unconfigured_source_records_error() {
        let sources = BriefingSources::default();
        let request = BriefingRequest {
            focus_areas: Some(vec![FocusArea::Tasks]),
            ..Default::default()
        };
        let data = generate_daily_briefing(&sources, "user-1", &request).await;
        assert!(data.priority_items.is_empty());
        assert_eq!(data.errors_encountered.len(), 1);
        assert_eq!(
            data.errors_encountered[0].source_area,
            BriefingSourceArea::Tasks
        );
        let summary = data.overall_summary_message.expect("summary expected");
        assert!(summary.contains("no pressing tasks."));
    }

    #[tokio::test]
    async fn test_briefing_unparseable_date_prepends_warning() {
        let sources = BriefingSources::default();
        let request = BriefingRequest {
            date_context: Some("blursday".to_string()),
            focus_areas: Some(vec![]),
            ..Default::default()
        };
        let data = generate_daily_briefing(&sources, "user-1", &request).await;
        assert_eq!(data.errors_encountered.len(), 1);
        assert_eq!(
            data.errors_encountered[0].source_area,
            BriefingSourceArea::DateParsing
        );
        let summary = data.overall_summary_message.expect("summary expected");
        assert!(summary.starts_with("Date context \"blursday\" is not recognized"));
    }

    #[test]
    fn test_task_details_rendering() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 8, 0, 0).unwrap();
        let task = overdue_task("t1");
        let details = task_details(&task, "2026-08-07", now);
        assert_eq!(
            details,
            "Status: To Do, Due: Jan 1, 2020 (OVERDUE), Prio: High, List: Finance"
        );

        let undated = NotionTask {
            due_date: None,
            priority: None,
            list_name: None,
            url: None,
            ..overdue_task("t2")
        };
        assert_eq!(task_details(&undated, "2026-08-07", now), "Status: To Do, Due: N/A");
    }

    #[test]
    fn test_friendly_date_string() {
        let base = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
        assert_eq!(friendly_date_string(base, base), "Today");
        assert_eq!(
            friendly_date_string(base + Duration::days(1), base),
            "Tomorrow"
        );
        assert_eq!(
            friendly_date_string(base - Duration::days(1), base),
            "Yesterday"
        );
        assert_eq!(
            friendly_date_string(base + Duration::days(10), base),
            "Monday, August 17, 2026"
        );
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello");
        // Multi-byte characters do not panic.
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }
}
