//! Core data types shared across skills.
//!
//! Wire-facing structs use camelCase renames and `#[serde(default)]` on
//! optional inbound fields so vendor responses with missing keys still
//! deserialize.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Calendar
// ============================================================================

/// A summary of a calendar event, as produced by a calendar source.
///
/// Candidates for fuzzy matching are read-only: constructed per query,
/// scored, and discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventSummary {
    pub id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raw attendee strings in mixed formats:
    /// "Name <email>", "email", "Name (Guest)".
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

// ============================================================================
// Tasks
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    Done,
    Blocked,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
            TaskStatus::Blocked => "Blocked",
            TaskStatus::Cancelled => "Cancelled",
        }
    }

    /// Done and Cancelled tasks are closed: excluded from briefings and
    /// scored at zero urgency.
    pub fn is_closed(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::High => "High",
            TaskPriority::Medium => "Medium",
            TaskPriority::Low => "Low",
        }
    }
}

/// A task record from the task backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotionTask {
    pub id: String,
    pub description: String,
    /// `YYYY-MM-DD` or full ISO datetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(
        default,
        alias = "last_edited_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_edited_time: Option<String>,
}

/// Filters for querying the task backend.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTaskParams {
    /// Tasks due strictly before this `YYYY-MM-DD` date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date_before: Option<String>,
    /// Tasks due exactly on this `YYYY-MM-DD` date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date_equals: Option<String>,
    /// Exclude tasks in any of these statuses.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub status_not_equals: Vec<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

// ============================================================================
// Messages (email / chat)
// ============================================================================

/// A snippet of a Gmail message, enough for briefing display and scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessageSnippet {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// ISO 8601 receive time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// A Slack DM or mention surfaced for a briefing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackMessageSnippet {
    /// Slack message `ts`, unique within a channel.
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
    /// ISO 8601 send time derived from `ts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// An MS Teams chat message surfaced for a briefing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamsMessageSnippet {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// ISO 8601 creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
}

// ============================================================================
// Briefing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BriefingItemType {
    Meeting,
    Task,
    Email,
    SlackMessage,
    TeamsMessage,
}

/// Typed payload behind a briefing item, one variant per item type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BriefingPayload {
    Meeting(CalendarEventSummary),
    Task(NotionTask),
    Email(GmailMessageSnippet),
    SlackMessage(SlackMessageSnippet),
    TeamsMessage(TeamsMessageSnippet),
}

impl BriefingPayload {
    pub fn item_type(&self) -> BriefingItemType {
        match self {
            BriefingPayload::Meeting(_) => BriefingItemType::Meeting,
            BriefingPayload::Task(_) => BriefingItemType::Task,
            BriefingPayload::Email(_) => BriefingItemType::Email,
            BriefingPayload::SlackMessage(_) => BriefingItemType::SlackMessage,
            BriefingPayload::TeamsMessage(_) => BriefingItemType::TeamsMessage,
        }
    }
}

/// A single prioritized item in a daily briefing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefingItem {
    #[serde(rename = "type")]
    pub item_type: BriefingItemType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Always an integer in [0, 100].
    pub urgency_score: i64,
    #[serde(rename = "rawItem")]
    pub payload: BriefingPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
    Tasks,
    Meetings,
    UrgentEmails,
    UrgentSlackMessages,
    UrgentTeamsMessages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    High,
    Critical,
    All,
}

/// Typed request for a daily briefing. Replaces the loosely-typed NLU
/// entity bag the handlers previously passed around.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefingRequest {
    /// Free-text date hint: "today", "tomorrow", "next monday",
    /// "2026-08-15", "August 15". Missing defaults to today.
    #[serde(default)]
    pub date_context: Option<String>,
    /// Which sources to include. Missing uses the default set
    /// (tasks, meetings, urgent emails, urgent Slack messages).
    #[serde(default)]
    pub focus_areas: Option<Vec<FocusArea>>,
    /// Restrict tasks to a named list/project.
    #[serde(default)]
    pub project_filter: Option<String>,
    /// High/Critical narrows task queries to high-priority tasks.
    #[serde(default)]
    pub urgency_level: Option<UrgencyLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BriefingSourceArea {
    DateParsing,
    Tasks,
    Meetings,
    Emails,
    Slack,
    Teams,
    Overall,
}

/// A per-source failure recorded on a briefing instead of aborting it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefingError {
    pub source_area: BriefingSourceArea,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Consolidated daily priority briefing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBriefingData {
    /// `YYYY-MM-DD` of the resolved target date.
    pub briefing_date: String,
    pub user_id: String,
    pub priority_items: Vec<BriefingItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_summary_message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors_encountered: Vec<BriefingError>,
}
