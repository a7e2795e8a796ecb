//! Google Calendar API v3 — event fetching.
//!
//! Fetches events for a time window and normalizes them into
//! `CalendarEventSummary` candidates for matching and briefings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{check_response, send_with_retry, CalendarSource, RetryPolicy};
use crate::error::SkillError;
use crate::types::CalendarEventSummary;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Google paginates at 250; one page covers every briefing window.
const PAGE_SIZE: u32 = 250;

// ============================================================================
// API response types (deserialized from Google Calendar JSON)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<GoogleEventRaw>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventRaw {
    #[serde(default)]
    id: String,
    #[serde(default)]
    summary: Option<String>,
    start: Option<EventDateTime>,
    end: Option<EventDateTime>,
    #[serde(default)]
    attendees: Vec<Attendee>,
    organizer: Option<Organizer>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Attendee {
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    resource: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Organizer {
    #[serde(default)]
    email: String,
}

// ============================================================================
// Client
// ============================================================================

/// Thin client over the Calendar events endpoint.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    retry: RetryPolicy,
}

impl GoogleCalendarClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: access_token.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Point the client at a different endpoint (tests use a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_events(
        &self,
        limit: u32,
        time_min_iso: Option<&str>,
        time_max_iso: Option<&str>,
    ) -> Result<Vec<CalendarEventSummary>, SkillError> {
        let url = format!("{}/calendars/primary/events", self.base_url);
        let page_size = PAGE_SIZE.to_string();
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&[
                    ("singleEvents", "true"),
                    ("orderBy", "startTime"),
                    ("maxResults", page_size.as_str()),
                ]);
            if let Some(time_min) = time_min_iso {
                request = request.query(&[("timeMin", time_min)]);
            }
            if let Some(time_max) = time_max_iso {
                request = request.query(&[("timeMax", time_max)]);
            }
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let resp = send_with_retry(request, &self.retry).await?;
            let resp = check_response(resp, "google calendar").await?;
            let body: CalendarListResponse = resp.json().await?;

            for item in body.items {
                if item.status.as_deref() == Some("cancelled") {
                    continue;
                }
                let Some(event) = normalize_event(item) else {
                    continue;
                };
                events.push(event);
                if events.len() >= limit as usize {
                    return Ok(events);
                }
            }

            page_token = body.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(events)
    }
}

/// Map a raw Google event to a summary; events without usable times are
/// dropped (they cannot be windowed or tie-broken).
fn normalize_event(item: GoogleEventRaw) -> Option<CalendarEventSummary> {
    let start_time = item
        .start
        .as_ref()
        .and_then(|s| parse_event_datetime(s.date_time.as_deref().or(s.date.as_deref())?));
    let end_time = item
        .end
        .as_ref()
        .and_then(|e| parse_event_datetime(e.date_time.as_deref().or(e.date.as_deref())?));
    let (Some(start_time), Some(end_time)) = (start_time, end_time) else {
        log::debug!("skipping event {} without parseable times", item.id);
        return None;
    };

    // Preserve the attendee strings in the mixed formats downstream
    // matching understands: "Name <email>" when a display name exists,
    // bare email otherwise. Resource rooms are dropped.
    let attendees: Vec<String> = item
        .attendees
        .iter()
        .filter(|a| a.resource != Some(true) && !a.email.is_empty())
        .map(|a| match a.display_name.as_deref() {
            Some(name) if !name.is_empty() => format!("{} <{}>", name, a.email),
            _ => a.email.clone(),
        })
        .collect();

    Some(CalendarEventSummary {
        id: item.id,
        title: item.summary.unwrap_or_default(),
        start_time,
        end_time,
        description: item.description,
        attendees,
        location: item.location,
        organizer: item.organizer.map(|o| o.email),
        html_link: item.html_link,
    })
}

/// Parse an ISO datetime (or date-only, treated as UTC midnight).
fn parse_event_datetime(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if s.contains('T') {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    } else {
        chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarClient {
    async fn list_upcoming_events(
        &self,
        user_id: &str,
        limit: u32,
        time_min_iso: Option<&str>,
        time_max_iso: Option<&str>,
    ) -> Result<Vec<CalendarEventSummary>, SkillError> {
        log::debug!(
            "listing up to {} events for {} in {:?}..{:?}",
            limit,
            user_id,
            time_min_iso,
            time_max_iso
        );
        self.fetch_events(limit, time_min_iso, time_max_iso).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_event_datetime_rfc3339() {
        let dt = parse_event_datetime("2026-08-07T09:00:00-05:00").unwrap();
        assert_eq!(dt.hour(), 14);
    }

    #[test]
    fn test_parse_event_datetime_date_only() {
        let dt = parse_event_datetime("2026-08-07").unwrap();
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_parse_event_datetime_empty() {
        assert!(parse_event_datetime("").is_none());
    }

    #[test]
    fn test_event_normalization_builds_attendee_strings() {
        let json = r#"{
            "items": [{
                "id": "evt1",
                "summary": "Planning Session",
                "start": {"dateTime": "2026-08-07T10:00:00Z"},
                "end": {"dateTime": "2026-08-07T11:00:00Z"},
                "attendees": [
                    {"email": "alice.w@example.com", "displayName": "Alice Wonderland"},
                    {"email": "bob@build.it"},
                    {"email": "room@resource.calendar.google.com", "resource": true}
                ],
                "organizer": {"email": "alice.w@example.com"},
                "htmlLink": "https://calendar.google.com/event?eid=evt1"
            }]
        }"#;
        let resp: CalendarListResponse = serde_json::from_str(json).unwrap();
        let event = normalize_event(resp.items.into_iter().next().unwrap()).unwrap();
        assert_eq!(
            event.attendees,
            vec![
                "Alice Wonderland <alice.w@example.com>".to_string(),
                "bob@build.it".to_string(),
            ]
        );
        assert_eq!(event.organizer.as_deref(), Some("alice.w@example.com"));
        assert!(event.html_link.is_some());
    }

    #[test]
    fn test_event_without_times_is_dropped() {
        let raw = GoogleEventRaw {
            id: "x".to_string(),
            summary: Some("No times".to_string()),
            start: None,
            end: None,
            attendees: Vec::new(),
            organizer: None,
            description: None,
            location: None,
            status: None,
            html_link: None,
        };
        assert!(normalize_event(raw).is_none());
    }

    #[tokio::test]
    async fn test_list_events_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{
            "items": [
                {
                    "id": "evt1",
                    "summary": "Budget Review",
                    "start": {"dateTime": "2026-08-07T15:00:00Z"},
                    "end": {"dateTime": "2026-08-07T16:00:00Z"}
                },
                {
                    "id": "evt2",
                    "summary": "Cancelled Sync",
                    "status": "cancelled",
                    "start": {"dateTime": "2026-08-07T17:00:00Z"},
                    "end": {"dateTime": "2026-08-07T18:00:00Z"}
                }
            ]
        }"#;
        let mock = server
            .mock("GET", "/calendars/primary/events")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client =
            GoogleCalendarClient::new("test-token").with_base_url(server.url());
        let events = client
            .list_upcoming_events("user-1", 10, None, None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Budget Review");
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/calendars/primary/events")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .with_body("{}")
            .create_async()
            .await;

        let client =
            GoogleCalendarClient::new("expired").with_base_url(server.url());
        let err = client
            .list_upcoming_events("user-1", 10, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AUTH_MISSING");
    }
}
