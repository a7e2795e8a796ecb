//! Gmail API v1 — unread email for briefings.
//!
//! Fetches the message list for the target day
//! (`is:unread in:inbox after:... before:...`), then per-message
//! metadata (From, Subject, Date) to build display snippets.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Deserialize;

use super::{check_response, send_with_retry, EmailSource, RetryPolicy};
use crate::calendar::start_of_day_utc;
use crate::error::SkillError;
use crate::types::GmailMessageSnippet;

const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageStub>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageStub {
    id: String,
    #[serde(default)]
    thread_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageDetail {
    #[serde(default)]
    id: String,
    #[serde(default)]
    thread_id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    internal_date: Option<String>,
    #[serde(default)]
    payload: Option<MessagePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

impl MessageDetail {
    fn header(&self, name: &str) -> Option<&str> {
        self.payload.as_ref().and_then(|p| {
            p.headers
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case(name))
                .map(|h| h.value.as_str())
        })
    }

    /// Receive time as ISO 8601: epoch-millis `internalDate` preferred,
    /// the Date header as fallback.
    fn received_iso(&self) -> Option<String> {
        if let Some(ms) = self
            .internal_date
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
        {
            if let Some(dt) = DateTime::<Utc>::from_timestamp_millis(ms) {
                return Some(dt.to_rfc3339());
            }
        }
        self.header("Date")
            .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
            .map(|dt| dt.with_timezone(&Utc).to_rfc3339())
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct GmailClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    retry: RetryPolicy,
}

impl GmailClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: access_token.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_detail(&self, id: &str) -> Result<MessageDetail, SkillError> {
        let url = format!("{}/users/me/messages/{}", self.base_url, id);
        let request = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "Subject"),
                ("metadataHeaders", "Date"),
            ]);
        let resp = send_with_retry(request, &self.retry).await?;
        let resp = check_response(resp, "gmail message").await?;
        resp.json().await.map_err(SkillError::from)
    }
}

/// Gmail search operators take `YYYY/MM/DD`.
fn format_date_for_gmail(date: DateTime<Utc>) -> String {
    format!("{}/{:02}/{:02}", date.year(), date.month(), date.day())
}

#[async_trait]
impl EmailSource for GmailClient {
    async fn recent_unread_for_briefing(
        &self,
        user_id: &str,
        target_date: DateTime<Utc>,
        count: u32,
    ) -> Result<Vec<GmailMessageSnippet>, SkillError> {
        let after = start_of_day_utc(target_date);
        let before = after + Duration::days(1);
        let query = format!(
            "is:unread in:inbox after:{} before:{}",
            format_date_for_gmail(after),
            format_date_for_gmail(before)
        );
        log::info!("gmail briefing query for {}: \"{}\"", user_id, query);

        let url = format!("{}/users/me/messages", self.base_url);
        let count_str = count.to_string();
        let request = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("q", query.as_str()), ("maxResults", count_str.as_str())]);
        let resp = send_with_retry(request, &self.retry).await?;
        let resp = check_response(resp, "gmail search").await?;
        let list: MessageListResponse = resp.json().await?;

        let mut results = Vec::with_capacity(list.messages.len());
        for stub in list.messages.iter().take(count as usize) {
            match self.fetch_detail(&stub.id).await {
                Ok(detail) => {
                    let link = format!("https://mail.google.com/mail/u/0/#inbox/{}", detail.id);
                    results.push(GmailMessageSnippet {
                        id: if detail.id.is_empty() {
                            stub.id.clone()
                        } else {
                            detail.id.clone()
                        },
                        thread_id: Some(if detail.thread_id.is_empty() {
                            stub.thread_id.clone()
                        } else {
                            detail.thread_id.clone()
                        }),
                        subject: detail.header("Subject").map(String::from),
                        from: detail.header("From").map(String::from),
                        date: detail.received_iso(),
                        snippet: Some(detail.snippet.clone()),
                        link: Some(link),
                    });
                }
                Err(e) => {
                    // One bad message should not sink the briefing fetch.
                    log::warn!("failed to fetch gmail message {}: {}", stub.id, e);
                }
            }
        }
        log::info!("found {} unread emails for the target date", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_date_for_gmail_pads() {
        let d = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
        assert_eq!(format_date_for_gmail(d), "2026/08/07");
    }

    #[test]
    fn test_message_detail_header_lookup() {
        let detail: MessageDetail = serde_json::from_str(
            r#"{
                "id": "m1",
                "threadId": "t1",
                "snippet": "Hi there",
                "internalDate": "1754550000000",
                "payload": {"headers": [
                    {"name": "Subject", "value": "Invoice"},
                    {"name": "From", "value": "billing@vendor.com"}
                ]}
            }"#,
        )
        .unwrap();
        assert_eq!(detail.header("subject"), Some("Invoice"));
        assert_eq!(detail.header("From"), Some("billing@vendor.com"));
        assert!(detail.received_iso().is_some());
    }

    #[tokio::test]
    async fn test_recent_unread_for_briefing_mock_flow() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/me/messages")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"messages": [{"id": "m1", "threadId": "t1"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/users/me/messages/m1")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "m1",
                    "threadId": "t1",
                    "snippet": "Your invoice is attached",
                    "payload": {"headers": [
                        {"name": "Subject", "value": "Invoice"},
                        {"name": "From", "value": "billing@vendor.com"},
                        {"name": "Date", "value": "Fri, 07 Aug 2026 08:00:00 +0000"}
                    ]}
                }"#,
            )
            .create_async()
            .await;

        let client = GmailClient::new("token").with_base_url(server.url());
        let target = Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap();
        let emails = client
            .recent_unread_for_briefing("user-1", target, 3)
            .await
            .unwrap();

        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].subject.as_deref(), Some("Invoice"));
        assert_eq!(emails[0].from.as_deref(), Some("billing@vendor.com"));
        assert!(emails[0].date.as_deref().unwrap().starts_with("2026-08-07"));
        assert_eq!(
            emails[0].link.as_deref(),
            Some("https://mail.google.com/mail/u/0/#inbox/m1")
        );
    }
}
