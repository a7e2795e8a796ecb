//! Slack Web API — recent DMs and mentions for briefings.
//!
//! Uses `search.messages` scoped to the target day. The searching user
//! is resolved via `auth.test`; without it the query falls back to
//! `is:dm`, which is broader but still useful.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use super::{check_response, send_with_retry, RetryPolicy, SlackSource};
use crate::calendar::start_of_day_utc;
use crate::error::SkillError;
use crate::types::SlackMessageSnippet;

const DEFAULT_BASE_URL: &str = "https://slack.com/api";

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    ok: bool,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Option<SearchMatches>,
}

#[derive(Debug, Deserialize)]
struct SearchMatches {
    #[serde(default)]
    matches: Vec<SearchMatch>,
}

#[derive(Debug, Deserialize)]
struct SearchMatch {
    #[serde(default)]
    ts: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    channel: Option<MatchChannel>,
    /// Sender's user ID.
    #[serde(default)]
    user: Option<String>,
    /// Sender's display name.
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatchChannel {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: String,
    retry: RetryPolicy,
}

impl SlackClient {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            bot_token: bot_token.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Resolve the authed user's Slack ID. Failures degrade the query
    /// instead of failing the fetch.
    async fn resolve_user_id(&self) -> Option<String> {
        let request = self
            .http
            .get(format!("{}/auth.test", self.base_url))
            .bearer_auth(&self.bot_token);
        let resp = match send_with_retry(request, &self.retry).await {
            Ok(resp) => resp,
            Err(e) => {
                log::warn!("slack auth.test failed: {e}; mentions search will be broad");
                return None;
            }
        };
        match resp.json::<AuthTestResponse>().await {
            Ok(auth) if auth.ok => auth.user_id,
            Ok(auth) => {
                log::warn!(
                    "slack auth.test returned error {:?}; mentions search will be broad",
                    auth.error
                );
                None
            }
            Err(e) => {
                log::warn!("slack auth.test parse failed: {e}");
                None
            }
        }
    }
}

/// "1754550000.000123" -> ISO 8601.
fn ts_to_iso(ts: &str) -> Option<String> {
    let seconds: i64 = ts.split('.').next()?.parse().ok()?;
    DateTime::<Utc>::from_timestamp(seconds, 0).map(|dt| dt.to_rfc3339())
}

#[async_trait]
impl SlackSource for SlackClient {
    async fn recent_dms_and_mentions_for_briefing(
        &self,
        user_id: &str,
        target_date: DateTime<Utc>,
        count: u32,
    ) -> Result<Vec<SlackMessageSnippet>, SkillError> {
        if self.bot_token.is_empty() {
            return Err(SkillError::Config(
                "Slack bot token is not configured.".to_string(),
            ));
        }

        let slack_user = self.resolve_user_id().await;
        let after = start_of_day_utc(target_date);
        let before = after + Duration::days(1);

        let scope = match &slack_user {
            Some(id) => format!("(@{id} OR to:{id} OR in:{id})"),
            None => "(is:dm)".to_string(),
        };
        let query = format!(
            "{} after:{} before:{}",
            scope,
            after.format("%Y-%m-%d"),
            before.format("%Y-%m-%d")
        );
        log::info!("slack briefing query for {}: \"{}\"", user_id, query);

        let count_str = count.to_string();
        let request = self
            .http
            .get(format!("{}/search.messages", self.base_url))
            .bearer_auth(&self.bot_token)
            .query(&[
                ("query", query.as_str()),
                ("count", count_str.as_str()),
                ("sort", "timestamp"),
            ]);
        let resp = send_with_retry(request, &self.retry).await?;
        let resp = check_response(resp, "slack search").await?;
        let search: SearchResponse = resp.json().await?;

        if !search.ok {
            return Err(SkillError::Api {
                status: 200,
                message: search
                    .error
                    .unwrap_or_else(|| "slack search.messages failed".to_string()),
            });
        }

        let matches = search.messages.map(|m| m.matches).unwrap_or_default();
        let results: Vec<SlackMessageSnippet> = matches
            .into_iter()
            .take(count as usize)
            .map(|m| SlackMessageSnippet {
                timestamp: ts_to_iso(&m.ts),
                ts: m.ts,
                channel_id: m.channel.as_ref().map(|c| c.id.clone()),
                channel_name: m.channel.and_then(|c| c.name),
                user_id: m.user,
                user_name: m.username,
                text: m.text,
                permalink: m.permalink,
            })
            .collect();

        log::info!("found {} slack messages for the target date", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ts_to_iso() {
        let iso = ts_to_iso("1754550000.000123").unwrap();
        assert!(iso.starts_with("2025-08-07T"));
        assert!(ts_to_iso("not-a-ts").is_none());
    }

    #[tokio::test]
    async fn test_search_messages_mock_flow() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/auth.test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true, "user_id": "U123"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/search.messages")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "ok": true,
                    "messages": {"matches": [{
                        "ts": "1754550000.000123",
                        "text": "can you review the deck?",
                        "permalink": "https://slack.example/p1",
                        "channel": {"id": "C1", "name": "design"},
                        "user": "U456",
                        "username": "alice"
                    }]}
                }"#,
            )
            .create_async()
            .await;

        let client = SlackClient::new("xoxb-token").with_base_url(server.url());
        let target = Utc.with_ymd_and_hms(2025, 8, 7, 0, 0, 0).unwrap();
        let messages = client
            .recent_dms_and_mentions_for_briefing("user-1", target, 3)
            .await
            .unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].user_name.as_deref(), Some("alice"));
        assert_eq!(messages[0].channel_name.as_deref(), Some("design"));
        assert!(messages[0].timestamp.as_deref().unwrap().starts_with("2025-08-07"));
    }

    #[tokio::test]
    async fn test_search_error_envelope_surfaces() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/auth.test")
            .with_status(200)
            .with_body(r#"{"ok": false, "error": "invalid_auth"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/search.messages")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"ok": false, "error": "search_not_allowed"}"#)
            .create_async()
            .await;

        let client = SlackClient::new("xoxb-token").with_base_url(server.url());
        let target = Utc.with_ymd_and_hms(2025, 8, 7, 0, 0, 0).unwrap();
        let err = client
            .recent_dms_and_mentions_for_briefing("user-1", target, 3)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("search_not_allowed"));
    }

    #[tokio::test]
    async fn test_missing_token_is_config_error() {
        let client = SlackClient::new("");
        let err = client
            .recent_dms_and_mentions_for_briefing("user-1", Utc::now(), 3)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
