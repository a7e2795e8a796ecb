//! Collaborator seams for vendor APIs.
//!
//! Each source the skills consume is a small async trait, so briefing
//! orchestration and the fuzzy finder can be exercised against in-memory
//! fakes. The HTTP clients in the submodules implement these traits with
//! direct reqwest calls plus bounded retry.
//!
//! Modules:
//! - google_calendar: Google Calendar API v3
//! - gmail: Gmail API v1
//! - notion: Notion database query API
//! - slack: Slack Web API (search.messages)
//! - teams: Microsoft Graph search

pub mod gmail;
pub mod google_calendar;
pub mod notion;
pub mod slack;
pub mod teams;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SkillError;
use crate::types::{
    CalendarEventSummary, GmailMessageSnippet, NotionTask, QueryTaskParams, SlackMessageSnippet,
    TeamsMessageSnippet,
};

/// Read access to the user's calendar.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// List events within an optional ISO-8601 window, earliest first.
    async fn list_upcoming_events(
        &self,
        user_id: &str,
        limit: u32,
        time_min_iso: Option<&str>,
        time_max_iso: Option<&str>,
    ) -> Result<Vec<CalendarEventSummary>, SkillError>;
}

/// Query access to the user's task backend.
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn query_tasks(
        &self,
        user_id: &str,
        params: &QueryTaskParams,
    ) -> Result<Vec<NotionTask>, SkillError>;
}

/// Recent unread email for a briefing's target day.
#[async_trait]
pub trait EmailSource: Send + Sync {
    async fn recent_unread_for_briefing(
        &self,
        user_id: &str,
        target_date: DateTime<Utc>,
        count: u32,
    ) -> Result<Vec<GmailMessageSnippet>, SkillError>;
}

/// Recent Slack DMs and mentions for a briefing's target day.
#[async_trait]
pub trait SlackSource: Send + Sync {
    async fn recent_dms_and_mentions_for_briefing(
        &self,
        user_id: &str,
        target_date: DateTime<Utc>,
        count: u32,
    ) -> Result<Vec<SlackMessageSnippet>, SkillError>;
}

/// Recent MS Teams chats and mentions for a briefing's target day.
#[async_trait]
pub trait TeamsSource: Send + Sync {
    async fn recent_chats_and_mentions_for_briefing(
        &self,
        user_id: &str,
        target_date: DateTime<Utc>,
        count: u32,
    ) -> Result<Vec<TeamsMessageSnippet>, SkillError>;
}

// ============================================================================
// Retry
// ============================================================================

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

fn status_is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn retry_delay(
    attempt: u32,
    policy: &RetryPolicy,
    retry_after: Option<&reqwest::header::HeaderValue>,
) -> Duration {
    if let Some(value) = retry_after.and_then(|v| v.to_str().ok()) {
        if let Ok(secs) = value.parse::<u64>() {
            return Duration::from_secs(secs.min(30));
        }
    }

    let exponent = 2u64.saturating_pow(attempt.saturating_sub(1));
    let base = policy
        .initial_backoff_ms
        .saturating_mul(exponent)
        .min(policy.max_backoff_ms);
    let jitter = (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0))
        % 150;
    Duration::from_millis(base.saturating_add(jitter))
}

/// Send a request, retrying on 429/408/5xx and transport-level timeouts.
pub async fn send_with_retry(
    request: reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, SkillError> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        let Some(cloned) = request.try_clone() else {
            return request.send().await.map_err(SkillError::Http);
        };

        match cloned.send().await {
            Ok(response) => {
                let status = response.status();
                if status_is_retryable(status) && attempt < attempts {
                    let delay = retry_delay(
                        attempt,
                        policy,
                        response.headers().get(reqwest::header::RETRY_AFTER),
                    );
                    log::warn!(
                        "provider retry {}/{} after status {} (sleep {:?})",
                        attempt,
                        attempts,
                        status,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Ok(response);
            }
            Err(err) => {
                let retryable_transport = err.is_timeout() || err.is_connect();
                if retryable_transport && attempt < attempts {
                    let delay = retry_delay(attempt, policy, None);
                    log::warn!(
                        "provider retry {}/{} after transport error: {} (sleep {:?})",
                        attempt,
                        attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(SkillError::Http(err));
            }
        }
    }

    Err(SkillError::Api {
        status: 0,
        message: "request exhausted retries".to_string(),
    })
}

/// Map a non-success response to a `SkillError`, reading the body for
/// the error message. 401 becomes `AuthMissing` so callers can tell
/// expired credentials from vendor-side failures.
pub(crate) async fn check_response(
    resp: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response, SkillError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(SkillError::AuthMissing(format!(
            "{context}: token rejected"
        )));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SkillError::Api {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(resp)
}
