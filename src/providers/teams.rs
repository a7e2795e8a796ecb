//! Microsoft Graph search — recent Teams chats and mentions.
//!
//! Uses the Graph search endpoint with a chatMessage KQL query bounded
//! to the target day. Graph's hit envelope is deeply nested, so the
//! response is walked as loose JSON.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::{check_response, send_with_retry, RetryPolicy, TeamsSource};
use crate::calendar::{end_of_day_utc, start_of_day_utc};
use crate::error::SkillError;
use crate::types::TeamsMessageSnippet;

const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

pub struct TeamsClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    retry: RetryPolicy,
}

impl TeamsClient {
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
}

fn resource_to_snippet(hit: &Value) -> Option<TeamsMessageSnippet> {
    let resource = hit.get("resource")?;
    let id = resource
        .get("id")
        .and_then(Value::as_str)
        .or_else(|| hit.get("hitId").and_then(Value::as_str))?
        .to_string();

    Some(TeamsMessageSnippet {
        id,
        chat_id: resource
            .get("chatId")
            .and_then(Value::as_str)
            .map(String::from),
        user_name: resource
            .pointer("/from/user/displayName")
            .and_then(Value::as_str)
            .map(String::from),
        content: resource
            .pointer("/body/content")
            .and_then(Value::as_str)
            .map(String::from),
        created_date_time: resource
            .get("createdDateTime")
            .and_then(Value::as_str)
            .map(String::from),
        web_url: resource
            .get("webUrl")
            .and_then(Value::as_str)
            .map(String::from),
    })
}

#[async_trait]
impl TeamsSource for TeamsClient {
    async fn recent_chats_and_mentions_for_briefing(
        &self,
        user_id: &str,
        target_date: DateTime<Utc>,
        count: u32,
    ) -> Result<Vec<TeamsMessageSnippet>, SkillError> {
        if self.access_token.is_empty() {
            return Err(SkillError::AuthMissing(
                "MS Graph access token is not configured.".to_string(),
            ));
        }

        let start = start_of_day_utc(target_date).to_rfc3339();
        let end = end_of_day_utc(target_date).to_rfc3339();
        let kql = format!("createdDateTime>={start} AND createdDateTime<={end}");
        log::info!("teams briefing KQL for {}: \"{}\"", user_id, kql);

        let body = json!({
            "requests": [{
                "entityTypes": ["chatMessage"],
                "query": {"queryString": kql},
                "from": 0,
                "size": count
            }]
        });

        let request = self
            .http
            .post(format!("{}/search/query", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body);
        let resp = send_with_retry(request, &self.retry).await?;
        let resp = check_response(resp, "teams search").await?;
        let payload: Value = resp.json().await?;

        let hits = payload
            .pointer("/value/0/hitsContainers/0/hits")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let results: Vec<TeamsMessageSnippet> = hits
            .iter()
            .filter_map(resource_to_snippet)
            .take(count as usize)
            .collect();
        log::info!("found {} teams messages for the target date", results.len());
        Ok(results)
    }
}
