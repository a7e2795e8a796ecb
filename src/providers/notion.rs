//! Notion database query API — task fetching.
//!
//! Queries the tasks database with a filter tree built from
//! `QueryTaskParams` and flattens Notion's page/property shapes into
//! `NotionTask` records. Expected schema: "Task Description" (title),
//! "Due Date" (date), "Status" (select), "Priority" (select),
//! "List Name" (rich text).

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{check_response, send_with_retry, RetryPolicy, TaskSource};
use crate::error::SkillError;
use crate::types::{NotionTask, QueryTaskParams, TaskPriority, TaskStatus};

const DEFAULT_BASE_URL: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";

/// Notion rejects page_size above 100.
const MAX_PAGE_SIZE: u32 = 100;

pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    tasks_database_id: String,
    retry: RetryPolicy,
}

impl NotionClient {
    pub fn new(api_key: impl Into<String>, tasks_database_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            tasks_database_id: tasks_database_id.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Build the Notion filter tree for the query params. Returns `None`
/// when no filter applies (query everything).
fn build_filter(params: &QueryTaskParams) -> Option<Value> {
    let mut filters: Vec<Value> = Vec::new();

    for status in &params.status_not_equals {
        filters.push(json!({
            "property": "Status",
            "select": {"does_not_equal": status.as_str()}
        }));
    }
    if let Some(priority) = params.priority {
        filters.push(json!({
            "property": "Priority",
            "select": {"equals": priority.as_str()}
        }));
    }
    if let Some(before) = &params.due_date_before {
        filters.push(json!({
            "property": "Due Date",
            "date": {"before": before}
        }));
    }
    if let Some(equals) = &params.due_date_equals {
        filters.push(json!({
            "property": "Due Date",
            "date": {"equals": equals}
        }));
    }
    if let Some(list_name) = &params.list_name {
        filters.push(json!({
            "property": "List Name",
            "rich_text": {"contains": list_name}
        }));
    }

    match filters.len() {
        0 => None,
        1 => filters.pop(),
        _ => Some(json!({"and": filters})),
    }
}

fn title_text(prop: &Value) -> Option<String> {
    prop.get("title")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|t| t.get("plain_text"))
        .and_then(Value::as_str)
        .map(String::from)
}

fn rich_text(prop: &Value) -> Option<String> {
    prop.get("rich_text")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|t| t.get("plain_text"))
        .and_then(Value::as_str)
        .map(String::from)
}

fn select_name(prop: &Value) -> Option<String> {
    prop.get("select")
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .map(String::from)
}

fn date_start(prop: &Value) -> Option<String> {
    prop.get("date")
        .and_then(|d| d.get("start"))
        .and_then(Value::as_str)
        .map(String::from)
}

fn parse_status(name: Option<&str>) -> TaskStatus {
    match name {
        Some("In Progress") => TaskStatus::InProgress,
        Some("Done") => TaskStatus::Done,
        Some("Blocked") => TaskStatus::Blocked,
        Some("Cancelled") => TaskStatus::Cancelled,
        // Unknown or missing statuses are treated as open.
        _ => TaskStatus::ToDo,
    }
}

fn parse_priority(name: Option<&str>) -> Option<TaskPriority> {
    match name {
        Some("High") => Some(TaskPriority::High),
        Some("Medium") => Some(TaskPriority::Medium),
        Some("Low") => Some(TaskPriority::Low),
        _ => None,
    }
}

fn page_to_task(page: &Value) -> Option<NotionTask> {
    let id = page.get("id").and_then(Value::as_str)?.to_string();
    let props = page.get("properties")?;

    let status_name = props.get("Status").and_then(select_name);
    let priority_name = props.get("Priority").and_then(select_name);

    Some(NotionTask {
        id,
        description: props
            .get("Task Description")
            .and_then(title_text)
            .unwrap_or_default(),
        due_date: props.get("Due Date").and_then(date_start),
        status: parse_status(status_name.as_deref()),
        priority: parse_priority(priority_name.as_deref()),
        list_name: props.get("List Name").and_then(rich_text),
        created_date: page
            .get("created_time")
            .and_then(Value::as_str)
            .map(String::from),
        url: page.get("url").and_then(Value::as_str).map(String::from),
        last_edited_time: page
            .get("last_edited_time")
            .and_then(Value::as_str)
            .map(String::from),
    })
}

#[async_trait]
impl TaskSource for NotionClient {
    async fn query_tasks(
        &self,
        user_id: &str,
        params: &QueryTaskParams,
    ) -> Result<Vec<NotionTask>, SkillError> {
        if self.tasks_database_id.is_empty() {
            return Err(SkillError::Config(
                "Notion tasks database ID is not configured.".to_string(),
            ));
        }

        let page_size = params.limit.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE);
        let mut body = json!({"page_size": page_size});
        if let Some(filter) = build_filter(params) {
            body["filter"] = filter;
        }
        log::debug!("notion task query for {}: {}", user_id, body);

        let url = format!(
            "{}/v1/databases/{}/query",
            self.base_url, self.tasks_database_id
        );
        let request = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body);
        let resp = send_with_retry(request, &self.retry).await?;
        let resp = check_response(resp, "notion query").await?;
        let payload: Value = resp.json().await?;

        let tasks: Vec<NotionTask> = payload
            .get("results")
            .and_then(Value::as_array)
            .map(|results| results.iter().filter_map(page_to_task).collect())
            .unwrap_or_default();
        log::debug!("notion returned {} tasks", tasks.len());
        Ok(tasks)
    }
}
