//! Configuration stored in ~/.daybrief/config.json.
//!
//! One explicit struct passed into provider constructors at startup,
//! replacing per-module lazily-initialized client singletons. Credentials
//! are read once at process start; providers hold their own copies.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::SkillError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// OAuth access token for Google Calendar and Gmail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_access_token: Option<String>,
    /// Notion integration token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notion_api_key: Option<String>,
    /// Database holding the user's tasks. Task fetching is skipped (with a
    /// recorded briefing error) when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notion_tasks_database_id: Option<String>,
    /// Slack bot token with search scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_bot_token: Option<String>,
    /// Delegated Microsoft Graph access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ms_graph_access_token: Option<String>,
}

impl Config {
    /// Canonical config path: `~/.daybrief/config.json`.
    pub fn path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_default()
            .join(".daybrief")
            .join("config.json")
    }

    /// Load from the canonical path. A missing file is a `Config` error;
    /// callers that can run without credentials use `load_or_default`.
    pub fn load() -> Result<Self, SkillError> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, SkillError> {
        if !path.exists() {
            return Err(SkillError::Config(format!(
                "config not found at {}",
                path.display()
            )));
        }
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(SkillError::from)
    }

    /// Load from the canonical path, falling back to an empty config.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("No usable config ({}); continuing unconfigured", e);
                Self::default()
            }
        }
    }
}
