use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::transcript::Usage;

/// Top-level structure of `stats-cache.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsCache {
    pub version: u32,
    pub last_computed_date: String,
    /// One entry per date, ascending
    pub daily_activity: Vec<DailyActivity>,
    /// Output tokens per model per date, ascending
    pub daily_model_tokens: Vec<DailyModelTokens>,
    pub model_usage: BTreeMap<String, ModelUsage>,
    pub total_sessions: u64,
    pub total_messages: u64,
    pub longest_session: LongestSession,
    pub first_session_date: String,
    /// Hour of day ("0".."23") -> sessions started in that hour
    pub hour_counts: BTreeMap<String, u64>,
}

impl StatsCache {
    pub fn day(&self, date: &str) -> Option<&DailyActivity> {
        self.daily_activity.iter().find(|d| d.date == date)
    }

    /// Models ordered by output tokens, largest first
    pub fn models_by_output(&self) -> Vec<(&str, &ModelUsage)> {
        let mut models: Vec<(&str, &ModelUsage)> = self
            .model_usage
            .iter()
            .map(|(name, usage)| (name.as_str(), usage))
            .collect();
        models.sort_by(|a, b| b.1.output_tokens.cmp(&a.1.output_tokens));
        models
    }

    /// Sum of all four counters across models
    pub fn total_usage(&self) -> ModelUsage {
        let mut total = ModelUsage::default();
        for usage in self.model_usage.values() {
            total.merge(usage);
        }
        total
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyActivity {
    pub date: String,
    pub message_count: u64,
    pub session_count: u64,
    pub tool_call_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyModelTokens {
    pub date: String,
    pub tokens_by_model: BTreeMap<String, u64>,
}

impl DailyModelTokens {
    pub fn total(&self) -> u64 {
        self.tokens_by_model.values().sum()
    }
}

/// The four token counters, used per model and per session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_input_tokens: u64,
    pub cache_creation_input_tokens: u64,
}

impl ModelUsage {
    pub fn add(&mut self, usage: &Usage) {
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
        self.cache_read_input_tokens += usage.cache_read_input_tokens;
        self.cache_creation_input_tokens += usage.cache_creation_input_tokens;
    }

    pub fn merge(&mut self, other: &ModelUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_read_input_tokens += other.cache_read_input_tokens;
        self.cache_creation_input_tokens += other.cache_creation_input_tokens;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LongestSession {
    pub session_id: String,
    /// Milliseconds between first and last timestamp
    pub duration: u64,
    pub message_count: u64,
    pub timestamp: String,
}

/// A project's `sessions-index.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionIndex {
    pub version: u32,
    pub entries: Vec<SessionEntry>,
    pub original_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionEntry {
    pub session_id: String,
    pub full_path: String,
    pub file_mtime: i64,
    pub first_prompt: String,
    pub message_count: u64,
    pub created: String,
    pub modified: String,
    pub git_branch: String,
    pub project_path: String,
    pub is_sidechain: bool,
}

/// Aggregated view of one directory under `projects/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub dir_name: String,
    /// `originalPath` from the index; empty when unknown
    pub path: String,
    pub session_count: usize,
    pub message_count: u64,
    pub last_active: Option<DateTime<Utc>>,
    pub has_index: bool,
}

impl Project {
    pub fn display_name(&self) -> &str {
        if self.path.is_empty() {
            &self.dir_name
        } else {
            &self.path
        }
    }
}

/// Lightweight per-session facts used by the aggregator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub session_id: String,
    pub started_at: Option<DateTime<FixedOffset>>,
    pub ended_at: Option<DateTime<FixedOffset>>,
    pub user_messages: u64,
    pub assistant_messages: u64,
    pub tool_calls: u64,
    /// Token counters keyed by the model active when the usage was recorded
    pub tokens: BTreeMap<String, ModelUsage>,
    /// Last model seen in the session
    pub model: Option<String>,
}

impl SessionStats {
    pub fn total_messages(&self) -> u64 {
        self.user_messages + self.assistant_messages
    }

    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub seq: usize,
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub role: Role,
    pub content: String,
}

/// Fully parsed session, for the single-session view
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    pub id: String,
    pub started_at: Option<DateTime<FixedOffset>>,
    pub ended_at: Option<DateTime<FixedOffset>>,
    pub total_messages: u64,
    pub user_messages: u64,
    pub assistant_messages: u64,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub model: Option<String>,
    /// Tool name -> number of calls
    pub tools: BTreeMap<String, u64>,
    pub messages: Vec<Message>,
    pub git_branch: Option<String>,
    pub version: Option<String>,
    pub is_sidechain: bool,
}

impl SessionDetail {
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

pub fn parse_utc(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
