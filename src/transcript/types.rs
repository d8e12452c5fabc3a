use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer};

/// Kind discriminator of a transcript line (`"type"` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    User,
    Assistant,
    /// summary, system, file-history-snapshot and anything newer
    #[default]
    #[serde(other)]
    Other,
}

/// One decoded line of a session transcript.
///
/// Lines of unknown kind still carry a timestamp and header fields, so they
/// take part in start/end detection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub kind: EventKind,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Claude Code CLI version that wrote the line
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub git_branch: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub is_sidechain: bool,
    #[serde(default)]
    pub message: Option<MessagePayload>,
}

impl RawEvent {
    /// Parsed RFC 3339 timestamp; `None` when absent or malformed
    pub fn parsed_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        self.timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
    }
}

/// Nested `message` object of user and assistant lines
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub content: Option<MessageContent>,
}

impl MessagePayload {
    /// Model id, ignoring empty strings
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref().filter(|m| !m.is_empty())
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        match &self.content {
            Some(MessageContent::Blocks(blocks)) => blocks,
            _ => &[],
        }
    }

    /// Plain text of the message: the string form, or text blocks joined by newlines
    pub fn text(&self) -> String {
        match &self.content {
            Some(MessageContent::Text(s)) => s.clone(),
            Some(MessageContent::Blocks(blocks)) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } if !text.is_empty() => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
            _ => String::new(),
        }
    }

    /// Number of `tool_use` blocks
    pub fn tool_use_count(&self) -> usize {
        self.blocks()
            .iter()
            .filter(|b| matches!(b, ContentBlock::ToolUse { .. }))
            .count()
    }
}

/// `content` is either a bare string (typed prompts) or a block list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
    /// Shape we don't understand; kept so the line itself still decodes
    Unknown(serde_json::Value),
}

/// A content block. Tool arguments are never retained.
///
/// Any element that does not decode as a known block becomes `Other`, so one
/// odd block never hides its siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Text { text: String },
    ToolUse { name: String },
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedBlock {
    Text {
        #[serde(default, deserialize_with = "null_default")]
        text: String,
    },
    ToolUse {
        #[serde(default, deserialize_with = "null_default")]
        name: String,
    },
    #[serde(other)]
    Other,
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match serde_json::from_value(value) {
            Ok(TaggedBlock::Text { text }) => Self::Text { text },
            Ok(TaggedBlock::ToolUse { name }) => Self::ToolUse { name },
            Ok(TaggedBlock::Other) | Err(_) => Self::Other,
        })
    }
}

/// Token telemetry attached to an assistant response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default, deserialize_with = "null_default")]
    pub input_tokens: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub output_tokens: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub cache_read_input_tokens: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub cache_creation_input_tokens: u64,
}

/// `null` reads as the type's default instead of failing the line
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
