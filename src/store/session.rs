use chrono::{DateTime, FixedOffset};
use std::io::BufRead;
use std::path::Path;

use super::error::StoreError;
use super::types::{Message, ModelUsage, Role, SessionDetail, SessionStats};
use crate::transcript::{EventKind, RawEvent, TranscriptError, TranscriptReader};

/// Bucket for usage recorded before the session named any model
pub const UNKNOWN_MODEL: &str = "unknown";

/// Scan one transcript for stats only: counts, tokens, tool calls, timestamps.
/// Message text is not kept.
pub fn scan_session_stats(path: &Path) -> Result<SessionStats, StoreError> {
    let wrap = |source| StoreError::Transcript {
        path: path.to_path_buf(),
        source,
    };
    let reader = TranscriptReader::open(path).map_err(wrap)?;
    let stats = stats_from_reader(&session_stem(path), reader).map_err(wrap)?;
    Ok(stats)
}

pub(crate) fn stats_from_reader<R: BufRead>(
    default_id: &str,
    mut reader: TranscriptReader<R>,
) -> Result<SessionStats, TranscriptError> {
    let mut scan = StatsScan::new(default_id);
    for event in reader.by_ref() {
        scan.observe(&event?);
    }
    if reader.malformed_lines() > 0 {
        log::debug!(
            "{}: skipped {} malformed lines",
            default_id,
            reader.malformed_lines()
        );
    }
    Ok(scan.stats)
}

/// Session id from the transcript filename; header `sessionId` values are ignored
pub fn session_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

struct StatsScan {
    stats: SessionStats,
}

impl StatsScan {
    fn new(default_id: &str) -> Self {
        Self {
            stats: SessionStats {
                session_id: default_id.to_string(),
                ..Default::default()
            },
        }
    }

    fn observe(&mut self, event: &RawEvent) {
        let stats = &mut self.stats;

        if let Some(ts) = event.parsed_timestamp() {
            track_span(&mut stats.started_at, &mut stats.ended_at, ts);
        }

        match event.kind {
            EventKind::User => stats.user_messages += 1,
            EventKind::Assistant => {
                stats.assistant_messages += 1;
                let Some(msg) = &event.message else {
                    return;
                };

                if let Some(model) = msg.model() {
                    stats.model = Some(model.to_string());
                }

                if let Some(usage) = &msg.usage {
                    // Never reassigned once a model shows up later
                    let model = stats.model.as_deref().unwrap_or(UNKNOWN_MODEL);
                    stats
                        .tokens
                        .entry(model.to_string())
                        .or_insert_with(ModelUsage::default)
                        .add(usage);
                }

                stats.tool_calls += msg.tool_use_count() as u64;
            }
            EventKind::Other => {}
        }
    }
}

/// First and last timestamps in file order; out-of-order lines are not corrected
fn track_span(
    first: &mut Option<DateTime<FixedOffset>>,
    last: &mut Option<DateTime<FixedOffset>>,
    ts: DateTime<FixedOffset>,
) {
    if first.is_none() {
        *first = Some(ts);
    }
    *last = Some(ts);
}

/// Parse a transcript fully, keeping message text and per-tool counts
pub fn parse_session_detail(path: &Path) -> Result<SessionDetail, StoreError> {
    let wrap = |source| StoreError::Transcript {
        path: path.to_path_buf(),
        source,
    };
    let reader = TranscriptReader::open(path).map_err(wrap)?;
    detail_from_reader(&session_stem(path), reader).map_err(wrap)
}

pub(crate) fn detail_from_reader<R: BufRead>(
    default_id: &str,
    reader: TranscriptReader<R>,
) -> Result<SessionDetail, TranscriptError> {
    let mut detail = SessionDetail {
        id: default_id.to_string(),
        ..Default::default()
    };

    for event in reader {
        let event = event?;

        if let Some(v) = event.version.as_deref().filter(|v| !v.is_empty()) {
            detail.version = Some(v.to_string());
        }
        if let Some(b) = event.git_branch.as_deref().filter(|b| !b.is_empty()) {
            detail.git_branch = Some(b.to_string());
        }
        detail.is_sidechain |= event.is_sidechain;

        let ts = event.parsed_timestamp();
        if let Some(ts) = ts {
            track_span(&mut detail.started_at, &mut detail.ended_at, ts);
        }

        let role = match event.kind {
            EventKind::User => {
                detail.user_messages += 1;
                Role::User
            }
            EventKind::Assistant => {
                detail.assistant_messages += 1;
                if let Some(msg) = &event.message {
                    if let Some(usage) = &msg.usage {
                        detail.tokens_in += usage.input_tokens;
                        detail.tokens_out += usage.output_tokens;
                    }
                    if let Some(model) = msg.model() {
                        detail.model = Some(model.to_string());
                    }
                    for block in msg.blocks() {
                        if let crate::transcript::ContentBlock::ToolUse { name } = block {
                            if !name.is_empty() {
                                *detail.tools.entry(name.clone()).or_insert(0) += 1;
                            }
                        }
                    }
                }
                Role::Assistant
            }
            EventKind::Other => continue,
        };

        detail.total_messages += 1;
        let content = event.message.as_ref().map(|m| m.text()).unwrap_or_default();
        detail.messages.push(Message {
            seq: detail.messages.len(),
            timestamp: ts,
            role,
            content,
        });
    }

    Ok(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const USER_LINE: &str = r#"{"type":"user","timestamp":"2024-01-01T10:00:00Z","message":{"role":"user","content":"add a test"}}"#;
    const ASSISTANT_LINE: &str = r#"{"type":"assistant","timestamp":"2024-01-01T10:05:00Z","message":{"model":"claude-sonnet-4-5","usage":{"input_tokens":100,"output_tokens":50},"content":[{"type":"text","text":"done"}]}}"#;

    fn stats(input: &str) -> SessionStats {
        let reader = TranscriptReader::new(Cursor::new(input.as_bytes().to_vec()));
        stats_from_reader("file-stem", reader).unwrap()
    }

    fn detail(input: &str) -> SessionDetail {
        let reader = TranscriptReader::new(Cursor::new(input.as_bytes().to_vec()));
        detail_from_reader("file-stem", reader).unwrap()
    }

    #[test]
    fn test_basic_session() {
        let s = stats(&format!("{}\n{}\n", USER_LINE, ASSISTANT_LINE));
        assert_eq!(s.session_id, "file-stem");
        assert_eq!(s.user_messages, 1);
        assert_eq!(s.assistant_messages, 1);
        assert_eq!(s.total_messages(), 2);
        assert_eq!(s.tokens["claude-sonnet-4-5"].output_tokens, 50);
        assert_eq!(s.tokens["claude-sonnet-4-5"].input_tokens, 100);
        assert_eq!(
            s.started_at.unwrap().to_rfc3339(),
            "2024-01-01T10:00:00+00:00"
        );
        assert_eq!(s.ended_at.unwrap().to_rfc3339(), "2024-01-01T10:05:00+00:00");
        assert_eq!(s.duration_ms(), Some(300_000));
    }

    #[test]
    fn test_malformed_line_has_no_effect() {
        let clean = stats(&format!("{}\n{}\n{}\n", USER_LINE, ASSISTANT_LINE, USER_LINE));
        let dirty = stats(&format!(
            "{}\n{}\n{{\"type\":\"user\",,,\n{}\n",
            USER_LINE, ASSISTANT_LINE, USER_LINE
        ));
        assert_eq!(clean, dirty);
    }

    #[test]
    fn test_usage_before_model_goes_to_unknown() {
        let input = concat!(
            r#"{"type":"assistant","message":{"usage":{"output_tokens":7}}}"#,
            "\n",
            r#"{"type":"assistant","message":{"model":"claude-opus-4-6","usage":{"output_tokens":3}}}"#,
            "\n",
            r#"{"type":"assistant","message":{"usage":{"output_tokens":2}}}"#,
            "\n",
        );
        let s = stats(input);
        assert_eq!(s.tokens[UNKNOWN_MODEL].output_tokens, 7);
        // Later lines without a model stay with the last model seen
        assert_eq!(s.tokens["claude-opus-4-6"].output_tokens, 5);
        assert_eq!(s.tokens.len(), 2);
    }

    #[test]
    fn test_model_switch_mid_session() {
        let input = concat!(
            r#"{"type":"assistant","message":{"model":"claude-sonnet-4-5","usage":{"input_tokens":1,"output_tokens":10,"cache_read_input_tokens":4,"cache_creation_input_tokens":2}}}"#,
            "\n",
            r#"{"type":"assistant","message":{"model":"claude-haiku-4-5","usage":{"output_tokens":20}}}"#,
            "\n",
        );
        let s = stats(input);
        assert_eq!(s.tokens["claude-sonnet-4-5"].cache_read_input_tokens, 4);
        assert_eq!(s.tokens["claude-sonnet-4-5"].cache_creation_input_tokens, 2);
        assert_eq!(s.tokens["claude-haiku-4-5"].output_tokens, 20);
        assert_eq!(s.model.as_deref(), Some("claude-haiku-4-5"));
    }

    #[test]
    fn test_tool_calls_counted() {
        let input = concat!(
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Read","input":{}},{"type":"tool_use","name":"Bash","input":{"command":"ls"}}]}}"#,
            "\n",
            r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"x","content":"ok"}]}}"#,
            "\n",
        );
        let s = stats(input);
        assert_eq!(s.tool_calls, 2);
        assert_eq!(s.user_messages, 1);
    }

    #[test]
    fn test_filename_stem_is_session_id() {
        let input = concat!(
            r#"{"type":"summary","summary":"x"}"#,
            "\n",
            r#"{"type":"user","sessionId":"parent-session"}"#,
            "\n",
        );
        assert_eq!(stats(input).session_id, "file-stem");
        assert_eq!(detail(input).id, "file-stem");
    }

    #[test]
    fn test_odd_blocks_do_not_hide_tool_calls() {
        let input = concat!(
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Bash","input":{}},{"text":"no type tag"}]}}"#,
            "\n",
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Read","input":{}},{"type":"text","text":null}]}}"#,
            "\n",
        );
        assert_eq!(stats(input).tool_calls, 2);
        assert_eq!(detail(input).tools["Bash"], 1);
    }

    #[test]
    fn test_null_sidechain_still_counts() {
        let s = stats("{\"type\":\"user\",\"isSidechain\":null,\"timestamp\":\"2024-01-01T10:00:00Z\"}\n");
        assert_eq!(s.user_messages, 1);
        assert!(s.started_at.is_some());
    }

    #[test]
    fn test_timestamps_in_file_order() {
        let input = concat!(
            r#"{"type":"user","timestamp":"2024-01-01T12:00:00Z"}"#,
            "\n",
            r#"{"type":"user","timestamp":"garbage"}"#,
            "\n",
            r#"{"type":"user","timestamp":"2024-01-01T11:00:00Z"}"#,
            "\n",
        );
        let s = stats(input);
        assert_eq!(s.started_at.unwrap().to_rfc3339(), "2024-01-01T12:00:00+00:00");
        assert_eq!(s.ended_at.unwrap().to_rfc3339(), "2024-01-01T11:00:00+00:00");
        assert_eq!(s.duration_ms(), Some(-3_600_000));
    }

    #[test]
    fn test_other_events_only() {
        let s = stats("{\"type\":\"summary\",\"timestamp\":\"2024-01-01T10:00:00Z\"}\n");
        assert_eq!(s.total_messages(), 0);
        assert!(s.started_at.is_some());
    }

    #[test]
    fn test_scan_missing_file_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = scan_session_stats(&dir.path().join("gone.jsonl")).unwrap_err();
        assert!(matches!(err, StoreError::Transcript { .. }));
    }

    #[test]
    fn test_detail_messages_and_tools() {
        let input = concat!(
            r#"{"type":"user","timestamp":"2024-01-01T10:00:00Z","version":"2.1.0","gitBranch":"main","message":{"content":"first prompt"}}"#,
            "\n",
            r#"{"type":"assistant","timestamp":"2024-01-01T10:01:00Z","message":{"model":"claude-opus-4-6","usage":{"input_tokens":10,"output_tokens":20},"content":[{"type":"text","text":"sure"},{"type":"tool_use","name":"Edit","input":{"file":"a"}},{"type":"tool_use","name":"Edit","input":{}}]}}"#,
            "\n",
            r#"{"type":"system","timestamp":"2024-01-01T10:02:00Z"}"#,
            "\n",
        );
        let d = detail(input);
        assert_eq!(d.total_messages, 2);
        assert_eq!(d.messages.len(), 2);
        assert_eq!(d.messages[0].role, Role::User);
        assert_eq!(d.messages[0].content, "first prompt");
        assert_eq!(d.messages[1].seq, 1);
        assert_eq!(d.messages[1].content, "sure");
        assert_eq!(d.tools["Edit"], 2);
        assert_eq!(d.tokens_out, 20);
        assert_eq!(d.model.as_deref(), Some("claude-opus-4-6"));
        assert_eq!(d.version.as_deref(), Some("2.1.0"));
        assert_eq!(d.git_branch.as_deref(), Some("main"));
        assert_eq!(d.duration().unwrap().num_minutes(), 2);
        assert!(!d.is_sidechain);
    }
}
