use anyhow::{Context as _, Result};
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use crate::cli::Context;
use crate::display::{self, OutputFormat};
use crate::store::{self, SessionEntry};

const PROMPT_WIDTH: usize = 55;

/// One listed session, as emitted in JSON
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    pub session_id: String,
    pub messages: u64,
    pub created: String,
    pub first_prompt: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub branch: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sidechain: bool,
}

impl From<&SessionEntry> for SessionRow {
    fn from(e: &SessionEntry) -> Self {
        Self {
            session_id: e.session_id.clone(),
            messages: e.message_count,
            created: e.created.clone(),
            first_prompt: e.first_prompt.clone(),
            branch: e.git_branch.clone(),
            sidechain: e.is_sidechain,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub total: usize,
    pub sessions: Vec<SessionRow>,
}

pub fn run(ctx: &Context, project: Option<&str>, limit: Option<usize>) -> Result<()> {
    let report = report(ctx, project, limit)?;
    render(ctx.format, &report)
}

pub fn report(ctx: &Context, project: Option<&str>, limit: Option<usize>) -> Result<SessionsReport> {
    let entries = store::list_all_sessions(&ctx.paths.projects_dir(), project)
        .context("loading sessions")?;
    let limit = limit.unwrap_or(ctx.config.display.session_limit);
    Ok(SessionsReport {
        project: project.filter(|p| !p.is_empty()).map(str::to_string),
        total: entries.len(),
        sessions: entries.iter().take(limit).map(SessionRow::from).collect(),
    })
}

pub fn render(format: OutputFormat, report: &SessionsReport) -> Result<()> {
    let heading = match &report.project {
        Some(p) => format!("Sessions for {}", p),
        None => "Recent Sessions".to_string(),
    };

    match format {
        OutputFormat::Json => return display::print_json(report),
        OutputFormat::Markdown => {
            display::md_header(2, &heading);
            println!("Total: {} sessions\n", report.total);
            if report.sessions.is_empty() {
                println!("No sessions found.\n");
                return Ok(());
            }
            let now = Utc::now();
            let rows: Vec<Vec<String>> = report
                .sessions
                .iter()
                .map(|s| {
                    vec![
                        store::short_id(&s.session_id).to_string(),
                        s.messages.to_string(),
                        display::relative_time(store::parse_utc(&s.created), now),
                        prompt_or_placeholder(&s.first_prompt, PROMPT_WIDTH),
                        s.branch.clone(),
                    ]
                })
                .collect();
            display::md_table(&["ID", "Messages", "Created", "Prompt", "Branch"], &rows);
            if report.total > report.sessions.len() {
                println!("Showing {} of {}.\n", report.sessions.len(), report.total);
            }
        }
        OutputFormat::Terminal => {
            display::title(&heading);
            println!("Total: {} sessions\n", report.total);
            if report.sessions.is_empty() {
                println!("{}", "No sessions found".dimmed());
                return Ok(());
            }
            print_rows(&report.sessions, PROMPT_WIDTH, true);
            if report.total > report.sessions.len() {
                println!(
                    "\n  {}",
                    format!(
                        "Showing {} of {}. Use -n to see more.",
                        report.sessions.len(),
                        report.total
                    )
                    .dimmed()
                );
            }
            println!();
        }
    }
    Ok(())
}

/// Terminal rows shared with the period reports
pub(crate) fn print_rows(rows: &[SessionRow], prompt_width: usize, markers: bool) {
    let now = Utc::now();
    for s in rows {
        let created = display::relative_time(store::parse_utc(&s.created), now);
        let prompt = match prompt_or_placeholder(&s.first_prompt, prompt_width) {
            p if s.first_prompt.trim().is_empty() => p.dimmed().to_string(),
            p => p,
        };
        let mut line = format!(
            "  {}  {:>3} msgs  {:<10}  {}",
            store::short_id(&s.session_id).dimmed(),
            s.messages,
            created,
            prompt
        );
        if markers {
            if s.sidechain {
                line.push_str(&" [sidechain]".yellow().to_string());
            }
            if !s.branch.is_empty() {
                line.push_str(&format!(" ({})", s.branch).dimmed().to_string());
            }
        }
        println!("{}", line);
    }
}

pub(crate) fn prompt_or_placeholder(prompt: &str, width: usize) -> String {
    let prompt = display::truncate(&display::one_line(prompt), width);
    if prompt.is_empty() {
        "(no prompt)".to_string()
    } else {
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_json_omits_defaults() {
        let entry = SessionEntry {
            session_id: "abc".to_string(),
            message_count: 3,
            created: "2024-01-01T10:00:00.000Z".to_string(),
            first_prompt: "hi".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(SessionRow::from(&entry)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "sessionId": "abc",
                "messages": 3,
                "created": "2024-01-01T10:00:00.000Z",
                "firstPrompt": "hi"
            })
        );
    }

    #[test]
    fn test_row_json_keeps_markers() {
        let entry = SessionEntry {
            session_id: "abc".to_string(),
            git_branch: "main".to_string(),
            is_sidechain: true,
            ..Default::default()
        };
        let json = serde_json::to_value(SessionRow::from(&entry)).unwrap();
        assert_eq!(json["branch"], "main");
        assert_eq!(json["sidechain"], true);
    }

    #[test]
    fn test_prompt_placeholder() {
        assert_eq!(prompt_or_placeholder("", 10), "(no prompt)");
        assert_eq!(prompt_or_placeholder("fix\nbug", 10), "fix bug");
    }
}
