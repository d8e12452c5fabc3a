use anyhow::{Context as _, Result};
use chrono::SecondsFormat;
use colored::Colorize;
use serde::Serialize;

use crate::cli::Context;
use crate::display::{self, OutputFormat};
use crate::store::{self, Message, Role, SessionDetail};

const PROMPTS_SHOWN: usize = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub path: String,
    /// Project path recorded in the index, when the session was found there
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(flatten)]
    pub detail: SessionDetail,
}

pub fn run(ctx: &Context, id_prefix: &str) -> Result<()> {
    let found =
        store::find_session(&ctx.paths.projects_dir(), id_prefix).context("finding session")?;
    log::debug!("Session {} resolved to {}", id_prefix, found.path.display());

    let detail = store::parse_session_detail(&found.path).context("parsing session")?;
    let report = SessionReport {
        path: found.path.display().to_string(),
        project: found
            .entry
            .map(|e| e.project_path)
            .filter(|p| !p.is_empty()),
        detail,
    };
    render(ctx.format, &report)
}

/// Tools by call count, most used first
fn tools_by_count(detail: &SessionDetail) -> Vec<(&str, u64)> {
    let mut tools: Vec<(&str, u64)> = detail
        .tools
        .iter()
        .map(|(name, count)| (name.as_str(), *count))
        .collect();
    tools.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    tools
}

/// Non-empty user prompts in conversation order
fn user_prompts(detail: &SessionDetail) -> impl Iterator<Item = &Message> {
    detail
        .messages
        .iter()
        .filter(|m| m.role == Role::User && !m.content.trim().is_empty())
}

pub fn render(format: OutputFormat, report: &SessionReport) -> Result<()> {
    match format {
        OutputFormat::Json => return display::print_json(report),
        OutputFormat::Markdown => render_markdown(report),
        OutputFormat::Terminal => render_terminal(report),
    }
    Ok(())
}

fn render_terminal(report: &SessionReport) {
    let d = &report.detail;
    display::title("Session Detail");
    println!();

    display::section("Info", || {
        println!("  ID          {}", d.id.bold());
        if let Some(project) = &report.project {
            println!("  Project     {}", project);
        }
        if let Some(branch) = &d.git_branch {
            println!("  Branch      {}", branch);
        }
        if let Some(version) = &d.version {
            println!("  CLI         {}", format!("v{}", version).dimmed());
        }
        if let Some(started) = d.started_at {
            println!(
                "  Started     {}",
                started.to_rfc3339_opts(SecondsFormat::Secs, true)
            );
        }
        if let Some(duration) = d.duration() {
            println!(
                "  Duration    {}",
                display::format_duration(duration).bold()
            );
        }
        if let Some(model) = &d.model {
            println!("  Model       {}", display::model_short(model).bold());
        }
        if d.is_sidechain {
            println!("  Type        {}", "sidechain".yellow());
        }
    });
    println!();

    display::section("Messages", || {
        println!("  Total       {}", display::format_number(d.total_messages).bold());
        println!("  User        {}", display::format_number(d.user_messages));
        println!("  Assistant   {}", display::format_number(d.assistant_messages));
    });
    println!();

    display::section("Tokens", || {
        println!("  Input       {}", display::format_tokens(d.tokens_in).bold());
        println!("  Output      {}", display::format_tokens(d.tokens_out).bold());
    });
    println!();

    let tools = tools_by_count(d);
    if let Some(&(_, max)) = tools.first() {
        display::section("Tool Usage", || {
            for (name, count) in &tools {
                println!(
                    "  {} {:>3}  {}",
                    display::bar(*count, max, 15),
                    count,
                    name
                );
            }
        });
        println!();
    }

    display::section("Conversation", || {
        let mut prompts = user_prompts(d).peekable();
        if prompts.peek().is_none() {
            println!("  {}", "(no user messages)".dimmed());
        }
        for (i, msg) in prompts.enumerate() {
            if i == PROMPTS_SHOWN {
                println!("  {}", "... and more messages".dimmed());
                break;
            }
            let time = msg
                .timestamp
                .map(|t| format!("{} ", t.format("%H:%M")))
                .unwrap_or_default();
            println!(
                "  {}{} {}",
                time.dimmed(),
                "▸".green(),
                display::truncate(&display::one_line(&msg.content), 70)
            );
        }
    });
    println!();
}

fn render_markdown(report: &SessionReport) {
    let d = &report.detail;
    display::md_header(2, "Session Detail");

    println!("- **ID:** `{}`", d.id);
    if let Some(project) = &report.project {
        println!("- **Project:** {}", project);
    }
    if let Some(branch) = &d.git_branch {
        println!("- **Branch:** {}", branch);
    }
    if let Some(version) = &d.version {
        println!("- **CLI:** v{}", version);
    }
    if let Some(started) = d.started_at {
        println!(
            "- **Started:** {}",
            started.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }
    if let Some(duration) = d.duration() {
        println!("- **Duration:** {}", display::format_duration(duration));
    }
    if let Some(model) = &d.model {
        println!("- **Model:** {}", display::model_short(model));
    }
    if d.is_sidechain {
        println!("- **Type:** sidechain");
    }
    println!();

    display::md_header(3, "Messages");
    println!("- **Total:** {}", display::format_number(d.total_messages));
    println!("- **User:** {}", display::format_number(d.user_messages));
    println!(
        "- **Assistant:** {}\n",
        display::format_number(d.assistant_messages)
    );

    display::md_header(3, "Tokens");
    println!("- **Input:** {}", display::format_tokens(d.tokens_in));
    println!("- **Output:** {}\n", display::format_tokens(d.tokens_out));

    let tools = tools_by_count(d);
    if !tools.is_empty() {
        display::md_header(3, "Tool Usage");
        let rows: Vec<Vec<String>> = tools
            .iter()
            .map(|(name, count)| vec![name.to_string(), count.to_string()])
            .collect();
        display::md_table(&["Tool", "Calls"], &rows);
    }

    display::md_header(3, "Conversation");
    let rows: Vec<Vec<String>> = user_prompts(d)
        .take(PROMPTS_SHOWN)
        .map(|m| {
            vec![
                m.timestamp
                    .map(|t| t.format("%H:%M").to_string())
                    .unwrap_or_default(),
                display::truncate(&display::one_line(&m.content), 70),
            ]
        })
        .collect();
    if rows.is_empty() {
        println!("(no user messages)\n");
    } else {
        display::md_table(&["Time", "Prompt"], &rows);
    }
}
