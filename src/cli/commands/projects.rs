use anyhow::{Context as _, Result};
use chrono::{SecondsFormat, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::cli::Context;
use crate::display::{self, OutputFormat};
use crate::store::{self, Project};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRow {
    /// Original path when known, otherwise the directory name
    pub path: String,
    pub dir_name: String,
    pub sessions: usize,
    pub messages: u64,
    pub last_active: String,
    /// Counts came from the index rather than file listing
    pub indexed: bool,
}

impl From<&Project> for ProjectRow {
    fn from(p: &Project) -> Self {
        Self {
            path: p.display_name().to_string(),
            dir_name: p.dir_name.clone(),
            sessions: p.session_count,
            messages: p.message_count,
            last_active: p
                .last_active
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default(),
            indexed: p.has_index,
        }
    }
}

pub fn run(ctx: &Context) -> Result<()> {
    let projects = report(ctx)?;
    render(ctx.format, &projects)
}

/// Projects ranked by message count
pub fn report(ctx: &Context) -> Result<Vec<Project>> {
    let mut projects =
        store::load_all_projects(&ctx.paths.projects_dir()).context("loading projects")?;
    rank(&mut projects);
    Ok(projects)
}

fn rank(projects: &mut [Project]) {
    projects.sort_by(|a, b| {
        b.message_count
            .cmp(&a.message_count)
            .then(b.session_count.cmp(&a.session_count))
    });
}

pub fn render(format: OutputFormat, projects: &[Project]) -> Result<()> {
    let now = Utc::now();
    match format {
        OutputFormat::Json => {
            let rows: Vec<ProjectRow> = projects.iter().map(ProjectRow::from).collect();
            return display::print_json(&rows);
        }
        OutputFormat::Markdown => {
            display::md_header(2, "Projects");
            println!("Found {} projects with activity\n", projects.len());
            if projects.is_empty() {
                println!("No projects found.\n");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = projects
                .iter()
                .map(|p| {
                    vec![
                        p.display_name().to_string(),
                        p.session_count.to_string(),
                        display::format_number(p.message_count),
                        display::relative_time(p.last_active, now),
                    ]
                })
                .collect();
            display::md_table(&["Project", "Sessions", "Messages", "Last Active"], &rows);
        }
        OutputFormat::Terminal => {
            display::title("Projects");
            println!("Found {} projects with activity\n", projects.len());
            let Some(top) = projects.first() else {
                println!("{}", "No projects found".dimmed());
                return Ok(());
            };
            for p in projects {
                println!(
                    "  {} {:<12}  {:>3} sessions  {}  {}",
                    display::bar(p.message_count, top.message_count, 15),
                    format!("{} msgs", display::format_number(p.message_count)),
                    p.session_count,
                    format!("{:<10}", display::relative_time(p.last_active, now)).dimmed(),
                    p.display_name().bold()
                );
            }
            println!();
        }
    }
    Ok(())
}
