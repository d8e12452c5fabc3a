use anyhow::Result;
use serde::Serialize;

use super::projects::ProjectRow;
use super::sessions::SessionsReport;
use super::summary::SummaryReport;
use super::tokens::TokensReport;
use super::{projects, sessions, summary, tokens};
use crate::cli::Context;
use crate::display::{self, OutputFormat};

/// Every report in one JSON document
#[derive(Serialize)]
struct FullReport {
    summary: SummaryReport,
    projects: Vec<ProjectRow>,
    sessions: SessionsReport,
    tokens: TokensReport,
}

/// Summary, projects, recent sessions and tokens in sequence
pub fn run(ctx: &Context) -> Result<()> {
    let summary = summary::report(ctx)?;
    let projects = projects::report(ctx)?;
    let sessions = sessions::report(ctx, None, None)?;
    let tokens = tokens::report(ctx)?;

    if ctx.format == OutputFormat::Json {
        return display::print_json(&FullReport {
            summary,
            projects: projects.iter().map(ProjectRow::from).collect(),
            sessions,
            tokens,
        });
    }

    summary::render(ctx.format, &summary)?;
    println!();
    projects::render(ctx.format, &projects)?;
    println!();
    sessions::render(ctx.format, &sessions)?;
    println!();
    tokens::render(ctx.format, &tokens)
}
