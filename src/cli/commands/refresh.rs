use anyhow::{Context as _, Result};
use colored::Colorize;
use serde::Serialize;
use std::io::Write;

use crate::cli::Context;
use crate::display::{self, OutputFormat};
use crate::store;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResult {
    path: String,
    total_sessions: u64,
    total_messages: u64,
    last_computed_date: String,
}

/// Rebuild the stats cache from every transcript and replace the file on disk
pub fn run(ctx: &Context) -> Result<()> {
    let projects_dir = ctx.paths.projects_dir();
    let cache_path = ctx.paths.stats_cache();
    let show_progress = ctx.format == OutputFormat::Terminal;

    if show_progress {
        display::title("Refreshing stats cache...");
    }
    let stats = store::compute_stats(&projects_dir, |done, total| {
        if show_progress {
            eprint!("\r  Scanning... {}/{} sessions", done, total);
            let _ = std::io::stderr().flush();
        }
    })
    .context("computing stats")?;
    if show_progress {
        eprintln!();
    }

    store::save_stats_cache(&cache_path, &stats).context("saving stats")?;
    log::info!("Wrote {}", cache_path.display());

    let result = RefreshResult {
        path: cache_path.display().to_string(),
        total_sessions: stats.total_sessions,
        total_messages: stats.total_messages,
        last_computed_date: stats.last_computed_date,
    };

    match ctx.format {
        OutputFormat::Json => display::print_json(&result)?,
        OutputFormat::Markdown => {
            display::md_header(2, "Stats Cache Refreshed");
            println!("- **Sessions:** {}", display::format_number(result.total_sessions));
            println!("- **Messages:** {}", display::format_number(result.total_messages));
            println!("- **Date:** {}\n", result.last_computed_date);
        }
        OutputFormat::Terminal => {
            println!(
                "\n  {} {} sessions, {} messages",
                "Done.".green(),
                display::format_number(result.total_sessions).bold(),
                display::format_number(result.total_messages).bold()
            );
            println!(
                "  Cache updated for {}\n",
                result.last_computed_date.bold()
            );
        }
    }
    Ok(())
}
