use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use super::summary::ModelRow;
use crate::cli::Context;
use crate::display::{self, OutputFormat};
use crate::store::{ModelUsage, StatsCache};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokensReport {
    pub total: ModelUsage,
    pub models: Vec<ModelRow>,
    pub daily: Vec<DailyTokens>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTokens {
    pub date: String,
    pub output_tokens: u64,
}

pub fn run(ctx: &Context) -> Result<()> {
    let report = report(ctx)?;
    render(ctx.format, &report)
}

pub fn report(ctx: &Context) -> Result<TokensReport> {
    let stats = super::load_cache(ctx)?;
    Ok(build(&stats, ctx.config.display.token_days))
}

/// Per-model counters plus the last `days` recorded dates of output tokens
pub fn build(stats: &StatsCache, days: usize) -> TokensReport {
    let models = stats
        .models_by_output()
        .into_iter()
        .map(|(name, usage)| ModelRow {
            model: name.to_string(),
            name: display::model_short(name),
            usage: *usage,
        })
        .collect();

    let skip = stats.daily_model_tokens.len().saturating_sub(days);
    let daily = stats.daily_model_tokens[skip..]
        .iter()
        .map(|d| DailyTokens {
            date: d.date.clone(),
            output_tokens: d.total(),
        })
        .collect();

    TokensReport {
        total: stats.total_usage(),
        models,
        daily,
    }
}

pub fn render(format: OutputFormat, report: &TokensReport) -> Result<()> {
    match format {
        OutputFormat::Json => return display::print_json(report),
        OutputFormat::Markdown => render_markdown(report),
        OutputFormat::Terminal => render_terminal(report),
    }
    Ok(())
}

fn render_terminal(report: &TokensReport) {
    display::title("Token Usage");
    println!();

    display::section("By Model", || {
        for m in &report.models {
            let u = &m.usage;
            println!("  {}", m.name.bold());
            println!("    Input tokens     {}", display::format_tokens(u.input_tokens));
            println!(
                "    Output tokens    {}",
                display::format_tokens(u.output_tokens).bold()
            );
            println!(
                "    Cache read       {}",
                display::format_tokens(u.cache_read_input_tokens)
            );
            println!(
                "    Cache creation   {}",
                display::format_tokens(u.cache_creation_input_tokens)
            );
            println!();
        }
    });
    println!();

    let title = format!("Daily Output Tokens (last {} days)", report.daily.len());
    let max = report.daily.iter().map(|d| d.output_tokens).max().unwrap_or(0);
    display::section(&title, || {
        for d in &report.daily {
            println!(
                "  {}  {} {}",
                d.date,
                display::bar(d.output_tokens, max, 20),
                display::format_tokens(d.output_tokens)
            );
        }
    });
    println!();
}

fn render_markdown(report: &TokensReport) {
    display::md_header(2, "Token Usage");

    display::md_header(3, "By Model");
    let rows: Vec<Vec<String>> = report
        .models
        .iter()
        .map(|m| {
            vec![
                m.name.clone(),
                display::format_tokens(m.usage.input_tokens),
                display::format_tokens(m.usage.output_tokens),
                display::format_tokens(m.usage.cache_read_input_tokens),
                display::format_tokens(m.usage.cache_creation_input_tokens),
            ]
        })
        .collect();
    display::md_table(
        &["Model", "Input", "Output", "Cache read", "Cache creation"],
        &rows,
    );

    if !report.daily.is_empty() {
        display::md_header(3, "Daily Output Tokens");
        let rows: Vec<Vec<String>> = report
            .daily
            .iter()
            .map(|d| vec![d.date.clone(), display::format_tokens(d.output_tokens)])
            .collect();
        display::md_table(&["Date", "Output"], &rows);
    }
}
