use anyhow::Result;
use chrono::{Local, NaiveDate};
use colored::Colorize;
use serde::Serialize;

use crate::cli::Context;
use crate::display::{self, OutputFormat};
use crate::store::{short_id, DailyActivity, LongestSession, ModelUsage, StatsCache};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub tracking_since: String,
    pub last_computed_date: String,
    /// The cache was not rebuilt today
    pub stale: bool,
    pub overview: Overview,
    pub today: Option<DailyActivity>,
    pub models: Vec<ModelRow>,
    pub peak_hours: Vec<HourCount>,
    pub longest_session: Option<LongestSession>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub sessions: u64,
    pub messages: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRow {
    pub model: String,
    pub name: String,
    #[serde(flatten)]
    pub usage: ModelUsage,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub sessions: u64,
}

pub fn run(ctx: &Context) -> Result<()> {
    let report = report(ctx)?;
    render(ctx.format, &report)
}

pub fn report(ctx: &Context) -> Result<SummaryReport> {
    let stats = super::load_cache(ctx)?;
    Ok(build(
        &stats,
        Local::now().date_naive(),
        ctx.config.display.peak_hours,
    ))
}

pub fn build(stats: &StatsCache, today: NaiveDate, peak_hours: usize) -> SummaryReport {
    let today_key = today.format("%Y-%m-%d").to_string();
    let total = stats.total_usage();

    let models = stats
        .models_by_output()
        .into_iter()
        .map(|(name, usage)| ModelRow {
            model: name.to_string(),
            name: display::model_short(name),
            usage: *usage,
        })
        .collect();

    let longest = &stats.longest_session;
    SummaryReport {
        tracking_since: tracking_since(&stats.first_session_date),
        last_computed_date: stats.last_computed_date.clone(),
        stale: stats.last_computed_date != today_key,
        overview: Overview {
            sessions: stats.total_sessions,
            messages: stats.total_messages,
            input_tokens: total.input_tokens,
            output_tokens: total.output_tokens,
            cache_read_tokens: total.cache_read_input_tokens,
        },
        today: stats.day(&today_key).cloned(),
        models,
        peak_hours: top_hours(stats, peak_hours),
        longest_session: (!longest.session_id.is_empty()).then(|| longest.clone()),
    }
}

/// `firstSessionDate` as a plain date when it parses as a timestamp
fn tracking_since(first: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(first) {
        Ok(t) => t.format("%Y-%m-%d").to_string(),
        Err(_) => first.to_string(),
    }
}

/// Busiest hours first; equal counts keep clock order
fn top_hours(stats: &StatsCache, limit: usize) -> Vec<HourCount> {
    let mut hours: Vec<HourCount> = stats
        .hour_counts
        .iter()
        .filter_map(|(hour, count)| {
            hour.parse::<u32>().ok().map(|hour| HourCount {
                hour,
                sessions: *count,
            })
        })
        .collect();
    hours.sort_by(|a, b| b.sessions.cmp(&a.sessions).then(a.hour.cmp(&b.hour)));
    hours.truncate(limit);
    hours
}

pub fn render(format: OutputFormat, report: &SummaryReport) -> Result<()> {
    match format {
        OutputFormat::Json => display::print_json(report),
        OutputFormat::Markdown => {
            render_markdown(report);
            Ok(())
        }
        OutputFormat::Terminal => {
            render_terminal(report);
            Ok(())
        }
    }
}

fn render_terminal(report: &SummaryReport) {
    display::title("Claude Code Summary");
    println!(
        "Tracking since {} (last updated: {})\n",
        report.tracking_since, report.last_computed_date
    );

    if report.stale {
        println!(
            "{} Stats last computed on {} (today: {}). Run `ccs refresh` to update.\n",
            "⚠".yellow(),
            report.last_computed_date,
            Local::now().format("%Y-%m-%d")
        );
    }

    let o = &report.overview;
    display::section("Overview", || {
        println!("  Sessions    {}", display::format_number(o.sessions).bold());
        println!("  Messages    {}", display::format_number(o.messages).bold());
        println!("  Tokens out  {}", display::format_tokens(o.output_tokens).bold());
        println!(
            "  Cache read  {}",
            display::format_tokens(o.cache_read_tokens).bold()
        );
    });
    println!();

    display::section("Today", || match &report.today {
        Some(day) => {
            println!("  Sessions    {}", display::format_number(day.session_count).bold());
            println!("  Messages    {}", display::format_number(day.message_count).bold());
            println!(
                "  Tool calls  {}",
                display::format_number(day.tool_call_count).bold()
            );
        }
        None => println!("  {}", "No activity recorded for today".dimmed()),
    });
    println!();

    if !report.models.is_empty() {
        display::section("Models", || {
            for m in &report.models {
                println!(
                    "  {}  out: {:<10}  cache: {}",
                    format!("{:<14}", m.name).bold(),
                    display::format_tokens(m.usage.output_tokens),
                    display::format_tokens(m.usage.cache_read_input_tokens)
                );
            }
        });
        println!();
    }

    if let Some(top) = report.peak_hours.first() {
        display::section("Peak Hours", || {
            for h in &report.peak_hours {
                println!(
                    "  {:02}:00  {} {} sessions",
                    h.hour,
                    display::bar(h.sessions, top.sessions, 20),
                    h.sessions
                );
            }
        });
        println!();
    }

    if let Some(longest) = &report.longest_session {
        display::section("Longest Session", || {
            println!("  ID        {}", short_id(&longest.session_id).dimmed());
            println!(
                "  Duration  {}",
                display::format_duration_ms(longest.duration).bold()
            );
            println!(
                "  Messages  {}",
                display::format_number(longest.message_count).bold()
            );
        });
        println!();
    }
}

fn render_markdown(report: &SummaryReport) {
    display::md_header(2, "Claude Code Summary");
    println!(
        "Tracking since {} (last updated: {})\n",
        report.tracking_since, report.last_computed_date
    );
    if report.stale {
        println!(
            "> Stats last computed on {}. Run `ccs refresh` to update.\n",
            report.last_computed_date
        );
    }

    let o = &report.overview;
    display::md_header(3, "Overview");
    println!("- **Sessions:** {}", display::format_number(o.sessions));
    println!("- **Messages:** {}", display::format_number(o.messages));
    println!("- **Tokens out:** {}", display::format_tokens(o.output_tokens));
    println!("- **Cache read:** {}\n", display::format_tokens(o.cache_read_tokens));

    display::md_header(3, "Today");
    match &report.today {
        Some(day) => {
            println!("- **Sessions:** {}", display::format_number(day.session_count));
            println!("- **Messages:** {}", display::format_number(day.message_count));
            println!(
                "- **Tool calls:** {}\n",
                display::format_number(day.tool_call_count)
            );
        }
        None => println!("No activity recorded for today.\n"),
    }

    if !report.models.is_empty() {
        display::md_header(3, "Models");
        let rows: Vec<Vec<String>> = report
            .models
            .iter()
            .map(|m| {
                vec![
                    m.name.clone(),
                    display::format_tokens(m.usage.output_tokens),
                    display::format_tokens(m.usage.cache_read_input_tokens),
                ]
            })
            .collect();
        display::md_table(&["Model", "Output", "Cache read"], &rows);
    }

    if !report.peak_hours.is_empty() {
        display::md_header(3, "Peak Hours");
        let rows: Vec<Vec<String>> = report
            .peak_hours
            .iter()
            .map(|h| vec![format!("{:02}:00", h.hour), h.sessions.to_string()])
            .collect();
        display::md_table(&["Hour", "Sessions"], &rows);
    }

    if let Some(longest) = &report.longest_session {
        display::md_header(3, "Longest Session");
        println!("- **ID:** `{}`", short_id(&longest.session_id));
        println!(
            "- **Duration:** {}",
            display::format_duration_ms(longest.duration)
        );
        println!(
            "- **Messages:** {}\n",
            display::format_number(longest.message_count)
        );
    }
}
