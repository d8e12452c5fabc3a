use anyhow::Result;
use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Utc};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;

use super::sessions::{self, SessionRow};
use crate::cli::Context;
use crate::display::{self, OutputFormat};
use crate::store::{self, DailyActivity, SessionEntry, StatsCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    Week,
    Month,
}

impl Period {
    pub fn name(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Week => "This Week",
            Self::Month => "This Month",
        }
    }

    /// First day of the period containing `today`; weeks start on Monday
    pub fn start_date(self, today: NaiveDate) -> NaiveDate {
        match self {
            Self::Today => today,
            Self::Week => {
                today - chrono::Duration::days(today.weekday().num_days_from_monday() as i64)
            }
            Self::Month => today.with_day(1).unwrap_or(today),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodReport {
    pub period: &'static str,
    #[serde(skip)]
    pub title: &'static str,
    pub since: String,
    pub activity: PeriodActivity,
    pub tokens: Vec<ModelTokens>,
    pub days: Vec<DailyActivity>,
    pub sessions: Vec<SessionRow>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodActivity {
    pub sessions: u64,
    pub messages: u64,
    pub tool_calls: u64,
    pub avg_messages_per_session: u64,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTokens {
    pub model: String,
    pub name: String,
    pub output_tokens: u64,
}

pub fn run(ctx: &Context, period: Period) -> Result<()> {
    let stats = super::load_cache(ctx)?;
    let today = Local::now().date_naive();
    let start = period.start_date(today);

    let sessions = match store::list_sessions_after(&ctx.paths.projects_dir(), local_midnight(start))
    {
        Ok(sessions) => sessions,
        Err(e) => {
            log::warn!("Session listing unavailable: {}", e);
            Vec::new()
        }
    };

    let report = build(period, &stats, today, &sessions);
    render(ctx.format, &report, ctx.config.display.period_session_limit)
}

/// Start of `date` in the local zone, as UTC
fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let Some(naive) = date.and_hms_opt(0, 0, 0) else {
        return DateTime::<Utc>::MIN_UTC;
    };
    match Local.from_local_datetime(&naive).earliest() {
        Some(t) => t.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&naive),
    }
}

/// Slice the cache to the period that contains `today`
pub fn build(
    period: Period,
    stats: &StatsCache,
    today: NaiveDate,
    sessions: &[SessionEntry],
) -> PeriodReport {
    let since = period.start_date(today).format("%Y-%m-%d").to_string();

    let days: Vec<DailyActivity> = stats
        .daily_activity
        .iter()
        .filter(|d| d.date >= since)
        .cloned()
        .collect();

    let mut activity = PeriodActivity::default();
    for d in &days {
        activity.sessions += d.session_count;
        activity.messages += d.message_count;
        activity.tool_calls += d.tool_call_count;
    }
    if activity.sessions > 0 {
        activity.avg_messages_per_session = activity.messages / activity.sessions;
    }

    let mut by_model: BTreeMap<&str, u64> = BTreeMap::new();
    for d in stats.daily_model_tokens.iter().filter(|d| d.date >= since) {
        for (model, tokens) in &d.tokens_by_model {
            *by_model.entry(model.as_str()).or_default() += tokens;
        }
    }
    let mut tokens: Vec<ModelTokens> = by_model
        .into_iter()
        .map(|(model, output_tokens)| ModelTokens {
            model: model.to_string(),
            name: display::model_short(model),
            output_tokens,
        })
        .collect();
    tokens.sort_by(|a, b| b.output_tokens.cmp(&a.output_tokens));

    PeriodReport {
        period: period.name(),
        title: period.title(),
        since,
        activity,
        tokens,
        days,
        sessions: sessions.iter().map(SessionRow::from).collect(),
    }
}

pub fn render(format: OutputFormat, report: &PeriodReport, session_limit: usize) -> Result<()> {
    match format {
        OutputFormat::Json => return display::print_json(report),
        OutputFormat::Markdown => render_markdown(report, session_limit),
        OutputFormat::Terminal => render_terminal(report, session_limit),
    }
    Ok(())
}

fn render_terminal(report: &PeriodReport, session_limit: usize) {
    display::title(report.title);
    println!("Since {}\n", report.since);

    let a = &report.activity;
    display::section("Activity", || {
        println!("  Sessions    {}", display::format_number(a.sessions).bold());
        println!("  Messages    {}", display::format_number(a.messages).bold());
        println!("  Tool calls  {}", display::format_number(a.tool_calls).bold());
        if a.sessions > 0 {
            println!(
                "  Avg/session {} msgs",
                display::format_number(a.avg_messages_per_session).bold()
            );
        }
    });
    println!();

    if !report.tokens.is_empty() {
        display::section("Tokens (output)", || {
            for t in &report.tokens {
                println!(
                    "  {:<14}  {}",
                    t.name,
                    display::format_tokens(t.output_tokens).bold()
                );
            }
        });
        println!();
    }

    if report.days.len() > 1 {
        let max = report.days.iter().map(|d| d.message_count).max().unwrap_or(0);
        display::section("Daily Breakdown", || {
            for d in &report.days {
                println!(
                    "  {}  {} {} msgs, {} sessions",
                    d.date,
                    display::bar(d.message_count, max, 20),
                    display::format_number(d.message_count),
                    d.session_count
                );
            }
        });
        println!();
    }

    if !report.sessions.is_empty() {
        display::section("Sessions", || {
            let shown = report.sessions.len().min(session_limit);
            sessions::print_rows(&report.sessions[..shown], 50, false);
            if report.sessions.len() > shown {
                println!(
                    "  {}",
                    format!("... and {} more", report.sessions.len() - shown).dimmed()
                );
            }
        });
        println!();
    }
}

fn render_markdown(report: &PeriodReport, session_limit: usize) {
    display::md_header(2, report.title);
    println!("Since {}\n", report.since);

    let a = &report.activity;
    display::md_header(3, "Activity");
    println!("- **Sessions:** {}", display::format_number(a.sessions));
    println!("- **Messages:** {}", display::format_number(a.messages));
    println!("- **Tool calls:** {}", display::format_number(a.tool_calls));
    if a.sessions > 0 {
        println!(
            "- **Avg/session:** {} msgs",
            display::format_number(a.avg_messages_per_session)
        );
    }
    println!();

    if !report.tokens.is_empty() {
        display::md_header(3, "Tokens (output)");
        let rows: Vec<Vec<String>> = report
            .tokens
            .iter()
            .map(|t| vec![t.name.clone(), display::format_tokens(t.output_tokens)])
            .collect();
        display::md_table(&["Model", "Tokens"], &rows);
    }

    if report.days.len() > 1 {
        display::md_header(3, "Daily Breakdown");
        let rows: Vec<Vec<String>> = report
            .days
            .iter()
            .map(|d| {
                vec![
                    d.date.clone(),
                    display::format_number(d.message_count),
                    d.session_count.to_string(),
                ]
            })
            .collect();
        display::md_table(&["Date", "Messages", "Sessions"], &rows);
    }

    if !report.sessions.is_empty() {
        display::md_header(3, "Sessions");
        let now = Utc::now();
        let rows: Vec<Vec<String>> = report
            .sessions
            .iter()
            .take(session_limit)
            .map(|s| {
                vec![
                    store::short_id(&s.session_id).to_string(),
                    s.messages.to_string(),
                    display::relative_time(store::parse_utc(&s.created), now),
                    sessions::prompt_or_placeholder(&s.first_prompt, 50),
                ]
            })
            .collect();
        display::md_table(&["ID", "Messages", "Created", "Prompt"], &rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day(date: &str, messages: u64, sessions: u64) -> DailyActivity {
        DailyActivity {
            date: date.to_string(),
            message_count: messages,
            session_count: sessions,
            tool_call_count: 1,
        }
    }

    fn sample() -> StatsCache {
        let tokens = |date: &str, n: u64| {
            json!({"date": date, "tokensByModel": {"claude-opus-4-6": n}})
        };
        let mut stats: StatsCache = serde_json::from_value(json!({
            "dailyModelTokens": [
                tokens("2024-02-28", 1000),
                tokens("2024-03-05", 200),
                tokens("2024-03-07", 300),
            ]
        }))
        .unwrap();
        stats.daily_activity = vec![
            day("2024-02-28", 10, 1),
            day("2024-03-01", 4, 2),
            day("2024-03-05", 6, 1),
            day("2024-03-07", 8, 2),
        ];
        stats
    }

    #[test]
    fn test_start_dates() {
        // 2024-03-07 is a Thursday
        let today = date(2024, 3, 7);
        assert_eq!(Period::Today.start_date(today), today);
        assert_eq!(Period::Week.start_date(today), date(2024, 3, 4));
        assert_eq!(Period::Month.start_date(today), date(2024, 3, 1));
        // Sunday belongs to the week that started the previous Monday
        assert_eq!(Period::Week.start_date(date(2024, 3, 10)), date(2024, 3, 4));
        assert_eq!(Period::Week.start_date(date(2024, 3, 4)), date(2024, 3, 4));
    }

    #[test]
    fn test_periods_nest() {
        let stats = sample();
        let today = date(2024, 3, 7);
        let t = build(Period::Today, &stats, today, &[]);
        let w = build(Period::Week, &stats, today, &[]);
        let m = build(Period::Month, &stats, today, &[]);

        for d in &t.days {
            assert!(w.days.contains(d));
        }
        for d in &w.days {
            assert!(m.days.contains(d));
        }
        assert_eq!(t.days.len(), 1);
        assert_eq!(w.days.len(), 2);
        assert_eq!(m.days.len(), 3);
    }

    #[test]
    fn test_week_totals() {
        let report = build(Period::Week, &sample(), date(2024, 3, 7), &[]);
        assert_eq!(report.since, "2024-03-04");
        assert_eq!(
            report.activity,
            PeriodActivity {
                sessions: 3,
                messages: 14,
                tool_calls: 2,
                avg_messages_per_session: 4,
            }
        );
        assert_eq!(report.tokens.len(), 1);
        assert_eq!(report.tokens[0].output_tokens, 500);
        assert_eq!(report.tokens[0].name, "Opus 4.6");
    }

    #[test]
    fn test_empty_period() {
        let report = build(Period::Today, &sample(), date(2024, 4, 1), &[]);
        assert_eq!(report.activity, PeriodActivity::default());
        assert!(report.tokens.is_empty());
        assert!(report.days.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let entry = SessionEntry {
            session_id: "abcdef0123".to_string(),
            ..Default::default()
        };
        let report = build(Period::Month, &sample(), date(2024, 3, 7), &[entry]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["period"], "month");
        assert_eq!(json["since"], "2024-03-01");
        assert_eq!(json["activity"]["toolCalls"], 3);
        assert_eq!(json["sessions"][0]["sessionId"], "abcdef0123");
        assert!(json.get("title").is_none());
    }
}
